use std::fmt;

use tracing::{debug, trace};

use super::scanner::Scanner;
use crate::common::error::{Error, Result};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TokenType {
    // primitive type keywords
    BoolType,
    IntType,
    FloatType,
    StringType,

    // keywords
    Struct,
    And,
    Or,
    Not,
    While,
    Do,
    If,
    Then,
    Else,
    Elif,
    End,
    Fun,
    Var,
    Set,
    Return,
    New,
    Nil,

    // literals
    Identifier,
    Int,
    Float,
    String,
    Bool,

    // operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Equal, // =
    EqualEqual,
    BangEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,

    // misc
    Semicolon,
    Comma,
    Dot,
    Colon,
    LeftParen,
    RightParen,

    EOF,
}

impl TokenType {
    pub fn is_primitive_type(self) -> bool {
        matches!(
            self,
            TokenType::BoolType | TokenType::IntType | TokenType::FloatType | TokenType::StringType
        )
    }

    pub fn is_literal(self) -> bool {
        matches!(
            self,
            TokenType::Int | TokenType::Float | TokenType::String | TokenType::Bool | TokenType::Nil
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub ty: TokenType,
    pub lexeme: String,

    // 1-based start position in source
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(ty: TokenType, lexeme: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            ty,
            lexeme: lexeme.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} '{}' {}:{}", self.ty, self.lexeme, self.line, self.column)
    }
}

// characters that end an identifier or a number
fn is_delimiter(c: char) -> bool {
    matches!(
        c,
        '=' | ':' | ',' | '/' | '.' | '>' | '<' | '!' | '(' | ')' | '-' | '%' | '*' | '+' | ';'
    )
}

fn keyword(lexeme: &str) -> Option<TokenType> {
    let ty = match lexeme {
        "bool" => TokenType::BoolType,
        "int" => TokenType::IntType,
        "float" => TokenType::FloatType,
        "string" => TokenType::StringType,
        "struct" => TokenType::Struct,
        "and" => TokenType::And,
        "or" => TokenType::Or,
        "not" => TokenType::Not,
        "while" => TokenType::While,
        "do" => TokenType::Do,
        "if" => TokenType::If,
        "then" => TokenType::Then,
        "else" => TokenType::Else,
        "elif" => TokenType::Elif,
        "end" => TokenType::End,
        "fun" => TokenType::Fun,
        "var" => TokenType::Var,
        "set" => TokenType::Set,
        "return" => TokenType::Return,
        "new" => TokenType::New,
        "nil" => TokenType::Nil,
        "true" | "false" => TokenType::Bool,
        _ => return None,
    };
    Some(ty)
}

/// Produces one token per `next_token` call from a character stream.
pub struct Lexer {
    scanner: Scanner,

    // track start of current token
    start_line: usize,
    start_column: usize,
}

impl Lexer {
    pub fn new(scanner: Scanner) -> Self {
        Self {
            scanner,
            start_line: 1,
            start_column: 1,
        }
    }

    pub fn from_source(source: &str) -> Self {
        Self::new(Scanner::new(source))
    }

    fn token(&self, ty: TokenType, lexeme: impl Into<String>) -> Token {
        Token::new(ty, lexeme, self.start_line, self.start_column)
    }

    fn error(&self, message: &str) -> Error {
        Error::lexical(message, self.start_line, self.start_column)
    }

    // skip whitespace and `#` comments
    fn skip_trivia(&mut self) {
        loop {
            self.scanner.advance_while(char::is_whitespace);

            if self.scanner.peek() == Some('#') {
                self.scanner.advance_while(|c| c != '\n');
            } else {
                break;
            }
        }
    }

    fn identifier(&mut self) -> Token {
        let mut lexeme = self.scanner.advance_while(char::is_alphabetic);
        lexeme.push_str(
            &self
                .scanner
                .advance_while(|c| !c.is_whitespace() && !is_delimiter(c)),
        );

        let ty = keyword(&lexeme).unwrap_or(TokenType::Identifier);
        self.token(ty, lexeme)
    }

    fn number(&mut self) -> Result<Token> {
        let mut lexeme = self.scanner.advance_while(|c| c.is_ascii_digit());

        // no leading zeros
        if lexeme.len() > 1 && lexeme.starts_with('0') {
            return Err(self.error("invalid number value"));
        }

        let ty = if self.scanner.advance_if('.') {
            let fraction = self.scanner.advance_while(|c| c.is_ascii_digit());

            // the fractional part must be non-empty and, past one digit, must not end in zero
            if fraction.is_empty() || (fraction.len() > 1 && fraction.ends_with('0')) {
                return Err(self.error("invalid float value"));
            }

            lexeme.push('.');
            lexeme.push_str(&fraction);
            TokenType::Float
        } else {
            if lexeme.parse::<i64>().is_err() {
                return Err(self.error("invalid number value"));
            }
            TokenType::Int
        };

        match self.scanner.peek() {
            Some(c) if !c.is_whitespace() && !is_delimiter(c) => {
                Err(self.error("invalid number value"))
            }
            _ => Ok(self.token(ty, lexeme)),
        }
    }

    fn string(&mut self) -> Result<Token> {
        self.scanner.advance(); // opening quote

        let mut lexeme = String::new();
        loop {
            match self.scanner.peek() {
                Some('"') => {
                    self.scanner.advance();
                    break;
                }
                Some('\n') => return Err(self.error("invalid string")),
                Some(c) => {
                    lexeme.push(c);
                    self.scanner.advance();
                }
                None => return Err(self.error("unterminated string")),
            }
        }

        Ok(self.token(TokenType::String, lexeme))
    }

    fn symbol(&mut self, c: char) -> Result<Token> {
        self.scanner.advance();

        let (ty, lexeme) = match c {
            '=' if self.scanner.advance_if('=') => (TokenType::EqualEqual, "=="),
            '=' => (TokenType::Equal, "="),
            '!' if self.scanner.advance_if('=') => (TokenType::BangEqual, "!="),
            '<' if self.scanner.advance_if('=') => (TokenType::LessEqual, "<="),
            '<' => (TokenType::Less, "<"),
            '>' if self.scanner.advance_if('=') => (TokenType::GreaterEqual, ">="),
            '>' => (TokenType::Greater, ">"),
            ':' => (TokenType::Colon, ":"),
            ',' => (TokenType::Comma, ","),
            '/' => (TokenType::Slash, "/"),
            '.' => (TokenType::Dot, "."),
            '(' => (TokenType::LeftParen, "("),
            ')' => (TokenType::RightParen, ")"),
            '-' => (TokenType::Minus, "-"),
            '%' => (TokenType::Percent, "%"),
            '*' => (TokenType::Star, "*"),
            '+' => (TokenType::Plus, "+"),
            ';' => (TokenType::Semicolon, ";"),
            // a bare `!` or any unknown character
            _ => return Err(self.error("invalid symbol")),
        };

        Ok(self.token(ty, lexeme))
    }

    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_trivia();

        let (line, column) = self.scanner.get_line_diagnostics();
        self.start_line = line;
        self.start_column = column;

        let token = match self.scanner.peek() {
            None => self.token(TokenType::EOF, ""),
            Some(c) if c.is_alphabetic() => self.identifier(),
            Some(c) if c.is_ascii_digit() => self.number()?,
            Some('"') => self.string()?,
            Some(c) => self.symbol(c)?,
        };

        trace!(%token, "lexed");
        Ok(token)
    }

    /// Drains the lexer, returning every token up to and including EOF.
    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let at_end = token.ty == TokenType::EOF;
            tokens.push(token);
            if at_end {
                break;
            }
        }

        debug!(count = tokens.len(), "tokenized source");
        Ok(tokens)
    }
}

#[tracing::instrument(skip_all, fields(len = source.len()))]
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    Lexer::from_source(source).tokenize()
}
