use thiserror::Error as ThisError;

use crate::frontend::lexer::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Lexical,
    Syntax,
    Type,
    Runtime,
}

/// A positioned error raised by any pass. Every error is fatal to the run
/// that raised it.
#[derive(Debug, Clone, PartialEq, ThisError)]
#[error("{message} at line {line} column {column}")]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            kind,
            message: message.into(),
            line,
            column,
        }
    }

    pub fn lexical(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self::new(ErrorKind::Lexical, message, line, column)
    }

    pub fn syntax(message: impl Into<String>, token: &Token) -> Self {
        Self::new(ErrorKind::Syntax, message, token.line, token.column)
    }

    pub fn type_error(message: impl Into<String>, token: &Token) -> Self {
        Self::new(ErrorKind::Type, message, token.line, token.column)
    }

    pub fn runtime(message: impl Into<String>, token: &Token) -> Self {
        Self::new(ErrorKind::Runtime, message, token.line, token.column)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
