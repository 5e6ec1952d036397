use tracing::debug;

use super::ast::*;
use super::lexer::{Token, TokenType, tokenize};
use crate::common::error::{Error, Result};

/// Predictive recursive-descent parser with one token of lookahead. The first
/// unexpected token aborts the parse.
#[derive(Debug)]
pub struct Parser<'a> {
    tokens: &'a [Token],
    current: usize,

    // returned by peek() once the slice is exhausted
    eof: Token,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        let eof = match tokens.last() {
            Some(last) => Token::new(TokenType::EOF, "", last.line, last.column),
            None => Token::new(TokenType::EOF, "", 1, 1),
        };

        Self {
            tokens,
            current: 0,
            eof,
        }
    }

    fn error(&self, expected: &str) -> Error {
        let token = self.peek();
        Error::syntax(
            format!("expected {} but found '{}'", expected, token.lexeme),
            token,
        )
    }

    pub fn peek(&self) -> &Token {
        self.tokens.get(self.current).unwrap_or(&self.eof)
    }

    pub fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.current < self.tokens.len() {
            self.current += 1;
        }
        token
    }

    pub fn check(&self, ty: TokenType) -> bool {
        self.peek().ty == ty
    }

    fn check_any(&self, types: &[TokenType]) -> bool {
        types.contains(&self.peek().ty)
    }

    fn expect(&mut self, ty: TokenType, expected: &str) -> Result<Token> {
        if self.check(ty) {
            Ok(self.advance())
        } else {
            Err(self.error(expected))
        }
    }

    fn is_expression_start(&self) -> bool {
        let ty = self.peek().ty;
        ty.is_literal() || matches!(ty, TokenType::New | TokenType::LeftParen | TokenType::Identifier)
    }

    fn is_basic_statement_start(&self) -> bool {
        self.check_any(&[
            TokenType::Var,
            TokenType::Set,
            TokenType::If,
            TokenType::While,
            TokenType::Return,
        ]) || self.is_expression_start()
    }

    /// program := statement* EOF
    pub fn parse(&mut self) -> Result<StmtList> {
        let mut statements = Vec::new();

        while !self.check(TokenType::EOF) {
            statements.push(self.statement()?);
        }

        self.expect(TokenType::EOF, "end of file")?;

        debug!(count = statements.len(), "parsed program");
        Ok(StmtList { statements })
    }

    fn statement(&mut self) -> Result<Stmt> {
        match self.peek().ty {
            TokenType::Struct => self.struct_declaration(),
            TokenType::Fun => self.function_declaration(),
            _ => self.basic_statement(),
        }
    }

    fn basic_statements(&mut self) -> Result<StmtList> {
        let mut statements = Vec::new();

        while self.is_basic_statement_start() {
            statements.push(self.basic_statement()?);
        }

        Ok(StmtList { statements })
    }

    fn basic_statement(&mut self) -> Result<Stmt> {
        match self.peek().ty {
            TokenType::Var => Ok(Stmt::VarDeclaration(self.variable_declaration()?)),
            TokenType::Set => self.assignment(),
            TokenType::If => self.if_statement(),
            TokenType::While => self.while_statement(),
            TokenType::Return => self.return_statement(),
            _ if self.is_expression_start() => {
                let expr = self.expression()?;
                self.expect(TokenType::Semicolon, "';'")?;
                Ok(Stmt::Expr(expr))
            }
            _ => Err(self.error("statement")),
        }
    }

    // struct ID var-decl* end
    fn struct_declaration(&mut self) -> Result<Stmt> {
        self.expect(TokenType::Struct, "'struct'")?;
        let name = self.expect(TokenType::Identifier, "struct name")?;

        let mut fields = Vec::new();
        while self.check(TokenType::Var) {
            fields.push(self.variable_declaration()?);
        }

        self.expect(TokenType::End, "'end'")?;

        Ok(Stmt::StructDeclaration(StructDeclarationStmt { name, fields }))
    }

    // fun (type | nil) ID ( params ) basic-statement* end
    fn function_declaration(&mut self) -> Result<Stmt> {
        self.expect(TokenType::Fun, "'fun'")?;

        let return_ty = if self.check(TokenType::Nil) {
            self.advance()
        } else {
            self.parse_type()?
        };

        let name = self.expect(TokenType::Identifier, "function name")?;
        self.expect(TokenType::LeftParen, "'('")?;
        let parameters = self.parse_parameters()?;
        self.expect(TokenType::RightParen, "')'")?;

        let body = self.basic_statements()?;
        self.expect(TokenType::End, "'end'")?;

        Ok(Stmt::FunctionDeclaration(FunctionDeclarationStmt {
            name,
            parameters,
            return_ty,
            body,
        }))
    }

    fn parse_parameters(&mut self) -> Result<Vec<Parameter>> {
        let mut parameters = Vec::new();

        if self.check(TokenType::Identifier) {
            parameters.push(self.parse_parameter()?);

            while self.check(TokenType::Comma) {
                self.advance(); // ,
                parameters.push(self.parse_parameter()?);
            }
        }

        Ok(parameters)
    }

    fn parse_parameter(&mut self) -> Result<Parameter> {
        let name = self.expect(TokenType::Identifier, "parameter name")?;
        self.expect(TokenType::Colon, "':'")?;
        let ty = self.parse_type()?;

        Ok(Parameter { name, ty })
    }

    fn parse_type(&mut self) -> Result<Token> {
        let ty = self.peek().ty;
        if ty == TokenType::Identifier || ty.is_primitive_type() {
            Ok(self.advance())
        } else {
            Err(self.error("type"))
        }
    }

    // var ID (: type)? = expr ;
    fn variable_declaration(&mut self) -> Result<VarDeclarationStmt> {
        self.expect(TokenType::Var, "'var'")?;
        let name = self.expect(TokenType::Identifier, "variable name")?;

        let ty = if self.check(TokenType::Colon) {
            self.advance();
            Some(self.parse_type()?)
        } else {
            None
        };

        self.expect(TokenType::Equal, "'='")?;
        let initializer = self.expression()?;
        self.expect(TokenType::Semicolon, "';'")?;

        Ok(VarDeclarationStmt {
            name,
            ty,
            initializer,
        })
    }

    // set lvalue = expr ;
    fn assignment(&mut self) -> Result<Stmt> {
        self.expect(TokenType::Set, "'set'")?;
        let first = self.expect(TokenType::Identifier, "identifier")?;
        let target = LValue {
            path: self.field_path(first)?,
        };
        self.expect(TokenType::Equal, "'='")?;
        let value = self.expression()?;
        self.expect(TokenType::Semicolon, "';'")?;

        Ok(Stmt::Assignment(AssignmentStmt { target, value }))
    }

    fn conditional_block(&mut self) -> Result<ConditionalBlock> {
        let condition = self.bool_expression()?;
        self.expect(TokenType::Then, "'then'")?;
        let body = self.basic_statements()?;

        Ok(ConditionalBlock { condition, body })
    }

    fn if_statement(&mut self) -> Result<Stmt> {
        self.expect(TokenType::If, "'if'")?;
        let then_branch = self.conditional_block()?;

        let mut elif_branches = Vec::new();
        while self.check(TokenType::Elif) {
            self.advance();
            elif_branches.push(self.conditional_block()?);
        }

        let else_branch = if self.check(TokenType::Else) {
            self.advance();
            Some(self.basic_statements()?)
        } else {
            None
        };

        self.expect(TokenType::End, "'end'")?;

        Ok(Stmt::If(IfStmt {
            then_branch,
            elif_branches,
            else_branch,
        }))
    }

    fn while_statement(&mut self) -> Result<Stmt> {
        self.expect(TokenType::While, "'while'")?;
        let condition = self.bool_expression()?;
        self.expect(TokenType::Do, "'do'")?;
        let body = self.basic_statements()?;
        self.expect(TokenType::End, "'end'")?;

        Ok(Stmt::While(WhileStmt { condition, body }))
    }

    fn return_statement(&mut self) -> Result<Stmt> {
        let keyword = self.expect(TokenType::Return, "'return'")?;

        let value = if self.is_expression_start() {
            Some(self.expression()?)
        } else {
            None
        };

        self.expect(TokenType::Semicolon, "';'")?;

        Ok(Stmt::Return(ReturnStmt { value, keyword }))
    }

    // ( expr ) | rvalue, optionally followed by an operator and the rest of the chain
    pub fn expression(&mut self) -> Result<Expr> {
        let left = if self.check(TokenType::LeftParen) {
            self.advance();
            let expr = self.expression()?;
            self.expect(TokenType::RightParen, "')'")?;
            expr
        } else if self.is_expression_start() {
            Expr::Simple(self.rvalue()?)
        } else {
            return Err(self.error("expression"));
        };

        if self.check_any(&[
            TokenType::Plus,
            TokenType::Minus,
            TokenType::Star,
            TokenType::Slash,
            TokenType::Percent,
        ]) {
            let operator = self.advance();
            let right = self.expression()?;

            return Ok(Expr::Complex(ComplexExpr {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            }));
        }

        Ok(left)
    }

    fn rvalue(&mut self) -> Result<RValue> {
        let ty = self.peek().ty;
        if ty.is_literal() {
            return Ok(RValue::Literal(self.advance()));
        }

        match ty {
            TokenType::New => {
                self.advance();
                let name = self.expect(TokenType::Identifier, "struct name")?;
                Ok(RValue::New(name))
            }
            TokenType::Identifier => self.identifier_rvalue(),
            _ => Err(self.error("value")),
        }
    }

    fn identifier_rvalue(&mut self) -> Result<RValue> {
        let identifier = self.expect(TokenType::Identifier, "identifier")?;

        if self.check(TokenType::LeftParen) {
            self.advance();
            let arguments = self.arguments()?;
            self.expect(TokenType::RightParen, "')'")?;

            return Ok(RValue::Call(CallExpr {
                callee: identifier,
                arguments,
            }));
        }

        Ok(RValue::Path(self.field_path(identifier)?))
    }

    // ID (. ID)*, with the leading ID already consumed
    fn field_path(&mut self, first: Token) -> Result<Vec<Token>> {
        let mut path = vec![first];

        while self.check(TokenType::Dot) {
            self.advance();
            path.push(self.expect(TokenType::Identifier, "field name")?);
        }

        Ok(path)
    }

    fn arguments(&mut self) -> Result<Vec<Expr>> {
        let mut arguments = Vec::new();

        if self.is_expression_start() {
            arguments.push(self.expression()?);

            while self.check(TokenType::Comma) {
                self.advance();
                arguments.push(self.expression()?);
            }
        }

        Ok(arguments)
    }

    fn relational_operator(&self) -> bool {
        self.check_any(&[
            TokenType::EqualEqual,
            TokenType::BangEqual,
            TokenType::Less,
            TokenType::LessEqual,
            TokenType::Greater,
            TokenType::GreaterEqual,
        ])
    }

    fn connective(&mut self) -> Result<Option<Connective>> {
        if !self.check_any(&[TokenType::And, TokenType::Or]) {
            return Ok(None);
        }

        let operator = self.advance();
        let rest = self.bool_expression()?;

        Ok(Some(Connective {
            operator,
            rest: Box::new(rest),
        }))
    }

    /// ( bool-expr ) | expr (relop expr)? | not bool-expr, each optionally
    /// followed by `and`/`or` and the rest of the chain.
    pub fn bool_expression(&mut self) -> Result<BoolExpr> {
        if self.check(TokenType::LeftParen) {
            self.advance();
            let inner = self.bool_expression()?;
            self.expect(TokenType::RightParen, "')'")?;

            return match self.connective()? {
                Some(connective) => {
                    let mut outer = BoolExpr::new(BoolOperand::Group(Box::new(inner)));
                    outer.connective = Some(connective);
                    Ok(outer)
                }
                None => Ok(inner),
            };
        }

        if self.check(TokenType::Not) {
            self.advance();
            let mut inner = self.bool_expression()?;

            if inner.negated {
                let mut outer = BoolExpr::new(BoolOperand::Group(Box::new(inner)));
                outer.negated = true;
                return Ok(outer);
            }

            inner.negated = true;
            return Ok(inner);
        }

        if !self.is_expression_start() {
            return Err(self.error("boolean expression"));
        }

        let mut bool_expr = BoolExpr::new(BoolOperand::Expr(self.expression()?));

        if self.relational_operator() {
            let operator = self.advance();
            let right = self.expression()?;
            bool_expr.relation = Some(Relation { operator, right });
        }

        bool_expr.connective = self.connective()?;

        Ok(bool_expr)
    }
}

/// Tokenizes and parses a complete program.
#[tracing::instrument(skip_all)]
pub fn parse(source: &str) -> Result<StmtList> {
    let tokens = tokenize(source)?;
    Parser::new(&tokens).parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_expr(source: &str) -> Expr {
        let tokens = tokenize(source).unwrap();
        Parser::new(&tokens).expression().unwrap()
    }

    fn literal(expr: &Expr) -> &str {
        match expr {
            Expr::Simple(RValue::Literal(token)) => &token.lexeme,
            other => panic!("expected literal, got {:?}", other),
        }
    }

    #[test]
    fn test_arithmetic_is_right_associative() {
        let Expr::Complex(outer) = parse_expr("10 - 3 - 2") else {
            panic!("expected complex expression");
        };

        assert_eq!(literal(&outer.left), "10");
        assert_eq!(outer.operator.ty, TokenType::Minus);

        let Expr::Complex(inner) = outer.right.as_ref() else {
            panic!("expected nested complex expression");
        };
        assert_eq!(literal(&inner.left), "3");
        assert_eq!(literal(&inner.right), "2");
    }

    #[test]
    fn test_parenthesized_left_operand() {
        let Expr::Complex(outer) = parse_expr("(1 + 2) * 3") else {
            panic!("expected complex expression");
        };

        assert_eq!(outer.operator.ty, TokenType::Star);
        assert!(matches!(outer.left.as_ref(), Expr::Complex(_)));
        assert_eq!(literal(&outer.right), "3");
    }

    #[test]
    fn test_identifier_rvalues() {
        assert!(matches!(parse_expr("x"), Expr::Simple(RValue::Path(path)) if path.len() == 1));
        assert!(matches!(parse_expr("p.q.r"), Expr::Simple(RValue::Path(path)) if path.len() == 3));
        assert!(matches!(
            parse_expr("f(1, x)"),
            Expr::Simple(RValue::Call(CallExpr { arguments, .. })) if arguments.len() == 2
        ));
        assert!(matches!(parse_expr("new Point"), Expr::Simple(RValue::New(name)) if name.lexeme == "Point"));
    }

    #[test]
    fn test_negation_covers_connective() {
        let tokens = tokenize("not a == b and c").unwrap();
        let bool_expr = Parser::new(&tokens).bool_expression().unwrap();

        assert!(bool_expr.negated);
        assert!(bool_expr.relation.is_some());
        assert!(bool_expr.connective.is_some());
    }

    #[test]
    fn test_group_followed_by_connective_keeps_inner_chain() {
        let tokens = tokenize("(a and b) or c").unwrap();
        let bool_expr = Parser::new(&tokens).bool_expression().unwrap();

        let BoolOperand::Group(inner) = &bool_expr.first else {
            panic!("expected grouped operand");
        };
        assert_eq!(inner.connective.as_ref().unwrap().operator.ty, TokenType::And);
        assert_eq!(bool_expr.connective.as_ref().unwrap().operator.ty, TokenType::Or);
    }

    #[test]
    fn test_missing_semicolon_is_reported_at_offending_token() {
        let err = parse("var x = 1\nvar y = 2;").unwrap_err();

        assert_eq!(err.message, "expected ';' but found 'var'");
        assert_eq!((err.line, err.column), (2, 1));
    }

    #[test]
    fn test_struct_declaration_inside_function_is_rejected() {
        let err = parse("fun nil f() struct S end end").unwrap_err();
        assert_eq!(err.message, "expected 'end' but found 'struct'");
    }
}
