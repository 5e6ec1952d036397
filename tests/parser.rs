mod parser_tests {
    use mypl_core::ast::*;
    use mypl_core::{ErrorKind, Parser, Token, TokenType, parse, tokenize};
    use pretty_assertions::assert_eq;

    fn tok(ty: TokenType, lexeme: &str, line: usize, column: usize) -> Token {
        Token::new(ty, lexeme, line, column)
    }

    fn literal(ty: TokenType, lexeme: &str, column: usize) -> Expr {
        Expr::Simple(RValue::Literal(tok(ty, lexeme, 1, column)))
    }

    #[test]
    fn test_parse_variable_declaration() {
        let program = parse("var x: int = 2;").unwrap();

        assert_eq!(
            program,
            StmtList {
                statements: vec![Stmt::VarDeclaration(VarDeclarationStmt {
                    name: tok(TokenType::Identifier, "x", 1, 5),
                    ty: Some(tok(TokenType::IntType, "int", 1, 8)),
                    initializer: literal(TokenType::Int, "2", 14),
                })],
            }
        );
    }

    #[test]
    fn test_parse_right_associative_chain() {
        let program = parse("var y = 10 - 3 - 2;").unwrap();

        let Stmt::VarDeclaration(decl) = &program.statements[0] else {
            panic!("Expected a variable declaration, got {:?}", program.statements[0]);
        };

        assert_eq!(
            decl.initializer,
            Expr::Complex(ComplexExpr {
                left: Box::new(literal(TokenType::Int, "10", 9)),
                operator: tok(TokenType::Minus, "-", 1, 12),
                right: Box::new(Expr::Complex(ComplexExpr {
                    left: Box::new(literal(TokenType::Int, "3", 14)),
                    operator: tok(TokenType::Minus, "-", 1, 16),
                    right: Box::new(literal(TokenType::Int, "2", 18)),
                })),
            })
        );
    }

    #[test]
    fn test_parse_assignment_path() {
        let program = parse("set p.next.x = nil;").unwrap();

        assert_eq!(
            program.statements,
            vec![Stmt::Assignment(AssignmentStmt {
                target: LValue {
                    path: vec![
                        tok(TokenType::Identifier, "p", 1, 5),
                        tok(TokenType::Identifier, "next", 1, 7),
                        tok(TokenType::Identifier, "x", 1, 12),
                    ],
                },
                value: literal(TokenType::Nil, "nil", 16),
            })]
        );
    }

    #[test]
    fn test_parse_function_declaration() {
        let program = parse("fun nil greet(name: string, times: int) print(name); end").unwrap();

        let Stmt::FunctionDeclaration(function) = &program.statements[0] else {
            panic!("Expected a function, got {:?}", program.statements[0]);
        };

        assert!(function.returns_nothing());
        assert_eq!(function.name.lexeme, "greet");
        assert_eq!(
            function.parameters,
            vec![
                Parameter {
                    name: tok(TokenType::Identifier, "name", 1, 15),
                    ty: tok(TokenType::StringType, "string", 1, 21),
                },
                Parameter {
                    name: tok(TokenType::Identifier, "times", 1, 29),
                    ty: tok(TokenType::IntType, "int", 1, 36),
                },
            ]
        );
        assert_eq!(function.body.statements.len(), 1);
    }

    #[test]
    fn test_parse_struct_declaration() {
        let program = parse("struct Point var x: int = 0; var y = 0; end").unwrap();

        let Stmt::StructDeclaration(decl) = &program.statements[0] else {
            panic!("Expected a struct, got {:?}", program.statements[0]);
        };

        let fields: Vec<_> = decl
            .fields
            .iter()
            .map(|field| (field.name.lexeme.as_str(), field.ty.is_some()))
            .collect();
        assert_eq!(fields, vec![("x", true), ("y", false)]);
    }

    #[test]
    fn test_parse_if_chain() {
        let source = "if a then elif b then set x = 1; elif c then else return; end";
        let program = parse(source).unwrap();

        let Stmt::If(stmt) = &program.statements[0] else {
            panic!("Expected an if statement, got {:?}", program.statements[0]);
        };

        assert!(stmt.then_branch.body.statements.is_empty());
        assert_eq!(stmt.elif_branches.len(), 2);
        assert_eq!(stmt.elif_branches[0].body.statements.len(), 1);
        assert_eq!(
            stmt.else_branch,
            Some(StmtList {
                statements: vec![Stmt::Return(ReturnStmt {
                    value: None,
                    keyword: tok(TokenType::Return, "return", 1, 51),
                })],
            })
        );
    }

    #[test]
    fn test_parse_bool_chain() {
        let tokens = tokenize("x < 1 or not y").unwrap();
        let condition = Parser::new(&tokens).bool_expression().unwrap();

        let path = |lexeme: &str, column| {
            Expr::Simple(RValue::Path(vec![tok(TokenType::Identifier, lexeme, 1, column)]))
        };

        let mut rest = BoolExpr::new(BoolOperand::Expr(path("y", 14)));
        rest.negated = true;

        let mut expected = BoolExpr::new(BoolOperand::Expr(path("x", 1)));
        expected.relation = Some(Relation {
            operator: tok(TokenType::Less, "<", 1, 3),
            right: literal(TokenType::Int, "1", 5),
        });
        expected.connective = Some(Connective {
            operator: tok(TokenType::Or, "or", 1, 7),
            rest: Box::new(rest),
        });

        assert_eq!(condition, expected);
    }

    #[test]
    fn test_parse_double_not_nests_a_group() {
        let tokens = tokenize("not not x").unwrap();
        let condition = Parser::new(&tokens).bool_expression().unwrap();

        let mut inner = BoolExpr::new(BoolOperand::Expr(Expr::Simple(RValue::Path(vec![
            tok(TokenType::Identifier, "x", 1, 9),
        ]))));
        inner.negated = true;

        let mut expected = BoolExpr::new(BoolOperand::Group(Box::new(inner)));
        expected.negated = true;

        assert_eq!(condition, expected);
    }

    #[test]
    fn test_parse_call_and_new() {
        let program = parse("var p = new Point; foo(1, bar());").unwrap();

        let Stmt::VarDeclaration(decl) = &program.statements[0] else {
            panic!("Expected a variable declaration");
        };
        assert_eq!(
            decl.initializer,
            Expr::Simple(RValue::New(tok(TokenType::Identifier, "Point", 1, 13)))
        );

        let Stmt::Expr(Expr::Simple(RValue::Call(call))) = &program.statements[1] else {
            panic!("Expected a call statement, got {:?}", program.statements[1]);
        };
        assert_eq!(call.callee.lexeme, "foo");
        assert_eq!(call.arguments.len(), 2);
    }

    #[test]
    fn test_syntax_errors() {
        for (source, message, position) in [
            ("var x = 1", "expected ';' but found ''", (1, 10)),
            ("set = 1;", "expected identifier but found '='", (1, 5)),
            ("while x then end", "expected 'do' but found 'then'", (1, 9)),
            ("fun int (a: int) end", "expected function name but found '('", (1, 9)),
            ("end", "expected statement but found 'end'", (1, 1)),
        ] {
            let error = parse(source).unwrap_err();
            assert_eq!(error.kind, ErrorKind::Syntax);
            assert_eq!(error.message, message, "source {:?}", source);
            assert_eq!((error.line, error.column), position, "source {:?}", source);
        }
    }
}
