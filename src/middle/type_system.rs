use tracing::{debug, instrument, trace};

use super::types::{FunctionType, StructType, Type};
use crate::{
    common::{
        environment::Environment,
        error::{Error, Result},
    },
    frontend::{
        ast::{
            AssignmentStmt, BoolExpr, CallExpr, ComplexExpr, FunctionDeclarationStmt, IfStmt,
            ReturnStmt, StmtList, StructDeclarationStmt, VarDeclarationStmt, WhileStmt,
        },
        lexer::{Token, TokenType},
        visitor::{Flow, Visitor, walk_stmt_list},
    },
};

// name of the binding holding the enclosing function's return type
const RETURN: &str = "return";

/// Static checks over a parsed program. Optional: the default run goes
/// straight from the parser to the interpreter.
#[derive(Debug)]
pub struct TypeChecker {
    environment: Environment<Type>,
}

impl Default for TypeChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeChecker {
    pub fn new() -> Self {
        let mut checker = Self {
            environment: Environment::new(),
        };

        // global frame: top-level `return` and the built-ins
        checker.environment.push_environment();
        checker.environment.declare(RETURN, Type::Int);

        let natives = [
            ("print", vec![Type::String], Type::Nil),
            ("length", vec![Type::String], Type::Int),
            ("reads", vec![], Type::String),
            ("readi", vec![], Type::Int),
            ("readf", vec![], Type::Float),
            ("get", vec![Type::Int, Type::String], Type::String),
            ("itos", vec![Type::Int], Type::String),
            ("itof", vec![Type::Int], Type::Float),
            ("ftos", vec![Type::Float], Type::String),
            ("stoi", vec![Type::String], Type::Int),
            ("stof", vec![Type::String], Type::Float),
        ];

        for (name, parameters, ret_ty) in natives {
            checker.register_native(name, FunctionType::new(parameters, ret_ty));
        }

        checker
    }

    pub fn register_native(&mut self, name: &str, ty: FunctionType) {
        self.environment.declare(name, Type::Function(ty));
    }

    #[instrument(skip_all)]
    pub fn check(&mut self, program: &StmtList) -> Result<()> {
        self.visit_stmt_list(program)?;
        debug!("program type checked");
        Ok(())
    }

    fn struct_type(&self, name: &Token) -> Result<StructType> {
        match self.environment.get(&name.lexeme) {
            Some(Type::StructDef(struct_type)) => Ok(struct_type.clone()),
            _ => Err(Error::type_error(
                format!("struct type '{}' not declared", name.lexeme),
                name,
            )),
        }
    }

    /// Maps a type annotation to a type. Struct names must be declared.
    fn resolve_annotation(&self, annotation: &Token) -> Result<Type> {
        Ok(match annotation.ty {
            TokenType::IntType => Type::Int,
            TokenType::FloatType => Type::Float,
            TokenType::BoolType => Type::Bool,
            TokenType::StringType => Type::String,
            TokenType::Nil => Type::Nil,
            _ => Type::Struct(self.struct_type(annotation)?.name),
        })
    }

    fn variable(&self, name: &Token) -> Result<Type> {
        match self.environment.get(&name.lexeme) {
            Some(ty) if ty.is_value() => Ok(ty.clone()),
            Some(_) => Err(Error::type_error(
                format!("'{}' is not a variable", name.lexeme),
                name,
            )),
            None => Err(Error::type_error(
                format!("undeclared identifier '{}'", name.lexeme),
                name,
            )),
        }
    }

    // follows `a.b.c` through the declared struct field types
    fn resolve_path(&self, path: &[Token]) -> Result<Type> {
        let Some((first, fields)) = path.split_first() else {
            return Ok(Type::Nil);
        };

        let mut ty = self.variable(first)?;
        for field in fields {
            let Type::Struct(struct_name) = &ty else {
                return Err(Error::type_error(
                    format!("cannot access field '{}' of type {}", field.lexeme, ty),
                    field,
                ));
            };

            let struct_type = match self.environment.get(struct_name) {
                Some(Type::StructDef(struct_type)) => struct_type,
                _ => {
                    return Err(Error::type_error(
                        format!("struct type '{}' not declared", struct_name),
                        field,
                    ));
                }
            };

            ty = struct_type.field(&field.lexeme).cloned().ok_or_else(|| {
                Error::type_error(
                    format!(
                        "struct '{}' has no field '{}'",
                        struct_type.name, field.lexeme
                    ),
                    field,
                )
            })?;
        }

        Ok(ty)
    }

    /// Checks a declaration, binds the variable in the active frame and
    /// returns its type.
    fn declare_variable(&mut self, stmt: &VarDeclarationStmt) -> Result<Type> {
        let initializer = self.visit_expr(&stmt.initializer)?;

        let ty = match &stmt.ty {
            Some(annotation) => {
                let declared = self.resolve_annotation(annotation)?;
                if !declared.accepts(&initializer) {
                    return Err(Error::type_error(
                        format!(
                            "mismatched type in declaration of '{}': expected {} but found {}",
                            stmt.name.lexeme, declared, initializer
                        ),
                        &stmt.name,
                    ));
                }
                declared
            }
            None if initializer == Type::Nil => {
                return Err(Error::type_error(
                    format!("cannot infer type of '{}' from nil", stmt.name.lexeme),
                    &stmt.name,
                ));
            }
            None => initializer,
        };

        trace!(name = %stmt.name.lexeme, %ty, "declared variable");
        self.environment.declare(&stmt.name.lexeme, ty.clone());
        Ok(ty)
    }

    // fields share one frame, so later initializers see earlier fields
    fn declare_fields(&mut self, stmt: &StructDeclarationStmt) -> Result<Vec<(String, Type)>> {
        let mut fields = Vec::with_capacity(stmt.fields.len());
        for field in &stmt.fields {
            let ty = self.declare_variable(field)?;
            fields.push((field.name.lexeme.clone(), ty));
        }

        Ok(fields)
    }

    fn operand_mismatch(operator: &Token, left: &Type, right: &Type) -> Error {
        Error::type_error(
            format!(
                "mismatched operand types for '{}': {} and {}",
                operator.lexeme, left, right
            ),
            operator,
        )
    }
}

impl Visitor for TypeChecker {
    type Value = Type;
    type Error = Error;

    fn visit_stmt_list(&mut self, list: &StmtList) -> Result<Flow<Type>> {
        self.environment.push_environment();
        let flow = walk_stmt_list(self, list);
        self.environment.pop_environment();
        flow
    }

    fn visit_var_declaration(&mut self, stmt: &VarDeclarationStmt) -> Result<Flow<Type>> {
        self.declare_variable(stmt)?;
        Ok(Flow::Normal)
    }

    fn visit_assignment(&mut self, stmt: &AssignmentStmt) -> Result<Flow<Type>> {
        let target = self.resolve_path(&stmt.target.path)?;
        let value = self.visit_expr(&stmt.value)?;

        if !target.accepts(&value) {
            let token = &stmt.target.path[0];
            return Err(Error::type_error(
                format!(
                    "mismatched type in assignment: expected {} but found {}",
                    target, value
                ),
                token,
            ));
        }

        Ok(Flow::Normal)
    }

    fn visit_struct_declaration(&mut self, stmt: &StructDeclarationStmt) -> Result<Flow<Type>> {
        let name = stmt.name.lexeme.clone();

        // visible to its own fields, e.g. `var next: Node = nil;`
        let mut struct_type = StructType {
            name: name.clone(),
            fields: Vec::new(),
        };
        self.environment.declare(&name, Type::StructDef(struct_type.clone()));

        self.environment.push_environment();
        let fields = self.declare_fields(stmt);
        self.environment.pop_environment();

        struct_type.fields = fields?;
        debug!(%name, fields = struct_type.fields.len(), "declared struct");
        self.environment.declare(&name, Type::StructDef(struct_type));
        Ok(Flow::Normal)
    }

    fn visit_function_declaration(&mut self, stmt: &FunctionDeclarationStmt) -> Result<Flow<Type>> {
        let ret_ty = self.resolve_annotation(&stmt.return_ty)?;
        let parameters = stmt
            .parameters
            .iter()
            .map(|parameter| self.resolve_annotation(&parameter.ty))
            .collect::<Result<Vec<_>>>()?;

        // bound before the body so the function can call itself
        let signature = FunctionType::new(parameters.clone(), ret_ty.clone());
        debug!(name = %stmt.name.lexeme, "declared function");
        self.environment.declare(&stmt.name.lexeme, Type::Function(signature));

        self.environment.push_environment();
        self.environment.declare(RETURN, ret_ty);
        for (parameter, ty) in stmt.parameters.iter().zip(parameters) {
            self.environment.declare(&parameter.name.lexeme, ty);
        }
        let body = self.visit_stmt_list(&stmt.body);
        self.environment.pop_environment();

        body.map(|_| Flow::Normal)
    }

    fn visit_return(&mut self, stmt: &ReturnStmt) -> Result<Flow<Type>> {
        let value = match &stmt.value {
            Some(expr) => self.visit_expr(expr)?,
            None => Type::Nil,
        };

        let expected = self
            .environment
            .get(RETURN)
            .cloned()
            .unwrap_or(Type::Int);

        if !expected.accepts(&value) {
            return Err(Error::type_error(
                format!(
                    "mismatched return type: expected {} but found {}",
                    expected, value
                ),
                &stmt.keyword,
            ));
        }

        // every statement is checked, so a return does not cut the list short
        Ok(Flow::Normal)
    }

    fn visit_while(&mut self, stmt: &WhileStmt) -> Result<Flow<Type>> {
        self.visit_bool_expr(&stmt.condition)?;
        self.visit_stmt_list(&stmt.body)
    }

    fn visit_if(&mut self, stmt: &IfStmt) -> Result<Flow<Type>> {
        let branches = std::iter::once(&stmt.then_branch).chain(&stmt.elif_branches);
        for branch in branches {
            self.visit_bool_expr(&branch.condition)?;
            self.visit_stmt_list(&branch.body)?;
        }

        if let Some(body) = &stmt.else_branch {
            self.visit_stmt_list(body)?;
        }

        Ok(Flow::Normal)
    }

    fn visit_complex_expr(&mut self, expr: &ComplexExpr) -> Result<Type> {
        let left = self.visit_expr(&expr.left)?;
        let right = self.visit_expr(&expr.right)?;
        let operator = &expr.operator;

        let allowed = match operator.ty {
            TokenType::Plus => matches!(left, Type::Int | Type::Float | Type::String),
            TokenType::Minus | TokenType::Star | TokenType::Slash => left.is_numeric(),
            TokenType::Percent => left == Type::Int,
            _ => {
                return Err(Error::type_error(
                    format!("unknown arithmetic operator '{}'", operator.lexeme),
                    operator,
                ));
            }
        };

        if !allowed || left != right {
            return Err(Self::operand_mismatch(operator, &left, &right));
        }

        Ok(left)
    }

    fn visit_bool_expr(&mut self, expr: &BoolExpr) -> Result<Type> {
        let left = self.visit_bool_operand(&expr.first)?;

        if let Some(relation) = &expr.relation {
            let right = self.visit_expr(&relation.right)?;
            let operator = &relation.operator;

            let allowed = match operator.ty {
                TokenType::EqualEqual | TokenType::BangEqual => {
                    left == right || left == Type::Nil || right == Type::Nil
                }
                _ => {
                    left == right
                        && matches!(left, Type::String | Type::Int | Type::Float | Type::Bool)
                }
            };

            if !allowed {
                return Err(Self::operand_mismatch(operator, &left, &right));
            }
        }

        if let Some(connective) = &expr.connective {
            let rest = self.visit_bool_expr(&connective.rest)?;
            if rest != Type::Bool {
                return Err(Error::type_error(
                    format!(
                        "expected bool after '{}' but found {}",
                        connective.operator.lexeme, rest
                    ),
                    &connective.operator,
                ));
            }
        }

        Ok(Type::Bool)
    }

    fn visit_literal(&mut self, literal: &Token) -> Result<Type> {
        Ok(match literal.ty {
            TokenType::Int => Type::Int,
            TokenType::Float => Type::Float,
            TokenType::Bool => Type::Bool,
            TokenType::String => Type::String,
            _ => Type::Nil,
        })
    }

    fn visit_new(&mut self, struct_name: &Token) -> Result<Type> {
        Ok(Type::Struct(self.struct_type(struct_name)?.name))
    }

    fn visit_call(&mut self, call: &CallExpr) -> Result<Type> {
        let callee = &call.callee;
        let signature = match self.environment.get(&callee.lexeme) {
            Some(Type::Function(signature)) => signature.clone(),
            Some(_) => {
                return Err(Error::type_error(
                    format!("'{}' is not a function", callee.lexeme),
                    callee,
                ));
            }
            None => {
                return Err(Error::type_error(
                    format!("undeclared function '{}'", callee.lexeme),
                    callee,
                ));
            }
        };

        if signature.parameters.len() != call.arguments.len() {
            return Err(Error::type_error(
                format!(
                    "'{}' expects {} arguments but got {}",
                    callee.lexeme,
                    signature.parameters.len(),
                    call.arguments.len()
                ),
                callee,
            ));
        }

        for (index, (parameter, argument)) in
            signature.parameters.iter().zip(&call.arguments).enumerate()
        {
            let argument = self.visit_expr(argument)?;
            if !parameter.accepts(&argument) {
                return Err(Error::type_error(
                    format!(
                        "mismatched argument {} of '{}': expected {} but found {}",
                        index + 1,
                        callee.lexeme,
                        parameter,
                        argument
                    ),
                    callee,
                ));
            }
        }

        Ok(*signature.ret_ty)
    }

    fn visit_path(&mut self, path: &[Token]) -> Result<Type> {
        self.resolve_path(path)
    }
}
