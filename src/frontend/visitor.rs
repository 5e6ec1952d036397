use super::ast::{
    AssignmentStmt, BoolExpr, BoolOperand, CallExpr, ComplexExpr, Expr, FunctionDeclarationStmt,
    IfStmt, RValue, ReturnStmt, Stmt, StmtList, StructDeclarationStmt, VarDeclarationStmt,
    WhileStmt,
};
use super::lexer::Token;

/// Outcome of visiting a statement: either it completed, or a `return` is
/// unwinding towards the nearest call boundary carrying its value.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow<V> {
    Normal,
    Return(V),
}

/// A pass over the AST. Statement visits yield a [`Flow`], expression visits
/// yield the pass's `Value` (a runtime value, a type, ...).
pub trait Visitor: Sized {
    type Value;
    type Error;

    fn visit_stmt_list(&mut self, list: &StmtList) -> Result<Flow<Self::Value>, Self::Error>;

    fn visit_stmt(&mut self, stmt: &Stmt) -> Result<Flow<Self::Value>, Self::Error> {
        walk_stmt(self, stmt)
    }

    fn visit_expr_stmt(&mut self, expr: &Expr) -> Result<Flow<Self::Value>, Self::Error> {
        self.visit_expr(expr)?;
        Ok(Flow::Normal)
    }

    fn visit_var_declaration(
        &mut self,
        stmt: &VarDeclarationStmt,
    ) -> Result<Flow<Self::Value>, Self::Error>;

    fn visit_assignment(&mut self, stmt: &AssignmentStmt)
    -> Result<Flow<Self::Value>, Self::Error>;

    fn visit_struct_declaration(
        &mut self,
        stmt: &StructDeclarationStmt,
    ) -> Result<Flow<Self::Value>, Self::Error>;

    fn visit_function_declaration(
        &mut self,
        stmt: &FunctionDeclarationStmt,
    ) -> Result<Flow<Self::Value>, Self::Error>;

    fn visit_return(&mut self, stmt: &ReturnStmt) -> Result<Flow<Self::Value>, Self::Error>;

    fn visit_while(&mut self, stmt: &WhileStmt) -> Result<Flow<Self::Value>, Self::Error>;

    fn visit_if(&mut self, stmt: &IfStmt) -> Result<Flow<Self::Value>, Self::Error>;

    fn visit_expr(&mut self, expr: &Expr) -> Result<Self::Value, Self::Error> {
        walk_expr(self, expr)
    }

    fn visit_complex_expr(&mut self, expr: &ComplexExpr) -> Result<Self::Value, Self::Error>;

    fn visit_bool_expr(&mut self, expr: &BoolExpr) -> Result<Self::Value, Self::Error>;

    fn visit_bool_operand(&mut self, operand: &BoolOperand) -> Result<Self::Value, Self::Error> {
        walk_bool_operand(self, operand)
    }

    fn visit_rvalue(&mut self, rvalue: &RValue) -> Result<Self::Value, Self::Error> {
        walk_rvalue(self, rvalue)
    }

    fn visit_literal(&mut self, literal: &Token) -> Result<Self::Value, Self::Error>;

    fn visit_new(&mut self, struct_name: &Token) -> Result<Self::Value, Self::Error>;

    fn visit_call(&mut self, call: &CallExpr) -> Result<Self::Value, Self::Error>;

    fn visit_path(&mut self, path: &[Token]) -> Result<Self::Value, Self::Error>;
}

/// Visits each statement in order, stopping at the first one that returns.
pub fn walk_stmt_list<T: Visitor>(
    vis: &mut T,
    StmtList { statements }: &StmtList,
) -> Result<Flow<T::Value>, T::Error> {
    for stmt in statements {
        if let Flow::Return(value) = vis.visit_stmt(stmt)? {
            return Ok(Flow::Return(value));
        }
    }

    Ok(Flow::Normal)
}

pub fn walk_stmt<T: Visitor>(vis: &mut T, stmt: &Stmt) -> Result<Flow<T::Value>, T::Error> {
    match stmt {
        Stmt::Expr(expr) => vis.visit_expr_stmt(expr),
        Stmt::VarDeclaration(var_decl) => vis.visit_var_declaration(var_decl),
        Stmt::Assignment(assignment) => vis.visit_assignment(assignment),
        Stmt::StructDeclaration(struct_decl) => vis.visit_struct_declaration(struct_decl),
        Stmt::FunctionDeclaration(function_decl) => vis.visit_function_declaration(function_decl),
        Stmt::Return(ret) => vis.visit_return(ret),
        Stmt::While(while_stmt) => vis.visit_while(while_stmt),
        Stmt::If(if_stmt) => vis.visit_if(if_stmt),
    }
}

pub fn walk_expr<T: Visitor>(vis: &mut T, expr: &Expr) -> Result<T::Value, T::Error> {
    match expr {
        Expr::Simple(rvalue) => vis.visit_rvalue(rvalue),
        Expr::Complex(complex) => vis.visit_complex_expr(complex),
    }
}

pub fn walk_bool_operand<T: Visitor>(
    vis: &mut T,
    operand: &BoolOperand,
) -> Result<T::Value, T::Error> {
    match operand {
        BoolOperand::Expr(expr) => vis.visit_expr(expr),
        BoolOperand::Group(group) => vis.visit_bool_expr(group),
    }
}

pub fn walk_rvalue<T: Visitor>(vis: &mut T, rvalue: &RValue) -> Result<T::Value, T::Error> {
    match rvalue {
        RValue::Literal(token) => vis.visit_literal(token),
        RValue::New(struct_name) => vis.visit_new(struct_name),
        RValue::Call(call) => vis.visit_call(call),
        RValue::Path(path) => vis.visit_path(path),
    }
}
