use super::lexer::Token;

///
/// Statements
///

/// An ordered sequence of statements; each list executes in its own scope.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StmtList {
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expr(Expr),
    VarDeclaration(VarDeclarationStmt),
    Assignment(AssignmentStmt),
    StructDeclaration(StructDeclarationStmt),
    FunctionDeclaration(FunctionDeclarationStmt),
    Return(ReturnStmt),
    While(WhileStmt),
    If(IfStmt),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDeclarationStmt {
    pub name: Token,
    pub ty: Option<Token>, // primitive type keyword or struct name
    pub initializer: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentStmt {
    pub target: LValue,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructDeclarationStmt {
    pub name: Token,
    pub fields: Vec<VarDeclarationStmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: Token,
    pub ty: Token,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDeclarationStmt {
    pub name: Token,
    pub parameters: Vec<Parameter>,
    pub return_ty: Token, // `nil` when the function yields no value
    pub body: StmtList,
}

impl FunctionDeclarationStmt {
    pub fn returns_nothing(&self) -> bool {
        self.return_ty.ty == super::lexer::TokenType::Nil
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStmt {
    pub value: Option<Expr>,
    pub keyword: Token, // for diagnostics on `return;`
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStmt {
    pub condition: BoolExpr,
    pub body: StmtList,
}

/// A condition with the body it guards.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalBlock {
    pub condition: BoolExpr,
    pub body: StmtList,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub then_branch: ConditionalBlock,
    pub elif_branches: Vec<ConditionalBlock>,
    pub else_branch: Option<StmtList>,
}

///
/// Expressions
///

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Simple(RValue),
    Complex(ComplexExpr),
}

/// `left <op> right`, where `right` holds the rest of the chain, so
/// `a - b - c` is `a - (b - c)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexExpr {
    pub left: Box<Expr>,
    pub operator: Token,
    pub right: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoolOperand {
    Expr(Expr),
    /// A parenthesized condition followed by a connective, or the inner
    /// operand of a double `not`.
    Group(Box<BoolExpr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    pub operator: Token,
    pub right: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Connective {
    pub operator: Token, // `and` / `or`
    pub rest: Box<BoolExpr>,
}

/// Evaluated as: relation first, then the connective, then negation.
#[derive(Debug, Clone, PartialEq)]
pub struct BoolExpr {
    pub first: BoolOperand,
    pub relation: Option<Relation>,
    pub connective: Option<Connective>,
    pub negated: bool,
}

impl BoolExpr {
    pub fn new(first: BoolOperand) -> Self {
        Self {
            first,
            relation: None,
            connective: None,
            negated: false,
        }
    }
}

/// Assignment target: one identifier, or a field path through struct values.
#[derive(Debug, Clone, PartialEq)]
pub struct LValue {
    pub path: Vec<Token>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    pub callee: Token,
    pub arguments: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RValue {
    Literal(Token),
    New(Token),
    Call(CallExpr),
    Path(Vec<Token>),
}
