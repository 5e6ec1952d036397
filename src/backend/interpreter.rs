use std::{
    io::{self, BufRead, StdinLock, Stdout, Write},
    rc::Rc,
};

use tracing::{debug, instrument, trace};

use super::{
    builtins,
    heap::{Heap, Record},
};
use crate::{
    common::{
        environment::{EnvId, Environment},
        error::{Error, Result},
        value::Value,
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

/// What a name is bound to at runtime. Declarations remember the frame that
/// was active when they were declared.
#[derive(Debug, Clone)]
enum Binding {
    Value(Value),
    Function {
        decl: Rc<FunctionDeclarationStmt>,
        env: Option<EnvId>,
    },
    Struct {
        decl: Rc<StructDeclarationStmt>,
        env: Option<EnvId>,
    },
}

/// Tree-walking evaluator. Built-in I/O goes through `input` and `output` only.
pub struct Interpreter<R, W> {
    environment: Environment<Binding>,
    heap: Heap,
    pub(super) input: R,
    pub(super) output: W,
}

impl Interpreter<StdinLock<'static>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Interpreter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            environment: Environment::new(),
            heap: Heap::new(),
            input,
            output,
        }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Executes a program. A top-level `return` stops the run without error.
    #[instrument(skip_all)]
    pub fn run(&mut self, program: &StmtList) -> Result<()> {
        if let Flow::Return(value) = self.visit_stmt_list(program)? {
            debug!(%value, "returned from top level");
        }

        debug!(structs = self.heap.len(), "run finished");
        Ok(())
    }

    fn lookup(&self, name: &Token) -> Result<&Binding> {
        self.environment
            .get(&name.lexeme)
            .ok_or_else(|| Error::runtime(format!("undeclared variable '{}'", name.lexeme), name))
    }

    fn variable(&self, name: &Token) -> Result<Value> {
        match self.lookup(name)? {
            Binding::Value(value) => Ok(value.clone()),
            _ => Err(Error::runtime(
                format!("'{}' is not a variable", name.lexeme),
                name,
            )),
        }
    }

    fn field(&self, base: &Value, field: &Token) -> Result<Value> {
        let Value::Struct(handle) = base else {
            return Err(Error::runtime(
                format!(
                    "cannot access field '{}' of {} value",
                    field.lexeme,
                    base.type_name()
                ),
                field,
            ));
        };

        self.heap
            .field(*handle, &field.lexeme)
            .cloned()
            .ok_or_else(|| Error::runtime(format!("undeclared field '{}'", field.lexeme), field))
    }

    // reads `a.b.c` by following handles through the heap
    fn resolve_path(&self, path: &[Token]) -> Result<Value> {
        let Some((first, fields)) = path.split_first() else {
            return Ok(Value::Nil);
        };

        let mut value = self.variable(first)?;
        for field in fields {
            value = self.field(&value, field)?;
        }

        Ok(value)
    }

    fn assign_path(&mut self, path: &[Token], value: Value) -> Result<()> {
        let Some((last, prefix)) = path.split_last() else {
            return Ok(());
        };

        if prefix.is_empty() {
            self.variable(last)?;
            self.environment.assign(&last.lexeme, Binding::Value(value));
            return Ok(());
        }

        let Value::Struct(handle) = self.resolve_path(prefix)? else {
            return Err(Error::runtime(
                format!("cannot assign field '{}' of a non-struct value", last.lexeme),
                last,
            ));
        };

        if self.heap.set_field(handle, &last.lexeme, value) {
            Ok(())
        } else {
            Err(Error::runtime(
                format!("undeclared field '{}'", last.lexeme),
                last,
            ))
        }
    }

    /// Runs `body` in a fresh frame whose parent is `env`, then restores the
    /// caller's active frame whether or not `body` failed.
    fn with_frame_in<T>(
        &mut self,
        env: Option<EnvId>,
        body: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let caller = self.environment.active_env();
        self.environment.set_active_env(env);
        self.environment.push_environment();

        let result = body(self);

        self.environment.pop_environment();
        self.environment.set_active_env(caller);
        result
    }

    #[instrument(skip_all, fields(function = %callee.lexeme))]
    fn call_function(&mut self, callee: &Token, arguments: Vec<Value>) -> Result<Value> {
        let (decl, env) = match self.environment.get(&callee.lexeme) {
            Some(Binding::Function { decl, env }) => (Rc::clone(decl), *env),
            _ => {
                return Err(Error::runtime(
                    format!("undeclared function '{}'", callee.lexeme),
                    callee,
                ));
            }
        };

        if decl.parameters.len() != arguments.len() {
            return Err(Error::runtime(
                format!(
                    "'{}' expects {} arguments but got {}",
                    callee.lexeme,
                    decl.parameters.len(),
                    arguments.len()
                ),
                callee,
            ));
        }

        debug!(arguments = arguments.len(), "calling function");

        let flow = self.with_frame_in(env, |this| {
            for (parameter, argument) in decl.parameters.iter().zip(arguments) {
                this.environment.declare(&parameter.name.lexeme, Binding::Value(argument));
            }

            this.visit_stmt_list(&decl.body)
        })?;

        if decl.returns_nothing() {
            return Ok(Value::Nil);
        }

        Ok(match flow {
            Flow::Return(value) => value,
            Flow::Normal => Value::Nil,
        })
    }

    #[instrument(skip_all, fields(name = %name.lexeme))]
    fn instantiate(&mut self, name: &Token) -> Result<Value> {
        let (decl, env) = match self.environment.get(&name.lexeme) {
            Some(Binding::Struct { decl, env }) => (Rc::clone(decl), *env),
            _ => {
                return Err(Error::runtime(
                    format!("undeclared struct '{}'", name.lexeme),
                    name,
                ));
            }
        };

        // fields are evaluated in order; later initializers see earlier fields
        let record = self.with_frame_in(env, |this| {
            let mut record = Record::new();
            for field in &decl.fields {
                let value = this.visit_expr(&field.initializer)?;
                this.environment.declare(&field.name.lexeme, Binding::Value(value.clone()));
                record.insert(field.name.lexeme.clone(), value);
            }

            Ok(record)
        })?;

        let handle = self.heap.allocate(record);
        trace!(handle = handle.0, "allocated struct");
        Ok(Value::Struct(handle))
    }

    fn compare(&self, left: &Value, operator: &Token, right: &Value) -> Result<bool> {
        let ordering = || {
            left.partial_cmp(right).ok_or_else(|| {
                Error::runtime(
                    format!(
                        "cannot compare {} and {} with '{}'",
                        left.type_name(),
                        right.type_name(),
                        operator.lexeme
                    ),
                    operator,
                )
            })
        };

        Ok(match operator.ty {
            TokenType::EqualEqual => left == right,
            TokenType::BangEqual => left != right,
            TokenType::Less => ordering()?.is_lt(),
            TokenType::LessEqual => ordering()?.is_le(),
            TokenType::Greater => ordering()?.is_gt(),
            TokenType::GreaterEqual => ordering()?.is_ge(),
            _ => {
                return Err(Error::runtime(
                    format!("unknown relational operator '{}'", operator.lexeme),
                    operator,
                ));
            }
        })
    }
}

impl<R: BufRead, W: Write> Visitor for Interpreter<R, W> {
    type Value = Value;
    type Error = Error;

    fn visit_stmt_list(&mut self, list: &StmtList) -> Result<Flow<Value>> {
        self.environment.push_environment();
        let flow = walk_stmt_list(self, list);
        self.environment.pop_environment();
        flow
    }

    fn visit_var_declaration(&mut self, stmt: &VarDeclarationStmt) -> Result<Flow<Value>> {
        let value = self.visit_expr(&stmt.initializer)?;
        self.environment.declare(&stmt.name.lexeme, Binding::Value(value));
        Ok(Flow::Normal)
    }

    fn visit_assignment(&mut self, stmt: &AssignmentStmt) -> Result<Flow<Value>> {
        let value = self.visit_expr(&stmt.value)?;
        self.assign_path(&stmt.target.path, value)?;
        Ok(Flow::Normal)
    }

    fn visit_struct_declaration(&mut self, stmt: &StructDeclarationStmt) -> Result<Flow<Value>> {
        let binding = Binding::Struct {
            decl: Rc::new(stmt.clone()),
            env: self.environment.active_env(),
        };
        self.environment.declare(&stmt.name.lexeme, binding);
        Ok(Flow::Normal)
    }

    fn visit_function_declaration(
        &mut self,
        stmt: &FunctionDeclarationStmt,
    ) -> Result<Flow<Value>> {
        let binding = Binding::Function {
            decl: Rc::new(stmt.clone()),
            env: self.environment.active_env(),
        };
        self.environment.declare(&stmt.name.lexeme, binding);
        Ok(Flow::Normal)
    }

    fn visit_return(&mut self, stmt: &ReturnStmt) -> Result<Flow<Value>> {
        let value = match &stmt.value {
            Some(expr) => self.visit_expr(expr)?,
            None => Value::Nil,
        };

        Ok(Flow::Return(value))
    }

    fn visit_while(&mut self, stmt: &WhileStmt) -> Result<Flow<Value>> {
        while self.visit_bool_expr(&stmt.condition)?.is_truthy() {
            if let Flow::Return(value) = self.visit_stmt_list(&stmt.body)? {
                return Ok(Flow::Return(value));
            }
        }

        Ok(Flow::Normal)
    }

    fn visit_if(&mut self, stmt: &IfStmt) -> Result<Flow<Value>> {
        let branches = std::iter::once(&stmt.then_branch).chain(&stmt.elif_branches);
        for branch in branches {
            if self.visit_bool_expr(&branch.condition)?.is_truthy() {
                return self.visit_stmt_list(&branch.body);
            }
        }

        match &stmt.else_branch {
            Some(body) => self.visit_stmt_list(body),
            None => Ok(Flow::Normal),
        }
    }

    fn visit_complex_expr(&mut self, expr: &ComplexExpr) -> Result<Value> {
        let left = self.visit_expr(&expr.left)?;
        let right = self.visit_expr(&expr.right)?;

        let result = match expr.operator.ty {
            TokenType::Plus => left + right,
            TokenType::Minus => left - right,
            TokenType::Star => left * right,
            TokenType::Slash => left / right,
            TokenType::Percent => left % right,
            _ => Err(format!(
                "unknown arithmetic operator '{}'",
                expr.operator.lexeme
            )),
        };

        result.map_err(|message| Error::runtime(message, &expr.operator))
    }

    fn visit_bool_expr(&mut self, expr: &BoolExpr) -> Result<Value> {
        let mut result = self.visit_bool_operand(&expr.first)?;

        if let Some(relation) = &expr.relation {
            let right = self.visit_expr(&relation.right)?;
            result = Value::Bool(self.compare(&result, &relation.operator, &right)?);
        }

        if let Some(connective) = &expr.connective {
            let left = result.is_truthy();
            let combined = match connective.operator.ty {
                TokenType::And => left && self.visit_bool_expr(&connective.rest)?.is_truthy(),
                _ => left || self.visit_bool_expr(&connective.rest)?.is_truthy(),
            };
            result = Value::Bool(combined);
        }

        if expr.negated {
            result = Value::Bool(!result.is_truthy());
        }

        Ok(result)
    }

    fn visit_literal(&mut self, literal: &Token) -> Result<Value> {
        match literal.ty {
            TokenType::Int => literal
                .lexeme
                .parse()
                .map(Value::Int)
                .map_err(|_| Error::runtime("invalid number value", literal)),
            TokenType::Float => literal
                .lexeme
                .parse()
                .map(Value::Float)
                .map_err(|_| Error::runtime("invalid float value", literal)),
            TokenType::Bool => Ok(Value::Bool(literal.lexeme == "true")),
            TokenType::String => Ok(Value::string(literal.lexeme.as_str())),
            _ => Ok(Value::Nil),
        }
    }

    fn visit_new(&mut self, struct_name: &Token) -> Result<Value> {
        self.instantiate(struct_name)
    }

    fn visit_call(&mut self, call: &CallExpr) -> Result<Value> {
        let arguments = call
            .arguments
            .iter()
            .map(|argument| self.visit_expr(argument))
            .collect::<Result<Vec<_>>>()?;

        if builtins::is_builtin(&call.callee.lexeme) {
            self.call_builtin(&call.callee, arguments)
        } else {
            self.call_function(&call.callee, arguments)
        }
    }

    fn visit_path(&mut self, path: &[Token]) -> Result<Value> {
        self.resolve_path(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{common::error::ErrorKind, frontend::parser::parse};

    fn run_with_input(source: &str, input: &str) -> Result<String> {
        let program = parse(source)?;
        let mut interpreter = Interpreter::new(input.as_bytes(), Vec::new());
        interpreter.run(&program)?;
        Ok(String::from_utf8_lossy(&interpreter.into_output()).into_owned())
    }

    fn run(source: &str) -> Result<String> {
        run_with_input(source, "")
    }

    #[test]
    fn test_print_and_arithmetic() {
        let output = run("var x: int = 2; var y: int = 3; print(itos(x+y));").unwrap();
        assert_eq!(output, "5");
    }

    #[test]
    fn test_right_associative_subtraction() {
        let output = run("print(itos(10 - 3 - 2));").unwrap();
        assert_eq!(output, "9");
    }

    #[test]
    fn test_parenthesized_left_operand() {
        let output = run("print(itos((10 - 3) - 2));").unwrap();
        assert_eq!(output, "5");
    }

    #[test]
    fn test_recursion() {
        let source = r#"
            fun int fact(n: int)
                if n <= 1 then return 1; else return n * fact(n - 1); end
            end
            print(itos(fact(5)));
        "#;
        assert_eq!(run(source).unwrap(), "120");
    }

    #[test]
    fn test_return_unwinds_through_loops() {
        let source = r#"
            fun int first_over(limit: int)
                var i: int = 0;
                while true do
                    if i > limit then return i; end
                    set i = i + 1;
                end
                return 0 - 1;
            end
            print(itos(first_over(3)));
        "#;
        assert_eq!(run(source).unwrap(), "4");
    }

    #[test]
    fn test_nil_function_yields_nil() {
        let source = r#"
            fun nil shout(s: string)
                print(s);
                return 5;
            end
            var r = shout("hi");
            if r == nil then print(" nil"); end
        "#;
        assert_eq!(run(source).unwrap(), "hi nil");
    }

    #[test]
    fn test_function_does_not_see_caller_locals() {
        let source = r#"
            fun int peek()
                return hidden;
            end
            fun int caller()
                var hidden: int = 1;
                return peek();
            end
            caller();
        "#;
        let error = run(source).unwrap_err();
        assert_eq!(error.kind, ErrorKind::Runtime);
        assert_eq!(error.message, "undeclared variable 'hidden'");
    }

    #[test]
    fn test_function_sees_globals() {
        let source = r#"
            var g: int = 7;
            fun int read_global()
                return g;
            end
            print(itos(read_global()));
        "#;
        assert_eq!(run(source).unwrap(), "7");
    }

    #[test]
    fn test_struct_aliasing() {
        let source = r#"
            struct Point var x: int = 0; var y: int = 0; end
            var p: Point = new Point;
            var q: Point = p;
            set q.x = 10;
            print(itos(p.x));
        "#;
        assert_eq!(run(source).unwrap(), "10");
    }

    #[test]
    fn test_struct_fields_see_earlier_fields() {
        let source = r#"
            struct Pair var a: int = 2; var b: int = a * 3; end
            var p: Pair = new Pair;
            print(itos(p.b));
        "#;
        assert_eq!(run(source).unwrap(), "6");
    }

    #[test]
    fn test_nested_field_path() {
        let source = r#"
            struct Node var value: int = 0; var next: Node = nil; end
            var head: Node = new Node;
            set head.next = new Node;
            set head.next.value = 42;
            print(itos(head.next.value));
        "#;
        assert_eq!(run(source).unwrap(), "42");
    }

    #[test]
    fn test_field_of_nil_is_an_error() {
        let source = r#"
            struct Node var next: Node = nil; end
            var n: Node = new Node;
            print(itos(n.next.value));
        "#;
        let error = run(source).unwrap_err();
        assert_eq!(error.message, "cannot access field 'value' of nil value");
    }

    #[test]
    fn test_exactly_one_branch_runs() {
        let source = r#"
            if false then print("W");
            elif true then print("X");
            elif true then print("Y");
            else print("Z");
            end
        "#;
        assert_eq!(run(source).unwrap(), "X");
    }

    #[test]
    fn test_short_circuit_skips_right_side() {
        // the right-hand side would fail if evaluated
        let source = r#"
            if false and 1 / 0 == 0 then print("bad"); end
            if true or 1 / 0 == 0 then print("ok"); end
        "#;
        assert_eq!(run(source).unwrap(), "ok");
    }

    #[test]
    fn test_negation_applies_last() {
        let source = r#"
            if not 1 == 2 then print("a"); end
            if not (true and false) then print("b"); end
        "#;
        assert_eq!(run(source).unwrap(), "ab");
    }

    #[test]
    fn test_while_loop() {
        let source = r#"
            var i: int = 0;
            var total: int = 0;
            while i < 5 do
                set total = total + i;
                set i = i + 1;
            end
            print(itos(total));
        "#;
        assert_eq!(run(source).unwrap(), "10");
    }

    #[test]
    fn test_division_by_zero_is_positioned() {
        let error = run("var x = 1 / 0;").unwrap_err();
        assert_eq!(error.message, "division by zero");
        assert_eq!((error.line, error.column), (1, 11));
    }

    #[test]
    fn test_top_level_return_stops_run() {
        let output = run(r#"print("a"); return; print("b");"#).unwrap();
        assert_eq!(output, "a");
    }

    #[test]
    fn test_reads_input_lines() {
        let source = r#"
            var name = reads();
            var n = readi();
            print(name + " " + itos(n * 2));
        "#;
        assert_eq!(run_with_input(source, "ann\n21\n").unwrap(), "ann 42");
    }
}
