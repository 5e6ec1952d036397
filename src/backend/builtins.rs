use std::io::{BufRead, Write};

use tracing::trace;

use super::interpreter::Interpreter;
use crate::{
    common::{
        error::{Error, Result},
        value::Value,
    },
    frontend::lexer::Token,
};

pub const BUILTINS: [&str; 11] = [
    "print", "length", "get", "reads", "readi", "readf", "itof", "itos", "ftos", "stoi", "stof",
];

pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

fn arity(name: &str) -> usize {
    match name {
        "get" => 2,
        "reads" | "readi" | "readf" => 0,
        _ => 1,
    }
}

impl<R: BufRead, W: Write> Interpreter<R, W> {
    /// Calls a built-in with already evaluated arguments.
    pub(super) fn call_builtin(&mut self, callee: &Token, arguments: Vec<Value>) -> Result<Value> {
        let name = callee.lexeme.as_str();
        let error = |message: &str| Error::runtime(message, callee);

        if arguments.len() != arity(name) {
            return Err(Error::runtime(
                format!(
                    "'{}' expects {} arguments but got {}",
                    name,
                    arity(name),
                    arguments.len()
                ),
                callee,
            ));
        }

        if arguments.iter().any(Value::is_nil) {
            return Err(error("NIL value found in argument"));
        }

        trace!(name, "calling builtin");

        match (name, arguments.as_slice()) {
            ("print", [Value::String(text)]) => {
                let text = text.replace("\\n", "\n");
                self.output
                    .write_all(text.as_bytes())
                    .and_then(|_| self.output.flush())
                    .map_err(|e| error(&format!("failed to write output: {e}")))?;
                Ok(Value::Nil)
            }
            ("print", _) => Err(error("print expects a string argument")),

            ("length", [Value::String(text)]) => Ok(Value::Int(text.chars().count() as i64)),
            ("length", _) => Err(error("length expects a string argument")),

            ("get", [Value::Int(index), Value::String(text)]) => usize::try_from(*index)
                .ok()
                .and_then(|index| text.chars().nth(index))
                .map(Value::string)
                .ok_or_else(|| error("Out of range Error")),
            ("get", _) => Err(error("get expects an int index and a string")),

            ("reads", []) => Ok(Value::string(self.read_line(callee)?)),
            ("readi", []) => self
                .read_line(callee)?
                .trim()
                .parse()
                .map(Value::Int)
                .map_err(|_| error("bad int value")),
            ("readf", []) => self
                .read_line(callee)?
                .trim()
                .parse()
                .map(Value::Float)
                .map_err(|_| error("bad float value")),

            ("itof" | "stof", [Value::Int(n)]) => Ok(Value::Float(*n as f64)),
            ("itof" | "stof", [Value::Float(n)]) => Ok(Value::Float(*n)),
            ("itof" | "stof", [Value::String(text)]) => text
                .trim()
                .parse()
                .map(Value::Float)
                .map_err(|_| error("bad float value")),
            ("itof" | "stof", _) => Err(error("bad float value")),

            ("stoi", [Value::Int(n)]) => Ok(Value::Int(*n)),
            ("stoi", [Value::Float(n)]) if n.is_finite() => Ok(Value::Int(n.trunc() as i64)),
            ("stoi", [Value::String(text)]) => text
                .trim()
                .parse()
                .map(Value::Int)
                .map_err(|_| error("bad int value")),
            ("stoi", _) => Err(error("bad int value")),

            ("itos" | "ftos", [value @ (Value::Int(_) | Value::Float(_) | Value::Bool(_))]) => {
                Ok(Value::string(value.to_string()))
            }
            ("itos" | "ftos", [Value::String(text)]) => Ok(Value::String(text.clone())),
            ("itos" | "ftos", _) => Err(error("bad string value")),

            _ => Err(error(&format!("unknown builtin '{name}'"))),
        }
    }

    // one line without its terminator
    fn read_line(&mut self, callee: &Token) -> Result<String> {
        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .map_err(|e| Error::runtime(format!("failed to read input: {e}"), callee))?;

        if read == 0 {
            return Err(Error::runtime("end of input", callee));
        }

        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }

        Ok(line)
    }
}
