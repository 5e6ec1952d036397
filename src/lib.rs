pub mod backend;
pub mod common;
pub mod frontend;
pub mod middle;

pub use frontend::ast;
pub use frontend::lexer::{Lexer, Token, TokenType, tokenize};
pub use frontend::parser::{Parser, parse};
pub use frontend::scanner::Scanner;

pub use middle::type_system::TypeChecker;
pub use middle::types;

pub use backend::interpreter::Interpreter;

pub use common::error::{Error, ErrorKind, Result};
pub use common::error_reporter;
pub use common::value::Value;
