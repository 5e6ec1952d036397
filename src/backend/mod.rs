pub mod builtins;
pub mod heap;
pub mod interpreter;
