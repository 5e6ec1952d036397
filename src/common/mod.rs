pub mod environment;
pub mod error;
pub mod error_reporter;
pub mod value;
