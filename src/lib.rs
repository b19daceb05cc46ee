pub mod ast;
pub mod ast_printer;
pub mod diagnostics;
pub mod environment;
pub mod error;
pub mod host;
pub mod interpreter;
pub mod native;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod session;
pub mod token;
pub mod value;
