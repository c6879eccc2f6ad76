pub mod parser;
pub mod queries;
mod utils;

pub use parser::PythonParser;
