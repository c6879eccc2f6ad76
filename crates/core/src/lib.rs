pub mod change;
pub mod config;
pub mod diff;
pub mod engine;
pub mod error;
pub mod impact;
pub mod logging;
pub mod model;
pub mod parser;
pub mod project;
pub mod report;
pub mod resolver;

pub use error::Result;
