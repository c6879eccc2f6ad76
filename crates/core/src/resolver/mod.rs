//! Import resolution: import statements in, file-level edges out.

mod engine;

pub use engine::ImportResolver;
