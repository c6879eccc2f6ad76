//! Index engine for testscope
//!
//! - **Arc-wrapped immutable graph**: built once per invocation, cheap to share
//! - **Builder stage**: the only place edges are added or merged
//! - **Analyzer**: scan, parse, resolve and select in one pass

pub mod analyzer;
pub mod builder;
pub mod graph;

pub use analyzer::{Analysis, Analyzer, ProjectIndex};
pub use builder::DependencyGraphBuilder;
pub use graph::DependencyGraph;
