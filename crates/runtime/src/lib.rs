use std::path::PathBuf;
use std::sync::Arc;
use testscope_core::config::AnalyzerConfig;
use testscope_core::engine::Analyzer;

/// Bootstraps an analyzer with every available language parser.
///
/// This function acts as the central factory for the testscope runtime,
/// assembling the core analyzer with language front-ends like Python.
pub fn build_default_analyzer(path: PathBuf, config: AnalyzerConfig) -> Analyzer {
    let mut analyzer = Analyzer::new(path, config);

    match testscope_python::PythonParser::new() {
        Ok(parser) => analyzer.register_parser(Arc::new(parser)),
        Err(e) => tracing::error!("Failed to load Python parser, falling back to all tests: {}", e),
    }

    analyzer
}

/// Initializes the logging system for a specific component.
/// This delegates to the core logging module.
pub fn init_logging(component: &str, verbose: bool) -> Option<impl Drop> {
    Some(testscope_core::logging::init_logging(component, verbose))
}
