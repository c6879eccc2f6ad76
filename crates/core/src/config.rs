//! Per-invocation analyzer configuration.
//!
//! An `AnalyzerConfig` is built once (from defaults, code, or a JSON file) and
//! handed by reference to every stage of the pipeline. Nothing mutates it after
//! construction.

use crate::error::{Result, TestscopeError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

const DEFAULT_EXCLUSIONS: &[&str] = &[
    "venv",
    ".venv",
    "build",
    "dist",
    ".git",
    "__pycache__",
    ".pytest_cache",
    ".mypy_cache",
    ".ruff_cache",
    "node_modules",
    ".tox",
];

const DEFAULT_TEST_PATTERNS: &[&str] = &["test_*", "*_test.py", "/tests/", "/test/"];

/// Matcher that decides whether a catalogued path is a test file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TestPattern {
    /// File name starts with the value (`test_*`).
    Prefix(String),
    /// File name ends with the value (`*_test.py`).
    Suffix(String),
    /// Value occurs in the directory portion written as `/dir/sub/` (`/tests/`).
    Directory(String),
    /// Value occurs anywhere in the file name.
    FileName(String),
}

impl TestPattern {
    /// Matches against a project-relative path using `/` separators.
    pub fn matches(&self, rel_path: &str) -> bool {
        let (dir, file_name) = match rel_path.rsplit_once('/') {
            Some((dir, name)) => (dir, name),
            None => ("", rel_path),
        };
        match self {
            TestPattern::Prefix(p) => file_name.starts_with(p.as_str()),
            TestPattern::Suffix(s) => file_name.ends_with(s.as_str()),
            TestPattern::Directory(d) => {
                let wrapped = if dir.is_empty() {
                    "/".to_string()
                } else {
                    format!("/{}/", dir)
                };
                wrapped.contains(d.as_str())
            }
            TestPattern::FileName(n) => file_name.contains(n.as_str()),
        }
    }
}

impl std::str::FromStr for TestPattern {
    type Err = TestscopeError;

    fn from_str(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() || raw == "*" {
            return Err(TestscopeError::Config(format!(
                "test pattern '{}' matches nothing useful",
                raw
            )));
        }
        if raw.starts_with('/') || raw.ends_with('/') {
            let inner = raw.trim_matches('/');
            return Ok(TestPattern::Directory(format!("/{}/", inner)));
        }
        if let Some(prefix) = raw.strip_suffix('*') {
            return Ok(TestPattern::Prefix(prefix.to_string()));
        }
        if let Some(suffix) = raw.strip_prefix('*') {
            return Ok(TestPattern::Suffix(suffix.to_string()));
        }
        Ok(TestPattern::FileName(raw.to_string()))
    }
}

impl TryFrom<String> for TestPattern {
    type Error = TestscopeError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<TestPattern> for String {
    fn from(pattern: TestPattern) -> Self {
        pattern.to_string()
    }
}

impl fmt::Display for TestPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestPattern::Prefix(p) => write!(f, "{}*", p),
            TestPattern::Suffix(s) => write!(f, "*{}", s),
            TestPattern::Directory(d) => write!(f, "{}", d),
            TestPattern::FileName(n) => write!(f, "{}", n),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Substrings; any path containing one is skipped before classification.
    pub exclusions: Vec<String>,
    pub test_patterns: Vec<TestPattern>,
    /// File extensions (without dot) that the catalog picks up.
    pub extensions: Vec<String>,
    /// File whose presence makes a directory a package.
    pub package_marker: String,
    /// Directories (relative to the project root) absolute imports are tried against, in order.
    /// The empty string is the project root itself.
    pub source_roots: Vec<String>,
    pub respect_gitignore: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            exclusions: DEFAULT_EXCLUSIONS.iter().map(|s| s.to_string()).collect(),
            test_patterns: DEFAULT_TEST_PATTERNS
                .iter()
                .filter_map(|p| p.parse().ok())
                .collect(),
            extensions: vec!["py".to_string()],
            package_marker: "__init__.py".to_string(),
            source_roots: vec![String::new()],
            respect_gitignore: true,
        }
    }
}

impl AnalyzerConfig {
    /// Loads a JSON config; missing fields fall back to the defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: AnalyzerConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_exclusions<I, S>(mut self, exclusions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclusions = exclusions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_test_patterns(mut self, patterns: Vec<TestPattern>) -> Self {
        self.test_patterns = patterns;
        self
    }

    pub fn with_source_roots<I, S>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.source_roots = roots
            .into_iter()
            .map(|r| r.into().trim_matches('/').to_string())
            .collect();
        self
    }

    pub fn with_gitignore(mut self, respect: bool) -> Self {
        self.respect_gitignore = respect;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.extensions.is_empty() {
            return Err(TestscopeError::Config(
                "at least one source extension is required".to_string(),
            ));
        }
        if self.package_marker.is_empty() || self.package_marker.contains('/') {
            return Err(TestscopeError::Config(format!(
                "package marker '{}' must be a plain file name",
                self.package_marker
            )));
        }
        if self.source_roots.is_empty() {
            return Err(TestscopeError::Config(
                "source_roots must contain at least the project root (\"\")".to_string(),
            ));
        }
        Ok(())
    }

    pub fn is_excluded(&self, rel_path: &str) -> bool {
        self.exclusions
            .iter()
            .any(|pattern| rel_path.contains(pattern.as_str()))
    }

    pub fn is_test(&self, rel_path: &str) -> bool {
        self.test_patterns.iter().any(|p| p.matches(rel_path))
    }

    pub fn has_source_extension(&self, rel_path: &str) -> bool {
        Path::new(rel_path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|ext| self.extensions.iter().any(|x| x == ext))
            .unwrap_or(false)
    }
}
