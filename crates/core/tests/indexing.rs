use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;
use testscope_core::change::{ChangeRecord, ChangeSet, FileChange, Hunk, WholeReason};
use testscope_core::config::AnalyzerConfig;
use testscope_core::diff::parse_unified_diff;
use testscope_core::engine::Analyzer;
use testscope_core::error::{Result, TestscopeError};
use testscope_core::model::{ImportStatement, ParsedSource, Symbol, SymbolKind};
use testscope_core::parser::SourceParser;

/// Parser that hands back canned tables keyed by relative path.
struct MockParser {
    tables: HashMap<String, ParsedSource>,
    broken: BTreeSet<String>,
}

impl SourceParser for MockParser {
    fn name(&self) -> &str {
        "mock"
    }

    fn supported_extensions(&self) -> &[&str] {
        &["py"]
    }

    fn parse_source(&self, _source: &str, file_path: Option<&Path>) -> Result<ParsedSource> {
        let path = file_path
            .and_then(|p| p.to_str())
            .ok_or_else(|| TestscopeError::Parsing("missing path".to_string()))?;
        if self.broken.contains(path) {
            return Err(TestscopeError::Parsing(format!("cannot parse {}", path)));
        }
        Ok(self.tables.get(path).cloned().unwrap_or_default())
    }
}

fn function(name: &str, start: usize, end: usize) -> Symbol {
    Symbol {
        name: name.to_string(),
        kind: SymbolKind::Function,
        start_line: start,
        end_line: end,
        parent: None,
    }
}

fn names(items: &[&str]) -> Option<BTreeSet<String>> {
    Some(items.iter().map(|s| s.to_string()).collect())
}

fn table(symbols: Vec<Symbol>, imports: Vec<ImportStatement>) -> ParsedSource {
    ParsedSource {
        symbols,
        imports,
        ..ParsedSource::default()
    }
}

/// pkg/__init__.py, pkg/core.py (`parse`, `render`), pkg/cli.py importing
/// `parse`, tests/test_cli.py and tests/test_core.py.
fn setup(broken: &[&str]) -> (tempfile::TempDir, Analyzer) {
    let dir = tempdir().unwrap();
    let root = dir.path();
    for rel in [
        "pkg/__init__.py",
        "pkg/core.py",
        "pkg/cli.py",
        "tests/test_cli.py",
        "tests/test_core.py",
    ] {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "# placeholder\n").unwrap();
    }

    let tables = HashMap::from([
        (
            "pkg/core.py".to_string(),
            table(vec![function("parse", 1, 10), function("render", 12, 20)], vec![]),
        ),
        (
            "pkg/cli.py".to_string(),
            table(
                vec![function("main", 3, 8)],
                vec![ImportStatement::from_import("core", 1, names(&["parse"]), 1)],
            ),
        ),
        (
            "tests/test_cli.py".to_string(),
            table(
                vec![function("test_main", 3, 5)],
                vec![ImportStatement::from_import("pkg.cli", 0, names(&["main"]), 1)],
            ),
        ),
        (
            "tests/test_core.py".to_string(),
            table(
                vec![function("test_render", 3, 5)],
                vec![ImportStatement::module("pkg.core", 1)],
            ),
        ),
    ]);

    let parser = MockParser {
        tables,
        broken: broken.iter().map(|s| s.to_string()).collect(),
    };
    let analyzer =
        Analyzer::new(root.to_path_buf(), AnalyzerConfig::default()).with_parser(Arc::new(parser));
    (dir, analyzer)
}

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_index_resolves_edges_through_parser() {
    let (_dir, analyzer) = setup(&[]);
    let index = analyzer.index(&[]).unwrap();
    let graph = index.graph();

    assert_eq!(graph.node_count(), 5);
    // cli -> core, test_cli -> pkg/__init__ + cli, test_core -> pkg/__init__ + core
    assert_eq!(graph.edge_count(), 5);
    assert_eq!(index.catalog().test_files(), set(&["tests/test_cli.py", "tests/test_core.py"]));
}

#[test]
fn test_precise_change_filters_first_hop() {
    let (_dir, analyzer) = setup(&[]);
    let changes = ChangeSet::new(vec![FileChange::modified("pkg/core.py", vec![Hunk::lines(15, 16)])]);
    let analysis = analyzer.analyze(&changes).unwrap();

    assert_eq!(
        analysis.records["pkg/core.py"],
        ChangeRecord::Precise(set(&["render"]))
    );
    // test_core imports the whole module; cli only takes `parse`.
    assert_eq!(analysis.selection.tests, set(&["tests/test_core.py"]));
    assert!(analysis.selection.coarse.contains("tests/test_cli.py"));
}

#[test]
fn test_package_init_change_reaches_submodule_importers() {
    let (_dir, analyzer) = setup(&[]);
    let changes = ChangeSet::new(vec![FileChange::modified("pkg/__init__.py", vec![Hunk::lines(1, 1)])]);
    let analysis = analyzer.analyze(&changes).unwrap();
    assert_eq!(
        analysis.records["pkg/__init__.py"],
        ChangeRecord::Whole(WholeReason::UnmappedLines)
    );
    assert_eq!(
        analysis.selection.tests,
        set(&["tests/test_cli.py", "tests/test_core.py"])
    );
}

#[test]
fn test_parser_error_marks_file_unparsable() {
    let (_dir, analyzer) = setup(&["pkg/cli.py"]);
    let index = analyzer.index(&[]).unwrap();
    assert!(index.unparsable().contains("pkg/cli.py"));
    // Its imports are lost, so cli no longer depends on core.
    assert!(index.graph().dependencies_of("pkg/cli.py").is_empty());

    let changes = ChangeSet::new(vec![FileChange::modified("pkg/cli.py", vec![Hunk::lines(4, 4)])]);
    let analysis = analyzer.analyze(&changes).unwrap();
    assert_eq!(
        analysis.records["pkg/cli.py"],
        ChangeRecord::Whole(WholeReason::Unparsable)
    );
    assert_eq!(analysis.selection.tests, set(&["tests/test_cli.py"]));
}

#[test]
fn test_diff_driven_analysis() {
    let (_dir, analyzer) = setup(&[]);
    let diff = "\
diff --git a/pkg/core.py b/pkg/core.py
--- a/pkg/core.py
+++ b/pkg/core.py
@@ -4 +4,2 @@ def parse(text):
-    return text
+    text = text.strip()
+    return text
diff --git a/README.md b/README.md
--- a/README.md
+++ b/README.md
@@ -1 +1 @@
-old
+new
";
    let changes = parse_unified_diff(diff).unwrap();
    let analysis = analyzer.analyze(&changes).unwrap();
    assert_eq!(
        analysis.records["pkg/core.py"],
        ChangeRecord::Precise(set(&["parse"]))
    );
    assert_eq!(
        analysis.records["README.md"],
        ChangeRecord::Whole(WholeReason::NotIndexed)
    );
    assert_eq!(
        analysis.selection.tests,
        set(&["tests/test_cli.py", "tests/test_core.py"])
    );
}

#[test]
fn test_empty_change_set_selects_nothing() {
    let (_dir, analyzer) = setup(&[]);
    let analysis = analyzer.analyze(&ChangeSet::default()).unwrap();
    assert!(analysis.selection.tests.is_empty());
    assert!(analysis.records.is_empty());
}
