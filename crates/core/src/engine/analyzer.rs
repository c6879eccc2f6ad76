use super::{DependencyGraph, DependencyGraphBuilder};
use crate::change::{ChangeMapper, ChangeRecord, ChangeSet};
use crate::config::AnalyzerConfig;
use crate::error::{Result, TestscopeError};
use crate::impact::{ImpactResolver, Selection};
use crate::model::{ParsedSource, SourceFile};
use crate::parser::SourceParser;
use crate::project::{Catalog, ScannedFile, Scanner};
use crate::report::FileReport;
use crate::resolver::ImportResolver;
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Everything known about the project for one invocation: catalog, parsed
/// tables and the dependency graph built from them.
pub struct ProjectIndex {
    catalog: Catalog,
    parsed: HashMap<String, ParsedSource>,
    graph: DependencyGraph,
    removed: BTreeSet<String>,
}

impl ProjectIndex {
    /// Builds the index from already-parsed files. `removed` lists paths
    /// deleted by the change set; imports of them still resolve.
    pub fn from_sources(
        sources: Vec<(SourceFile, ParsedSource)>,
        removed: &[String],
        config: &AnalyzerConfig,
    ) -> Self {
        let catalog = Catalog::from_files(sources.iter().map(|(file, _)| file.clone()));
        let removed: Vec<String> = removed
            .iter()
            .filter(|path| !catalog.contains(path))
            .cloned()
            .collect();

        let resolver = ImportResolver::new(&catalog, &removed, config);
        let edges = resolver.resolve_all(sources.par_iter().map(|(file, parsed)| (file, parsed)));

        let mut builder = DependencyGraphBuilder::new();
        for path in catalog.paths() {
            builder.add_node(path);
        }
        builder.add_edges(edges);
        let graph = builder.build();

        let parsed = sources
            .into_iter()
            .map(|(file, parsed)| (file.path, parsed))
            .collect();

        Self {
            catalog,
            parsed,
            graph,
            removed: removed.into_iter().collect(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn parsed(&self, path: &str) -> Option<&ParsedSource> {
        self.parsed.get(path)
    }

    pub fn removed(&self) -> &BTreeSet<String> {
        &self.removed
    }

    pub fn unparsable(&self) -> BTreeSet<&str> {
        self.parsed
            .iter()
            .filter(|(_, parsed)| parsed.parse_failed)
            .map(|(path, _)| path.as_str())
            .collect()
    }

    /// One record per distinct changed path.
    pub fn map_changes(&self, changes: &ChangeSet) -> BTreeMap<String, ChangeRecord> {
        changes
            .merged()
            .into_iter()
            .map(|(path, change)| {
                let record = ChangeMapper::map_file(&change, self.parsed.get(&path));
                debug!("{}: {}", path, record);
                (path, record)
            })
            .collect()
    }

    pub fn affected_tests(&self, changes: &ChangeSet) -> Selection {
        if changes.run_all {
            info!("Escape hatch set, selecting all tests");
            return Selection::everything(&self.catalog);
        }
        let records = self.map_changes(changes);
        ImpactResolver::new(&self.graph, &self.catalog).resolve(&records)
    }

    pub fn report(&self, path: &str) -> Option<FileReport> {
        FileReport::build(path, &self.catalog, &self.graph)
    }
}

/// Result of `Analyzer::analyze`: the index it was computed on, the change
/// records, and the selection.
pub struct Analysis {
    pub index: ProjectIndex,
    pub records: BTreeMap<String, ChangeRecord>,
    pub selection: Selection,
}

/// Entry point: scans a project root, parses every file with the registered
/// parsers and builds a `ProjectIndex`.
pub struct Analyzer {
    root: PathBuf,
    config: AnalyzerConfig,
    parsers: Vec<Arc<dyn SourceParser>>,
}

impl Analyzer {
    pub fn new(root: impl Into<PathBuf>, config: AnalyzerConfig) -> Self {
        Self {
            root: root.into(),
            config,
            parsers: Vec::new(),
        }
    }

    pub fn with_parser(mut self, parser: Arc<dyn SourceParser>) -> Self {
        self.register_parser(parser);
        self
    }

    pub fn register_parser(&mut self, parser: Arc<dyn SourceParser>) {
        debug!("Registered parser {}", parser.name());
        self.parsers.push(parser);
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    fn parser_for(&self, path: &str) -> Option<&Arc<dyn SourceParser>> {
        let ext = Path::new(path).extension()?.to_str()?;
        self.parsers
            .iter()
            .find(|p| p.supported_extensions().contains(&ext))
    }

    fn parse(&self, scanned: &ScannedFile) -> ParsedSource {
        let path = &scanned.file.path;
        let Some(parser) = self.parser_for(path) else {
            warn!("No parser for {}, treating as unparsable", path);
            return ParsedSource::unparsable();
        };
        match parser.parse_source(&scanned.content, Some(Path::new(path))) {
            Ok(parsed) => {
                if parsed.parse_failed {
                    warn!("Syntax errors in {}, changes to it count as whole-file", path);
                }
                parsed
            }
            Err(e) => {
                warn!("Failed to parse {}: {}", path, e);
                ParsedSource::unparsable()
            }
        }
    }

    pub fn index(&self, removed: &[String]) -> Result<ProjectIndex> {
        self.config.validate()?;
        if !self.root.is_dir() {
            return Err(TestscopeError::Config(format!(
                "project root {} is not a directory",
                self.root.display()
            )));
        }

        let start = Instant::now();
        let scanned = Scanner::scan(&self.root, &self.config);
        let sources: Vec<(SourceFile, ParsedSource)> = scanned
            .par_iter()
            .map(|s| (s.file.clone(), self.parse(s)))
            .collect();

        let index = ProjectIndex::from_sources(sources, removed, &self.config);
        info!(
            "Indexed {} files ({} tests, {} edges) in {:?}",
            index.catalog.len(),
            index.catalog.test_files().len(),
            index.graph.edge_count(),
            start.elapsed()
        );
        Ok(index)
    }

    pub fn analyze(&self, changes: &ChangeSet) -> Result<Analysis> {
        let index = self.index(&changes.deleted_paths())?;
        if changes.run_all {
            let selection = index.affected_tests(changes);
            return Ok(Analysis {
                index,
                records: BTreeMap::new(),
                selection,
            });
        }
        let records = index.map_changes(changes);
        let selection = if self.parsers.is_empty() && !records.is_empty() {
            // No file contributed imports, so no importer can be ruled out.
            warn!("No language parser registered, selecting all tests");
            Selection::everything(&index.catalog)
        } else {
            ImpactResolver::new(&index.graph, &index.catalog).resolve(&records)
        };
        Ok(Analysis {
            index,
            records,
            selection,
        })
    }
}
