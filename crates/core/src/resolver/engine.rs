use crate::config::AnalyzerConfig;
use crate::model::{ImportStatement, ParsedSource, ResolvedEdge, SourceFile, SymbolSet};
use crate::project::Catalog;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashSet};
use tracing::trace;

/// Maps import statements onto catalogued files.
///
/// Resolution only looks at paths: a module exists when its file or its
/// package marker is known. Removed paths stay resolvable so that former
/// importers of a deleted file still get an edge to it.
pub struct ImportResolver<'a> {
    config: &'a AnalyzerConfig,
    known: HashSet<String>,
    dirs: HashSet<String>,
}

impl<'a> ImportResolver<'a> {
    pub fn new(catalog: &Catalog, removed: &[String], config: &'a AnalyzerConfig) -> Self {
        let known: HashSet<String> = catalog
            .paths()
            .map(str::to_string)
            .chain(removed.iter().cloned())
            .collect();

        // The project root is a directory too: `from .. import x` may land on it.
        let mut dirs = HashSet::from([String::new()]);
        for path in &known {
            let mut current = path.as_str();
            while let Some((dir, _)) = current.rsplit_once('/') {
                if !dirs.insert(dir.to_string()) {
                    break;
                }
                current = dir;
            }
        }

        Self {
            config,
            known,
            dirs,
        }
    }

    /// Resolves every file's imports in parallel and merges duplicate
    /// (from, to) pairs by symbol-set union.
    pub fn resolve_all<'s>(
        &self,
        files: impl IntoParallelIterator<Item = (&'s SourceFile, &'s ParsedSource)>,
    ) -> Vec<ResolvedEdge> {
        let per_file: Vec<Vec<ResolvedEdge>> = files
            .into_par_iter()
            .map(|(file, parsed)| self.resolve_file(file, &parsed.imports))
            .collect();

        let mut merged: BTreeMap<(String, String), SymbolSet> = BTreeMap::new();
        for edge in per_file.into_iter().flatten() {
            merged
                .entry((edge.from, edge.to))
                .and_modify(|set| set.merge(&edge.symbols))
                .or_insert(edge.symbols);
        }

        merged
            .into_iter()
            .map(|((from, to), symbols)| ResolvedEdge { from, to, symbols })
            .collect()
    }

    /// Edges for a single file, already merged per target.
    pub fn resolve_file(&self, file: &SourceFile, imports: &[ImportStatement]) -> Vec<ResolvedEdge> {
        let mut targets: BTreeMap<String, SymbolSet> = BTreeMap::new();

        for import in imports {
            let resolved = if import.level > 0 {
                self.resolve_relative(file, import)
            } else {
                self.resolve_absolute(import)
            };

            if resolved.is_empty() {
                trace!(
                    "Unresolved import '{}{}' in {}:{}",
                    ".".repeat(import.level),
                    import.module,
                    file.path,
                    import.line
                );
            }

            for (to, symbols) in resolved {
                if to == file.path {
                    continue;
                }
                targets
                    .entry(to)
                    .and_modify(|set| set.merge(&symbols))
                    .or_insert(symbols);
            }
        }

        targets
            .into_iter()
            .map(|(to, symbols)| ResolvedEdge {
                from: file.path.clone(),
                to,
                symbols,
            })
            .collect()
    }

    fn resolve_absolute(&self, import: &ImportStatement) -> Vec<(String, SymbolSet)> {
        let segments = import.segments();
        let Some(first) = segments.first() else {
            return Vec::new();
        };

        for root in &self.config.source_roots {
            let head = join(root, first);
            let internal = self.module_file(&head).is_some() || self.dirs.contains(&head);
            if internal {
                return self.resolve_chain(root, &segments, import);
            }
        }

        trace!("Treating '{}' as an external module", import.module);
        Vec::new()
    }

    fn resolve_relative(&self, file: &SourceFile, import: &ImportStatement) -> Vec<(String, SymbolSet)> {
        let mut base = file.package_dir().to_string();
        for _ in 1..import.level {
            if base.is_empty() {
                // Ascended past the project root
                return Vec::new();
            }
            base = base
                .rsplit_once('/')
                .map(|(parent, _)| parent.to_string())
                .unwrap_or_default();
        }

        self.resolve_chain(&base, &import.segments(), import)
    }

    /// Walks `segments` downward from `base`. Every package passed on the way
    /// gets an `All` edge (importing a submodule executes its parents), the
    /// final module gets the statement's names, and names that are themselves
    /// submodules get their own `All` edge.
    fn resolve_chain(
        &self,
        base: &str,
        segments: &[&str],
        import: &ImportStatement,
    ) -> Vec<(String, SymbolSet)> {
        let mut out = Vec::new();

        let mut prefix = base.to_string();
        for (i, segment) in segments.iter().enumerate() {
            prefix = join(&prefix, segment);
            if i + 1 < segments.len() {
                if let Some(pkg) = self.package_file(&prefix) {
                    out.push((pkg, SymbolSet::All));
                }
            }
        }

        let statement_symbols = match &import.names {
            Some(names) => SymbolSet::Names(names.clone()),
            None => SymbolSet::All,
        };

        let mut submodules = Vec::new();
        if let Some(names) = &import.names {
            for name in names {
                if let Some(sub) = self.module_file(&join(&prefix, name)) {
                    submodules.push((sub, SymbolSet::All));
                }
            }
        }

        match self.module_file(&prefix) {
            Some(target) => out.push((target, statement_symbols)),
            None if !submodules.is_empty() && self.dirs.contains(&prefix) => {
                // Namespace package: only the submodules are real targets
            }
            None => return Vec::new(),
        }

        out.extend(submodules);
        out
    }

    fn package_file(&self, dir: &str) -> Option<String> {
        let marker = join(dir, &self.config.package_marker);
        self.known.contains(&marker).then_some(marker)
    }

    /// `dir/__init__.py` first, then `dir.<ext>`; a regular package shadows a
    /// same-named module.
    fn module_file(&self, module_path: &str) -> Option<String> {
        if module_path.is_empty() {
            return self.package_file("");
        }
        if let Some(pkg) = self.package_file(module_path) {
            return Some(pkg);
        }
        self.config
            .extensions
            .iter()
            .map(|ext| format!("{}.{}", module_path, ext))
            .find(|candidate| self.known.contains(candidate))
    }
}

fn join(base: &str, segment: &str) -> String {
    if base.is_empty() {
        segment.to_string()
    } else if segment.is_empty() {
        base.to_string()
    } else {
        format!("{}/{}", base, segment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FileRole;
    use std::collections::BTreeSet;

    fn catalog(paths: &[&str]) -> Catalog {
        Catalog::from_files(
            paths
                .iter()
                .map(|p| SourceFile::new(*p, "__init__.py", FileRole::Source)),
        )
    }

    fn names(items: &[&str]) -> Option<BTreeSet<String>> {
        Some(items.iter().map(|s| s.to_string()).collect())
    }

    fn resolve(
        catalog: &Catalog,
        from: &str,
        imports: Vec<ImportStatement>,
    ) -> Vec<(String, SymbolSet)> {
        let config = AnalyzerConfig::default();
        let resolver = ImportResolver::new(catalog, &[], &config);
        let file = catalog.get(from).unwrap();
        resolver
            .resolve_file(file, &imports)
            .into_iter()
            .map(|e| (e.to, e.symbols))
            .collect()
    }

    #[test]
    fn test_absolute_from_import_carries_names() {
        let cat = catalog(&["src/validators.py", "src/models.py", "tests/test_models.py"]);
        let edges = resolve(
            &cat,
            "tests/test_models.py",
            vec![ImportStatement::from_import("src.models", 0, names(&["User", "Admin"]), 1)],
        );
        assert_eq!(
            edges,
            vec![("src/models.py".to_string(), SymbolSet::names(["Admin", "User"]))]
        );
    }

    #[test]
    fn test_external_modules_are_dropped() {
        let cat = catalog(&["src/validators.py"]);
        let edges = resolve(
            &cat,
            "src/validators.py",
            vec![
                ImportStatement::module("re", 1),
                ImportStatement::from_import("pytest", 0, names(&["raises"]), 2),
            ],
        );
        assert!(edges.is_empty());
    }

    #[test]
    fn test_relative_import_from_sibling() {
        let cat = catalog(&["src/validators.py", "src/models.py"]);
        let edges = resolve(
            &cat,
            "src/models.py",
            vec![ImportStatement::from_import("validators", 1, names(&["validate_email"]), 3)],
        );
        assert_eq!(
            edges,
            vec![("src/validators.py".to_string(), SymbolSet::names(["validate_email"]))]
        );
    }

    #[test]
    fn test_relative_import_ascends_packages() {
        let cat = catalog(&[
            "app/__init__.py",
            "app/core/__init__.py",
            "app/core/engine.py",
            "app/util/__init__.py",
            "app/util/text.py",
        ]);
        let edges = resolve(
            &cat,
            "app/core/engine.py",
            vec![ImportStatement::from_import("util.text", 2, names(&["slugify"]), 1)],
        );
        assert_eq!(
            edges,
            vec![
                ("app/util/__init__.py".to_string(), SymbolSet::All),
                ("app/util/text.py".to_string(), SymbolSet::names(["slugify"])),
            ]
        );
    }

    #[test]
    fn test_relative_import_past_root_is_dropped() {
        let cat = catalog(&["pkg/mod.py", "other.py"]);
        let edges = resolve(
            &cat,
            "pkg/mod.py",
            vec![ImportStatement::from_import("other", 3, None, 1)],
        );
        assert!(edges.is_empty());
    }

    #[test]
    fn test_relative_forms_reaching_the_root_agree() {
        let cat = catalog(&["pkg/mod.py", "other.py"]);
        let from_module = resolve(
            &cat,
            "pkg/mod.py",
            vec![ImportStatement::from_import("other", 2, names(&["y"]), 1)],
        );
        assert_eq!(from_module, vec![("other.py".to_string(), SymbolSet::names(["y"]))]);

        let from_root = resolve(
            &cat,
            "pkg/mod.py",
            vec![ImportStatement::from_import("", 2, names(&["other"]), 1)],
        );
        assert_eq!(from_root, vec![("other.py".to_string(), SymbolSet::All)]);
    }

    #[test]
    fn test_from_dot_import_submodule_and_init_names() {
        let cat = catalog(&["pkg/__init__.py", "pkg/a.py", "pkg/b.py"]);
        let edges = resolve(
            &cat,
            "pkg/b.py",
            vec![ImportStatement::from_import("", 1, names(&["a", "VERSION"]), 1)],
        );
        assert_eq!(
            edges,
            vec![
                ("pkg/__init__.py".to_string(), SymbolSet::names(["VERSION", "a"])),
                ("pkg/a.py".to_string(), SymbolSet::All),
            ]
        );
    }

    #[test]
    fn test_init_importing_its_own_submodule_has_no_self_loop() {
        let cat = catalog(&["pkg/__init__.py", "pkg/a.py"]);
        let edges = resolve(
            &cat,
            "pkg/__init__.py",
            vec![ImportStatement::from_import("", 1, names(&["a"]), 1)],
        );
        assert_eq!(edges, vec![("pkg/a.py".to_string(), SymbolSet::All)]);
    }

    #[test]
    fn test_module_import_reaches_parent_packages() {
        let cat = catalog(&["a/__init__.py", "a/b/__init__.py", "a/b/c.py", "main.py"]);
        let edges = resolve(&cat, "main.py", vec![ImportStatement::module("a.b.c", 1)]);
        assert_eq!(
            edges,
            vec![
                ("a/__init__.py".to_string(), SymbolSet::All),
                ("a/b/__init__.py".to_string(), SymbolSet::All),
                ("a/b/c.py".to_string(), SymbolSet::All),
            ]
        );
    }

    #[test]
    fn test_missing_internal_module_is_unresolved() {
        let cat = catalog(&["a/__init__.py", "main.py"]);
        let edges = resolve(&cat, "main.py", vec![ImportStatement::module("a.gone", 1)]);
        assert!(edges.is_empty());
    }

    #[test]
    fn test_namespace_package_resolves_submodules() {
        let cat = catalog(&["src/auth.py", "main.py"]);
        let edges = resolve(
            &cat,
            "main.py",
            vec![ImportStatement::from_import("src", 0, names(&["auth"]), 1)],
        );
        assert_eq!(edges, vec![("src/auth.py".to_string(), SymbolSet::All)]);
    }

    #[test]
    fn test_statements_to_same_target_merge() {
        let cat = catalog(&["lib.py", "main.py"]);
        let edges = resolve(
            &cat,
            "main.py",
            vec![
                ImportStatement::from_import("lib", 0, names(&["a"]), 1),
                ImportStatement::from_import("lib", 0, names(&["b"]), 2),
            ],
        );
        assert_eq!(edges, vec![("lib.py".to_string(), SymbolSet::names(["a", "b"]))]);

        let edges = resolve(
            &cat,
            "main.py",
            vec![
                ImportStatement::from_import("lib", 0, names(&["a"]), 1),
                ImportStatement::module("lib", 2),
            ],
        );
        assert_eq!(edges, vec![("lib.py".to_string(), SymbolSet::All)]);
    }

    #[test]
    fn test_source_roots_are_tried_in_order() {
        let cat = catalog(&["src/mylib/__init__.py", "src/mylib/core.py", "tests/test_core.py"]);
        let config = AnalyzerConfig::default().with_source_roots(["", "src"]);
        let resolver = ImportResolver::new(&cat, &[], &config);
        let file = cat.get("tests/test_core.py").unwrap();
        let edges = resolver.resolve_file(
            file,
            &[ImportStatement::from_import("mylib.core", 0, names(&["run"]), 1)],
        );
        let targets: Vec<&str> = edges.iter().map(|e| e.to.as_str()).collect();
        assert_eq!(targets, vec!["src/mylib/__init__.py", "src/mylib/core.py"]);
    }

    #[test]
    fn test_removed_paths_remain_resolvable() {
        let cat = catalog(&["main.py"]);
        let config = AnalyzerConfig::default();
        let removed = vec!["helpers.py".to_string()];
        let resolver = ImportResolver::new(&cat, &removed, &config);
        let file = cat.get("main.py").unwrap();
        let edges = resolver.resolve_file(
            file,
            &[ImportStatement::from_import("helpers", 0, names(&["fmt"]), 1)],
        );
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].to, "helpers.py");
    }
}
