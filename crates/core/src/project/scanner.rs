use super::relative_slash_path;
use crate::config::AnalyzerConfig;
use crate::model::{FileRole, SourceFile};
use ignore::WalkBuilder;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A catalogued file together with its text, ready for the syntax indexer.
#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub file: SourceFile,
    pub content: String,
}

pub struct Scanner;

impl Scanner {
    /// Walks `root`, applies exclusions and role classification, and reads every
    /// surviving file in parallel. Entries that cannot be read at all are
    /// skipped with a warning.
    pub fn scan(root: &Path, config: &AnalyzerConfig) -> Vec<ScannedFile> {
        let mut scanned: Vec<ScannedFile> = Self::collect_paths(root, config)
            .par_iter()
            .filter_map(|(path, rel)| Self::read_file(path, rel, config))
            .collect();
        scanned.sort_by(|a, b| a.file.path.cmp(&b.file.path));
        scanned
    }

    pub(crate) fn collect_paths(root: &Path, config: &AnalyzerConfig) -> Vec<(PathBuf, String)> {
        let prune_root = root.to_path_buf();
        let prune_exclusions = config.exclusions.clone();

        let mut builder = WalkBuilder::new(root);
        builder
            .hidden(false)
            .git_ignore(config.respect_gitignore)
            .git_global(config.respect_gitignore)
            .git_exclude(config.respect_gitignore)
            .parents(config.respect_gitignore)
            .follow_links(false)
            .filter_entry(move |entry| {
                // Prune excluded directories before descending into them
                match relative_slash_path(&prune_root, entry.path()) {
                    Some(rel) => !prune_exclusions.iter().any(|p| rel.contains(p.as_str())),
                    None => true,
                }
            });

        let mut paths = Vec::new();
        for entry in builder.build() {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!("Skipping unreadable path: {}", e);
                    continue;
                }
            };
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }
            let Some(rel) = relative_slash_path(root, entry.path()) else {
                warn!("Skipping non UTF-8 path: {}", entry.path().display());
                continue;
            };
            if !config.has_source_extension(&rel) || config.is_excluded(&rel) {
                continue;
            }
            paths.push((entry.path().to_path_buf(), rel));
        }
        debug!("Collected {} candidate files under {}", paths.len(), root.display());
        paths
    }

    fn read_file(path: &Path, rel: &str, config: &AnalyzerConfig) -> Option<ScannedFile> {
        let bytes = match fs::read(path) {
            Ok(b) => b,
            Err(e) => {
                warn!("Could not read {}: {}", rel, e);
                return None;
            }
        };
        // Legacy encodings (`# -*- coding: latin-1 -*-`) still belong to the
        // catalog; undecodable bytes become U+FFFD.
        let content = match String::from_utf8(bytes) {
            Ok(c) => c,
            Err(e) => {
                debug!("{} is not valid UTF-8, decoding lossily", rel);
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };
        let role = if config.is_test(rel) {
            FileRole::Test
        } else {
            FileRole::Source
        };
        Some(ScannedFile {
            file: SourceFile::new(rel, &config.package_marker, role),
            content,
        })
    }
}
