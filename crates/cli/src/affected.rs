use crate::view::{self, ChangeView};
use crate::{git, ProjectArgs};
use serde::Serialize;
use std::collections::BTreeMap;
use testscope_core::change::{ChangeRecord, ChangeSet};
use testscope_core::diff::parse_unified_diff;
use testscope_core::impact::Selection;
use tracing::info;

pub struct Options {
    pub project: ProjectArgs,
    pub base: String,
    pub merge_base: bool,
    pub list_only: bool,
    pub json: bool,
    pub run_all_on_empty: bool,
    pub run_all: bool,
}

#[derive(Serialize)]
struct AffectedOutput<'a> {
    range: &'a str,
    changes: &'a BTreeMap<String, ChangeRecord>,
    selection: &'a Selection,
}

/// `pytest` invocation for the selected files.
pub fn pytest_command(tests: impl IntoIterator<Item = impl AsRef<str>>) -> String {
    let mut command = String::from("pytest");
    for test in tests {
        command.push(' ');
        command.push_str(test.as_ref());
    }
    command
}

pub fn run(opts: Options) -> Result<(), Box<dyn std::error::Error>> {
    let root = opts.project.root();
    let config = opts.project.load_config()?;

    let diff = git::diff_against(&root, &opts.base, opts.merge_base)?;
    let mut changes: ChangeSet = parse_unified_diff(&diff.text)?;
    changes.run_all = opts.run_all;
    // Changes to files the catalog never sees (docs, data, config) are ignored.
    changes.files.retain(|f| config.has_source_extension(&f.path));

    info!("Comparing {} against {}", root.display(), diff.range);

    if changes.is_empty() && !changes.run_all && !opts.run_all_on_empty {
        if opts.json {
            let output = AffectedOutput {
                range: &diff.range,
                changes: &BTreeMap::new(),
                selection: &Selection::default(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else if !opts.list_only {
            println!("No Python files changed.");
        }
        return Ok(());
    }

    let analyzer = testscope_runtime::build_default_analyzer(root.clone(), config);
    let mut analysis = analyzer.analyze(&changes)?;

    if analysis.selection.is_empty() && opts.run_all_on_empty && !analysis.selection.run_all {
        info!("No affected tests, falling back to the full suite");
        analysis.selection = Selection::everything(analysis.index.catalog());
    }

    let selection = &analysis.selection;

    if opts.json {
        let output = AffectedOutput {
            range: &diff.range,
            changes: &analysis.records,
            selection,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if opts.list_only {
        for test in &selection.tests {
            println!("{}", test);
        }
        return Ok(());
    }

    if let Some(branch) = git::current_branch(&root) {
        println!("Current branch: {}", branch);
    }
    println!("Comparing to: {}", diff.range);

    if !analysis.records.is_empty() {
        let rows: Vec<ChangeView> = analysis
            .records
            .iter()
            .map(|(path, record)| ChangeView::new(path, record))
            .collect();
        println!("\n{}", view::heading(&format!("{} changed files", rows.len())));
        println!("{}", view::table(&rows));
    }

    let unparsable = analysis.index.unparsable();
    if !unparsable.is_empty() {
        println!(
            "\n{}",
            view::warning(&format!(
                "{} files could not be parsed; changes to them select all their dependents",
                unparsable.len()
            ))
        );
    }

    if selection.is_empty() {
        println!("\nNo tests are affected by these changes.");
        println!("This may indicate missing test coverage.");
        return Ok(());
    }

    let title = if selection.run_all {
        format!("Running all {} test files", selection.tests.len())
    } else {
        format!(
            "Found {} affected test files ({} files reachable, {} after symbol filtering)",
            selection.tests.len(),
            selection.coarse.len(),
            selection.selected.len()
        )
    };
    println!("\n{}", view::heading(&title));
    for test in &selection.tests {
        println!("{}", view::selected(test));
    }

    println!("\n{}", view::heading("To run these tests with pytest:"));
    println!("\n  {}", pytest_command(&selection.tests));

    Ok(())
}
