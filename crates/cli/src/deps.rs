use crate::view::{self, DependencyView};
use crate::{project_relative, ProjectArgs};
use std::path::PathBuf;
use testscope_core::report::FileReport;
use tracing::warn;

pub fn run(
    project: ProjectArgs,
    files: Vec<PathBuf>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let root = project.root();
    let config = project.load_config()?;
    let analyzer = testscope_runtime::build_default_analyzer(root.clone(), config);
    let index = analyzer.index(&[])?;

    let mut reports: Vec<FileReport> = Vec::new();
    for file in &files {
        let rel = project_relative(&root, file);
        match index.report(&rel) {
            Some(report) => reports.push(report),
            None => warn!("{} is not part of the project index", rel),
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    if reports.is_empty() {
        println!("{}", view::warning("None of the given files are indexed."));
        return Ok(());
    }

    for report in &reports {
        println!("{}", view::heading(&format!("{} ({})", report.path, report.module)));

        let imports: Vec<DependencyView> = report.dependencies.iter().map(Into::into).collect();
        if imports.is_empty() {
            println!("imports: (none)");
        } else {
            println!("imports:\n{}", view::table(&imports));
        }

        let importers: Vec<DependencyView> = report.importers.iter().map(Into::into).collect();
        if importers.is_empty() {
            println!("imported by: (none)");
        } else {
            println!("imported by:\n{}", view::table(&importers));
        }

        println!("transitive dependents: {}", report.dependents.len());
        if report.tests.is_empty() {
            println!("{}", view::warning("covered by: no tests"));
        } else {
            println!("covered by:");
            for test in &report.tests {
                println!("{}", view::selected(test));
            }
        }
        println!();
    }

    Ok(())
}
