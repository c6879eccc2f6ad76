mod affected;
mod deps;
mod git;
mod graph;
mod view;

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use testscope_core::config::AnalyzerConfig;
use testscope_core::project::{normalize_rel_path, relative_slash_path};

#[derive(Parser)]
#[command(
    name = "testscope",
    version,
    about = "Select the pytest files affected by a change",
    long_about = "testscope builds a file-level import graph of a Python project, maps the lines \
                  of a git diff onto the functions and classes they touch, and selects only the \
                  test files that can observe those changes."
)]
pub struct Cli {
    /// Also print logs to stderr (filtered by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Clone)]
pub struct ProjectArgs {
    /// Path to the project root. Defaults to current directory.
    #[arg(short, long, value_name = "PROJECT_PATH")]
    pub project: Option<PathBuf>,

    /// JSON file with exclusions, test patterns and source roots
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl ProjectArgs {
    pub fn root(&self) -> PathBuf {
        self.project
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }

    pub fn load_config(&self) -> testscope_core::Result<AnalyzerConfig> {
        match &self.config {
            Some(path) => AnalyzerConfig::from_file(path),
            None => Ok(AnalyzerConfig::default()),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the test files affected by changes against a base branch
    #[command(
        long_about = "Runs `git diff -U0` against the base branch, maps changed lines to symbols \
                            and prints the affected test files together with a pytest command."
    )]
    Affected {
        #[command(flatten)]
        project: ProjectArgs,

        /// Base branch to compare against (tries origin/<BASE> first)
        #[arg(short, long, default_value = "main")]
        base: String,

        /// Compare against the merge base (`<BASE>...HEAD`)
        #[arg(long)]
        merge_base: bool,

        /// Only list affected test files, one per line
        #[arg(long)]
        list_only: bool,

        /// Print the full analysis as JSON
        #[arg(long, conflicts_with = "list_only")]
        json: bool,

        /// Select every test when no test is affected
        #[arg(long)]
        run_all_on_empty: bool,

        /// Skip analysis and select every test
        #[arg(long)]
        run_all: bool,
    },
    /// Show dependencies, dependents and test coverage of files
    Deps {
        #[command(flatten)]
        project: ProjectArgs,

        /// Files to report on, relative to the project root
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        /// Print the reports as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the project's import graph
    Graph {
        #[command(flatten)]
        project: ProjectArgs,

        /// Print nodes and edges as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Project-relative form of a path given on the command line.
pub(crate) fn project_relative(root: &Path, file: &Path) -> String {
    if file.is_absolute() {
        if let Some(rel) = relative_slash_path(root, file) {
            return rel;
        }
    }
    normalize_rel_path(&file.to_string_lossy())
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let _guard = testscope_runtime::init_logging("cli", cli.verbose);

    match cli.command {
        Commands::Affected {
            project,
            base,
            merge_base,
            list_only,
            json,
            run_all_on_empty,
            run_all,
        } => affected::run(affected::Options {
            project,
            base,
            merge_base,
            list_only,
            json,
            run_all_on_empty,
            run_all,
        }),
        Commands::Deps {
            project,
            files,
            json,
        } => deps::run(project, files, json),
        Commands::Graph { project, json } => graph::run(project, json),
    }
}
