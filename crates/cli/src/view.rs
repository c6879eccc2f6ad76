use nu_ansi_term::Color;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use testscope_core::change::ChangeRecord;
use testscope_core::model::ResolvedEdge;
use testscope_core::report::DependencyEntry;

/// A terminal view of one import edge
#[derive(Tabled)]
pub struct EdgeView {
    pub importer: String,
    pub imports: String,
    pub symbols: String,
}

impl From<&ResolvedEdge> for EdgeView {
    fn from(edge: &ResolvedEdge) -> Self {
        Self {
            importer: edge.from.clone(),
            imports: edge.to.clone(),
            symbols: edge.symbols.to_string(),
        }
    }
}

/// A terminal view of one changed file
#[derive(Tabled)]
pub struct ChangeView {
    pub file: String,
    pub change: String,
}

impl ChangeView {
    pub fn new(path: &str, record: &ChangeRecord) -> Self {
        Self {
            file: path.to_string(),
            change: record.to_string(),
        }
    }
}

#[derive(Tabled)]
pub struct DependencyView {
    pub file: String,
    pub symbols: String,
}

impl From<&DependencyEntry> for DependencyView {
    fn from(entry: &DependencyEntry) -> Self {
        Self {
            file: entry.path.clone(),
            symbols: entry.symbols.to_string(),
        }
    }
}

pub fn table<T: Tabled>(rows: &[T]) -> String {
    Table::new(rows).with(Style::psql()).to_string()
}

pub fn heading(text: &str) -> String {
    Color::LightBlue.bold().paint(text).to_string()
}

pub fn selected(path: &str) -> String {
    format!("  {} {}", Color::Green.paint("✓"), path)
}

pub fn warning(text: &str) -> String {
    Color::Yellow.paint(text).to_string()
}
