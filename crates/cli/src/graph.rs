use crate::view::{self, EdgeView};
use crate::ProjectArgs;
use serde::Serialize;
use testscope_core::model::{FileRole, ResolvedEdge};

#[derive(Serialize)]
struct GraphNode<'a> {
    path: &'a str,
    role: FileRole,
}

#[derive(Serialize)]
struct GraphOutput<'a> {
    nodes: Vec<GraphNode<'a>>,
    edges: Vec<ResolvedEdge>,
    unparsable: Vec<&'a str>,
}

pub fn run(project: ProjectArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let root = project.root();
    let config = project.load_config()?;
    let analyzer = testscope_runtime::build_default_analyzer(root.clone(), config);
    let index = analyzer.index(&[])?;
    let graph = index.graph();
    let edges = graph.edges();

    if json {
        let output = GraphOutput {
            nodes: index
                .catalog()
                .files()
                .map(|f| GraphNode {
                    path: &f.path,
                    role: f.role,
                })
                .collect(),
            edges,
            unparsable: index.unparsable().into_iter().collect(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{}", view::heading(&format!("Project: {}", root.display())));
    println!("Files: {}", index.catalog().len());
    println!("Test files: {}", index.catalog().test_files().len());
    println!("Edges: {}", graph.edge_count());

    let unparsable = index.unparsable();
    if !unparsable.is_empty() {
        println!("{}", view::warning("Unparsable:"));
        for path in unparsable {
            println!("  {}", path);
        }
    }

    if !edges.is_empty() {
        let rows: Vec<EdgeView> = edges.iter().map(Into::into).collect();
        println!("\n{}", view::table(&rows));
    }

    Ok(())
}
