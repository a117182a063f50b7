use anyhow::{Context, Result};

use datatwin_core::graph::{schedule, DependencyGraph};

use crate::args::GraphArgs;

pub fn run(args: &GraphArgs) -> Result<()> {
    let text = std::fs::read_to_string(&args.stats)
        .with_context(|| format!("Failed to read {}", args.stats))?;
    let profile = datatwin_core::load_profile_str(&text)?;

    let graph = DependencyGraph::from_profile(&profile)?;
    let order = schedule(&graph)?;

    println!(
        "{} tables, {} dependency edges",
        graph.table_count(),
        graph.edge_count()
    );
    println!();
    for (position, table) in order.iter().enumerate() {
        let marker = if profile
            .table(table)
            .map(|t| t.is_code_table)
            .unwrap_or(false)
        {
            " (code table)"
        } else {
            ""
        };
        println!("{:>3}. {}{}", position + 1, table, marker);
    }

    Ok(())
}
