use std::collections::BTreeSet;

use petgraph::graph::NodeIndex;
use petgraph::Direction;

use crate::error::{DataTwinError, Result};
use crate::graph::dag::DependencyGraph;

/// Total order over table names: every dependency precedes its dependents.
///
/// Kahn's algorithm with an explicit ready set ordered by node index.
/// Nodes were added in profile declaration order, so ties among
/// simultaneously-ready tables break by declaration order — the output is
/// deterministic for identical input, never a side effect of hash-map
/// iteration. (petgraph's own `toposort` gives no such guarantee, which
/// is why this is hand-rolled.)
pub fn schedule(graph: &DependencyGraph) -> Result<Vec<String>> {
    let node_count = graph.graph.node_count();
    let mut in_degree: Vec<usize> = vec![0; node_count];
    for idx in graph.graph.node_indices() {
        in_degree[idx.index()] = graph
            .graph
            .neighbors_directed(idx, Direction::Incoming)
            .count();
    }

    // BTreeSet keyed by index = declaration order among ready nodes.
    let mut ready: BTreeSet<usize> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, d)| **d == 0)
        .map(|(i, _)| i)
        .collect();

    let mut order = Vec::with_capacity(node_count);
    while let Some(&next) = ready.iter().next() {
        ready.remove(&next);
        let idx = NodeIndex::new(next);
        order.push(graph.table_name(idx).to_string());

        for succ in graph.graph.neighbors_directed(idx, Direction::Outgoing) {
            let d = &mut in_degree[succ.index()];
            *d -= 1;
            if *d == 0 {
                ready.insert(succ.index());
            }
        }
    }

    if order.len() < node_count {
        return Err(DataTwinError::CircularDependency {
            cycle: describe_cycle(graph, &in_degree),
        });
    }
    Ok(order)
}

/// Walk the residual graph (nodes still holding in-degree after Kahn's
/// stalls) to name one concrete cycle, e.g. `a -> b -> a`.
fn describe_cycle(graph: &DependencyGraph, in_degree: &[usize]) -> String {
    let residual: Vec<NodeIndex> = graph
        .graph
        .node_indices()
        .filter(|idx| in_degree[idx.index()] > 0)
        .collect();

    let Some(&start) = residual.first() else {
        return "<unknown>".to_string();
    };

    // Every residual node has a residual predecessor, so following
    // successors inside the residual set must revisit a node.
    let residual_set: std::collections::HashSet<NodeIndex> = residual.iter().copied().collect();
    let mut path = vec![start];
    let mut seen = std::collections::HashMap::new();
    seen.insert(start, 0usize);
    let mut current = start;

    loop {
        let Some(next) = graph
            .graph
            .neighbors_directed(current, Direction::Outgoing)
            .find(|n| residual_set.contains(n))
        else {
            return graph.table_name(start).to_string();
        };
        if let Some(&pos) = seen.get(&next) {
            let mut names: Vec<&str> = path[pos..].iter().map(|&i| graph.table_name(i)).collect();
            names.push(graph.table_name(next));
            return names.join(" -> ");
        }
        seen.insert(next, path.len());
        path.push(next);
        current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::dag::DependencyGraph;
    use crate::profile::load_profile;
    use serde_json::json;

    fn table(fk_to: Option<&str>) -> serde_json::Value {
        match fk_to {
            None => json!({"is_codetable": false, "columns": []}),
            Some(parent) => json!({
                "is_codetable": false,
                "columns": [
                    {"name": "pid", "type": "integer", "stats": {}, "sample_data": [],
                     "is_primary_key": false, "is_unique": false,
                     "foreign_key": {"foreign_table_name": parent,
                                      "foreign_column_name": "id"}}
                ]
            }),
        }
    }

    #[test]
    fn test_parents_precede_children() {
        let doc = json!({
            "grandchild": table(Some("child")),
            "child": table(Some("parent")),
            "parent": table(None)
        });
        let profile = load_profile(&doc).unwrap();
        let graph = DependencyGraph::from_profile(&profile).unwrap();
        let order = schedule(&graph).unwrap();
        assert_eq!(order, vec!["parent", "child", "grandchild"]);
    }

    #[test]
    fn test_ties_break_by_declaration_order() {
        let doc = json!({
            "zeta": table(None),
            "alpha": table(None),
            "mid": table(Some("zeta"))
        });
        let profile = load_profile(&doc).unwrap();
        let graph = DependencyGraph::from_profile(&profile).unwrap();
        let order = schedule(&graph).unwrap();
        // zeta declared before alpha, so it schedules first despite sorting
        // after it alphabetically.
        assert_eq!(order, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_schedule_is_deterministic() {
        let doc = json!({
            "a": table(None),
            "b": table(Some("a")),
            "c": table(Some("a")),
            "d": table(Some("b"))
        });
        let profile = load_profile(&doc).unwrap();
        let graph = DependencyGraph::from_profile(&profile).unwrap();
        let first = schedule(&graph).unwrap();
        let second = schedule(&graph).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_cycle_is_fatal_and_named() {
        let doc = json!({
            "a": table(Some("b")),
            "b": table(Some("a"))
        });
        let profile = load_profile(&doc).unwrap();
        let graph = DependencyGraph::from_profile(&profile).unwrap();
        let err = schedule(&graph).unwrap_err();
        match err {
            DataTwinError::CircularDependency { cycle } => {
                assert!(cycle.contains("a") && cycle.contains("b"), "{}", cycle);
            }
            other => panic!("expected CircularDependency, got {:?}", other),
        }
    }
}
