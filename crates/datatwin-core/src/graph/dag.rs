use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

use crate::error::{DataTwinError, Result};
use crate::profile::SchemaProfile;

/// Directed graph over tables: an edge `u → v` means `u` must be generated
/// before `v`. Edges come from explicit dependency declarations
/// (`dep_table → table`) and from foreign-key column metadata
/// (`foreign_table → table`). Multiple relationships between the same
/// pair collapse into one edge.
#[derive(Debug)]
pub struct DependencyGraph {
    pub graph: DiGraph<String, ()>,
    pub node_indices: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Build the graph from a profile. Nodes are added in declaration
    /// order, so `NodeIndex` order doubles as declaration order for the
    /// scheduler's tie-break. Fails when a dependency or foreign key
    /// names a table the profile does not contain.
    pub fn from_profile(profile: &SchemaProfile) -> Result<Self> {
        let mut graph = DiGraph::new();
        let mut node_indices = HashMap::new();

        for table_name in profile.tables.keys() {
            let idx = graph.add_node(table_name.clone());
            node_indices.insert(table_name.clone(), idx);
        }

        let mut add_edge = |from: &str, to: &str, referenced_by: &str| -> Result<()> {
            let from_idx =
                *node_indices
                    .get(from)
                    .ok_or_else(|| DataTwinError::UnknownTable {
                        table: from.to_string(),
                        referenced_by: referenced_by.to_string(),
                    })?;
            let to_idx = node_indices[to];
            if graph.find_edge(from_idx, to_idx).is_none() {
                graph.add_edge(from_idx, to_idx, ());
            }
            Ok(())
        };

        for (table_name, table) in &profile.tables {
            if let Some(dep) = &table.dependency {
                add_edge(&dep.dep_table, table_name, table_name)?;
            }
            for column in &table.columns {
                if let Some(fk) = &column.foreign_key {
                    add_edge(&fk.foreign_table, table_name, table_name)?;
                }
            }
        }

        Ok(Self {
            graph,
            node_indices,
        })
    }

    pub fn table_name(&self, idx: NodeIndex) -> &str {
        &self.graph[idx]
    }

    pub fn table_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}
