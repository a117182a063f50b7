//! # Record Generation
//!
//! One pass over one table: either a single record (no dependency) or a
//! batch of child records anchored to a parent record. A failed column
//! abandons just the record under construction — nothing partial is ever
//! inserted into the dataset.

use indexmap::IndexMap;
use rand::Rng;
use tracing::debug;

use crate::error::Result;
use crate::generate::column::{synthesize_column, RunState};
use crate::generate::value::{Record, Value};
use crate::profile::{AnchorStrategy, DependencySpec, TableSpec};

/// Generate this pass's records for `table`, appending to `dataset`.
///
/// With a dependency: skip entirely when the parent table has no records
/// yet, otherwise select an anchor per `strategy`, draw a child count
/// from the cardinality range, and generate each child independently.
pub fn generate_for_table(
    table: &TableSpec,
    dataset: &mut IndexMap<String, Vec<Record>>,
    state: &mut RunState,
    strategy: AnchorStrategy,
) -> Result<()> {
    let Some(dep) = &table.dependency else {
        if let Some(record) = build_record(table, None, dataset, state)? {
            dataset.entry(table.name.clone()).or_default().push(record);
        } else {
            debug!("{}: record abandoned", table.name);
        }
        return Ok(());
    };

    let parent_rows = dataset.get(&dep.dep_table).map(Vec::as_slice).unwrap_or(&[]);
    if parent_rows.is_empty() {
        debug!(
            "{}: parent '{}' has no records this pass, skipping",
            table.name, dep.dep_table
        );
        return Ok(());
    }

    let anchor = match strategy {
        AnchorStrategy::Latest => parent_rows[parent_rows.len() - 1].clone(),
        AnchorStrategy::Random => {
            parent_rows[state.rng.random_range(0..parent_rows.len())].clone()
        }
    };

    let count = state
        .rng
        .random_range(dep.min_children..=dep.max_children);
    let mut batch = Vec::with_capacity(count as usize);
    for _ in 0..count {
        match build_record(table, Some((&anchor, dep)), dataset, state)? {
            Some(record) => batch.push(record),
            // A failed column aborts just this child, not the batch.
            None => debug!("{}: child record abandoned", table.name),
        }
    }
    dataset.entry(table.name.clone()).or_default().extend(batch);
    Ok(())
}

/// Build one record, column by column. Dependency-bound columns derive
/// from the anchor (directly or through their transform); everything else
/// goes through column synthesis. `None` means the record was abandoned.
fn build_record(
    table: &TableSpec,
    anchored: Option<(&Record, &DependencySpec)>,
    dataset: &IndexMap<String, Vec<Record>>,
    state: &mut RunState,
) -> Result<Option<Record>> {
    let mut record = Record::new();

    for column in &table.columns {
        let derived = anchored.and_then(|(anchor, dep)| {
            dep.columns.get(&column.name).map(|rule| {
                let raw = anchor
                    .get(&rule.parent_field)
                    .cloned()
                    .unwrap_or(Value::Null);
                match &rule.transform {
                    Some(transform) => transform.apply(&raw),
                    None => raw,
                }
            })
        });

        let value = match derived {
            Some(v) => Some(v),
            None => synthesize_column(table, column, dataset, state)?,
        };

        let Some(value) = value else {
            return Ok(None);
        };
        record.insert(column.name.clone(), value);
    }

    Ok(Some(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::load_profile;
    use crate::profile::SchemaProfile;
    use chrono::NaiveDateTime;
    use serde_json::json;

    fn run_state(seed: u64) -> RunState<'static> {
        let base = NaiveDateTime::parse_from_str("2024-06-01 00:00:00", "%Y-%m-%d %H:%M:%S")
            .unwrap();
        RunState::new(seed, base, None)
    }

    fn parent_child_profile() -> SchemaProfile {
        load_profile(&json!({
            "stores": {"is_codetable": false, "columns": [
                {"name": "store_id", "type": "integer", "stats": {}, "sample_data": [],
                 "is_primary_key": true, "is_unique": false},
                {"name": "region", "type": "character varying",
                 "stats": {"north": 1.0, "south": 1.0}, "sample_data": [],
                 "is_primary_key": false, "is_unique": false}
            ]},
            "visits": {
                "is_codetable": false,
                "dependency": {
                    "dep_table": "stores",
                    "dep_relation": "2:4",
                    "dependencies": {
                        "store_id": {"field": "store_id", "func": null},
                        "store_region": {"field": "region", "func": "uppercase"}
                    }
                },
                "columns": [
                    {"name": "visit_id", "type": "integer", "stats": {}, "sample_data": [],
                     "is_primary_key": true, "is_unique": false},
                    {"name": "store_id", "type": "integer", "stats": {}, "sample_data": [],
                     "is_primary_key": false, "is_unique": false},
                    {"name": "store_region", "type": "character varying", "stats": {},
                     "sample_data": [], "is_primary_key": false, "is_unique": false}
                ]
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_no_dependency_generates_one_record() {
        let profile = parent_child_profile();
        let stores = profile.table("stores").unwrap();
        let mut dataset = IndexMap::new();
        let mut state = run_state(1);

        generate_for_table(stores, &mut dataset, &mut state, AnchorStrategy::Latest).unwrap();
        assert_eq!(dataset["stores"].len(), 1);
        assert!(dataset["stores"][0].contains_key("store_id"));
    }

    #[test]
    fn test_dependent_skipped_when_parent_empty() {
        let profile = parent_child_profile();
        let visits = profile.table("visits").unwrap();
        let mut dataset = IndexMap::new();
        let mut state = run_state(2);

        generate_for_table(visits, &mut dataset, &mut state, AnchorStrategy::Latest).unwrap();
        assert!(dataset.get("visits").is_none_or(|v| v.is_empty()));
    }

    #[test]
    fn test_children_anchor_to_latest_parent() {
        let profile = parent_child_profile();
        let stores = profile.table("stores").unwrap();
        let visits = profile.table("visits").unwrap();
        let mut dataset = IndexMap::new();
        let mut state = run_state(3);

        generate_for_table(stores, &mut dataset, &mut state, AnchorStrategy::Latest).unwrap();
        generate_for_table(stores, &mut dataset, &mut state, AnchorStrategy::Latest).unwrap();
        let latest_id = dataset["stores"][1].get("store_id").cloned().unwrap();
        let latest_region = dataset["stores"][1].get("region").cloned().unwrap();

        generate_for_table(visits, &mut dataset, &mut state, AnchorStrategy::Latest).unwrap();
        let children = &dataset["visits"];
        assert!(
            (2..=4).contains(&children.len()),
            "child count {} outside 2:4",
            children.len()
        );
        for child in children {
            assert_eq!(child.get("store_id"), Some(&latest_id));
            // transform applied to the derived column
            let region = latest_region.as_str().unwrap().to_uppercase();
            assert_eq!(child.get("store_region"), Some(&Value::String(region.clone())));
        }
    }

    #[test]
    fn test_failed_column_abandons_only_that_record() {
        // Child has an FK to a table that stays empty: every child fails,
        // but generation itself succeeds and the parent batch is unharmed.
        let profile = load_profile(&json!({
            "stores": {"is_codetable": false, "columns": [
                {"name": "store_id", "type": "integer", "stats": {}, "sample_data": [],
                 "is_primary_key": true, "is_unique": false}
            ]},
            "ghost": {"is_codetable": false, "columns": [
                {"name": "gid", "type": "integer", "stats": {}, "sample_data": [],
                 "is_primary_key": true, "is_unique": false}
            ]},
            "visits": {
                "is_codetable": false,
                "dependency": {"dep_table": "stores", "dep_relation": "3:3"},
                "columns": [
                    {"name": "gid", "type": "integer", "stats": {}, "sample_data": [],
                     "is_primary_key": false, "is_unique": false,
                     "foreign_key": {"foreign_table_name": "ghost",
                                      "foreign_column_name": "gid"}}
                ]
            }
        }))
        .unwrap();

        let mut dataset = IndexMap::new();
        let mut state = run_state(4);
        generate_for_table(
            profile.table("stores").unwrap(),
            &mut dataset,
            &mut state,
            AnchorStrategy::Latest,
        )
        .unwrap();
        generate_for_table(
            profile.table("visits").unwrap(),
            &mut dataset,
            &mut state,
            AnchorStrategy::Latest,
        )
        .unwrap();

        assert_eq!(dataset["stores"].len(), 1);
        assert!(dataset.get("visits").is_none_or(|v| v.is_empty()));
    }

    #[test]
    fn test_random_anchor_stays_within_parents() {
        let profile = parent_child_profile();
        let stores = profile.table("stores").unwrap();
        let visits = profile.table("visits").unwrap();
        let mut dataset = IndexMap::new();
        let mut state = run_state(5);

        for _ in 0..3 {
            generate_for_table(stores, &mut dataset, &mut state, AnchorStrategy::Random).unwrap();
        }
        generate_for_table(visits, &mut dataset, &mut state, AnchorStrategy::Random).unwrap();

        let parent_ids: Vec<Value> = dataset["stores"]
            .iter()
            .map(|r| r.get("store_id").cloned().unwrap())
            .collect();
        for child in &dataset["visits"] {
            assert!(parent_ids.contains(child.get("store_id").unwrap()));
        }
    }
}
