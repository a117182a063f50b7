//! End-to-end synthesis runs over small statistics documents, checking
//! referential closure, uniqueness, cardinality, scheduling, and output
//! formatting together.

use datatwin_core::generate::{synthesize, SynthesisOptions, Value};
use datatwin_core::graph::{schedule, DependencyGraph};
use datatwin_core::{load_profile, synthesize_document, DataTwinError};
use serde_json::json;

fn options(passes: u32, seed: u64) -> SynthesisOptions {
    SynthesisOptions {
        passes,
        seed,
        ..SynthesisOptions::default()
    }
}

fn retail_doc() -> serde_json::Value {
    json!({
        "currency": {
            "is_codetable": true,
            "data": [
                {"id": 1, "value": "USD"},
                {"id": 2, "value": "EUR"},
                {"id": 3, "value": "GBP"}
            ]
        },
        "stores": {
            "is_codetable": false,
            "columns": [
                {"name": "store_id", "type": "integer", "stats": {}, "sample_data": [],
                 "is_primary_key": true, "is_unique": false},
                {"name": "opened_on", "type": "date",
                 "stats": {"min_date": "2015-01-01", "max_date": "2020-12-31"},
                 "sample_data": ["2018-03-09"],
                 "is_primary_key": false, "is_unique": false}
            ]
        },
        "visits": {
            "is_codetable": false,
            "dependency": {
                "dep_table": "stores",
                "dep_relation": "2:4",
                "dependencies": {"store_id": {"field": "store_id", "func": null}}
            },
            "columns": [
                {"name": "visit_id", "type": "integer", "stats": {}, "sample_data": [],
                 "is_primary_key": true, "is_unique": false},
                {"name": "store_id", "type": "integer", "stats": {}, "sample_data": [],
                 "is_primary_key": false, "is_unique": false},
                {"name": "currency", "type": "character varying", "stats": {},
                 "sample_data": [], "is_primary_key": false, "is_unique": false},
                {"name": "spend", "type": "numeric", "stats": {"min": 5, "max": 250},
                 "sample_data": [], "is_primary_key": false, "is_unique": false}
            ]
        }
    })
}

#[test]
fn foreign_keys_close_over_generated_parents() {
    let result = synthesize_document(&retail_doc(), 6).unwrap();

    let store_ids: Vec<String> = result.tables["stores"]
        .iter()
        .map(|r| r.get("store_id").unwrap().to_unique_key())
        .collect();

    assert!(!result.tables["visits"].is_empty());
    for visit in &result.tables["visits"] {
        let fk = visit.get("store_id").unwrap().to_unique_key();
        assert!(store_ids.contains(&fk), "dangling store_id {}", fk);
    }
}

#[test]
fn primary_keys_unique_across_all_passes() {
    let result = synthesize_document(&retail_doc(), 10).unwrap();

    for table in ["stores", "visits"] {
        let key_column = if table == "stores" { "store_id" } else { "visit_id" };
        let mut seen = std::collections::HashSet::new();
        for record in &result.tables[table] {
            let key = record.get(key_column).unwrap().to_unique_key();
            assert!(seen.insert(key), "duplicate {} in {}", key_column, table);
        }
    }
}

#[test]
fn child_counts_stay_in_declared_range() {
    let passes = 5;
    let result = synthesize_document(&retail_doc(), passes).unwrap();
    let stores = result.tables["stores"].len();
    let visits = result.tables["visits"].len();

    assert_eq!(stores, passes as usize);
    assert!(
        (2 * passes as usize..=4 * passes as usize).contains(&visits),
        "{} visits for {} passes of 2:4",
        visits,
        passes
    );
}

#[test]
fn code_table_values_feed_matching_columns() {
    let result = synthesize_document(&retail_doc(), 5).unwrap();
    for visit in &result.tables["visits"] {
        let currency = visit.get("currency").unwrap().as_str().unwrap();
        assert!(["USD", "EUR", "GBP"].contains(&currency), "{}", currency);
    }
}

#[test]
fn code_tables_are_verbatim_and_separate() {
    let result = synthesize_document(&retail_doc(), 2).unwrap();

    assert!(!result.tables.contains_key("currency"));
    let currency = &result.code_tables["currency"];
    assert_eq!(currency.len(), 3);
    assert_eq!(currency[0].get("id"), Some(&Value::Int(1)));
    assert_eq!(
        currency[2].get("value"),
        Some(&Value::String("GBP".to_string()))
    );
}

#[test]
fn numeric_stats_bound_generated_values() {
    let result = synthesize_document(&retail_doc(), 10).unwrap();
    for visit in &result.tables["visits"] {
        match visit.get("spend").unwrap() {
            Value::Float(f) => assert!((5.0..=250.0).contains(f), "spend {}", f),
            other => panic!("expected float spend, got {:?}", other),
        }
    }
}

#[test]
fn date_output_follows_sample_format_within_bounds() {
    let doc = json!({
        "trades": {
            "is_codetable": false,
            "columns": [
                {"name": "traded_on", "type": "date",
                 "stats": {"min_date": "2020-01-01", "max_date": "2020-01-31"},
                 "sample_data": ["2020/01/15"],
                 "is_primary_key": false, "is_unique": false}
            ]
        }
    });

    let result = synthesize_document(&doc, 20).unwrap();
    for trade in &result.tables["trades"] {
        let s = trade.get("traded_on").unwrap().as_str().unwrap();
        let parsed = chrono::NaiveDate::parse_from_str(s, "%Y/%m/%d")
            .unwrap_or_else(|_| panic!("not in sample format: {}", s));
        assert!(
            parsed >= chrono::NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
                && parsed <= chrono::NaiveDate::from_ymd_opt(2020, 1, 31).unwrap(),
            "{} out of bounds",
            s
        );
    }
}

#[test]
fn schedule_orders_parents_first_with_declaration_tiebreak() {
    let profile = load_profile(&retail_doc()).unwrap();
    let graph = DependencyGraph::from_profile(&profile).unwrap();
    let order = schedule(&graph).unwrap();
    // currency and stores are both ready at the start; currency is
    // declared first. visits waits on stores.
    assert_eq!(order, vec!["currency", "stores", "visits"]);
}

#[test]
fn cycles_abort_before_any_generation() {
    let doc = json!({
        "a": {
            "is_codetable": false,
            "dependency": {"dep_table": "b", "dep_relation": "1:1"},
            "columns": []
        },
        "b": {
            "is_codetable": false,
            "dependency": {"dep_table": "a", "dep_relation": "1:1"},
            "columns": []
        }
    });

    let err = synthesize_document(&doc, 1).unwrap_err();
    assert!(matches!(err, DataTwinError::CircularDependency { .. }));
}

#[test]
fn unknown_foreign_table_is_fatal() {
    let doc = json!({
        "orders": {
            "is_codetable": false,
            "columns": [
                {"name": "customer_id", "type": "integer", "stats": {}, "sample_data": [],
                 "is_primary_key": false, "is_unique": false,
                 "foreign_key": {"foreign_table_name": "customers",
                                  "foreign_column_name": "customer_id"}}
            ]
        }
    });

    let err = synthesize_document(&doc, 1).unwrap_err();
    match err {
        DataTwinError::UnknownTable {
            table,
            referenced_by,
        } => {
            assert_eq!(table, "customers");
            assert_eq!(referenced_by, "orders");
        }
        other => panic!("expected UnknownTable, got {:?}", other),
    }
}

#[test]
fn identical_seeds_reproduce_identical_datasets() {
    let profile = load_profile(&retail_doc()).unwrap();
    let opts = options(8, 123);
    let a = synthesize(&profile, &opts, None, None).unwrap();
    let b = synthesize(&profile, &opts, None, None).unwrap();
    assert_eq!(format!("{:?}", a.tables), format!("{:?}", b.tables));

    let different = synthesize(&profile, &options(8, 124), None, None).unwrap();
    assert_ne!(
        format!("{:?}", a.tables),
        format!("{:?}", different.tables),
        "different seeds should not collide on a dataset this size"
    );
}

#[test]
fn written_json_parses_and_excludes_code_tables() {
    let result = synthesize_document(&retail_doc(), 3).unwrap();
    let mut buffer = Vec::new();
    datatwin_core::output::write_json(&mut buffer, &result).unwrap();

    let parsed: serde_json::Value =
        serde_json::from_str(&String::from_utf8(buffer).unwrap()).unwrap();
    assert!(parsed["stores"].is_array());
    assert!(parsed["visits"].is_array());
    assert!(parsed.get("currency").is_none());
    assert_eq!(parsed["stores"].as_array().unwrap().len(), 3);
}

#[test]
fn written_csv_has_a_section_per_table() {
    let result = synthesize_document(&retail_doc(), 2).unwrap();
    let mut buffer = Vec::new();
    datatwin_core::output::write_csv(&mut buffer, &result).unwrap();

    let text = String::from_utf8(buffer).unwrap();
    assert!(text.contains("# Table: stores"));
    assert!(text.contains("# Table: visits"));
    assert!(text.contains("store_id,opened_on"));
}
