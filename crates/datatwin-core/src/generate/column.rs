//! # Column Value Synthesis
//!
//! Produces one value for one column given its resolved [`ColumnKind`],
//! its statistics, and the partially built dataset (foreign-key and
//! code-table lookups). Returns:
//!
//! - `Ok(Some(value))` — a value was produced;
//! - `Ok(None)` — cannot produce (empty parent table, key retry bound
//!   exhausted); the caller abandons just the current record;
//! - `Err(..)` — fatal for the whole run (unparseable date bound, LLM
//!   transport failure).

use std::collections::HashMap;

use chrono::NaiveDateTime;
use fake::faker::lorem::en::Word;
use fake::Fake;
use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::Rng;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::classify;
use crate::error::{DataTwinError, Result};
use crate::generate::dates;
use crate::generate::value::{Record, Value};
use crate::llm::SimilarValueSource;
use crate::profile::{ColumnKind, ColumnSpec, KeyType, TableSpec};

use super::unique::UniquenessRegistry;

/// Retry bound for key candidate generation.
pub const KEY_MAX_ATTEMPTS: usize = 100;

/// Default key candidate range for integers and decimals.
const KEY_RANGE_MAX: i64 = 1_000_000;

/// Emitted for long free-text columns, which are deliberately unmodeled.
pub const LONG_TEXT_PLACEHOLDER: &str = "<unmodeled text>";

/// Mutable state owned by one generation run: the random source, the
/// uniqueness ledger, and the per-(table, column) cache of LLM batches.
pub struct RunState<'a> {
    pub rng: StdRng,
    pub registry: UniquenessRegistry,
    pub llm: Option<&'a dyn SimilarValueSource>,
    pub llm_cache: HashMap<(String, String), Vec<String>>,
    pub llm_batch_size: usize,
    pub base_time: NaiveDateTime,
}

impl<'a> RunState<'a> {
    pub fn new(seed: u64, base_time: NaiveDateTime, llm: Option<&'a dyn SimilarValueSource>) -> Self {
        use rand::SeedableRng;
        Self {
            rng: StdRng::seed_from_u64(seed),
            registry: UniquenessRegistry::new(),
            llm,
            llm_cache: HashMap::new(),
            llm_batch_size: 20,
            base_time,
        }
    }
}

/// Synthesize one value for `column` of `table`.
pub fn synthesize_column(
    table: &TableSpec,
    column: &ColumnSpec,
    dataset: &IndexMap<String, Vec<Record>>,
    state: &mut RunState,
) -> Result<Option<Value>> {
    match &column.kind {
        ColumnKind::ForeignKey {
            table: fk_table,
            column: fk_column,
        } => Ok(pick_foreign(table, column, fk_table, fk_column, dataset, state)),

        ColumnKind::Key(key_type) => Ok(reserve_key(table, column, *key_type, state)),

        ColumnKind::CodeTableBacked { table: code_table } => {
            let rows = dataset.get(code_table).map(Vec::as_slice).unwrap_or(&[]);
            if rows.is_empty() {
                return Ok(None);
            }
            let row = &rows[state.rng.random_range(0..rows.len())];
            Ok(row.get("value").cloned())
        }

        ColumnKind::LlmGenerated => llm_value(table, column, state),

        ColumnKind::Pattern(family) => Ok(Some(classify::generate_for_family(
            *family,
            &column.sample_data,
            &mut state.rng,
            state.base_time,
        ))),

        ColumnKind::Numeric { integer } => Ok(Some(numeric_value(column, *integer, state))),

        ColumnKind::Categorical => Ok(Some(categorical_value(column, state))),

        ColumnKind::Date => date_value(table, column, state).map(Some),

        ColumnKind::Boolean => Ok(Some(Value::Bool(state.rng.random_bool(0.5)))),

        ColumnKind::LongText => Ok(Some(Value::String(LONG_TEXT_PLACEHOLDER.to_string()))),

        ColumnKind::Unsupported => Ok(Some(Value::Null)),
    }
}

/// Foreign key: a value already present in the referenced parent column,
/// picked uniformly. An empty parent means the record cannot be anchored.
fn pick_foreign(
    table: &TableSpec,
    column: &ColumnSpec,
    fk_table: &str,
    fk_column: &str,
    dataset: &IndexMap<String, Vec<Record>>,
    state: &mut RunState,
) -> Option<Value> {
    let rows = dataset.get(fk_table).map(Vec::as_slice).unwrap_or(&[]);
    if rows.is_empty() {
        debug!(
            "{}.{}: referenced table '{}' has no records yet, abandoning record",
            table.name, column.name, fk_table
        );
        return None;
    }
    let row = &rows[state.rng.random_range(0..rows.len())];
    row.get(fk_column).cloned()
}

/// Primary/unique key: random type-appropriate candidates checked against
/// the registry, up to [`KEY_MAX_ATTEMPTS`].
fn reserve_key(
    table: &TableSpec,
    column: &ColumnSpec,
    key_type: KeyType,
    state: &mut RunState,
) -> Option<Value> {
    if key_type == KeyType::Unsupported {
        warn!(
            "{}.{}: declared type '{}' has no key generator, abandoning record",
            table.name, column.name, column.declared_type
        );
        return None;
    }

    for _ in 0..KEY_MAX_ATTEMPTS {
        let candidate = key_candidate(key_type, state);
        if state.registry.reserve(&table.name, &column.name, &candidate) {
            return Some(candidate);
        }
    }

    warn!(
        "{}.{}: no unique key value after {} attempts, abandoning record",
        table.name, column.name, KEY_MAX_ATTEMPTS
    );
    None
}

fn key_candidate(key_type: KeyType, state: &mut RunState) -> Value {
    match key_type {
        KeyType::Int => Value::Int(state.rng.random_range(0..=KEY_RANGE_MAX)),
        KeyType::Decimal => {
            let raw = state.rng.random::<f64>() * KEY_RANGE_MAX as f64;
            Value::Float(round2(raw))
        }
        KeyType::Text => Value::String(Uuid::new_v4().to_string()),
        KeyType::DateTime => {
            let epoch = chrono::NaiveDate::from_ymd_opt(1970, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap();
            let instant = dates::random_instant(epoch, state.base_time, &mut state.rng);
            Value::String(instant.format("%Y-%m-%dT%H:%M:%S").to_string())
        }
        KeyType::Unsupported => Value::Null,
    }
}

/// LLM-backed column. The external source is consulted once per
/// (table, column) per run; the batch is cached and records pick from it.
/// A batch smaller than the sample set falls back to the samples
/// themselves. Transport errors propagate unretried.
fn llm_value(
    table: &TableSpec,
    column: &ColumnSpec,
    state: &mut RunState,
) -> Result<Option<Value>> {
    let key = (table.name.clone(), column.name.clone());
    if !state.llm_cache.contains_key(&key) {
        let batch = match state.llm {
            Some(source) => source.generate_similar(&column.sample_data, state.llm_batch_size)?,
            None => {
                debug!(
                    "{}.{}: no similar-data source configured, using samples",
                    table.name, column.name
                );
                Vec::new()
            }
        };
        state.llm_cache.insert(key.clone(), batch);
    }

    let batch = &state.llm_cache[&key];
    let pool: &[String] = if batch.len() < column.sample_data.len() {
        &column.sample_data
    } else {
        batch
    };
    if pool.is_empty() {
        return Ok(None);
    }
    let pick = pool[state.rng.random_range(0..pool.len())].clone();
    Ok(Some(Value::String(pick)))
}

fn numeric_value(column: &ColumnSpec, integer: bool, state: &mut RunState) -> Value {
    let default_max = if integer { KEY_RANGE_MAX as f64 } else { 1000.0 };
    let (min, max) = match (column.stat_f64("min"), column.stat_f64("max")) {
        (Some(min), Some(max)) if min <= max => (min, max),
        _ => (0.0, default_max),
    };

    if integer {
        Value::Int(state.rng.random_range(min as i64..=max as i64))
    } else {
        let raw = min + state.rng.random::<f64>() * (max - min);
        Value::Float(round2(raw))
    }
}

/// Categorical: the stats map is `{observed value → frequency}`. Weighted
/// choice by frequency; malformed weights fall back to a uniform pick
/// among the observed keys; no stats at all falls back to a random word.
fn categorical_value(column: &ColumnSpec, state: &mut RunState) -> Value {
    if column.stats.is_empty() {
        let word: String = Word().fake_with_rng(&mut state.rng);
        return Value::String(word);
    }

    let keys: Vec<&String> = column.stats.keys().collect();
    let weights: Option<Vec<f64>> = column
        .stats
        .values()
        .map(|v| match v {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        })
        .collect();

    let idx = match weights {
        Some(w) => weighted_index(&w, &mut state.rng),
        None => state.rng.random_range(0..keys.len()),
    };
    Value::String(keys[idx].clone())
}

/// Weighted index selection over a cumulative distribution. Negative
/// weights clamp to zero; an all-zero total falls back to uniform.
fn weighted_index(weights: &[f64], rng: &mut StdRng) -> usize {
    let clamped: Vec<f64> = weights.iter().map(|w| w.max(0.0)).collect();
    let total: f64 = clamped.iter().sum();
    if total <= 0.0 {
        return rng.random_range(0..weights.len());
    }

    let roll = rng.random::<f64>() * total;
    let mut cumulative = 0.0;
    for (i, w) in clamped.iter().enumerate() {
        cumulative += w;
        if roll < cumulative {
            return i;
        }
    }
    weights.len() - 1
}

/// Date/time: a uniform instant between the column's stat bounds,
/// rendered in the format detected from the column's own samples.
/// An unparseable bound is fatal for the run.
fn date_value(table: &TableSpec, column: &ColumnSpec, state: &mut RunState) -> Result<Value> {
    let parse = |key: &str, default: NaiveDateTime| -> Result<NaiveDateTime> {
        match column.stat_str(key) {
            Some(raw) => {
                dates::parse_bound(raw, state.base_time).ok_or_else(|| DataTwinError::DateBound {
                    value: raw.to_string(),
                    table: table.name.clone(),
                    column: column.name.clone(),
                })
            }
            None => Ok(default),
        }
    };

    let epoch = chrono::NaiveDate::from_ymd_opt(1970, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let min = parse("min_date", epoch)?;
    let max = parse("max_date", state.base_time)?;

    let instant = dates::random_instant(min, max, &mut state.rng);
    let format = dates::detect_sample_format(&column.sample_data).unwrap_or(dates::ISO_DATE);
    Ok(Value::String(instant.format(format).to_string()))
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
