//! # Synthesis Engine
//!
//! Top-level orchestration of a generation run: build the dependency
//! graph, compute the table schedule, materialize code tables once, then
//! run N passes of record generation in schedule order. Within a pass a
//! table sees everything generated before it, including earlier tables
//! of the same pass.

use chrono::{NaiveDateTime, Utc};
use indexmap::IndexMap;
use tracing::{debug, info};

use crate::error::Result;
use crate::generate::column::RunState;
use crate::generate::record::generate_for_table;
use crate::generate::value::Record;
use crate::graph::{schedule, DependencyGraph};
use crate::llm::SimilarValueSource;
use crate::profile::{load_profile, AnchorStrategy, SchemaProfile};

/// Knobs for one generation run. `base_time` is pinned when the options
/// are built, so "now"-relative date bounds resolve identically across
/// a seeded run.
#[derive(Debug, Clone)]
pub struct SynthesisOptions {
    pub passes: u32,
    pub seed: u64,
    pub anchor: AnchorStrategy,
    pub base_time: NaiveDateTime,
    pub llm_batch_size: usize,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            passes: 10,
            seed: 42,
            anchor: AnchorStrategy::default(),
            base_time: Utc::now().naive_utc(),
            llm_batch_size: 20,
        }
    }
}

/// The output of a run. `tables` holds only synthesized (non-code)
/// tables; code tables are carried verbatim in `code_tables`. With zero
/// passes, `tables` is empty of records and `code_tables` is still
/// populated.
#[derive(Debug)]
pub struct SynthesisResult {
    pub tables: IndexMap<String, Vec<Record>>,
    pub code_tables: IndexMap<String, Vec<Record>>,
}

/// Run synthesis over a loaded profile.
///
/// `progress`, when given, is called after each table of each pass with
/// `(table_name, pass, total_passes)`.
pub fn synthesize(
    profile: &SchemaProfile,
    options: &SynthesisOptions,
    llm: Option<&dyn SimilarValueSource>,
    progress: Option<&dyn Fn(&str, usize, usize)>,
) -> Result<SynthesisResult> {
    let graph = DependencyGraph::from_profile(profile)?;
    let order = schedule(&graph)?;
    info!(
        "synthesizing {} tables over {} passes (seed {})",
        profile.table_count(),
        options.passes,
        options.seed
    );
    debug!("table schedule: {:?}", order);

    let mut state = RunState::new(options.seed, options.base_time, llm);
    state.llm_batch_size = options.llm_batch_size;

    // Code tables are materialized once, before any pass, so every
    // lookup (FK, code-table-backed columns) sees them from the start.
    let mut dataset: IndexMap<String, Vec<Record>> = IndexMap::new();
    for table in profile.tables.values() {
        if table.is_code_table {
            dataset.insert(table.name.clone(), table.code_rows.clone());
        }
    }

    for pass in 1..=options.passes {
        for name in &order {
            let Some(table) = profile.table(name) else {
                continue;
            };
            if table.is_code_table {
                continue;
            }
            generate_for_table(table, &mut dataset, &mut state, options.anchor)?;
            if let Some(report) = progress {
                report(name, pass as usize, options.passes as usize);
            }
        }
    }

    // Split along the code-table line, preserving declaration order.
    let mut tables = IndexMap::new();
    let mut code_tables = IndexMap::new();
    for table in profile.tables.values() {
        let rows = dataset.shift_remove(&table.name).unwrap_or_default();
        if table.is_code_table {
            code_tables.insert(table.name.clone(), rows);
        } else {
            tables.insert(table.name.clone(), rows);
        }
    }

    Ok(SynthesisResult {
        tables,
        code_tables,
    })
}

/// Load a statistics document and synthesize with default options, no
/// similar-data source, and no progress reporting.
pub fn synthesize_document(doc: &serde_json::Value, passes: u32) -> Result<SynthesisResult> {
    let profile = load_profile(doc)?;
    let options = SynthesisOptions {
        passes,
        ..SynthesisOptions::default()
    };
    synthesize(&profile, &options, None, None)
}
