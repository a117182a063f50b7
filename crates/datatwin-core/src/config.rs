//! # Configuration File Parser
//!
//! Reads and parses `datatwin.toml`, the optional configuration file that
//! customizes a run without CLI flags. Supports:
//!
//! - `[generate]` — pass count and random seed
//! - `[llm]` — similar-data source endpoint settings
//! - `[anchor]` — parent-anchor selection strategy
//! - `[dependency.<table>]` — replace or add a table's parent dependency
//!   before synthesis
//!
//! Example `datatwin.toml`:
//!
//! ```toml
//! [generate]
//! passes = 50
//! seed = 42
//!
//! [llm]
//! enabled = true
//! url = "http://localhost:11434/api/generate"
//! model = "gemma2:latest"
//! timeout_secs = 45
//! batch_size = 20
//!
//! [anchor]
//! strategy = "latest"
//!
//! [dependency.visits]
//! dep_table = "stores"
//! dep_relation = "2:4"
//!
//! [dependency.visits.columns.store_id]
//! field = "store_id"
//!
//! [dependency.visits.columns.region]
//! field = "region"
//! func = "uppercase"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::{DataTwinError, Result};
use crate::generate::transforms::Transform;
use crate::profile::{AnchorStrategy, DependencyColumn, DependencySpec, SchemaProfile};

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = "datatwin.toml";

/// Top-level datatwin.toml structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DataTwinConfig {
    pub generate: GenerateConfig,
    pub llm: LlmConfig,
    pub anchor: AnchorConfig,
    /// Per-table dependency overrides, keyed by table name. Applied to
    /// the profile before synthesis; an override replaces the table's
    /// declared dependency wholesale.
    pub dependency: BTreeMap<String, DependencyOverride>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GenerateConfig {
    pub passes: Option<u32>,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub enabled: bool,
    pub url: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: Option<u64>,
    pub batch_size: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AnchorConfig {
    /// `"latest"` or `"random"`.
    pub strategy: Option<String>,
}

/// One `[dependency.<table>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DependencyOverride {
    pub dep_table: String,
    /// `"min:max"` children per anchor and pass.
    pub dep_relation: String,
    #[serde(default)]
    pub columns: BTreeMap<String, DependencyColumnOverride>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DependencyColumnOverride {
    pub field: String,
    pub func: Option<String>,
}

/// Read and parse a datatwin.toml from the given directory.
///
/// Returns `None` if the file doesn't exist (config is optional).
/// Returns an error if the file exists but can't be parsed or fails
/// semantic validation.
pub fn read_config(dir: &Path) -> Result<Option<DataTwinConfig>> {
    let path = dir.join(CONFIG_FILE_NAME);
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(&path).map_err(|e| DataTwinError::Config {
        message: format!("failed to read {}: {}", path.display(), e),
    })?;

    let config: DataTwinConfig = toml::from_str(&content).map_err(|e| DataTwinError::Config {
        message: format!("failed to parse {}: {}", path.display(), e),
    })?;

    config.validate()?;
    Ok(Some(config))
}

impl DataTwinConfig {
    /// Semantic constraints serde can't enforce: anchor strategy names,
    /// transform names, and cardinality ranges.
    pub fn validate(&self) -> Result<()> {
        self.anchor_strategy()?;
        for (table, dep) in &self.dependency {
            parse_relation(table, &dep.dep_relation)?;
            for (column, rule) in &dep.columns {
                if let Some(func) = &rule.func {
                    if Transform::from_name(func).is_none() {
                        return Err(DataTwinError::Config {
                            message: format!(
                                "[dependency.{}] column '{}': unknown transform '{}'",
                                table, column, func
                            ),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    pub fn anchor_strategy(&self) -> Result<AnchorStrategy> {
        match self.anchor.strategy.as_deref() {
            None => Ok(AnchorStrategy::default()),
            Some(name) => AnchorStrategy::from_name(name).ok_or_else(|| DataTwinError::Config {
                message: format!(
                    "[anchor] strategy '{}' is not one of 'latest', 'random'",
                    name
                ),
            }),
        }
    }

    /// Replace or add dependency declarations on the profile. Overriding
    /// a table the profile doesn't have is a config error.
    pub fn apply_dependency_overrides(&self, profile: &mut SchemaProfile) -> Result<()> {
        for (table_name, over) in &self.dependency {
            let Some(table) = profile.tables.get_mut(table_name) else {
                return Err(DataTwinError::Config {
                    message: format!(
                        "[dependency.{}] references a table the profile does not contain",
                        table_name
                    ),
                });
            };

            let (min_children, max_children) = parse_relation(table_name, &over.dep_relation)?;
            let mut columns = IndexMap::new();
            for (column, rule) in &over.columns {
                let transform = match &rule.func {
                    Some(func) => Transform::from_name(func),
                    None => None,
                };
                columns.insert(
                    column.clone(),
                    DependencyColumn {
                        parent_field: rule.field.clone(),
                        transform,
                    },
                );
            }

            table.dependency = Some(DependencySpec {
                dep_table: over.dep_table.clone(),
                min_children,
                max_children,
                columns,
            });
        }

        // An overridden rule pointing at a field the parent doesn't carry
        // is the same mistake the loader rejects in the document itself.
        for table in profile.tables.values() {
            crate::profile::load::validate_dependency(table, profile).map_err(|e| {
                DataTwinError::Config {
                    message: format!("dependency override: {}", e),
                }
            })?;
        }
        Ok(())
    }
}

fn parse_relation(table: &str, relation: &str) -> Result<(u32, u32)> {
    let malformed = || DataTwinError::Config {
        message: format!(
            "[dependency.{}] dep_relation '{}' is not of the form 'min:max'",
            table, relation
        ),
    };

    let (min, max) = relation.split_once(':').ok_or_else(malformed)?;
    let min: u32 = min.trim().parse().map_err(|_| malformed())?;
    let max: u32 = max.trim().parse().map_err(|_| malformed())?;
    if min > max {
        return Err(DataTwinError::Config {
            message: format!(
                "[dependency.{}] dep_relation '{}' has min > max",
                table, relation
            ),
        });
    }
    Ok((min, max))
}
