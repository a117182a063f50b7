//! # Statistics Document Loader
//!
//! Parses the collector's JSON statistics document into a [`SchemaProfile`]
//! and resolves every column's [`ColumnKind`] exactly once. Synthesis never
//! re-inspects raw stats to decide what a column is.
//!
//! Validation here is structural and fatal: missing required fields,
//! malformed `dep_relation` ranges, unknown transform names, and dependency
//! columns pointing at fields the parent table does not have. Unknown table
//! *names* are left to the graph builder, which owns that failure mode.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::classify::{self, PatternFamily};
use crate::error::{DataTwinError, Result};
use crate::generate::transforms::{Transform, KNOWN_TRANSFORMS};
use crate::generate::value::{Record, Value};
use crate::profile::types::*;

/// Stat `note` values that mark a column's type as externally pinned
/// (config override or an upstream LLM classification pass).
const PINNED_NOTES: &[&str] = &["Type specified in config.yaml", "LLM classification result"];

/// Parse a statistics document from its JSON text.
pub fn load_profile_str(text: &str) -> Result<SchemaProfile> {
    let doc: serde_json::Value = serde_json::from_str(text).map_err(|e| DataTwinError::Stats {
        message: format!("invalid JSON: {}", e),
    })?;
    load_profile(&doc)
}

/// Build a [`SchemaProfile`] from a parsed statistics document.
pub fn load_profile(doc: &serde_json::Value) -> Result<SchemaProfile> {
    let root = doc.as_object().ok_or_else(|| DataTwinError::Stats {
        message: "top level must be an object mapping table name to table spec".to_string(),
    })?;

    // First pass: raw tables, so kind resolution can see every code table.
    let mut tables: IndexMap<String, TableSpec> = IndexMap::new();
    for (name, spec) in root {
        tables.insert(name.clone(), parse_table(name, spec)?);
    }

    // Code tables whose rows all expose a `value` field back same-named
    // columns elsewhere in the schema.
    let code_value_tables: HashSet<String> = tables
        .values()
        .filter(|t| {
            t.is_code_table
                && !t.code_rows.is_empty()
                && t.code_rows.iter().all(|r| r.contains_key("value"))
        })
        .map(|t| t.name.clone())
        .collect();

    // Second pass: resolve column kinds and validate dependencies.
    let table_names: Vec<String> = tables.keys().cloned().collect();
    for name in &table_names {
        let columns = std::mem::take(&mut tables.get_mut(name).unwrap().columns);
        let resolved: Vec<ColumnSpec> = columns
            .into_iter()
            .map(|mut col| {
                col.kind = resolve_kind(&col, &code_value_tables);
                col
            })
            .collect();
        tables.get_mut(name).unwrap().columns = resolved;
    }

    let profile = SchemaProfile { tables };
    for table in profile.tables.values() {
        validate_dependency(table, &profile)?;
    }
    Ok(profile)
}

fn parse_table(name: &str, spec: &serde_json::Value) -> Result<TableSpec> {
    let obj = spec.as_object().ok_or_else(|| DataTwinError::Stats {
        message: format!("table '{}': spec must be an object", name),
    })?;

    let is_code_table = obj
        .get("is_codetable")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    if is_code_table {
        let rows = obj
            .get("data")
            .and_then(|v| v.as_array())
            .ok_or_else(|| DataTwinError::Stats {
                message: format!("code table '{}': missing 'data' array", name),
            })?;
        let code_rows = rows
            .iter()
            .map(|row| parse_code_row(name, row))
            .collect::<Result<Vec<Record>>>()?;
        return Ok(TableSpec {
            name: name.to_string(),
            is_code_table: true,
            code_rows,
            columns: Vec::new(),
            dependency: None,
        });
    }

    let columns_raw = obj
        .get("columns")
        .and_then(|v| v.as_array())
        .ok_or_else(|| DataTwinError::Stats {
            message: format!("table '{}': missing 'columns' array", name),
        })?;
    let columns = columns_raw
        .iter()
        .map(|c| parse_column(name, c))
        .collect::<Result<Vec<ColumnSpec>>>()?;

    let dependency = match obj.get("dependency") {
        Some(dep) if dep.as_object().is_some_and(|o| !o.is_empty()) => {
            Some(parse_dependency(name, dep)?)
        }
        _ => None,
    };

    Ok(TableSpec {
        name: name.to_string(),
        is_code_table: false,
        code_rows: Vec::new(),
        columns,
        dependency,
    })
}

fn parse_code_row(table: &str, row: &serde_json::Value) -> Result<Record> {
    let obj = row.as_object().ok_or_else(|| DataTwinError::Stats {
        message: format!("code table '{}': every data row must be an object", table),
    })?;
    Ok(obj.iter().map(|(k, v)| (k.clone(), Value::from(v))).collect())
}

fn parse_column(table: &str, col: &serde_json::Value) -> Result<ColumnSpec> {
    let obj = col.as_object().ok_or_else(|| DataTwinError::Stats {
        message: format!("table '{}': every column must be an object", table),
    })?;

    let name = obj
        .get("name")
        .and_then(|v| v.as_str())
        .ok_or_else(|| DataTwinError::Stats {
            message: format!("table '{}': column missing 'name'", table),
        })?
        .to_string();

    let declared_type = obj
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or_else(|| DataTwinError::Stats {
            message: format!("table '{}': column '{}' missing 'type'", table, name),
        })?
        .trim()
        .to_lowercase();

    let stats = obj
        .get("stats")
        .and_then(|v| v.as_object())
        .cloned()
        .unwrap_or_default();

    // Collectors emit samples as whatever scalar the source column held;
    // normalize to strings since every downstream consumer wants text.
    let sample_data = obj
        .get("sample_data")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .map(|s| match s {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect()
        })
        .unwrap_or_default();

    let foreign_key = match obj.get("foreign_key") {
        Some(fk) if !fk.is_null() => {
            let fk_obj = fk.as_object().ok_or_else(|| DataTwinError::Stats {
                message: format!(
                    "table '{}': column '{}' has non-object 'foreign_key'",
                    table, name
                ),
            })?;
            let foreign_table = fk_obj
                .get("foreign_table_name")
                .and_then(|v| v.as_str())
                .ok_or_else(|| DataTwinError::Stats {
                    message: format!(
                        "table '{}': column '{}' foreign_key missing 'foreign_table_name'",
                        table, name
                    ),
                })?;
            let foreign_column = fk_obj
                .get("foreign_column_name")
                .and_then(|v| v.as_str())
                .ok_or_else(|| DataTwinError::Stats {
                    message: format!(
                        "table '{}': column '{}' foreign_key missing 'foreign_column_name'",
                        table, name
                    ),
                })?;
            Some(ForeignKeyRef {
                foreign_table: foreign_table.to_string(),
                foreign_column: foreign_column.to_string(),
            })
        }
        _ => None,
    };

    Ok(ColumnSpec {
        name,
        declared_type,
        stats,
        sample_data,
        is_primary_key: obj
            .get("is_primary_key")
            .and_then(|v| v.as_bool())
            .unwrap_or(false),
        is_unique: obj
            .get("is_unique")
            .and_then(|v| v.as_bool())
            .unwrap_or(false),
        foreign_key,
        // Placeholder until the second resolution pass.
        kind: ColumnKind::Unsupported,
    })
}

fn parse_dependency(table: &str, dep: &serde_json::Value) -> Result<DependencySpec> {
    let obj = dep.as_object().ok_or_else(|| DataTwinError::Stats {
        message: format!("table '{}': dependency must be an object", table),
    })?;

    let dep_table = obj
        .get("dep_table")
        .and_then(|v| v.as_str())
        .ok_or_else(|| DataTwinError::Stats {
            message: format!("table '{}': dependency missing 'dep_table'", table),
        })?
        .to_string();

    let relation = obj
        .get("dep_relation")
        .and_then(|v| v.as_str())
        .ok_or_else(|| DataTwinError::Stats {
            message: format!("table '{}': dependency missing 'dep_relation'", table),
        })?;
    let (min_children, max_children) = parse_relation(table, relation)?;

    let mut columns = IndexMap::new();
    if let Some(deps) = obj.get("dependencies").and_then(|v| v.as_object()) {
        for (col_name, rule) in deps {
            let rule_obj = rule.as_object().ok_or_else(|| DataTwinError::Stats {
                message: format!(
                    "table '{}': dependency rule for '{}' must be an object",
                    table, col_name
                ),
            })?;
            let parent_field = rule_obj
                .get("field")
                .and_then(|v| v.as_str())
                .ok_or_else(|| DataTwinError::Stats {
                    message: format!(
                        "table '{}': dependency rule for '{}' missing 'field'",
                        table, col_name
                    ),
                })?
                .to_string();

            let transform = match rule_obj.get("func") {
                Some(serde_json::Value::String(f)) if !f.is_empty() => {
                    Some(Transform::from_name(f).ok_or_else(|| {
                        DataTwinError::UnknownTransform {
                            name: f.clone(),
                            table: table.to_string(),
                            column: col_name.clone(),
                            known: KNOWN_TRANSFORMS.join(", "),
                        }
                    })?)
                }
                _ => None,
            };

            columns.insert(
                col_name.clone(),
                DependencyColumn {
                    parent_field,
                    transform,
                },
            );
        }
    }

    Ok(DependencySpec {
        dep_table,
        min_children,
        max_children,
        columns,
    })
}

/// Parse a `"min:max"` cardinality range.
fn parse_relation(table: &str, relation: &str) -> Result<(u32, u32)> {
    let malformed = || DataTwinError::Stats {
        message: format!(
            "table '{}': dep_relation '{}' is not of the form 'min:max'",
            table, relation
        ),
    };
    let (min_s, max_s) = relation.split_once(':').ok_or_else(malformed)?;
    let min: u32 = min_s.trim().parse().map_err(|_| malformed())?;
    let max: u32 = max_s.trim().parse().map_err(|_| malformed())?;
    if min > max {
        return Err(DataTwinError::Stats {
            message: format!(
                "table '{}': dep_relation '{}' has min > max",
                table, relation
            ),
        });
    }
    Ok((min, max))
}

/// Resolve the tagged kind of one column. Precedence mirrors the synthesis
/// ladder: FK, key, code-table backing, LLM, pinned family, declared-type
/// statistics, then heuristic classification of string samples.
fn resolve_kind(col: &ColumnSpec, code_value_tables: &HashSet<String>) -> ColumnKind {
    if let Some(fk) = &col.foreign_key {
        return ColumnKind::ForeignKey {
            table: fk.foreign_table.clone(),
            column: fk.foreign_column.clone(),
        };
    }

    if col.is_primary_key || col.is_unique {
        return ColumnKind::Key(key_type(&col.declared_type));
    }

    if code_value_tables.contains(&col.name) {
        return ColumnKind::CodeTableBacked {
            table: col.name.clone(),
        };
    }

    if col.declared_type == "llm_gen" {
        return ColumnKind::LlmGenerated;
    }

    // Externally pinned family: the declared type *is* the family name.
    let pinned = col
        .stat_str("note")
        .is_some_and(|note| PINNED_NOTES.contains(&note));
    if pinned {
        if let Some(family) = PatternFamily::from_name(&col.declared_type) {
            return ColumnKind::Pattern(family);
        }
    }

    match col.declared_type.as_str() {
        "boolean" => ColumnKind::Boolean,
        "integer" | "bigint" | "smallint" => ColumnKind::Numeric { integer: true },
        "numeric" | "real" | "double precision" => ColumnKind::Numeric { integer: false },
        "character" | "character varying" => ColumnKind::Categorical,
        "text" => ColumnKind::LongText,
        "date" | "timestamp" | "timestamp without time zone" | "timestamp with time zone" => {
            ColumnKind::Date
        }
        _ => match classify::classify_samples(&col.sample_data) {
            Some(family) => ColumnKind::Pattern(family),
            None => ColumnKind::Unsupported,
        },
    }
}

/// Candidate shape used by the key generator, from the declared type.
fn key_type(declared_type: &str) -> KeyType {
    match declared_type {
        "integer" | "bigint" | "smallint" => KeyType::Int,
        "numeric" | "real" | "double precision" => KeyType::Decimal,
        "character" | "character varying" | "text" => KeyType::Text,
        "date" | "timestamp" | "timestamp without time zone" | "timestamp with time zone" => {
            KeyType::DateTime
        }
        _ => KeyType::Unsupported,
    }
}

/// Check that every dependency rule points at a field the parent table
/// actually carries. Unknown parent *tables* are the graph builder's
/// failure to report, so they are skipped here. Also run by the config
/// layer after dependency overrides are applied.
pub(crate) fn validate_dependency(table: &TableSpec, profile: &SchemaProfile) -> Result<()> {
    let Some(dep) = &table.dependency else {
        return Ok(());
    };
    let Some(parent) = profile.table(&dep.dep_table) else {
        return Ok(());
    };

    for (col_name, rule) in &dep.columns {
        let present = if parent.is_code_table {
            parent
                .code_rows
                .iter()
                .any(|row| row.contains_key(&rule.parent_field))
        } else {
            parent.columns.iter().any(|c| c.name == rule.parent_field)
        };
        if !present {
            return Err(DataTwinError::Stats {
                message: format!(
                    "table '{}': dependency column '{}' reads field '{}' which parent '{}' does not have",
                    table.name, col_name, rule.parent_field, dep.dep_table
                ),
            });
        }
    }
    Ok(())
}
