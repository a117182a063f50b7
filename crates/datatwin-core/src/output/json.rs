use std::io::Write;

use crate::error::{DataTwinError, Result};
use crate::generate::SynthesisResult;

/// Write a synthesized dataset as JSON using streaming serialization.
///
/// Writes table-by-table and row-by-row, so the whole JSON tree is never
/// built in memory. Only synthesized tables are written; code tables are
/// reference data the consumer already has.
pub fn write_json<W: Write>(writer: &mut W, result: &SynthesisResult) -> Result<()> {
    let table_count = result.tables.len();
    write_str(writer, "{\n")?;

    for (table_idx, (table_name, rows)) in result.tables.iter().enumerate() {
        write_str(writer, &format!("  {}: [\n", json_string(table_name)?))?;

        for (row_idx, row) in rows.iter().enumerate() {
            write_str(writer, "    {")?;

            let col_count = row.len();
            for (col_idx, (col_name, value)) in row.iter().enumerate() {
                let key = json_string(col_name)?;
                let val: serde_json::Value = value.into();
                let val = serde_json::to_string(&val).map_err(|e| DataTwinError::Output {
                    message: format!("serializing {}.{}", table_name, col_name),
                    source: std::io::Error::other(e),
                })?;
                write_str(writer, &format!("\n      {}: {}", key, val))?;
                if col_idx < col_count - 1 {
                    write_str(writer, ",")?;
                }
            }

            write_str(writer, "\n    }")?;
            if row_idx < rows.len() - 1 {
                write_str(writer, ",")?;
            }
            write_str(writer, "\n")?;
        }

        write_str(writer, "  ]")?;
        if table_idx < table_count - 1 {
            write_str(writer, ",")?;
        }
        write_str(writer, "\n")?;
    }

    write_str(writer, "}\n")?;
    Ok(())
}

fn write_str<W: Write>(writer: &mut W, s: &str) -> Result<()> {
    writer
        .write_all(s.as_bytes())
        .map_err(|e| DataTwinError::Output {
            message: "writing JSON".to_string(),
            source: e,
        })
}

/// RFC 8259-compliant string serialization; Rust's `{:?}` does not escape
/// unicode control characters per the JSON spec.
fn json_string(s: &str) -> Result<String> {
    serde_json::to_string(s).map_err(|e| DataTwinError::Output {
        message: format!("escaping key '{}'", s),
        source: std::io::Error::other(e),
    })
}
