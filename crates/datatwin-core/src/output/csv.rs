use std::io::Write;

use crate::error::{DataTwinError, Result};
use crate::generate::{Record, SynthesisResult};

/// Write a synthesized dataset as CSV, one section per table, separated
/// by a comment header line. Empty tables are skipped.
pub fn write_csv<W: Write>(writer: &mut W, result: &SynthesisResult) -> Result<()> {
    for (table_name, rows) in &result.tables {
        if rows.is_empty() {
            continue;
        }

        writeln!(writer, "# Table: {}", table_name).map_err(|e| DataTwinError::Output {
            message: format!("writing CSV header for {}", table_name),
            source: e,
        })?;
        write_csv_table(writer, table_name, rows)?;
        writeln!(writer).map_err(|e| DataTwinError::Output {
            message: "writing newline".to_string(),
            source: e,
        })?;
    }

    Ok(())
}

/// Write one table's rows as CSV with a column-header line.
pub fn write_csv_table<W: Write>(
    writer: &mut W,
    table_name: &str,
    rows: &[Record],
) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }

    let columns: Vec<&String> = rows[0].keys().collect();
    writeln!(
        writer,
        "{}",
        columns
            .iter()
            .map(|c| csv_escape(c))
            .collect::<Vec<_>>()
            .join(",")
    )
    .map_err(|e| DataTwinError::Output {
        message: format!("writing CSV columns for {}", table_name),
        source: e,
    })?;

    for row in rows {
        let values: Vec<String> = columns
            .iter()
            .map(|col| {
                row.get(*col)
                    .map(|v| csv_escape(&v.to_csv_string()))
                    .unwrap_or_default()
            })
            .collect();

        writeln!(writer, "{}", values.join(",")).map_err(|e| DataTwinError::Output {
            message: format!("writing CSV row for {}", table_name),
            source: e,
        })?;
    }

    Ok(())
}

/// Quote a field when it contains a comma, quote, or newline.
fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
