use anyhow::{Context, Result};
use comfy_table::Table as ComfyTable;

use datatwin_core::generate::{synthesize, SynthesisOptions};

use crate::args::PreviewArgs;

pub fn run(args: &PreviewArgs) -> Result<()> {
    let text = std::fs::read_to_string(&args.stats)
        .with_context(|| format!("Failed to read {}", args.stats))?;
    let profile = datatwin_core::load_profile_str(&text)?;

    // Fixed seed so repeated previews of the same document agree.
    let options = SynthesisOptions {
        passes: args.passes,
        seed: 42,
        ..SynthesisOptions::default()
    };
    let result = synthesize(&profile, &options, None, None)?;

    for (table_name, rows) in &result.tables {
        if rows.is_empty() {
            continue;
        }

        println!("━━━ {} ({} rows) ━━━", table_name, rows.len());

        let columns: Vec<&String> = rows[0].keys().collect();
        let mut t = ComfyTable::new();
        t.set_header(columns.iter().map(|c| c.as_str()).collect::<Vec<_>>());

        for row in rows.iter().take(args.rows) {
            let values: Vec<String> = columns
                .iter()
                .map(|col| {
                    row.get(*col)
                        .map(|v| ellipsize(&format!("{}", v), 40))
                        .unwrap_or_else(|| "NULL".to_string())
                })
                .collect();
            t.add_row(values);
        }

        println!("{}\n", t);
    }

    Ok(())
}

/// Shorten a cell to at most `max` characters, counting characters rather
/// than bytes so multibyte values never split mid-character.
fn ellipsize(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let cut: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", cut)
}

#[cfg(test)]
mod tests {
    use super::ellipsize;

    #[test]
    fn test_ellipsize_short_values_untouched() {
        assert_eq!(ellipsize("hello", 40), "hello");
    }

    #[test]
    fn test_ellipsize_long_ascii() {
        let long = "x".repeat(50);
        let out = ellipsize(&long, 40);
        assert_eq!(out.chars().count(), 40);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn test_ellipsize_multibyte_never_splits() {
        // 50 CJK characters = 150 bytes; byte-indexed truncation at a
        // fixed offset would land mid-character and panic.
        let long = "数".repeat(50);
        let out = ellipsize(&long, 40);
        assert_eq!(out.chars().count(), 40);
        assert!(out.starts_with("数"));
        assert!(out.ends_with("..."));
    }
}
