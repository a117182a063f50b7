use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use datatwin_core::config::{self, DataTwinConfig};
use datatwin_core::generate::{synthesize, SynthesisOptions};
use datatwin_core::llm::{OllamaClient, SimilarValueSource, DEFAULT_MODEL, DEFAULT_TIMEOUT};
use datatwin_core::output;
use datatwin_core::profile::AnchorStrategy;

use crate::args::{AnchorArg, GenerateArgs, OutputFormat};

const DEFAULT_LLM_URL: &str = "http://localhost:11434/api/generate";

pub fn run(args: &GenerateArgs) -> Result<()> {
    let config = config::read_config(Path::new("."))?;

    let text = std::fs::read_to_string(&args.stats)
        .with_context(|| format!("Failed to read {}", args.stats))?;
    let mut profile = datatwin_core::load_profile_str(&text)?;

    if let Some(ref cfg) = config {
        cfg.apply_dependency_overrides(&mut profile)?;
    }

    let options = build_options(args, config.as_ref())?;
    let llm_client = build_llm(args, config.as_ref());
    let llm: Option<&dyn SimilarValueSource> =
        llm_client.as_ref().map(|c| c as &dyn SimilarValueSource);

    let non_code_tables = profile
        .tables
        .values()
        .filter(|t| !t.is_code_table)
        .count();
    let pb = ProgressBar::new((options.passes as usize * non_code_tables) as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} Generating... {bar:40.cyan/dim} {pos}/{len} ({eta})")
            .unwrap()
            .progress_chars("█▓░"),
    );

    let result = synthesize(
        &profile,
        &options,
        llm,
        Some(&|_table, _pass, _total| {
            pb.inc(1);
        }),
    )?;
    let total_records: usize = result.tables.values().map(Vec::len).sum();
    pb.finish_with_message(format!("Generating... ✓ ({} records)", total_records));

    match &args.output {
        Some(path) => {
            let file =
                File::create(path).with_context(|| format!("Failed to create {}", path))?;
            let mut writer = BufWriter::new(file);
            write_result(&mut writer, args, &result)?;
            writer.flush()?;
            eprintln!(
                "Wrote {} tables ({} records) to {}",
                result.tables.len(),
                total_records,
                path
            );
        }
        None => {
            let stdout = std::io::stdout();
            let mut writer = stdout.lock();
            write_result(&mut writer, args, &result)?;
        }
    }

    Ok(())
}

fn write_result<W: Write>(
    writer: &mut W,
    args: &GenerateArgs,
    result: &datatwin_core::SynthesisResult,
) -> Result<()> {
    match args.output_format() {
        OutputFormat::Json => output::write_json(writer, result)?,
        OutputFormat::Csv => output::write_csv(writer, result)?,
    }
    Ok(())
}

fn build_options(args: &GenerateArgs, config: Option<&DataTwinConfig>) -> Result<SynthesisOptions> {
    let mut options = SynthesisOptions::default();

    if let Some(passes) = args
        .passes
        .or_else(|| config.and_then(|c| c.generate.passes))
    {
        options.passes = passes;
    }

    options.seed = args
        .seed
        .or_else(|| config.and_then(|c| c.generate.seed))
        .unwrap_or_else(|| {
            use std::time::{SystemTime, UNIX_EPOCH};
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default()
        });

    options.anchor = match args.anchor {
        Some(AnchorArg::Latest) => AnchorStrategy::Latest,
        Some(AnchorArg::Random) => AnchorStrategy::Random,
        None => match config {
            Some(cfg) => cfg.anchor_strategy()?,
            None => AnchorStrategy::default(),
        },
    };

    if let Some(batch) = config.and_then(|c| c.llm.batch_size) {
        options.llm_batch_size = batch;
    }

    Ok(options)
}

fn build_llm(args: &GenerateArgs, config: Option<&DataTwinConfig>) -> Option<OllamaClient> {
    let enabled = args.llm || config.map(|c| c.llm.enabled).unwrap_or(false);
    if !enabled {
        return None;
    }

    let url = config
        .and_then(|c| c.llm.url.clone())
        .unwrap_or_else(|| DEFAULT_LLM_URL.to_string());
    let model = config
        .and_then(|c| c.llm.model.clone())
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());
    let timeout = config
        .and_then(|c| c.llm.timeout_secs)
        .map(std::time::Duration::from_secs)
        .unwrap_or(DEFAULT_TIMEOUT);

    Some(OllamaClient::new(url, model, timeout))
}
