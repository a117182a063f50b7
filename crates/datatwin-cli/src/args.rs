use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "datatwin",
    about = "Synthesize schema-faithful test data from a statistical profile",
    version,
    after_help = "Examples:\n  datatwin generate --stats stats.json --passes 50 --output data.json\n  datatwin generate --stats stats.json --seed 42 --format csv -o data.csv\n  datatwin graph --stats stats.json\n  datatwin preview --stats stats.json --rows 5"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a synthetic dataset from a statistics document
    Generate(GenerateArgs),

    /// Print the table generation order derived from dependencies
    Graph(GraphArgs),

    /// Preview a few generated rows per table without writing output
    Preview(PreviewArgs),
}

#[derive(Parser, Debug)]
pub struct GenerateArgs {
    /// Path to the JSON statistics document
    #[arg(long)]
    pub stats: String,

    /// Number of generation passes over the table schedule
    #[arg(long)]
    pub passes: Option<u32>,

    /// Random seed for deterministic generation
    #[arg(long)]
    pub seed: Option<u64>,

    /// Output file path (.json, .csv); stdout when omitted
    #[arg(short, long)]
    pub output: Option<String>,

    /// Output format (auto-detected from file extension if not specified)
    #[arg(long)]
    pub format: Option<OutputFormat>,

    /// Parent-anchor selection strategy
    #[arg(long)]
    pub anchor: Option<AnchorArg>,

    /// Consult the configured similar-data endpoint for llm_gen columns
    #[arg(long)]
    pub llm: bool,
}

#[derive(Parser, Debug)]
pub struct GraphArgs {
    /// Path to the JSON statistics document
    #[arg(long)]
    pub stats: String,
}

#[derive(Parser, Debug)]
pub struct PreviewArgs {
    /// Path to the JSON statistics document
    #[arg(long)]
    pub stats: String,

    /// Number of rows to show per table
    #[arg(long, default_value = "5")]
    pub rows: usize,

    /// Number of generation passes behind the preview
    #[arg(long, default_value = "5")]
    pub passes: u32,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Csv,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum AnchorArg {
    Latest,
    Random,
}

impl GenerateArgs {
    /// Determine output format from file extension or explicit flag.
    pub fn output_format(&self) -> OutputFormat {
        if let Some(ref fmt) = self.format {
            return fmt.clone();
        }
        if let Some(ref path) = self.output {
            if path.ends_with(".csv") {
                return OutputFormat::Csv;
            }
        }
        OutputFormat::Json
    }
}
