use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "shadow",
    about = "Shadow Ledger: risk-adaptive transaction audit ledger",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML configuration file. Without one, keys are generated per run
    /// and the ledger lives in memory.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a configuration with fresh signing keys
    Keygen(KeygenArgs),
    /// Score, route, and seal one payment
    Submit(SubmitArgs),
    /// Process a file of JSON payment requests, one per line
    Ingest(IngestArgs),
    /// Check whether a transaction was sealed, and how
    Verify(VerifyArgs),
    /// Show the most recent blocks
    Blocks(BlocksArgs),
    /// Validate the whole chain
    Audit,
    /// Run a self-contained walkthrough on an in-memory ledger
    Demo(DemoArgs),
}

#[derive(Args)]
pub struct KeygenArgs {
    /// Write the configuration here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Ledger file to reference from the generated configuration
    #[arg(long)]
    pub ledger: Option<PathBuf>,
    #[arg(long, default_value_t = 3)]
    pub signers: usize,
    #[arg(long, default_value_t = 2)]
    pub threshold: usize,
    /// Overwrite an existing output file
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct SubmitArgs {
    /// Paying account
    #[arg(long)]
    pub from: String,
    /// Receiving account
    #[arg(long)]
    pub to: String,
    /// Amount in minor currency units
    #[arg(long)]
    pub amount: u64,
    /// Transaction id (generated when omitted)
    #[arg(long)]
    pub id: Option<String>,
    /// Use this risk score instead of calling the classifier
    #[arg(long)]
    pub risk: Option<f64>,
    #[arg(long)]
    pub privacy: bool,
    #[arg(long, requires = "lon")]
    pub lat: Option<f64>,
    #[arg(long, requires = "lat")]
    pub lon: Option<f64>,
    #[arg(long)]
    pub ip: Option<String>,
}

#[derive(Args)]
pub struct IngestArgs {
    /// JSON-lines file of payment requests
    pub path: PathBuf,
    /// Use this risk score instead of calling the classifier
    #[arg(long)]
    pub risk: Option<f64>,
    /// Stop at the first failing line
    #[arg(long)]
    pub fail_fast: bool,
}

#[derive(Args)]
pub struct VerifyArgs {
    pub transaction_id: String,
}

#[derive(Args)]
pub struct BlocksArgs {
    #[arg(short = 'n', long, default_value_t = 10)]
    pub count: usize,
}

#[derive(Args)]
pub struct DemoArgs {
    /// Number of ordinary payments to generate
    #[arg(long, default_value_t = 25)]
    pub payments: usize,
    #[arg(long, default_value_t = 5)]
    pub batch_size: usize,
}
