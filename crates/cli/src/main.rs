mod cmd;
mod logging;

use clap::{Args, Parser, Subcommand, ValueEnum};
use fieldkit_core::fields::Operation;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "fieldkit", version, about = "Schema-driven field processing for content records")]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Validate configuration and print the loaded schema registry
    Doctor,

    /// Sanitize and validate records of a collection
    Process(ProcessArgs),

    /// Expand relations of stored records
    Populate(RecordArgs),

    /// Extract search keywords from records
    Keywords(RecordArgs),
}

#[derive(Debug, Args)]
pub struct RecordArgs {
    /// Collection the records belong to
    #[arg(long)]
    pub collection: String,

    /// JSON file holding one record or an array of records
    #[arg(long)]
    pub input: PathBuf,
}

#[derive(Debug, Args)]
pub struct ProcessArgs {
    #[command(flatten)]
    pub record: RecordArgs,

    #[arg(long, value_enum, default_value_t = OperationArg::Create)]
    pub operation: OperationArg,

    /// Print validation errors as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OperationArg {
    Create,
    Update,
    Read,
}

impl From<OperationArg> for Operation {
    fn from(op: OperationArg) -> Self {
        match op {
            OperationArg::Create => Operation::Create,
            OperationArg::Update => Operation::Update,
            OperationArg::Read => Operation::Read,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Doctor => cmd::doctor::run(cli.config.as_deref()),
        Commands::Process(args) => cmd::process::run(cli.config.as_deref(), args),
        Commands::Populate(args) => cmd::populate::run(cli.config.as_deref(), args),
        Commands::Keywords(args) => cmd::keywords::run(cli.config.as_deref(), args),
    }
}
