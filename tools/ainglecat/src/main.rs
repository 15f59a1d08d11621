mod commands;
mod input;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{
    count::CountArgs, dump::DumpArgs, fromjson::FromJsonArgs, meta::MetaArgs, schema::SchemaArgs,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ainglecat", about = "Inspect and build AIngle container files")]
struct Cli {
    /// Log debug events to stderr (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print header metadata
    Meta(MetaArgs),
    /// Print the writer schema, its canonical form and fingerprints
    Schema(SchemaArgs),
    /// Print records as JSON lines
    Dump(DumpArgs),
    /// Count records, reading byte ranges of the file in parallel
    Count(CountArgs),
    /// Build a container file from JSON lines
    #[command(name = "fromjson")]
    FromJson(FromJsonArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Meta(args) => args.run(),
        Commands::Schema(args) => args.run(),
        Commands::Dump(args) => args.run(),
        Commands::Count(args) => args.run(),
        Commands::FromJson(args) => args.run(),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
