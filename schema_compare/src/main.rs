//! Command line entry point for SchemaCompare

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::error;

use schema_compare::utils::logging::init_logging;
use schema_compare::{config, SchemaCompareClient, Side, TracingProgressListener};

#[derive(Parser)]
#[command(name = "schema_compare", version, about = "Compare two database schemas")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compare source against target and print the JSON report
    Compare {
        #[arg(short, long)]
        config: String,
        /// Only compare the first N objects of each kind
        #[arg(long)]
        sample_size: Option<usize>,
    },
    /// Print a JSON snapshot of one side
    Snapshot {
        #[arg(short, long)]
        config: String,
        #[arg(long, value_enum, default_value_t = SideArg::Source)]
        side: SideArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SideArg {
    Source,
    Target,
}

impl From<SideArg> for Side {
    fn from(side: SideArg) -> Self {
        match side {
            SideArg::Source => Side::Source,
            SideArg::Target => Side::Target,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        error!("{:#}", err);
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Compare {
            config: path,
            sample_size,
        } => {
            let mut config = config::load_from_file(&path)?;
            if sample_size.is_some() {
                config.comparison.sample_size = sample_size;
                config.validate()?;
            }
            init_logging(&config.logging)?;

            let client = SchemaCompareClient::new(config)
                .await
                .context("Failed to open source and target")?;
            let report = client.compare(Some(&TracingProgressListener)).await?;

            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Snapshot { config: path, side } => {
            let config = config::load_from_file(&path)?;
            init_logging(&config.logging)?;

            let client = SchemaCompareClient::new(config)
                .await
                .context("Failed to open source and target")?;
            let snapshot = client.snapshot(side.into()).await?;

            println!("{}", snapshot.to_json()?);
        }
    }

    Ok(())
}
