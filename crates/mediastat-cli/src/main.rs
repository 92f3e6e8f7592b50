use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod report;

use report::ReportArgs;

#[derive(Debug, Parser)]
#[command(name = "mediastat-cli")]
#[command(about = "Export catalog analytics for a search query")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Resolve a query, fetch metrics for every match, and write a JSON report
    Report(ReportArgs),
    /// Print how a query is interpreted without calling any service
    Parse {
        /// Search expression, e.g. `tag:launch, title:recap`
        query: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = mediastat_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Report(args) => report::run_report(&config, &args).await,
        Commands::Parse { query } => {
            let parsed = mediastat_core::parse_query(&query);
            println!("{}", serde_json::to_string_pretty(&parsed)?);
            Ok(())
        }
    }
}
