use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueHint};
use config_manager::SystemConfig;
use marketplace_client::MarketplaceClient;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use valuation_orchestrator::{ValuationOrchestrator, ValuationRequest};
use vision_client::{mime_type_for_file_name, VisionClient};

#[derive(Parser, Debug)]
#[command(author, version, about = "Value an item from a photo using recent sold listings")]
struct Cli {
    /// Configuration file (defaults to ./config.toml when present)
    #[arg(long, value_hint = ValueHint::FilePath, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Identify the item in a photo and price it
    Valuate(ValuateArgs),

    /// Price a search term without identification
    Comps(CompsArgs),

    /// Run the HTTP API
    Serve,
}

#[derive(Args, Debug)]
struct MarketArgs {
    /// Two-letter buyer country, e.g. GB
    #[arg(long)]
    country: Option<String>,

    /// Only count listings that ended within this many days (1-180)
    #[arg(long)]
    max_age_days: Option<i64>,
}

#[derive(Args, Debug)]
struct ValuateArgs {
    /// Photo of the item
    #[arg(value_hint = ValueHint::FilePath)]
    image: PathBuf,

    /// Free-text hint passed to the model
    #[arg(long, default_value = "")]
    description: String,

    #[command(flatten)]
    market: MarketArgs,
}

#[derive(Args, Debug)]
struct CompsArgs {
    /// Search term
    query: String,

    #[command(flatten)]
    market: MarketArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => SystemConfig::load_from_path(path)?,
        None => SystemConfig::load()?,
    };

    match cli.cmd {
        Command::Valuate(args) => valuate(config, args).await,
        Command::Comps(args) => comps(config, args).await,
        Command::Serve => {
            println!("The HTTP API runs as its own binary:");
            println!("   cargo run -p api_server");
            println!();
            println!("Endpoints: POST /api/identify, POST /api/comps, POST /api/valuate, GET /health");
            Ok(())
        }
    }
}

async fn valuate(config: SystemConfig, args: ValuateArgs) -> anyhow::Result<()> {
    let image = tokio::fs::read(&args.image)
        .await
        .with_context(|| format!("Failed to read {}", args.image.display()))?;
    let mime_type = mime_type_for_file_name(&args.image.to_string_lossy()).to_string();

    let orchestrator = ValuationOrchestrator::new(
        Arc::new(VisionClient::new(config.gemini)?),
        Arc::new(MarketplaceClient::new(config.ebay)?),
    );

    let request = ValuationRequest {
        image,
        mime_type,
        description: args.description,
        country: args.market.country,
        max_age_days: args.market.max_age_days,
    };

    let report = orchestrator
        .valuate(&request, |stage| {
            eprintln!("[{:>3}%] {}", stage.progress(), stage.label())
        })
        .await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn comps(config: SystemConfig, args: CompsArgs) -> anyhow::Result<()> {
    let client = MarketplaceClient::new(config.ebay)?;
    let report = client
        .search(
            &args.query,
            args.market.country.as_deref(),
            args.market.max_age_days,
        )
        .await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
