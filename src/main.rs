use anyhow::Context;
use clap::Parser;
use land_scout::models::Region;
use land_scout::report::CsvSink;
use land_scout::session::ChromeSession;
use land_scout::{Orchestrator, ScoutConfig};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON file overriding the built-in site configuration (-c, --config)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Where to write the CSV report (-o, --output)
    #[arg(short, long, default_value = "land_metrics.csv")]
    output: PathBuf,

    /// Show the browser window instead of running headless
    #[arg(long)]
    headed: bool,

    /// Only process these regions. Can be specified multiple times.
    #[arg(short, long)]
    region: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    info!("🏞️  Land Scout");
    info!("==============");

    let mut config = match &cli.config {
        Some(path) => ScoutConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ScoutConfig::default(),
    };
    if cli.headed {
        config.headless = false;
    }
    if !cli.region.is_empty() {
        config.regions = cli.region.iter().map(Region::new).collect();
    }
    config.validate().context("Invalid configuration")?;

    let session = ChromeSession::launch(&config).context("Failed to launch Chrome browser")?;

    let summary = Orchestrator::new(&session, &config)
        .run_and_report(&CsvSink::new(&cli.output))
        .await
        .context("Failed to write report")?;

    info!(
        "✅ {} regions, {} failed, started {}, took {:.1}s",
        summary.table.len(),
        summary.failures,
        summary.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
        summary.elapsed.as_secs_f64()
    );

    for record in &summary.table {
        println!("{}: {} for sale", record.region, record.for_sale);
        for metrics in &record.windows {
            let ratio = metrics
                .sell_through
                .map(|pct| format!("{:.2}%", pct))
                .unwrap_or_else(|| "n/a".to_string());
            println!("   sold in {}: {} ({})", metrics.window, metrics.sold, ratio);
        }
        if let Some(failure) = &record.failure {
            println!("   stopped early: {}", failure);
        }
    }

    Ok(())
}
