use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use castlog::config::Config;
use castlog::overcast::OvercastClient;
use castlog::{cache, feed, opml, reconcile, select};

#[derive(Parser, Debug)]
#[command(
    name = "castlog",
    about = "Make a podcast activity feed from your Overcast listening history"
)]
struct Args {
    /// Skip the download and use the cached export even if stale
    #[arg(short = 'n', long)]
    no_download: bool,

    /// Write log output to a file instead of stdout
    #[arg(short = 'o', long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, default_value = "castlog.toml")]
    config: PathBuf,
}

fn init_logging(args: &Args) -> Result<()> {
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match &args.log_file {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to open log file '{}'", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    if let Err(e) = init_logging(&args) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    if let Err(e) = run(&args).await {
        tracing::error!("Aborting: {e:#}");
        std::process::exit(1);
    }
}

async fn run(args: &Args) -> Result<()> {
    let started = Instant::now();
    let config = Config::load(&args.config)
        .with_context(|| format!("Failed to load config '{}'", args.config.display()))?;

    let export = if !args.no_download && !cache::is_fresh(&config.cache_file) {
        let client = OvercastClient::new().context("Failed to build HTTP client")?;
        let export = client
            .download_export(&config.account)
            .await
            .context("Failed to download the listening-history export")?;
        cache::store(&config.cache_file, &export)?;
        tracing::debug!("Downloaded latest episode activity");
        export
    } else {
        tracing::debug!("Using cached episode activity");
        cache::load(&config.cache_file)?
    };

    let candidates = opml::extract_episodes(&export).context("Failed to parse the export")?;
    let shortlist = select::select_recent(candidates)?;

    let http = reqwest::Client::new();
    let episodes = reconcile::reconcile(shortlist, &config.feed.href, &http).await;

    feed::write_feed(&episodes, &config.feed, Utc::now())?;

    tracing::info!(
        elapsed_secs = started.elapsed().as_secs(),
        items = episodes.len(),
        status = "OK"
    );
    Ok(())
}
