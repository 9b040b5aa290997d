// Run one profiling job from the command line and print the report JSON.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use site_profiler::{run_profile, HttpFetcher, OpenAiModel, PipelineConfig, SeedTarget};

/// Crawl a business website and synthesize its profile.
#[derive(Parser, Debug)]
#[command(name = "profile", version, about)]
struct Args {
    /// Resolved website root URL.
    url: String,

    /// Business name hint from the listing.
    #[arg(long)]
    company_hint: Option<String>,

    /// Maximum link depth from the root.
    #[arg(long, default_value_t = 2)]
    max_depth: usize,

    /// Maximum number of pages to fetch.
    #[arg(long, default_value_t = 30)]
    max_pages: usize,

    /// How many pages the model selects for extraction.
    #[arg(long, default_value_t = 6)]
    top_k: usize,

    /// Chat model to use.
    #[arg(long, default_value = "gpt-4o-mini")]
    model: String,

    /// Overall wall-clock budget in seconds.
    #[arg(long, default_value_t = 180)]
    timeout_secs: u64,

    /// Pretty-print the report JSON.
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout stays parseable.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,site_profiler=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let mut seed = SeedTarget::new(&args.url)
        .with_context(|| format!("Invalid root URL: {}", args.url))?
        .with_max_depth(args.max_depth)
        .with_max_pages(args.max_pages);
    if let Some(hint) = args.company_hint {
        seed = seed.with_company_hint(hint);
    }

    let config = PipelineConfig::default()
        .with_top_k(args.top_k)
        .with_time_budget(Duration::from_secs(args.timeout_secs));

    let fetcher = HttpFetcher::new(config.fetch_timeout, seed.page_byte_cap);
    let model = OpenAiModel::from_env()
        .context("Failed to configure model client")?
        .with_model(args.model);

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received; finishing with partial data");
            signal_cancel.cancel();
        }
    });

    let report = run_profile(&seed, &config, &fetcher, &model, &cancel)
        .await
        .context("Profiling run failed")?;

    let json = if args.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{json}");

    Ok(())
}
