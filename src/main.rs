use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber;

use tollgate::client::{HttpExecutor, Outcome, SharedClient};
use tollgate::config::TollgateConfig;
use tollgate::ratelimit::RateLimiter;

#[derive(Parser, Debug)]
#[command(
    name = "tollgate",
    version,
    about = "Issue rate-limited HTTP requests through a shared client"
)]
struct Args {
    /// Target URL
    url: String,

    /// Maximum instantaneous requests per second (overrides configuration)
    #[arg(long)]
    rate: Option<f64>,

    /// Number of request attempts to issue
    #[arg(long, default_value_t = 10)]
    count: usize,

    /// Issue all attempts concurrently instead of sequentially
    #[arg(long)]
    burst: bool,

    /// Path to a YAML configuration file
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => TollgateConfig::from_file(path)?,
        None => TollgateConfig::default(),
    };
    let rate = args.rate.unwrap_or(config.rate_limit.requests_per_second);

    info!("Starting Tollgate");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(url = %args.url, rate, count = args.count, "Configuration loaded");

    let executor = Arc::new(HttpExecutor::from_config(&config.client)?);
    let client = SharedClient::new(executor);
    let limiter = RateLimiter::new(rate)?;

    let results = limiter
        .wrap(&client, || async {
            if args.burst {
                let attempts = (0..args.count).map(|_| client.get(&args.url));
                futures::future::join_all(attempts).await
            } else {
                let mut results = Vec::with_capacity(args.count);
                for _ in 0..args.count {
                    results.push(client.get(&args.url).await);
                }
                results
            }
        })
        .await;

    let mut admitted = 0usize;
    let mut dropped = 0usize;
    let mut failed = 0usize;
    for result in results {
        match result {
            Ok(Outcome::Response(response)) => {
                admitted += 1;
                info!(status = %response.status(), "Request completed");
            }
            Ok(Outcome::Dropped) => dropped += 1,
            Err(e) => {
                failed += 1;
                warn!(error = %e, "Request failed");
            }
        }
    }

    info!(admitted, dropped, failed, "Finished");
    Ok(())
}
