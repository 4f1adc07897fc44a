//! Daily "on this day" digest, batch entrypoint.
//! Collects, classifies and writes `today.json` plus the dated archive, then exits.

use onthisday_digest::{collector_from_env, metrics::Metrics, run, run_date};
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// `RUST_LOG` wins; otherwise `info`. `DIGEST_LOG_JSON=1` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("DIGEST_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let metrics = match Metrics::init() {
        Ok(m) => Some(m),
        Err(e) => {
            warn!(error = ?e, "metrics disabled");
            None
        }
    };

    let outcome = async {
        let date = run_date()?;
        let collector = collector_from_env()?;
        run(&collector, date).await
    }
    .await;

    let code = match outcome {
        Ok((digest, paths)) => {
            info!(
                today = %paths.today.display(),
                archive = %paths.archive.display(),
                events = digest.events.len(),
                births = digest.births.len(),
                deaths = digest.deaths.len(),
                news = digest.news.len(),
                he = digest.stats.he,
                en = digest.stats.en,
                israel_events = digest.stats.israel_events,
                "digest complete"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = ?e, "digest run failed");
            ExitCode::FAILURE
        }
    };

    if let Some(m) = metrics {
        if let Err(e) = m.write_snapshot_from_env() {
            warn!(error = ?e, "metrics snapshot not written");
        }
    }
    code
}
