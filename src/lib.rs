// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod analyze;
pub mod classify;
pub mod config;
pub mod digest;
pub mod headline;
pub mod ingest;
pub mod metrics;

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::info;

pub use crate::classify::{Category, Classification, Classifier};
pub use crate::config::DigestConfig;
pub use crate::digest::{Collector, Digest, SavedPaths, Sources};
pub use crate::headline::{score_headline_candidate, select_headline, HeadlineConfig};
pub use crate::ingest::types::Item;

pub const ENV_DIGEST_DATE: &str = "DIGEST_DATE";

/// Run date: `$DIGEST_DATE` (`YYYY-MM-DD`) or today in local time.
pub fn run_date() -> Result<NaiveDate> {
    match std::env::var(ENV_DIGEST_DATE) {
        Ok(s) if !s.trim().is_empty() => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .with_context(|| format!("{ENV_DIGEST_DATE} must be YYYY-MM-DD, got {s:?}")),
        _ => Ok(chrono::Local::now().date_naive()),
    }
}

/// Collect the digest for `date` and save both output files, bounded by
/// `limits.run_timeout_secs`.
pub async fn run(collector: &Collector, date: NaiveDate) -> Result<(Digest, SavedPaths)> {
    let cfg = collector.config();
    let deadline = Duration::from_secs(cfg.limits.run_timeout_secs);
    let generated_at = chrono::Utc::now().to_rfc3339();

    let digest = tokio::time::timeout(deadline, collector.collect(date, generated_at))
        .await
        .with_context(|| format!("collection exceeded {}s", deadline.as_secs()))?;
    let paths = digest::save(&digest, &cfg.output)?;
    Ok((digest, paths))
}

/// Wire the live collaborators from config and environment.
pub fn collector_from_env() -> Result<Collector> {
    let cfg = DigestConfig::load()?;
    info!(target: "digest", llm = %cfg.llm.describe(), output = %cfg.output.dir.display(), "config loaded");
    let classifier = Classifier::from_toml()?;
    let llm = analyze::build_client_from_config(&cfg.llm);
    let sources = Sources::from_config(&cfg)?;
    Ok(Collector::new(cfg, classifier, llm, sources))
}
