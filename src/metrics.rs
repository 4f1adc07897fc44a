// src/metrics.rs
//! Prometheus recorder for the batch run. There is no scrape endpoint:
//! the rendered snapshot is written to `$DIGEST_METRICS_PATH` at exit.

use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::path::Path;

pub const ENV_METRICS_PATH: &str = "DIGEST_METRICS_PATH";

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global recorder. Fails if one is already installed.
    pub fn init() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        describe_pipeline();
        Ok(Self { handle })
    }

    pub fn render(&self) -> String {
        self.handle.render()
    }

    /// Write the exposition text to `$DIGEST_METRICS_PATH`, if set.
    pub fn write_snapshot_from_env(&self) -> Result<()> {
        match std::env::var(ENV_METRICS_PATH) {
            Ok(p) if !p.trim().is_empty() => self.write_snapshot(Path::new(p.trim())),
            _ => Ok(()),
        }
    }

    pub fn write_snapshot(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.render())
            .with_context(|| format!("writing metrics snapshot to {}", path.display()))
    }
}

/// Help text for the series emitted outside of ingest.
fn describe_pipeline() {
    describe_counter!("classify_category_total", "Entries per assigned category.");
    describe_counter!("llm_calls_total", "Language model calls by outcome.");
    describe_counter!("translate_entries_total", "Feed entries translated.");
    describe_counter!(
        "translate_batches_failed_total",
        "Translation batches with no usable reply after all attempts."
    );
    describe_counter!("generate_social_posts_total", "Social posts produced, by kind.");
    describe_counter!("generate_ancient_events_total", "Generated ancient events.");
    describe_gauge!("digest_events", "Events in the last digest.");
    describe_gauge!("digest_news", "News items in the last digest.");
    describe_histogram!("digest_collect_ms", "Whole collection time in milliseconds.");
}
