// src/ingest/http.rs
//! Shared HTTP client + GET with exponential backoff.

use anyhow::{Context, Result};
use metrics::counter;
use std::time::Duration;

pub const USER_AGENT: &str = "HistoricalNewspaperBot/1.0 (educational project)";
pub const ACCEPT_JSON: &str = "application/json";
pub const ACCEPT_FEED: &str = "application/rss+xml, application/xml, text/xml, */*";

/// Client used by every fetch provider: custom UA, 30s timeout.
pub fn build_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(30))
        .build()
        .context("building http client")
}

/// Delay before retry number `attempt` (0-based): 1s, 2s, 4s, ...
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

async fn get_once(client: &reqwest::Client, url: &str, accept: &str) -> Result<String> {
    let resp = client
        .get(url)
        .header(reqwest::header::ACCEPT, accept)
        .send()
        .await
        .with_context(|| format!("GET {url}"))?;
    let status = resp.status();
    if !status.is_success() {
        anyhow::bail!("HTTP {} for {}", status.as_u16(), url);
    }
    resp.text().await.with_context(|| format!("reading body of {url}"))
}

/// GET `url` as text, retrying `retries` extra times with exponential backoff.
pub async fn get_with_retry(
    client: &reqwest::Client,
    url: &str,
    accept: &str,
    retries: u32,
    base_delay: Duration,
) -> Result<String> {
    let mut attempt = 0u32;
    loop {
        match get_once(client, url, accept).await {
            Ok(body) => return Ok(body),
            Err(e) => {
                tracing::warn!(
                    target: "ingest",
                    attempt = attempt + 1,
                    of = retries + 1,
                    %url,
                    error = %e,
                    "fetch attempt failed"
                );
                if attempt >= retries {
                    return Err(e);
                }
                counter!("ingest_retries_total").increment(1);
                tokio::time::sleep(backoff_delay(base_delay, attempt)).await;
                attempt += 1;
            }
        }
    }
}

/// GET `url` once and decode JSON.
pub async fn get_json<T: serde::de::DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
) -> Result<T> {
    let body = get_once(client, url, ACCEPT_JSON).await?;
    serde_json::from_str(&body).with_context(|| format!("Invalid JSON from {url}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles() {
        let base = Duration::from_secs(1);
        assert_eq!(backoff_delay(base, 0), Duration::from_secs(1));
        assert_eq!(backoff_delay(base, 1), Duration::from_secs(2));
        assert_eq!(backoff_delay(base, 3), Duration::from_secs(8));
    }

    #[tokio::test]
    async fn unreachable_host_fails_after_retries() {
        let client = build_client().unwrap();
        // port 9 on localhost: connection refused, no network needed
        let r = get_with_retry(
            &client,
            "http://127.0.0.1:9/feed.xml",
            ACCEPT_FEED,
            1,
            Duration::from_millis(1),
        )
        .await;
        assert!(r.is_err());
    }
}
