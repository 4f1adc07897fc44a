// src/ingest/mod.rs
pub mod http;
pub mod providers;
pub mod types;

use crate::ingest::types::{NewsItem, NewsProvider};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;

/// Titles at least this similar (normalized Levenshtein) count as the same story.
pub const NEWS_DUP_SIMILARITY: f64 = 0.9;

/// One-time metrics registration (so series show up in the snapshot).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_events_total", "Entries parsed from providers.");
        describe_counter!("ingest_news_kept_total", "News items kept after dedup.");
        describe_counter!(
            "ingest_news_dedup_total",
            "News items dropped as near-duplicate titles."
        );
        describe_counter!(
            "ingest_provider_errors_total",
            "Provider fetch/parse errors."
        );
        describe_counter!("ingest_retries_total", "HTTP retry attempts.");
        describe_histogram!("ingest_parse_ms", "Provider parse time in milliseconds.");
        describe_gauge!(
            "ingest_news_sources_ok",
            "News feeds that returned at least one item in the last run."
        );
    });
}

/// Normalize feed text: CDATA unwrap, entity decode, tag strip, whitespace collapse.
pub fn normalize_text(s: &str) -> String {
    static RE_CDATA: OnceCell<regex::Regex> = OnceCell::new();
    let re_cdata =
        RE_CDATA.get_or_init(|| regex::Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").unwrap());
    let mut out = re_cdata.replace_all(s, "$1").to_string();

    out = html_escape::decode_html_entities(&out).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    // “ ” « » → ", ‘ ’ → '
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    if out.chars().count() > 1500 {
        out = out.chars().take(1500).collect();
    }
    out
}

/// Heuristic: empty text, text without letters, or ≥30% Hebrew among
/// Latin+Hebrew letters counts as Hebrew.
pub fn is_probably_hebrew(text: &str) -> bool {
    let mut letters = 0usize;
    let mut hebrew = 0usize;
    for ch in text.chars() {
        if ('\u{0590}'..='\u{05FF}').contains(&ch) {
            letters += 1;
            hebrew += 1;
        } else if ch.is_ascii_alphabetic() {
            letters += 1;
        }
    }
    if letters == 0 {
        return true;
    }
    (hebrew as f64 / letters as f64) >= 0.3
}

fn title_key(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

/// Concatenate feeds in order, dropping items whose title nearly repeats an earlier one.
/// Returns (kept, dropped).
pub fn merge_news(batches: Vec<Vec<NewsItem>>) -> (Vec<NewsItem>, usize) {
    let mut keys: Vec<String> = Vec::new();
    let mut kept = Vec::new();
    let mut dropped = 0usize;
    for item in batches.into_iter().flatten() {
        let key = title_key(&item.title);
        let dup = keys
            .iter()
            .any(|k| strsim::normalized_levenshtein(k, &key) >= NEWS_DUP_SIMILARITY);
        if dup {
            dropped += 1;
            continue;
        }
        keys.push(key);
        kept.push(item);
    }
    (kept, dropped)
}

/// Fetch every news feed once, skipping failures.
/// Returns the merged items and the number of feeds that produced something.
pub async fn collect_news(providers: &[Box<dyn NewsProvider>]) -> (Vec<NewsItem>, usize) {
    ensure_metrics_described();

    let mut batches = Vec::with_capacity(providers.len());
    let mut ok_sources = 0usize;
    for p in providers {
        match p.fetch_latest().await {
            Ok(items) if !items.is_empty() => {
                tracing::info!(target: "ingest", provider = p.name(), count = items.len(), "news feed");
                ok_sources += 1;
                batches.push(items);
            }
            Ok(_) => {
                tracing::info!(target: "ingest", provider = p.name(), "news feed empty");
            }
            Err(e) => {
                tracing::warn!(target: "ingest", error = ?e, provider = p.name(), "provider error");
                counter!("ingest_provider_errors_total").increment(1);
            }
        }
    }

    let (kept, dropped) = merge_news(batches);
    counter!("ingest_news_kept_total").increment(kept.len() as u64);
    counter!("ingest_news_dedup_total").increment(dropped as u64);
    gauge!("ingest_news_sources_ok").set(ok_sources as f64);

    (kept, ok_sources)
}
