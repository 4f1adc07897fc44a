// src/ingest/providers/rss.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use once_cell::sync::Lazy;
use quick_xml::de::from_str;
use regex::Regex;
use serde::Deserialize;
use std::time::Duration;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use crate::config::app::FeedCfg;
use crate::ingest::http::{get_with_retry, ACCEPT_FEED};
use crate::ingest::normalize_text;
use crate::ingest::types::{NewsItem, NewsProvider};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    #[serde(default)]
    enclosure: Vec<Enclosure>,
    #[serde(rename = "media:content", alias = "content", default)]
    media_content: Vec<MediaRef>,
    #[serde(rename = "media:thumbnail", alias = "thumbnail", default)]
    media_thumbnail: Vec<MediaRef>,
}

#[derive(Debug, Deserialize)]
struct Enclosure {
    #[serde(rename = "@url")]
    url: Option<String>,
    #[serde(rename = "@type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MediaRef {
    #[serde(rename = "@url")]
    url: Option<String>,
}

fn parse_rfc2822_to_unix(ts: &str) -> u64 {
    OffsetDateTime::parse(ts.trim(), &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
        .and_then(|x| u64::try_from(x).ok())
        .unwrap_or(0)
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Image lookup order: image enclosure, media:content, media:thumbnail, <img> in description.
fn pick_image(it: &RssItem) -> Option<String> {
    static RE_IMG: Lazy<Regex> =
        Lazy::new(|| Regex::new(r#"(?i)<img[^>]+src=["']([^"']+)["']"#).expect("img regex"));

    it.enclosure
        .iter()
        .find(|e| {
            e.kind
                .as_deref()
                .is_some_and(|k| k.to_ascii_lowercase().starts_with("image"))
        })
        .and_then(|e| non_empty(e.url.as_deref()))
        .or_else(|| {
            it.media_content
                .iter()
                .find_map(|m| non_empty(m.url.as_deref()))
        })
        .or_else(|| {
            it.media_thumbnail
                .iter()
                .find_map(|m| non_empty(m.url.as_deref()))
        })
        .or_else(|| {
            it.description
                .as_deref()
                .and_then(|d| RE_IMG.captures(d))
                .and_then(|c| non_empty(c.get(1).map(|m| m.as_str())))
        })
}

/// Named RSS feed capped at `max` items.
pub struct RssProvider {
    name: String,
    source: String,
    max: usize,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        url: String,
        client: reqwest::Client,
        retries: u32,
        base_delay: Duration,
    },
}

impl RssProvider {
    pub fn from_fixture_str(name: &str, source: &str, max: usize, xml: &str) -> Self {
        Self {
            name: name.to_string(),
            source: source.to_string(),
            max,
            mode: Mode::Fixture(xml.to_string()),
        }
    }

    pub fn from_feed_cfg(cfg: &FeedCfg, client: reqwest::Client, retries: u32) -> Self {
        Self {
            name: cfg.name.clone(),
            source: cfg.source.clone(),
            max: cfg.max,
            mode: Mode::Http {
                url: cfg.url.clone(),
                client,
                retries,
                base_delay: Duration::from_secs(1),
            },
        }
    }

    fn parse_items_from_str(&self, s: &str) -> Result<Vec<NewsItem>> {
        let t0 = std::time::Instant::now();
        let xml_clean = scrub_html_entities_for_xml(s);
        let rss: Rss = from_str(&xml_clean)
            .with_context(|| format!("parsing {} rss xml", self.name))?;

        let mut out = Vec::with_capacity(rss.channel.item.len().min(self.max));
        for it in &rss.channel.item {
            if out.len() >= self.max {
                break;
            }
            let title = normalize_text(it.title.as_deref().unwrap_or_default());
            let url = normalize_text(it.link.as_deref().unwrap_or_default());
            if title.is_empty() || url.is_empty() {
                continue;
            }
            out.push(NewsItem {
                title,
                url,
                summary: normalize_text(it.description.as_deref().unwrap_or_default()),
                source: self.source.clone(),
                image: pick_image(it),
                published_at: it
                    .pub_date
                    .as_deref()
                    .map(parse_rfc2822_to_unix)
                    .unwrap_or(0),
                ..NewsItem::default()
            });
        }

        histogram!("ingest_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("ingest_events_total").increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait]
impl NewsProvider for RssProvider {
    async fn fetch_latest(&self) -> Result<Vec<NewsItem>> {
        match &self.mode {
            Mode::Fixture(s) => self.parse_items_from_str(s),
            Mode::Http {
                url,
                client,
                retries,
                base_delay,
            } => {
                let body = get_with_retry(client, url, ACCEPT_FEED, *retries, *base_delay).await?;
                self.parse_items_from_str(&body)
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// HTML named entities are not valid XML; map the common ones before parsing.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}
