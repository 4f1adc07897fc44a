// src/ingest/providers/wiki.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use serde_json::Value;

use crate::ingest::http::get_json;
use crate::ingest::types::{Item, OnThisDayFeed, OnThisDayProvider, Section};

pub const WIKI_HE: &str = "https://he.wikipedia.org/api/rest_v1/feed/onthisday/all";
pub const WIKI_EN: &str = "https://en.wikipedia.org/api/rest_v1/feed/onthisday/all";

/// Wikipedia "on this day" feed for one language edition.
pub struct WikiProvider {
    lang: String,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        base_url: String,
        client: reqwest::Client,
    },
}

impl WikiProvider {
    pub fn from_fixture_str(lang: &str, json: &str) -> Self {
        Self {
            lang: lang.to_string(),
            mode: Mode::Fixture(json.to_string()),
        }
    }

    pub fn from_url(lang: &str, base_url: &str, client: reqwest::Client) -> Self {
        Self {
            lang: lang.to_string(),
            mode: Mode::Http {
                base_url: base_url.trim_end_matches('/').to_string(),
                client,
            },
        }
    }

    /// Build a feed from the raw JSON payload.
    pub fn parse_feed(lang: &str, payload: &Value) -> OnThisDayFeed {
        let t0 = std::time::Instant::now();
        let mut feed = OnThisDayFeed::default();
        for section in Section::ALL {
            let items: Vec<Item> = section_entries(payload, section.key())
                .into_iter()
                .filter_map(|e| entry_to_item(e, lang))
                .collect();
            *feed.section_mut(section) = items;
        }
        histogram!("ingest_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("ingest_events_total").increment(feed.total() as u64);
        feed
    }
}

/// Sections are normally arrays; some editions send an object keyed by index.
fn section_entries<'a>(payload: &'a Value, key: &str) -> Vec<&'a Value> {
    match payload.get(key) {
        Some(Value::Array(arr)) => arr.iter().collect(),
        Some(Value::Object(map)) => map.values().collect(),
        _ => Vec::new(),
    }
}

fn str_field(v: &Value, key: &str) -> Option<String> {
    v.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn entry_to_item(entry: &Value, lang: &str) -> Option<Item> {
    if !entry.is_object() {
        return None;
    }
    let text = str_field(entry, "text")?;
    let year = entry
        .get("year")
        .and_then(Value::as_i64)
        .and_then(|y| i32::try_from(y).ok())
        .unwrap_or(0);

    let page = entry
        .get("pages")
        .and_then(Value::as_array)
        .and_then(|p| p.first());
    let (page_title, extract, thumbnail) = match page {
        Some(p) => (
            str_field(p, "title").unwrap_or_default(),
            str_field(p, "extract"),
            p.get("thumbnail").and_then(|t| str_field(t, "source")),
        ),
        None => (String::new(), None, None),
    };

    Some(Item {
        year,
        text,
        lang: lang.to_string(),
        extract,
        thumbnail,
        page_title,
        ..Item::default()
    })
}

#[async_trait]
impl OnThisDayProvider for WikiProvider {
    async fn fetch_day(&self, month: u32, day: u32) -> Result<OnThisDayFeed> {
        let payload: Value = match &self.mode {
            Mode::Fixture(s) => serde_json::from_str(s).context("parsing wiki fixture json")?,
            Mode::Http { base_url, client } => {
                let url = format!("{base_url}/{month:02}/{day:02}");
                get_json(client, &url).await?
            }
        };
        Ok(Self::parse_feed(&self.lang, &payload))
    }

    fn lang(&self) -> &str {
        &self.lang
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_entries_and_first_page() {
        let payload = json!({
            "events": [
                {
                    "text": "The Knesset convenes for the first time",
                    "year": 1949,
                    "pages": [
                        {"title": "Knesset", "extract": "The legislature.", "thumbnail": {"source": "https://img/k.jpg"}},
                        {"title": "Ignored"}
                    ]
                },
                {"year": 1500},
                "not an object"
            ],
            "births": {"0": {"text": "Someone is born", "year": 1900}},
            "holidays": [{"text": "A holiday"}]
        });
        let feed = WikiProvider::parse_feed("en", &payload);
        assert_eq!(feed.events.len(), 1);
        let e = &feed.events[0];
        assert_eq!(e.year, 1949);
        assert_eq!(e.page_title, "Knesset");
        assert_eq!(e.extract.as_deref(), Some("The legislature."));
        assert!(e.has_image());
        assert_eq!(e.lang, "en");

        assert_eq!(feed.births.len(), 1);
        assert_eq!(feed.holidays[0].year, 0);
        assert!(feed.deaths.is_empty());
    }

    #[tokio::test]
    async fn fixture_mode_fetches() {
        let p = WikiProvider::from_fixture_str("he", r#"{"events":[{"text":"אירוע","year":1948}]}"#);
        let feed = p.fetch_day(5, 14).await.unwrap();
        assert_eq!(feed.events.len(), 1);
        assert_eq!(p.lang(), "he");
    }
}
