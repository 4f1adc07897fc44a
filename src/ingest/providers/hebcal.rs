// src/ingest/providers/hebcal.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use serde::Deserialize;

use crate::ingest::http::get_json;
use crate::ingest::types::CalendarProvider;

pub const HEBCAL_CONVERTER: &str = "https://www.hebcal.com/converter";

#[derive(Debug, Deserialize)]
struct Converted {
    #[serde(default)]
    hebrew: String,
}

/// Gregorian → Hebrew date via the Hebcal converter.
pub struct HebcalProvider {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        base_url: String,
        client: reqwest::Client,
    },
}

impl HebcalProvider {
    pub fn from_fixture_str(json: &str) -> Self {
        Self {
            mode: Mode::Fixture(json.to_string()),
        }
    }

    pub fn from_url(base_url: &str, client: reqwest::Client) -> Self {
        Self {
            mode: Mode::Http {
                base_url: base_url.to_string(),
                client,
            },
        }
    }

    pub fn request_url(base_url: &str, date: NaiveDate) -> String {
        format!(
            "{}?cfg=json&gy={}&gm={}&gd={}&g2h=1",
            base_url,
            date.year(),
            date.month(),
            date.day()
        )
    }
}

#[async_trait]
impl CalendarProvider for HebcalProvider {
    async fn hebrew_date(&self, date: NaiveDate) -> Result<String> {
        let c: Converted = match &self.mode {
            Mode::Fixture(s) => serde_json::from_str(s).context("parsing hebcal fixture")?,
            Mode::Http { base_url, client } => {
                get_json(client, &Self::request_url(base_url, date)).await?
            }
        };
        Ok(c.hebrew)
    }
}
