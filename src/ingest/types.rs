// src/ingest/types.rs
use crate::classify::Category;
use anyhow::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One "on this day" entry (event, birth, death, selected or holiday).
/// Missing strings deserialize as empty, missing numbers as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Item {
    /// Negative = BCE. Zero = undated (holidays).
    pub year: i32,
    pub text: String,
    /// Working language of `text`/`extract` right now, e.g. "he" or "en".
    pub lang: String,
    /// Source language before translation; absent when never translated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_lang: Option<String>,
    pub extract: Option<String>,
    pub thumbnail: Option<String>,
    pub page_title: String,
    pub category: Category,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_ancient: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headline_score: Option<f64>,
}

impl Item {
    pub fn new(year: i32, text: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            year,
            text: text.into(),
            lang: lang.into(),
            ..Self::default()
        }
    }

    pub fn has_image(&self) -> bool {
        self.thumbnail
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty())
    }

    /// True once `text` came out of the translator.
    pub fn is_translated(&self) -> bool {
        self.original_lang
            .as_deref()
            .is_some_and(|orig| orig != self.lang)
    }
}

/// A news headline from one of the RSS feeds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewsItem {
    pub title: String,
    pub url: String,
    pub summary: String,
    pub source: String,
    pub image: Option<String>,
    /// Unix seconds, 0 when the feed gave no usable date.
    pub published_at: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translated_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translated_summary: Option<String>,
}

/// Sections of the on-this-day feed, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Events,
    Births,
    Deaths,
    Selected,
    Holidays,
}

impl Section {
    pub const ALL: [Section; 5] = [
        Section::Events,
        Section::Births,
        Section::Deaths,
        Section::Selected,
        Section::Holidays,
    ];

    /// Key used by the Wikipedia feed and the digest JSON.
    pub fn key(&self) -> &'static str {
        match self {
            Section::Events => "events",
            Section::Births => "births",
            Section::Deaths => "deaths",
            Section::Selected => "selected",
            Section::Holidays => "holidays",
        }
    }
}

/// Parsed entries of one language edition for one calendar day.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OnThisDayFeed {
    pub events: Vec<Item>,
    pub births: Vec<Item>,
    pub deaths: Vec<Item>,
    pub selected: Vec<Item>,
    pub holidays: Vec<Item>,
}

impl OnThisDayFeed {
    pub fn section(&self, s: Section) -> &Vec<Item> {
        match s {
            Section::Events => &self.events,
            Section::Births => &self.births,
            Section::Deaths => &self.deaths,
            Section::Selected => &self.selected,
            Section::Holidays => &self.holidays,
        }
    }

    pub fn section_mut(&mut self, s: Section) -> &mut Vec<Item> {
        match s {
            Section::Events => &mut self.events,
            Section::Births => &mut self.births,
            Section::Deaths => &mut self.deaths,
            Section::Selected => &mut self.selected,
            Section::Holidays => &mut self.holidays,
        }
    }

    pub fn total(&self) -> usize {
        Section::ALL.iter().map(|s| self.section(*s).len()).sum()
    }
}

#[async_trait::async_trait]
pub trait OnThisDayProvider: Send + Sync {
    async fn fetch_day(&self, month: u32, day: u32) -> Result<OnThisDayFeed>;
    /// Language edition, e.g. "he".
    fn lang(&self) -> &str;
}

#[async_trait::async_trait]
pub trait CalendarProvider: Send + Sync {
    /// Hebrew calendar rendering of a Gregorian date.
    async fn hebrew_date(&self, date: NaiveDate) -> Result<String>;
}

#[async_trait::async_trait]
pub trait NewsProvider: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<NewsItem>>;
    fn name(&self) -> &str;
}
