// src/digest/mod.rs
//! The daily digest document and the pure steps that shape it:
//! edition merge, ordering/truncation, ancient slots and stats.

pub mod collector;
pub mod persist;

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::analyze::SocialPost;
use crate::classify::Category;
use crate::ingest::types::{Item, NewsItem, OnThisDayFeed, Section};

pub use collector::{Collector, Sources};
pub use persist::{save, SavedPaths};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    /// Entries taken from the native edition.
    pub he: usize,
    /// Entries added from the foreign edition.
    pub en: usize,
    pub translated: usize,
    pub total: usize,
    pub israel_events: usize,
}

/// Output document, written as `today.json` and `daily-digest-<date>.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Digest {
    /// ISO date, `YYYY-MM-DD`.
    pub date: String,
    /// RFC 3339 timestamp of the run.
    pub generated_at: String,
    pub hebrew_date: String,
    pub events: Vec<Item>,
    pub births: Vec<Item>,
    pub deaths: Vec<Item>,
    pub selected: Vec<Item>,
    pub holidays: Vec<Item>,
    pub social_posts: Vec<SocialPost>,
    pub news: Vec<NewsItem>,
    pub categories: BTreeMap<Category, usize>,
    pub stats: Stats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headline: Option<Item>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ancient_events: Vec<Item>,
}

/// Append foreign-edition entries whose year the native edition does not
/// already cover, section by section. Returns how many were added.
pub fn merge_editions(native: &mut OnThisDayFeed, foreign: OnThisDayFeed) -> usize {
    let mut foreign = foreign;
    let mut added = 0;
    for section in Section::ALL {
        let target = native.section_mut(section);
        let years: HashSet<i32> = target.iter().map(|e| e.year).collect();
        let fresh: Vec<Item> = std::mem::take(foreign.section_mut(section))
            .into_iter()
            .filter(|e| !years.contains(&e.year))
            .collect();
        added += fresh.len();
        target.extend(fresh);
    }
    added
}

/// Protected category first, then most recent year first. Stable.
pub fn sort_protected_first(items: &mut [Item], protected: Category) {
    items.sort_by(|a, b| {
        (b.category == protected)
            .cmp(&(a.category == protected))
            .then_with(|| b.year.cmp(&a.year))
    });
}

/// Modern events (protected first, newest first) capped at
/// `max_events - ancient_slots`, followed by up to `ancient_slots` ancient
/// events, oldest first.
pub fn arrange_events(
    events: Vec<Item>,
    protected: Category,
    max_events: usize,
    ancient_slots: usize,
) -> Vec<Item> {
    let (mut ancient, mut modern): (Vec<Item>, Vec<Item>) =
        events.into_iter().partition(|e| e.is_ancient);
    sort_protected_first(&mut modern, protected);
    ancient.sort_by_key(|e| e.year);
    modern.truncate(max_events.saturating_sub(ancient_slots));
    ancient.truncate(ancient_slots);
    modern.extend(ancient);
    modern
}

pub fn arrange_births(mut births: Vec<Item>, protected: Category, max: usize) -> Vec<Item> {
    sort_protected_first(&mut births, protected);
    births.truncate(max);
    births
}

pub fn arrange_deaths(mut deaths: Vec<Item>, max: usize) -> Vec<Item> {
    deaths.sort_by(|a, b| b.year.cmp(&a.year));
    deaths.truncate(max);
    deaths
}

/// Fill whatever ancient slots are still free with generated entries.
/// Returns how many were added.
pub fn fill_ancient_slots(events: &mut Vec<Item>, generated: &[Item], ancient_slots: usize) -> usize {
    let used = events.iter().filter(|e| e.is_ancient).count();
    let free = ancient_slots.saturating_sub(used);
    let add: Vec<Item> = generated.iter().take(free).cloned().collect();
    let n = add.len();
    events.extend(add);
    n
}

impl Digest {
    /// Recompute `total`, `translated` and the protected count from the final lists.
    pub fn refresh_stats(&mut self, protected: Category) {
        let main: Vec<&Item> = self
            .events
            .iter()
            .chain(&self.births)
            .chain(&self.deaths)
            .collect();
        let total = main.len();
        let translated = main.iter().filter(|e| e.is_translated()).count();
        self.stats.total = total;
        self.stats.translated = translated;
        self.stats.israel_events = self.categories.get(&protected).copied().unwrap_or(0);
    }
}
