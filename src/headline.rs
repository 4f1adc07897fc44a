// src/headline.rs
//! Headline scoring.
//!
//! Four normalized factors in [0,1], each multiplied by a fixed weight:
//! - regional : verified protected-category relevance (1.0 native, 0.7 translated)
//! - age      : years since the event / saturation (150), clamped
//! - depth    : trimmed extract length / 280 chars, clamped
//! - media    : 1 when a thumbnail exists
//!
//! Score = Σ factor × weight, rounded to 2 decimals. Eligibility (age floor,
//! dated, not ancient) is checked by the caller via [`is_eligible`].

use crate::classify::{Category, ProtectedCfg};
use crate::ingest::types::Item;
use serde::{Deserialize, Serialize};

/// Regional factor when the category matches but the text was translated.
pub const UNCERTAIN_PROVENANCE: f64 = 0.7;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadlineWeights {
    pub regional: f64,
    pub age: f64,
    pub depth: f64,
    pub media: f64,
}

impl Default for HeadlineWeights {
    fn default() -> Self {
        Self {
            regional: 45.0,
            age: 30.0,
            depth: 15.0,
            media: 10.0,
        }
    }
}

impl HeadlineWeights {
    pub fn total(&self) -> f64 {
        self.regional + self.age + self.depth + self.media
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadlineConfig {
    pub min_age_years: i32,
    pub saturation_years: f64,
    pub depth_chars: f64,
    pub weights: HeadlineWeights,
}

impl Default for HeadlineConfig {
    fn default() -> Self {
        Self {
            min_age_years: 25,
            saturation_years: 150.0,
            depth_chars: 280.0,
            weights: HeadlineWeights::default(),
        }
    }
}

/// What counts as "verified regional": the protected category and its native language.
#[derive(Clone, Debug)]
pub struct RegionalPolicy {
    pub category: Category,
    pub native_language: String,
}

impl Default for RegionalPolicy {
    fn default() -> Self {
        Self {
            category: Category::Israel,
            native_language: "he".to_string(),
        }
    }
}

impl From<&ProtectedCfg> for RegionalPolicy {
    fn from(p: &ProtectedCfg) -> Self {
        Self {
            category: p.category,
            native_language: p.native_language.clone(),
        }
    }
}

fn clamp01(x: f64) -> f64 {
    if x.is_finite() {
        x.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Years between the event and `reference_year`, floored at 0.
pub fn age_years(item: &Item, reference_year: i32) -> i32 {
    reference_year.saturating_sub(item.year).max(0)
}

/// Undated, ancient/generated and too-recent items never compete.
pub fn is_eligible(item: &Item, reference_year: i32, cfg: &HeadlineConfig) -> bool {
    !item.is_ancient
        && item.year != 0
        && reference_year.saturating_sub(item.year) >= cfg.min_age_years
}

pub fn regional_factor(item: &Item, policy: &RegionalPolicy) -> f64 {
    if item.category != policy.category {
        return 0.0;
    }
    let native_text = item.lang == policy.native_language;
    let never_translated = item
        .original_lang
        .as_deref()
        .map_or(true, |orig| orig == policy.native_language);
    if native_text && never_translated {
        1.0
    } else {
        UNCERTAIN_PROVENANCE
    }
}

pub fn age_factor(item: &Item, reference_year: i32, cfg: &HeadlineConfig) -> f64 {
    if cfg.saturation_years <= 0.0 {
        return 0.0;
    }
    clamp01(age_years(item, reference_year) as f64 / cfg.saturation_years)
}

pub fn depth_factor(item: &Item, cfg: &HeadlineConfig) -> f64 {
    if cfg.depth_chars <= 0.0 {
        return 0.0;
    }
    let len = item
        .extract
        .as_deref()
        .map(|e| e.trim().chars().count())
        .unwrap_or(0);
    clamp01(len as f64 / cfg.depth_chars)
}

pub fn media_factor(item: &Item) -> f64 {
    if item.has_image() {
        1.0
    } else {
        0.0
    }
}

/// Weighted desirability in `[0, weights.total()]`.
pub fn score_headline_candidate(
    item: &Item,
    reference_year: i32,
    cfg: &HeadlineConfig,
    policy: &RegionalPolicy,
) -> f64 {
    let w = &cfg.weights;
    let raw = regional_factor(item, policy) * w.regional.max(0.0)
        + age_factor(item, reference_year, cfg) * w.age.max(0.0)
        + depth_factor(item, cfg) * w.depth.max(0.0)
        + media_factor(item) * w.media.max(0.0);
    if raw.is_finite() {
        round2(raw.max(0.0))
    } else {
        0.0
    }
}

/// Eligible items as (index, score), best first; equal scores keep input order.
pub fn rank_candidates(
    items: &[Item],
    reference_year: i32,
    cfg: &HeadlineConfig,
    policy: &RegionalPolicy,
) -> Vec<(usize, f64)> {
    let mut ranked: Vec<(usize, f64)> = items
        .iter()
        .enumerate()
        .filter(|(_, it)| is_eligible(it, reference_year, cfg))
        .map(|(i, it)| (i, score_headline_candidate(it, reference_year, cfg, policy)))
        .collect();
    // sort_by is stable
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked
}

/// Top-ranked eligible item with `headline_score` filled in; `None` if nobody qualifies.
pub fn select_headline(
    items: &[Item],
    reference_year: i32,
    cfg: &HeadlineConfig,
    policy: &RegionalPolicy,
) -> Option<Item> {
    let (idx, score) = rank_candidates(items, reference_year, cfg, policy)
        .into_iter()
        .next()?;
    let mut headline = items[idx].clone();
    headline.headline_score = Some(score);
    Some(headline)
}
