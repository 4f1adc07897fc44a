// src/classify.rs
//! Topic classifier: keyword tables, protected-category gate, blacklist
//! suppression and per-decision diagnostics.

use crate::ingest::types::Item;
use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use tracing::info;

// --- env names & embedded defaults ---
pub const ENV_CLASSIFIER_CONFIG_PATH: &str = "CLASSIFIER_CONFIG_PATH";
pub const DEFAULT_CLASSIFIER_TOML: &str = include_str!("../config/classifier.toml");

const STRONG_POINTS: u32 = 2;
const WEAK_POINTS: u32 = 1;

/// Closed set of topic tags.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Israel,
    Politics,
    Military,
    Sports,
    Culture,
    Science,
    #[default]
    General,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Israel,
        Category::Politics,
        Category::Military,
        Category::Sports,
        Category::Culture,
        Category::Science,
        Category::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Israel => "israel",
            Category::Politics => "politics",
            Category::Military => "military",
            Category::Sports => "sports",
            Category::Culture => "culture",
            Category::Science => "science",
            Category::General => "general",
        }
    }

    /// Hebrew section label shown by the presentation layer.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Israel => "ישראל",
            Category::Politics => "פוליטיקה",
            Category::Military => "ביטחון",
            Category::Sports => "ספורט",
            Category::Culture => "תרבות",
            Category::Science => "מדע וטכנולוגיה",
            Category::General => "כללי",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Dev logging gate: CLASSIFY_DEV_LOG=1 AND dev env (debug or DIGEST_ENV in {local,development,dev})
pub(crate) fn dev_logging_enabled() -> bool {
    let on = std::env::var("CLASSIFY_DEV_LOG").ok().as_deref() == Some("1");
    if !on {
        return false;
    }
    if cfg!(debug_assertions) {
        return true;
    }
    matches!(
        std::env::var("DIGEST_ENV")
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str(),
        "local" | "development" | "dev"
    )
}

pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Anonymized dev logger: hashed id + short lists, never the raw text.
fn dev_log_classification(text: &str, c: &Classification) {
    if !dev_logging_enabled() {
        return;
    }
    let id = anon_hash(text);
    let blacklist: Vec<&String> = c.diagnostics.blacklist_hits.iter().take(5).collect();
    info!(
        target: "classify",
        %id,
        category = %c.category,
        strong = c.diagnostics.strong_hits,
        weak = c.diagnostics.weak_hits,
        blacklist = ?blacklist,
        "classified"
    );
}

/* ----------------------------
Config schema (from TOML)
---------------------------- */

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    pub protected: ProtectedCfg,
    /// Ordered: earlier entries win ties.
    #[serde(default)]
    pub categories: Vec<CategoryDef>,
    #[serde(default)]
    pub blacklist: Vec<BlacklistCfg>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProtectedCfg {
    pub category: Category,
    #[serde(default = "default_min_score")]
    pub min_score: u32,
    #[serde(default = "default_native_language")]
    pub native_language: String,
}

fn default_min_score() -> u32 {
    2
}

fn default_native_language() -> String {
    "he".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryDef {
    pub category: Category,
    #[serde(default)]
    pub strong: Vec<String>,
    #[serde(default)]
    pub weak: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlacklistCfg {
    pub id: String,
    pub pattern: String,
    pub reason: String,
    #[serde(default)]
    pub near: Option<NearCfg>,
    /// A match within the window cancels this entry.
    #[serde(default)]
    pub unless: Option<NearCfg>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NearCfg {
    pub pattern: String,
    pub window: usize,
}

/* ----------------------------
Results
---------------------------- */

/// Why a decision was made, not just what it was.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    /// Distinct strong keywords of the protected category found in the text.
    pub strong_hits: usize,
    pub weak_hits: usize,
    /// Score per category, in table order.
    pub scores: Vec<(Category, u32)>,
    /// `blacklist:<id>:<reason>` for every matching pattern.
    pub blacklist_hits: Vec<String>,
    /// True only when the final category is the protected one.
    pub verified: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub category: Category,
    pub diagnostics: Diagnostics,
}

/* ----------------------------
Compiled classifier
---------------------------- */

#[derive(Debug)]
struct CompiledCategory {
    category: Category,
    strong: Vec<String>,
    weak: Vec<String>,
}

#[derive(Debug)]
struct CompiledBlacklist {
    cfg: BlacklistCfg,
    re: Regex,
    near: Option<(Regex, usize)>,
    unless: Option<(Regex, usize)>,
}

#[derive(Debug)]
pub struct Classifier {
    pub cfg: ClassifierConfig,
    categories: Vec<CompiledCategory>,
    blacklist: Vec<CompiledBlacklist>,
}

/// A single token with byte span and sequential index.
#[derive(Debug, Clone)]
struct Token {
    start: usize,
    end: usize,
    index: usize,
}

fn tokenize(input: &str) -> Vec<Token> {
    static RE_WORD: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?u)\b\w+\b").expect("tokenizer regex"));
    RE_WORD
        .find_iter(input)
        .enumerate()
        .map(|(i, m)| Token {
            start: m.start(),
            end: m.end(),
            index: i,
        })
        .collect()
}

/// Byte position → token index (gaps backfilled with the previous token).
fn byte_to_token_index(text: &str) -> Vec<usize> {
    let mut byte_to_tok = vec![usize::MAX; text.len() + 1];
    for t in tokenize(text) {
        for slot in &mut byte_to_tok[t.start..=t.end] {
            *slot = t.index;
        }
    }
    let mut last = usize::MAX;
    for slot in byte_to_tok.iter_mut() {
        if *slot == usize::MAX {
            *slot = last;
        } else {
            last = *slot;
        }
    }
    byte_to_tok
}

fn match_token_indices(re: &Regex, text: &str, byte_to_tok: &[usize]) -> Vec<usize> {
    re.find_iter(text)
        .filter_map(|m| byte_to_tok.get(m.start()).copied())
        .filter(|&idx| idx != usize::MAX)
        .collect()
}

fn compile_near(
    id: &str,
    what: &str,
    cfg: Option<&NearCfg>,
) -> anyhow::Result<Option<(Regex, usize)>> {
    cfg.map(|nc| {
        Regex::new(&nc.pattern)
            .map(|re| (re, nc.window))
            .map_err(|e| anyhow::anyhow!("blacklist `{}` {}-regex error: {}", id, what, e))
    })
    .transpose()
}

fn within_window(main_idxs: &[usize], near_idxs: &[usize], window: usize) -> bool {
    main_idxs
        .iter()
        .any(|&a| near_idxs.iter().any(|&b| a.abs_diff(b) <= window))
}

fn lower_all(words: &[String]) -> Vec<String> {
    words
        .iter()
        .map(|w| w.trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

impl Classifier {
    /// Load tables from `$CLASSIFIER_CONFIG_PATH`, or the embedded defaults.
    pub fn from_toml() -> anyhow::Result<Self> {
        match std::env::var(ENV_CLASSIFIER_CONFIG_PATH) {
            Ok(p) => {
                let path = PathBuf::from(p);
                let content = fs::read_to_string(&path).map_err(|e| {
                    anyhow::anyhow!(
                        "Failed to read classifier config at {}: {}",
                        path.display(),
                        e
                    )
                })?;
                Self::from_toml_str(&content)
            }
            Err(_) => Self::builtin(),
        }
    }

    /// Classifier over the embedded default tables.
    pub fn builtin() -> anyhow::Result<Self> {
        Self::from_toml_str(DEFAULT_CLASSIFIER_TOML)
    }

    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        let cfg: ClassifierConfig = toml::from_str(toml_str)?;
        Self::new(cfg)
    }

    pub fn new(cfg: ClassifierConfig) -> anyhow::Result<Self> {
        let mut seen = Vec::with_capacity(cfg.categories.len());
        let mut categories = Vec::with_capacity(cfg.categories.len());
        for def in &cfg.categories {
            if def.category == Category::General {
                anyhow::bail!("`general` is the fallback category and cannot carry keywords");
            }
            if seen.contains(&def.category) {
                anyhow::bail!("category `{}` is defined twice", def.category);
            }
            seen.push(def.category);
            categories.push(CompiledCategory {
                category: def.category,
                strong: lower_all(&def.strong),
                weak: lower_all(&def.weak),
            });
        }
        let protected = cfg.protected.category;
        if protected == Category::General {
            anyhow::bail!("`general` cannot be the protected category");
        }
        if !seen.contains(&protected) {
            anyhow::bail!("protected category `{}` has no keyword table", protected);
        }

        let blacklist = cfg
            .blacklist
            .iter()
            .cloned()
            .map(|b| {
                let re = Regex::new(&b.pattern)
                    .map_err(|e| anyhow::anyhow!("blacklist `{}` regex error: {}", b.id, e))?;
                let near = compile_near(&b.id, "near", b.near.as_ref())?;
                let unless = compile_near(&b.id, "unless", b.unless.as_ref())?;
                Ok(CompiledBlacklist {
                    cfg: b,
                    re,
                    near,
                    unless,
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Self {
            cfg,
            categories,
            blacklist,
        })
    }

    pub fn protected(&self) -> Category {
        self.cfg.protected.category
    }

    pub fn native_language(&self) -> &str {
        &self.cfg.protected.native_language
    }

    /// Blacklist patterns matching `text` (with optional proximity requirement).
    pub fn find_blacklist(&self, text: &str) -> Vec<String> {
        if self.blacklist.is_empty() {
            return Vec::new();
        }
        let byte_to_tok = byte_to_token_index(text);

        let mut hits = Vec::new();
        for b in &self.blacklist {
            let main_idxs = match_token_indices(&b.re, text, &byte_to_tok);
            if main_idxs.is_empty() {
                continue;
            }
            if let Some((near_re, win)) = &b.near {
                let near_idxs = match_token_indices(near_re, text, &byte_to_tok);
                if near_idxs.is_empty() || !within_window(&main_idxs, &near_idxs, *win) {
                    continue;
                }
            }
            if let Some((guard_re, win)) = &b.unless {
                let guard_idxs = match_token_indices(guard_re, text, &byte_to_tok);
                if within_window(&main_idxs, &guard_idxs, *win) {
                    continue;
                }
            }
            hits.push(format!("blacklist:{}:{}", b.cfg.id, b.cfg.reason));
        }
        hits
    }

    /// Classify free text. Only `text` and `page_title` participate.
    pub fn classify(&self, text: &str, page_title: &str) -> Classification {
        let combined = format!("{} {}", text, page_title).to_lowercase();
        let protected = self.protected();

        let mut diagnostics = Diagnostics::default();
        let mut best = Category::General;
        let mut best_score = 0u32;

        for cat in &self.categories {
            let strong = cat
                .strong
                .iter()
                .filter(|kw| combined.contains(kw.as_str()))
                .count();
            let weak = cat
                .weak
                .iter()
                .filter(|kw| combined.contains(kw.as_str()))
                .count();
            let score = strong as u32 * STRONG_POINTS + weak as u32 * WEAK_POINTS;

            if cat.category == protected {
                diagnostics.strong_hits = strong;
                diagnostics.weak_hits = weak;
            }
            diagnostics.scores.push((cat.category, score));

            // strictly greater: ties keep the earlier category
            if score > best_score {
                best_score = score;
                best = cat.category;
            }
        }

        // Protected gate: needs the minimum score and at least one strong keyword.
        if best == protected
            && (best_score < self.cfg.protected.min_score || diagnostics.strong_hits == 0)
        {
            best = Category::General;
        }

        // Blacklist wins over everything above.
        diagnostics.blacklist_hits = self.find_blacklist(&combined);
        if !diagnostics.blacklist_hits.is_empty() {
            best = Category::General;
        }

        diagnostics.verified = best == protected;
        let out = Classification {
            category: best,
            diagnostics,
        };
        dev_log_classification(&combined, &out);
        out
    }

    pub fn classify_item(&self, item: &Item) -> Classification {
        self.classify(&item.text, &item.page_title)
    }

    /// Classify every item in place; returns per-category counts.
    pub fn classify_all(&self, items: &mut [Item]) -> BTreeMap<Category, usize> {
        let mut counts = BTreeMap::new();
        for item in items.iter_mut() {
            item.category = self.classify_item(item).category;
            *counts.entry(item.category).or_insert(0) += 1;
            counter!("classify_category_total", "category" => item.category.as_str())
                .increment(1);
        }
        counts
    }
}

/* ----------------------------
Tests
---------------------------- */
