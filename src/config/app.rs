// src/config/app.rs
//! Digest run configuration (`config/digest.toml`), every field defaulted.

use crate::config::llm::LlmConfig;
use crate::headline::HeadlineConfig;
use crate::ingest::providers::{hebcal::HEBCAL_CONVERTER, wiki};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_DIGEST_CONFIG_PATH: &str = "config/digest.toml";
pub const ENV_DIGEST_CONFIG_PATH: &str = "DIGEST_CONFIG_PATH";
pub const ENV_OUTPUT_DIR: &str = "DIGEST_OUTPUT_DIR";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DigestConfig {
    pub sources: SourcesCfg,
    pub feeds: FeedList,
    pub limits: LimitsCfg,
    pub headline: HeadlineConfig,
    pub llm: LlmConfig,
    pub output: OutputCfg,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesCfg {
    pub wiki_he: String,
    pub wiki_en: String,
    pub hebcal: String,
    /// Extra attempts per news feed.
    pub news_retries: u32,
}

impl Default for SourcesCfg {
    fn default() -> Self {
        Self {
            wiki_he: wiki::WIKI_HE.to_string(),
            wiki_en: wiki::WIKI_EN.to_string(),
            hebcal: HEBCAL_CONVERTER.to_string(),
            news_retries: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedCfg {
    pub name: String,
    pub url: String,
    /// Label stored on every item of this feed.
    pub source: String,
    pub max: usize,
}

impl FeedCfg {
    fn new(name: &str, url: &str, source: &str, max: usize) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            source: source.to_string(),
            max,
        }
    }
}

/// Ordered news feeds; order decides which duplicate survives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeedList(pub Vec<FeedCfg>);

impl Default for FeedList {
    fn default() -> Self {
        Self(vec![
            FeedCfg::new(
                "YNET",
                "https://www.ynet.co.il/Integration/StoryRss2.xml",
                "ynet",
                10,
            ),
            FeedCfg::new("Walla", "https://rss.walla.co.il/feed/1", "וואלה", 5),
            FeedCfg::new(
                "Google News",
                "https://news.google.com/rss?hl=he&gl=IL&ceid=IL:he",
                "Google News",
                5,
            ),
            FeedCfg::new(
                "Maariv",
                "https://www.maariv.co.il/Rss/RssChad498",
                "מעריב",
                4,
            ),
            FeedCfg::new(
                "Israel Hayom",
                "https://www.israelhayom.co.il/rss.xml",
                "ישראל היום",
                4,
            ),
            FeedCfg::new(
                "Calcalist",
                "https://www.calcalist.co.il/GeneralRss/0,16335,L-8,00.xml",
                "כלכליסט",
                3,
            ),
        ])
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsCfg {
    pub max_events: usize,
    pub max_births: usize,
    pub max_deaths: usize,
    /// Share of `max_events` reserved for ancient entries.
    pub ancient_event_slots: usize,
    pub translate_batch_size: usize,
    pub social_posts: usize,
    /// Whole-run deadline.
    pub run_timeout_secs: u64,
}

impl Default for LimitsCfg {
    fn default() -> Self {
        Self {
            max_events: 60,
            max_births: 30,
            max_deaths: 25,
            ancient_event_slots: 8,
            translate_batch_size: 7,
            social_posts: 8,
            run_timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputCfg {
    pub dir: PathBuf,
    pub today_file: String,
    pub archive_prefix: String,
}

impl Default for OutputCfg {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            today_file: "today.json".to_string(),
            archive_prefix: "daily-digest-".to_string(),
        }
    }
}

impl DigestConfig {
    /// Load from `$DIGEST_CONFIG_PATH` or `config/digest.toml`.
    /// A missing default file means built-in defaults; a missing explicit path is an error.
    pub fn load() -> Result<Self> {
        let cfg = match std::env::var(ENV_DIGEST_CONFIG_PATH) {
            Ok(p) => Self::load_from(Path::new(&p))?,
            Err(_) => {
                let p = PathBuf::from(DEFAULT_DIGEST_CONFIG_PATH);
                if p.exists() {
                    Self::load_from(&p)?
                } else {
                    Self::default()
                }
            }
        };
        Ok(cfg.apply_env())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading digest config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(s).context("parsing digest config")?;
        cfg.validate()
    }

    fn validate(mut self) -> Result<Self> {
        if self.limits.ancient_event_slots > self.limits.max_events {
            anyhow::bail!(
                "ancient_event_slots ({}) exceeds max_events ({})",
                self.limits.ancient_event_slots,
                self.limits.max_events
            );
        }
        if self.limits.translate_batch_size == 0 {
            self.limits.translate_batch_size = LimitsCfg::default().translate_batch_size;
        }
        Ok(self)
    }

    /// Env overrides: output dir and the language-model key/model.
    pub fn apply_env(mut self) -> Self {
        if let Ok(dir) = std::env::var(ENV_OUTPUT_DIR) {
            if !dir.trim().is_empty() {
                self.output.dir = PathBuf::from(dir.trim());
            }
        }
        self.llm = self.llm.resolve_env();
        self
    }
}
