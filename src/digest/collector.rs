// src/digest/collector.rs
//! One digest run: fetch, translate, classify, arrange, generate, pick a headline.
//! Every collaborator failure is logged and the run continues with less data.

use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use metrics::{gauge, histogram};
use tracing::{info, warn};

use crate::analyze::{self, DynLlmClient, TranslateOptions};
use crate::classify::Classifier;
use crate::config::DigestConfig;
use crate::digest::{
    arrange_births, arrange_deaths, arrange_events, fill_ancient_slots, merge_editions, Digest,
};
use crate::headline::{select_headline, RegionalPolicy};
use crate::ingest::http::build_client;
use crate::ingest::providers::{hebcal::HebcalProvider, rss::RssProvider, wiki::WikiProvider};
use crate::ingest::types::{
    CalendarProvider, NewsProvider, OnThisDayFeed, OnThisDayProvider, Section,
};
use crate::ingest::{collect_news, ensure_metrics_described};

/// External data collaborators, injectable for tests.
pub struct Sources {
    /// Native-language edition; its entries win year collisions.
    pub native: Box<dyn OnThisDayProvider>,
    pub foreign: Box<dyn OnThisDayProvider>,
    pub calendar: Box<dyn CalendarProvider>,
    pub news: Vec<Box<dyn NewsProvider>>,
}

impl Sources {
    /// Live HTTP providers for every configured endpoint.
    pub fn from_config(cfg: &DigestConfig) -> Result<Self> {
        let client = build_client()?;
        let news = cfg
            .feeds
            .0
            .iter()
            .map(|f| {
                Box::new(RssProvider::from_feed_cfg(
                    f,
                    client.clone(),
                    cfg.sources.news_retries,
                )) as Box<dyn NewsProvider>
            })
            .collect();
        Ok(Self {
            native: Box::new(WikiProvider::from_url(
                "he",
                &cfg.sources.wiki_he,
                client.clone(),
            )),
            foreign: Box::new(WikiProvider::from_url(
                "en",
                &cfg.sources.wiki_en,
                client.clone(),
            )),
            calendar: Box::new(HebcalProvider::from_url(&cfg.sources.hebcal, client)),
            news,
        })
    }
}

pub struct Collector {
    cfg: DigestConfig,
    classifier: Classifier,
    llm: DynLlmClient,
    sources: Sources,
    /// Pause between the two attempts of a translation batch.
    retry_delay: Duration,
}

impl Collector {
    pub fn new(cfg: DigestConfig, classifier: Classifier, llm: DynLlmClient, sources: Sources) -> Self {
        Self {
            cfg,
            classifier,
            llm,
            sources,
            retry_delay: Duration::from_secs(2),
        }
    }

    pub fn with_retry_delay(mut self, d: Duration) -> Self {
        self.retry_delay = d;
        self
    }

    pub fn config(&self) -> &DigestConfig {
        &self.cfg
    }

    async fn fetch_editions(&self, month: u32, day: u32, digest: &mut Digest) -> OnThisDayFeed {
        let mut feed = match self.sources.native.fetch_day(month, day).await {
            Ok(f) => f,
            Err(e) => {
                warn!(target: "digest", error = ?e, lang = self.sources.native.lang(), "native edition failed");
                OnThisDayFeed::default()
            }
        };
        digest.stats.he = feed.total();
        info!(target: "digest", lang = self.sources.native.lang(), count = digest.stats.he, "native edition");

        match self.sources.foreign.fetch_day(month, day).await {
            Ok(foreign) => {
                digest.stats.en = merge_editions(&mut feed, foreign);
                info!(target: "digest", lang = self.sources.foreign.lang(), added = digest.stats.en, "foreign edition");
            }
            Err(e) => {
                warn!(target: "digest", error = ?e, lang = self.sources.foreign.lang(), "foreign edition failed");
            }
        }
        feed
    }

    async fn hebrew_date(&self, date: NaiveDate) -> String {
        match self.sources.calendar.hebrew_date(date).await {
            Ok(h) => h,
            Err(e) => {
                warn!(target: "digest", error = ?e, "hebrew date failed");
                String::new()
            }
        }
    }

    /// Build the digest for `date`. `generated_at` is stamped as given.
    pub async fn collect(&self, date: NaiveDate, generated_at: String) -> Digest {
        ensure_metrics_described();
        let t0 = Instant::now();
        let (month, day) = (date.month(), date.day());
        let protected = self.classifier.protected();
        let limits = &self.cfg.limits;

        let mut digest = Digest {
            date: date.format("%Y-%m-%d").to_string(),
            generated_at,
            ..Digest::default()
        };
        info!(target: "digest", date = %digest.date, llm = self.llm.provider_name(), "collection started");

        let mut feed = self.fetch_editions(month, day, &mut digest).await;
        digest.hebrew_date = self.hebrew_date(date).await;

        let (mut news, ok_sources) = collect_news(&self.sources.news).await;
        info!(target: "digest", count = news.len(), sources = ok_sources, "news collected");
        analyze::translate_news(self.llm.as_ref(), &mut news, self.cfg.llm.max_tokens).await;
        digest.news = news;

        let opts = TranslateOptions {
            batch_size: limits.translate_batch_size,
            max_tokens: self.cfg.llm.max_tokens,
            retry_delay: self.retry_delay,
        };
        analyze::translate_entries(self.llm.as_ref(), &mut feed, &opts).await;

        for section in Section::ALL {
            for (cat, n) in self.classifier.classify_all(feed.section_mut(section)) {
                *digest.categories.entry(cat).or_insert(0) += n;
            }
        }
        info!(target: "digest", categories = ?digest.categories, "classified");

        digest.events = arrange_events(
            std::mem::take(&mut feed.events),
            protected,
            limits.max_events,
            limits.ancient_event_slots,
        );
        digest.births =
            arrange_births(std::mem::take(&mut feed.births), protected, limits.max_births);
        digest.deaths = arrange_deaths(std::mem::take(&mut feed.deaths), limits.max_deaths);
        digest.selected = std::mem::take(&mut feed.selected);
        digest.holidays = std::mem::take(&mut feed.holidays);

        let sources =
            analyze::social_sources(&digest.events, &digest.selected, &digest.births, protected);
        digest.social_posts = analyze::social_posts(
            self.llm.as_ref(),
            &sources,
            limits.social_posts,
            self.cfg.llm.max_tokens,
        )
        .await;

        let ancient = analyze::ancient_events(
            self.llm.as_ref(),
            month,
            day,
            protected,
            self.classifier.native_language(),
        )
        .await;
        if !ancient.is_empty() {
            fill_ancient_slots(&mut digest.events, &ancient, limits.ancient_event_slots);
            digest.ancient_events = ancient;
        }

        let policy = RegionalPolicy {
            category: protected,
            native_language: self.classifier.native_language().to_string(),
        };
        digest.headline = select_headline(&digest.events, date.year(), &self.cfg.headline, &policy);
        match &digest.headline {
            Some(h) => info!(target: "digest", year = h.year, score = ?h.headline_score, "headline selected"),
            None => info!(target: "digest", "no eligible headline"),
        }

        digest.refresh_stats(protected);
        gauge!("digest_events").set(digest.events.len() as f64);
        gauge!("digest_news").set(digest.news.len() as f64);
        histogram!("digest_collect_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        info!(
            target: "digest",
            events = digest.events.len(),
            births = digest.births.len(),
            deaths = digest.deaths.len(),
            posts = digest.social_posts.len(),
            translated = digest.stats.translated,
            "collection finished"
        );
        digest
    }
}
