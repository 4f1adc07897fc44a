// tests/digest_e2e.rs
// Full run over fixtures: both editions, calendar, two feeds, classification,
// ordering, generated content, headline and both output files.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use onthisday_digest::analyze::llm::{DisabledClient, DynLlmClient, LlmClient};
use onthisday_digest::classify::{Category, Classifier};
use onthisday_digest::config::DigestConfig;
use onthisday_digest::digest::{save, Collector, Digest, Sources};
use onthisday_digest::ingest::providers::{
    hebcal::HebcalProvider, rss::RssProvider, wiki::WikiProvider,
};
use onthisday_digest::ingest::types::NewsProvider;

const WIKI_HE: &str = include_str!("fixtures/wiki_he.json");
const WIKI_EN: &str = include_str!("fixtures/wiki_en.json");
const HEBCAL: &str = include_str!("fixtures/hebcal.json");
const NEWS_HE: &str = include_str!("fixtures/news_he.xml");
const NEWS_MIXED: &str = include_str!("fixtures/news_mixed.xml");

fn sources() -> Sources {
    Sources {
        native: Box::new(WikiProvider::from_fixture_str("he", WIKI_HE)),
        foreign: Box::new(WikiProvider::from_fixture_str("en", WIKI_EN)),
        calendar: Box::new(HebcalProvider::from_fixture_str(HEBCAL)),
        news: vec![
            Box::new(RssProvider::from_fixture_str("HE", "ynet", 10, NEWS_HE)) as Box<dyn NewsProvider>,
            Box::new(RssProvider::from_fixture_str("Mixed", "mixed", 10, NEWS_MIXED)),
        ],
    }
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

async fn run_with(llm: DynLlmClient) -> Digest {
    let collector = Collector::new(
        DigestConfig::default(),
        Classifier::builtin().unwrap(),
        llm,
        sources(),
    )
    .with_retry_delay(Duration::ZERO);
    collector
        .collect(date(), "2026-10-19T04:00:00+00:00".to_string())
        .await
}

fn years(items: &[onthisday_digest::Item]) -> Vec<i32> {
    items.iter().map(|e| e.year).collect()
}

/// Answers by prompt kind: echoes entry titles with a marker, translates
/// news titles, writes one post and two ancient events.
struct FixtureLlm;

impl FixtureLlm {
    fn answer(system: &str, user: &str) -> Option<String> {
        if system.contains("historical content") {
            let rows: Vec<serde_json::Value> = user
                .lines()
                .filter_map(|l| {
                    let (head, text) = l.split_once("T. ")?;
                    let id: usize = head.parse().ok()?;
                    Some(serde_json::json!({ "id": id, "text": format!("{text} (תורגם)") }))
                })
                .collect();
            return serde_json::to_string(&rows).ok();
        }
        if system.contains("news translator") {
            let start = user.find('[')?;
            let lines: Vec<serde_json::Value> = serde_json::from_str(&user[start..]).ok()?;
            let rows: Vec<serde_json::Value> = lines
                .iter()
                .map(|l| serde_json::json!({ "id": l["id"], "title": "מניות הטכנולוגיה מזנקות", "summary": "" }))
                .collect();
            return serde_json::to_string(&rows).ok();
        }
        if system.contains("social media") {
            return Some(
                r#"```json
[{"author":"גולדה מאיר","handle":"@Golda","platform":"twitter","content":"נולדתי היום! #ישראל","year":1898,"eventYear":1898,"likes":1200,"retweets":300,"replies":80}]
```"#
                    .to_string(),
            );
        }
        Some(r#"[{"year":-165,"text":"טיהור המקדש (מסורת)"},{"year":-586,"text":"חורבן בית ראשון","category":"israel"}]"#.to_string())
    }
}

impl LlmClient for FixtureLlm {
    fn complete<'a>(
        &'a self,
        system: &'a str,
        user: &'a str,
        _max_tokens: u32,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        let reply = Self::answer(system, user);
        Box::pin(async move { reply })
    }
    fn provider_name(&self) -> &'static str {
        "fixture"
    }
}

#[tokio::test]
async fn disabled_model_run_is_complete_and_deterministic() {
    let d = run_with(Arc::new(DisabledClient)).await;

    assert_eq!(d.date, "2026-10-19");
    assert_eq!(d.hebrew_date, "ח׳ בְּחֶשְׁוָן תשפ״ז");
    assert_eq!(d.stats.he, 9);
    assert_eq!(d.stats.en, 5, "1950 event and 1920 death already covered");

    // protected first, then newest
    assert_eq!(years(&d.events), vec![1950, 2020, 1969, 1957, 1939, 1929, 1918]);
    assert_eq!(years(&d.births), vec![1898, 1900, 1873]);
    assert_eq!(years(&d.deaths), vec![1955, 1920]);

    assert_eq!(d.categories.get(&Category::Israel), Some(&3));
    assert_eq!(d.categories.get(&Category::Science), Some(&4));
    assert_eq!(d.categories.get(&Category::General), Some(&5));
    assert_eq!(d.categories.values().sum::<usize>(), 14);
    assert_eq!(d.stats.israel_events, 3);

    // weak-only protected text and the diaspora sentence stay general
    assert_eq!(d.births[2].category, Category::General);
    let diaspora = d.events.iter().find(|e| e.year == 1939).unwrap();
    assert_eq!(diaspora.category, Category::General);

    assert_eq!(d.stats.total, 12);
    assert_eq!(d.stats.translated, 0);
    assert!(d.events.iter().any(|e| e.lang == "en"));

    let h = d.headline.as_ref().expect("headline");
    assert_eq!(h.year, 1950);
    assert!(h.headline_score.unwrap() > 80.0);

    // template posts, one per unique source year
    assert_eq!(d.social_posts.len(), 7);
    assert_eq!(d.social_posts[0].event_year, 1950);
    assert!(d.ancient_events.is_empty());

    assert_eq!(d.news.len(), 3);
    assert!(d.news[2].lang.is_none(), "no model, no news translation");

    let again = run_with(Arc::new(DisabledClient)).await;
    assert_eq!(again.social_posts, d.social_posts);
}

#[tokio::test]
async fn model_backed_run_translates_and_generates() {
    let d = run_with(Arc::new(FixtureLlm)).await;

    let moon = d.events.iter().find(|e| e.year == 1969).unwrap();
    assert!(moon.text.ends_with("(תורגם)"));
    assert_eq!(moon.lang, "he");
    assert_eq!(moon.original_lang.as_deref(), Some("en"));
    assert_eq!(moon.category, Category::Science, "translation keeps the keywords");

    assert_eq!(d.stats.translated, 5);
    assert!(d.events.iter().chain(&d.births).chain(&d.deaths).all(|e| e.lang == "he"));

    let tech = &d.news[2];
    assert_eq!(tech.title, "מניות הטכנולוגיה מזנקות");
    assert_eq!(tech.original_title.as_deref(), Some("Tech stocks rally in Tel Aviv"));
    assert_eq!(tech.lang.as_deref(), Some("he"));

    assert_eq!(d.social_posts.len(), 1);
    assert_eq!(d.social_posts[0].handle, "@Golda");

    assert_eq!(d.ancient_events.len(), 2);
    let tail: Vec<_> = d.events.iter().filter(|e| e.is_ancient).collect();
    assert_eq!(tail.len(), 2);
    assert!(tail.iter().all(|e| e.category == Category::Israel));
    assert_eq!(d.stats.total, 14);

    // native, untranslated item keeps the headline over translated ones
    let h = d.headline.as_ref().unwrap();
    assert_eq!(h.year, 1950);
    assert!(!h.is_ancient);
}

#[tokio::test]
async fn saved_files_round_trip() {
    let d = run_with(Arc::new(DisabledClient)).await;
    let tmp = tempfile::tempdir().unwrap();
    let mut cfg = DigestConfig::default();
    cfg.output.dir = tmp.path().to_path_buf();

    let paths = save(&d, &cfg.output).unwrap();
    assert!(paths.today.ends_with("today.json"));
    assert!(paths.archive.ends_with("daily-digest-2026-10-19.json"));

    let raw = std::fs::read_to_string(&paths.archive).unwrap();
    let v: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(v["stats"]["israelEvents"], 3);
    assert_eq!(v["categories"]["israel"], 3);
    assert_eq!(v["headline"]["year"], 1950);
    assert_eq!(v["events"][0]["pageTitle"], "חוק השבות");
    assert!(v.get("ancientEvents").is_none());

    let back: Digest = serde_json::from_str(&raw).unwrap();
    assert_eq!(back, d);
}
