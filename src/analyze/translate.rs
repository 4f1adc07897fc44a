// src/analyze/translate.rs
//! Batch translation of English feed entries and foreign news into Hebrew.

use std::time::Duration;

use metrics::counter;
use serde::Serialize;
use serde_json::Value;

use crate::analyze::llm::{extract_json_array, LlmClient};
use crate::ingest::is_probably_hebrew;
use crate::ingest::types::{NewsItem, OnThisDayFeed, Section};

pub const SOURCE_LANG: &str = "en";
pub const TARGET_LANG: &str = "he";
pub const EXTRACT_PROMPT_CHARS: usize = 300;
pub const NEWS_SUMMARY_PROMPT_CHARS: usize = 350;
const BATCH_ATTEMPTS: usize = 2;

const ENTRY_SYSTEM_PROMPT: &str = r#"You are a professional Hebrew translator specializing in historical content.
Translate each numbered line from English to Hebrew.
Lines marked "T" are titles. Lines marked "E" are descriptions.
Rules:
- Use formal newspaper Hebrew style
- Transliterate proper nouns to Hebrew (e.g., "Abraham Lincoln" → "אברהם לינקולן")
- Keep year numbers as-is
- Be concise but accurate
- Return ONLY a valid JSON array: [{"id": 0, "text": "Hebrew title translation", "extract": "Hebrew description translation or null if no E line"}, ...]"#;

const NEWS_SYSTEM_PROMPT: &str = r#"You are a professional Hebrew news translator.
Translate each item title and summary into natural Hebrew suitable for an Israeli news digest.
Return ONLY valid JSON in this exact format:
[{"id":0,"title":"...","summary":"..."}]
Rules:
- Keep factual meaning and tone
- Transliterate names to accepted Hebrew forms
- Keep numbers and dates accurate
- If summary is empty, return an empty string"#;

#[derive(Debug, Clone)]
pub struct TranslateOptions {
    pub batch_size: usize,
    pub max_tokens: u32,
    /// Pause between the two attempts of one batch.
    pub retry_delay: Duration,
}

impl Default for TranslateOptions {
    fn default() -> Self {
        Self {
            batch_size: 7,
            max_tokens: 4096,
            retry_delay: Duration::from_secs(2),
        }
    }
}

/// Cut to `max` chars, appending "..." when something was dropped.
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max).collect();
    out.push_str("...");
    out
}

fn entry_prompt(feed: &OnThisDayFeed, section: Section, batch: &[usize]) -> String {
    let items = feed.section(section);
    let mut lines = Vec::with_capacity(batch.len() * 2);
    for (i, &idx) in batch.iter().enumerate() {
        let it = &items[idx];
        lines.push(format!("{i}T. {}", it.text));
        if let Some(extract) = it.extract.as_deref().filter(|e| !e.is_empty()) {
            lines.push(format!("{i}E. {}", truncate_chars(extract, EXTRACT_PROMPT_CHARS)));
        }
    }
    format!(
        "Translate these {} historical entries to Hebrew:\n{}",
        batch.len(),
        lines.join("\n")
    )
}

fn reply_id(v: &Value) -> Option<usize> {
    v.get("id")?.as_u64().and_then(|n| usize::try_from(n).ok())
}

fn reply_str<'a>(v: &'a Value, key: &str) -> Option<&'a str> {
    v.get(key)?
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Translate one batch in place. Returns how many entries were updated, or
/// `None` if no attempt produced a usable array.
async fn translate_batch(
    client: &dyn LlmClient,
    feed: &mut OnThisDayFeed,
    section: Section,
    batch: &[usize],
    opts: &TranslateOptions,
) -> Option<usize> {
    let user = entry_prompt(feed, section, batch);

    for attempt in 0..BATCH_ATTEMPTS {
        let reply = client.complete(ENTRY_SYSTEM_PROMPT, &user, opts.max_tokens).await;
        if let Some(rows) = reply.as_deref().and_then(extract_json_array) {
            let items = feed.section_mut(section);
            let mut updated = 0;
            for row in &rows {
                let Some(local) = reply_id(row) else { continue };
                let Some(&idx) = batch.get(local) else { continue };
                let Some(text) = reply_str(row, "text") else { continue };
                let it = &mut items[idx];
                it.text = text.to_string();
                if it.extract.is_some() {
                    if let Some(extract) = reply_str(row, "extract") {
                        it.extract = Some(extract.to_string());
                    }
                }
                it.original_lang = Some(SOURCE_LANG.to_string());
                it.lang = TARGET_LANG.to_string();
                updated += 1;
            }
            tracing::debug!(
                target: "translate",
                section = section.key(),
                updated,
                batch = batch.len(),
                "batch translated"
            );
            counter!("translate_entries_total").increment(updated as u64);
            return Some(updated);
        }
        tracing::warn!(
            target: "translate",
            section = section.key(),
            attempt = attempt + 1,
            "unusable translation reply"
        );
        if attempt + 1 < BATCH_ATTEMPTS && !opts.retry_delay.is_zero() {
            tokio::time::sleep(opts.retry_delay).await;
        }
    }
    counter!("translate_batches_failed_total").increment(1);
    None
}

fn pending(feed: &OnThisDayFeed, section: Section) -> Vec<usize> {
    feed.section(section)
        .iter()
        .enumerate()
        .filter(|(_, it)| it.lang == SOURCE_LANG)
        .map(|(i, _)| i)
        .collect()
}

/// Translate every English entry of every section. One extra pass retries
/// whatever is still English after the first sweep. Returns the number of
/// entries that were English before translation started.
pub async fn translate_entries(
    client: &dyn LlmClient,
    feed: &mut OnThisDayFeed,
    opts: &TranslateOptions,
) -> usize {
    let batch_size = opts.batch_size.max(1);
    let mut total = 0;

    for section in Section::ALL {
        let todo = pending(feed, section);
        if todo.is_empty() {
            continue;
        }
        total += todo.len();
        tracing::info!(target: "translate", section = section.key(), count = todo.len(), "translating english entries");
        for batch in todo.chunks(batch_size) {
            translate_batch(client, feed, section, batch, opts).await;
        }
    }

    if !client.is_enabled() {
        return total;
    }

    let left: usize = Section::ALL.iter().map(|s| pending(feed, *s).len()).sum();
    if left > 0 {
        tracing::info!(target: "translate", left, "retrying untranslated entries");
        for section in Section::ALL {
            let todo = pending(feed, section);
            if todo.is_empty() {
                continue;
            }
            translate_batch(client, feed, section, &todo, opts).await;
        }
    }
    total
}

#[derive(Serialize)]
struct NewsLine<'a> {
    id: usize,
    title: &'a str,
    summary: String,
}

/// Translate news items that are not already Hebrew. Returns how many were updated.
pub async fn translate_news(client: &dyn LlmClient, news: &mut [NewsItem], max_tokens: u32) -> usize {
    let candidates: Vec<usize> = news
        .iter()
        .enumerate()
        .filter(|(_, n)| !is_probably_hebrew(&format!("{} {}", n.title, n.summary)))
        .map(|(i, _)| i)
        .collect();

    if candidates.is_empty() {
        tracing::debug!(target: "translate", "all news already hebrew");
        return 0;
    }
    if !client.is_enabled() {
        tracing::info!(target: "translate", skipped = candidates.len(), "news translation skipped, no language model");
        return 0;
    }

    let lines: Vec<NewsLine<'_>> = candidates
        .iter()
        .map(|&i| NewsLine {
            id: i,
            title: &news[i].title,
            summary: truncate_chars(&news[i].summary, NEWS_SUMMARY_PROMPT_CHARS),
        })
        .collect();
    let payload = match serde_json::to_string(&lines) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(target: "translate", error = %e, "could not encode news lines");
            return 0;
        }
    };
    let user = format!("Translate these news items to Hebrew:\n{payload}");

    let Some(rows) = client
        .complete(NEWS_SYSTEM_PROMPT, &user, max_tokens)
        .await
        .as_deref()
        .and_then(extract_json_array)
    else {
        tracing::warn!(target: "translate", "news translation reply unusable");
        return 0;
    };

    let mut updated = 0;
    for row in &rows {
        let Some(idx) = reply_id(row) else { continue };
        let Some(target) = news.get_mut(idx) else { continue };
        let title = reply_str(row, "title").map(str::to_string).unwrap_or_else(|| target.title.clone());
        let summary = reply_str(row, "summary")
            .map(str::to_string)
            .unwrap_or_else(|| target.summary.clone());
        target.original_title = Some(std::mem::replace(&mut target.title, title.clone()));
        target.original_summary = Some(std::mem::replace(&mut target.summary, summary.clone()));
        target.translated_title = Some(title);
        target.translated_summary = Some(summary);
        target.lang = Some(TARGET_LANG.to_string());
        updated += 1;
    }
    tracing::info!(target: "translate", updated, candidates = candidates.len(), "news translated");
    updated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::llm::{DisabledClient, MockClient};
    use crate::ingest::types::Item;

    fn opts() -> TranslateOptions {
        TranslateOptions {
            batch_size: 2,
            retry_delay: Duration::ZERO,
            ..TranslateOptions::default()
        }
    }

    fn en(year: i32, text: &str) -> Item {
        Item::new(year, text, "en")
    }

    #[test]
    fn truncation_appends_ellipsis() {
        assert_eq!(truncate_chars("abc", 3), "abc");
        assert_eq!(truncate_chars("abcdef", 3), "abc...");
        assert_eq!(truncate_chars("אבגד", 2), "אב...");
    }

    #[test]
    fn prompt_has_title_and_extract_lines() {
        let mut it = en(1969, "Moon landing");
        it.extract = Some("x".repeat(400));
        let feed = OnThisDayFeed {
            events: vec![Item::new(1948, "הכרזה", "he"), it],
            ..OnThisDayFeed::default()
        };
        let p = entry_prompt(&feed, Section::Events, &[1]);
        assert!(p.starts_with("Translate these 1 historical entries"));
        assert!(p.contains("0T. Moon landing"));
        let e_line = p.lines().find(|l| l.starts_with("0E. ")).unwrap();
        assert_eq!(e_line.chars().count(), 4 + 300 + 3);
    }

    #[tokio::test]
    async fn batches_apply_by_local_id() {
        let mock = MockClient::scripted([
            Some(r#"[{"id":0,"text":"א"},{"id":1,"text":"ב"}]"#),
            Some(r#"```json
[{"id":0,"text":"ג","extract":"ignored"}]
```"#),
        ]);
        let mut feed = OnThisDayFeed {
            events: vec![en(1, "a"), Item::new(2, "עברית", "he"), en(3, "b"), en(4, "c")],
            ..OnThisDayFeed::default()
        };
        let total = translate_entries(&mock, &mut feed, &opts()).await;
        assert_eq!(total, 3);
        let texts: Vec<_> = feed.events.iter().map(|i| i.text.as_str()).collect();
        assert_eq!(texts, vec!["א", "עברית", "ב", "ג"]);
        assert!(feed.events.iter().all(|i| i.lang == "he"));
        assert_eq!(feed.events[0].original_lang.as_deref(), Some("en"));
        assert_eq!(feed.events[1].original_lang, None);
        // no extract on the source item, so none is invented
        assert_eq!(feed.events[3].extract, None);
        assert_eq!(mock.prompts().len(), 2);
    }

    #[tokio::test]
    async fn failed_batch_is_retried_then_swept_again() {
        // attempt 1 garbage, attempt 2 garbage, sweep succeeds
        let mock = MockClient::scripted([
            Some("sorry"),
            None,
            Some(r#"[{"id":0,"text":"תורגם"}]"#),
        ]);
        let mut feed = OnThisDayFeed {
            births: vec![en(1900, "Someone born")],
            ..OnThisDayFeed::default()
        };
        translate_entries(&mock, &mut feed, &opts()).await;
        assert_eq!(feed.births[0].text, "תורגם");
        assert_eq!(mock.prompts().len(), 3);
    }

    #[tokio::test]
    async fn disabled_client_leaves_entries_english() {
        let mut feed = OnThisDayFeed {
            deaths: vec![en(1900, "x")],
            ..OnThisDayFeed::default()
        };
        assert_eq!(translate_entries(&DisabledClient, &mut feed, &opts()).await, 1);
        assert_eq!(feed.deaths[0].lang, "en");
    }

    #[tokio::test]
    async fn news_only_translates_foreign_items() {
        let mut news = vec![
            NewsItem {
                title: "הכנסת התכנסה".into(),
                ..NewsItem::default()
            },
            NewsItem {
                title: "Markets rally".into(),
                summary: "Stocks up".into(),
                ..NewsItem::default()
            },
        ];
        let mock = MockClient::fixed(r#"[{"id":1,"title":"השווקים מזנקים","summary":""}]"#);
        assert_eq!(translate_news(&mock, &mut news, 4096).await, 1);
        assert_eq!(news[0].lang, None);
        let n = &news[1];
        assert_eq!(n.title, "השווקים מזנקים");
        assert_eq!(n.summary, "Stocks up", "empty summary keeps the original");
        assert_eq!(n.original_title.as_deref(), Some("Markets rally"));
        assert_eq!(n.lang.as_deref(), Some("he"));
        let (_, user) = &mock.prompts()[0];
        assert!(user.contains("\"id\":1"));
        assert!(!user.contains("הכנסת"));
    }
}
