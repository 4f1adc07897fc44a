// src/analyze/generate.rs
//! Generated content: "historical figures on social media" posts and ancient events.

use std::collections::HashSet;

use metrics::counter;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::analyze::llm::{extract_json_array, LlmClient};
use crate::classify::Category;
use crate::ingest::types::Item;

pub const MAX_SOCIAL_SOURCES: usize = 10;
pub const POST_CONTENT_CHARS: usize = 200;
pub const ANCIENT_MAX_TOKENS: u32 = 2048;

const PLATFORMS: [&str; 3] = ["twitter", "facebook", "instagram"];
const TEMPLATE_AUTHOR: &str = "היום בהיסטוריה";
const TEMPLATE_HANDLE: &str = "@OnThisDayIL";

const SOCIAL_SYSTEM_PROMPT: &str = "You are a creative Hebrew social media content writer for a historical newspaper.
Create engaging social media posts as if historical figures were posting on modern platforms.
Each post MUST be tied to a specific event year from the list.
All content MUST be in Hebrew.
Return ONLY a valid JSON array.";

const ANCIENT_SYSTEM_PROMPT: &str = "אתה היסטוריון מומחה בהיסטוריה עתיקה, תנ\"כית ויהודית.
צור אירועים היסטוריים שהתרחשו או מיוחסים מסורתית לתאריך הנתון.
הכל חייב להיות בעברית. החזר רק מערך JSON תקין.";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SocialPost {
    pub author: String,
    pub handle: String,
    pub platform: String,
    pub content: String,
    pub year: i32,
    pub event_year: i32,
    pub likes: u32,
    pub retweets: u32,
    pub replies: u32,
}

/// Up to 10 source entries, one per year: protected events (3), selected (2),
/// top events (4), protected births (2), top births (2).
pub fn social_sources<'a>(
    events: &'a [Item],
    selected: &'a [Item],
    births: &'a [Item],
    protected: Category,
) -> Vec<&'a Item> {
    let candidates = events
        .iter()
        .filter(|e| e.category == protected)
        .take(3)
        .chain(selected.iter().take(2))
        .chain(events.iter().take(4))
        .chain(births.iter().filter(|e| e.category == protected).take(2))
        .chain(births.iter().take(2));

    let mut seen = HashSet::new();
    candidates
        .filter(|e| seen.insert(e.year))
        .take(MAX_SOCIAL_SOURCES)
        .collect()
}

fn social_user_prompt(sources: &[&Item], count: usize) -> String {
    let events_text = sources
        .iter()
        .map(|e| format!("{}: {}", e.year, e.text))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        r#"Based on these historical events that happened on this day:

{events_text}

Create exactly {count} social media posts. Each post should be from the perspective of a relevant historical figure.
Prefer Israeli/Jewish historical figures when relevant.
Return a JSON array with objects:
{{
    "author": "name in Hebrew",
    "handle": "@HandleInEnglish",
    "platform": "twitter" or "facebook" or "instagram",
    "content": "post content in Hebrew, max 200 chars, with relevant hashtags",
    "year": the exact year number from the event this post references,
    "eventYear": same year number (used to link to the event),
    "likes": random number between 500-15000,
    "retweets": random number between 100-5000,
    "replies": random number between 50-2000
}}

Make them creative, witty, and historically accurate. ALL content MUST be in Hebrew."#
    )
}

/// Lenient integer: JSON number or numeric string.
fn as_i64_lenient(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_post(v: &Value) -> Option<SocialPost> {
    let text = |k: &str| {
        v.get(k)
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default()
            .to_string()
    };
    let num = |k: &str| v.get(k).and_then(as_i64_lenient);
    let count = |k: &str| num(k).and_then(|n| u32::try_from(n).ok()).unwrap_or(0);

    let content = text("content");
    if content.is_empty() {
        return None;
    }
    let year = num("year").or_else(|| num("eventYear")).unwrap_or(0) as i32;
    let event_year = num("eventYear").map(|y| y as i32).unwrap_or(year);
    Some(SocialPost {
        author: text("author"),
        handle: text("handle"),
        platform: text("platform"),
        content,
        year,
        event_year,
        likes: count("likes"),
        retweets: count("retweets"),
        replies: count("replies"),
    })
}

/// Stable pseudo-random number in `[lo, hi]` keyed by `seed` and `salt`.
fn hashed_in_range(seed: &str, salt: &str, lo: u32, hi: u32) -> u32 {
    let mut h = Sha256::new();
    h.update(seed.as_bytes());
    h.update(salt.as_bytes());
    let d = h.finalize();
    let n = u32::from_be_bytes([d[0], d[1], d[2], d[3]]);
    lo + n % (hi - lo + 1)
}

fn hashtag(label: &str) -> String {
    format!("#{}", label.replace(' ', "_"))
}

/// Deterministic posts built from the source entries themselves.
pub fn template_posts(sources: &[&Item], count: usize) -> Vec<SocialPost> {
    sources
        .iter()
        .take(count)
        .enumerate()
        .map(|(i, e)| {
            let seed = format!("{}|{}", e.year, e.text);
            let body = crate::analyze::translate::truncate_chars(e.text.trim(), POST_CONTENT_CHARS);
            SocialPost {
                author: TEMPLATE_AUTHOR.to_string(),
                handle: TEMPLATE_HANDLE.to_string(),
                platform: PLATFORMS[i % PLATFORMS.len()].to_string(),
                content: format!(
                    "{}: {} #היום_בהיסטוריה {}",
                    e.year,
                    body,
                    hashtag(e.category.label())
                ),
                year: e.year,
                event_year: e.year,
                likes: hashed_in_range(&seed, "likes", 500, 15_000),
                retweets: hashed_in_range(&seed, "retweets", 100, 5_000),
                replies: hashed_in_range(&seed, "replies", 50, 2_000),
            }
        })
        .collect()
}

/// Posts from the language model, or template posts when none is configured.
/// A configured model that fails yields no posts.
pub async fn social_posts(
    client: &dyn LlmClient,
    sources: &[&Item],
    count: usize,
    max_tokens: u32,
) -> Vec<SocialPost> {
    if sources.is_empty() || count == 0 {
        return Vec::new();
    }
    if !client.is_enabled() {
        let posts = template_posts(sources, count);
        counter!("generate_social_posts_total", "kind" => "template").increment(posts.len() as u64);
        return posts;
    }

    let user = social_user_prompt(sources, count);
    let posts: Vec<SocialPost> = client
        .complete(SOCIAL_SYSTEM_PROMPT, &user, max_tokens)
        .await
        .as_deref()
        .and_then(extract_json_array)
        .map(|rows| rows.iter().filter_map(parse_post).take(count).collect())
        .unwrap_or_default();

    if posts.is_empty() {
        tracing::warn!(target: "generate", "no usable social posts from language model");
    } else {
        tracing::info!(target: "generate", count = posts.len(), "social posts generated");
    }
    counter!("generate_social_posts_total", "kind" => "llm").increment(posts.len() as u64);
    posts
}

fn ancient_user_prompt(month: u32, day: u32) -> String {
    format!(
        r#"צור 5-8 אירועים היסטוריים עתיקים עבור {day}/{month} (או תאריכים מסורתיים קרובים):

כלול מגוון תקופות:
- אירועים תנ"כיים (תורה, נביאים, כתובים) - למשל: יציאת מצרים, מתן תורה, חורבן בית המקדש
- תקופת בית ראשון ושני - מלכי ישראל, חשמונאים, הורדוס
- תקופת המשנה והתלמוד - תנאים, אמוראים
- אירועים מהעולם העתיק הקשורים לעם ישראל
- אירועים מימי הביניים - קהילות יהודיות, רמב"ם, גירוש ספרד

החזר מערך JSON:
[{{"year": -1000, "text": "תיאור קצר בעברית", "category": "israel"}}]

השתמש בשנים שליליות עבור לפנה"ס (למשל: -586 לחורבן בית ראשון).
ציין "(מסורת)" כשתאריך אינו מדויק היסטורית."#
    )
}

fn parse_ancient(v: &Value, default_category: Category, lang: &str) -> Option<Item> {
    let text = v.get("text").and_then(Value::as_str).map(str::trim)?;
    if text.is_empty() {
        return None;
    }
    let year = v.get("year").and_then(as_i64_lenient).unwrap_or(0) as i32;
    let category = v
        .get("category")
        .and_then(|c| serde_json::from_value::<Category>(c.clone()).ok())
        .unwrap_or(default_category);
    Some(Item {
        category,
        is_ancient: true,
        ..Item::new(year, text, lang)
    })
}

/// Ancient and traditional events for the given day, flagged `is_ancient`.
/// Empty when no model is configured.
pub async fn ancient_events(
    client: &dyn LlmClient,
    month: u32,
    day: u32,
    default_category: Category,
    lang: &str,
) -> Vec<Item> {
    if !client.is_enabled() {
        return Vec::new();
    }
    let user = ancient_user_prompt(month, day);
    let events: Vec<Item> = client
        .complete(ANCIENT_SYSTEM_PROMPT, &user, ANCIENT_MAX_TOKENS)
        .await
        .as_deref()
        .and_then(extract_json_array)
        .map(|rows| {
            rows.iter()
                .filter_map(|r| parse_ancient(r, default_category, lang))
                .collect()
        })
        .unwrap_or_default();
    tracing::info!(target: "generate", count = events.len(), "ancient events generated");
    counter!("generate_ancient_events_total").increment(events.len() as u64);
    events
}
