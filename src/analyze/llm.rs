//! Language-model adapter: provider abstraction for translation and generated content.
//! A failed or disabled call yields `None`; callers fall back instead of erroring.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::llm::LlmConfig;

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

/// Trait object used by translation and generation.
pub trait LlmClient: Send + Sync {
    /// Send one system + user prompt pair; returns the reply text.
    fn complete<'a>(
        &'a self,
        system: &'a str,
        user: &'a str,
        max_tokens: u32,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
    /// False when no model is configured; callers then use template content.
    fn is_enabled(&self) -> bool {
        true
    }
}

pub type DynLlmClient = Arc<dyn LlmClient>;

/// Factory: build a client according to config and environment variables.
///
/// * If `AI_TEST_MODE=mock`, returns a mock that always answers `[]`.
/// * Else if `config.enabled==false`, returns a disabled client.
/// * Else builds the chat-completions provider.
pub fn build_client_from_config(config: &LlmConfig) -> DynLlmClient {
    if std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Arc::new(MockClient::fixed("[]"));
    }

    if !config.enabled {
        return Arc::new(DisabledClient);
    }

    match ChatProvider::new(config) {
        Ok(p) => Arc::new(p),
        Err(e) => {
            tracing::warn!(target: "llm", error = ?e, "could not build llm client, disabling");
            Arc::new(DisabledClient)
        }
    }
}

// ------------------------------------------------------------
// Concrete clients
// ------------------------------------------------------------

/// Chat Completions provider (DeepSeek and OpenAI share the protocol).
pub struct ChatProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
    name: &'static str,
}

impl ChatProvider {
    pub fn new(cfg: &LlmConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(crate::ingest::http::USER_AGENT)
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        let name = match cfg.provider.as_str() {
            "openai" => "openai",
            _ => "deepseek",
        };
        Ok(Self {
            http,
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            base_url: cfg.base_url.clone(),
            temperature: cfg.temperature,
            name,
        })
    }

    async fn complete_impl(&self, system: &str, user: &str, max_tokens: u32) -> Option<String> {
        if self.api_key.is_empty() {
            return None;
        }

        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
        }
        #[derive(Deserialize)]
        struct Resp {
            #[serde(default)]
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            #[serde(default)]
            content: Option<String>,
        }

        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: system,
                },
                Msg {
                    role: "user",
                    content: user,
                },
            ],
            temperature: self.temperature,
            max_tokens,
        };

        let resp = match self
            .http
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(target: "llm", error = %e, "llm request failed");
                counter!("llm_calls_total", "outcome" => "error").increment(1);
                return None;
            }
        };

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            tracing::warn!(target: "llm", status = status.as_u16(), body = %snippet, "llm http error");
            counter!("llm_calls_total", "outcome" => "error").increment(1);
            return None;
        }

        let body: Resp = match resp.json().await {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(target: "llm", error = %e, "llm returned invalid json");
                counter!("llm_calls_total", "outcome" => "error").increment(1);
                return None;
            }
        };
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        if content.is_none() {
            tracing::warn!(target: "llm", "llm returned empty content");
            counter!("llm_calls_total", "outcome" => "empty").increment(1);
        } else {
            counter!("llm_calls_total", "outcome" => "ok").increment(1);
        }
        content
    }
}

impl LlmClient for ChatProvider {
    fn complete<'a>(
        &'a self,
        system: &'a str,
        user: &'a str,
        max_tokens: u32,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        Box::pin(self.complete_impl(system, user, max_tokens))
    }
    fn provider_name(&self) -> &'static str {
        self.name
    }
}

/// Returns `None` always; used when no model is configured.
pub struct DisabledClient;

impl LlmClient for DisabledClient {
    fn complete<'a>(
        &'a self,
        _system: &'a str,
        _user: &'a str,
        _max_tokens: u32,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        Box::pin(async { None })
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
    fn is_enabled(&self) -> bool {
        false
    }
}

/// Scripted client for tests/local runs: pops queued replies, then repeats `fallback`.
/// Every prompt pair is recorded.
#[derive(Default)]
pub struct MockClient {
    replies: Mutex<VecDeque<Option<String>>>,
    fallback: Option<String>,
    prompts: Mutex<Vec<(String, String)>>,
}

impl MockClient {
    pub fn fixed(reply: &str) -> Self {
        Self {
            fallback: Some(reply.to_string()),
            ..Self::default()
        }
    }

    pub fn scripted<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| r.map(Into::into)).collect()),
            ..Self::default()
        }
    }

    /// Recorded (system, user) prompts, in call order.
    pub fn prompts(&self) -> Vec<(String, String)> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl LlmClient for MockClient {
    fn complete<'a>(
        &'a self,
        system: &'a str,
        user: &'a str,
        _max_tokens: u32,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        if let Ok(mut p) = self.prompts.lock() {
            p.push((system.to_string(), user.to_string()));
        }
        let next = self
            .replies
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .unwrap_or_else(|| self.fallback.clone());
        Box::pin(async move { next })
    }
    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

// ------------------------------------------------------------
// Reply parsing
// ------------------------------------------------------------

/// Pull JSON out of a model reply: fenced ```json block, bare JSON, or the
/// first array/object embedded in prose.
pub fn extract_json(text: &str) -> Option<Value> {
    static RE_FENCE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)```").expect("fence regex"));
    static RE_ARRAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\[.*\]").expect("array regex"));
    static RE_OBJECT: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?s)\{.*\}").expect("object regex"));

    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let candidate = RE_FENCE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .unwrap_or(text);

    if let Ok(v) = serde_json::from_str(candidate) {
        return Some(v);
    }
    let embedded = RE_ARRAY
        .find(candidate)
        .or_else(|| RE_OBJECT.find(candidate))?;
    serde_json::from_str(embedded.as_str()).ok()
}

/// Like [`extract_json`] but only accepts a top-level array.
pub fn extract_json_array(text: &str) -> Option<Vec<Value>> {
    match extract_json(text)? {
        Value::Array(items) => Some(items),
        _ => None,
    }
}
