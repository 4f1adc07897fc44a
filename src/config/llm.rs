// src/config/llm.rs
use serde::{Deserialize, Serialize};
use std::env;

pub const ENV_API_KEY: &str = "DEEPSEEK_API_KEY";
pub const ENV_MODEL: &str = "DEEPSEEK_MODEL";

fn default_enabled() -> bool {
    true
}
fn default_provider() -> String {
    "deepseek".to_string()
}
fn default_model() -> String {
    "deepseek-chat".to_string()
}
fn default_base_url() -> String {
    "https://api.deepseek.com/chat/completions".to_string()
}
fn default_api_key() -> String {
    "ENV".to_string()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_timeout_secs() -> u64 {
    60
}

/// `[llm]` section of the digest config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// "deepseek" | "openai" (both speak the chat-completions protocol)
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// "ENV" means: read from DEEPSEEK_API_KEY
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            provider: default_provider(),
            model: default_model(),
            base_url: default_base_url(),
            api_key: default_api_key(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LlmConfig {
    /// Resolve "ENV" placeholders and env overrides. A missing key disables the
    /// model instead of failing: the digest then uses template content.
    pub fn resolve_env(mut self) -> Self {
        self.provider = self.provider.to_lowercase();

        if self.api_key.trim().eq_ignore_ascii_case("env") {
            self.api_key = env::var(ENV_API_KEY).unwrap_or_default();
        }
        if let Ok(model) = env::var(ENV_MODEL) {
            if !model.trim().is_empty() {
                self.model = model.trim().to_string();
            }
        }
        if self.api_key.trim().is_empty() {
            self.enabled = false;
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            self.temperature = default_temperature();
        }
        self
    }

    /// Safe for logs: never the key itself.
    pub fn describe(&self) -> String {
        format!(
            "provider={}, model={}, enabled={}, key_len={}",
            self.provider,
            self.model,
            self.enabled,
            self.api_key.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[serial_test::serial]
    #[test]
    fn env_key_and_model_override() {
        env::set_var(ENV_API_KEY, "sk-test-123");
        env::set_var(ENV_MODEL, "deepseek-reasoner");
        let cfg = LlmConfig::default().resolve_env();
        assert!(cfg.enabled);
        assert_eq!(cfg.api_key, "sk-test-123");
        assert_eq!(cfg.model, "deepseek-reasoner");
        assert!(!cfg.describe().contains("sk-test"));
        env::remove_var(ENV_API_KEY);
        env::remove_var(ENV_MODEL);
    }

    #[serial_test::serial]
    #[test]
    fn missing_key_disables() {
        env::remove_var(ENV_API_KEY);
        let cfg = LlmConfig::default().resolve_env();
        assert!(!cfg.enabled);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let cfg: LlmConfig = toml::from_str(r#"model = "m1"
temperature = 9.0"#)
        .unwrap();
        assert_eq!(cfg.model, "m1");
        assert_eq!(cfg.max_tokens, 4096);
        let cfg = LlmConfig {
            api_key: "k".into(),
            ..cfg
        }
        .resolve_env();
        assert!((cfg.temperature - 0.3).abs() < f32::EPSILON);
    }
}
