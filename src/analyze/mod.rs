// src/analyze/mod.rs
//! Language-model collaborators: translation and generated content.

pub mod generate;
pub mod llm;
pub mod translate;

pub use generate::{ancient_events, social_posts, social_sources, SocialPost};
pub use llm::{build_client_from_config, DynLlmClient, LlmClient};
pub use translate::{translate_entries, translate_news, TranslateOptions};
