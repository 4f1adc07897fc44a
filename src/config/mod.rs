// src/config/mod.rs
pub mod app;
pub mod llm;

pub use app::DigestConfig;
pub use llm::LlmConfig;
