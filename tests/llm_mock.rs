// tests/llm_mock.rs
// Client factory and translation through the scripted mock.

use onthisday_digest::analyze::llm::{build_client_from_config, MockClient};
use onthisday_digest::analyze::translate::{translate_entries, TranslateOptions};
use onthisday_digest::config::LlmConfig;
use onthisday_digest::ingest::types::{Item, OnThisDayFeed};
use serial_test::serial;
use std::time::Duration;

#[test]
#[serial]
fn ai_test_mode_builds_mock() {
    std::env::set_var("AI_TEST_MODE", "mock");
    let client = build_client_from_config(&LlmConfig::default());
    assert_eq!(client.provider_name(), "mock");
    assert!(client.is_enabled());
    std::env::remove_var("AI_TEST_MODE");
}

#[test]
#[serial]
fn configured_key_builds_chat_provider() {
    std::env::remove_var("AI_TEST_MODE");
    let cfg = LlmConfig {
        api_key: "sk-local".into(),
        ..LlmConfig::default()
    };
    assert_eq!(build_client_from_config(&cfg).provider_name(), "deepseek");

    let off = LlmConfig {
        enabled: false,
        ..cfg
    };
    assert_eq!(build_client_from_config(&off).provider_name(), "disabled");
}

#[tokio::test]
async fn mock_translation_sets_language_fields_and_extracts() {
    let mut with_extract = Item::new(1969, "Apollo 11 lands on the Moon", "en");
    with_extract.extract = Some("A long description".into());
    let mut feed = OnThisDayFeed {
        events: vec![with_extract],
        selected: vec![Item::new(1815, "Battle of Waterloo", "en")],
        ..OnThisDayFeed::default()
    };
    let mock = MockClient::scripted([
        Some(r#"[{"id":0,"text":"אפולו 11 נוחתת על הירח","extract":"תיאור ארוך"}]"#),
        Some(r#"Here: [{"id":0,"text":"קרב ווטרלו"}]"#),
    ]);
    let opts = TranslateOptions {
        retry_delay: Duration::ZERO,
        ..TranslateOptions::default()
    };
    let total = translate_entries(&mock, &mut feed, &opts).await;
    assert_eq!(total, 2);

    let moon = &feed.events[0];
    assert_eq!(moon.text, "אפולו 11 נוחתת על הירח");
    assert_eq!(moon.extract.as_deref(), Some("תיאור ארוך"));
    assert!(moon.is_translated());
    assert_eq!(feed.selected[0].text, "קרב ווטרלו");

    let prompts = mock.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].1.contains("0E. A long description"));
}
