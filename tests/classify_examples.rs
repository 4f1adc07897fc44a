// tests/classify_examples.rs
// Classifier behavior against the shipped keyword tables.

use onthisday_digest::classify::{Category, Classifier};
use onthisday_digest::ingest::types::Item;

fn clf() -> Classifier {
    Classifier::builtin().expect("builtin classifier tables load")
}

#[test]
fn legislature_and_capital_are_protected() {
    let c = clf().classify(
        "The Knesset approved a new budget bill in Jerusalem",
        "Israeli politics",
    );
    assert_eq!(c.category, Category::Israel);
    assert!(c.diagnostics.strong_hits > 0);
    assert!(c.diagnostics.verified);
    assert!(c.diagnostics.blacklist_hits.is_empty());
}

#[test]
fn diaspora_community_is_general() {
    let c = clf().classify("The American Jewish community in New York opened a museum", "");
    assert_eq!(c.category, Category::General);
    assert!(!c.diagnostics.blacklist_hits.is_empty());
    assert!(c.diagnostics.blacklist_hits[0].starts_with("blacklist:"));
    assert!(!c.diagnostics.verified);
}

#[test]
fn blacklist_beats_strong_signal() {
    let c = clf().classify(
        "Israeli delegation joined an American Jewish community in New York event",
        "",
    );
    assert!(c.diagnostics.strong_hits > 0, "strong signal is present");
    assert_eq!(c.category, Category::General);
    assert!(!c.diagnostics.blacklist_hits.is_empty());
}

#[test]
fn immigration_to_israel_stays_protected() {
    for text in [
        "Operation Solomon airlifts Ethiopian Jews to Israel",
        "Operation Magic Carpet brings Yemenite Jews to Israel",
        "Iraqi Jews airlifted to Israel in Operation Ezra and Nehemiah",
        "Soviet Jews from Moscow immigrate to Israel",
    ] {
        let c = clf().classify(text, "");
        assert_eq!(c.category, Category::Israel, "{text}");
        assert!(c.diagnostics.blacklist_hits.is_empty(), "{text}");
    }

    let c = clf().classify("מבצע משה: יהודי אתיופיה עלו לישראל", "");
    assert_eq!(c.category, Category::Israel);
    assert!(c.diagnostics.blacklist_hits.is_empty());
}

#[test]
fn national_qualifier_needs_a_foreign_place() {
    let c = clf().classify("Soviet Jews in Moscow protested for emigration rights", "");
    assert_eq!(c.category, Category::General);
    assert!(c.diagnostics.blacklist_hits[0].contains("national_qualifier_jewish"));

    let c = clf().classify("יהודי צרפת הפגינו בפריז", "");
    assert_eq!(c.category, Category::General);
    assert!(!c.diagnostics.blacklist_hits.is_empty());
}

#[test]
fn weak_only_protected_text_is_general() {
    let c = clf().classify("A Hebrew grammar was printed", "");
    assert_eq!(c.diagnostics.strong_hits, 0);
    assert!(c.diagnostics.weak_hits > 0);
    assert_eq!(c.category, Category::General);
}

#[test]
fn space_terms_go_to_science_never_protected() {
    let c = clf().classify("NASA launched a satellite aboard a new spacecraft", "");
    assert_eq!(c.category, Category::Science);
    assert!(!c.diagnostics.verified);
}

#[test]
fn hebrew_text_classifies_too() {
    let c = clf().classify("הכנסת אישרה את חוק השבות בירושלים", "חוק השבות");
    assert_eq!(c.category, Category::Israel);

    let c = clf().classify("נפתחה קהילה יהודית חדשה בניו יורק", "");
    assert_eq!(c.category, Category::General);
    assert!(!c.diagnostics.blacklist_hits.is_empty());
}

#[test]
fn extract_does_not_take_part() {
    let mut it = Item::new(1901, "A ship sailed", "en");
    it.extract = Some("Jerusalem Knesset Tel Aviv Israel".into());
    assert_eq!(clf().classify_item(&it).category, Category::General);
}

#[test]
fn result_is_always_in_the_closed_set() {
    let c = clf();
    for text in ["", "   ", "1234", "!!!", "שלום", "Lorem ipsum dolor sit amet"] {
        let got = c.classify(text, "").category;
        assert!(Category::ALL.contains(&got), "{text:?} -> {got:?}");
    }
}

#[test]
fn classify_all_counts_every_item() {
    let c = clf();
    let mut items = vec![
        Item::new(1950, "The Knesset met in Jerusalem", "en"),
        Item::new(1969, "Apollo astronauts on a NASA spacecraft", "en"),
        Item::new(1900, "Nothing in particular", "en"),
    ];
    let counts = c.classify_all(&mut items);
    assert_eq!(counts.values().sum::<usize>(), 3);
    assert_eq!(items[0].category, Category::Israel);
    assert_eq!(items[1].category, Category::Science);
    assert_eq!(items[2].category, Category::General);
}
