// src/ingest/providers/mod.rs
pub mod hebcal;
pub mod rss;
pub mod wiki;
