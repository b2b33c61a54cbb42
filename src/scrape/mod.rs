//! Content retrieval: web search plus page extraction.
//!
//! The engine depends only on the [`ContentRetriever`] contract; the default
//! implementation searches DuckDuckGo and scrapes result pages with a
//! bounded concurrent fan-out. Every session owns its retrieval client
//! exclusively, built through a [`ScraperFactory`].

/// Retrieval trait and per-session factory.
pub mod client;
/// DuckDuckGo + HTML-extraction implementation.
pub mod web;

pub use client::{ContentRetriever, ScraperFactory};
pub use web::{WebScraper, WebScraperFactory};
