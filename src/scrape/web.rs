//! Web retrieval implementation: DuckDuckGo search via daedra, page fetch
//! over reqwest with a bounded concurrent fan-out, and HTML extraction with
//! the `scraper` crate.
//!
//! Failure policy: a failed search yields an empty batch, a failed page is
//! logged and omitted. Nothing here aborts a session.

use crate::scrape::client::{ContentRetriever, ScraperFactory};
use crate::types::{PageLink, PageRecord};
use async_trait::async_trait;
use futures::StreamExt;
use scraper::{Html, Selector};
use std::sync::Arc;
use std::time::Duration;

/// Upper bound on extracted text per page, to keep context growth sane.
const MAX_TEXT_LEN: usize = 20_000;

/// Pages fetched concurrently per query batch.
const FETCH_CONCURRENCY: usize = 4;

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Search-and-scrape client backed by DuckDuckGo + direct page fetches.
pub struct WebScraper {
    http: reqwest::Client,
}

impl WebScraper {
    /// Create a scraper with its own connection pool.
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self { http }
    }

    async fn search(&self, query: &str, num_results: usize) -> Vec<String> {
        let args = daedra::SearchArgs {
            query: query.to_string(),
            options: Some(daedra::SearchOptions {
                num_results,
                ..Default::default()
            }),
        };

        match daedra::tools::search::perform_search(&args).await {
            Ok(response) => response
                .data
                .iter()
                .map(|r| r.url.clone())
                .take(num_results)
                .collect(),
            Err(e) => {
                tracing::warn!(query, error = %e, "search failed");
                Vec::new()
            }
        }
    }

    async fn scrape_page(&self, url: String) -> Option<PageRecord> {
        let response = match self.http.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(%url, error = %e, "page fetch failed");
                return None;
            }
        };
        if !response.status().is_success() {
            tracing::warn!(%url, status = %response.status(), "page fetch rejected");
            return None;
        }
        let html = match response.text().await {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(%url, error = %e, "page body read failed");
                return None;
            }
        };

        let record = extract_page(&url, &html);
        if record.text.is_empty() {
            tracing::debug!(%url, "page had no extractable text");
            return None;
        }
        Some(record)
    }
}

impl Default for WebScraper {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentRetriever for WebScraper {
    async fn search_and_scrape(&self, query: &str, num_sites: usize) -> Vec<PageRecord> {
        tracing::info!(query, num_sites, "searching");
        let urls = self.search(query, num_sites).await;
        tracing::info!(query, found = urls.len(), "search results");

        let records: Vec<PageRecord> = futures::stream::iter(urls)
            .map(|url| self.scrape_page(url))
            .buffered(FETCH_CONCURRENCY)
            .filter_map(|r| async move { r })
            .collect()
            .await;

        tracing::info!(query, scraped = records.len(), "scraping complete");
        records
    }

    async fn close(&self) {
        // The reqwest pool is released on drop; nothing else to tear down.
        tracing::debug!("scraper closed");
    }
}

/// Default factory: one [`WebScraper`] per session.
pub struct WebScraperFactory;

impl ScraperFactory for WebScraperFactory {
    fn create(&self) -> Arc<dyn ContentRetriever> {
        Arc::new(WebScraper::new())
    }
}

/// Extract text, media and outbound links from raw HTML.
///
/// Kept synchronous and free of awaits: `scraper::Html` is not `Send`, so
/// the parsed document must never live across a suspension point.
fn extract_page(url: &str, html: &str) -> PageRecord {
    let document = Html::parse_document(html);
    let base = reqwest::Url::parse(url).ok();

    let resolve = |href: &str| -> Option<String> {
        if href.starts_with('#') || href.starts_with("javascript:") || href.is_empty() {
            return None;
        }
        match &base {
            Some(b) => b.join(href).ok().map(|u| u.to_string()),
            None => Some(href.to_string()),
        }
    };

    // Readable text: paragraph contents in document order.
    let p = Selector::parse("p").expect("static selector");
    let mut text = String::new();
    for node in document.select(&p) {
        let chunk: String = node.text().collect::<Vec<_>>().join(" ");
        let chunk = chunk.split_whitespace().collect::<Vec<_>>().join(" ");
        if chunk.is_empty() {
            continue;
        }
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(&chunk);
        if text.len() >= MAX_TEXT_LEN {
            text.truncate(MAX_TEXT_LEN);
            break;
        }
    }

    let img = Selector::parse("img[src]").expect("static selector");
    let images: Vec<String> = document
        .select(&img)
        .filter_map(|n| n.value().attr("src"))
        .filter_map(resolve)
        .collect();

    let video_src = Selector::parse("video[src], video source[src]").expect("static selector");
    let iframe = Selector::parse("iframe[src]").expect("static selector");
    let mut videos: Vec<String> = document
        .select(&video_src)
        .filter_map(|n| n.value().attr("src"))
        .filter_map(resolve)
        .collect();
    videos.extend(
        document
            .select(&iframe)
            .filter_map(|n| n.value().attr("src"))
            .filter(|src| src.contains("youtube.com") || src.contains("vimeo.com"))
            .filter_map(resolve),
    );

    let a = Selector::parse("a[href]").expect("static selector");
    let links: Vec<PageLink> = document
        .select(&a)
        .filter_map(|n| {
            let href = n.value().attr("href")?;
            let target = resolve(href)?;
            let anchor: String = n.text().collect::<Vec<_>>().join(" ");
            let anchor = anchor.split_whitespace().collect::<Vec<_>>().join(" ");
            if anchor.is_empty() {
                return None;
            }
            Some(PageLink {
                url: target,
                text: anchor,
            })
        })
        .collect();

    PageRecord {
        url: url.to_string(),
        text,
        images,
        videos,
        links,
    }
}
