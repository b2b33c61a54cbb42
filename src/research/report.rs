//! Final report assembly: outline, per-heading fill-in, media collation and
//! the persisted audit artifact.

use crate::llm::client::GenerationClient;
use crate::llm::{prompts, RetryPolicy};
use crate::research::engine::ensure_active;
use crate::research::progress::ProgressReporter;
use crate::research::tree::QueryTree;
use crate::types::{
    AppError, MediaBundle, PageRecord, ReportMetadata, ResearchReport, Result,
};
use chrono::Utc;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Collates per-node data into the final report object.
pub struct ReportAssembler<'a> {
    llm: &'a dyn GenerationClient,
    retry: &'a RetryPolicy,
    cancel: &'a CancellationToken,
}

impl<'a> ReportAssembler<'a> {
    /// Borrow the engine's collaborators for the assembly pass.
    pub fn new(
        llm: &'a dyn GenerationClient,
        retry: &'a RetryPolicy,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self { llm, retry, cancel }
    }

    /// Produce the report: outline, filled sections, deduplicated media and
    /// run metadata. Generation tokens spent here accumulate into
    /// `token_count`.
    pub async fn assemble(
        &self,
        topic: &str,
        tree: &QueryTree,
        ctx_manager: &[String],
        token_count: &mut u64,
        progress: &mut ProgressReporter,
    ) -> Result<ResearchReport> {
        let context = prompts::join_context(ctx_manager);

        ensure_active(self.cancel)?;
        let outline = self
            .retry
            .run("outline", || self.llm.outline(topic, &context))
            .await?;
        *token_count += outline.tokens;
        let title = outline.value.title;
        let headings = outline.value.headings;
        tracing::info!(%title, sections = headings.len(), "report outline generated");

        let heading_delta = (100 / (headings.len() + 1)).min(100) as u8;
        let mut content = format!("# {}\n", title);
        let mut outline_done: Vec<String> = vec![title.clone()];

        for heading in &headings {
            ensure_active(self.cancel)?;
            let filled = self
                .retry
                .run("fill_heading", || {
                    self.llm
                        .fill_heading(topic, &context, &outline_done, heading)
                })
                .await?;
            *token_count += filled.tokens;

            let body = strip_heading_echo(&filled.value, heading);
            content.push_str(&format!("\n\n## {}\n\n{}", heading, body));
            outline_done.push(heading.clone());

            progress
                .update(heading_delta, "Generating report...", tree.snapshot())
                .await;
        }

        let all_data = tree.all_data();
        let media = collect_media(&all_data);
        let metadata = ReportMetadata {
            total_queries: tree.total_descendants(),
            total_sources: all_data.len(),
            max_depth_reached: tree.max_depth(),
            total_tokens: *token_count,
        };

        Ok(ResearchReport {
            topic: topic.to_string(),
            timestamp: Utc::now(),
            content,
            media,
            research_tree: tree.snapshot(),
            metadata,
        })
    }
}

/// Flatten and deduplicate media across all retrieved records.
///
/// Sets drop ordering, so images/videos come back lexicographically sorted
/// and links ordered by (url, text) — deterministic for equal inputs, and
/// idempotent when re-applied.
pub fn collect_media(records: &[PageRecord]) -> MediaBundle {
    let images: BTreeSet<String> = records
        .iter()
        .flat_map(|r| r.images.iter().cloned())
        .collect();
    let videos: BTreeSet<String> = records
        .iter()
        .flat_map(|r| r.videos.iter().cloned())
        .collect();
    let links: BTreeSet<_> = records
        .iter()
        .flat_map(|r| r.links.iter().cloned())
        .collect();

    MediaBundle {
        images: images.into_iter().collect(),
        videos: videos.into_iter().collect(),
        links: links.into_iter().collect(),
    }
}

/// Drop a leading restatement of `heading` that the model echoed into the
/// section body, including any markdown heading markers around it.
pub fn strip_heading_echo<'t>(text: &'t str, heading: &str) -> &'t str {
    let trimmed = text.trim_start();
    let without_markers = trimmed.trim_start_matches('#').trim_start();
    if let Some(rest) = without_markers.strip_prefix(heading) {
        rest.trim_start()
    } else {
        text.trim()
    }
}

/// Write the report JSON under `dir` for audit; returns the artifact path.
pub async fn persist(report: &ResearchReport, dir: &Path) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| AppError::Internal(format!("creating artifact dir: {}", e)))?;

    let filename = format!(
        "research-{}.json",
        report.timestamp.format("%Y%m%dT%H%M%S%.3fZ")
    );
    let path = dir.join(filename);
    let json = serde_json::to_vec_pretty(report)
        .map_err(|e| AppError::Internal(format!("serializing report: {}", e)))?;
    tokio::fs::write(&path, json)
        .await
        .map_err(|e| AppError::Internal(format!("writing artifact: {}", e)))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PageLink;
    use rstest::rstest;

    fn record(images: &[&str], videos: &[&str], links: &[(&str, &str)]) -> PageRecord {
        PageRecord {
            url: "http://page".to_string(),
            text: "text".to_string(),
            images: images.iter().map(|s| s.to_string()).collect(),
            videos: videos.iter().map(|s| s.to_string()).collect(),
            links: links
                .iter()
                .map(|(url, text)| PageLink {
                    url: url.to_string(),
                    text: text.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn media_is_deduped_and_sorted() {
        let records = vec![
            record(&["b.png", "a.png"], &["v2.mp4"], &[("http://x", "x")]),
            record(&["a.png"], &["v1.mp4", "v2.mp4"], &[("http://x", "x"), ("http://x", "other")]),
        ];
        let media = collect_media(&records);

        assert_eq!(media.images, vec!["a.png", "b.png"]);
        assert_eq!(media.videos, vec!["v1.mp4", "v2.mp4"]);
        // Same url with different text is a different link (structural equality).
        assert_eq!(media.links.len(), 2);
    }

    #[test]
    fn media_dedup_is_idempotent() {
        let records = vec![record(
            &["a.png", "a.png", "b.png"],
            &["v.mp4"],
            &[("http://x", "x")],
        )];
        let once = collect_media(&records);

        let as_record = PageRecord {
            url: String::new(),
            text: String::new(),
            images: once.images.clone(),
            videos: once.videos.clone(),
            links: once.links.clone(),
        };
        let twice = collect_media(&[as_record]);
        assert_eq!(once, twice);
    }

    #[rstest]
    #[case("Overview\nThe body.", "The body.")]
    #[case("## Overview\n\nThe body.", "The body.")]
    #[case("  # Overview The body.", "The body.")]
    #[case("The body without echo.", "The body without echo.")]
    fn heading_echo_is_stripped(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(strip_heading_echo(input, "Overview"), expected);
    }

    #[tokio::test]
    async fn persist_writes_readable_json() {
        use crate::research::tree::QueryTree;

        let report = ResearchReport {
            topic: "t".to_string(),
            timestamp: Utc::now(),
            content: "# T".to_string(),
            media: MediaBundle::default(),
            research_tree: QueryTree::new().snapshot(),
            metadata: ReportMetadata {
                total_queries: 0,
                total_sources: 0,
                max_depth_reached: 0,
                total_tokens: 0,
            },
        };

        let dir = tempfile::tempdir().unwrap();
        let path = persist(&report, dir.path()).await.unwrap();
        assert!(path.exists());

        let raw = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["topic"], "t");
        assert!(value["research_tree"]["query"].is_string());
        assert_eq!(value["metadata"]["total_tokens"], 0);
    }
}
