//! The research orchestration engine: a session-scoped state machine that
//! owns the query tree and drives frontier traversal.
//!
//! ```text
//! Planning -> Exploring -> Summarizing -> Deciding -> {Exploring | Reporting}
//! Reporting -> Done
//! ```
//!
//! Cancellation is cooperative: the session token is checked before every
//! suspension point, and a set token unwinds the run into a `Cancelled`
//! outcome with no artifact written.
//!
//! Traversal order is LIFO: newly spawned children are pushed to the front
//! of the frontier (first synthesized child first), so the freshest branch
//! is explored before its siblings and the accumulated context stays
//! coherent with it. A branch decision of `false` advances the plan index;
//! when the plan is exhausted the run moves to report generation and any
//! still-queued nodes become unreachable.

use crate::llm::client::GenerationClient;
use crate::llm::{prompts, RetryPolicy};
use crate::research::progress::ProgressReporter;
use crate::research::report::ReportAssembler;
use crate::research::tree::{NodeId, QueryTree};
use crate::scrape::ContentRetriever;
use crate::types::{AppError, PageRecord, ResearchReport, Result};
use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Progress share charged per explored node.
const NODE_PROGRESS_DELTA: u8 = 5;

/// Pages per summarization batch.
const SUMMARY_BATCH: usize = 3;

/// Tunables for one research run.
#[derive(Debug, Clone)]
pub struct ResearchParams {
    /// The topic under research.
    pub topic: String,
    /// Depth bound: nodes at this depth never branch further.
    pub max_depth: usize,
    /// Pages requested from the retrieval client per query.
    pub num_sites_per_query: usize,
    /// Maximum child queries spawned per branch decision.
    pub breadth_limit: usize,
}

/// Terminal result of a research run.
#[derive(Debug)]
pub enum ResearchOutcome {
    /// The run finished and produced a report.
    Complete(Box<ResearchReport>),
    /// The run was cancelled; no artifact was written.
    Cancelled,
}

/// State-machine phases. `Cancelled` is not a phase: it is reachable from
/// every phase through the token check at the top of the loop.
enum Phase {
    /// Generate the research plan (first transition only).
    Planning,
    /// Pop or seed the next frontier node and retrieve its pages.
    Exploring,
    /// Distill the node's pages into the manager context.
    Summarizing(NodeId),
    /// Branch/continue decision for the node.
    Deciding(NodeId),
    /// Assemble the final report.
    Reporting,
}

/// Per-run mutable state.
struct RunState {
    tree: QueryTree,
    frontier: VecDeque<NodeId>,
    explored: HashSet<String>,
    plan: Vec<String>,
    idx_plan: usize,
    ctx_researcher: Vec<String>,
    ctx_manager: Vec<String>,
    token_count: u64,
}

impl RunState {
    fn new() -> Self {
        Self {
            tree: QueryTree::new(),
            frontier: VecDeque::new(),
            explored: HashSet::new(),
            plan: Vec::new(),
            idx_plan: 0,
            ctx_researcher: Vec::new(),
            ctx_manager: Vec::new(),
            token_count: 0,
        }
    }

    fn plan_done(&self) -> &[String] {
        &self.plan[..self.idx_plan.min(self.plan.len())]
    }

    fn current_step(&self) -> Option<&str> {
        self.plan.get(self.idx_plan).map(|s| s.as_str())
    }

    /// Queries on the path from the root to `id`, root sentinel excluded.
    fn past_queries(&self, id: NodeId) -> Vec<String> {
        let mut path = self.tree.path_to_root(id);
        if !path.is_empty() {
            path.remove(0);
        }
        path
    }
}

/// Session-scoped research orchestrator.
pub struct ResearchEngine {
    llm: Arc<dyn GenerationClient>,
    retriever: Arc<dyn ContentRetriever>,
    retry: RetryPolicy,
    params: ResearchParams,
    cancel: CancellationToken,
    artifact_dir: Option<PathBuf>,
}

impl ResearchEngine {
    /// Bind an engine to its collaborators and cancellation token.
    pub fn new(
        llm: Arc<dyn GenerationClient>,
        retriever: Arc<dyn ContentRetriever>,
        params: ResearchParams,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            llm,
            retriever,
            retry: RetryPolicy::default(),
            params,
            cancel,
            artifact_dir: None,
        }
    }

    /// Persist the report JSON under `dir` on successful completion.
    pub fn with_artifact_dir(mut self, dir: PathBuf) -> Self {
        self.artifact_dir = Some(dir);
        self
    }

    /// Override the retry policy (tests tighten it).
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Run the full research loop to a terminal outcome.
    ///
    /// Progress resets to 0 at entry. A fatal generation failure propagates
    /// as an error; cancellation produces `Ok(ResearchOutcome::Cancelled)`.
    pub async fn conduct_research(
        &self,
        progress: &mut ProgressReporter,
    ) -> Result<ResearchOutcome> {
        progress.reset();
        let mut state = RunState::new();
        tracing::info!(topic = %self.params.topic, "starting research");

        match self.run(&mut state, progress).await {
            Ok(report) => {
                tracing::info!(
                    topic = %self.params.topic,
                    queries = state.tree.total_descendants(),
                    max_depth = state.tree.max_depth(),
                    tokens = state.token_count,
                    "research complete"
                );
                Ok(ResearchOutcome::Complete(report))
            }
            Err(AppError::Cancelled) => {
                tracing::info!(topic = %self.params.topic, "research cancelled");
                Ok(ResearchOutcome::Cancelled)
            }
            Err(e) => Err(e),
        }
    }

    async fn run(
        &self,
        state: &mut RunState,
        progress: &mut ProgressReporter,
    ) -> Result<Box<ResearchReport>> {
        let mut phase = Phase::Planning;
        loop {
            ensure_active(&self.cancel)?;
            phase = match phase {
                Phase::Planning => self.plan(state, progress).await?,
                Phase::Exploring => self.explore(state, progress).await?,
                Phase::Summarizing(id) => self.summarize(state, id).await?,
                Phase::Deciding(id) => self.decide(state, id).await?,
                Phase::Reporting => {
                    return self.report(state, progress).await;
                }
            };
        }
    }

    async fn plan(&self, state: &mut RunState, progress: &mut ProgressReporter) -> Result<Phase> {
        let topic = self.params.topic.clone();
        let plan = self
            .retry
            .run("plan_steps", || self.llm.plan_steps(&topic))
            .await?;
        state.token_count += plan.tokens;
        tracing::info!(steps = plan.value.len(), "research plan generated");
        state.plan = plan.value;

        progress
            .update(NODE_PROGRESS_DELTA, "Starting research...", state.tree.snapshot())
            .await;
        Ok(Phase::Exploring)
    }

    async fn explore(
        &self,
        state: &mut RunState,
        progress: &mut ProgressReporter,
    ) -> Result<Phase> {
        let id = match state.frontier.pop_front() {
            Some(id) => id,
            None => {
                // Frontier drained: seed the current plan step, or finish.
                let Some(vertical) = state.current_step().map(|s| s.to_string()) else {
                    return Ok(Phase::Reporting);
                };
                return self.seed_step(state, &vertical).await;
            }
        };

        let query = state
            .tree
            .get(id)
            .ok_or_else(|| AppError::Invariant(format!("frontier id {:?} not in tree", id)))?
            .query
            .clone();
        tracing::info!(%query, "exploring");

        let data = self
            .retriever
            .search_and_scrape(&query, self.params.num_sites_per_query)
            .await;
        if !data.is_empty() {
            state.ctx_researcher.push(dump_records(&data));
        }
        state.tree.set_data(id, data)?;

        progress
            .update(
                NODE_PROGRESS_DELTA,
                &format!("Exploring: {}", query),
                state.tree.snapshot(),
            )
            .await;
        Ok(Phase::Summarizing(id))
    }

    /// Synthesize a fresh top-level query for the current plan step and
    /// queue it off the master node. A duplicate seed advances the plan
    /// index instead: the step has nothing new to contribute.
    async fn seed_step(&self, state: &mut RunState, vertical: &str) -> Result<Phase> {
        let context = prompts::join_context(&state.ctx_manager);
        let queries = self
            .retry
            .run("synthesize_queries", || {
                self.llm.synthesize_queries(
                    vertical,
                    &self.params.topic,
                    state.plan_done(),
                    &[],
                    &context,
                    1,
                )
            })
            .await?;
        state.token_count += queries.tokens;

        let seed = queries.value.into_iter().next().unwrap_or_default();
        let normalized = normalize_query(&seed);
        if normalized.is_empty() || state.explored.contains(&normalized) {
            tracing::info!(vertical, %seed, "seed query already explored, advancing plan");
            state.idx_plan += 1;
            return Ok(Phase::Exploring);
        }

        state.explored.insert(normalized);
        let root = state.tree.root();
        let id = state.tree.add_child(root, &seed)?;
        state.frontier.push_front(id);
        tracing::info!(vertical, %seed, "seeded plan step");
        Ok(Phase::Exploring)
    }

    async fn summarize(&self, state: &mut RunState, id: NodeId) -> Result<Phase> {
        let node = state
            .tree
            .get(id)
            .ok_or_else(|| AppError::Invariant(format!("summarize id {:?} not in tree", id)))?;
        if node.data.is_empty() {
            // Nothing retrieved: continuation short-circuits without a call.
            return Ok(Phase::Deciding(id));
        }

        let query = node.query.clone();
        let batches: Vec<String> = node
            .data
            .chunks(SUMMARY_BATCH)
            .map(dump_records)
            .collect();

        for batch in batches {
            ensure_active(&self.cancel)?;
            let summary = self
                .retry
                .run("summarize", || self.llm.summarize(&query, &batch))
                .await?;
            state.token_count += summary.tokens;
            if !summary.value.trim().is_empty() {
                state.ctx_manager.push(summary.value);
            }
        }
        Ok(Phase::Deciding(id))
    }

    async fn decide(&self, state: &mut RunState, id: NodeId) -> Result<Phase> {
        let node = state
            .tree
            .get(id)
            .ok_or_else(|| AppError::Invariant(format!("decide id {:?} not in tree", id)))?;
        let query = node.query.clone();
        let depth = node.depth;
        let has_data = !node.data.is_empty();

        // Depth at the bound or an empty retrieval both force `false`
        // without spending a generation call.
        let decision = if !has_data || depth >= self.params.max_depth {
            false
        } else {
            let past = state.past_queries(id);
            let context = prompts::join_context(&state.ctx_manager);
            let decided = self
                .retry
                .run("continue_branch", || {
                    self.llm
                        .continue_branch(state.plan_done(), &query, &past, &context)
                })
                .await?;
            state.token_count += decided.tokens;
            decided.value
        };
        tracing::info!(%query, decision, depth, "branch decision");

        if decision {
            return self.branch(state, id, &query).await;
        }

        state.idx_plan += 1;
        if state.idx_plan >= state.plan.len() {
            Ok(Phase::Reporting)
        } else {
            Ok(Phase::Exploring)
        }
    }

    /// Spawn child queries under `id` and push them to the front of the
    /// frontier, first query first. Duplicates (normalized) are skipped, so
    /// the tree keeps exactly one node per query text.
    async fn branch(&self, state: &mut RunState, id: NodeId, query: &str) -> Result<Phase> {
        let vertical = state.current_step().unwrap_or(query).to_string();
        let past = state.past_queries(id);
        let context = prompts::join_context(&state.ctx_manager);
        let queries = self
            .retry
            .run("synthesize_queries", || {
                self.llm.synthesize_queries(
                    &vertical,
                    &self.params.topic,
                    state.plan_done(),
                    &past,
                    &context,
                    self.params.breadth_limit,
                )
            })
            .await?;
        state.token_count += queries.tokens;

        // Children are attached in synthesis order (insertion order is
        // exploration order in the tree), then pushed to the frontier front
        // in reverse so the first child comes out first.
        let mut created = Vec::new();
        for child_query in &queries.value {
            let normalized = normalize_query(child_query);
            if normalized.is_empty() || state.explored.contains(&normalized) {
                tracing::debug!(query = %child_query, "duplicate child query skipped");
                continue;
            }
            state.explored.insert(normalized);
            created.push(state.tree.add_child(id, child_query)?);
        }
        let spawned = created.len();
        for child in created.into_iter().rev() {
            state.frontier.push_front(child);
        }
        tracing::info!(parent = query, spawned, "child queries enqueued");
        Ok(Phase::Exploring)
    }

    async fn report(
        &self,
        state: &mut RunState,
        progress: &mut ProgressReporter,
    ) -> Result<Box<ResearchReport>> {
        tracing::debug!(
            raw_dumps = state.ctx_researcher.len(),
            findings = state.ctx_manager.len(),
            "assembling report"
        );
        progress
            .set(70, "Generating report...", state.tree.snapshot())
            .await;

        let assembler = ReportAssembler::new(self.llm.as_ref(), &self.retry, &self.cancel);
        let report = assembler
            .assemble(
                &self.params.topic,
                &state.tree,
                &state.ctx_manager,
                &mut state.token_count,
                progress,
            )
            .await?;

        if let Some(dir) = &self.artifact_dir {
            let path = crate::research::report::persist(&report, dir).await?;
            tracing::info!(path = %path.display(), "report artifact written");
        }

        progress
            .set(100, "Research complete", state.tree.snapshot())
            .await;
        Ok(Box::new(report))
    }
}

/// Cancellation checkpoint, called before every suspension point.
pub(crate) fn ensure_active(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(AppError::Cancelled)
    } else {
        Ok(())
    }
}

/// Case-fold and collapse whitespace so trivially restated queries dedupe.
pub fn normalize_query(query: &str) -> String {
    query
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render retrieved records the way context prompts expect them:
/// `src [i] : url` followed by the page text, `---`-separated.
fn dump_records(records: &[PageRecord]) -> String {
    records
        .iter()
        .enumerate()
        .map(|(i, r)| format!("src [{}] : {}\n{}", i + 1, r.url, r.text))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::{Generated, MockGenerationClient, ReportOutline};
    use crate::research::progress::{ProgressReporter, StatusEvent};
    use crate::scrape::client::MockContentRetriever;
    use tokio::sync::mpsc;

    fn page(url: &str) -> PageRecord {
        PageRecord {
            url: url.to_string(),
            text: format!("text for {}", url),
            ..Default::default()
        }
    }

    fn params(max_depth: usize) -> ResearchParams {
        ResearchParams {
            topic: "test topic".to_string(),
            max_depth,
            num_sites_per_query: 2,
            breadth_limit: 2,
        }
    }

    fn outline() -> ReportOutline {
        ReportOutline {
            title: "Title".to_string(),
            headings: vec!["Overview".to_string()],
        }
    }

    /// Mock wired for a single-step plan that produces one report section.
    fn single_step_llm() -> MockGenerationClient {
        let mut llm = MockGenerationClient::new();
        llm.expect_plan_steps()
            .returning(|_| Ok(Generated::new(vec!["step one".to_string()], 10)));
        llm.expect_summarize()
            .returning(|_, _| Ok(Generated::new("a finding".to_string(), 5)));
        llm.expect_outline()
            .returning(|_, _| Ok(Generated::new(outline(), 8)));
        llm.expect_fill_heading()
            .returning(|_, _, _, _| Ok(Generated::new("section body".to_string(), 6)));
        llm
    }

    #[test]
    fn normalization_folds_case_and_whitespace() {
        assert_eq!(normalize_query("  Rust   ASYNC runtimes "), "rust async runtimes");
        assert_eq!(normalize_query("rust async runtimes"), "rust async runtimes");
        assert_eq!(normalize_query("   "), "");
    }

    #[test]
    fn dump_numbers_sources_from_one() {
        let dump = dump_records(&[page("http://a"), page("http://b")]);
        assert!(dump.starts_with("src [1] : http://a\n"));
        assert!(dump.contains("\n\n---\n\nsrc [2] : http://b\n"));
    }

    #[tokio::test]
    async fn max_depth_zero_explores_one_node_without_branching() {
        let mut llm = single_step_llm();
        llm.expect_synthesize_queries()
            .times(1) // the seed only; no child synthesis at depth bound
            .returning(|_, _, _, _, _, _| {
                Ok(Generated::new(vec!["seed query".to_string()], 4))
            });
        // Depth 1 >= max_depth 0: continuation must short-circuit.
        llm.expect_continue_branch().times(0);

        let mut retriever = MockContentRetriever::new();
        retriever
            .expect_search_and_scrape()
            .times(1)
            .returning(|_, _| vec![page("http://a")]);

        let engine = ResearchEngine::new(
            Arc::new(llm),
            Arc::new(retriever),
            params(0),
            CancellationToken::new(),
        );
        let (tx, _rx) = mpsc::channel(64);
        let mut progress = ProgressReporter::new(tx, CancellationToken::new());

        let outcome = engine.conduct_research(&mut progress).await.unwrap();
        let report = match outcome {
            ResearchOutcome::Complete(r) => r,
            other => panic!("unexpected outcome: {:?}", other),
        };
        assert_eq!(report.metadata.total_queries, 1);
        assert_eq!(report.metadata.max_depth_reached, 1);
        assert_eq!(report.research_tree.children.len(), 1);
        assert!(report.research_tree.children[0].children.is_empty());
    }

    #[tokio::test]
    async fn empty_retrieval_skips_decision_and_children() {
        let mut llm = single_step_llm();
        llm.expect_synthesize_queries()
            .times(1)
            .returning(|_, _, _, _, _, _| Ok(Generated::new(vec!["dry query".to_string()], 4)));
        llm.expect_continue_branch().times(0);

        let mut retriever = MockContentRetriever::new();
        retriever
            .expect_search_and_scrape()
            .times(1)
            .returning(|_, _| Vec::new());

        let engine = ResearchEngine::new(
            Arc::new(llm),
            Arc::new(retriever),
            params(2),
            CancellationToken::new(),
        );
        let (tx, _rx) = mpsc::channel(64);
        let mut progress = ProgressReporter::new(tx, CancellationToken::new());

        let outcome = engine.conduct_research(&mut progress).await.unwrap();
        let report = match outcome {
            ResearchOutcome::Complete(r) => r,
            other => panic!("unexpected outcome: {:?}", other),
        };
        assert!(report.research_tree.children[0].children.is_empty());
        assert_eq!(report.metadata.total_sources, 0);
    }

    #[tokio::test]
    async fn duplicate_child_queries_create_one_node() {
        let mut llm = single_step_llm();
        let mut seeded = false;
        llm.expect_synthesize_queries().returning(move |_, _, _, _, _, n| {
            if n == 1 && !seeded {
                seeded = true;
                Ok(Generated::new(vec!["root query".to_string()], 4))
            } else {
                // Children: one fresh, one restating the seed.
                Ok(Generated::new(
                    vec!["Root   QUERY".to_string(), "deeper angle".to_string()],
                    4,
                ))
            }
        });
        // Branch once at depth 1, then stop at the deeper node.
        let mut first = true;
        llm.expect_continue_branch().returning(move |_, _, _, _| {
            let decision = first;
            first = false;
            Ok(Generated::new(decision, 3))
        });

        let mut retriever = MockContentRetriever::new();
        retriever
            .expect_search_and_scrape()
            .returning(|q, _| vec![page(&format!("http://{}", q.len()))]);

        let engine = ResearchEngine::new(
            Arc::new(llm),
            Arc::new(retriever),
            params(3),
            CancellationToken::new(),
        );
        let (tx, _rx) = mpsc::channel(64);
        let mut progress = ProgressReporter::new(tx, CancellationToken::new());

        let outcome = engine.conduct_research(&mut progress).await.unwrap();
        let report = match outcome {
            ResearchOutcome::Complete(r) => r,
            other => panic!("unexpected outcome: {:?}", other),
        };
        // "Root   QUERY" normalizes to the already-seeded "root query":
        // only the fresh child was attached.
        let seed = &report.research_tree.children[0];
        assert_eq!(seed.children.len(), 1);
        assert_eq!(seed.children[0].query, "deeper angle");
        assert_eq!(report.metadata.total_queries, 2);
    }

    #[tokio::test]
    async fn cancel_before_first_suspension_yields_cancelled() {
        let mut llm = MockGenerationClient::new();
        llm.expect_plan_steps().times(0);
        let mut retriever = MockContentRetriever::new();
        retriever.expect_search_and_scrape().times(0);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let dir = tempfile::tempdir().unwrap();

        let engine = ResearchEngine::new(
            Arc::new(llm),
            Arc::new(retriever),
            params(1),
            cancel,
        )
        .with_artifact_dir(dir.path().to_path_buf());
        let (tx, _rx) = mpsc::channel(64);
        let mut progress = ProgressReporter::new(tx, CancellationToken::new());

        let outcome = engine.conduct_research(&mut progress).await.unwrap();
        assert!(matches!(outcome, ResearchOutcome::Cancelled));
        // No artifact was persisted.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn progress_events_are_monotonic_over_a_run() {
        let mut llm = single_step_llm();
        llm.expect_synthesize_queries()
            .returning(|_, _, _, _, _, _| Ok(Generated::new(vec!["q".to_string()], 4)));
        llm.expect_continue_branch()
            .returning(|_, _, _, _| Ok(Generated::new(false, 3)));

        let mut retriever = MockContentRetriever::new();
        retriever
            .expect_search_and_scrape()
            .returning(|_, _| vec![page("http://a")]);

        let engine = ResearchEngine::new(
            Arc::new(llm),
            Arc::new(retriever),
            params(2),
            CancellationToken::new(),
        );
        let (tx, mut rx) = mpsc::channel(64);
        let mut progress = ProgressReporter::new(tx, CancellationToken::new());

        engine.conduct_research(&mut progress).await.unwrap();

        let mut last = 0;
        while let Ok(event) = rx.try_recv() {
            if let StatusEvent::Progress { progress, .. } = event {
                assert!(progress >= last);
                assert!(progress <= 100);
                last = progress;
            }
        }
        assert_eq!(last, 100);
    }
}
