//! Research session handlers: start (SSE status stream) and abort.

use crate::{
    research::{
        engine::{ResearchEngine, ResearchOutcome, ResearchParams},
        progress::{ProgressReporter, StatusEvent},
    },
    types::{
        AbortResearchRequest, AbortResearchResponse, AppError, Result, StartResearchRequest,
    },
    AppState,
};
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::{wrappers::ReceiverStream, StreamExt};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Buffered status events per session before emission backpressures.
const STATUS_CHANNEL_CAPACITY: usize = 32;

/// Start a research session and stream its status.
///
/// The response is a Server-Sent-Events stream of progress events carrying
/// the live research tree, terminated by a `complete`, `cancelled` or
/// `error` event. Dropping the stream cancels the session.
#[utoipa::path(
    post,
    path = "/api/research/start",
    request_body = StartResearchRequest,
    responses(
        (status = 200, description = "SSE status stream for the session"),
        (status = 400, description = "Invalid input")
    ),
    tag = "research"
)]
pub async fn start_research(
    State(state): State<AppState>,
    Json(payload): Json<StartResearchRequest>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, axum::Error>>>> {
    let topic = payload.topic.trim().to_string();
    if topic.is_empty() {
        return Err(AppError::InvalidInput("topic must not be empty".to_string()));
    }

    let session_id = payload
        .session_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let params = ResearchParams {
        topic,
        max_depth: payload.max_depth.unwrap_or(state.config.research.max_depth),
        num_sites_per_query: payload
            .num_sites_per_query
            .unwrap_or(state.config.research.num_sites_per_query),
        breadth_limit: state.config.research.breadth_limit,
    };
    tracing::info!(
        session = %session_id,
        topic = %params.topic,
        max_depth = params.max_depth,
        "research requested"
    );

    let cancel = CancellationToken::new();
    let retriever = state.scrapers.create();
    state
        .sessions
        .register(&session_id, cancel.clone(), retriever.clone())?;

    let engine = ResearchEngine::new(state.llm.clone(), retriever, params, cancel.clone())
        .with_artifact_dir(state.config.research.artifact_dir.clone());

    let (tx, rx) = mpsc::channel(STATUS_CHANNEL_CAPACITY);
    let sessions = state.sessions.clone();
    tokio::spawn(async move {
        let mut progress = ProgressReporter::new(tx, cancel);
        let terminal = match engine.conduct_research(&mut progress).await {
            Ok(ResearchOutcome::Complete(report)) => StatusEvent::Complete { report },
            Ok(ResearchOutcome::Cancelled) => StatusEvent::Cancelled,
            Err(e) => {
                tracing::error!(session = %session_id, error = %e, "research failed");
                StatusEvent::Error {
                    message: e.to_string(),
                }
            }
        };
        progress.finish(terminal).await;

        // Abort may already have torn the session down; otherwise release
        // the retrieval client here.
        if let Some(retriever) = sessions.remove(&session_id) {
            retriever.close().await;
        }
    });

    let stream = ReceiverStream::new(rx).map(|event| Event::default().json_data(&event));
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Cancel an in-flight research session.
#[utoipa::path(
    post,
    path = "/api/research/abort",
    request_body = AbortResearchRequest,
    responses(
        (status = 200, description = "Session cancelled", body = AbortResearchResponse),
        (status = 404, description = "Unknown session")
    ),
    tag = "research"
)]
pub async fn abort_research(
    State(state): State<AppState>,
    Json(payload): Json<AbortResearchRequest>,
) -> Result<Json<AbortResearchResponse>> {
    match state.sessions.abort(&payload.session_id) {
        Some(retriever) => {
            retriever.close().await;
            Ok(Json(AbortResearchResponse {
                status: "aborted".to_string(),
            }))
        }
        None => Err(AppError::NotFound(format!(
            "session {}",
            payload.session_id
        ))),
    }
}
