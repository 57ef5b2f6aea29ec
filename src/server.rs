//! HTTP JSON API over a shared [`Workspace`]
//!
//! The browser-side renderer reads the live graph from here and reports its
//! node, edge and connection events back as deltas. Malformed bodies are
//! rejected by the extractors before any state is touched.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::editor::AttributeEdit;
use crate::export::Surface;
use crate::html_writer::HtmlWriter;
use crate::notice::Notice;
use crate::parser::TextFormat;
use crate::projection::GraphDocument;
use crate::reconciler::{
    ConnectionMetadata, EdgeChange, Message, NodeChange, Outcome, ReconcileError,
};
use crate::workspace::Workspace;

type AppState = Arc<Workspace>;

/// Failures surfaced as JSON `{ "error": ... }` bodies
#[derive(Debug)]
pub enum ApiError {
    Reconcile(ReconcileError),
    Internal(String),
}

impl From<ReconcileError> for ApiError {
    fn from(err: ReconcileError) -> Self {
        ApiError::Reconcile(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Reconcile(e @ ReconcileError::UnknownNode(_)) => {
                (StatusCode::NOT_FOUND, e.to_string())
            }
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TextBody {
    pub text: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RenderBody {
    /// Replaces the text surface before rendering
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub format: TextFormat,
}

#[derive(Debug, Deserialize)]
pub struct GenerateBody {
    pub prompt: String,
}

#[derive(Debug, Deserialize)]
pub struct AttributesBody {
    pub attributes: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConnectBody {
    pub source: String,
    pub target: String,
    #[serde(flatten)]
    pub metadata: ConnectionMetadata,
}

/// Build the API router
pub fn router(workspace: Arc<Workspace>) -> Router {
    Router::new()
        .route("/", get(diagram_page))
        .route("/export.html", get(export_page))
        .route("/api/graph", get(get_graph))
        .route("/api/text", get(get_text).put(put_text))
        .route("/api/document", get(get_document))
        .route("/api/render", post(render))
        .route("/api/generate", post(generate))
        .route("/api/nodes/{id}/attributes", post(edit_attributes))
        .route("/api/nodes/changes", post(node_changes))
        .route("/api/edges/changes", post(edge_changes))
        .route("/api/connect", post(connect))
        .layer(TraceLayer::new_for_http())
        .with_state(workspace)
}

/// Serve the API until the process is stopped
pub async fn serve(workspace: Arc<Workspace>, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    println!("erdsync server running at http://localhost:{port}");
    println!("Press Ctrl+C to stop");

    axum::serve(listener, router(workspace)).await?;

    Ok(())
}

fn notice_response(notice: Notice) -> Response {
    let status = if notice.is_error() {
        StatusCode::UNPROCESSABLE_ENTITY
    } else {
        StatusCode::OK
    };
    (status, Json(notice)).into_response()
}

async fn page(workspace: &Workspace, controls_visible: bool) -> Result<Html<String>, ApiError> {
    let mut surface = Surface::new(workspace.graph().await);
    surface.set_controls_visible(controls_visible);
    HtmlWriter::new()
        .render(&surface)
        .map(Html)
        .map_err(|e| ApiError::Internal(e.to_string()))
}

async fn diagram_page(State(ws): State<AppState>) -> Result<Html<String>, ApiError> {
    page(&ws, true).await
}

async fn export_page(State(ws): State<AppState>) -> Result<Html<String>, ApiError> {
    page(&ws, false).await
}

async fn get_graph(State(ws): State<AppState>) -> Json<GraphDocument> {
    Json(ws.graph().await)
}

async fn get_text(State(ws): State<AppState>) -> Json<TextBody> {
    Json(TextBody {
        text: ws.text().await,
    })
}

async fn put_text(State(ws): State<AppState>, Json(body): Json<TextBody>) -> StatusCode {
    ws.set_text(body.text).await;
    StatusCode::NO_CONTENT
}

/// Refresh the text surface from the graph and return it
async fn get_document(State(ws): State<AppState>) -> Result<Response, ApiError> {
    let text = ws
        .sync_text_from_graph()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(([(header::CONTENT_TYPE, "application/json")], text).into_response())
}

async fn render(State(ws): State<AppState>, Json(body): Json<RenderBody>) -> Response {
    if let Some(text) = body.text {
        ws.set_text(text).await;
    }
    notice_response(ws.render_as(body.format).await)
}

async fn generate(State(ws): State<AppState>, Json(body): Json<GenerateBody>) -> Response {
    match ws.generate(&body.prompt).await {
        Some(notice) => notice_response(notice),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn edit_attributes(
    State(ws): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<AttributesBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let edit = AttributeEdit {
        entity_id: id,
        new_attributes: body.attributes,
    };
    match ws.dispatch(Message::EditAttributes(edit)).await? {
        Outcome::AttributesEdited(changed) => Ok(Json(json!({ "changed": changed }))),
        other => Err(unexpected(other)),
    }
}

async fn connect(
    State(ws): State<AppState>,
    Json(body): Json<ConnectBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let message = Message::Connect {
        source: body.source,
        target: body.target,
        metadata: body.metadata,
    };
    match ws.dispatch(message).await? {
        Outcome::Connected(id) => Ok((StatusCode::CREATED, Json(json!({ "id": id })))),
        other => Err(unexpected(other)),
    }
}

async fn node_changes(
    State(ws): State<AppState>,
    Json(changes): Json<Vec<NodeChange>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    changes_applied(&ws, Message::NodesChanged(changes)).await
}

async fn edge_changes(
    State(ws): State<AppState>,
    Json(changes): Json<Vec<EdgeChange>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    changes_applied(&ws, Message::EdgesChanged(changes)).await
}

async fn changes_applied(
    ws: &Workspace,
    message: Message,
) -> Result<Json<serde_json::Value>, ApiError> {
    match ws.dispatch(message).await? {
        Outcome::ChangesApplied(applied) => Ok(Json(json!({ "applied": applied }))),
        other => Err(unexpected(other)),
    }
}

fn unexpected(outcome: Outcome) -> ApiError {
    ApiError::Internal(format!("unexpected outcome: {outcome:?}"))
}
