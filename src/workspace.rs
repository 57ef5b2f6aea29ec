//! One open diagram
//!
//! A [`Workspace`] holds the document text surface, the live graph and the
//! ingestion pipeline for a single document. Each method is one user action:
//! it runs to completion, converts any failure into a [`Notice`] and leaves
//! the graph untouched when it fails.
//!
//! The locks are held only for a synchronous mutation, never across the
//! generation request, so the diagram stays editable while a prompt is being
//! answered.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::ingest::{IngestError, IngestionPipeline};
use crate::model::DEFAULT_DOCUMENT_TEXT;
use crate::notice::{self, LogNotifier, Notice, Notifier};
use crate::parser::TextFormat;
use crate::projection::GraphDocument;
use crate::reconciler::{ApplyMode, Message, Outcome, ReconcileError, Reconciler};

pub struct Workspace {
    text: Mutex<String>,
    reconciler: Mutex<Reconciler>,
    pipeline: IngestionPipeline,
    notifier: Arc<dyn Notifier>,
}

impl Workspace {
    /// Seeded with the default document text and the initial diagram
    pub fn new(pipeline: IngestionPipeline) -> Self {
        Self::with_state(pipeline, DEFAULT_DOCUMENT_TEXT, Reconciler::with_initial_graph())
    }

    pub fn with_state(
        pipeline: IngestionPipeline,
        text: impl Into<String>,
        reconciler: Reconciler,
    ) -> Self {
        Self {
            text: Mutex::new(text.into()),
            reconciler: Mutex::new(reconciler),
            pipeline,
            notifier: Arc::new(LogNotifier),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Contents of the document text surface
    pub async fn text(&self) -> String {
        self.text.lock().await.clone()
    }

    /// Replace the text surface without rendering it
    pub async fn set_text(&self, text: impl Into<String>) {
        *self.text.lock().await = text.into();
    }

    /// Snapshot of the live graph
    pub async fn graph(&self) -> GraphDocument {
        self.reconciler.lock().await.graph().clone()
    }

    /// Whether a generation request is outstanding
    pub fn is_generating(&self) -> bool {
        self.pipeline.is_busy()
    }

    /// Render the text surface as JSON, replacing the diagram
    pub async fn render(&self) -> Notice {
        self.render_as(TextFormat::Json).await
    }

    /// Render the text surface in the given syntax, replacing the diagram
    pub async fn render_as(&self, format: TextFormat) -> Notice {
        let text = self.text().await;
        let result = self
            .reconciler
            .lock()
            .await
            .apply_text(&text, format, ApplyMode::ReplaceAll);

        let notice = match result {
            Ok(_) => Notice::success(notice::RENDER_OK),
            Err(e) => {
                tracing::warn!(error = %e, "render failed; diagram unchanged");
                Notice::error(notice::RENDER_FAILED)
            }
        };
        self.notify(notice)
    }

    /// Generate a diagram from a natural-language prompt.
    ///
    /// Returns `None` for a blank prompt, which is ignored.
    pub async fn generate(&self, prompt: &str) -> Option<Notice> {
        let notice = match self.pipeline.generate_from_prompt(prompt).await {
            Ok(shape) => {
                self.reconciler
                    .lock()
                    .await
                    .apply_document(shape, ApplyMode::FromIngestion);
                Notice::success(notice::GENERATE_OK)
            }
            Err(IngestError::EmptyPrompt) => return None,
            Err(IngestError::Busy) => Notice::error(notice::GENERATE_BUSY),
            Err(e) => {
                tracing::warn!(error = %e, "generation failed; diagram unchanged");
                Notice::error(notice::GENERATE_FAILED)
            }
        };
        Some(self.notify(notice))
    }

    /// Apply a graph delta (attribute edit, connection, renderer change)
    pub async fn dispatch(&self, message: Message) -> Result<Outcome, ReconcileError> {
        self.reconciler.lock().await.dispatch(message)
    }

    /// Overwrite the text surface with the live graph as a schema document
    pub async fn sync_text_from_graph(&self) -> Result<String, serde_json::Error> {
        let doc = self.reconciler.lock().await.to_document();
        let text = serde_json::to_string_pretty(&doc)?;
        self.set_text(text.clone()).await;
        Ok(text)
    }

    fn notify(&self, notice: Notice) -> Notice {
        self.notifier.notify(&notice);
        notice
    }
}
