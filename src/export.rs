//! Image export, the integration seam for an external rasterizer
//!
//! No pixels are produced in this crate. Capturing the diagram is the job of an external [`Rasterizer`]. The only
//! thing this module guarantees is that interactive-only controls (the
//! "+ Add Field" buttons) are hidden for the capture and restored afterwards,
//! whether or not the capture succeeds.

use std::ops::{Deref, DerefMut};
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

use crate::projection::GraphDocument;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("capture failed: {0}")]
    Capture(String),

    #[error("render error: {0}")]
    Render(#[from] askama::Error),
}

/// The rendered diagram, as handed to the rasterizer
#[derive(Debug, Clone)]
pub struct Surface {
    graph: GraphDocument,
    controls_visible: bool,
}

impl Surface {
    /// A surface with interactive controls shown
    pub fn new(graph: GraphDocument) -> Self {
        Self {
            graph,
            controls_visible: true,
        }
    }

    pub fn graph(&self) -> &GraphDocument {
        &self.graph
    }

    pub fn controls_visible(&self) -> bool {
        self.controls_visible
    }

    pub fn set_controls_visible(&mut self, visible: bool) {
        self.controls_visible = visible;
    }

    /// Hide interactive controls until the returned guard is dropped
    pub fn hide_controls(&mut self) -> HiddenControls<'_> {
        let restore = self.controls_visible;
        self.controls_visible = false;
        HiddenControls {
            surface: self,
            restore,
        }
    }
}

/// Restores control visibility on drop
pub struct HiddenControls<'a> {
    surface: &'a mut Surface,
    restore: bool,
}

impl Deref for HiddenControls<'_> {
    type Target = Surface;

    fn deref(&self) -> &Surface {
        self.surface
    }
}

impl DerefMut for HiddenControls<'_> {
    fn deref_mut(&mut self) -> &mut Surface {
        self.surface
    }
}

impl Drop for HiddenControls<'_> {
    fn drop(&mut self) {
        self.surface.controls_visible = self.restore;
    }
}

/// Turns a rendered surface into image bytes
pub trait Rasterizer {
    fn capture(&self, surface: &Surface) -> Result<Vec<u8>, ExportError>;
}

/// Capture `surface` with its interactive controls hidden
pub fn export_image(
    surface: &mut Surface,
    rasterizer: &dyn Rasterizer,
) -> Result<Vec<u8>, ExportError> {
    let hidden = surface.hide_controls();
    let result = rasterizer.capture(&hidden);
    if let Err(e) = &result {
        tracing::warn!(error = %e, "image export failed");
    }
    result
}

/// Default download name, `erd-diagram-<unix millis>.jpg`
pub fn default_file_name() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!("erd-diagram-{millis}.jpg")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html_writer::HtmlWriter;
    use crate::projection::initial_graph;
    use std::cell::RefCell;

    /// Records the markup it was asked to capture
    #[derive(Default)]
    struct HtmlRecorder {
        captured: RefCell<Option<String>>,
        fail: bool,
    }

    impl Rasterizer for HtmlRecorder {
        fn capture(&self, surface: &Surface) -> Result<Vec<u8>, ExportError> {
            assert!(!surface.controls_visible());
            let html = HtmlWriter::new().render(surface)?;
            *self.captured.borrow_mut() = Some(html.clone());
            if self.fail {
                return Err(ExportError::Capture("canvas unavailable".to_string()));
            }
            Ok(html.into_bytes())
        }
    }

    #[test]
    fn controls_hidden_during_capture_and_restored() {
        let mut surface = Surface::new(initial_graph());
        let rasterizer = HtmlRecorder::default();

        let bytes = export_image(&mut surface, &rasterizer).unwrap();
        assert!(!bytes.is_empty());
        assert!(surface.controls_visible());

        let captured = rasterizer.captured.borrow().clone().unwrap();
        assert!(!captured.contains("add-field-btn"));
        assert!(HtmlWriter::new().render(&surface).unwrap().contains("add-field-btn"));
    }

    #[test]
    fn controls_restored_when_capture_fails() {
        let mut surface = Surface::new(initial_graph());
        let rasterizer = HtmlRecorder {
            fail: true,
            ..Default::default()
        };

        let result = export_image(&mut surface, &rasterizer);
        assert!(matches!(result, Err(ExportError::Capture(_))));
        assert!(surface.controls_visible());
    }

    #[test]
    fn guard_restores_previous_visibility() {
        let mut surface = Surface::new(GraphDocument::default());
        surface.set_controls_visible(false);
        {
            let _hidden = surface.hide_controls();
        }
        assert!(!surface.controls_visible());
    }

    #[test]
    fn default_file_name_format() {
        let name = default_file_name();
        assert!(name.starts_with("erd-diagram-"));
        assert!(name.ends_with(".jpg"));
        let millis = &name["erd-diagram-".len()..name.len() - ".jpg".len()];
        assert!(millis.parse::<u128>().is_ok());
    }
}
