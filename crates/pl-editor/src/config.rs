//! Editor configuration.

use pl_core::rect::Rect;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Name given to a fresh document.
    pub name: String,
    /// View box of a fresh document's canvas.
    pub view_box: Rect,
    /// Accuracy passed to nearest-point projection onto curves.
    pub projection_accuracy: f64,
    /// Farthest a pointer may be from a curve (document units) for a splitter.
    pub splitter_tolerance: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            name: "untitled".to_string(),
            view_box: Rect::new(0.0, 0.0, 800.0, 600.0),
            projection_accuracy: 1e-6,
            splitter_tolerance: 8.0,
        }
    }
}

impl EditorConfig {
    /// Parse a JSON config; missing fields keep their defaults.
    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }
}
