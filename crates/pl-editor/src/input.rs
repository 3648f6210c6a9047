//! Input events fed to the editor.
//!
//! Events arrive from the outside (pointer adapter, keyboard helper, text
//! editor binding, persistence) as `{ type, target?, key?, x?, y?, text? }`.
//! Coordinates are always in document space.

use pl_core::id::NodeKey;
use pl_core::vector::Vector;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    /// Bootstrap: leaves the start state.
    Go,
    Mousedown,
    Mousemove,
    Mouseup,
    Escape,
    Delete,
    /// Markup text edited externally; `text` carries the new markup.
    Markup,
    /// Restore a persisted document; `text` carries the JSON mirror.
    Load,
    /// Known document names; `text` carries a JSON string list.
    Docs,
    /// New document name in `text`.
    Rename,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::Go => "go",
            EventType::Mousedown => "mousedown",
            EventType::Mousemove => "mousemove",
            EventType::Mouseup => "mouseup",
            EventType::Escape => "escape",
            EventType::Delete => "delete",
            EventType::Markup => "markup",
            EventType::Load => "load",
            EventType::Docs => "docs",
            EventType::Rename => "rename",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of hit-target the pointer was over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetKind {
    Canvas,
    Group,
    Shape,
    /// A curve of the pen shape; the event key names the curve's starting segment.
    Curve,
    Anchor,
    HandleIn,
    HandleOut,
    RotateHandle,
    ScaleHandle,
    ToolPen,
    ToolSelect,
}

impl TargetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TargetKind::Canvas => "canvas",
            TargetKind::Group => "group",
            TargetKind::Shape => "shape",
            TargetKind::Curve => "curve",
            TargetKind::Anchor => "anchor",
            TargetKind::HandleIn => "handle-in",
            TargetKind::HandleOut => "handle-out",
            TargetKind::RotateHandle => "rotate-handle",
            TargetKind::ScaleHandle => "scale-handle",
            TargetKind::ToolPen => "tool-pen",
            TargetKind::ToolSelect => "tool-select",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputEvent {
    #[serde(rename = "type")]
    pub kind: EventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<TargetKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<NodeKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl InputEvent {
    pub fn new(kind: EventType) -> Self {
        Self {
            kind,
            target: None,
            key: None,
            x: None,
            y: None,
            text: None,
        }
    }

    pub fn go() -> Self {
        Self::new(EventType::Go)
    }

    pub fn escape() -> Self {
        Self::new(EventType::Escape)
    }

    pub fn delete() -> Self {
        Self::new(EventType::Delete)
    }

    pub fn mousedown(target: TargetKind, x: f64, y: f64) -> Self {
        Self::new(EventType::Mousedown).on(target).at(x, y)
    }

    pub fn mousemove(x: f64, y: f64) -> Self {
        Self::new(EventType::Mousemove).at(x, y)
    }

    pub fn mouseup(x: f64, y: f64) -> Self {
        Self::new(EventType::Mouseup).at(x, y)
    }

    /// A payload-carrying event (markup, load, docs, rename).
    pub fn with_payload(kind: EventType, text: impl Into<String>) -> Self {
        Self::new(kind).text(text)
    }

    #[must_use]
    pub fn on(mut self, target: TargetKind) -> Self {
        self.target = Some(target);
        self
    }

    #[must_use]
    pub fn keyed(mut self, key: NodeKey) -> Self {
        self.key = Some(key);
        self
    }

    #[must_use]
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Pointer position, when both coordinates are present.
    pub fn point(&self) -> Option<Vector> {
        Some(Vector::new(self.x?, self.y?))
    }

    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }
}
