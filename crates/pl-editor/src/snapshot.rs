//! Snapshots published to modules after every event.

use crate::input::InputEvent;
use crate::machine::{Label, Mode};
use crate::render::RenderNode;
use pl_core::serialize::SerializedNode;
use serde::Serialize;

/// Everything an outer module (renderer, text editor binding, persistence,
/// history) needs to reflect the editor after one event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub mode: Mode,
    pub label: Label,
    /// The event just processed.
    pub input: Option<InputEvent>,
    /// Name of the update that ran, `None` when no rule matched.
    pub update: Option<&'static str>,
    pub render: RenderNode,
    /// Persisted mirror of the document.
    pub document: Option<SerializedNode>,
    /// Canvas markup, as the text editor shows it.
    pub markup: String,
}

impl Snapshot {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// The document mirror as JSON, ready for a `load` event.
    pub fn document_json(&self) -> Result<Option<String>, serde_json::Error> {
        self.document.as_ref().map(serde_json::to_string).transpose()
    }
}

/// An outer module. Modules only observe; they feed back by dispatching
/// new events to the editor.
pub trait Module {
    fn publish(&mut self, snapshot: &Snapshot);
}

impl<F: FnMut(&Snapshot)> Module for F {
    fn publish(&mut self, snapshot: &Snapshot) {
        self(snapshot)
    }
}
