//! The editor orchestrator.
//!
//! The `Editor` holds the authoritative scene graph and interaction state
//! and processes one input event at a time:
//!
//! 1. look the event up in the transition table (first match wins);
//! 2. run the matched update procedure and move to its destination state;
//! 3. run the `after` hook (toolbar highlight and cursor);
//! 4. build a `Snapshot` and publish it to every attached module.
//!
//! Unmatched events skip 2 and 3 but are still published, with no update
//! name, so modules always see the last input.

use crate::config::EditorConfig;
use crate::gesture::Gesture;
use crate::input::InputEvent;
use crate::machine::{Rule, State, TableError, TransitionTable};
use crate::render::render;
use crate::selection::Selection;
use crate::snapshot::{Module, Snapshot};
use crate::updates;
use pl_core::emitter::emit_document;
use pl_core::model::{Node, NodeKind, SceneGraph};
use pl_core::serialize;
use petgraph::graph::NodeIndex;

/// The mutable state update procedures work on.
#[derive(Debug, Clone)]
pub struct EditorState {
    /// The document (single source of truth).
    pub graph: SceneGraph,
    pub selection: Selection,
    pub gesture: Gesture,
    pub config: EditorConfig,
}

impl EditorState {
    /// A fresh document with its toolbar, document list and message chrome.
    pub fn new(config: EditorConfig) -> Self {
        let mut graph = SceneGraph::document(&config.name, config.view_box);
        let root = graph.root;
        let tools = graph.create(Node::tools("select", "default"));
        let docs = graph.create(Node::docs(Vec::new()));
        let message = graph.create(Node::message(""));
        graph.mount(root, &[tools, docs, message]);
        Self {
            graph,
            selection: Selection::default(),
            gesture: Gesture::None,
            config,
        }
    }

    fn chrome(&self, pred: impl FnMut(&NodeKind) -> bool) -> Option<NodeIndex> {
        self.graph.find_child(self.graph.root, pred)
    }

    /// The document name.
    pub fn name(&self) -> Option<&str> {
        let idx = self.chrome(|k| matches!(k, NodeKind::Identifier { .. }))?;
        match &self.graph[idx].kind {
            NodeKind::Identifier { name } => Some(name.as_str()),
            _ => None,
        }
    }

    /// The current message line, empty when there is nothing to report.
    pub fn message(&self) -> &str {
        self.chrome(|k| matches!(k, NodeKind::Message { .. }))
            .and_then(|idx| match &self.graph[idx].kind {
                NodeKind::Message { text } => Some(text.as_str()),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// Active tool and cursor as shown by the toolbar.
    pub fn tools(&self) -> Option<(&str, &str)> {
        let idx = self.chrome(|k| matches!(k, NodeKind::Tools { .. }))?;
        match &self.graph[idx].kind {
            NodeKind::Tools { active, cursor } => Some((active.as_str(), cursor.as_str())),
            _ => None,
        }
    }
}

pub struct Editor {
    state: EditorState,
    machine: State,
    table: TransitionTable,
    modules: Vec<Box<dyn Module>>,
    last_input: Option<InputEvent>,
    last_update: Option<&'static str>,
}

impl Editor {
    /// An editor on a fresh document with the default configuration.
    pub fn new() -> Result<Self, TableError> {
        Self::with_config(EditorConfig::default())
    }

    /// An editor driven by the built-in rules, validated like any other table.
    pub fn with_config(config: EditorConfig) -> Result<Self, TableError> {
        Ok(Self::build(config, TransitionTable::standard()?))
    }

    /// An editor driven by a custom rule table, validated up front.
    pub fn with_rules(config: EditorConfig, rules: Vec<Rule>) -> Result<Self, TableError> {
        Ok(Self::build(config, TransitionTable::new(rules)?))
    }

    fn build(config: EditorConfig, table: TransitionTable) -> Self {
        Self {
            state: EditorState::new(config),
            machine: State::START,
            table,
            modules: Vec::new(),
            last_input: None,
            last_update: None,
        }
    }

    /// Attach a module; it receives every snapshot from now on.
    pub fn attach(&mut self, module: Box<dyn Module>) {
        self.modules.push(module);
    }

    pub fn state(&self) -> State {
        self.machine
    }

    pub fn editor_state(&self) -> &EditorState {
        &self.state
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.state.graph
    }

    pub fn selection(&self) -> &Selection {
        &self.state.selection
    }

    pub fn gesture(&self) -> &Gesture {
        &self.state.gesture
    }

    /// Process one event to completion and publish the resulting snapshot.
    pub fn dispatch(&mut self, event: InputEvent) -> Snapshot {
        let matched = self
            .table
            .lookup(self.machine, &event)
            .map(|rule| (rule.update, rule.destination(self.machine)));
        self.last_update = match matched {
            Some((update, to)) => {
                updates::apply(update, &mut self.state, &event);
                self.machine = to;
                self.after();
                Some(update.name())
            }
            None => None,
        };
        self.last_input = Some(event);

        let snapshot = self.snapshot();
        for module in &mut self.modules {
            module.publish(&snapshot);
        }
        snapshot
    }

    /// Mirror the machine state into the toolbar.
    fn after(&mut self) {
        let Some(tools) = self.state.chrome(|k| matches!(k, NodeKind::Tools { .. })) else {
            return;
        };
        let kind = NodeKind::Tools {
            active: self.machine.mode.tool().to_string(),
            cursor: self.machine.cursor().to_string(),
        };
        if self.state.graph[tools].kind != kind {
            self.state.graph.set_kind(tools, kind);
        }
    }

    /// The snapshot for the current state, without publishing it.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            mode: self.machine.mode,
            label: self.machine.label,
            input: self.last_input.clone(),
            update: self.last_update,
            render: render(&self.state, self.machine),
            document: serialize::serialize(&self.state.graph),
            markup: emit_document(&self.state.graph),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{EventType, TargetKind};
    use crate::machine::{Label, Mode, Update};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn go_bootstraps_to_select_idle() {
        let mut editor = Editor::new().unwrap();
        assert_eq!(editor.state(), State::START);
        let snap = editor.dispatch(InputEvent::go());
        assert_eq!(editor.state(), State::new(Mode::Select, Label::Idle));
        assert_eq!(snap.update, Some("bootstrap"));
    }

    #[test]
    fn unmatched_event_still_publishes() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut editor = Editor::new().unwrap();
        editor.attach(Box::new(move |s: &Snapshot| sink.borrow_mut().push(s.update)));
        editor.dispatch(InputEvent::go());
        editor.dispatch(InputEvent::mousedown(TargetKind::Canvas, 50.0, 50.0));
        assert_eq!(*seen.borrow(), vec![Some("bootstrap"), None]);
    }

    #[test]
    fn after_hook_tracks_tool_and_cursor() {
        let mut editor = Editor::new().unwrap();
        editor.dispatch(InputEvent::go());
        editor.dispatch(InputEvent::new(EventType::Mousedown).on(TargetKind::ToolPen));
        assert_eq!(editor.editor_state().tools(), Some(("pen", "crosshair")));
        editor.dispatch(InputEvent::escape());
        assert_eq!(editor.editor_state().tools(), Some(("select", "default")));
    }

    #[test]
    fn after_hook_skipped_without_match() {
        let mut editor = Editor::new().unwrap();
        // no rule for mousedown in the start state
        editor.dispatch(InputEvent::mousedown(TargetKind::Canvas, 1.0, 1.0));
        assert_eq!(editor.editor_state().tools(), Some(("select", "default")));
        assert_eq!(editor.state(), State::START);
    }

    #[test]
    fn built_in_rules_go_through_validation() {
        let editor = Editor::with_config(EditorConfig::default()).unwrap();
        assert_eq!(editor.table.validate(), Ok(()));
        let reference = TransitionTable::standard().unwrap();
        assert_eq!(editor.table.rules().len(), reference.rules().len());
    }

    #[test]
    fn custom_rules_are_validated() {
        let rules = vec![Rule::on(EventType::Go, Update::Bootstrap)];
        assert!(matches!(
            Editor::with_rules(EditorConfig::default(), rules),
            Err(TableError::NoBootstrap)
        ));
    }

    #[test]
    fn config_names_the_document() {
        let config = EditorConfig {
            name: "poster".to_string(),
            ..EditorConfig::default()
        };
        let editor = Editor::with_config(config).unwrap();
        assert_eq!(editor.editor_state().name(), Some("poster"));
        assert_eq!(editor.editor_state().message(), "");
    }
}
