//! Interaction state machine.
//!
//! The editor is always in a `(mode, label)` state. An ordered table of
//! rules decides what each input event does: the first rule whose mode,
//! label, event type and target constraints all match wins, runs its update
//! procedure, and moves the machine to its destination (or leaves it where
//! it is). Events that match no rule are ignored.

use crate::input::{EventType, InputEvent, TargetKind};
use serde::Serialize;
use smallvec::SmallVec;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Mode {
    Start,
    Select,
    Pen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Label {
    Idle,
    Shifting,
    Rotating,
    Scaling,
    SettingHandles,
    AdjustingSegment,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Start, Mode::Select, Mode::Pen];

    /// Labels the machine may carry while in this mode.
    pub fn labels(self) -> &'static [Label] {
        match self {
            Mode::Start => &[Label::Idle],
            Mode::Select => &[Label::Idle, Label::Shifting, Label::Rotating, Label::Scaling],
            Mode::Pen => &[Label::Idle, Label::SettingHandles, Label::AdjustingSegment],
        }
    }

    /// Tool name reported to the toolbar.
    pub fn tool(self) -> &'static str {
        match self {
            Mode::Start | Mode::Select => "select",
            Mode::Pen => "pen",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct State {
    pub mode: Mode,
    pub label: Label,
}

impl State {
    pub const START: State = State::new(Mode::Start, Label::Idle);

    pub const fn new(mode: Mode, label: Label) -> Self {
        Self { mode, label }
    }

    pub fn is_legal(self) -> bool {
        self.mode.labels().contains(&self.label)
    }

    /// Pointer cursor shown in this state.
    pub fn cursor(self) -> &'static str {
        match (self.mode, self.label) {
            (_, Label::Shifting) => "move",
            (_, Label::Rotating) | (_, Label::AdjustingSegment) => "grabbing",
            (_, Label::Scaling) => "nwse-resize",
            (Mode::Pen, _) => "crosshair",
            _ => "default",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:?}, {:?})", self.mode, self.label)
    }
}

// ─── Updates ─────────────────────────────────────────────────────────────

/// Update procedures a rule can name. Implemented in `updates`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Update {
    Bootstrap,
    Hover,
    StartShift,
    StartRotate,
    StartScale,
    Shift,
    Rotate,
    Scale,
    EndTransform,
    CancelTransform,
    Deselect,
    DeleteSelection,
    EnterPen,
    ExitPen,
    AddSegment,
    SetHandles,
    ReleaseHandles,
    ProjectSplitter,
    ClearSplitter,
    Split,
    GrabPoint,
    MovePoint,
    ReleasePoint,
    ImportMarkup,
    Load,
    SetDocs,
    Rename,
}

impl Update {
    pub fn name(self) -> &'static str {
        match self {
            Update::Bootstrap => "bootstrap",
            Update::Hover => "hover",
            Update::StartShift => "startShift",
            Update::StartRotate => "startRotate",
            Update::StartScale => "startScale",
            Update::Shift => "shift",
            Update::Rotate => "rotate",
            Update::Scale => "scale",
            Update::EndTransform => "endTransform",
            Update::CancelTransform => "cancelTransform",
            Update::Deselect => "deselect",
            Update::DeleteSelection => "deleteSelection",
            Update::EnterPen => "enterPen",
            Update::ExitPen => "exitPen",
            Update::AddSegment => "addSegment",
            Update::SetHandles => "setHandles",
            Update::ReleaseHandles => "releaseHandles",
            Update::ProjectSplitter => "projectSplitter",
            Update::ClearSplitter => "clearSplitter",
            Update::Split => "split",
            Update::GrabPoint => "grabPoint",
            Update::MovePoint => "movePoint",
            Update::ReleasePoint => "releasePoint",
            Update::ImportMarkup => "importMarkup",
            Update::Load => "load",
            Update::SetDocs => "setDocs",
            Update::Rename => "rename",
        }
    }
}

// ─── Rules ───────────────────────────────────────────────────────────────

/// One row of the transition table. Empty constraint lists match anything.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub modes: SmallVec<[Mode; 2]>,
    pub labels: SmallVec<[Label; 3]>,
    pub event: EventType,
    pub targets: SmallVec<[TargetKind; 4]>,
    pub update: Update,
    pub to: Option<State>,
}

impl Rule {
    pub fn on(event: EventType, update: Update) -> Self {
        Self {
            modes: SmallVec::new(),
            labels: SmallVec::new(),
            event,
            targets: SmallVec::new(),
            update,
            to: None,
        }
    }

    #[must_use]
    pub fn in_modes(mut self, modes: &[Mode]) -> Self {
        self.modes = modes.iter().copied().collect();
        self
    }

    #[must_use]
    pub fn in_labels(mut self, labels: &[Label]) -> Self {
        self.labels = labels.iter().copied().collect();
        self
    }

    /// Shorthand for a single `(mode, label)` source state.
    #[must_use]
    pub fn when(self, mode: Mode, label: Label) -> Self {
        self.in_modes(&[mode]).in_labels(&[label])
    }

    #[must_use]
    pub fn targets(mut self, targets: &[TargetKind]) -> Self {
        self.targets = targets.iter().copied().collect();
        self
    }

    #[must_use]
    pub fn to(mut self, mode: Mode, label: Label) -> Self {
        self.to = Some(State::new(mode, label));
        self
    }

    /// Does this rule apply in `state`, ignoring the event?
    pub fn applies_in(&self, state: State) -> bool {
        (self.modes.is_empty() || self.modes.contains(&state.mode))
            && (self.labels.is_empty() || self.labels.contains(&state.label))
    }

    pub fn matches(&self, state: State, event: &InputEvent) -> bool {
        self.event == event.kind
            && self.applies_in(state)
            && (self.targets.is_empty()
                || event.target.is_some_and(|t| self.targets.contains(&t)))
    }

    /// Where the machine ends up when this rule fires in `state`.
    pub fn destination(&self, state: State) -> State {
        self.to.unwrap_or(state)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TableError {
    #[error("rule {index} ({update}) leads to illegal state {state}")]
    IllegalDestination {
        index: usize,
        update: &'static str,
        state: State,
    },
    #[error("no rule leaves the start state")]
    NoBootstrap,
    #[error("state {0} is reachable but no rule leaves it")]
    DeadEnd(State),
}

/// An ordered rule table with first-match lookup.
#[derive(Debug, Clone)]
pub struct TransitionTable {
    rules: Vec<Rule>,
}

impl TransitionTable {
    /// A validated table.
    pub fn new(rules: Vec<Rule>) -> Result<Self, TableError> {
        let table = Self { rules };
        table.validate()?;
        Ok(table)
    }

    /// The editor's built-in rules.
    pub fn standard() -> Result<Self, TableError> {
        Self::new(standard_rules())
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// First rule matching `event` in `state`.
    pub fn lookup(&self, state: State, event: &InputEvent) -> Option<&Rule> {
        let found = self.rules.iter().position(|r| r.matches(state, event));
        match found {
            Some(index) => {
                log::trace!("{state} {}: rule {index} ({})", event.kind, self.rules[index].update.name());
                self.rules.get(index)
            }
            None => {
                log::trace!("{state} {}: no rule", event.kind);
                None
            }
        }
    }

    /// Check that every destination is a legal state, that something leaves
    /// the start state, and that every state reachable from start has at
    /// least one rule leading out of it.
    pub fn validate(&self) -> Result<(), TableError> {
        for (index, rule) in self.rules.iter().enumerate() {
            if let Some(to) = rule.to
                && !to.is_legal()
            {
                return Err(TableError::IllegalDestination {
                    index,
                    update: rule.update.name(),
                    state: to,
                });
            }
        }

        let leaves = |state: State| {
            self.rules
                .iter()
                .any(|r| r.applies_in(state) && r.destination(state) != state)
        };
        if !leaves(State::START) {
            return Err(TableError::NoBootstrap);
        }

        let mut seen = HashSet::from([State::START]);
        let mut queue = VecDeque::from([State::START]);
        while let Some(state) = queue.pop_front() {
            for rule in self.rules.iter().filter(|r| r.applies_in(state)) {
                let next = rule.destination(state);
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        // deterministic error order
        let mut reachable: Vec<State> = Mode::ALL
            .iter()
            .flat_map(|&m| m.labels().iter().map(move |&l| State::new(m, l)))
            .filter(|s| seen.contains(s))
            .collect();
        reachable.retain(|&s| s != State::START);
        for state in reachable {
            if !self.rules.iter().any(|r| r.applies_in(state)) {
                return Err(TableError::DeadEnd(state));
            }
        }
        Ok(())
    }
}

impl Default for TransitionTable {
    fn default() -> Self {
        Self::standard()
    }
}

// ─── Built-in rules ──────────────────────────────────────────────────────

fn standard_rules() -> Vec<Rule> {
    use EventType as E;
    use Label as L;
    use Mode as M;
    use TargetKind as T;

    const TRANSFORMING: &[Label] = &[L::Shifting, L::Rotating, L::Scaling];
    const POINTS: &[TargetKind] = &[T::Anchor, T::HandleIn, T::HandleOut];
    const SURFACES: &[TargetKind] = &[T::Canvas, T::Group, T::Shape];

    vec![
        // ── Bootstrap ──
        Rule::on(E::Go, Update::Bootstrap)
            .when(M::Start, L::Idle)
            .to(M::Select, L::Idle),
        // ── Document-level ──
        Rule::on(E::Markup, Update::ImportMarkup)
            .in_modes(&[M::Select, M::Pen])
            .to(M::Select, L::Idle),
        Rule::on(E::Load, Update::Load)
            .in_modes(&[M::Select, M::Pen])
            .to(M::Select, L::Idle),
        Rule::on(E::Docs, Update::SetDocs),
        Rule::on(E::Rename, Update::Rename),
        // ── Select ──
        Rule::on(E::Mousedown, Update::StartShift)
            .when(M::Select, L::Idle)
            .targets(&[T::Group, T::Shape])
            .to(M::Select, L::Shifting),
        Rule::on(E::Mousedown, Update::StartRotate)
            .when(M::Select, L::Idle)
            .targets(&[T::RotateHandle])
            .to(M::Select, L::Rotating),
        Rule::on(E::Mousedown, Update::StartScale)
            .when(M::Select, L::Idle)
            .targets(&[T::ScaleHandle])
            .to(M::Select, L::Scaling),
        Rule::on(E::Mousedown, Update::EnterPen)
            .when(M::Select, L::Idle)
            .targets(&[T::ToolPen])
            .to(M::Pen, L::Idle),
        Rule::on(E::Mousemove, Update::Hover).when(M::Select, L::Idle),
        Rule::on(E::Escape, Update::Deselect).when(M::Select, L::Idle),
        Rule::on(E::Delete, Update::DeleteSelection).when(M::Select, L::Idle),
        Rule::on(E::Mousemove, Update::Shift).when(M::Select, L::Shifting),
        Rule::on(E::Mousemove, Update::Rotate).when(M::Select, L::Rotating),
        Rule::on(E::Mousemove, Update::Scale).when(M::Select, L::Scaling),
        Rule::on(E::Mouseup, Update::EndTransform)
            .in_modes(&[M::Select])
            .in_labels(TRANSFORMING)
            .to(M::Select, L::Idle),
        Rule::on(E::Escape, Update::CancelTransform)
            .in_modes(&[M::Select])
            .in_labels(TRANSFORMING)
            .to(M::Select, L::Idle),
        // ── Pen ──
        Rule::on(E::Mousedown, Update::ExitPen)
            .when(M::Pen, L::Idle)
            .targets(&[T::ToolSelect])
            .to(M::Select, L::Idle),
        Rule::on(E::Escape, Update::ExitPen)
            .in_modes(&[M::Pen])
            .to(M::Select, L::Idle),
        Rule::on(E::Mousedown, Update::GrabPoint)
            .when(M::Pen, L::Idle)
            .targets(POINTS)
            .to(M::Pen, L::AdjustingSegment),
        Rule::on(E::Mousedown, Update::Split)
            .when(M::Pen, L::Idle)
            .targets(&[T::Curve])
            .to(M::Pen, L::AdjustingSegment),
        Rule::on(E::Mousedown, Update::AddSegment)
            .when(M::Pen, L::Idle)
            .targets(SURFACES)
            .to(M::Pen, L::SettingHandles),
        Rule::on(E::Mousemove, Update::ProjectSplitter)
            .when(M::Pen, L::Idle)
            .targets(&[T::Curve]),
        Rule::on(E::Mousemove, Update::ClearSplitter).when(M::Pen, L::Idle),
        Rule::on(E::Mousemove, Update::SetHandles).when(M::Pen, L::SettingHandles),
        Rule::on(E::Mouseup, Update::ReleaseHandles)
            .when(M::Pen, L::SettingHandles)
            .to(M::Pen, L::Idle),
        Rule::on(E::Mousemove, Update::MovePoint).when(M::Pen, L::AdjustingSegment),
        Rule::on(E::Mouseup, Update::ReleasePoint)
            .when(M::Pen, L::AdjustingSegment)
            .to(M::Pen, L::Idle),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn select_idle() -> State {
        State::new(Mode::Select, Label::Idle)
    }

    #[test]
    fn standard_table_is_valid() {
        let table = TransitionTable::standard().unwrap();
        assert_eq!(table.validate(), Ok(()));
        assert_eq!(table.rules().len(), standard_rules().len());
    }

    #[test]
    fn go_leaves_start() {
        let table = TransitionTable::standard().unwrap();
        let rule = table.lookup(State::START, &InputEvent::go()).unwrap();
        assert_eq!(rule.update, Update::Bootstrap);
        assert_eq!(rule.destination(State::START), select_idle());
    }

    #[test]
    fn go_is_ignored_after_start() {
        let table = TransitionTable::standard().unwrap();
        assert!(table.lookup(select_idle(), &InputEvent::go()).is_none());
    }

    #[test]
    fn canvas_click_in_select_mode_matches_nothing() {
        let table = TransitionTable::standard().unwrap();
        let ev = InputEvent::mousedown(TargetKind::Canvas, 50.0, 50.0);
        assert!(table.lookup(select_idle(), &ev).is_none());
    }

    #[test]
    fn first_match_wins() {
        let table = TransitionTable::standard().unwrap();
        let pen_idle = State::new(Mode::Pen, Label::Idle);
        let over_curve = InputEvent::mousemove(1.0, 1.0).on(TargetKind::Curve);
        let elsewhere = InputEvent::mousemove(1.0, 1.0).on(TargetKind::Canvas);
        assert_eq!(table.lookup(pen_idle, &over_curve).unwrap().update, Update::ProjectSplitter);
        assert_eq!(table.lookup(pen_idle, &elsewhere).unwrap().update, Update::ClearSplitter);
    }

    #[test]
    fn target_constraint_requires_a_target() {
        let table = TransitionTable::standard().unwrap();
        let ev = InputEvent::new(EventType::Mousedown).at(1.0, 1.0);
        assert!(table.lookup(select_idle(), &ev).is_none());
    }

    #[test]
    fn rule_without_destination_keeps_state() {
        let table = TransitionTable::standard().unwrap();
        let shifting = State::new(Mode::Select, Label::Shifting);
        let rule = table.lookup(shifting, &InputEvent::mousemove(0.0, 0.0)).unwrap();
        assert_eq!(rule.update, Update::Shift);
        assert_eq!(rule.destination(shifting), shifting);
    }

    #[test]
    fn illegal_destination_rejected() {
        let rules = vec![
            Rule::on(EventType::Go, Update::Bootstrap)
                .when(Mode::Start, Label::Idle)
                .to(Mode::Select, Label::SettingHandles),
        ];
        assert_eq!(
            TransitionTable::new(rules).unwrap_err(),
            TableError::IllegalDestination {
                index: 0,
                update: "bootstrap",
                state: State::new(Mode::Select, Label::SettingHandles),
            }
        );
    }

    #[test]
    fn missing_bootstrap_rejected() {
        let rules = vec![Rule::on(EventType::Escape, Update::Deselect).when(Mode::Select, Label::Idle)];
        assert_eq!(TransitionTable::new(rules).unwrap_err(), TableError::NoBootstrap);
    }

    #[test]
    fn dead_end_rejected() {
        let rules = vec![
            Rule::on(EventType::Go, Update::Bootstrap)
                .when(Mode::Start, Label::Idle)
                .to(Mode::Select, Label::Idle),
            Rule::on(EventType::Mousedown, Update::EnterPen)
                .when(Mode::Select, Label::Idle)
                .to(Mode::Pen, Label::Idle),
        ];
        assert_eq!(
            TransitionTable::new(rules).unwrap_err(),
            TableError::DeadEnd(State::new(Mode::Pen, Label::Idle))
        );
    }

    #[test]
    fn cursors_follow_state() {
        assert_eq!(State::START.cursor(), "default");
        assert_eq!(State::new(Mode::Pen, Label::Idle).cursor(), "crosshair");
        assert_eq!(State::new(Mode::Select, Label::Shifting).cursor(), "move");
    }
}
