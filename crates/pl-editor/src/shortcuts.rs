//! Keyboard shortcut mapping.
//!
//! Maps key + modifier combos to semantic `ShortcutAction`s, and actions to
//! the input events the editor understands. Tool buttons and keys therefore
//! go through the same transition rules.

use crate::input::{EventType, InputEvent, TargetKind};

/// Actions that keyboard shortcuts can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    ToolSelect,
    ToolPen,
    Delete,
    /// Escape: leave the pen, cancel a drag, or drop the selection.
    Escape,
}

impl ShortcutAction {
    /// The input event this action dispatches.
    pub fn to_event(self) -> InputEvent {
        match self {
            ShortcutAction::ToolSelect => {
                InputEvent::new(EventType::Mousedown).on(TargetKind::ToolSelect)
            }
            ShortcutAction::ToolPen => InputEvent::new(EventType::Mousedown).on(TargetKind::ToolPen),
            ShortcutAction::Delete => InputEvent::delete(),
            ShortcutAction::Escape => InputEvent::escape(),
        }
    }
}

/// Resolves key events into shortcut actions.
///
/// Combos holding ctrl, meta or alt belong to the host (copy, reload …)
/// and are never claimed.
pub struct ShortcutMap;

impl ShortcutMap {
    /// Resolve a key event to an action.
    ///
    /// `key` is the `KeyboardEvent.key` value (e.g. `"p"`, `"Delete"`).
    /// Returns `None` if the key combo has no binding.
    pub fn resolve(
        key: &str,
        ctrl: bool,
        _shift: bool,
        alt: bool,
        meta: bool,
    ) -> Option<ShortcutAction> {
        if ctrl || meta || alt {
            return None;
        }
        match key {
            "v" | "V" => Some(ShortcutAction::ToolSelect),
            "p" | "P" => Some(ShortcutAction::ToolPen),
            "Delete" | "Backspace" => Some(ShortcutAction::Delete),
            "Escape" => Some(ShortcutAction::Escape),
            _ => None,
        }
    }

    /// Resolve straight to the event to dispatch.
    pub fn event_for(key: &str, ctrl: bool, shift: bool, alt: bool, meta: bool) -> Option<InputEvent> {
        Self::resolve(key, ctrl, shift, alt, meta).map(ShortcutAction::to_event)
    }
}
