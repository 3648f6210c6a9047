pub mod config;
pub mod editor;
pub mod gesture;
pub mod input;
pub mod machine;
pub mod render;
pub mod selection;
pub mod shortcuts;
pub mod snapshot;
pub mod updates;

pub use config::EditorConfig;
pub use editor::{Editor, EditorState};
pub use gesture::{Gesture, Splitter, TransformGesture, TransformKind};
pub use input::{EventType, InputEvent, TargetKind};
pub use machine::{Label, Mode, Rule, State, TableError, TransitionTable, Update};
pub use render::RenderNode;
pub use selection::Selection;
pub use shortcuts::{ShortcutAction, ShortcutMap};
pub use snapshot::{Module, Snapshot};
pub use updates::ImportError;
