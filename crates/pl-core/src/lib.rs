pub mod bounds;
pub mod curve;
pub mod emitter;
pub mod id;
pub mod matrix;
pub mod model;
pub mod parser;
pub mod path;
pub mod rect;
pub mod serialize;
pub mod status;
pub mod vector;

pub use curve::{Curve, CurveKind, Projection, SplitCurve};
pub use emitter::{emit_canvas, emit_document};
pub use id::NodeKey;
pub use matrix::{Matrix, format_num};
pub use model::*;
pub use parser::{MarkupError, parse_markup, parse_transform};
pub use path::{SegmentPoints, SplineCurve};
pub use rect::Rect;
pub use serialize::{PropValue, SerializeError, SerializedNode};
pub use status::{StatusTag, TagSet};
pub use vector::Vector;

// Re-export petgraph types so downstream crates don't need a direct dependency
pub use petgraph::graph::NodeIndex;
