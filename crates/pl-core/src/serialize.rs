//! Persistence mirror: SceneGraph ⇄ `{ type, key, children, props }` tree.
//!
//! The mirror is what persistence and history collaborators store. Props
//! live in a `BTreeMap` so the encoded form is deterministic, and a
//! serialize → deserialize → serialize cycle reproduces the same bytes.
//! Transient chrome nodes (tools, docs, message) are not mirrored.

use crate::id::NodeKey;
use crate::matrix::Matrix;
use crate::model::{Node, NodeKind, SceneGraph};
use crate::rect::Rect;
use crate::status::{StatusTag, TagSet};
use crate::vector::Vector;
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("unknown node type `{0}`")]
    UnknownType(String),
    #[error("`{node_type}` node is missing prop `{prop}`")]
    MissingProp { node_type: String, prop: &'static str },
    #[error("prop `{prop}` has the wrong type")]
    WrongPropType { prop: &'static str },
    #[error("unknown status tag `{0}`")]
    UnknownTag(String),
    #[error("`{child}` cannot be a child of `{parent}`")]
    InvalidChild { parent: String, child: String },
    #[error("duplicate key `{0}`")]
    DuplicateKey(String),
    #[error("node `{0}` has a singular transform")]
    SingularTransform(String),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("MessagePack encode failed: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("MessagePack decode failed: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}

/// A prop value. Untagged: the variant is recovered from the shape of the
/// data, so object variants are ordered most-specific first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropValue {
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<String>),
    Matrix(Matrix),
    Rect(Rect),
    Vector(Vector),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedNode {
    #[serde(rename = "type")]
    pub node_type: String,
    pub key: NodeKey,
    #[serde(default)]
    pub children: Vec<SerializedNode>,
    #[serde(default)]
    pub props: BTreeMap<String, PropValue>,
}

// ─── Serialize ───────────────────────────────────────────────────────────

/// Mirror the subtree at `idx`. `None` if the node is transient.
pub fn serialize_node(sg: &SceneGraph, idx: NodeIndex) -> Option<SerializedNode> {
    let node = sg.get(idx)?;
    if !node.kind.is_persistent() {
        return None;
    }
    let mut props = BTreeMap::new();
    match &node.kind {
        NodeKind::Identifier { name } => {
            props.insert("name".into(), PropValue::Text(name.clone()));
        }
        NodeKind::Canvas { view_box } => {
            props.insert("viewBox".into(), PropValue::Rect(*view_box));
        }
        NodeKind::Spline { closed } => {
            props.insert("closed".into(), PropValue::Bool(*closed));
        }
        NodeKind::Anchor { vector }
        | NodeKind::HandleIn { vector }
        | NodeKind::HandleOut { vector } => {
            props.insert("vector".into(), PropValue::Vector(*vector));
        }
        _ => {}
    }
    if let Some(m) = node.transform {
        props.insert("transform".into(), PropValue::Matrix(m));
    }
    if !node.tags.is_empty() {
        let class = node.tags.iter().map(|t| t.as_str().to_string()).collect();
        props.insert("class".into(), PropValue::List(class));
    }

    Some(SerializedNode {
        node_type: node.kind.type_name().to_string(),
        key: node.key,
        children: sg
            .children(idx)
            .iter()
            .filter_map(|&c| serialize_node(sg, c))
            .collect(),
        props,
    })
}

/// Mirror the whole document.
pub fn serialize(sg: &SceneGraph) -> Option<SerializedNode> {
    serialize_node(sg, sg.root)
}

pub fn to_json(sg: &SceneGraph) -> Result<String, SerializeError> {
    Ok(serde_json::to_string(&serialize(sg))?)
}

pub fn to_msgpack(sg: &SceneGraph) -> Result<Vec<u8>, SerializeError> {
    Ok(rmp_serde::to_vec_named(&serialize(sg))?)
}

// ─── Deserialize ─────────────────────────────────────────────────────────

/// Rebuild a scene graph from its mirror. The result is a fresh graph; the
/// caller decides whether to adopt it.
pub fn deserialize(root: &SerializedNode) -> Result<SceneGraph, SerializeError> {
    let mut sg = SceneGraph::new(build_node(root)?);
    let idx = sg.root;
    deserialize_children(&mut sg, idx, root)?;
    Ok(sg)
}

pub fn from_json(input: &str) -> Result<SceneGraph, SerializeError> {
    let root: SerializedNode = serde_json::from_str(input)?;
    deserialize(&root)
}

pub fn from_msgpack(bytes: &[u8]) -> Result<SceneGraph, SerializeError> {
    let root: SerializedNode = rmp_serde::from_slice(bytes)?;
    deserialize(&root)
}

fn deserialize_children(
    sg: &mut SceneGraph,
    parent: NodeIndex,
    data: &SerializedNode,
) -> Result<(), SerializeError> {
    for child in &data.children {
        let node = build_node(child)?;
        if !sg[parent].kind.accepts_child(&node.kind) {
            return Err(SerializeError::InvalidChild {
                parent: data.node_type.clone(),
                child: child.node_type.clone(),
            });
        }
        if sg.index_of(child.key).is_some() {
            return Err(SerializeError::DuplicateKey(child.key.to_string()));
        }
        let idx = sg.create(node);
        sg.mount(parent, &[idx]);
        deserialize_children(sg, idx, child)?;
    }
    Ok(())
}

fn build_node(data: &SerializedNode) -> Result<Node, SerializeError> {
    let props = Props {
        node_type: &data.node_type,
        map: &data.props,
    };
    let kind = match data.node_type.as_str() {
        "doc" => NodeKind::Doc,
        "identifier" => NodeKind::Identifier {
            name: props.text("name")?,
        },
        "canvas" => NodeKind::Canvas {
            view_box: props.rect("viewBox")?,
        },
        "group" => NodeKind::Group,
        "shape" => NodeKind::Shape,
        "spline" => NodeKind::Spline {
            closed: props.bool_or("closed", false)?,
        },
        "segment" => NodeKind::Segment,
        "anchor" => NodeKind::Anchor {
            vector: props.vector("vector")?,
        },
        "handleIn" => NodeKind::HandleIn {
            vector: props.vector("vector")?,
        },
        "handleOut" => NodeKind::HandleOut {
            vector: props.vector("vector")?,
        },
        other => return Err(SerializeError::UnknownType(other.to_string())),
    };

    let mut node = Node::with_key(data.key, kind);
    if node.kind.is_graphics() {
        node.transform = props.matrix("transform")?;
        if node.transform.is_some_and(|m| !m.is_invertible()) {
            return Err(SerializeError::SingularTransform(data.key.to_string()));
        }
    }
    node.tags = props.tags()?;
    Ok(node)
}

struct Props<'a> {
    node_type: &'a str,
    map: &'a BTreeMap<String, PropValue>,
}

impl Props<'_> {
    fn missing(&self, prop: &'static str) -> SerializeError {
        SerializeError::MissingProp {
            node_type: self.node_type.to_string(),
            prop,
        }
    }

    fn text(&self, prop: &'static str) -> Result<String, SerializeError> {
        match self.map.get(prop) {
            Some(PropValue::Text(s)) => Ok(s.clone()),
            Some(_) => Err(SerializeError::WrongPropType { prop }),
            None => Err(self.missing(prop)),
        }
    }

    fn rect(&self, prop: &'static str) -> Result<Rect, SerializeError> {
        match self.map.get(prop) {
            Some(PropValue::Rect(r)) => Ok(*r),
            Some(_) => Err(SerializeError::WrongPropType { prop }),
            None => Err(self.missing(prop)),
        }
    }

    fn vector(&self, prop: &'static str) -> Result<Vector, SerializeError> {
        match self.map.get(prop) {
            Some(PropValue::Vector(v)) => Ok(*v),
            Some(_) => Err(SerializeError::WrongPropType { prop }),
            None => Err(self.missing(prop)),
        }
    }

    fn bool_or(&self, prop: &'static str, default: bool) -> Result<bool, SerializeError> {
        match self.map.get(prop) {
            Some(PropValue::Bool(b)) => Ok(*b),
            Some(_) => Err(SerializeError::WrongPropType { prop }),
            None => Ok(default),
        }
    }

    fn matrix(&self, prop: &'static str) -> Result<Option<Matrix>, SerializeError> {
        match self.map.get(prop) {
            Some(PropValue::Matrix(m)) => Ok(Some(*m)),
            Some(_) => Err(SerializeError::WrongPropType { prop }),
            None => Ok(None),
        }
    }

    fn tags(&self) -> Result<TagSet, SerializeError> {
        match self.map.get("class") {
            None => Ok(TagSet::new()),
            Some(PropValue::List(names)) => names
                .iter()
                .map(|n| {
                    n.parse::<StatusTag>()
                        .map_err(|_| SerializeError::UnknownTag(n.clone()))
                })
                .collect(),
            Some(_) => Err(SerializeError::WrongPropType { prop: "class" }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> SceneGraph {
        let mut sg = SceneGraph::document("sample", Rect::new(0.0, 0.0, 800.0, 600.0));
        let canvas = sg.canvas().unwrap();
        let shape = sg.create(Node::shape().keyed(NodeKey::intern("ser_shape")));
        let spline = sg.create(Node::spline(true));
        let seg = sg.create(Node::segment());
        let anchor = sg.create(Node::anchor(Vector::new(1.5, -2.0)));
        sg.mount(seg, &[anchor]);
        sg.mount(spline, &[seg]);
        sg.mount(shape, &[spline]);
        sg.mount(canvas, &[shape]);
        sg.set_transform(shape, Some(Matrix::translation(Vector::new(3.0, 4.0))));
        sg.add_tag(shape, StatusTag::Selected);
        sg
    }

    #[test]
    fn props_by_kind() {
        let sg = sample();
        let mirror = serialize(&sg).unwrap();
        assert_eq!(mirror.node_type, "doc");
        let canvas = &mirror.children[1];
        assert_eq!(
            canvas.props.get("viewBox"),
            Some(&PropValue::Rect(Rect::new(0.0, 0.0, 800.0, 600.0)))
        );
        let shape = &canvas.children[0];
        assert_eq!(shape.key, NodeKey::intern("ser_shape"));
        assert_eq!(
            shape.props.get("class"),
            Some(&PropValue::List(vec!["selected".into()]))
        );
        assert!(matches!(shape.props.get("transform"), Some(PropValue::Matrix(_))));
    }

    #[test]
    fn chrome_nodes_are_not_mirrored() {
        let mut sg = sample();
        let tools = sg.create(Node::tools("select", "default"));
        let root = sg.root;
        sg.mount(root, &[tools]);
        let mirror = serialize(&sg).unwrap();
        assert_eq!(mirror.children.len(), 2);
    }

    #[test]
    fn json_untagged_props_recover_variant() {
        let json = r#"{"type":"anchor","key":"a_json","children":[],"props":{"vector":{"x":1.0,"y":2.0}}}"#;
        let sg = from_json(json).unwrap();
        assert_eq!(sg[sg.root].kind, NodeKind::Anchor { vector: Vector::new(1.0, 2.0) });
    }

    #[test]
    fn msgpack_round_trip() {
        let sg = sample();
        let bytes = to_msgpack(&sg).unwrap();
        let back = from_msgpack(&bytes).unwrap();
        assert_eq!(serialize(&back), serialize(&sg));
    }

    #[test]
    fn json_keeps_rotated_transforms_exact() {
        let mut sg = sample();
        let shape = sg.index_of(NodeKey::intern("ser_shape")).unwrap();
        let m = Matrix::rotation(15f64.to_radians(), Vector::new(7.0, 3.0))
            .multiply(&Matrix::scale(1.1, Vector::ZERO));
        sg.set_transform(shape, Some(m));
        let json = to_json(&sg).unwrap();
        let back = from_json(&json).unwrap();
        let shape = back.index_of(NodeKey::intern("ser_shape")).unwrap();
        assert_eq!(back[shape].transform, Some(m));
        assert_eq!(to_json(&back).unwrap(), json);
    }

    #[test]
    fn rejects_singular_transform() {
        let json = r#"{"type":"shape","key":"flat_shape","children":[],"props":{
            "transform":{"a":0.0,"b":0.0,"c":0.0,"d":0.0,"e":1.0,"f":2.0}
        }}"#;
        assert!(matches!(
            from_json(json),
            Err(SerializeError::SingularTransform(key)) if key == "flat_shape"
        ));
    }

    #[test]
    fn rejects_misplaced_child() {
        let json = r#"{"type":"shape","key":"bad_shape","children":[
            {"type":"anchor","key":"bad_anchor","children":[],"props":{"vector":{"x":0.0,"y":0.0}}}
        ],"props":{}}"#;
        assert!(matches!(
            from_json(json),
            Err(SerializeError::InvalidChild { .. })
        ));
    }

    #[test]
    fn rejects_missing_prop_and_unknown_type() {
        let missing = r#"{"type":"anchor","key":"m_anchor","children":[],"props":{}}"#;
        assert!(matches!(
            from_json(missing),
            Err(SerializeError::MissingProp { prop: "vector", .. })
        ));
        let unknown = r#"{"type":"ellipse","key":"m_ellipse","children":[],"props":{}}"#;
        assert!(matches!(from_json(unknown), Err(SerializeError::UnknownType(_))));
    }
}
