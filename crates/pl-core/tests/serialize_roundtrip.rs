//! Integration tests: persistence mirror round-trip.
//!
//! serialize → deserialize → serialize must reproduce the same bytes, in
//! both the JSON and the MessagePack encodings.

use pl_core::id::NodeKey;
use pl_core::model::*;
use pl_core::parser::parse_markup;
use pl_core::rect::Rect;
use pl_core::serialize::{self, SerializeError};
use pl_core::status::StatusTag;
use pretty_assertions::assert_eq;

// ─── Helpers ─────────────────────────────────────────────────────────────

/// A full document whose canvas comes from the nested fixture.
fn fixture_document() -> SceneGraph {
    let parsed = parse_markup(include_str!("fixtures/nested.svg")).expect("parse failed");
    let mut doc = SceneGraph::document("fixture", Rect::new(0.0, 0.0, 400.0, 300.0));
    let root = doc.root;
    if let Some(old) = doc.canvas() {
        doc.remove(old);
    }
    let canvas = doc.graft(&parsed, parsed.root).expect("graft failed");
    doc.mount(root, &[canvas]);

    let figure = doc.index_of(NodeKey::intern("figure")).unwrap();
    doc.add_tag(figure, StatusTag::Selected);
    doc.add_tag(figure, StatusTag::Frontier);
    doc
}

// ─── Round-trips ─────────────────────────────────────────────────────────

#[test]
fn json_roundtrip_is_byte_identical() {
    let doc = fixture_document();
    let json1 = serialize::to_json(&doc).unwrap();
    let back = serialize::from_json(&json1).unwrap();
    let json2 = serialize::to_json(&back).unwrap();
    assert_eq!(json1, json2);
    assert_eq!(doc.node_count(), back.node_count());
}

#[test]
fn msgpack_roundtrip_is_byte_identical() {
    let doc = fixture_document();
    let bytes1 = serialize::to_msgpack(&doc).unwrap();
    let back = serialize::from_msgpack(&bytes1).unwrap();
    let bytes2 = serialize::to_msgpack(&back).unwrap();
    assert_eq!(bytes1, bytes2);
}

#[test]
fn roundtrip_keeps_tags_transforms_and_geometry() {
    let doc = fixture_document();
    let back = serialize::from_json(&serialize::to_json(&doc).unwrap()).unwrap();

    let figure = back.index_of(NodeKey::intern("figure")).unwrap();
    assert!(back.has_tag(figure, StatusTag::Selected));
    assert!(back.has_tag(figure, StatusTag::Frontier));
    assert_eq!(
        back[figure].transform,
        doc[doc.index_of(NodeKey::intern("figure")).unwrap()].transform
    );

    let drop = back.index_of(NodeKey::intern("drop")).unwrap();
    let orig = doc.index_of(NodeKey::intern("drop")).unwrap();
    assert_eq!(back.path_data(drop), doc.path_data(orig));
    assert_eq!(back.global_bounds(drop), doc.global_bounds(orig));
}

#[test]
fn mirror_shape_is_type_key_children_props() {
    let doc = fixture_document();
    let value: serde_json::Value =
        serde_json::from_str(&serialize::to_json(&doc).unwrap()).unwrap();
    assert_eq!(value["type"], "doc");
    assert_eq!(value["children"][0]["type"], "identifier");
    assert_eq!(value["children"][0]["props"]["name"], "fixture");
    assert_eq!(value["children"][1]["key"], "board");
    assert_eq!(value["children"][1]["props"]["viewBox"]["width"], 400.0);
}

// ─── Rejections ──────────────────────────────────────────────────────────

#[test]
fn malformed_json_is_an_error() {
    assert!(matches!(
        serialize::from_json("{\"type\":"),
        Err(SerializeError::Json(_))
    ));
}

#[test]
fn duplicate_keys_are_rejected() {
    let json = r#"{"type":"canvas","key":"dup_canvas","children":[
        {"type":"group","key":"dup_g","children":[],"props":{}},
        {"type":"group","key":"dup_g","children":[],"props":{}}
    ],"props":{"viewBox":{"x":0.0,"y":0.0,"width":1.0,"height":1.0}}}"#;
    assert!(matches!(
        serialize::from_json(json),
        Err(SerializeError::DuplicateKey(_))
    ));
}

#[test]
fn unknown_tag_is_rejected() {
    let json = r#"{"type":"group","key":"tagged_g","children":[],"props":{"class":["hover"]}}"#;
    assert!(matches!(
        serialize::from_json(json),
        Err(SerializeError::UnknownTag(_))
    ));
}
