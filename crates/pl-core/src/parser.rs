//! Markup importer: restricted SVG → SceneGraph.
//!
//! Built on `winnow` 0.7. Accepts an `<svg viewBox>` root containing
//! `<g>`, `<path d>` and `<rect>` elements, each with optional `id` and
//! `transform` attributes. Other elements are skipped along with their
//! content. Path data is normalized by `kurbo` (relative commands, H/V, S/T
//! and arcs all come back as absolute M/L/Q/C/Z).
//!
//! The result is a standalone graph rooted at a Canvas; nothing is touched
//! in any live document until the caller adopts it.

use crate::id::NodeKey;
use crate::matrix::Matrix;
use crate::model::{Node, SceneGraph};
use crate::rect::Rect;
use crate::vector::Vector;
use kurbo::{BezPath, PathEl};
use petgraph::graph::NodeIndex;
use thiserror::Error;
use winnow::ascii::{alpha1, float, multispace0, multispace1};
use winnow::combinator::{alt, delimited, opt, preceded, repeat, separated, separated_pair};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::{take_till, take_while};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MarkupError {
    #[error("malformed markup at byte {offset}")]
    Syntax { offset: usize },
    #[error("expected an <svg> root element, found <{0}>")]
    NotSvg(String),
    #[error("closing tag </{found}> does not match <{expected}>")]
    MismatchedTag { expected: String, found: String },
    #[error("<{element}> is missing the `{attr}` attribute")]
    MissingAttribute {
        element: &'static str,
        attr: &'static str,
    },
    #[error("invalid number `{0}`")]
    InvalidNumber(String),
    #[error("invalid viewBox `{0}`")]
    InvalidViewBox(String),
    #[error("invalid transform `{0}`")]
    InvalidTransform(String),
    #[error("invalid path data: {0}")]
    PathData(String),
}

/// Parse markup text into a Canvas-rooted scene graph.
#[must_use = "parsing result should be used"]
pub fn parse_markup(input: &str) -> Result<SceneGraph, MarkupError> {
    let mut rest = input;
    skip_misc(&mut rest);
    let root = element.parse_next(&mut rest).map_err(|_| MarkupError::Syntax {
        offset: input.len() - rest.len(),
    })?;
    skip_misc(&mut rest);
    if !rest.is_empty() {
        return Err(MarkupError::Syntax {
            offset: input.len() - rest.len(),
        });
    }
    build_canvas(&root)
}

// ─── Element tree ───────────────────────────────────────────────────────

#[derive(Debug)]
struct Element<'a> {
    name: &'a str,
    attrs: Vec<(&'a str, &'a str)>,
    children: Vec<Element<'a>>,
    /// Name in the closing tag; `None` for a self-closing element.
    close: Option<&'a str>,
}

impl<'a> Element<'a> {
    fn attr(&self, name: &str) -> Option<&'a str> {
        self.attrs.iter().find(|(k, _)| *k == name).map(|(_, v)| *v)
    }

    fn check_close(&self) -> Result<(), MarkupError> {
        match self.close {
            Some(found) if found != self.name => Err(MarkupError::MismatchedTag {
                expected: self.name.to_string(),
                found: found.to_string(),
            }),
            _ => Ok(()),
        }
    }
}

/// Skip whitespace, text content, comments, processing instructions and
/// doctype declarations.
fn skip_misc(input: &mut &str) {
    loop {
        let before = *input;
        let s = input.trim_start();
        *input = if let Some(rest) = s.strip_prefix("<!--") {
            rest.find("-->").map_or("", |p| &rest[p + 3..])
        } else if let Some(rest) = s.strip_prefix("<?") {
            rest.find("?>").map_or("", |p| &rest[p + 2..])
        } else if let Some(rest) = s.strip_prefix("<!") {
            rest.find('>').map_or("", |p| &rest[p + 1..])
        } else if !s.starts_with('<') {
            s.find('<').map_or("", |p| &s[p..])
        } else {
            s
        };
        if *input == before {
            break;
        }
    }
}

fn xml_name<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_while(1.., |c: char| {
        c.is_alphanumeric() || matches!(c, '-' | '_' | ':' | '.')
    })
    .parse_next(input)
}

fn quoted<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    alt((
        delimited('"', take_till(0.., '"'), '"'),
        delimited('\'', take_till(0.., '\''), '\''),
    ))
    .parse_next(input)
}

fn attribute<'a>(input: &mut &'a str) -> ModalResult<(&'a str, &'a str)> {
    separated_pair(xml_name, (multispace0, '=', multispace0), quoted).parse_next(input)
}

fn element<'a>(input: &mut &'a str) -> ModalResult<Element<'a>> {
    let _ = '<'.parse_next(input)?;
    let name = xml_name.parse_next(input)?;
    let attrs: Vec<(&str, &str)> =
        repeat(0.., preceded(multispace1, attribute)).parse_next(input)?;
    let _ = multispace0.parse_next(input)?;
    if opt("/>").parse_next(input)?.is_some() {
        return Ok(Element {
            name,
            attrs,
            children: Vec::new(),
            close: None,
        });
    }
    let _ = '>'.parse_next(input)?;

    let mut children = Vec::new();
    loop {
        skip_misc(input);
        if input.is_empty() || input.starts_with("</") {
            break;
        }
        children.push(element.parse_next(input)?);
    }
    let close = delimited("</", xml_name, (multispace0, '>')).parse_next(input)?;
    Ok(Element {
        name,
        attrs,
        children,
        close: Some(close),
    })
}

// ─── Attribute values ───────────────────────────────────────────────────

fn number(input: &mut &str) -> ModalResult<f64> {
    float.parse_next(input)
}

/// A list separator: a comma with optional surrounding space, or bare space.
/// Always consumes input, so `separated` stops cleanly at the end of a list.
fn comma_ws(input: &mut &str) -> ModalResult<()> {
    alt(((multispace0, ',', multispace0).void(), multispace1.void())).parse_next(input)
}

fn number_list(input: &mut &str) -> ModalResult<Vec<f64>> {
    delimited(multispace0, separated(1.., number, comma_ws), multispace0).parse_next(input)
}

fn transform_item(input: &mut &str) -> ModalResult<Matrix> {
    let name = alpha1.parse_next(input)?;
    let args: Vec<f64> = delimited(
        (multispace0, '('),
        number_list,
        ')',
    )
    .parse_next(input)?;
    let m = match (name, args.as_slice()) {
        ("matrix", &[a, b, c, d, e, f]) => Matrix::new(a, b, c, d, e, f),
        ("translate", &[x]) => Matrix::translation(Vector::new(x, 0.0)),
        ("translate", &[x, y]) => Matrix::translation(Vector::new(x, y)),
        ("scale", &[s]) => Matrix::new(s, 0.0, 0.0, s, 0.0, 0.0),
        ("scale", &[sx, sy]) => Matrix::new(sx, 0.0, 0.0, sy, 0.0, 0.0),
        ("rotate", &[deg]) => Matrix::rotation(deg.to_radians(), Vector::ZERO),
        ("rotate", &[deg, cx, cy]) => Matrix::rotation(deg.to_radians(), Vector::new(cx, cy)),
        _ => return Err(ErrMode::Cut(ContextError::new())),
    };
    Ok(m)
}

fn transform_list(input: &mut &str) -> ModalResult<Matrix> {
    let items: Vec<Matrix> = delimited(
        multispace0,
        separated(0.., transform_item, comma_ws),
        multispace0,
    )
    .parse_next(input)?;
    // SVG lists apply right to left
    Ok(items
        .iter()
        .fold(Matrix::IDENTITY, |acc, m| acc.multiply(m)))
}

/// Parse an SVG `transform` attribute. Singular results are rejected.
pub fn parse_transform(text: &str) -> Result<Matrix, MarkupError> {
    let m = transform_list
        .parse(text)
        .map_err(|_| MarkupError::InvalidTransform(text.to_string()))?;
    if !m.is_invertible() {
        return Err(MarkupError::InvalidTransform(text.to_string()));
    }
    Ok(m)
}

fn parse_view_box(text: &str) -> Result<Rect, MarkupError> {
    match number_list.parse(text).as_deref() {
        Ok(&[x, y, w, h]) if w >= 0.0 && h >= 0.0 => Ok(Rect::new(x, y, w, h)),
        _ => Err(MarkupError::InvalidViewBox(text.to_string())),
    }
}

fn number_attr(el: &Element<'_>, name: &str) -> Result<Option<f64>, MarkupError> {
    el.attr(name)
        .map(|v| {
            v.trim()
                .parse::<f64>()
                .map_err(|_| MarkupError::InvalidNumber(v.to_string()))
        })
        .transpose()
}

// ─── Graph building ─────────────────────────────────────────────────────

fn build_canvas(svg: &Element<'_>) -> Result<SceneGraph, MarkupError> {
    if svg.name != "svg" {
        return Err(MarkupError::NotSvg(svg.name.to_string()));
    }
    svg.check_close()?;
    let view_box = match svg.attr("viewBox") {
        Some(v) => parse_view_box(v)?,
        None => Rect::new(
            0.0,
            0.0,
            number_attr(svg, "width")?.unwrap_or(0.0),
            number_attr(svg, "height")?.unwrap_or(0.0),
        ),
    };
    let mut canvas = Node::canvas(view_box);
    apply_common(&mut canvas, svg)?;
    let mut sg = SceneGraph::new(canvas);
    let root = sg.root;
    build_children(&mut sg, root, svg)?;
    Ok(sg)
}

fn apply_common(node: &mut Node, el: &Element<'_>) -> Result<(), MarkupError> {
    if let Some(id) = el.attr("id") {
        node.key = NodeKey::intern(id);
    }
    if let Some(t) = el.attr("transform") {
        node.transform = Some(parse_transform(t)?).filter(|m| !m.is_identity());
    }
    Ok(())
}

fn build_children(
    sg: &mut SceneGraph,
    parent: NodeIndex,
    el: &Element<'_>,
) -> Result<(), MarkupError> {
    for child in &el.children {
        child.check_close()?;
        match child.name {
            "g" => {
                let mut node = Node::group();
                apply_common(&mut node, child)?;
                let idx = sg.create(node);
                sg.mount(parent, &[idx]);
                build_children(sg, idx, child)?;
            }
            "path" => {
                let d = child.attr("d").ok_or(MarkupError::MissingAttribute {
                    element: "path",
                    attr: "d",
                })?;
                let mut node = Node::shape();
                apply_common(&mut node, child)?;
                let idx = sg.create(node);
                sg.mount(parent, &[idx]);
                build_path(sg, idx, d)?;
            }
            "rect" => {
                let missing = |attr| MarkupError::MissingAttribute {
                    element: "rect",
                    attr,
                };
                let x = number_attr(child, "x")?.unwrap_or(0.0);
                let y = number_attr(child, "y")?.unwrap_or(0.0);
                let w = number_attr(child, "width")?.ok_or_else(|| missing("width"))?;
                let h = number_attr(child, "height")?.ok_or_else(|| missing("height"))?;
                let mut node = Node::shape();
                apply_common(&mut node, child)?;
                let idx = sg.create(node);
                sg.mount(parent, &[idx]);
                let mut spline = PendingSpline::default();
                let corners = Rect::new(x, y, w, h).corners();
                spline.move_to(corners[0]);
                for &c in &corners[1..] {
                    spline.push(None, None, c);
                }
                spline.close();
                spline.flush(sg, idx);
            }
            other => log::debug!("skipping unsupported <{other}> element"),
        }
    }
    Ok(())
}

fn build_path(sg: &mut SceneGraph, shape: NodeIndex, d: &str) -> Result<(), MarkupError> {
    let path = BezPath::from_svg(d).map_err(|e| MarkupError::PathData(e.to_string()))?;
    let mut spline = PendingSpline::default();
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => {
                spline.flush(sg, shape);
                spline.move_to(p.into());
            }
            PathEl::LineTo(p) => spline.push(None, None, p.into()),
            PathEl::QuadTo(c, p) => spline.push(Some(c.into()), None, p.into()),
            PathEl::CurveTo(c1, c2, p) => spline.push(Some(c1.into()), Some(c2.into()), p.into()),
            PathEl::ClosePath => {
                spline.close();
                spline.flush(sg, shape);
            }
        }
    }
    spline.flush(sg, shape);
    Ok(())
}

#[derive(Debug, Clone, Copy)]
struct PendingSegment {
    anchor: Vector,
    handle_in: Option<Vector>,
    handle_out: Option<Vector>,
}

/// Segments of the subpath being read, mounted as a Spline on `flush`.
#[derive(Debug, Default)]
struct PendingSpline {
    segments: Vec<PendingSegment>,
    start: Option<Vector>,
    closed: bool,
}

impl PendingSpline {
    fn move_to(&mut self, p: Vector) {
        self.start = Some(p);
        self.segments.push(PendingSegment {
            anchor: p,
            handle_in: None,
            handle_out: None,
        });
    }

    /// A curve from the current point to `p`. `handle_out` belongs to the
    /// previous segment, `handle_in` to the new one.
    fn push(&mut self, handle_out: Option<Vector>, handle_in: Option<Vector>, p: Vector) {
        if self.segments.is_empty()
            && let Some(start) = self.start
        {
            self.move_to(start);
        }
        if let Some(last) = self.segments.last_mut()
            && handle_out.is_some()
        {
            last.handle_out = handle_out;
        }
        self.segments.push(PendingSegment {
            anchor: p,
            handle_in,
            handle_out: None,
        });
    }

    /// Mark closed, folding an explicit return-to-start into the closing curve.
    fn close(&mut self) {
        self.closed = true;
        let n = self.segments.len();
        if n > 1 && self.segments[n - 1].anchor.approx_eq(self.segments[0].anchor, 1e-9) {
            if let Some(last) = self.segments.pop() {
                self.segments[0].handle_in = last.handle_in;
            }
        }
    }

    fn flush(&mut self, sg: &mut SceneGraph, shape: NodeIndex) {
        let segments = std::mem::take(&mut self.segments);
        let closed = std::mem::replace(&mut self.closed, false);
        if segments.is_empty() {
            return;
        }
        let spline = sg.create(Node::spline(closed));
        sg.mount(shape, &[spline]);
        for seg in segments {
            let idx = sg.create(Node::segment());
            sg.mount(spline, &[idx]);
            let anchor = sg.create(Node::anchor(seg.anchor));
            sg.mount(idx, &[anchor]);
            if let Some(h) = seg.handle_in {
                let h = sg.create(Node::handle_in(h));
                sg.mount(idx, &[h]);
            }
            if let Some(h) = seg.handle_out {
                let h = sg.create(Node::handle_out(h));
                sg.mount(idx, &[h]);
            }
        }
    }
}
