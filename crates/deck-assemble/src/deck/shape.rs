//! Shape listing and geometry

use crate::layout::Rect;
use crate::package::xml::Element;
use std::fmt;

/// Location of a shape: child indices from the shape tree down through groups
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapePath(pub Vec<usize>);

impl ShapePath {
    /// Index of the shape inside its parent container
    pub fn last(&self) -> Option<usize> {
        self.0.last().copied()
    }

    pub fn parent(&self) -> &[usize] {
        match self.0.split_last() {
            Some((_, parent)) => parent,
            None => &[],
        }
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for ShapePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|i| i.to_string()).collect();
        write!(f, "/{}", parts.join("/"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    /// Shape with a text body
    Text,
    Picture,
    Group,
    /// Tables, charts, connectors, shapes without text
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShapeInfo {
    pub path: ShapePath,
    pub kind: ShapeKind,
    pub id: Option<u32>,
    pub name: String,
    /// Frame in slide coordinates, if the shape declares one
    pub bounds: Option<Rect>,
    /// All text of the shape, runs concatenated without separators
    pub text: String,
}

/// Maps a group's child coordinate space onto slide coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Transform {
    sx: f64,
    sy: f64,
    tx: f64,
    ty: f64,
}

impl Transform {
    pub(crate) const IDENTITY: Transform = Transform {
        sx: 1.0,
        sy: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    /// Transform for the children of `group`, composed with this one
    pub(crate) fn enter_group(&self, group: &Element) -> Transform {
        let Some(xfrm) = group.find(&["grpSpPr", "xfrm"]) else {
            return *self;
        };
        let (Some(off), Some(ext)) = (read_point(xfrm, "off", "x", "y"), read_point(xfrm, "ext", "cx", "cy"))
        else {
            return *self;
        };
        let ch_off = read_point(xfrm, "chOff", "x", "y").unwrap_or(off);
        let ch_ext = read_point(xfrm, "chExt", "cx", "cy").unwrap_or(ext);

        let gx = if ch_ext.0 != 0 { ext.0 as f64 / ch_ext.0 as f64 } else { 1.0 };
        let gy = if ch_ext.1 != 0 { ext.1 as f64 / ch_ext.1 as f64 } else { 1.0 };
        let gtx = off.0 as f64 - ch_off.0 as f64 * gx;
        let gty = off.1 as f64 - ch_off.1 as f64 * gy;

        Transform {
            sx: self.sx * gx,
            sy: self.sy * gy,
            tx: self.sx * gtx + self.tx,
            ty: self.sy * gty + self.ty,
        }
    }

    pub(crate) fn to_slide(&self, local: Rect) -> Rect {
        Rect::new(
            (local.x as f64 * self.sx + self.tx).round() as i64,
            (local.y as f64 * self.sy + self.ty).round() as i64,
            (local.width as f64 * self.sx).round() as i64,
            (local.height as f64 * self.sy).round() as i64,
        )
    }

    pub(crate) fn to_local(&self, slide: Rect) -> Rect {
        let sx = if self.sx != 0.0 { self.sx } else { 1.0 };
        let sy = if self.sy != 0.0 { self.sy } else { 1.0 };
        Rect::new(
            ((slide.x as f64 - self.tx) / sx).round() as i64,
            ((slide.y as f64 - self.ty) / sy).round() as i64,
            (slide.width as f64 / sx).round() as i64,
            (slide.height as f64 / sy).round() as i64,
        )
    }
}

pub(crate) fn classify(el: &Element) -> Option<ShapeKind> {
    match el.local_name() {
        "sp" if el.child("txBody").is_some() => Some(ShapeKind::Text),
        "sp" | "graphicFrame" | "cxnSp" | "contentPart" => Some(ShapeKind::Other),
        "pic" => Some(ShapeKind::Picture),
        "grpSp" => Some(ShapeKind::Group),
        _ => None,
    }
}

/// Non-visual properties element (`cNvPr`) of a shape
pub(crate) fn non_visual_props(el: &Element) -> Option<&Element> {
    el.elements()
        .find(|child| child.local_name().starts_with("nv"))
        .and_then(|nv| nv.child("cNvPr"))
}

/// Frame of a shape in its container's coordinate space
pub(crate) fn local_bounds(el: &Element) -> Option<Rect> {
    let xfrm = match el.local_name() {
        "grpSp" => el.find(&["grpSpPr", "xfrm"]),
        "graphicFrame" => el.child("xfrm"),
        _ => el.find(&["spPr", "xfrm"]),
    }?;
    let (x, y) = read_point(xfrm, "off", "x", "y")?;
    let (width, height) = read_point(xfrm, "ext", "cx", "cy")?;
    Some(Rect::new(x, y, width, height))
}

fn read_point(xfrm: &Element, child: &str, a: &str, b: &str) -> Option<(i64, i64)> {
    let el = xfrm.child(child)?;
    Some((el.attr(a)?.parse().ok()?, el.attr(b)?.parse().ok()?))
}

/// Text of every `t` element below `el`, in document order
pub(crate) fn shape_text(el: &Element) -> String {
    let mut out = String::new();
    collect_run_text(el, &mut out);
    out
}

fn collect_run_text(el: &Element, out: &mut String) {
    for child in el.elements() {
        if child.is("t") {
            out.push_str(&child.text());
        } else {
            collect_run_text(child, out);
        }
    }
}
