//! Frames that placeholders inherit from their slide layout and master
//!
//! A `p:ph` shape without its own `a:xfrm` takes the frame of the matching
//! layout placeholder, and a layout placeholder without one takes the frame
//! of the master placeholder of the same kind.

use super::shape::local_bounds;
use crate::layout::Rect;
use crate::package::Package;
use crate::package::rels::{Relationships, resolve_target};
use crate::package::xml::{self, Element};
use std::collections::HashMap;

/// Type and index of a shape's `p:ph` element
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PlaceholderKey {
    pub ph_type: String,
    pub idx: u32,
}

impl PlaceholderKey {
    pub(crate) fn of(shape: &Element) -> Option<Self> {
        let ph = shape
            .elements()
            .find(|child| child.local_name().starts_with("nv"))
            .and_then(|nv| nv.find(&["nvPr", "ph"]))?;
        Some(Self {
            ph_type: ph.attr("type").unwrap_or("obj").to_string(),
            idx: ph.attr("idx").and_then(|idx| idx.parse().ok()).unwrap_or(0),
        })
    }

    /// Masters only carry title, body, date, footer and slide number placeholders
    fn master_type(&self) -> &str {
        match self.ph_type.as_str() {
            "title" | "ctrTitle" => "title",
            "dt" | "ftr" | "sldNum" => self.ph_type.as_str(),
            _ => "body",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FrameEntry {
    key: PlaceholderKey,
    rect: Option<Rect>,
}

/// Placeholder frames of one slide's layout and master
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct InheritedFrames {
    layout: Vec<FrameEntry>,
    master: Vec<FrameEntry>,
}

impl InheritedFrames {
    /// Layout placeholder by index, then by type; the master by type when the
    /// layout declares no frame either
    pub(crate) fn resolve(&self, key: &PlaceholderKey) -> Option<Rect> {
        let layout = self
            .layout
            .iter()
            .find(|entry| entry.key.idx == key.idx)
            .or_else(|| self.layout.iter().find(|entry| entry.key.ph_type == key.ph_type));
        if let Some(rect) = layout.and_then(|entry| entry.rect) {
            return Some(rect);
        }

        let wanted = layout.map(|entry| &entry.key).unwrap_or(key).master_type();
        self.master
            .iter()
            .find(|entry| entry.key.master_type() == wanted)
            .and_then(|entry| entry.rect)
    }
}

/// Parsed layout and master parts, shared across the slides of one deck
pub(crate) type FrameCache = HashMap<String, Vec<FrameEntry>>;

pub(crate) fn inherited_frames(
    package: &Package,
    slide_part: &str,
    slide_rels: &Relationships,
    cache: &mut FrameCache,
) -> InheritedFrames {
    let Some(layout_part) = related_part(slide_part, slide_rels, "slideLayout") else {
        return InheritedFrames::default();
    };
    let layout = frames_of(package, &layout_part, cache);

    let master = match package.relationships(&layout_part) {
        Ok(rels) => related_part(&layout_part, &rels, "slideMaster")
            .map(|master_part| frames_of(package, &master_part, cache))
            .unwrap_or_default(),
        Err(e) => {
            log::warn!("unreadable relationships of {layout_part}: {e}");
            Vec::new()
        }
    };

    InheritedFrames { layout, master }
}

fn related_part(source: &str, rels: &Relationships, kind: &str) -> Option<String> {
    rels.of_type(kind)
        .find(|rel| !rel.external)
        .map(|rel| resolve_target(source, &rel.target))
}

fn frames_of(package: &Package, part: &str, cache: &mut FrameCache) -> Vec<FrameEntry> {
    if let Some(entries) = cache.get(part) {
        return entries.clone();
    }

    let parsed = package
        .part(part)
        .map(xml::parse)
        .transpose()
        .map(|root| root.map(|root| placeholder_frames(&root)).unwrap_or_default());
    let entries = match parsed {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("ignoring placeholder frames of {part}: {e}");
            Vec::new()
        }
    };
    cache.insert(part.to_string(), entries.clone());
    entries
}

fn placeholder_frames(root: &Element) -> Vec<FrameEntry> {
    let Some(tree) = root.find(&["cSld", "spTree"]) else {
        return Vec::new();
    };
    tree.elements()
        .filter_map(|shape| {
            Some(FrameEntry {
                key: PlaceholderKey::of(shape)?,
                rect: local_bounds(shape),
            })
        })
        .collect()
}
