//! Placeholder grammar
//!
//! Two families are recognized:
//! - literal labels, supplied by the caller and matched as substrings of runs
//!   (see [`crate::substitute`])
//! - structured placeholders, a shape whose whole trimmed text is
//!   `{{<Letters><Digits>}}`, e.g. `{{Layout2}}`
//!
//! The structured category `style` is reserved for the style fill engine and
//! never produced as an image placeholder.

use crate::constants::STYLE_CATEGORY;
use crate::deck::{Deck, ShapeKind, ShapePath};
use crate::layout::Rect;
use crate::types::*;
use regex::Regex;
use std::sync::LazyLock;

static STRUCTURED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\{\{([A-Za-z]+)(\d+)\}\}$").expect("structured placeholder pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaceholderKind {
    /// A configured label found in text
    Literal { label: String },
    /// `{{CategoryN}}`; `ordinal` is 1-based
    Image { category: String, ordinal: usize },
    /// `{{StyleN}}`
    Style { ordinal: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaceholderMatch {
    pub kind: PlaceholderKind,
    pub raw_text: String,
    pub slide: SlideRef,
    /// Slide position at scan time
    pub slide_index: usize,
    pub shape: ShapePath,
    /// Shape frame in slide coordinates, if declared
    pub bounds: Option<Rect>,
}

/// Parse a shape's text as a structured placeholder
pub fn parse_structured(text: &str) -> Option<PlaceholderKind> {
    let caps = STRUCTURED.captures(text.trim())?;
    let category = caps.get(1)?.as_str();
    let ordinal: usize = caps.get(2)?.as_str().parse().ok()?;
    if ordinal == 0 {
        return None;
    }
    if category.eq_ignore_ascii_case(STYLE_CATEGORY) {
        Some(PlaceholderKind::Style { ordinal })
    } else {
        Some(PlaceholderKind::Image {
            category: category.to_string(),
            ordinal,
        })
    }
}

/// Parse a shape's text as an image placeholder; `{{StyleN}}` is not one
pub fn parse_image_placeholder(text: &str) -> Option<(String, usize)> {
    match parse_structured(text)? {
        PlaceholderKind::Image { category, ordinal } => Some((category, ordinal)),
        _ => None,
    }
}

/// Parse a shape's text as a style placeholder
pub fn parse_style_placeholder(text: &str) -> Option<usize> {
    match parse_structured(text)? {
        PlaceholderKind::Style { ordinal } => Some(ordinal),
        _ => None,
    }
}

/// Every structured placeholder in slide order, then shape order
pub fn scan_structured(deck: &Deck) -> Vec<PlaceholderMatch> {
    let mut found = Vec::new();
    for (slide_index, slide) in deck.slides().iter().enumerate() {
        for shape in slide.shapes() {
            if shape.kind != ShapeKind::Text {
                continue;
            }
            let Some(kind) = parse_structured(&shape.text) else {
                continue;
            };
            found.push(PlaceholderMatch {
                kind,
                raw_text: shape.text.trim().to_string(),
                slide: slide.slide_ref(),
                slide_index,
                shape: shape.path,
                bounds: shape.bounds,
            });
        }
    }
    found
}

/// Every shape containing one of `labels`, matched case-insensitively
pub fn scan_literals<'a>(
    deck: &Deck,
    labels: impl IntoIterator<Item = &'a str>,
) -> Vec<PlaceholderMatch> {
    let labels: Vec<(&str, String)> = labels
        .into_iter()
        .filter(|l| !l.is_empty())
        .map(|l| (l, l.to_lowercase()))
        .collect();

    let mut found = Vec::new();
    for (slide_index, slide) in deck.slides().iter().enumerate() {
        for shape in slide.shapes() {
            if shape.kind == ShapeKind::Group {
                continue;
            }
            let folded = shape.text.to_lowercase();
            for (label, lowered) in &labels {
                if folded.contains(lowered.as_str()) {
                    found.push(PlaceholderMatch {
                        kind: PlaceholderKind::Literal {
                            label: label.to_string(),
                        },
                        raw_text: shape.text.clone(),
                        slide: slide.slide_ref(),
                        slide_index,
                        shape: shape.path.clone(),
                        bounds: shape.bounds,
                    });
                }
            }
        }
    }
    found
}

/// Distinct `{{...}}` markers that are not structured placeholders.
///
/// Useful for listing the literal labels a template expects.
pub fn find_braced_labels(deck: &Deck) -> Vec<String> {
    static BRACED: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\{\{\s*([^{}]+?)\s*\}\}").expect("braced label pattern is valid")
    });

    let mut labels: Vec<String> = Vec::new();
    for slide in deck.slides() {
        for shape in slide.shapes() {
            for caps in BRACED.captures_iter(&shape.text) {
                let Some(whole) = caps.get(0) else { continue };
                if parse_structured(whole.as_str()).is_some() {
                    continue;
                }
                if let Some(label) = caps.get(1).map(|m| m.as_str().to_string()) {
                    if !labels.contains(&label) {
                        labels.push(label);
                    }
                }
            }
        }
    }
    labels
}
