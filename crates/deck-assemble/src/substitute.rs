//! Literal label substitution over text runs

use crate::deck::Deck;
use crate::types::*;
use regex::Regex;

/// A label with a value, compiled for matching
struct LabelPattern<'a> {
    label: &'a str,
    value: &'a str,
    braced: String,
    braced_folded: Regex,
    bare_folded: Regex,
}

impl<'a> LabelPattern<'a> {
    fn new(label: &'a str, value: &'a str) -> Option<Self> {
        let escaped = regex::escape(label);
        Some(Self {
            label,
            value,
            braced: format!("{{{{{label}}}}}"),
            braced_folded: Regex::new(&format!(r"(?i)\{{\{{\s*{escaped}\s*\}}\}}")).ok()?,
            bare_folded: Regex::new(&format!("(?i){escaped}")).ok()?,
        })
    }

    /// The first form present in the run's original text: the braced form
    /// `{{label}}` wins over the bare label, and an exact match wins over a
    /// case-insensitive one
    fn form_in(&self, pieces: &[Piece]) -> Option<Form> {
        [Form::Braced, Form::BracedFolded, Form::Bare, Form::BareFolded]
            .into_iter()
            .find(|&form| {
                pieces
                    .iter()
                    .any(|piece| !piece.inserted && !self.matches(form, &piece.text).is_empty())
            })
    }

    fn matches(&self, form: Form, text: &str) -> Vec<(usize, usize)> {
        let exact = |needle: &str| -> Vec<(usize, usize)> {
            text.match_indices(needle)
                .map(|(at, m)| (at, at + m.len()))
                .collect()
        };
        let folded = |re: &Regex| -> Vec<(usize, usize)> {
            re.find_iter(text).map(|m| (m.start(), m.end())).collect()
        };
        match form {
            Form::Braced => exact(&self.braced),
            Form::BracedFolded => folded(&self.braced_folded),
            Form::Bare => exact(self.label),
            Form::BareFolded => folded(&self.bare_folded),
        }
    }

    /// Replace inside original text only; returns whether anything was replaced
    fn apply(&self, pieces: &mut Vec<Piece>) -> bool {
        let Some(form) = self.form_in(pieces) else {
            return false;
        };

        let mut out = Vec::with_capacity(pieces.len() + 2);
        for piece in pieces.drain(..) {
            if piece.inserted {
                out.push(piece);
                continue;
            }
            let mut last = 0;
            for (start, end) in self.matches(form, &piece.text) {
                if start > last {
                    out.push(Piece::original(&piece.text[last..start]));
                }
                out.push(Piece {
                    text: self.value.to_string(),
                    inserted: true,
                });
                last = end;
            }
            if last < piece.text.len() {
                out.push(Piece::original(&piece.text[last..]));
            }
        }
        *pieces = out;
        true
    }
}

#[derive(Debug, Clone, Copy)]
enum Form {
    Braced,
    BracedFolded,
    Bare,
    BareFolded,
}

/// Stretch of a run: template text, or a value already put in
struct Piece {
    text: String,
    inserted: bool,
}

impl Piece {
    fn original(text: &str) -> Self {
        Self {
            text: text.to_string(),
            inserted: false,
        }
    }
}

/// Apply every pattern to one run. Values put in by one label are never
/// matched by a later one. Returns the number of labels replaced.
fn substitute_run(text: &mut String, patterns: &[LabelPattern<'_>]) -> usize {
    let mut pieces = vec![Piece::original(text)];
    let replaced = patterns
        .iter()
        .filter(|pattern| pattern.apply(&mut pieces))
        .count();
    if replaced > 0 {
        *text = pieces.into_iter().map(|piece| piece.text).collect();
    }
    replaced
}

/// Labels with a usable value, in the order they are applied
fn ordered_patterns(labels: &LabelMap, order: LabelOrder) -> Vec<LabelPattern<'_>> {
    let mut patterns: Vec<LabelPattern<'_>> = labels
        .iter()
        .filter_map(|(label, value)| {
            let value = value.filter(|v| !v.is_empty())?;
            if label.is_empty() {
                return None;
            }
            LabelPattern::new(label, value)
        })
        .collect();

    if order == LabelOrder::LongestFirst {
        // Stable, so equal lengths keep insertion order
        patterns.sort_by_key(|p| std::cmp::Reverse(p.label.chars().count()));
    }
    patterns
}

/// Replace literal labels in every run of every slide.
///
/// Labels whose value is missing or empty are skipped, so their text stays
/// visible in the output. Returns the number of (run, label) replacements.
pub fn substitute(deck: &mut Deck, labels: &LabelMap, order: LabelOrder) -> usize {
    let patterns = ordered_patterns(labels, order);
    if patterns.is_empty() {
        return 0;
    }

    let mut replacements = 0;
    for slide in deck.slides_mut() {
        slide.visit_runs_mut(|text| {
            replacements += substitute_run(text, &patterns);
        });
    }

    log::debug!("substituted {replacements} label occurrences");
    replacements
}

/// Apply the same rules to a single string
pub fn substitute_text(text: &str, labels: &LabelMap, order: LabelOrder) -> String {
    let mut out = text.to_string();
    substitute_run(&mut out, &ordered_patterns(labels, order));
    out
}
