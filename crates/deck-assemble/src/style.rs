//! Style slides
//!
//! Templates carry one slide per interior style. Slides for styles the client
//! did not pick are removed, and `{{StyleN}}` placeholders are filled with the
//! N-th picked style's image covering the whole slide. This is a separate
//! policy from ordinary image placement: no scaling, no centering.

use crate::constants::STYLE_IMAGE_EXTENSIONS;
use crate::deck::{Deck, ShapePath};
use crate::images::{PreparedImage, prepare_image};
use crate::layout::full_bleed;
use crate::placeholder::{PlaceholderKind, scan_structured};
use crate::types::*;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \-/&]+").expect("separator pattern is valid"));

/// Canonical form of a style name: `"Mid-Century / Modern"` → `mid_century_modern`
pub fn normalize_style_name(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let joined = SEPARATORS.replace_all(&lowered, "_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_')
        .collect();
    kept.split('_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Directory of style images named `<normalized style>.<ext>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleLibrary {
    dir: PathBuf,
}

impl StyleLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Image file for a style, trying each known extension in turn
    pub async fn lookup(&self, style: &str) -> Option<PathBuf> {
        let stem = normalize_style_name(style);
        if stem.is_empty() {
            return None;
        }
        for ext in STYLE_IMAGE_EXTENSIONS {
            let candidate = self.dir.join(format!("{stem}.{ext}"));
            if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
                return Some(candidate);
            }
        }
        None
    }
}

/// Delete slides of styles that were not selected.
///
/// `style_slides` maps style names to 1-based slide numbers of the template
/// as loaded. Names are normalized on both sides. Returns the number of
/// slides removed.
pub fn filter_style_slides(
    deck: &mut Deck,
    style_slides: &BTreeMap<String, usize>,
    selected: &[String],
) -> Result<usize> {
    let wanted: BTreeSet<String> = selected
        .iter()
        .map(|s| normalize_style_name(s))
        .filter(|s| !s.is_empty())
        .collect();

    let known: BTreeSet<String> = style_slides.keys().map(|k| normalize_style_name(k)).collect();
    for style in wanted.difference(&known) {
        log::warn!("selected style '{style}' has no slide in the template");
    }

    let mut doomed: Vec<usize> = style_slides
        .iter()
        .filter(|(style, _)| !wanted.contains(&normalize_style_name(style)))
        .filter_map(|(_, &slide)| slide.checked_sub(1))
        .filter(|&index| index < deck.slide_count())
        .collect();
    doomed.sort_unstable();
    doomed.dedup();

    // Back to front keeps the remaining indices valid
    for &index in doomed.iter().rev() {
        deck.delete_slide(index)?;
    }

    log::info!(
        "style filter kept {} of {} style slides",
        style_slides.len().saturating_sub(doomed.len()),
        style_slides.len()
    );
    Ok(doomed.len())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleReport {
    pub filled: usize,
    pub blanked: usize,
}

/// Fill every `{{StyleN}}` with the N-th selected style's image.
///
/// Found images go behind everything else on the slide, covering it; the
/// placeholder shape is removed. A missing style (no N-th selection, no
/// library, no file, undecodable file) only blanks the placeholder text.
pub async fn fill_style_slides(
    deck: &mut Deck,
    selected: &[String],
    library: Option<&StyleLibrary>,
) -> StyleReport {
    let placeholders: Vec<_> = scan_structured(deck)
        .into_iter()
        .filter_map(|m| match m.kind {
            PlaceholderKind::Style { ordinal } => Some((m, ordinal)),
            _ => None,
        })
        .collect();

    let mut report = StyleReport::default();
    let mut fills: Vec<(usize, ShapePath, PreparedImage)> = Vec::new();
    let mut blanks: Vec<(usize, ShapePath)> = Vec::new();

    for (m, ordinal) in placeholders {
        let path = match (selected.get(ordinal - 1), library) {
            (Some(style), Some(library)) => library.lookup(style).await,
            _ => None,
        };
        let prepared = match path {
            Some(path) => match load_style_image(&path).await {
                Ok(prepared) => Some(prepared),
                Err(e) => {
                    log::warn!("style image {} unusable: {e}", path.display());
                    None
                }
            },
            None => {
                log::info!("no style image for {} on {}", m.raw_text, m.slide);
                None
            }
        };

        match prepared {
            Some(prepared) => fills.push((m.slide_index, m.shape, prepared)),
            None => blanks.push((m.slide_index, m.shape)),
        }
    }

    for (index, path) in &blanks {
        match deck.slide_mut(*index).map(|slide| slide.clear_shape_text(path)) {
            Some(Ok(())) => report.blanked += 1,
            Some(Err(e)) => log::error!("failed to blank style placeholder: {e}"),
            None => {}
        }
    }

    // Back to front so sibling indices stay valid
    fills.sort_by(|a, b| (a.0, &a.1).cmp(&(b.0, &b.1)));
    let mut placed = Vec::with_capacity(fills.len());
    for (index, path, prepared) in fills.into_iter().rev() {
        match deck.slide_mut(index).map(|slide| slide.remove_shape(&path)) {
            Some(Ok(_)) => placed.push((index, prepared)),
            Some(Err(e)) => log::error!("failed to remove style placeholder: {e}"),
            None => {}
        }
    }

    let frame = full_bleed(deck.slide_size());
    for (index, prepared) in placed {
        match deck.insert_background_picture(index, &prepared.picture, frame) {
            Ok(()) => report.filled += 1,
            Err(e) => log::error!("failed to insert style image: {e}"),
        }
    }

    if report.filled + report.blanked > 0 {
        log::info!(
            "style placeholders: {} filled, {} blanked",
            report.filled,
            report.blanked
        );
    }
    report
}

async fn load_style_image(path: &Path) -> Result<PreparedImage> {
    let bytes = tokio::fs::read(path).await?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    tokio::task::spawn_blocking(move || prepare_image(bytes, &name)).await?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_style_name() {
        assert_eq!(normalize_style_name("Art Deco"), "art_deco");
        assert_eq!(normalize_style_name("  Mid-Century "), "mid_century");
        assert_eq!(normalize_style_name("Shabby & Chic!"), "shabby_chic");
        assert_eq!(normalize_style_name("Asian / Zen"), "asian_zen");
        assert_eq!(normalize_style_name("__x__"), "x");
        assert_eq!(normalize_style_name("!!!"), "");
    }

    #[tokio::test]
    async fn test_lookup_tries_extensions_in_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("coastal.png"), b"png").unwrap();
        std::fs::write(dir.path().join("coastal.jpeg"), b"jpeg").unwrap();

        let library = StyleLibrary::new(dir.path());
        assert_eq!(
            library.lookup("Coastal").await,
            Some(dir.path().join("coastal.jpeg"))
        );
        assert_eq!(library.lookup("Rustic").await, None);
    }
}
