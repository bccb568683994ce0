//! Image placeholder resolution
//!
//! Runs in three phases so the shape tree is never mutated while it is
//! being scanned:
//! 1. plan: find every `{{CategoryN}}` and pick its candidate image
//! 2. load: fetch and decode each distinct candidate once
//! 3. apply: replace or blank each placeholder in slide order
//!
//! A candidate that cannot be fetched or decoded takes the same path as a
//! placeholder with no candidate at all.

mod loader;
mod prepare;
mod select;

pub use loader::{ImageLoader, LocalImageLoader, load_local};
pub use prepare::{PreparedImage, prepare_image};
pub use select::{Selection, select_candidate};

use crate::deck::{Deck, ShapePath};
use crate::layout::{Rect, fit_image};
use crate::options::AssemblyOptions;
use crate::placeholder::{PlaceholderKind, PlaceholderMatch, scan_structured};
use crate::types::*;
use std::sync::Arc;

/// Per-slide outcome, consumed by pruning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideStatus {
    pub slide: SlideRef,
    pub had_unresolved: bool,
    pub has_picture: bool,
}

impl SlideStatus {
    /// Nothing to show: a placeholder failed and no picture is present
    pub fn is_empty(&self) -> bool {
        self.had_unresolved && !self.has_picture
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageReport {
    pub replaced: usize,
    pub unresolved: usize,
    /// One entry per slide that held an image placeholder, in slide order
    pub slides: Vec<SlideStatus>,
    pub slides_marked_empty: Vec<SlideRef>,
}

struct Planned {
    slide_index: usize,
    shape: ShapePath,
    bounds: Option<Rect>,
    raw_text: String,
    candidate: Option<ImageSource>,
}

/// Resolve every image placeholder in the deck
pub async fn resolve_images(
    deck: &mut Deck,
    images: &CategorizedImages,
    loader: &dyn ImageLoader,
    options: &AssemblyOptions,
) -> Result<ImageReport> {
    let plan = plan(deck, images);
    if plan.is_empty() {
        return Ok(ImageReport::default());
    }

    let loaded = load_candidates(&plan, loader).await;
    Ok(apply(deck, &plan, &loaded, options))
}

fn plan(deck: &Deck, images: &CategorizedImages) -> Vec<Planned> {
    scan_structured(deck)
        .into_iter()
        .filter_map(|m: PlaceholderMatch| {
            let PlaceholderKind::Image { category, ordinal } = &m.kind else {
                return None;
            };
            let candidate = select_candidate(images, category, ordinal - 1).map(|(source, tier)| {
                log::debug!("{} -> {} ({tier:?})", m.raw_text, source.display_name());
                source.clone()
            });
            if candidate.is_none() {
                log::info!("no image available for {} on {}", m.raw_text, m.slide);
            }
            Some(Planned {
                slide_index: m.slide_index,
                shape: m.shape,
                bounds: m.bounds,
                raw_text: m.raw_text,
                candidate,
            })
        })
        .collect()
}

type Loaded = Vec<(ImageSource, Option<Arc<PreparedImage>>)>;

/// Fetch and decode each distinct candidate once; failures become `None`
async fn load_candidates(plan: &[Planned], loader: &dyn ImageLoader) -> Loaded {
    let mut loaded: Loaded = Vec::new();
    for source in plan.iter().filter_map(|p| p.candidate.as_ref()) {
        if loaded.iter().any(|(s, _)| s == source) {
            continue;
        }
        let prepared = match load_one(source, loader).await {
            Ok(prepared) => Some(Arc::new(prepared)),
            Err(e) => {
                log::warn!("image {} unavailable: {e}", source.display_name());
                None
            }
        };
        loaded.push((source.clone(), prepared));
    }
    loaded
}

async fn load_one(source: &ImageSource, loader: &dyn ImageLoader) -> Result<PreparedImage> {
    let bytes = loader.load(source).await?;
    let name = source.display_name();
    tokio::task::spawn_blocking(move || prepare_image(bytes, &name)).await?
}

fn apply(
    deck: &mut Deck,
    plan: &[Planned],
    loaded: &Loaded,
    options: &AssemblyOptions,
) -> ImageReport {
    let slide_size = deck.slide_size();
    let mut report = ImageReport::default();
    let mut unresolved_slides: Vec<usize> = Vec::new();

    for item in plan {
        let prepared = item.candidate.as_ref().and_then(|source| {
            loaded
                .iter()
                .find(|(s, _)| s == source)
                .and_then(|(_, p)| p.clone())
        });

        let placed = match prepared {
            Some(prepared) => {
                let bounds = item.bounds.unwrap_or_else(|| slide_size.bounds());
                let placement = fit_image(
                    (prepared.width_px, prepared.height_px),
                    &bounds,
                    slide_size,
                    options.max_image_width_px,
                    options.dpi,
                );
                match deck.replace_with_picture(
                    item.slide_index,
                    &item.shape,
                    &prepared.picture,
                    placement.rect,
                ) {
                    Ok(()) => true,
                    Err(e) => {
                        log::error!("failed to place image for {}: {e}", item.raw_text);
                        false
                    }
                }
            }
            None => false,
        };

        if placed {
            report.replaced += 1;
            continue;
        }

        report.unresolved += 1;
        if !unresolved_slides.contains(&item.slide_index) {
            unresolved_slides.push(item.slide_index);
        }
        let cleared = deck
            .slide_mut(item.slide_index)
            .map(|slide| slide.clear_shape_text(&item.shape));
        if let Some(Err(e)) = cleared {
            log::error!("failed to blank {}: {e}", item.raw_text);
        }
    }

    let mut visited: Vec<usize> = plan.iter().map(|p| p.slide_index).collect();
    visited.dedup();
    for index in visited {
        let Some(slide) = deck.slide(index) else {
            continue;
        };
        let status = SlideStatus {
            slide: slide.slide_ref(),
            had_unresolved: unresolved_slides.contains(&index),
            has_picture: slide.has_picture(),
        };
        if status.is_empty() {
            report.slides_marked_empty.push(status.slide.clone());
        }
        report.slides.push(status);
    }

    log::info!(
        "resolved {} image placeholders, {} unresolved, {} slides left empty",
        report.replaced,
        report.unresolved,
        report.slides_marked_empty.len()
    );
    report
}
