//! Placeholder-driven slide deck assembly
//!
//! A template deck is filled in a fixed order:
//! 1. style slides the client did not pick are removed
//! 2. `{{StyleN}}` placeholders get full-bleed style images
//! 3. `{{CategoryN}}` placeholders get fitted images
//! 4. literal labels in text runs get their values
//! 5. slides left without any picture after a failed placeholder are pruned
//!
//! Images go before text so a label value can never turn into, or break, an
//! image placeholder.

pub mod constants;
pub mod deck;
pub mod images;
pub mod layout;
mod options;
pub mod package;
pub mod placeholder;
mod prune;
mod style;
mod substitute;
mod types;

pub use deck::{Deck, PictureData, ShapeInfo, ShapeKind, ShapePath, Slide, load_deck, save_deck};
pub use images::{ImageLoader, ImageReport, LocalImageLoader, SlideStatus, resolve_images};
pub use options::*;
pub use prune::prune;
pub use style::{
    StyleLibrary, StyleReport, fill_style_slides, filter_style_slides, normalize_style_name,
};
pub use substitute::{substitute, substitute_text};
pub use types::*;

/// Everything one event contributes to a deck
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssemblyInput {
    pub labels: LabelMap,
    pub images: CategorizedImages,
    /// Selected style names, in the client's order
    pub styles: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssemblyReport {
    pub style_slides_removed: usize,
    pub styles: StyleReport,
    pub images: ImageReport,
    pub text_replacements: usize,
    pub pruned: Vec<SlideRef>,
    pub slide_count: usize,
}

/// Run every assembly pass over `deck`
pub async fn assemble(
    deck: &mut Deck,
    input: &AssemblyInput,
    loader: &dyn ImageLoader,
    options: &AssemblyOptions,
) -> Result<AssemblyReport> {
    options.validate()?;

    // Without a selection there is nothing to filter by; keep every slide
    let style_slides_removed = if input.styles.is_empty() {
        0
    } else {
        filter_style_slides(deck, &options.style_slides, &input.styles)?
    };

    let library = options.styles_dir.as_ref().map(StyleLibrary::new);
    let styles = fill_style_slides(deck, &input.styles, library.as_ref()).await;

    let images = resolve_images(deck, &input.images, loader, options).await?;
    let text_replacements = substitute(deck, &input.labels, options.label_order);

    let pruned = if options.prune_empty_slides {
        prune(deck, &images.slides)?
    } else {
        Vec::new()
    };

    Ok(AssemblyReport {
        style_slides_removed,
        styles,
        images,
        text_replacements,
        pruned,
        slide_count: deck.slide_count(),
    })
}
