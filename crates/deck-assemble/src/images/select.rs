use crate::types::*;

/// Which tier of the fallback chain produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// The category holds the requested ordinal
    Direct,
    /// Ordinal wrapped within the category
    CategoryWrap,
    /// Category missing or empty; ordinal wrapped across all images
    GlobalWrap,
}

/// Pick the image for `{{<category><index + 1>}}`.
///
/// Tiers: the category's own image, then the category wrapped by modulo,
/// then the global pool wrapped by modulo. Empty lists are skipped, so this
/// never divides by zero; `None` means no image is available at all.
pub fn select_candidate<'a>(
    images: &'a CategorizedImages,
    category: &str,
    index: usize,
) -> Option<(&'a ImageSource, Selection)> {
    if let Some(list) = images.get(category).filter(|l| !l.is_empty()) {
        return Some(match list.get(index) {
            Some(source) => (source, Selection::Direct),
            None => (&list[index % list.len()], Selection::CategoryWrap),
        });
    }

    let pool = images.global_pool();
    if pool.is_empty() {
        return None;
    }
    Some((pool[index % pool.len()], Selection::GlobalWrap))
}
