//! Removal of slides left with nothing to show

use crate::deck::Deck;
use crate::images::SlideStatus;
use crate::types::*;

/// Delete every slide that had an unresolved image placeholder and holds no
/// picture.
///
/// Picture presence is re-checked on the current deck rather than trusted
/// from `statuses`, and slides are looked up by identity, so earlier
/// deletions do not confuse later ones. Returns the deleted slides.
pub fn prune(deck: &mut Deck, statuses: &[SlideStatus]) -> Result<Vec<SlideRef>> {
    let mut doomed: Vec<usize> = statuses
        .iter()
        .filter(|status| status.had_unresolved)
        .filter_map(|status| deck.position_of(&status.slide))
        .filter(|&index| deck.slide(index).is_some_and(|slide| !slide.has_picture()))
        .collect();
    doomed.sort_unstable();
    doomed.dedup();

    let mut removed = Vec::with_capacity(doomed.len());
    for &index in doomed.iter().rev() {
        removed.push(deck.delete_slide(index)?);
    }
    removed.reverse();

    if !removed.is_empty() {
        log::info!("pruned {} empty slides", removed.len());
    }
    Ok(removed)
}
