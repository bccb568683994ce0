//! Deck I/O operations

use super::Deck;
use crate::types::*;
use std::path::Path;

/// Load a deck from disk
pub async fn load_deck(path: impl AsRef<Path>) -> Result<Deck> {
    let path = path.as_ref().to_owned();
    let bytes = tokio::fs::read(&path).await?;
    let deck = tokio::task::spawn_blocking(move || Deck::from_bytes(&bytes)).await??;
    log::info!(
        "loaded template {} ({} slides)",
        path.display(),
        deck.slide_count()
    );
    Ok(deck)
}

/// Save the assembled deck
pub async fn save_deck(deck: Deck, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref().to_owned();
    let bytes = tokio::task::spawn_blocking(move || deck.into_bytes()).await??;
    tokio::fs::write(&path, bytes).await?;
    log::info!("saved deck to {}", path.display());
    Ok(())
}
