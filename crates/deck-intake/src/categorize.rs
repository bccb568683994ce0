//! Uploaded files to categorized images

use crate::event::Event;
use crate::extract::{ExtractRules, FileKind, extract_images_blocking};
use crate::options::IntakeOptions;
use crate::platform::AssetSource;
use crate::types::*;
use deck_assemble::{CategorizedImages, ImageSource};
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};

/// Turns an event's file columns into [`CategorizedImages`]
pub struct Categorizer<'a> {
    source: &'a dyn AssetSource,
    options: &'a IntakeOptions,
    scratch: Option<&'a Path>,
}

impl<'a> Categorizer<'a> {
    pub fn new(source: &'a dyn AssetSource, options: &'a IntakeOptions) -> Self {
        Self {
            source,
            options,
            scratch: None,
        }
    }

    /// Write downloaded images to `dir` and refer to them by path
    pub fn with_scratch_dir(mut self, dir: &'a Path) -> Self {
        self.scratch = Some(dir);
        self
    }

    /// Every configured file column, in configuration order.
    ///
    /// A failing asset is logged and contributes nothing; a column that ends
    /// up with no images is left out.
    pub async fn categorize(&self, event: &Event) -> CategorizedImages {
        let mut images = CategorizedImages::new();

        for mapping in &self.options.file_columns {
            let assets = event.assets(&mapping.column);
            if assets.is_empty() {
                continue;
            }
            log::debug!("{} files in column {}", assets.len(), mapping.column);

            // `buffered` yields in submission order whatever order fetches finish in
            let resolved: Vec<Vec<ImageSource>> = stream::iter(assets)
                .map(|asset| async move {
                    match self.resolve(&asset).await {
                        Ok(found) => found,
                        Err(e) => {
                            log::warn!("failed to process {}: {e}", asset.filename);
                            Vec::new()
                        }
                    }
                })
                .buffered(self.options.fetch_concurrency.max(1))
                .collect()
                .await;

            let found: Vec<ImageSource> = resolved.into_iter().flatten().collect();
            if found.is_empty() {
                continue;
            }
            log::info!("{}: {} images", mapping.category, found.len());
            images.extend(&mapping.category, found);
        }

        images
    }

    /// Images behind one asset
    pub async fn resolve(&self, asset: &AssetRef) -> Result<Vec<ImageSource>> {
        let rules = self.rules();
        let kind = rules.kind_of(&asset.extension);
        if kind == FileKind::Unsupported {
            log::warn!("unsupported file type: {}", asset.filename);
            return Ok(Vec::new());
        }

        // Stable links to images need no download; containers always do
        if kind == FileKind::Image {
            if let Some(link) = self.stable_link(asset).await {
                return Ok(vec![ImageSource::Url(link)]);
            }
        }

        let bytes = self.source.download(asset).await?;
        if kind == FileKind::Image {
            return Ok(vec![self.keep_image(asset, bytes).await?]);
        }

        let name = container_name(asset);
        let found = extract_images_blocking(name, bytes, rules).await?;
        log::info!("extracted {} images from {}", found.len(), asset.filename);
        Ok(found)
    }

    fn rules(&self) -> ExtractRules {
        ExtractRules {
            image_extensions: self.options.image_extensions.clone(),
            max_archive_depth: self.options.max_archive_depth,
            max_entry_bytes: self.options.max_entry_bytes,
        }
    }

    async fn stable_link(&self, asset: &AssetRef) -> Option<String> {
        if let AssetLocation::Url(link) = &asset.location {
            if self.options.is_stable_url(link) {
                return Some(link.clone());
            }
        }
        match self.source.public_url(asset).await {
            Ok(Some(link)) if self.options.is_stable_url(&link) => Some(link),
            Ok(_) => None,
            Err(e) => {
                log::warn!("link lookup failed for {}: {e}", asset.filename);
                None
            }
        }
    }

    async fn keep_image(&self, asset: &AssetRef, bytes: Vec<u8>) -> Result<ImageSource> {
        let Some(dir) = self.scratch else {
            return Ok(ImageSource::bytes(asset.filename.clone(), bytes));
        };
        let path = scratch_path(dir, asset);
        tokio::fs::write(&path, bytes).await?;
        Ok(ImageSource::Path(path))
    }
}

/// File name carrying the declared extension, so extraction dispatches on it
fn container_name(asset: &AssetRef) -> String {
    if extension_of(&asset.filename) == asset.extension {
        asset.filename.clone()
    } else {
        format!("{}.{}", asset.filename, asset.extension)
    }
}

fn scratch_path(dir: &Path, asset: &AssetRef) -> PathBuf {
    let id: String = asset
        .id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    dir.join(format!("asset_{id}.{}", asset.extension))
}

/// Convenience for [`Categorizer::categorize`] without a scratch directory
pub async fn categorize(
    event: &Event,
    source: &dyn AssetSource,
    options: &IntakeOptions,
) -> CategorizedImages {
    Categorizer::new(source, options).categorize(event).await
}
