use crate::constants::{DEFAULT_DPI, DEFAULT_MAX_IMAGE_WIDTH_PX};
use crate::types::*;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Deck assembly configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AssemblyOptions {
    // Input
    pub template_path: PathBuf,

    // Image placement
    /// Source images wider than this are scaled down before any other fitting
    pub max_image_width_px: Option<u32>,
    /// Pixel density used to convert image pixels to slide units
    pub dpi: f64,

    // Text substitution
    pub label_order: LabelOrder,

    // Style slides
    /// Directory holding one image per style, named after the normalized style
    pub styles_dir: Option<PathBuf>,
    /// Style name to 1-based slide number; slides of unselected styles are removed
    pub style_slides: BTreeMap<String, usize>,

    // Pruning
    /// Delete slides whose image placeholders all went unresolved
    pub prune_empty_slides: bool,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            template_path: PathBuf::from("template1.pptx"),
            max_image_width_px: Some(DEFAULT_MAX_IMAGE_WIDTH_PX),
            dpi: DEFAULT_DPI,
            label_order: LabelOrder::LongestFirst,
            styles_dir: Some(PathBuf::from("styleGuide")),
            style_slides: default_style_slides(),
            prune_empty_slides: true,
        }
    }
}

/// The style catalogue of the stock template: one slide per style, 10..=26
pub fn default_style_slides() -> BTreeMap<String, usize> {
    [
        ("art deco", 10),
        ("asian zen", 11),
        ("coastal", 12),
        ("contemporary", 13),
        ("country", 14),
        ("eclectic", 15),
        ("industrial", 16),
        ("mid-century", 17),
        ("minimalist", 18),
        ("modern", 19),
        ("rustic", 20),
        ("scandinavian", 21),
        ("shabby chic", 22),
        ("traditional", 23),
        ("transitional", 24),
        ("tropical", 25),
        ("urban", 26),
    ]
    .into_iter()
    .map(|(name, slide)| (name.to_string(), slide))
    .collect()
}

impl AssemblyOptions {
    /// Load options from JSON file
    #[cfg(feature = "serde")]
    pub async fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let options = serde_json::from_slice(&bytes)
            .map_err(|e| AssembleError::Config(format!("Failed to parse config: {}", e)))?;
        Ok(options)
    }

    /// Save options to JSON file
    #[cfg(feature = "serde")]
    pub async fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| AssembleError::Config(format!("Failed to serialize config: {}", e)))?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Validate the options
    pub fn validate(&self) -> Result<()> {
        if self.template_path.as_os_str().is_empty() {
            return Err(AssembleError::Config("No template specified".to_string()));
        }

        if !self.dpi.is_finite() || self.dpi <= 0.0 {
            return Err(AssembleError::Config(format!(
                "DPI must be a positive number, got {}",
                self.dpi
            )));
        }

        if self.max_image_width_px == Some(0) {
            return Err(AssembleError::Config(
                "Maximum image width must be at least 1 pixel".to_string(),
            ));
        }

        if let Some((style, _)) = self.style_slides.iter().find(|(_, slide)| **slide == 0) {
            return Err(AssembleError::Config(format!(
                "Style '{}' maps to slide 0; slide numbers start at 1",
                style
            )));
        }

        Ok(())
    }
}
