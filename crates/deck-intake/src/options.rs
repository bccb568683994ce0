use crate::form::FormMapping;
use crate::types::*;
use serde::{Deserialize, Serialize};

/// A file column and the image category its uploads belong to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnCategory {
    pub column: String,
    pub category: String,
}

impl ColumnCategory {
    pub fn new(column: &str, category: &str) -> Self {
        Self {
            column: column.to_string(),
            category: category.to_string(),
        }
    }
}

/// Event intake configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeOptions {
    // Assets
    /// File columns, in the order their categories are filled
    pub file_columns: Vec<ColumnCategory>,
    /// Hosts whose links can be handed to the loader as they are
    pub stable_hosts: Vec<String>,
    /// Extensions taken as images without extraction
    pub image_extensions: Vec<String>,
    /// How many archives deep extraction follows nested zips
    pub max_archive_depth: usize,
    /// Largest size one archive entry may inflate to
    pub max_entry_bytes: u64,
    /// Assets of one column resolved at the same time
    pub fetch_concurrency: usize,

    // Form
    pub form: FormMapping,
    /// Recipient when the form carries no address
    pub default_recipient: Option<String>,
    /// Count every trigger of an item as its own delivery
    pub key_per_trigger: bool,
}

impl Default for IntakeOptions {
    fn default() -> Self {
        Self {
            file_columns: vec![
                ColumnCategory::new("files", "Layout"),
                ColumnCategory::new("fileb3p8t108", "Elevation"),
                ColumnCategory::new("fileh7us51cr", "Image"),
                ColumnCategory::new("files3", "Inspiration"),
            ],
            stable_hosts: vec!["amazonaws.com".to_string()],
            image_extensions: ["jpg", "jpeg", "png"].map(String::from).to_vec(),
            max_archive_depth: 3,
            max_entry_bytes: 64 * 1024 * 1024,
            fetch_concurrency: 4,
            form: FormMapping::default(),
            default_recipient: None,
            key_per_trigger: false,
        }
    }
}

impl IntakeOptions {
    /// Load options from JSON file
    pub async fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let options = serde_json::from_slice(&bytes)
            .map_err(|e| IntakeError::Config(format!("Failed to parse config: {}", e)))?;
        Ok(options)
    }

    /// Save options to JSON file
    pub async fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| IntakeError::Config(format!("Failed to serialize config: {}", e)))?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Validate the options
    pub fn validate(&self) -> Result<()> {
        if self.fetch_concurrency == 0 {
            return Err(IntakeError::Config(
                "Fetch concurrency must be at least 1".to_string(),
            ));
        }

        if self.max_entry_bytes == 0 {
            return Err(IntakeError::Config(
                "Archive entry limit must be at least 1 byte".to_string(),
            ));
        }

        if let Some(entry) = self
            .file_columns
            .iter()
            .find(|c| c.column.is_empty() || c.category.is_empty())
        {
            return Err(IntakeError::Config(format!(
                "File column mapping {:?} -> {:?} is incomplete",
                entry.column, entry.category
            )));
        }

        if let Some(entry) = self
            .file_columns
            .iter()
            .find(|c| !c.category.chars().all(|ch| ch.is_ascii_alphabetic()))
        {
            return Err(IntakeError::Config(format!(
                "Category '{}' must be letters only to be addressable as {{{{{}N}}}}",
                entry.category, entry.category
            )));
        }

        if self.image_extensions.is_empty() {
            return Err(IntakeError::Config(
                "At least one image extension is required".to_string(),
            ));
        }

        Ok(())
    }

    /// Category of a file column, if it is one we collect
    pub fn category_of(&self, column: &str) -> Option<&str> {
        self.file_columns
            .iter()
            .find(|c| c.column == column)
            .map(|c| c.category.as_str())
    }

    pub fn is_image_extension(&self, ext: &str) -> bool {
        self.image_extensions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(ext))
    }

    /// Whether a link points at storage that serves it without our credentials
    pub fn is_stable_url(&self, link: &str) -> bool {
        let Ok(parsed) = url::Url::parse(link) else {
            return false;
        };
        let Some(host) = parsed.host_str() else {
            return false;
        };
        self.stable_hosts.iter().any(|stable| {
            host.eq_ignore_ascii_case(stable)
                || host
                    .to_ascii_lowercase()
                    .ends_with(&format!(".{}", stable.to_ascii_lowercase()))
        })
    }
}
