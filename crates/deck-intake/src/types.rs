use deck_assemble::AssembleError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
    #[error("Document error: {0}")]
    Assemble(#[from] AssembleError),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Malformed event: {0}")]
    Event(String),
    #[error("Platform error: {0}")]
    Platform(String),
}

pub type Result<T> = std::result::Result<T, IntakeError>;

/// Where an uploaded file lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetLocation {
    /// A direct link delivered with the event
    Url(String),
    /// Only the platform's asset id; needs a lookup or an authenticated download
    Handle,
}

/// One file attached to a form column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRef {
    pub id: String,
    pub filename: String,
    /// Lowercase, without the dot
    pub extension: String,
    pub location: AssetLocation,
}

impl AssetRef {
    pub fn new(id: impl Into<String>, filename: impl Into<String>) -> Self {
        let filename = filename.into();
        let extension = extension_of(&filename);
        Self {
            id: id.into(),
            filename,
            extension,
            location: AssetLocation::Handle,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.location = AssetLocation::Url(url.into());
        self
    }
}

/// Lowercase extension of a file name, empty when there is none
pub fn extension_of(name: &str) -> String {
    std::path::Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default()
}
