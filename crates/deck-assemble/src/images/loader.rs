use crate::types::*;
use async_trait::async_trait;

/// Obtains the raw bytes behind an [`ImageSource`]
#[async_trait]
pub trait ImageLoader: Send + Sync {
    async fn load(&self, source: &ImageSource) -> Result<Vec<u8>>;
}

/// Loads local files and in-memory images; URLs are unavailable
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalImageLoader;

#[async_trait]
impl ImageLoader for LocalImageLoader {
    async fn load(&self, source: &ImageSource) -> Result<Vec<u8>> {
        load_local(source)
            .await?
            .ok_or_else(|| AssembleError::ImageUnavailable(format!("no fetcher for {source}")))
    }
}

/// Bytes of a path or in-memory source; `None` for anything remote
pub async fn load_local(source: &ImageSource) -> Result<Option<Vec<u8>>> {
    match source {
        ImageSource::Path(path) => Ok(Some(tokio::fs::read(path).await?)),
        ImageSource::Bytes { data, .. } => Ok(Some(data.to_vec())),
        ImageSource::Url(_) => Ok(None),
    }
}
