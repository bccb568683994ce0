//! The project-management platform: asset links, file downloads, client
//! profiles and plain image fetches

use crate::types::*;
use async_trait::async_trait;
use deck_assemble::{AssembleError, ImageLoader, ImageSource, LabelMap};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;

/// Where uploaded files come from
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// A link the loader can fetch directly, if the platform has one
    async fn public_url(&self, asset: &AssetRef) -> Result<Option<String>>;

    /// Raw file bytes through the authenticated API
    async fn download(&self, asset: &AssetRef) -> Result<Vec<u8>>;

    /// Extra labels known about the client, keyed by address
    async fn profile(&self, _email: &str) -> Result<LabelMap> {
        Ok(LabelMap::new())
    }
}

/// Platform endpoints and limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// GraphQL endpoint; files download from `{api_url}/file/{id}`
    pub api_url: String,
    /// Per-request timeout for lookups and downloads
    pub timeout_secs: u64,
    /// Client profile endpoint, queried with `?email=`
    pub profile_url: Option<String>,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.monday.com/v2".to_string(),
            timeout_secs: 20,
            profile_url: None,
        }
    }
}

const ASSET_QUERY: &str = "query($ids: [ID!]) { assets(ids: $ids) { id name public_url url file_extension } }";

/// Profile fields copied into labels
const PROFILE_LABELS: &[(&str, &str)] = &[
    ("area_size", "Q. Area"),
    ("project_name", "Q. Project Name"),
    ("residential_type", "Q.Nature of the project"),
];

pub struct PlatformClient {
    client: reqwest::Client,
    config: PlatformConfig,
    api_key: String,
}

impl PlatformClient {
    pub fn new(config: PlatformConfig, api_key: impl Into<String>) -> Result<Self> {
        if config.api_url.is_empty() {
            return Err(IntakeError::Config("No platform API URL".to_string()));
        }
        url::Url::parse(&config.api_url)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;
        Ok(Self {
            client,
            config,
            api_key: api_key.into(),
        })
    }

    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    fn file_url(&self, asset: &AssetRef) -> String {
        format!("{}/file/{}", self.config.api_url.trim_end_matches('/'), asset.id)
    }

    /// Links to the API itself need our credentials
    fn needs_auth(&self, link: &str) -> bool {
        link.starts_with(self.config.api_url.trim_end_matches('/'))
    }

    async fn graphql(&self, query: &str, variables: Value) -> Result<Value> {
        let resp = self
            .client
            .post(&self.config.api_url)
            .header("Authorization", &self.api_key)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?
            .error_for_status()?;

        let body: Value = resp.json().await?;
        if let Some(errors) = body.get("errors") {
            return Err(IntakeError::Platform(format!("GraphQL errors: {errors}")));
        }
        body.get("data")
            .cloned()
            .ok_or_else(|| IntakeError::Platform("missing 'data' in response".to_string()))
    }

    async fn get_bytes(&self, link: &str) -> Result<Vec<u8>> {
        let mut request = self.client.get(link);
        if self.needs_auth(link) {
            request = request.header("Authorization", &self.api_key);
        }
        let resp = request.send().await?.error_for_status()?;
        Ok(resp.bytes().await?.to_vec())
    }
}

#[async_trait]
impl AssetSource for PlatformClient {
    async fn public_url(&self, asset: &AssetRef) -> Result<Option<String>> {
        let data = self.graphql(ASSET_QUERY, json!({ "ids": [asset.id] })).await?;
        Ok(asset_link(&data))
    }

    async fn download(&self, asset: &AssetRef) -> Result<Vec<u8>> {
        log::info!("downloading {} through the platform API", asset.filename);
        self.get_bytes(&self.file_url(asset)).await
    }

    async fn profile(&self, email: &str) -> Result<LabelMap> {
        let Some(endpoint) = &self.config.profile_url else {
            return Ok(LabelMap::new());
        };
        let resp = self
            .client
            .get(endpoint)
            .query(&[("email", email)])
            .send()
            .await?
            .error_for_status()?;
        let body: Value = resp.json().await?;
        Ok(profile_labels(&body))
    }
}

#[async_trait]
impl ImageLoader for PlatformClient {
    async fn load(&self, source: &ImageSource) -> deck_assemble::Result<Vec<u8>> {
        if let Some(bytes) = deck_assemble::images::load_local(source).await? {
            return Ok(bytes);
        }
        let ImageSource::Url(link) = source else {
            return Err(AssembleError::ImageUnavailable(source.to_string()));
        };
        self.get_bytes(link)
            .await
            .map_err(|e| AssembleError::ImageUnavailable(format!("{link}: {e}")))
    }
}

/// First usable link of an `assets` lookup
pub fn asset_link(data: &Value) -> Option<String> {
    let asset = data.get("assets")?.as_array()?.first()?;
    ["public_url", "url"]
        .iter()
        .filter_map(|key| asset.get(*key).and_then(Value::as_str))
        .find(|link| !link.is_empty() && *link != "null")
        .map(str::to_string)
}

/// Labels from a profile response.
///
/// Accepts `data.quotationdetails` and `data[0].quotationdetails`; anything
/// but `"status": "success"` yields no labels.
pub fn profile_labels(body: &Value) -> LabelMap {
    let mut labels = LabelMap::new();
    if body.get("status").and_then(Value::as_str) != Some("success") {
        return labels;
    }
    let data = match body.get("data") {
        Some(Value::Array(items)) => items.first(),
        other => other,
    };
    let Some(details) = data.and_then(|d| d.get("quotationdetails")) else {
        return labels;
    };

    for (field, label) in PROFILE_LABELS {
        let value = match details.get(*field) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        if value.is_some() {
            labels.insert(*label, value);
        }
    }
    labels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_link_prefers_public_url() {
        let data = json!({"assets": [{"public_url": "https://b.s3.amazonaws.com/x.png", "url": "https://app/x"}]});
        assert_eq!(asset_link(&data).as_deref(), Some("https://b.s3.amazonaws.com/x.png"));

        let data = json!({"assets": [{"public_url": null, "url": "https://app/x"}]});
        assert_eq!(asset_link(&data).as_deref(), Some("https://app/x"));

        assert_eq!(asset_link(&json!({"assets": []})), None);
    }

    #[test]
    fn test_profile_labels_both_shapes() {
        let object = json!({"status": "success", "data": {"quotationdetails": {"area_size": "120 m2", "project_name": ""}}});
        let labels = profile_labels(&object);
        assert_eq!(labels.get("Q. Area"), Some("120 m2"));
        assert_eq!(labels.len(), 1);

        let array = json!({"status": "success", "data": [{"quotationdetails": {"residential_type": "Villa"}}]});
        assert_eq!(profile_labels(&array).get("Q.Nature of the project"), Some("Villa"));

        assert!(profile_labels(&json!({"status": "error"})).is_empty());
    }

    #[test]
    fn test_client_rejects_bad_url() {
        let config = PlatformConfig {
            api_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(PlatformClient::new(config, "key").is_err());
    }

    #[test]
    fn test_only_api_links_carry_credentials() {
        let client = PlatformClient::new(PlatformConfig::default(), "key").unwrap();
        let asset = AssetRef::new("42", "plan.pdf");
        assert_eq!(client.file_url(&asset), "https://api.monday.com/v2/file/42");
        assert!(client.needs_auth(&client.file_url(&asset)));
        assert!(!client.needs_auth("https://bucket.s3.amazonaws.com/plan.pdf"));
    }
}
