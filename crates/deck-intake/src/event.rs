//! Webhook payload model
//!
//! The platform posts either a handshake (`{"challenge": ...}`) or an
//! envelope carrying one `event`. Column values stay as raw JSON; the form
//! mapping and the categorizer pick out what they need.

use crate::types::*;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Top-level webhook body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookEnvelope {
    #[serde(default)]
    pub challenge: Option<Value>,
    #[serde(default)]
    pub event: Option<Event>,
}

/// What a webhook body asks of us
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// Handshake; echo the value back verbatim
    Challenge(Value),
    Event(Event),
    /// Neither a handshake nor an event
    Empty,
}

impl WebhookEnvelope {
    pub fn parse(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body).map_err(|e| IntakeError::Event(e.to_string()))
    }

    /// A challenge wins over an event delivered in the same body
    pub fn into_delivery(self) -> Delivery {
        match (self.challenge, self.event) {
            (Some(challenge), _) => Delivery::Challenge(challenge),
            (None, Some(event)) => Delivery::Event(event),
            (None, None) => Delivery::Empty,
        }
    }
}

/// One item change on the board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(rename = "pulseId", deserialize_with = "id_string")]
    pub item_id: String,
    #[serde(default)]
    pub trigger_time: Option<String>,
    #[serde(default)]
    pub pulse_name: Option<String>,
    #[serde(default)]
    pub column_values: Map<String, Value>,
}

/// Platform ids arrive as numbers or strings
fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) if !s.is_empty() => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected an item id, got {other}"
        ))),
    }
}

impl Event {
    /// Ledger key: the item id, or `id@triggerTime` when each trigger counts
    /// as its own delivery
    pub fn key(&self, per_trigger: bool) -> String {
        match (&self.trigger_time, per_trigger) {
            (Some(time), true) => format!("{}@{}", self.item_id, time),
            _ => self.item_id.clone(),
        }
    }

    pub fn column(&self, id: &str) -> Option<&Value> {
        self.column_values.get(id)
    }

    /// Files attached to a file column, in upload order.
    ///
    /// Entries without an id or a name are skipped.
    pub fn assets(&self, column: &str) -> Vec<AssetRef> {
        let Some(value) = self.column(column) else {
            return Vec::new();
        };
        file_entries(value)
            .iter()
            .filter_map(asset_from_entry)
            .collect()
    }
}

fn file_entries(value: &Value) -> Vec<Value> {
    if let Some(files) = value.get("files").and_then(Value::as_array) {
        return files.clone();
    }
    // Some deliveries carry the file list as a JSON string under `value`
    match value.get("value") {
        Some(Value::String(raw)) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Array(files)) => files,
            Ok(inner) => inner
                .get("files")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
            Err(_) => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn asset_from_entry(entry: &Value) -> Option<AssetRef> {
    let id = ["assetId", "id"]
        .iter()
        .find_map(|key| match entry.get(*key)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        });
    let name = entry.get("name").and_then(Value::as_str).filter(|n| !n.is_empty());

    let (Some(id), Some(name)) = (id, name) else {
        log::warn!("skipping file entry without id or name: {entry}");
        return None;
    };

    let mut asset = AssetRef::new(id, name);
    if let Some(ext) = entry
        .get("extension")
        .and_then(Value::as_str)
        .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
    {
        asset.extension = ext;
    }
    if let Some(url) = ["public_url", "url"]
        .iter()
        .find_map(|key| entry.get(*key).and_then(Value::as_str))
        .filter(|u| !u.is_empty() && *u != "null")
    {
        asset = asset.with_url(url);
    }
    Some(asset)
}
