//! Upstream result entries and the normalized items served to callers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One entry of an upstream result page, as returned by the search API.
///
/// Only the fields the proxy forwards are kept; everything else is dropped.
/// Text fields may be absent or `null` upstream.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawItem {
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub image: Option<Value>,
    #[serde(default)]
    pub display_link: Option<String>,
    #[serde(default)]
    pub mime: Option<String>,
    #[serde(default)]
    pub file_format: Option<String>,
}

/// A search result as stored in the cache and returned to clients.
///
/// `id` is assigned by the aggregator: 1-based, contiguous within a query,
/// and never changed once the item is cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultItem {
    pub id: u64,
    pub link: String,
    pub title: String,
    /// Opaque image metadata (dimensions, thumbnail, context link).
    pub image: Value,
    pub display_link: String,
    pub mime: Option<String>,
    pub file_format: Option<String>,
}

impl ResultItem {
    /// Normalizes an upstream entry, assigning it the given sequential id.
    #[must_use]
    pub fn from_raw(id: u64, raw: RawItem) -> Self {
        Self {
            id,
            link: raw.link.unwrap_or_default(),
            title: raw.title.unwrap_or_default(),
            image: raw
                .image
                .filter(|value| !value.is_null())
                .unwrap_or_else(|| Value::Object(Map::new())),
            display_link: raw.display_link.unwrap_or_default(),
            mime: raw.mime,
            file_format: raw.file_format,
        }
    }
}
