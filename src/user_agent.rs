//! Shared User-Agent string for upstream search, probe and download requests.

/// Project URL for User-Agent identification (good citizenship; RFC 9308).
const PROJECT_UA_URL: &str = "https://github.com/fierce/imgsearch";

/// Default User-Agent for every outgoing request (identifies the tool).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("imgsearch/{version} (image-search-proxy; +{PROJECT_UA_URL})")
}
