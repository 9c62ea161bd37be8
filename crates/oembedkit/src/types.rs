//! Core types for oembedkit

use crate::error::ParseError;
use crate::services::Service;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default bound on redirect and discovery hops
pub const DEFAULT_MAX_REDIRECTS: u32 = 3;

/// A single resolution attempt handed to a [`Fetcher`](crate::Fetcher)
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// Target URL (the page to embed, not the provider endpoint)
    pub url: String,
    /// Matched service, if any
    pub service: Option<Service>,
    /// Timeout applied to each outbound request
    pub timeout: Duration,
    /// Maximum redirect and discovery hops
    pub max_redirects: u32,
    /// Glob patterns a URL must match (empty: no restriction)
    pub allow_list: Vec<String>,
    /// Glob patterns a URL must not match
    pub deny_list: Vec<String>,
    /// Extra headers sent with every outbound request
    pub headers: BTreeMap<String, String>,
    /// Custom User-Agent
    pub user_agent: Option<String>,
}

impl FetchRequest {
    /// Create a new request with the given URL and default limits
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            service: None,
            timeout: DEFAULT_TIMEOUT,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            allow_list: Vec::new(),
            deny_list: Vec::new(),
            headers: BTreeMap::new(),
            user_agent: None,
        }
    }

    /// Resolve through a provider service
    pub fn service(mut self, service: Service) -> Self {
        self.service = Some(service);
        self
    }

    /// Set the per-request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the hop limit
    pub fn max_redirects(mut self, max_redirects: u32) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    /// Add an allow-list pattern
    pub fn allow(mut self, pattern: impl Into<String>) -> Self {
        self.allow_list.push(pattern.into());
        self
    }

    /// Add a deny-list pattern
    pub fn deny(mut self, pattern: impl Into<String>) -> Self {
        self.deny_list.push(pattern.into());
        self
    }

    /// Add an outbound header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Keys every resolved embed carries, `null` when the provider omits them
pub const ENVELOPE_KEYS: &[&str] = &["type", "version", "title"];

/// oEmbed record as a JSON object
///
/// Provider documents are kept exactly as decoded: no field is renamed,
/// retyped or dropped. The accessors read the well-known oEmbed fields when
/// they hold strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmbedResult(Map<String, Value>);

impl EmbedResult {
    /// Empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// `{"version": "1.0", "type": "link", "title": null}`, the base of a
    /// record synthesized from page metadata
    pub fn link() -> Self {
        let mut map = Map::new();
        map.insert("version".to_string(), Value::from("1.0"));
        map.insert("type".to_string(), Value::from("link"));
        map.insert("title".to_string(), Value::Null);
        Self(map)
    }

    /// Wrap a decoded provider document; anything but an object is rejected
    pub fn from_value(value: Value) -> Result<Self, ParseError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(ParseError::Shape(format!(
                "expected an object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Raw value of any field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Field value when it is a string
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Set a field, returning the previous value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Set a field, builder style
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Resource type (`link`, `photo`, `video`, `rich`)
    pub fn kind(&self) -> Option<&str> {
        self.get_str("type")
    }

    pub fn version(&self) -> Option<&str> {
        self.get_str("version")
    }

    pub fn title(&self) -> Option<&str> {
        self.get_str("title")
    }

    pub fn provider_name(&self) -> Option<&str> {
        self.get_str("provider_name")
    }

    pub fn provider_url(&self) -> Option<&str> {
        self.get_str("provider_url")
    }

    pub fn description(&self) -> Option<&str> {
        self.get_str("description")
    }

    pub fn thumbnail_url(&self) -> Option<&str> {
        self.get_str("thumbnail_url")
    }

    /// Set by the resolver once the embed is fetched (RFC 1123, UTC)
    pub fn fetch_date(&self) -> Option<&str> {
        self.get_str("fetch_date")
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Final record handed to callers
    ///
    /// [`ENVELOPE_KEYS`] come first and default to `null`; provider fields
    /// follow unchanged, then `fetch_date`.
    pub fn into_envelope(self, fetch_date: &str) -> Self {
        let mut map: Map<String, Value> = ENVELOPE_KEYS
            .iter()
            .map(|key| (key.to_string(), Value::Null))
            .collect();
        map.extend(self.0);
        map.insert("fetch_date".to_string(), Value::from(fetch_date));
        Self(map)
    }
}

impl From<Map<String, Value>> for EmbedResult {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Result envelope of a successful resolution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    /// The normalized embed
    pub embed: EmbedResult,
    /// Key of the matched service, if any
    pub service_name: Option<String>,
    /// Input URL as given
    pub url: String,
    /// Input URL after [`clean_url`](crate::clean_url)
    pub url_cleaned: String,
    /// Completion time (RFC 1123, UTC)
    pub fetch_date: String,
    /// Elapsed time, human readable
    pub time_taken: String,
    /// Elapsed time in milliseconds
    #[serde(rename = "timeTaken_ms")]
    pub time_taken_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_builder() {
        let req = FetchRequest::new("https://example.com")
            .timeout(Duration::from_secs(2))
            .max_redirects(5)
            .allow("example.com/**")
            .deny("example.com/private/**")
            .header("accept-language", "en");

        assert_eq!(req.url, "https://example.com");
        assert!(req.service.is_none());
        assert_eq!(req.timeout, Duration::from_secs(2));
        assert_eq!(req.max_redirects, 5);
        assert_eq!(req.allow_list, vec!["example.com/**"]);
        assert_eq!(req.deny_list, vec!["example.com/private/**"]);
        assert_eq!(req.headers.get("accept-language").map(String::as_str), Some("en"));
    }

    #[test]
    fn test_request_defaults() {
        let req = FetchRequest::new("https://example.com");
        assert_eq!(req.timeout, DEFAULT_TIMEOUT);
        assert_eq!(req.max_redirects, DEFAULT_MAX_REDIRECTS);
        assert!(req.allow_list.is_empty());
    }

    #[test]
    fn test_embed_keeps_provider_document() {
        let doc = json!({
            "version": "1.0",
            "type": "rich",
            "title": 42,
            "html": "<iframe></iframe>",
            "width": 300,
            "height": null,
            "thumbnail_url": null,
            "provider_name": 42,
            "thumbnail_height": "300"
        });
        let embed = EmbedResult::from_value(doc.clone()).unwrap();

        assert_eq!(serde_json::to_value(&embed).unwrap(), doc);
        assert_eq!(embed.kind(), Some("rich"));
        assert_eq!(embed.title(), None);
        assert_eq!(embed.get("title"), Some(&json!(42)));
        assert_eq!(embed.get("thumbnail_url"), Some(&Value::Null));
        assert_eq!(embed.provider_name(), None);
    }

    #[test]
    fn test_embed_numeric_version_untouched() {
        let embed = EmbedResult::from_value(json!({"version": 1.0, "type": "video"})).unwrap();
        assert_eq!(embed.version(), None);
        assert_eq!(embed.get("version"), Some(&json!(1.0)));
    }

    #[test]
    fn test_envelope_defaults_and_order() {
        let embed = EmbedResult::from_value(json!({"html": "<p>", "title": "T"}))
            .unwrap()
            .into_envelope("Sat, 17 Oct 2026 10:00:00 GMT");

        let keys: Vec<&str> = embed.as_map().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["type", "version", "title", "html", "fetch_date"]);
        assert_eq!(embed.get("type"), Some(&Value::Null));
        assert_eq!(embed.title(), Some("T"));
        assert_eq!(embed.fetch_date(), Some("Sat, 17 Oct 2026 10:00:00 GMT"));
    }

    #[test]
    fn test_link_shape() {
        let embed = EmbedResult::link().with("provider_name", "Example");
        assert_eq!(
            serde_json::to_value(&embed).unwrap(),
            json!({
                "type": "link",
                "version": "1.0",
                "title": null,
                "provider_name": "Example"
            })
        );
    }

    #[test]
    fn test_embed_rejects_non_object() {
        let err = EmbedResult::from_value(json!(["not", "an", "object"])).unwrap_err();
        assert_eq!(err.to_string(), "unexpected document shape: expected an object, got an array");
    }

    #[test]
    fn test_resolution_serialization_keys() {
        let resolution = Resolution {
            embed: EmbedResult::default(),
            service_name: None,
            url: "https://www.example.com".to_string(),
            url_cleaned: "example.com".to_string(),
            fetch_date: "Sat, 17 Oct 2026 10:00:00 GMT".to_string(),
            time_taken: "12ms".to_string(),
            time_taken_ms: 12,
        };
        let json = serde_json::to_string(&resolution).unwrap();
        assert!(json.contains("\"serviceName\":null"));
        assert!(json.contains("\"urlCleaned\":\"example.com\""));
        assert!(json.contains("\"fetchDate\""));
        assert!(json.contains("\"timeTaken\":\"12ms\""));
        assert!(json.contains("\"timeTaken_ms\":12"));
    }
}
