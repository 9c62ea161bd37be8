//! Error types for oembedkit

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which field of a service definition failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidServiceKind {
    /// `name` is empty
    MissingName,
    /// `matches` is empty or contains an empty pattern
    MissingMatches,
    /// Neither a URL nor a custom fetcher was given
    MissingUrl,
    /// URL template lacks the `{{url}}` placeholder
    InvalidUrl,
}

impl InvalidServiceKind {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            InvalidServiceKind::MissingName => "EMBED_MISSING_SERVICE_NAME",
            InvalidServiceKind::MissingMatches => "EMBED_MISSING_SERVICE_MATCHES",
            InvalidServiceKind::MissingUrl => "EMBED_MISSING_SERVICE_URL",
            InvalidServiceKind::InvalidUrl => "EMBED_INVALID_SERVICE_URL",
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            InvalidServiceKind::MissingName => "expected name to be a non-empty string",
            InvalidServiceKind::MissingMatches => "expected matches to be a non-empty list",
            InvalidServiceKind::MissingUrl => "expected a url template, url resolver or fetcher",
            InvalidServiceKind::InvalidUrl => "expected url to have a {{url}} placeholder",
        }
    }
}

impl std::fmt::Display for InvalidServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.describe())
    }
}

/// Errors raised while decoding a provider response body
#[derive(Debug, Error)]
pub enum ParseError {
    /// Body is not valid JSON
    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),

    /// Body is not well-formed XML
    #[error("invalid XML body: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Document decoded but is not shaped like an embed object
    #[error("unexpected document shape: {0}")]
    Shape(String),
}

/// Errors that can occur while resolving a URL into an embed
#[derive(Debug, Error)]
pub enum EmbedError {
    /// URL is missing or empty
    #[error("Expected url to be a non-empty string")]
    NoUrl,

    /// Redirect and discovery hops reached the configured limit
    #[error("Too many redirects")]
    TooManyRedirects,

    /// Remote answered outside the 2xx/3xx range
    #[error("Non-200 response returned: {0}")]
    NonSuccessStatus(u16),

    /// Redirect response without a usable Location header
    #[error("Failed to follow location")]
    RedirectLocationMissing,

    /// URL rejected by the deny list or missing from the allow list
    #[error("URL \"{0}\" is blocked")]
    UrlBlocked(String),

    /// No content parser accepts the response content-type
    #[error("Failed to find parser for: {0}")]
    NoParserFound(String),

    /// Page fetch did not return HTML
    #[error("Expected text/html body, got: {0}")]
    UnexpectedContentType(String),

    /// Response body could not be decoded
    #[error("Failed to parse response: {0}")]
    ParseFailed(#[source] ParseError),

    /// Service definition failed validation
    #[error("Invalid service \"{key}\": {kind}")]
    InvalidService {
        key: String,
        kind: InvalidServiceKind,
    },

    /// No fetcher is available for the URL
    #[error("No fetcher available for URL")]
    NoFetcher,

    /// Failed to build HTTP client
    #[error("Failed to create HTTP client")]
    ClientBuildError(#[source] reqwest::Error),

    /// Transport failure without a response
    #[error("Request failed: {0}")]
    Request(#[source] reqwest::Error),

    /// Custom fetcher error
    #[error("Fetcher error: {0}")]
    Fetcher(String),
}

impl EmbedError {
    /// Create an error from a reqwest error
    ///
    /// Errors that carry a status code become [`EmbedError::NonSuccessStatus`];
    /// everything else is passed through uncategorized.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => EmbedError::NonSuccessStatus(status.as_u16()),
            None => EmbedError::Request(err),
        }
    }

    /// Stable machine-readable code, `None` for uncategorized failures
    pub fn code(&self) -> Option<&'static str> {
        match self {
            EmbedError::NoUrl => Some("EMBED_NO_URL"),
            EmbedError::TooManyRedirects => Some("EMBED_TOO_MANY_REDIRECTS"),
            EmbedError::NonSuccessStatus(_) => Some("EMBED_NON_2XX"),
            EmbedError::RedirectLocationMissing => Some("EMBED_REDIRECT_LOCATION_MISSING"),
            EmbedError::UrlBlocked(_) => Some("EMBED_URL_BLOCKED"),
            EmbedError::NoParserFound(_) => Some("EMBED_NO_PARSER"),
            EmbedError::UnexpectedContentType(_) => Some("EMBED_UNEXPECTED_CONTENT_TYPE"),
            EmbedError::ParseFailed(_) => Some("EMBED_PARSE_FAILED"),
            EmbedError::InvalidService { kind, .. } => Some(kind.code()),
            EmbedError::NoFetcher => Some("EMBED_NO_FETCHER"),
            EmbedError::ClientBuildError(_) | EmbedError::Request(_) | EmbedError::Fetcher(_) => {
                None
            }
        }
    }

    /// HTTP-style status describing the failure
    pub fn status(&self) -> u16 {
        match self {
            EmbedError::NoUrl
            | EmbedError::TooManyRedirects
            | EmbedError::NonSuccessStatus(_)
            | EmbedError::RedirectLocationMissing
            | EmbedError::UrlBlocked(_) => 400,
            _ => 500,
        }
    }
}

impl From<ParseError> for EmbedError {
    fn from(err: ParseError) -> Self {
        EmbedError::ParseFailed(err)
    }
}

/// Terminal error of a resolution call, with the context it failed in
#[derive(Debug, Error)]
#[error("{source}")]
pub struct ResolveError {
    /// Underlying failure
    pub source: EmbedError,
    /// Service key in effect when the failure occurred
    pub service_name: Option<String>,
    /// The original input URL
    pub url: String,
}

impl ResolveError {
    /// Attach resolution context to an error
    pub fn new(source: EmbedError, service_name: Option<String>, url: impl Into<String>) -> Self {
        Self {
            source,
            service_name,
            url: url.into(),
        }
    }

    /// HTTP-style status, 500 unless the failure is anticipated
    pub fn status(&self) -> u16 {
        self.source.status()
    }

    /// Canonical reason phrase for [`status`](Self::status)
    pub fn status_message(&self) -> &'static str {
        StatusCode::from_u16(self.status())
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Internal Server Error")
    }

    /// Stable machine-readable code
    pub fn code(&self) -> Option<&'static str> {
        self.source.code()
    }

    /// Structured error object for API consumers
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            status: self.status(),
            status_message: self.status_message().to_string(),
            code: self.code().map(str::to_string),
            message: self.source.to_string(),
            service_name: self.service_name.clone(),
            url: self.url.clone(),
        }
    }
}

/// Serializable form of a [`ResolveError`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status: u16,
    pub status_message: String,
    pub code: Option<String>,
    pub message: String,
    pub service_name: Option<String>,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            EmbedError::NoUrl.to_string(),
            "Expected url to be a non-empty string"
        );
        assert_eq!(
            EmbedError::NonSuccessStatus(503).to_string(),
            "Non-200 response returned: 503"
        );
        assert_eq!(
            EmbedError::UrlBlocked("example.com/x".to_string()).to_string(),
            "URL \"example.com/x\" is blocked"
        );
        assert_eq!(
            EmbedError::InvalidService {
                key: "foo".to_string(),
                kind: InvalidServiceKind::MissingName,
            }
            .to_string(),
            "Invalid service \"foo\": expected name to be a non-empty string"
        );
    }

    #[test]
    fn test_codes_and_statuses() {
        assert_eq!(EmbedError::NoUrl.code(), Some("EMBED_NO_URL"));
        assert_eq!(EmbedError::NoUrl.status(), 400);
        assert_eq!(EmbedError::TooManyRedirects.status(), 400);
        assert_eq!(
            EmbedError::NoParserFound("image/png".into()).code(),
            Some("EMBED_NO_PARSER")
        );
        assert_eq!(EmbedError::NoParserFound("image/png".into()).status(), 500);
        assert_eq!(EmbedError::Fetcher("boom".into()).code(), None);
        assert_eq!(EmbedError::Fetcher("boom".into()).status(), 500);
        assert_eq!(
            EmbedError::InvalidService {
                key: "foo".into(),
                kind: InvalidServiceKind::InvalidUrl,
            }
            .code(),
            Some("EMBED_INVALID_SERVICE_URL")
        );
    }

    #[test]
    fn test_resolve_error_body() {
        let err = ResolveError::new(
            EmbedError::UrlBlocked("example.com/a".into()),
            Some("example".into()),
            "https://example.com/a",
        );
        assert_eq!(err.status(), 400);
        assert_eq!(err.status_message(), "Bad Request");

        let body = err.to_body();
        assert_eq!(body.code.as_deref(), Some("EMBED_URL_BLOCKED"));
        assert_eq!(body.service_name.as_deref(), Some("example"));
        assert_eq!(body.url, "https://example.com/a");

        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"statusMessage\":\"Bad Request\""));
        assert!(json.contains("\"serviceName\":\"example\""));
    }

    #[test]
    fn test_uncategorized_defaults_to_500() {
        let err = ResolveError::new(EmbedError::Fetcher("boom".into()), None, "https://x.test");
        assert_eq!(err.status(), 500);
        assert_eq!(err.status_message(), "Internal Server Error");
        assert!(err.to_body().code.is_none());
        assert_eq!(err.to_string(), "Fetcher error: boom");
    }
}
