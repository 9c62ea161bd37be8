//! Built-in HTTP fetch pipeline
//!
//! One resolution is a loop of sequential GET requests:
//!
//! 1. fetch the provider endpoint (service) or the page itself (no service)
//! 2. on a 3xx response, follow `Location` manually after re-checking the
//!    allow/deny policy, with the service cleared
//! 3. on a provider response, decode the body with the parser matching its
//!    content-type
//! 4. on a page, follow an oEmbed discovery link if the page has one,
//!    otherwise synthesize an embed from its metadata
//!
//! Every redirect or discovery step counts as a hop; reaching
//! `max_redirects` hops fails with [`EmbedError::TooManyRedirects`].

use crate::error::EmbedError;
use crate::fetchers::Fetcher;
use crate::metadata::{extract_embed, find_oembed_link};
use crate::parsers::find_parser;
use crate::policy::UrlPolicy;
use crate::services::Service;
use crate::types::{EmbedResult, FetchRequest};
use crate::DEFAULT_USER_AGENT;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, LOCATION, USER_AGENT};
use reqwest::redirect::Policy;
use tracing::{debug, warn};
use url::Url;

/// What the next response is expected to be
#[derive(Debug, Clone, Copy)]
enum Target<'a> {
    /// Provider endpoint of a matched service
    Service(&'a Service),
    /// Endpoint advertised by a page's discovery link
    Discovered,
    /// A web page
    Page,
}

/// Default fetcher: provider endpoints, redirects, discovery and scraping
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpFetcher;

impl HttpFetcher {
    /// Create a new HTTP fetcher
    pub fn new() -> Self {
        Self
    }

    /// Run the pipeline as if `redirects_so_far` hops were already taken
    pub async fn fetch_from(
        &self,
        request: &FetchRequest,
        redirects_so_far: u32,
    ) -> Result<EmbedResult, EmbedError> {
        if redirects_so_far >= request.max_redirects {
            return Err(EmbedError::TooManyRedirects);
        }
        if request.url.trim().is_empty() {
            return Err(EmbedError::NoUrl);
        }

        // Every hop is checked in the form it is requested in.
        let mut url = normalize_url(&request.url);
        let policy = UrlPolicy::new(&request.allow_list, &request.deny_list);
        policy.check(&url)?;

        let client = build_client(request)?;
        let mut target = match &request.service {
            Some(service) => Target::Service(service),
            None => Target::Page,
        };
        let mut hops = redirects_so_far;

        loop {
            let endpoint = match target {
                Target::Service(service) => service.endpoint(request).unwrap_or_else(|| url.clone()),
                Target::Discovered | Target::Page => url.clone(),
            };

            debug!(url = %endpoint, hop = hops, "Fetching");
            let response = client
                .get(&endpoint)
                .send()
                .await
                .map_err(EmbedError::from_reqwest)?;

            let status = response.status().as_u16();
            if !(200..400).contains(&status) {
                return Err(EmbedError::NonSuccessStatus(status));
            }

            if status > 300 {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .filter(|v| !v.is_empty())
                    .ok_or(EmbedError::RedirectLocationMissing)?;
                let next = join_url(&endpoint, location);
                debug!(from = %endpoint, to = %next, "Following redirect");

                policy.check(&next)?;
                hops += 1;
                if hops >= request.max_redirects {
                    return Err(EmbedError::TooManyRedirects);
                }
                url = next;
                target = Target::Page;
                continue;
            }

            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();

            match target {
                Target::Service(_) | Target::Discovered => {
                    let parser = find_parser(&content_type)
                        .ok_or_else(|| EmbedError::NoParserFound(content_type.clone()))?;
                    debug!(parser = parser.name, content_type = %content_type, "Parsing provider response");

                    let body = response.text().await.map_err(EmbedError::from_reqwest)?;
                    let value = (parser.parse)(&body)?;
                    return Ok(EmbedResult::from_value(value)?);
                }
                Target::Page => {
                    if !is_html(&content_type) {
                        return Err(EmbedError::UnexpectedContentType(content_type));
                    }
                    let body = response.text().await.map_err(EmbedError::from_reqwest)?;

                    if let Some(link) = find_oembed_link(&body) {
                        let next = join_url(&url, &link.href);
                        debug!(page = %url, oembed = %next, "Following oEmbed discovery link");

                        policy.check(&next)?;
                        hops += 1;
                        if hops >= request.max_redirects {
                            return Err(EmbedError::TooManyRedirects);
                        }
                        url = next;
                        target = Target::Discovered;
                        continue;
                    }

                    debug!(url = %url, "No oEmbed link, extracting page metadata");
                    return Ok(extract_embed(&body, &url));
                }
            }
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<EmbedResult, EmbedError> {
        self.fetch_from(request, 0).await
    }
}

/// Build a client that never follows redirects on its own
fn build_client(request: &FetchRequest) -> Result<reqwest::Client, EmbedError> {
    let mut headers = HeaderMap::new();
    for (name, value) in &request.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => warn!(header = %name, "Skipping invalid request header"),
        }
    }

    let user_agent = request.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT);
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(user_agent)
            .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_USER_AGENT)),
    );

    reqwest::Client::builder()
        .default_headers(headers)
        .redirect(Policy::none())
        .timeout(request.timeout)
        .build()
        .map_err(EmbedError::ClientBuildError)
}

/// Serialized form of an absolute URL: dot segments resolved, bare hosts
/// given a `/` path. Unparseable input is passed through trimmed.
fn normalize_url(raw: &str) -> String {
    let raw = raw.trim();
    match Url::parse(raw) {
        Ok(url) => url.to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Resolve a possibly relative reference against the URL it came from
fn join_url(base: &str, reference: &str) -> String {
    match Url::parse(base).and_then(|base| base.join(reference)) {
        Ok(joined) => joined.to_string(),
        Err(_) => reference.to_string(),
    }
}

/// Check if a content-type names an HTML document
fn is_html(content_type: &str) -> bool {
    let ct_lower = content_type.to_ascii_lowercase();
    ct_lower.contains("text/html") || ct_lower.contains("application/xhtml")
}
