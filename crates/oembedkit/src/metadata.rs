//! HTML metadata extraction
//!
//! Used when no provider service matches a URL: the page is scanned for an
//! oEmbed discovery `<link>`, and failing that an embed is synthesized from
//! Open Graph, Twitter Card and plain `<meta>`/`<title>` tags.

use crate::types::EmbedResult;
use scraper::{Html, Selector};
use std::collections::HashMap;
use url::Url;

/// `type` values of oEmbed discovery links
pub const OEMBED_LINK_TYPES: &[&str] = &[
    "application/json+oembed",
    "text/json+oembed",
    "text/javascript+oembed",
    "text/xml+oembed",
];

/// An oEmbed discovery link found in a page head
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OembedLink {
    /// Value of the `type` attribute
    pub link_type: String,
    /// Value of the `href` attribute, as written
    pub href: String,
}

impl OembedLink {
    fn is_json(&self) -> bool {
        self.link_type.contains("json") || self.link_type.contains("javascript")
    }
}

/// Find the oEmbed endpoint a page advertises
///
/// Only `<link>` elements inside `<head>` count. When several are present a
/// JSON (or JavaScript) link is preferred, otherwise the first one wins.
pub fn find_oembed_link(html: &str) -> Option<OembedLink> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("head link[type][href]").ok()?;

    let links: Vec<OembedLink> = document
        .select(&selector)
        .filter_map(|el| {
            let link_type = el.value().attr("type")?.trim().to_ascii_lowercase();
            let href = el.value().attr("href")?.trim();
            if href.is_empty() || !OEMBED_LINK_TYPES.contains(&link_type.as_str()) {
                return None;
            }
            Some(OembedLink {
                link_type,
                href: href.to_string(),
            })
        })
        .collect();

    let preferred = links.iter().position(OembedLink::is_json).unwrap_or(0);
    links.into_iter().nth(preferred)
}

/// Tags collected from a page, first non-empty value per key
#[derive(Debug, Default)]
struct PageTags {
    meta: HashMap<String, String>,
    title: Option<String>,
}

impl PageTags {
    fn parse(html: &str) -> Self {
        let document = Html::parse_document(html);
        let mut tags = PageTags::default();

        if let Ok(selector) = Selector::parse("meta[content]") {
            for el in document.select(&selector) {
                let key = el
                    .value()
                    .attr("property")
                    .or_else(|| el.value().attr("name"))
                    .map(|k| k.trim().to_ascii_lowercase());
                let content = el.value().attr("content").map(str::trim).unwrap_or_default();
                if let Some(key) = key {
                    if !key.is_empty() && !content.is_empty() {
                        tags.meta.entry(key).or_insert_with(|| content.to_string());
                    }
                }
            }
        }

        if let Ok(selector) = Selector::parse("title") {
            tags.title = document
                .select(&selector)
                .map(|el| el.text().collect::<String>().trim().to_string())
                .find(|t| !t.is_empty());
        }

        tags
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.meta.get(key).map(String::as_str)
    }

    /// First present key, in order
    fn first(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|key| self.get(key))
    }
}

/// Synthesize a `link` embed from page metadata
///
/// Each field takes the first non-empty value, in priority order:
///
/// | field | sources |
/// |---|---|
/// | `title` | `og:title`, `twitter:title`, `<title>`, `<meta name="title">` |
/// | `provider_name` | `og:site_name`, request host |
/// | `provider_url` | `twitter:domain`, request scheme and host |
/// | `description` | `og:description`, `twitter:description`, `<meta name="description">` |
/// | `thumbnail_url` | `og:image` (with `og:image:width`/`height` when both are set), `twitter:image` |
///
/// Video fields come only from Open Graph and only as a full set of URL,
/// width and height.
pub fn extract_embed(html: &str, request_url: &str) -> EmbedResult {
    let tags = PageTags::parse(html);
    let parsed = Url::parse(request_url).ok();
    let host = parsed.as_ref().and_then(|u| u.host_str().map(str::to_string));

    let mut embed = EmbedResult::link();

    let title = tags
        .first(&["og:title", "twitter:title"])
        .or(tags.title.as_deref())
        .or_else(|| tags.get("title"));
    if let Some(title) = title {
        embed.insert("title", title);
    }
    if let Some(name) = tags.get("og:site_name").or(host.as_deref()) {
        embed.insert("provider_name", name);
    }
    let provider_url = tags.get("twitter:domain").map(str::to_string).or_else(|| {
        let parsed = parsed.as_ref()?;
        Some(format!("{}://{}", parsed.scheme(), host.as_deref()?))
    });
    if let Some(provider_url) = provider_url {
        embed.insert("provider_url", provider_url);
    }
    if let Some(description) = tags.first(&["og:description", "twitter:description", "description"]) {
        embed.insert("description", description);
    }

    if let Some(image) = tags.get("og:image") {
        embed.insert("thumbnail_url", image);
        if let (Some(width), Some(height)) = (tags.get("og:image:width"), tags.get("og:image:height")) {
            embed.insert("thumbnail_width", width);
            embed.insert("thumbnail_height", height);
        }
    } else if let Some(image) = tags.get("twitter:image") {
        embed.insert("thumbnail_url", image);
    }

    let video = tags.first(&["og:video:secure_url", "og:video:url"]);
    if let (Some(url), Some(width), Some(height)) =
        (video, tags.get("og:video:width"), tags.get("og:video:height"))
    {
        embed.insert("video_url", url);
        embed.insert("video_width", width);
        embed.insert("video_height", height);
    }

    embed
}
