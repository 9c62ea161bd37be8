//! Built-in provider table
//!
//! Hand-picked high-traffic providers. Order matters: lookup returns the
//! first match, so narrower entries sit above broader ones on shared hosts.

use crate::services::Service;
use crate::types::FetchRequest;
use url::form_urlencoded;

/// Expand every domain with every path
fn domain_paths(domains: &[&str], paths: &[&str]) -> Vec<String> {
    paths
        .iter()
        .flat_map(|path| domains.iter().map(move |domain| format!("{domain}{path}")))
        .collect()
}

/// Endpoint with an explicit `format=json` flag ahead of the target URL
fn json_endpoint(base: &'static str) -> impl Fn(&FetchRequest) -> String + Send + Sync + 'static {
    move |request: &FetchRequest| {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("format", "json")
            .append_pair("url", &request.url)
            .finish();
        format!("{base}?{query}")
    }
}

/// The default services, in lookup order
pub fn default_services() -> Vec<(String, Service)> {
    const FACEBOOK: &[&str] = &["facebook.com", "m.facebook.com"];

    vec![
        (
            "facebook_post".to_string(),
            Service::new(
                "Facebook-Post",
                domain_paths(
                    FACEBOOK,
                    &[
                        "/*/posts/**",
                        "/*/activity/**",
                        "/photo.php?fbid=**",
                        "/photos/**",
                        "/permalink.php?story_fbid=**",
                        "/media/set?set=**",
                        "/questions/**",
                        "/notes/*/*/**",
                    ],
                ),
            )
            .url_template("https://www.facebook.com/plugins/post/oembed.json/?url={{url}}"),
        ),
        (
            "facebook_video".to_string(),
            Service::new(
                "Facebook-Video",
                domain_paths(
                    FACEBOOK,
                    &["/*/videos/**", "/video.php?id=**", "/video.php?v=**"],
                ),
            )
            .url_template("https://www.facebook.com/plugins/video/oembed.json/?url={{url}}"),
        ),
        (
            "twitter".to_string(),
            Service::new(
                "Twitter",
                [
                    "twitter.com/*/status/*",
                    "m.twitter.com/*/status/*",
                    "x.com/*/status/*",
                ],
            )
            .url_template("https://publish.twitter.com/oembed?url={{url}}"),
        ),
        (
            "youtube".to_string(),
            Service::new(
                "YouTube",
                [
                    "youtu.be/*",
                    "youtube.com/*",
                    "youtube.com/shorts/*",
                    "youtube.com/embed/*",
                    "m.youtube.com/*",
                ],
            )
            .url_template("https://www.youtube.com/oembed?url={{url}}&format=json"),
        ),
        (
            "vimeo".to_string(),
            Service::new(
                "Vimeo",
                ["vimeo.com/*", "vimeo.com/**", "player.vimeo.com/video/*"],
            )
            .url_template("https://vimeo.com/api/oembed.json?url={{url}}"),
        ),
        (
            "dailymotion".to_string(),
            Service::new("Dailymotion", ["dailymotion.com/video/*", "dai.ly/*"])
                .url_resolver(json_endpoint("https://www.dailymotion.com/services/oembed")),
        ),
        (
            "tiktok".to_string(),
            Service::new("TikTok", ["tiktok.com/@*/video/*"])
                .url_template("https://www.tiktok.com/oembed?url={{url}}"),
        ),
        (
            "spotify".to_string(),
            Service::new("Spotify", ["embed.spotify.com/**", "open.spotify.com/**"])
                .url_template("https://embed.spotify.com/oembed/?url={{url}}"),
        ),
        (
            "soundcloud".to_string(),
            Service::new("SoundCloud", ["soundcloud.com/**", "m.soundcloud.com/**"])
                .url_resolver(json_endpoint("https://soundcloud.com/oembed")),
        ),
        (
            "flickr".to_string(),
            Service::new("Flickr", ["flickr.com/photos/**", "flic.kr/p/*"])
                .url_resolver(json_endpoint("https://www.flickr.com/services/oembed/")),
        ),
        (
            "imgur".to_string(),
            Service::new("Imgur", ["imgur.com/**", "i.imgur.com/*"])
                .url_template("https://api.imgur.com/oembed.json?url={{url}}"),
        ),
        (
            "giphy".to_string(),
            Service::new("Giphy", ["giphy.com/gifs/*", "media.giphy.com/media/**"])
                .url_template("https://giphy.com/services/oembed?url={{url}}"),
        ),
        (
            "reddit".to_string(),
            Service::new("Reddit", ["reddit.com/r/*/comments/**"])
                .url_template("https://www.reddit.com/oembed?url={{url}}"),
        ),
    ]
}
