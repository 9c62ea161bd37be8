//! Example: Resolve various URLs and display results
//!
//! Run with: cargo run -p oembedkit --example resolve_urls
//!
//! Covers provider endpoints, oEmbed discovery and the metadata fallback
//! against live sites.

use oembedkit::{Resolution, Resolver};

/// Test case definition
struct TestCase {
    url: &'static str,
    description: &'static str,
    expect_service: Option<&'static str>,
    expect_type: Option<&'static str>,
}

const TEST_CASES: &[TestCase] = &[
    TestCase {
        url: "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
        description: "YouTube video (provider endpoint)",
        expect_service: Some("youtube"),
        expect_type: Some("video"),
    },
    TestCase {
        url: "https://open.spotify.com/track/5e9TFTbltYBg2xThimr0rU",
        description: "Spotify track (provider endpoint)",
        expect_service: Some("spotify"),
        expect_type: Some("rich"),
    },
    TestCase {
        url: "https://vimeo.com/76979871",
        description: "Vimeo video (provider endpoint)",
        expect_service: Some("vimeo"),
        expect_type: Some("video"),
    },
    TestCase {
        url: "https://www.theverge.com/",
        description: "News site (metadata fallback)",
        expect_service: None,
        expect_type: Some("link"),
    },
    TestCase {
        url: "https://example.com",
        description: "Plain HTML page (title only)",
        expect_service: None,
        expect_type: Some("link"),
    },
];

#[tokio::main]
async fn main() {
    println!("oembedkit URL Examples");
    println!("======================\n");

    let resolver = Resolver::new();
    let mut passed = 0;
    let mut failed = 0;

    for (i, case) in TEST_CASES.iter().enumerate() {
        println!("{}. {}", i + 1, case.description);
        println!("   URL: {}", case.url);

        match resolver.resolve(case.url).await {
            Ok(resolution) => {
                print_summary(&resolution);

                if check_expectations(case, &resolution) {
                    println!("   ✓ PASS\n");
                    passed += 1;
                } else {
                    println!("   ✗ FAIL (expectations not met)\n");
                    failed += 1;
                }
            }
            Err(e) => {
                println!("   Error: {} ({})", e, e.status());
                println!("   ✗ FAIL\n");
                failed += 1;
            }
        }
    }

    println!("======================");
    println!("Results: {} passed, {} failed", passed, failed);

    if failed > 0 {
        std::process::exit(1);
    }
}

fn print_summary(resolution: &Resolution) {
    let embed = &resolution.embed;
    println!(
        "   Service: {}",
        resolution.service_name.as_deref().unwrap_or("(none)")
    );
    println!("   Type: {}", embed.kind().unwrap_or("?"));
    if let Some(title) = embed.title() {
        println!("   Title: {}", title);
    }
    if let Some(provider) = embed.provider_name() {
        println!("   Provider: {}", provider);
    }
    if let Some(thumbnail) = embed.thumbnail_url() {
        println!("   Thumbnail: {}", thumbnail);
    }
    println!("   Took: {}", resolution.time_taken);
}

fn check_expectations(case: &TestCase, resolution: &Resolution) -> bool {
    if resolution.service_name.as_deref() != case.expect_service {
        println!(
            "   Expected service '{:?}', got '{:?}'",
            case.expect_service, resolution.service_name
        );
        return false;
    }

    if let Some(expected_type) = case.expect_type {
        if resolution.embed.kind() != Some(expected_type) {
            println!(
                "   Expected type '{}', got '{:?}'",
                expected_type,
                resolution.embed.kind()
            );
            return false;
        }
    }

    true
}
