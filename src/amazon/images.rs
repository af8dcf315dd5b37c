//! High-resolution gallery image URLs of a product page.
//!
//! The gallery data lives in an inline script (`'colorImages': {'initial':
//! [...]}`). When that is missing, the thumbnail strip is used instead and
//! each thumbnail URL is rewritten to its 1500px rendition.

use crate::amazon::parser::Parser;
use crate::amazon::selectors::images;
use regex_lite::Regex;
use scraper::Html;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{debug, trace};

/// Most image URLs reported per product.
pub const MAX_IMAGES: usize = 10;

/// Size token that turns a thumbnail into its large rendition.
const LARGE_SIZE_TOKEN: &str = "._SL1500_.";

static COLOR_IMAGES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)'colorImages'\s*:\s*\{\s*'initial'\s*:\s*(\[.+\])\s*\}").unwrap()
});

static HI_RES_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""hiRes"\s*:\s*"(https?://[^"]+)""#).unwrap());

static IMAGE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/I/([A-Za-z0-9_+-]+)\.").unwrap());

static SIZE_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\._.*?_\.").unwrap());

/// Image id of an Amazon media URL (`.../I/<id>.<size>.jpg`).
pub fn image_id(url: &str) -> Option<&str> {
    IMAGE_ID.captures(url).and_then(|caps| caps.get(1)).map(|m| m.as_str())
}

/// Rewrites a thumbnail URL to the 1500px rendition of the same image.
pub fn upscale_thumbnail(url: &str) -> String {
    SIZE_TOKEN.replace_all(url, LARGE_SIZE_TOKEN).into_owned()
}

/// Ordered image URLs, unique by image id.
#[derive(Debug, Default)]
struct ImageSet {
    urls: Vec<String>,
    seen: HashSet<String>,
}

impl ImageSet {
    fn push(&mut self, url: String) {
        let Some(id) = image_id(&url) else {
            trace!("Skipping image without id: {}", url);
            return;
        };
        if self.seen.insert(id.to_string()) {
            trace!("Image {}: {}", self.urls.len() + 1, url);
            self.urls.push(url);
        }
    }

    fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

impl Parser {
    /// Returns up to [`MAX_IMAGES`] unique high-resolution image URLs.
    pub fn parse_image_urls(&self, html: &str) -> Vec<String> {
        let mut set = ImageSet::default();

        for url in script_hi_res_urls(html) {
            set.push(url);
        }

        if set.is_empty() {
            debug!("No gallery script data, falling back to thumbnails");
            let document = Html::parse_document(html);
            for thumbnail in document.select(&images::THUMBNAILS) {
                if let Some(src) = thumbnail.value().attr("src") {
                    set.push(upscale_thumbnail(src));
                }
            }
        }

        debug!("Found {} unique images", set.urls.len());
        let mut urls = set.urls;
        urls.truncate(MAX_IMAGES);
        urls
    }
}

fn script_hi_res_urls(html: &str) -> Vec<String> {
    let Some(data) = COLOR_IMAGES.captures(html).and_then(|caps| caps.get(1)) else {
        return Vec::new();
    };

    HI_RES_URL
        .captures_iter(data.as_str())
        .filter_map(|caps| caps.get(1))
        .map(|m| unescape(m.as_str()))
        .collect()
}

/// Decodes JSON string escapes such as `\u002F`; malformed text is kept as is.
fn unescape(raw: &str) -> String {
    if !raw.contains('\\') {
        return raw.to_string();
    }
    serde_json::from_str::<String>(&format!("\"{}\"", raw)).unwrap_or_else(|_| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amazon::regions::Region;

    fn parser() -> Parser {
        Parser::new(Region::Us)
    }

    fn gallery_script(entries: &[&str]) -> String {
        format!(
            "<html><body><script>var data = {{\n'colorImages': {{ 'initial': [{}]}},\n'colorToAsin': {{'initial': {{}}}}\n}};</script></body></html>",
            entries.join(",")
        )
    }

    #[test]
    fn test_image_id() {
        assert_eq!(
            image_id("https://m.media-amazon.com/images/I/71abc-D_e+F1L._AC_SL1500_.jpg"),
            Some("71abc-D_e+F1L")
        );
        assert_eq!(image_id("https://m.media-amazon.com/images/G/01/play.png"), None);
    }

    #[test]
    fn test_upscale_thumbnail() {
        assert_eq!(
            upscale_thumbnail("https://m.media-amazon.com/images/I/41xyzL._AC_US40_.jpg"),
            "https://m.media-amazon.com/images/I/41xyzL._SL1500_.jpg"
        );
        assert_eq!(upscale_thumbnail("https://example.com/a.jpg"), "https://example.com/a.jpg");
    }

    #[test]
    fn test_script_urls_deduplicated_in_order() {
        let html = gallery_script(&[
            r#"{"hiRes":"https://m.media-amazon.com/images/I/71aaaL._AC_SL1500_.jpg","variant":"MAIN"}"#,
            r#"{"hiRes":null,"variant":"PT01"}"#,
            r#"{"hiRes":"https://m.media-amazon.com/images/I/61bbbL._AC_SL1500_.jpg","variant":"PT02"}"#,
            r#"{"hiRes":"https://m.media-amazon.com/images/I/71aaaL._AC_SL1500_.jpg","variant":"PT03"}"#,
        ]);

        assert_eq!(
            parser().parse_image_urls(&html),
            vec![
                "https://m.media-amazon.com/images/I/71aaaL._AC_SL1500_.jpg",
                "https://m.media-amazon.com/images/I/61bbbL._AC_SL1500_.jpg",
            ]
        );
    }

    #[test]
    fn test_script_urls_are_unescaped() {
        let html = gallery_script(&[
            r#"{"hiRes":"https://m.media-amazon.com\u002Fimages\u002FI\u002F71cccL._AC_SL1500_.jpg"}"#,
        ]);
        assert_eq!(
            parser().parse_image_urls(&html),
            vec!["https://m.media-amazon.com/images/I/71cccL._AC_SL1500_.jpg"]
        );
    }

    #[test]
    fn test_capped_at_max_images() {
        let entries: Vec<String> = (0..15)
            .map(|i| format!(r#"{{"hiRes":"https://m.media-amazon.com/images/I/img{:02}L._AC_SL1500_.jpg"}}"#, i))
            .collect();
        let refs: Vec<&str> = entries.iter().map(String::as_str).collect();

        let urls = parser().parse_image_urls(&gallery_script(&refs));
        assert_eq!(urls.len(), MAX_IMAGES);
        assert!(urls[9].contains("img09L"));
    }

    #[test]
    fn test_thumbnail_fallback() {
        let html = r#"<html><body><div id="altImages"><ul>
            <li class="item imageThumbnail"><img src="https://m.media-amazon.com/images/I/41aaaL._AC_US40_.jpg"></li>
            <li class="item imageThumbnail"><img src="https://m.media-amazon.com/images/I/41aaaL._AC_SR38,50_.jpg"></li>
            <li class="item videoThumbnail"><img src="https://m.media-amazon.com/images/G/01/play-icon.png"></li>
            <li class="item"><img src="https://m.media-amazon.com/images/I/51bbbL._AC_US40_.jpg"></li>
        </ul></div></body></html>"#;

        assert_eq!(
            parser().parse_image_urls(html),
            vec![
                "https://m.media-amazon.com/images/I/41aaaL._SL1500_.jpg",
                "https://m.media-amazon.com/images/I/51bbbL._SL1500_.jpg",
            ]
        );
    }

    #[test]
    fn test_no_images() {
        assert!(parser().parse_image_urls("<html><body></body></html>").is_empty());
    }
}
