//! # Image Loading and Decoding
//!
//! Fetches element and background images and decodes them to RGBA bitmaps.
//!
//! Supported `src` formats:
//! - `data:image/...;base64,...`: data URI
//! - `http://` / `https://`: fetched with reqwest
//! - `file://` URLs and file paths (absolute, relative, or any existing file)
//! - raw base64-encoded image data
//!
//! Fetching sits behind [`ImageFetcher`] so callers can plug in their own
//! storage collaborator. [`ImageSet::load`] gathers every image a page needs
//! before any painting starts: loads run concurrently, each one bounded by a
//! timeout that covers both fetch and decode, and a failure only removes that
//! image from the set.

use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::path::Path;
use std::time::Duration;

use futures::future::{join_all, BoxFuture};
use image::RgbaImage;

use crate::diagnostics::{Diagnostics, RenderWarning};
use crate::error::{FolioError, Result};

static FOLIO_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Resolves an image URI to encoded bytes.
pub trait ImageFetcher: Send + Sync {
    fn fetch<'a>(&'a self, uri: &'a str) -> BoxFuture<'a, Result<Vec<u8>>>;
}

/// Fetcher for every source kind folio understands.
#[derive(Debug, Clone)]
pub struct DefaultFetcher {
    client: reqwest::Client,
}

impl Default for DefaultFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultFetcher {
    pub fn new() -> Self {
        let client = reqwest::ClientBuilder::new()
            .user_agent(FOLIO_USER_AGENT)
            .build()
            .unwrap_or_else(|e| {
                log::warn!("falling back to a default HTTP client: {}", e);
                reqwest::Client::new()
            });
        Self { client }
    }

    async fn fetch_http(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FolioError::Image(format!("request failed: {}", e)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FolioError::Image(format!("HTTP status {}", status)));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| FolioError::Image(format!("failed to read body: {}", e)))?;
        Ok(bytes.to_vec())
    }
}

impl ImageFetcher for DefaultFetcher {
    fn fetch<'a>(&'a self, uri: &'a str) -> BoxFuture<'a, Result<Vec<u8>>> {
        Box::pin(async move {
            match classify_source(uri) {
                Source::Http(url) => self.fetch_http(url).await,
                Source::File(path) => tokio::fs::read(path).await.map_err(|e| {
                    FolioError::Image(format!("failed to read image file '{}': {}", path, e))
                }),
                Source::DataUri(payload) | Source::Base64(payload) => base64_decode(payload),
                Source::Invalid(reason) => Err(FolioError::Image(reason)),
            }
        })
    }
}

enum Source<'a> {
    Http(&'a str),
    File(&'a str),
    DataUri(&'a str),
    Base64(&'a str),
    Invalid(String),
}

fn classify_source(src: &str) -> Source<'_> {
    let src = src.trim();
    // Data URI: data:image/png;base64,iVBOR...
    if let Some(rest) = src.strip_prefix("data:") {
        return match rest.split_once(',') {
            Some((meta, payload)) if meta.ends_with(";base64") => Source::DataUri(payload),
            Some(_) => Source::Invalid("data URI is not base64-encoded".to_string()),
            None => Source::Invalid("invalid data URI: missing comma".to_string()),
        };
    }
    if src.starts_with("http://") || src.starts_with("https://") {
        return Source::Http(src);
    }
    if let Some(path) = src.strip_prefix("file://") {
        return Source::File(path);
    }
    if src.starts_with('/') || src.starts_with("./") || src.starts_with("../") {
        return Source::File(src);
    }
    // Dots and backslashes never occur in base64.
    if src.contains('.') || src.contains('\\') || Path::new(src).exists() {
        return Source::File(src);
    }
    Source::Base64(src)
}

fn base64_decode(input: &str) -> Result<Vec<u8>> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(input.trim())
        .map_err(|e| FolioError::Image(format!("base64 decode error: {}", e)))
}

/// Detect the format from magic bytes and decode to straight-alpha RGBA.
pub fn decode_image_bytes(data: &[u8]) -> Result<RgbaImage> {
    if data.len() < 4 {
        return Err(FolioError::Image("image data too short".to_string()));
    }
    let reader = image::io::Reader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| FolioError::Image(format!("format detection error: {}", e)))?;
    if reader.format().is_none() {
        return Err(FolioError::Image(
            "unsupported image format (expected JPEG, PNG or WebP)".to_string(),
        ));
    }
    let img = reader
        .decode()
        .map_err(|e| FolioError::Image(format!("failed to decode image: {}", e)))?;
    Ok(img.to_rgba8())
}

/// Decoded images for one render pass, keyed by source URI.
#[derive(Debug, Default)]
pub struct ImageSet {
    images: HashMap<String, RgbaImage>,
}

impl ImageSet {
    /// Fetch and decode every distinct URI concurrently. Each load, fetch
    /// and decode together, gets `timeout`; failures are logged once per URI
    /// and left out of the set.
    pub async fn load<'a, I>(
        uris: I,
        fetcher: &dyn ImageFetcher,
        timeout: Duration,
        diag: &mut Diagnostics,
    ) -> ImageSet
    where
        I: IntoIterator<Item = &'a str>,
    {
        Self::load_with(uris, fetcher, decode_image_bytes, timeout, diag).await
    }

    async fn load_with<'a, I, D>(
        uris: I,
        fetcher: &dyn ImageFetcher,
        decode: D,
        timeout: Duration,
        diag: &mut Diagnostics,
    ) -> ImageSet
    where
        I: IntoIterator<Item = &'a str>,
        D: Fn(&[u8]) -> Result<RgbaImage> + Copy + Send + 'static,
    {
        let mut seen = HashSet::new();
        let unique: Vec<&str> = uris.into_iter().filter(|u| seen.insert(*u)).collect();

        let loads = unique.iter().map(|&uri| async move {
            let load = async {
                let bytes = fetcher.fetch(uri).await?;
                // Off the async workers so the deadline can fire mid-decode.
                tokio::task::spawn_blocking(move || decode(&bytes))
                    .await
                    .map_err(|e| FolioError::Image(format!("decode task failed: {}", e)))?
            };
            let outcome = match tokio::time::timeout(timeout, load).await {
                Ok(result) => result,
                Err(_) => Err(FolioError::Image(format!(
                    "timed out after {} ms",
                    timeout.as_millis()
                ))),
            };
            (uri, outcome)
        });

        let mut images = HashMap::new();
        for (uri, outcome) in join_all(loads).await {
            match outcome {
                Ok(img) => {
                    log::debug!("loaded image {}x{}", img.width(), img.height());
                    images.insert(uri.to_string(), img);
                }
                Err(e) => diag.warn(RenderWarning::ImageLoadFailed {
                    uri: uri.to_string(),
                    reason: e.to_string(),
                }),
            }
        }
        ImageSet { images }
    }

    pub fn get(&self, uri: &str) -> Option<&RgbaImage> {
        self.images.get(uri)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use image::Rgba;

    fn png_bytes(color: [u8; 4]) -> Vec<u8> {
        let img = RgbaImage::from_pixel(2, 2, Rgba(color));
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(encoder, img.as_raw(), 2, 2, image::ColorType::Rgba8)
            .unwrap();
        buf
    }

    struct MapFetcher(HashMap<String, Vec<u8>>);

    impl ImageFetcher for MapFetcher {
        fn fetch<'a>(&'a self, uri: &'a str) -> BoxFuture<'a, Result<Vec<u8>>> {
            Box::pin(async move {
                self.0
                    .get(uri)
                    .cloned()
                    .ok_or_else(|| FolioError::Image("HTTP status 404 Not Found".to_string()))
            })
        }
    }

    struct SlowFetcher;

    impl ImageFetcher for SlowFetcher {
        fn fetch<'a>(&'a self, _uri: &'a str) -> BoxFuture<'a, Result<Vec<u8>>> {
            Box::pin(async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(png_bytes([0, 0, 0, 255]))
            })
        }
    }

    #[test]
    fn test_decode_png() {
        let img = decode_image_bytes(&png_bytes([255, 0, 0, 128])).unwrap();
        assert_eq!(img.dimensions(), (2, 2));
        assert_eq!(img.get_pixel(0, 0), &Rgba([255, 0, 0, 128]));
    }

    #[test]
    fn test_decode_jpeg() {
        let img = image::RgbImage::from_fn(2, 2, |_, _| image::Rgb([0, 128, 255]));
        let mut buf = Vec::new();
        let encoder = image::codecs::jpeg::JpegEncoder::new(&mut buf);
        image::ImageEncoder::write_image(encoder, img.as_raw(), 2, 2, image::ColorType::Rgb8)
            .unwrap();
        let decoded = decode_image_bytes(&buf).unwrap();
        assert_eq!(decoded.dimensions(), (2, 2));
        assert_eq!(decoded.get_pixel(0, 0)[3], 255);
    }

    #[test]
    fn test_too_short_and_unknown_data() {
        assert!(decode_image_bytes(&[0x00, 0x01]).is_err());
        assert!(decode_image_bytes(&[0x00, 0x01, 0x02, 0x03, 0x04]).is_err());
    }

    #[test]
    fn test_classify_sources() {
        assert!(matches!(classify_source("https://x/y.jpg"), Source::Http(_)));
        assert!(matches!(classify_source("file:///tmp/a.png"), Source::File("/tmp/a.png")));
        assert!(matches!(classify_source("./a.png"), Source::File(_)));
        assert!(matches!(classify_source("data:image/png;base64,AAAA"), Source::DataUri("AAAA")));
        assert!(matches!(classify_source("data:image/png;base64"), Source::Invalid(_)));
        assert!(matches!(classify_source("data:image/svg+xml,<svg/>"), Source::Invalid(_)));
        assert!(matches!(classify_source("iVBORw0KGgo="), Source::Base64(_)));
        assert!(matches!(classify_source("iVBO/Rw0+KGgo="), Source::Base64(_)));
        assert!(matches!(classify_source("img/a.png"), Source::File("img/a.png")));
        assert!(matches!(classify_source("photos\\a"), Source::File(_)));
    }

    #[tokio::test]
    async fn test_relative_paths_are_read_from_disk() {
        let bytes = png_bytes([0, 0, 255, 255]);
        // Alphanumeric name, so only the existence check can tell it from base64.
        let dir = tempfile::Builder::new().prefix("folio").tempdir_in(".").unwrap();
        let name = dir.path().file_name().unwrap().to_str().unwrap().to_string();
        std::fs::write(dir.path().join("blue.png"), &bytes).unwrap();
        std::fs::write(dir.path().join("noext"), &bytes).unwrap();

        let fetcher = DefaultFetcher::new();
        let with_ext = format!("{}/blue.png", name);
        let without_ext = format!("{}/noext", name);
        assert!(matches!(classify_source(&without_ext), Source::File(_)));
        assert_eq!(fetcher.fetch(&with_ext).await.unwrap(), bytes);
        assert_eq!(fetcher.fetch(&without_ext).await.unwrap(), bytes);

        let err = fetcher.fetch("img/missing.png").await.unwrap_err();
        assert!(err.to_string().contains("failed to read image file"), "{}", err);
    }

    #[tokio::test]
    async fn test_default_fetcher_data_uri_and_file() {
        let bytes = png_bytes([0, 255, 0, 255]);
        let b64 = base64::engine::general_purpose::STANDARD.encode(&bytes);
        let fetcher = DefaultFetcher::new();

        let data_uri = format!("data:image/png;base64,{}", b64);
        assert_eq!(fetcher.fetch(&data_uri).await.unwrap(), bytes);
        assert_eq!(fetcher.fetch(&b64).await.unwrap(), bytes);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("green.png");
        std::fs::write(&path, &bytes).unwrap();
        let file_uri = format!("file://{}", path.display());
        assert_eq!(fetcher.fetch(&file_uri).await.unwrap(), bytes);

        assert!(fetcher.fetch("/definitely/not/here.png").await.is_err());
    }

    #[tokio::test]
    async fn test_image_set_skips_failures_once_per_uri() {
        let mut map = HashMap::new();
        map.insert("ok.png".to_string(), png_bytes([1, 2, 3, 255]));
        map.insert("garbage.png".to_string(), vec![1, 2, 3, 4, 5, 6]);
        let fetcher = MapFetcher(map);

        let mut diag = Diagnostics::new();
        let set = ImageSet::load(
            ["ok.png", "missing.png", "missing.png", "garbage.png"],
            &fetcher,
            Duration::from_secs(1),
            &mut diag,
        )
        .await;

        assert_eq!(set.len(), 1);
        assert!(set.get("ok.png").is_some());
        assert!(set.get("missing.png").is_none());
        assert_eq!(diag.image_failures(), 2);
        match &diag.warnings()[0] {
            RenderWarning::ImageLoadFailed { uri, reason } => {
                assert_eq!(uri, "missing.png");
                assert!(reason.contains("404"));
            }
            other => panic!("unexpected warning {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_image_set_timeout() {
        let mut diag = Diagnostics::new();
        let set = ImageSet::load(["slow.png"], &SlowFetcher, Duration::from_millis(20), &mut diag).await;
        assert!(set.is_empty());
        assert_eq!(diag.image_failures(), 1);
        assert!(diag.warnings()[0].to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_timeout_covers_decode() {
        let mut map = HashMap::new();
        map.insert("big.png".to_string(), png_bytes([9, 9, 9, 255]));
        let fetcher = MapFetcher(map);
        let slow_decode = |data: &[u8]| {
            std::thread::sleep(Duration::from_millis(300));
            decode_image_bytes(data)
        };

        let mut diag = Diagnostics::new();
        let started = std::time::Instant::now();
        let set = ImageSet::load_with(
            ["big.png"],
            &fetcher,
            slow_decode,
            Duration::from_millis(20),
            &mut diag,
        )
        .await;
        assert!(started.elapsed() < Duration::from_millis(250));
        assert!(set.is_empty());
        assert!(diag.warnings()[0].to_string().contains("timed out"));

        let mut diag = Diagnostics::new();
        let set = ImageSet::load_with(
            ["big.png"],
            &fetcher,
            slow_decode,
            Duration::from_secs(5),
            &mut diag,
        )
        .await;
        assert_eq!(set.len(), 1);
        assert!(diag.is_empty());
    }
}
