//! CDN variant URLs.
//!
//! The image CDN transforms whatever URL it is given according to the
//! `quality`, `format`, `width` and `height` query parameters, and reports the
//! byte size of the same variant under a `/size` path prefix.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

pub const DEFAULT_QUALITY: u8 = 80;

const TRANSFORM_KEYS: [&str; 4] = ["quality", "format", "width", "height"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransformError {
    #[error("invalid image url: {0}")]
    InvalidUrl(String),
    #[error("quality must be between 1 and 100, got {0}")]
    QualityOutOfRange(u16),
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Webp,
    Jpeg,
    Png,
    Avif,
}

impl ImageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Webp => "webp",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
            ImageFormat::Avif => "avif",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageFormat {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "webp" => Ok(ImageFormat::Webp),
            "jpeg" | "jpg" => Ok(ImageFormat::Jpeg),
            "png" => Ok(ImageFormat::Png),
            "avif" => Ok(ImageFormat::Avif),
            other => Err(TransformError::UnsupportedFormat(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformParams {
    quality: u8,
    pub format: ImageFormat,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl TransformParams {
    pub fn new(quality: u16, format: ImageFormat) -> Result<Self, TransformError> {
        if !(1..=100).contains(&quality) {
            return Err(TransformError::QualityOutOfRange(quality));
        }
        Ok(Self {
            quality: quality as u8,
            format,
            width: None,
            height: None,
        })
    }

    /// Zero dimensions are treated as unset.
    pub fn with_dimensions(mut self, width: Option<u32>, height: Option<u32>) -> Self {
        self.width = width.filter(|w| *w > 0);
        self.height = height.filter(|h| *h > 0);
        self
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }
}

impl Default for TransformParams {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
            format: ImageFormat::default(),
            width: None,
            height: None,
        }
    }
}

/// Parse `raw` and require it to share scheme, host and port with `cdn`.
fn parse_cdn_url(raw: &str, cdn: &Url) -> Result<Url, TransformError> {
    let url = Url::parse(raw.trim()).map_err(|e| TransformError::InvalidUrl(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") || !url.has_host() {
        return Err(TransformError::InvalidUrl(format!(
            "expected an http(s) url, got {}",
            url.scheme()
        )));
    }
    if url.origin() != cdn.origin() {
        return Err(TransformError::InvalidUrl(format!(
            "{} is not served by the image cdn",
            url.origin().ascii_serialization()
        )));
    }
    Ok(url)
}

/// Build the CDN URL of the transformed variant. Existing transform parameters
/// on `uploaded` are replaced; unrelated parameters are preserved.
pub fn variant_url(
    uploaded: &str,
    cdn: &Url,
    params: &TransformParams,
) -> Result<Url, TransformError> {
    let mut url = parse_cdn_url(uploaded, cdn)?;

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !TRANSFORM_KEYS.contains(&k.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    {
        let mut query = url.query_pairs_mut();
        query.clear();
        query.extend_pairs(kept);
        query.append_pair("quality", &params.quality.to_string());
        query.append_pair("format", params.format.as_str());
        if let Some(w) = params.width {
            query.append_pair("width", &w.to_string());
        }
        if let Some(h) = params.height {
            query.append_pair("height", &h.to_string());
        }
    }
    Ok(url)
}

/// Same variant, addressed under the CDN's `/size` prefix.
pub fn size_url(variant: &Url) -> Url {
    let mut url = variant.clone();
    let path = format!("/size{}", variant.path());
    url.set_path(&path);
    url
}

/// Fallback when the CDN does not report a size: 70% of the quality-scaled
/// original, rounded down.
pub fn estimate_compressed_size(original: u64, quality: u8) -> u64 {
    (original as u128 * quality as u128 * 7 / 1000) as u64
}

/// Percentage of bytes saved, rounded. Negative when the variant is larger.
pub fn saved_percent(original: u64, compressed: u64) -> i64 {
    if original == 0 {
        return 0;
    }
    let saved = original as f64 - compressed as f64;
    (saved / original as f64 * 100.0).round() as i64
}

/// File name offered on download.
pub fn download_filename(url: &Url, format: ImageFormat) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| name.contains('.'))
        .map(str::to_string)
        .unwrap_or_else(|| format!("compressed-image.{}", format))
}
