use serde::{Deserialize, Serialize};

use super::transform::ImageFormat;

/// Request body for `POST /images/compress`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressRequest {
    pub url: String,
    pub original_size: u64,
    #[serde(default)]
    pub quality: Option<u16>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    /// Width/height are only applied when advanced options are on.
    #[serde(default)]
    pub advanced: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressedImage {
    pub url: String,
    pub size_url: String,
    pub original_size: u64,
    pub compressed_size: u64,
    pub estimated: bool, // true when the CDN did not report a size
    pub format: ImageFormat,
    pub quality: u8,
    pub saved_percent: i64,
    pub filename: String,
}
