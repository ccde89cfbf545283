use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::CONTENT_LENGTH;
use tracing::{debug, warn};
use url::Url;

/// Asks the CDN how large a variant is.
#[async_trait]
pub trait SizeProbe: Send + Sync {
    /// Byte size reported for `url`, or `None` when it cannot be determined.
    async fn content_length(&self, url: &Url) -> Option<u64>;
}

/// Issues a `HEAD` request and reads `Content-Length`.
#[derive(Clone)]
pub struct HttpSizeProbe {
    client: reqwest::Client,
}

impl HttpSizeProbe {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build size probe http client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SizeProbe for HttpSizeProbe {
    async fn content_length(&self, url: &Url) -> Option<u64> {
        let res = match self.client.head(url.clone()).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, %url, "size probe failed");
                return None;
            }
        };

        if !res.status().is_success() {
            warn!(status = %res.status(), %url, "size probe non-success status");
            return None;
        }

        let size = res
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        debug!(?size, %url, "size probe");
        size
    }
}

/// Answers every probe with the same size and counts the calls.
#[cfg(test)]
pub struct FixedSizeProbe {
    size: Option<u64>,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl FixedSizeProbe {
    pub fn new(size: Option<u64>) -> Self {
        Self {
            size,
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl SizeProbe for FixedSizeProbe {
    async fn content_length(&self, _url: &Url) -> Option<u64> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.size
    }
}
