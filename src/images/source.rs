//! Image Source Module
//!
//! Network side of the image cache: downloads raw bytes for a key.

use async_trait::async_trait;
use tracing::debug;

use crate::error::{CacheError, Result};
use crate::images::SizeVariant;

// == Image Source ==
#[async_trait]
pub trait ImageSource: Send + Sync + 'static {
    /// Downloads the bytes of `url` rendered at `variant`.
    async fn fetch(&self, url: &str, variant: SizeVariant) -> Result<Vec<u8>>;
}

// == HTTP Image Source ==
/// Downloads images over HTTP, passing the variant's width as a `w` query hint.
#[derive(Debug, Clone, Default)]
pub struct HttpImageSource {
    client: reqwest::Client,
}

impl HttpImageSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ImageSource for HttpImageSource {
    async fn fetch(&self, url: &str, variant: SizeVariant) -> Result<Vec<u8>> {
        debug!("Downloading {} at {}", url, variant);

        let response = self
            .client
            .get(url)
            .query(&[("w", variant.width_hint())])
            .send()
            .await
            .map_err(|e| CacheError::FetchFailed(format!("{}: {}", url, e)))?
            .error_for_status()
            .map_err(|e| CacheError::FetchFailed(format!("{}: {}", url, e)))?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| CacheError::FetchFailed(format!("{}: {}", url, e)))?;

        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Query, routing::get, Router};
    use std::collections::HashMap;
    use std::net::SocketAddr;

    /// Serves `/img.png`, answering with the `w` hint it was asked for.
    async fn spawn_image_server() -> SocketAddr {
        let app = Router::new().route(
            "/img.png",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                params.get("w").cloned().unwrap_or_default()
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn test_fetch_sends_width_hint() {
        let addr = spawn_image_server().await;
        let source = HttpImageSource::new();

        let url = format!("http://{}/img.png", addr);
        let large = source.fetch(&url, SizeVariant::Large).await.unwrap();
        let thumb = source.fetch(&url, SizeVariant::Thumbnail).await.unwrap();

        assert_eq!(large, b"480");
        assert_eq!(thumb, b"120");
    }

    #[tokio::test]
    async fn test_fetch_error_status_fails() {
        let addr = spawn_image_server().await;
        let source = HttpImageSource::new();

        let url = format!("http://{}/missing.png", addr);
        let result = source.fetch(&url, SizeVariant::Card).await;

        match result {
            Err(CacheError::FetchFailed(msg)) => assert!(msg.contains("missing.png")),
            other => panic!("expected FetchFailed, got {:?}", other.map(|b| b.len())),
        }
    }
}
