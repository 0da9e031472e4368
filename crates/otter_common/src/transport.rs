//! Archive transport
//!
//! Fetches a URL into a local file, reporting fractional progress in
//! `[0.0, 1.0]`. Retries and TLS policy belong to the HTTP client.

use crate::error::{Result, UpdaterError};
use async_trait::async_trait;
use futures_util::StreamExt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Fraction-complete callback, may run on any runtime thread
pub type FractionFn<'a> = &'a (dyn Fn(f64) + Send + Sync);

#[async_trait]
pub trait Transport: Send + Sync {
    /// Download `url` to `dest` and return the path of the written file
    async fn fetch(&self, url: &str, dest: &Path, progress: FractionFn<'_>) -> Result<PathBuf>;
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("otter/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, url: &str, dest: &Path, progress: FractionFn<'_>) -> Result<PathBuf> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpdaterError::Network(format!(
                "HTTP {} for {}: {}",
                status.as_u16(),
                url,
                status.canonical_reason().unwrap_or("Unknown error")
            )));
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| UpdaterError::storage(parent, e))?;
        }
        let file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| UpdaterError::storage(dest, e))?;
        let mut writer = tokio::io::BufWriter::new(file);

        let total = response.content_length().filter(|len| *len > 0);
        let mut downloaded: u64 = 0;
        let mut last_percent: i64 = -1;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            writer
                .write_all(&chunk)
                .await
                .map_err(|e| UpdaterError::storage(dest, e))?;
            downloaded += chunk.len() as u64;

            if let Some(total) = total {
                let fraction = (downloaded as f64 / total as f64).min(1.0);
                let percent = (fraction * 100.0) as i64;
                if percent > last_percent {
                    last_percent = percent;
                    progress(fraction);
                }
            }
        }

        writer
            .flush()
            .await
            .map_err(|e| UpdaterError::storage(dest, e))?;
        if last_percent < 100 {
            progress(1.0);
        }

        debug!("Fetched {} bytes from {} into {}", downloaded, url, dest.display());
        Ok(dest.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_writes_body_and_reports_progress() {
        let server = MockServer::start().await;
        let body = vec![7u8; 64 * 1024];
        Mock::given(method("GET"))
            .and(path("/bundle.zip"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
            .mount(&server)
            .await;

        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("dl").join("archive");
        let seen = Mutex::new(Vec::new());
        let report = |f: f64| seen.lock().unwrap().push(f);

        let transport = HttpTransport::new().unwrap();
        let written = transport
            .fetch(&format!("{}/bundle.zip", server.uri()), &dest, &report)
            .await
            .unwrap();

        assert_eq!(written, dest);
        assert_eq!(std::fs::read(&dest).unwrap(), body);
        let seen = seen.lock().unwrap();
        assert!(!seen.is_empty());
        assert_eq!(*seen.last().unwrap(), 1.0);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn test_http_error_is_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let temp = TempDir::new().unwrap();
        let transport = HttpTransport::new().unwrap();
        let err = transport
            .fetch(&format!("{}/missing.zip", server.uri()), &temp.path().join("a"), &|_| {})
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "network");
        assert!(err.to_string().contains("404"));
    }
}
