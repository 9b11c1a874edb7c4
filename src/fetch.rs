use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::ScrapeError;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; SLDDecklists/0.1)";
const TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_RETRIES: u32 = 4;
const BASE_BACKOFF_MS: u64 = 1000;

/// Blocking HTTP client with retry/backoff and an optional on-disk cache
pub struct HttpClient {
    client: Client,
    cache_dir: Option<PathBuf>,
    max_retries: u32,
}

impl HttpClient {
    pub fn new(cache_dir: Option<PathBuf>, max_retries: u32) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            cache_dir,
            max_retries,
        })
    }

    fn url_to_cache_path(&self, url: &str) -> Option<PathBuf> {
        let cache_dir = self.cache_dir.as_ref()?;
        // Query strings carry the search, so they are part of the key
        let url = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
            .unwrap_or(url);
        let key: String = url
            .chars()
            .map(|c| match c {
                '?' | '&' | '=' | ':' | '*' | '"' | '<' | '>' | '|' => '_',
                c => c,
            })
            .collect();
        Some(cache_dir.join(key))
    }

    fn read_cache(&self, url: &str) -> Option<Vec<u8>> {
        let path = self.url_to_cache_path(url)?;
        let bytes = fs::read(&path).ok()?;
        debug!("cache hit {}", path.display());
        Some(bytes)
    }

    fn write_cache(&self, url: &str, bytes: &[u8]) {
        let Some(path) = self.url_to_cache_path(url) else {
            return;
        };
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!("Failed to create cache dir {}: {}", parent.display(), e);
                return;
            }
        }
        if let Err(e) = fs::write(&path, bytes) {
            warn!("Failed to write cache {}: {}", path.display(), e);
        }
    }

    /// GET with retries on transport errors, 429 and 5xx
    fn send(&self, url: &str, accept: &str) -> Result<Response, ScrapeError> {
        let mut attempt = 0;
        loop {
            let result = self.client.get(url).header(ACCEPT, accept).send();

            let retryable = match &result {
                Ok(resp) => is_retryable(resp.status()),
                Err(e) => !e.is_builder(),
            };

            if !retryable || attempt >= self.max_retries {
                return result
                    .and_then(|resp| resp.error_for_status())
                    .map_err(|e| ScrapeError::fetch(url, e));
            }

            let backoff = Duration::from_millis(BASE_BACKOFF_MS * 2u64.pow(attempt));
            warn!(
                "Request to {} failed (attempt {}/{}), retrying in {:.1}s",
                url,
                attempt + 1,
                self.max_retries,
                backoff.as_secs_f64()
            );
            thread::sleep(backoff);
            attempt += 1;
        }
    }

    pub fn get_bytes(&self, url: &str) -> Result<Vec<u8>, ScrapeError> {
        if let Some(bytes) = self.read_cache(url) {
            return Ok(bytes);
        }
        let bytes = self
            .send(url, "*/*")?
            .bytes()
            .map_err(|e| ScrapeError::fetch(url, e))?
            .to_vec();
        self.write_cache(url, &bytes);
        Ok(bytes)
    }

    pub fn get_text(&self, url: &str) -> Result<String, ScrapeError> {
        if let Some(bytes) = self.read_cache(url) {
            return Ok(String::from_utf8_lossy(&bytes).into_owned());
        }
        let text = self
            .send(url, "text/html,*/*")?
            .text()
            .map_err(|e| ScrapeError::fetch(url, e))?;
        self.write_cache(url, text.as_bytes());
        Ok(text)
    }

    /// JSON responses are never cached
    pub fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ScrapeError> {
        let text = self
            .send(url, "application/json")?
            .text()
            .map_err(|e| ScrapeError::fetch(url, e))?;
        serde_json::from_str(&text).map_err(|e| ScrapeError::fetch(url, e))
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}
