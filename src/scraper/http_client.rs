use crate::config::ScraperConfig;
use crate::error::ScrapeError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::Rng;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, info};

use super::{PageFetcher, PageHandle, WaitPolicy};

const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// The one page session of a run. Every load goes through it in sequence;
/// dropping it releases the connection pool on every exit path.
pub struct BrowserSession {
    inner: reqwest::Client,
    config: ScraperConfig,
    current_url: Option<String>,
    loads: usize,
}

impl BrowserSession {
    pub fn open(config: &ScraperConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let accept = if config.block_subresources {
            "text/html,application/xhtml+xml"
        } else {
            "*/*"
        };
        headers.insert(ACCEPT, HeaderValue::from_static(accept));

        let inner = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .cookie_store(true)
            .build()
            .context("Failed to build HTTP client")?;

        info!("Page session opened ({})", config.base_url);
        Ok(Self {
            inner,
            config: config.clone(),
            current_url: None,
            loads: 0,
        })
    }

    async fn fetch(&mut self, url: &str) -> Result<PageHandle, ScrapeError> {
        self.polite_delay().await;
        debug!("GET {}", url);

        let resp = self
            .inner
            .get(url)
            .send()
            .await
            .map_err(|e| ScrapeError::navigation(url, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ScrapeError::navigation(url, format!("HTTP {}", status)));
        }

        let final_url = resp.url().to_string();
        let body = resp
            .text()
            .await
            .map_err(|e| ScrapeError::navigation(url, e))?;

        self.loads += 1;
        self.current_url = Some(final_url.clone());
        Ok(PageHandle::new(final_url, body))
    }

    /// Sleep for the configured delay + random jitter.
    async fn polite_delay(&self) {
        let jitter = rand::rng().random_range(0..=self.config.jitter_ms);
        let total = Duration::from_millis(self.config.request_delay_ms + jitter);
        if !total.is_zero() {
            sleep(total).await;
        }
    }
}

#[async_trait]
impl PageFetcher for BrowserSession {
    async fn load(&mut self, url: &str, wait: &WaitPolicy) -> Result<PageHandle, ScrapeError> {
        match wait {
            WaitPolicy::Eager => self.fetch(url).await,
            WaitPolicy::Element { selector, timeout } => {
                let deadline = Instant::now() + *timeout;
                loop {
                    let page = self.fetch(url).await?;
                    if page.has_element(selector)? {
                        return Ok(page);
                    }
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(ScrapeError::WaitTimeout {
                            url: url.to_string(),
                            selector: selector.clone(),
                            secs: timeout.as_secs(),
                        });
                    }
                    debug!("{}: `{}` not present yet, polling", url, selector);
                    sleep(POLL_INTERVAL.min(deadline - now)).await;
                }
            }
        }
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        info!(
            "Page session closed after {} loads (last: {})",
            self.loads,
            self.current_url.as_deref().unwrap_or("—")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_with_default_config() {
        let session = BrowserSession::open(&ScraperConfig::default()).unwrap();
        assert_eq!(session.loads, 0);
        assert!(session.current_url.is_none());
    }

    #[tokio::test]
    async fn unreachable_host_is_a_navigation_error() {
        let config = ScraperConfig {
            base_url: "http://127.0.0.1:9".into(),
            timeout_secs: 2,
            request_delay_ms: 0,
            jitter_ms: 0,
            ..ScraperConfig::default()
        };
        let mut session = BrowserSession::open(&config).unwrap();
        let err = session
            .load("http://127.0.0.1:9/cerealspricescalendar/2020/wheat", &WaitPolicy::Eager)
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Navigation { .. }));
        assert_eq!(session.loads, 0);
    }
}
