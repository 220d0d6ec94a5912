//! HTTP fetcher with bounded retries and 429-aware exponential backoff.

use std::time::Duration;

use rand::Rng;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::warn;

/// Fixed User-Agent sent with every request. The portal rejects obviously
/// headless clients; no other headers or cookies are managed.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Terminal fetch failure.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Every attempt failed; the caller should skip the item, not abort.
    #[error("no response from {url} after {attempts} attempts")]
    Exhausted { url: String, attempts: u32 },
}

/// Retrying HTTP client for detail-page fetches.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    max_retries: u32,
    initial_delay: Duration,
}

impl HttpClient {
    /// Create a client with the given per-request timeout and retry policy.
    pub fn new(timeout: Duration, max_retries: u32, initial_delay: Duration) -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            max_retries,
            initial_delay,
        }
    }

    /// Backoff base for consecutive HTTP 429 responses:
    /// `initial_delay * 2^attempt`. Jitter is added separately so the base
    /// stays monotonic across attempts.
    pub fn backoff_delay(attempt: u32, initial_delay: Duration) -> Duration {
        initial_delay * 2u32.saturating_pow(attempt)
    }

    fn jitter() -> Duration {
        Duration::from_secs_f64(rand::thread_rng().gen_range(1.0..3.0))
    }

    /// GET a URL, returning the response body or a terminal failure after
    /// `max_retries` attempts.
    ///
    /// HTTP 429 gets exponential backoff; timeouts, connection errors and
    /// every other non-success status wait a flat `initial_delay` before the
    /// next attempt. Non-retryable statuses (404 and friends) are retried
    /// identically - observed portal behavior, kept as-is.
    pub async fn get_with_retry(&self, url: &str) -> Result<String, FetchError> {
        for attempt in 0..self.max_retries {
            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status == StatusCode::TOO_MANY_REQUESTS {
                        let wait = Self::backoff_delay(attempt, self.initial_delay)
                            + Self::jitter();
                        warn!(
                            "Attempt {}/{} rejected (HTTP 429), waiting {:.2}s",
                            attempt + 1,
                            self.max_retries,
                            wait.as_secs_f64()
                        );
                        tokio::time::sleep(wait).await;
                        continue;
                    }

                    if status.is_success() {
                        match response.text().await {
                            Ok(body) => return Ok(body),
                            Err(e) => {
                                warn!(
                                    "Attempt {}/{} failed reading body: {}",
                                    attempt + 1,
                                    self.max_retries,
                                    e
                                );
                            }
                        }
                    } else {
                        warn!(
                            "Attempt {}/{} failed: HTTP {} for {}",
                            attempt + 1,
                            self.max_retries,
                            status,
                            url
                        );
                    }
                }
                Err(e) if e.is_timeout() => {
                    warn!("Attempt {}/{} failed: timeout", attempt + 1, self.max_retries);
                }
                Err(e) => {
                    warn!(
                        "Attempt {}/{} failed: connection error: {}",
                        attempt + 1,
                        self.max_retries,
                        e
                    );
                }
            }

            // Flat delay for non-429 failures
            tokio::time::sleep(self.initial_delay + Self::jitter()).await;
        }

        warn!("Giving up on {} after {} attempts", url, self.max_retries);
        Err(FetchError::Exhausted {
            url: url.to_string(),
            attempts: self.max_retries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_base_doubles_per_attempt() {
        let initial = Duration::from_secs(5);
        assert_eq!(HttpClient::backoff_delay(0, initial), Duration::from_secs(5));
        assert_eq!(HttpClient::backoff_delay(1, initial), Duration::from_secs(10));
        assert_eq!(HttpClient::backoff_delay(2, initial), Duration::from_secs(20));
    }

    #[test]
    fn backoff_base_is_monotonic() {
        let initial = Duration::from_secs(5);
        let mut previous = Duration::ZERO;
        for attempt in 0..5 {
            let delay = HttpClient::backoff_delay(attempt, initial);
            assert!(delay >= previous);
            previous = delay;
        }
    }

    #[test]
    fn jitter_stays_in_range() {
        for _ in 0..50 {
            let jitter = HttpClient::jitter();
            assert!(jitter >= Duration::from_secs(1));
            assert!(jitter < Duration::from_secs(3));
        }
    }

    #[test]
    fn user_agent_looks_like_a_browser() {
        assert!(USER_AGENT.starts_with("Mozilla/5.0"));
    }
}
