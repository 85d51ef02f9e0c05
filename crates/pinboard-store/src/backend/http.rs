//! HTTP layer: status mapping and retry.
//!
//! This is the ONLY place for status code handling. The remote and url
//! backends never interpret status codes.

use std::time::Duration;

use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use reqwest::Method;
use tracing::{debug, warn};

use super::auth::TokenProvider;
use crate::error::{PinsError, PinsResult};

const USER_AGENT_VALUE: &str = concat!("pinboard/", env!("CARGO_PKG_VERSION"));
const MAX_DELAY: Duration = Duration::from_secs(30);
const MIN_DELAY: Duration = Duration::from_millis(10);

/// Delay before retry number `attempt` (1-based).
///
/// A server supplied `retry-after` is honored (capped) with +/-10% spread;
/// otherwise full jitter over a doubling window. `spread` is in `0.0..=1.0`.
fn retry_delay(err: &PinsError, attempt: u32, spread: f64) -> Duration {
    let delay = match err {
        PinsError::RateLimited {
            retry_after: Some(retry_after),
        } => (*retry_after).min(MAX_DELAY).mul_f64(0.9 + 0.2 * spread),
        _ => {
            let window = Duration::from_secs(1 << attempt.min(5)).min(MAX_DELAY);
            window.mul_f64(spread)
        }
    };
    delay.max(MIN_DELAY)
}

/// Shared reqwest client with auth and retry settings.
#[derive(Debug, Clone)]
pub(crate) struct HttpTransport {
    client: reqwest::Client,
    token_provider: TokenProvider,
    max_retries: u32,
}

impl HttpTransport {
    pub(crate) fn new(
        timeout_secs: u64,
        max_retries: u32,
        token_provider: TokenProvider,
    ) -> PinsResult<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .default_headers(default_headers)
            .build()
            .map_err(|e| PinsError::Network {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            token_provider,
            max_retries,
        })
    }

    /// GET a body; the whole response is buffered.
    pub(crate) async fn get_bytes(&self, url: &str) -> PinsResult<Vec<u8>> {
        let response = self.request(Method::GET, url, None).await?;
        let bytes = response.bytes().await.map_err(|e| PinsError::Network {
            message: format!("failed to read response body: {}", e),
        })?;
        Ok(bytes.to_vec())
    }

    /// Make a request, retrying transient failures.
    pub(crate) async fn request(
        &self,
        method: Method,
        url: &str,
        body: Option<&[u8]>,
    ) -> PinsResult<reqwest::Response> {
        let mut attempt = 0;

        loop {
            let err = match self.request_once(method.clone(), url, body).await {
                Ok(response) => return Ok(response),
                Err(e) => e,
            };
            if !err.is_retryable() || attempt >= self.max_retries {
                return Err(err);
            }
            attempt += 1;

            let delay = retry_delay(&err, attempt, rand::thread_rng().gen_range(0.0..=1.0));
            warn!(
                error = %err,
                %method,
                url,
                attempt,
                max_retries = self.max_retries,
                delay_ms = delay.as_millis() as u64,
                "retrying request"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn request_once(
        &self,
        method: Method,
        url: &str,
        body: Option<&[u8]>,
    ) -> PinsResult<reqwest::Response> {
        debug!(%method, url, "sending request");
        let mut request = self.client.request(method, url);

        if let Some(token) = self.token_provider.get_token().await? {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        if let Some(body) = body {
            request = request.body(body.to_vec());
        }

        let response = request.send().await?;
        let status = response.status();

        match status.as_u16() {
            200..=299 => Ok(response),

            401 | 403 => Err(PinsError::Unauthorized {
                message: "invalid or missing api key".to_string(),
            }),

            404 => Err(PinsError::NotFound {
                path: url.to_string(),
            }),

            429 => {
                let retry_after = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .map(Duration::from_secs);

                Err(PinsError::RateLimited { retry_after })
            }

            _ => {
                let message = response.text().await.unwrap_or_else(|_| status.to_string());
                Err(PinsError::Network {
                    message: format!("HTTP {}: {}", status.as_u16(), message),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_after_is_capped_and_spread() {
        let err = PinsError::RateLimited {
            retry_after: Some(Duration::from_secs(120)),
        };
        let low = retry_delay(&err, 1, 0.0);
        let high = retry_delay(&err, 1, 1.0);
        assert!(low.as_secs_f64() > 26.9 && low.as_secs_f64() < 27.1);
        assert!(high.as_secs_f64() > 32.9 && high.as_secs_f64() < 33.1);
    }

    #[test]
    fn backoff_window_doubles_up_to_the_cap() {
        let err = PinsError::Network {
            message: "HTTP 503".to_string(),
        };
        assert_eq!(retry_delay(&err, 1, 1.0), Duration::from_secs(2));
        assert_eq!(retry_delay(&err, 3, 1.0), Duration::from_secs(8));
        assert_eq!(retry_delay(&err, 9, 1.0), MAX_DELAY);
        assert_eq!(retry_delay(&err, 2, 0.0), MIN_DELAY);
    }
}
