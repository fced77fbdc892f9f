use crate::error::PvrError;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry-on-status policy with jittered exponential backoff between
/// attempts. The default mirrors what the arr servers need in practice:
/// gateway timeouts (504) are transient and worth retrying, everything
/// else is surfaced immediately.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub retryable_statuses: Vec<StatusCode>,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            retryable_statuses: vec![StatusCode::GATEWAY_TIMEOUT],
            min_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    fn is_retryable(&self, status: StatusCode) -> bool {
        self.retryable_statuses.contains(&status)
    }

    /// Delay before the given retry attempt (0-based): exponential from
    /// `min_delay`, capped at `max_delay`, jittered down to spread load.
    fn delay_for(&self, attempt: u32) -> Duration {
        let base = self
            .min_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay);
        let jittered = rand::thread_rng().gen_range(
            self.min_delay.as_millis()..=base.as_millis().max(self.min_delay.as_millis()),
        );
        Duration::from_millis(jittered as u64)
    }
}

/// Thin wrapper over `reqwest::Client` carrying the instance base URL, the
/// `X-Api-Key` header, and the retry policy. All PVR traffic goes through
/// here.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl RestClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, PvrError> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(api_key).map_err(|_| PvrError::InvalidApiKey)?;
        key.set_sensitive(true);
        headers.insert("X-Api-Key", key);

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|source| PvrError::Transport {
                endpoint: base_url.to_string(),
                source,
            })?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send a request, retrying on the policy's transient statuses and on
    /// network-level failures, up to `max_attempts`.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
    ) -> Result<reqwest::Response, PvrError> {
        let url = self.url(path);
        let mut attempt = 0u32;

        loop {
            let mut request = self.http.request(method.clone(), &url);
            if !query.is_empty() {
                request = request.query(query);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if !self.retry.is_retryable(status) {
                        return Ok(response);
                    }
                    attempt += 1;
                    if attempt >= self.retry.max_attempts {
                        warn!(%url, %status, attempt, "giving up after retryable status");
                        return Err(PvrError::UnexpectedStatus {
                            endpoint: path.to_string(),
                            status,
                        });
                    }
                    let delay = self.retry.delay_for(attempt - 1);
                    debug!(%url, %status, attempt, ?delay, "retrying after transient status");
                    tokio::time::sleep(delay).await;
                }
                Err(source) => {
                    attempt += 1;
                    if attempt >= self.retry.max_attempts {
                        return Err(PvrError::Transport {
                            endpoint: path.to_string(),
                            source,
                        });
                    }
                    let delay = self.retry.delay_for(attempt - 1);
                    debug!(%url, attempt, ?delay, error = %source, "retrying after transport error");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// GET `path` expecting 200, decoding the JSON body into `T`.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, PvrError> {
        let response = self.execute(Method::GET, path, query, None).await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(PvrError::UnexpectedStatus {
                endpoint: path.to_string(),
                status,
            });
        }
        response.json().await.map_err(|source| PvrError::Decode {
            endpoint: path.to_string(),
            source,
        })
    }

    /// POST a JSON body to `path`, expecting the given status (the arr
    /// command endpoint answers 201 on acceptance).
    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        expect: StatusCode,
    ) -> Result<T, PvrError> {
        let body = serde_json::to_value(body).map_err(|e| PvrError::RemoteJobFailed {
            status: "unserializable".to_string(),
            message: e.to_string(),
        })?;
        let response = self.execute(Method::POST, path, &[], Some(&body)).await?;
        let status = response.status();
        if status != expect {
            return Err(PvrError::UnexpectedStatus {
                endpoint: path.to_string(),
                status,
            });
        }
        response.json().await.map_err(|source| PvrError::Decode {
            endpoint: path.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Deserialize)]
    struct Pong {
        ok: bool,
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            min_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            ..RetryPolicy::default()
        }
    }

    #[test]
    fn test_api_key_with_invalid_header_bytes_is_rejected() {
        let err = RestClient::new(
            "http://localhost",
            "key\nwith-newline",
            Duration::from_secs(5),
            RetryPolicy::default(),
        )
        .unwrap_err();
        assert!(matches!(err, PvrError::InvalidApiKey));
    }

    #[tokio::test]
    async fn test_retries_gateway_timeout_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .respond_with(ResponseTemplate::new(504))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let client =
            RestClient::new(&server.uri(), "key", Duration::from_secs(5), fast_retry()).unwrap();
        let pong: Pong = client.get_json("/ping", &[]).await.unwrap();
        assert!(pong.ok);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .respond_with(ResponseTemplate::new(504))
            .expect(3)
            .mount(&server)
            .await;

        let client =
            RestClient::new(&server.uri(), "key", Duration::from_secs(5), fast_retry()).unwrap();
        let err = client.get_json::<Pong>("/ping", &[]).await.unwrap_err();
        assert!(matches!(
            err,
            PvrError::UnexpectedStatus { status, .. } if status == StatusCode::GATEWAY_TIMEOUT
        ));
    }

    #[tokio::test]
    async fn test_non_retryable_status_fails_immediately() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let client =
            RestClient::new(&server.uri(), "key", Duration::from_secs(5), fast_retry()).unwrap();
        let err = client.get_json::<Pong>("/ping", &[]).await.unwrap_err();
        assert!(matches!(
            err,
            PvrError::UnexpectedStatus { status, .. } if status == StatusCode::INTERNAL_SERVER_ERROR
        ));
    }

    #[tokio::test]
    async fn test_malformed_body_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client =
            RestClient::new(&server.uri(), "key", Duration::from_secs(5), fast_retry()).unwrap();
        let err = client.get_json::<Pong>("/ping", &[]).await.unwrap_err();
        assert!(matches!(err, PvrError::Decode { .. }));
    }
}
