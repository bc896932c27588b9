//! Signer client: TikTok's `webcast/fetch/` endpoint requires a signed
//! `X-Bogus`/`msToken` pair that only a signer service can produce. This
//! module talks to that service (eulerstream.com by default, or any signer
//! implementing the same API) and rate-limits calls to it.

mod rate_limiter;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::Deserialize;

use crate::config::{ClientConfig, DEFAULT_SIGN_RATE_LIMIT_PER_MINUTE};
use crate::error::Result;
use crate::http::{RequestOptions, Transport};
use rate_limiter::SignRateLimiter;

const SIGN_ENDPOINT: &str = "webcast/fetch/";

#[derive(Debug, Deserialize)]
struct LimitsWindow {
    max: u32,
}

#[derive(Debug, Deserialize)]
struct LimitsResponse {
    minute: LimitsWindow,
}

/// Signs requests to TikTok's webcast fetch endpoint and tracks how many
/// concurrent sessions are driving signing traffic (`uuc` in the signed
/// query, short for "unique user count").
pub(crate) struct SignerClient {
    transport: Transport,
    signer_url: String,
    api_key: Option<String>,
    client_name: String,
    limiter: SignRateLimiter,
    active_streams: Arc<AtomicUsize>,
}

impl SignerClient {
    pub async fn new(transport: Transport, config: &ClientConfig, client_name: String) -> Result<Self> {
        let active_streams = Arc::new(AtomicUsize::new(0));

        let rate = if config.query_signing_limits {
            fetch_signer_limit(&transport, &config.signer_url, config.signer_api_key.as_deref())
                .await?
        } else {
            DEFAULT_SIGN_RATE_LIMIT_PER_MINUTE
        };

        Ok(SignerClient {
            transport,
            signer_url: config.signer_url.clone(),
            api_key: config.signer_api_key.clone(),
            client_name,
            limiter: SignRateLimiter::per_minute(rate),
            active_streams,
        })
    }

    pub fn track_stream_started(&self) {
        self.active_streams.fetch_add(1, Ordering::SeqCst);
    }

    pub fn track_stream_stopped(&self) {
        self.active_streams.fetch_sub(1, Ordering::SeqCst);
    }

    /// Signs `request_url` (the full `webcast.tiktok.com/...` URL the
    /// request was about to be sent to) and returns the signer's response
    /// body, which is itself the already-proxied webcast response.
    pub async fn sign(&self, request_url: &str, room_id: &str) -> Result<Vec<u8>> {
        self.limiter.take().await;

        let mut query = HashMap::new();
        query.insert("client".to_string(), self.client_name.clone());
        query.insert(
            "uuc".to_string(),
            self.active_streams.load(Ordering::SeqCst).to_string(),
        );
        query.insert("url".to_string(), request_url.to_string());
        query.insert("room_id".to_string(), room_id.to_string());
        if let Some(key) = &self.api_key {
            query.insert("apiKey".to_string(), key.clone());
        }

        let opts = RequestOptions {
            endpoint: SIGN_ENDPOINT,
            base: crate::http::Base::TikTok,
            is_post: false,
            query,
            extra_headers: HashMap::new(),
            base_override: Some(self.signer_url.clone()),
        };

        let resp = self.transport.send(opts).await?;
        Ok(resp.body)
    }
}

/// Queries `{signer}/webcast/rate_limits`; a non-200 response fails client
/// construction outright, since an unreachable signer means the client would
/// otherwise run with no real throttle.
async fn fetch_signer_limit(
    transport: &Transport,
    signer_url: &str,
    api_key: Option<&str>,
) -> Result<u32> {
    let mut query = HashMap::new();
    if let Some(key) = api_key {
        query.insert("apiKey".to_string(), key.to_string());
    }
    let opts = RequestOptions {
        endpoint: "webcast/rate_limits",
        base: crate::http::Base::TikTok,
        is_post: false,
        base_override: Some(signer_url.to_string()),
        query,
        extra_headers: HashMap::new(),
    };
    let resp = transport.send(opts).await?;
    let parsed: LimitsResponse = serde_json::from_slice(&resp.body)?;
    Ok(parsed.minute.max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfigBuilder;
    use crate::http::Transport;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn fetch_signer_limit_parses_minute_max() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/webcast/rate_limits"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "minute": { "max": 7 }
            })))
            .mount(&server)
            .await;

        let transport = Transport::new(None, false, false).unwrap();
        let base = format!("{}/", server.uri());
        let limit = fetch_signer_limit(&transport, &base, None).await.unwrap();
        assert_eq!(limit, 7);
    }

    #[tokio::test]
    async fn signer_client_new_fails_when_rate_limit_endpoint_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/webcast/rate_limits"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let transport = Transport::new(None, false, false).unwrap();
        let config = ClientConfigBuilder::default()
            .signing_url(format!("{}/", server.uri()))
            .build();
        let result = SignerClient::new(transport, &config, "test-client".to_string()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn sign_sends_expected_query_and_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/webcast/fetch/"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"signed-payload".to_vec()))
            .mount(&server)
            .await;

        let transport = Transport::new(None, false, false).unwrap();
        let config = ClientConfigBuilder::default()
            .signing_url(format!("{}/", server.uri()))
            .disable_signing_limits_validation()
            .build();
        let client = SignerClient::new(transport, &config, "test-client".to_string()).await.unwrap();

        let body = client.sign("https://webcast.tiktok.com/webcast/fetch/?room_id=1", "1").await.unwrap();
        assert_eq!(body, b"signed-payload");
    }
}
