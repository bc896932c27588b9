//! HTTP transport: request construction, header defaults, gzip handling, and
//! status-code-to-error mapping shared by every component that talks to
//! `www.tiktok.com` or `webcast.tiktok.com`.

mod cookies;

pub(crate) use cookies::CookieJar;

use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};

use crate::error::{Error, Result};

pub(crate) const TIKTOK_BASE_URL: &str = "https://www.tiktok.com/";
pub(crate) const WEBCAST_BASE_URL: &str = "https://webcast.tiktok.com/webcast/";
pub(crate) const ROOM_DATA_ENDPOINT: &str = "webcast/fetch/";

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/102.0.5005.63 Safari/537.36";
const REFERER: &str = "https://www.tiktok.com/";
const ORIGIN: &str = "https://www.tiktok.com";

/// Which base URL a request is rooted at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Base {
    /// `https://webcast.tiktok.com/webcast/`
    Webcast,
    /// `https://www.tiktok.com/`
    TikTok,
}

/// Parameters for a single outgoing request, mirroring `reqOptions` in the
/// original implementation.
pub(crate) struct RequestOptions<'a> {
    pub endpoint: &'a str,
    pub base: Base,
    pub is_post: bool,
    pub query: HashMap<String, String>,
    pub extra_headers: HashMap<String, String>,
    /// Overrides `base`'s URL entirely, used when signing against a
    /// caller-configured signer host instead of `webcast.tiktok.com`.
    pub base_override: Option<String>,
}

impl<'a> RequestOptions<'a> {
    pub fn get(endpoint: &'a str, base: Base) -> Self {
        RequestOptions {
            endpoint,
            base,
            is_post: false,
            query: HashMap::new(),
            extra_headers: HashMap::new(),
            base_override: None,
        }
    }
}

/// A decoded response body, status, and headers (the latter needed by
/// callers that read `X-Set-TT-Cookie` or content-type).
pub(crate) struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

/// Thin wrapper over [`reqwest::Client`] applying TikTok's expected default
/// headers, query encoding, gzip handling, and status mapping to every call.
#[derive(Clone)]
pub struct Transport {
    client: reqwest::Client,
    pub(crate) cookies: Arc<CookieJar>,
    /// Mirrors `TikTok.LogRequests` in the original: when set, full response
    /// bodies are dumped at debug level alongside the always-on
    /// method/URL/status line.
    log_bodies: bool,
}

impl Transport {
    /// `danger_accept_invalid_certs` is only ever set when the caller's proxy
    /// config explicitly opts into it (self-signed MITM proxies used for
    /// local debugging); never on by default.
    pub(crate) fn new(proxy: Option<reqwest::Proxy>, insecure: bool, log_bodies: bool) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .gzip(false) // we decode gzip ourselves to inspect X-Set-TT-Cookie alongside it
            .danger_accept_invalid_certs(insecure);

        if let Some(proxy) = proxy {
            builder = builder.proxy(proxy);
        }

        let client = builder.build().map_err(|source| Error::Transport {
            endpoint: "client build".to_string(),
            source,
        })?;

        Ok(Transport {
            client,
            cookies: Arc::new(CookieJar::default()),
            log_bodies,
        })
    }

    fn full_url(&self, opts: &RequestOptions<'_>) -> String {
        if let Some(base) = &opts.base_override {
            return format!("{base}{}", opts.endpoint);
        }
        let base = match opts.base {
            Base::Webcast => WEBCAST_BASE_URL,
            Base::TikTok => TIKTOK_BASE_URL,
        };
        format!("{base}{}", opts.endpoint)
    }

    /// Sends a request per `opts`, applying default headers, query encoding
    /// (empty values are dropped, matching `vs.Add` being skipped for `""`),
    /// cookie attachment, gzip decoding, and status-code mapping.
    pub(crate) async fn send(&self, opts: RequestOptions<'_>) -> Result<RawResponse> {
        let method = if opts.is_post { Method::POST } else { Method::GET };
        let url = self.full_url(&opts);

        let mut query: Vec<(String, String)> = opts
            .query
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        query.sort();

        let mut req = self.client.request(method.clone(), &url);
        req = if opts.is_post {
            req.form(&query)
        } else {
            req.query(&query)
        };

        let mut headers = HeaderMap::new();
        headers.insert(reqwest::header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
        headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static("text/html,application/json,application/protobuf"),
        );
        headers.insert(reqwest::header::REFERER, HeaderValue::from_static(REFERER));
        headers.insert(reqwest::header::ORIGIN, HeaderValue::from_static(ORIGIN));
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.9"),
        );
        headers.insert(
            reqwest::header::ACCEPT_ENCODING,
            HeaderValue::from_static("gzip, deflate"),
        );
        headers.insert(
            reqwest::header::CACHE_CONTROL,
            HeaderValue::from_static("max-age=0"),
        );

        for (k, v) in &opts.extra_headers {
            if v.is_empty() {
                continue;
            }
            if let (Ok(name), Ok(value)) = (
                HeaderName::try_from(k.as_str()),
                HeaderValue::from_str(v),
            ) {
                headers.insert(name, value);
            }
        }

        if let Some(cookie_header) = self.cookies.header_for(&url) {
            headers.insert(
                reqwest::header::COOKIE,
                HeaderValue::from_str(&cookie_header).map_err(|_| {
                    Error::CookieParse("assembled cookie header was not valid ASCII".to_string())
                })?,
            );
        }

        req = req.headers(headers);

        let resp = req.send().await.map_err(|source| Error::Transport {
            endpoint: opts.endpoint.to_string(),
            source,
        })?;

        let status = resp.status();
        let headers = resp.headers().clone();
        let url_for_err = url.clone();
        let body_bytes = resp.bytes().await.map_err(|source| Error::Transport {
            endpoint: opts.endpoint.to_string(),
            source,
        })?;

        log::debug!("{method} {url} -> {status}");
        if self.log_bodies {
            log::debug!("{method} {url} body: {}", String::from_utf8_lossy(&body_bytes));
        }

        if status.as_u16() == 429 {
            return Err(Error::RateLimitExceeded { url: url_for_err });
        }
        if status.as_u16() == 403 {
            return Err(Error::IpBlockedOrBanned);
        }
        if status.as_u16() >= 400 {
            return Err(Error::Http {
                status: status.as_u16(),
                url: url_for_err,
            });
        }

        self.cookies.ingest_set_tt_cookie(&headers)?;

        let body = if headers
            .get(reqwest::header::CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            == Some("gzip")
        {
            decode_gzip(&body_bytes)?
        } else {
            body_bytes.to_vec()
        };

        Ok(RawResponse { status, headers, body })
    }
}

fn decode_gzip(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = flate2::read::GzDecoder::new(bytes);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}
