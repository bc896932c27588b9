//! Client configuration, built with the functional-options pattern translated
//! into a Rust builder (see [`ClientConfigBuilder`]).

use std::path::PathBuf;

const DEFAULT_SIGNER_URL: &str = "https://tiktok.eulerstream.com/";
/// Matches `clientNameDefault` in the original: identifies this client to the
/// signer, distinct from any particular consumer's user agent.
const DEFAULT_CLIENT_NAME: &str = "gotiktok_live";
/// Requests per minute applied when [`ClientConfigBuilder::disable_signing_limits_validation`]
/// is set and the signer's own limits are never queried.
pub const DEFAULT_SIGN_RATE_LIMIT_PER_MINUTE: u32 = 10;

#[derive(Debug, Clone)]
pub(crate) enum ProxyConfig {
    None,
    Url { url: String, insecure: bool },
}

impl Default for ProxyConfig {
    fn default() -> Self {
        ProxyConfig::None
    }
}

/// Immutable configuration shared by a [`crate::hub::ClientHub`] and every
/// [`crate::session::LiveSession`] it spawns.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub(crate) client_name: String,
    pub(crate) signer_url: String,
    pub(crate) signer_api_key: Option<String>,
    pub(crate) query_signing_limits: bool,
    pub(crate) enable_experimental_events: bool,
    pub(crate) enable_extra_debug: bool,
    pub(crate) ws_trace_file: Option<PathBuf>,
    pub(crate) proxy: ProxyConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            client_name: DEFAULT_CLIENT_NAME.to_string(),
            signer_url: DEFAULT_SIGNER_URL.to_string(),
            signer_api_key: None,
            query_signing_limits: true,
            enable_experimental_events: false,
            enable_extra_debug: false,
            ws_trace_file: None,
            proxy: ProxyConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    pub fn signer_url(&self) -> &str {
        &self.signer_url
    }

    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    pub fn ws_trace_enabled(&self) -> bool {
        self.ws_trace_file.is_some()
    }
}

/// Builder for [`ClientConfig`]. Each setter mirrors one `TikTokLiveOption`
/// from the original implementation.
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    inner: ClientConfig,
}

impl ClientConfigBuilder {
    /// Overrides the client name reported to the signer. Defaults to
    /// `"gotiktok_live"`.
    pub fn client_name(mut self, name: impl Into<String>) -> Self {
        self.inner.client_name = name.into();
        self
    }

    /// Sets the signer API key, forwarded as a bearer token to the signer.
    pub fn signing_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.inner.signer_api_key = Some(api_key.into());
        self
    }

    /// Overrides the signer base URL. Defaults to eulerstream.com's public
    /// signer, which implements <https://www.eulerstream.com/docs/openapi>.
    pub fn signing_url(mut self, url: impl Into<String>) -> Self {
        self.inner.signer_url = url.into();
        self
    }

    /// Skips querying the signer for its rate limits; the client instead
    /// caps itself at [`DEFAULT_SIGN_RATE_LIMIT_PER_MINUTE`] requests/minute.
    pub fn disable_signing_limits_validation(mut self) -> Self {
        self.inner.query_signing_limits = false;
        self
    }

    /// Enables events whose wire format is not yet stable.
    pub fn enable_experimental_events(mut self) -> Self {
        self.inner.enable_experimental_events = true;
        self
    }

    /// Enables verbose internal logging for development and triage; output
    /// shape carries no stability guarantee across versions.
    pub fn enable_extra_debug(mut self) -> Self {
        self.inner.enable_extra_debug = true;
        self
    }

    /// Records every push-channel frame (`<timestamp_ms> <direction> <hex>\n`)
    /// to `file`, overwriting it on each session start.
    pub fn enable_ws_trace(mut self, file: impl Into<PathBuf>) -> Self {
        self.inner.ws_trace_file = Some(file.into());
        self
    }

    /// Sets a proxy used for both the HTTP client and the push-channel
    /// socket. `HTTPS_PROXY`/`HTTP_PROXY` env vars apply when no override is
    /// set here; `ALL_PROXY` applies only to the push-channel socket.
    pub fn proxy(mut self, url: impl Into<String>, insecure: bool) -> Self {
        self.inner.proxy = ProxyConfig::Url {
            url: url.into(),
            insecure,
        };
        self
    }

    pub fn build(self) -> ClientConfig {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_client_name_matches_the_original_default() {
        let config = ClientConfig::default();
        assert_eq!(config.client_name(), "gotiktok_live");
    }

    #[test]
    fn builder_overrides_client_name() {
        let config = ClientConfig::builder().client_name("my-bot").build();
        assert_eq!(config.client_name(), "my-bot");
    }
}
