//! Black-box tests against the crate's public surface only. Scenario tests
//! that need to drive a stub push-channel socket with raw protobuf frames
//! live in `src/session/e2e.rs` instead, since `codec::proto` isn't public.

use tiktok_live::capture::StreamCapture;
use tiktok_live::{ClientConfig, ClientHub};

#[test]
fn default_config_has_no_trace_file_and_default_signer() {
    let config = ClientConfig::default();
    assert!(!config.ws_trace_enabled());
    assert_eq!(config.signer_url(), "https://tiktok.eulerstream.com/");
}

#[test]
fn builder_enable_ws_trace_is_reflected_on_the_built_config() {
    let config = ClientConfig::builder()
        .enable_ws_trace("/tmp/does-not-need-to-exist.trace")
        .build();
    assert!(config.ws_trace_enabled());
}

#[tokio::test]
async fn hub_new_fails_when_signer_rate_limits_endpoint_is_unreachable() {
    // Port 1 is reserved and nothing will ever answer on it.
    let config = ClientConfig::builder().signing_url("http://127.0.0.1:1/").build();
    let result = ClientHub::new(config).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn hub_new_succeeds_when_signing_limits_validation_is_disabled() {
    let config = ClientConfig::builder()
        .signing_url("http://127.0.0.1:1/")
        .disable_signing_limits_validation()
        .build();
    let hub = ClientHub::new(config).await.unwrap();
    assert_eq!(hub.session_count(), 0);
}

#[tokio::test]
async fn stream_capture_rejects_an_empty_hls_url() {
    let result = StreamCapture::start("", "/tmp/out.mp4", None).await;
    assert!(matches!(result, Err(tiktok_live::Error::UrlNotFound)));
}
