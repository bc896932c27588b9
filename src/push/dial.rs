//! Opens the push-channel websocket: builds the `wss://` URL from the
//! handshake's push params, attaches the accumulated HTTP cookies as a
//! `Cookie` header (TikTok's websocket doesn't honor a cookie jar the way a
//! browser would), and optionally tunnels through an HTTP CONNECT proxy.

use std::collections::HashMap;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::error::{Error, Result};

use super::PushChannelParams;

fn default_get_params() -> HashMap<String, String> {
    let mut m = HashMap::new();
    m.insert("aid".to_string(), "1988".to_string());
    m.insert("app_name".to_string(), "tiktok_web".to_string());
    m.insert("device_platform".to_string(), "web".to_string());
    m.insert("resp_content_type".to_string(), "protobuf".to_string());
    m
}

fn build_url(params: &PushChannelParams) -> String {
    let mut query = default_get_params();
    for (k, v) in &params.route_params {
        query.insert(k.clone(), v.clone());
    }
    query.insert("room_id".to_string(), params.room_id.clone());

    let mut pairs: Vec<(String, String)> = query.into_iter().collect();
    pairs.sort();
    let qs = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    format!("{}?{qs}", params.push_server)
}

pub(crate) async fn dial(
    params: &PushChannelParams,
) -> Result<WebSocketStream<MaybeTlsStream<TcpStream>>> {
    let url = build_url(params);
    let mut request: Request = url.clone().into_client_request()?;
    if let Some(cookie) = &params.cookie_header {
        request.headers_mut().insert(
            "Cookie",
            cookie
                .parse()
                .map_err(|_| Error::CookieParse("cookie header was not valid ASCII".to_string()))?,
        );
    }
    request
        .headers_mut()
        .insert("Sec-WebSocket-Protocol", "echo-protocol".parse().unwrap());

    if let Some(proxy) = &params.proxy_url {
        let tcp = tunnel_through_http_proxy(proxy, &request).await?;
        let (stream, _) = tokio_tungstenite::client_async_tls(request, tcp).await?;
        Ok(stream)
    } else {
        let (stream, _) = tokio_tungstenite::connect_async(request).await?;
        Ok(stream)
    }
}

/// Tunnels a raw TCP connection through an `http://`/`https://` CONNECT
/// proxy. SOCKS proxies (supported by the original via
/// `golang.org/x/net/proxy`) aren't implemented here; `ALL_PROXY`/explicit
/// overrides are expected to name an HTTP proxy.
async fn tunnel_through_http_proxy(proxy_url: &str, request: &Request) -> Result<TcpStream> {
    let target_host = request
        .uri()
        .host()
        .ok_or_else(|| Error::NoPushChannel)?
        .to_string();
    let target_port = request.uri().port_u16().unwrap_or(443);

    let proxy_uri: tokio_tungstenite::tungstenite::http::Uri = proxy_url
        .parse()
        .map_err(|_| Error::CookieParse(format!("invalid proxy URL: {proxy_url}")))?;
    let proxy_host = proxy_uri.host().ok_or_else(|| Error::NoPushChannel)?;
    let proxy_port = proxy_uri.port_u16().unwrap_or(80);

    let mut stream = TcpStream::connect((proxy_host, proxy_port)).await?;
    let connect_req = format!(
        "CONNECT {target_host}:{target_port} HTTP/1.1\r\nHost: {target_host}:{target_port}\r\n\r\n"
    );
    stream.write_all(connect_req.as_bytes()).await?;

    let mut buf = Vec::new();
    let mut chunk = [0u8; 512];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }
    let status_line = String::from_utf8_lossy(&buf);
    if !status_line.contains(" 200") {
        return Err(Error::Http {
            status: 502,
            url: format!("proxy connect to {target_host}:{target_port} via {proxy_url}"),
        });
    }

    Ok(stream)
}
