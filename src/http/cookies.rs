//! Minimal cookie jar for the `.tiktok.com` domain.
//!
//! TikTok's webcast API hands out fresh cookies via the non-standard
//! `X-Set-TT-Cookie` response header rather than `Set-Cookie`, so we can't
//! lean on `reqwest`'s cookie store and instead keep our own name/value map,
//! mirroring the original implementation's `ParseCookie` + `Jar.SetCookies`
//! round trip.

use std::sync::Mutex;

use reqwest::header::HeaderMap;

use crate::error::{Error, Result};

#[derive(Debug, Default)]
pub(crate) struct CookieJar {
    values: Mutex<std::collections::HashMap<String, String>>,
}

impl CookieJar {
    /// Parses the `X-Set-TT-Cookie` header, if present, as a `Cookie`-style
    /// `name=value; name2=value2` list and merges it into the jar.
    pub fn ingest_set_tt_cookie(&self, headers: &HeaderMap) -> Result<()> {
        let Some(raw) = headers.get("X-Set-TT-Cookie") else {
            return Ok(());
        };
        let raw = raw
            .to_str()
            .map_err(|_| Error::CookieParse("X-Set-TT-Cookie was not valid ASCII".to_string()))?;

        let mut values = self.values.lock().unwrap();
        for pair in raw.split(';') {
            let pair = pair.trim();
            if pair.is_empty() {
                continue;
            }
            let Some((name, value)) = pair.split_once('=') else {
                return Err(Error::CookieParse(format!(
                    "cookie pair missing '=': {pair}"
                )));
            };
            values.insert(name.trim().to_string(), value.trim().to_string());
        }
        Ok(())
    }

    /// Builds a `Cookie:` header value for any `tiktok.com` request, or
    /// `None` if the jar is empty.
    pub fn header_for(&self, _url: &str) -> Option<String> {
        let values = self.values.lock().unwrap();
        if values.is_empty() {
            return None;
        }
        Some(
            values
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Snapshots current cookies for handing to the push-channel dialer,
    /// which needs them as a literal `Cookie` header rather than via a jar.
    pub fn snapshot_header(&self) -> Option<String> {
        self.header_for("")
    }
}
