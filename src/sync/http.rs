// src/sync/http.rs

// HTTP client construction and the small header helpers shared by the
// listing fetch, the staleness check and the body download.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use reqwest::header::{HeaderMap, CONTENT_LENGTH, LAST_MODIFIED};
use reqwest::StatusCode;
use std::time::Duration;

use super::types::SyncOptions;

const USER_AGENT: &str = concat!("mirrorsync/", env!("CARGO_PKG_VERSION"));
const TCP_KEEPALIVE: Duration = Duration::from_secs(30);

/// The two client configurations used by a sync run.
///
/// `metadata` serves listings and HEAD requests and carries an overall
/// timeout. `download` streams file bodies and only bounds connection setup
/// and idle time, so a large transfer is never cut off by a blanket deadline.
/// Both accept any certificate the mirror presents.
#[derive(Clone)]
pub struct HttpClients {
    pub metadata: reqwest::Client,
    pub download: reqwest::Client,
}

impl HttpClients {
    pub fn new(options: &SyncOptions) -> Result<Self> {
        let metadata = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .danger_accept_invalid_certs(true)
            .timeout(options.metadata_timeout)
            .build()
            .context("Failed to build metadata HTTP client")?;

        let download = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .danger_accept_invalid_certs(true)
            .connect_timeout(options.connect_timeout)
            .tcp_keepalive(TCP_KEEPALIVE)
            .pool_idle_timeout(options.idle_timeout)
            .pool_max_idle_per_host(options.max_concurrent.max(1))
            .build()
            .context("Failed to build download HTTP client")?;

        Ok(HttpClients { metadata, download })
    }
}

/// Anything but a plain 200 is an error at every layer.
pub fn ensure_ok(status: StatusCode) -> Result<()> {
    if status != StatusCode::OK {
        bail!("HTTP {}", status);
    }
    Ok(())
}

/// URL of `name` inside the directory at `dir_url` (which ends in `/`).
pub fn file_url(dir_url: &str, name: &str) -> String {
    format!("{}{}", dir_url, urlencoding::encode(name))
}

/// `Content-Length` as sent by the server. HEAD responses have no body, so
/// the header is read directly instead of relying on body size hints.
pub fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

pub fn last_modified(headers: &HeaderMap) -> Option<DateTime<Utc>> {
    let value = headers.get(LAST_MODIFIED)?.to_str().ok()?;
    parse_http_date(value)
}

/// Parse an HTTP date in any of the three formats servers are allowed to send:
/// IMF-fixdate, RFC 850 and asctime.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%A, %d-%b-%y %H:%M:%S GMT", "%a %b %e %H:%M:%S %Y"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}
