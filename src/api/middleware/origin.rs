//! Origin check for WebSocket upgrades
//!
//! Browsers attach an `Origin` header to every upgrade request, so this is
//! where cross-site WebSocket hijacking is stopped. Requests without the
//! header come from non-browser clients and are accepted.

use axum::http::{header, HeaderMap};
use tracing::trace;
use url::Url;

use crate::config::OriginPolicy;
use crate::error::{RelayError, Result};

/// Check the request's `Origin` against the configured policy
pub fn check_origin(policy: &OriginPolicy, headers: &HeaderMap) -> Result<()> {
    let Some(origin) = headers.get(header::ORIGIN) else {
        trace!("No Origin header, accepting");
        return Ok(());
    };
    let origin = origin.to_str().map_err(|_| RelayError::OriginRejected {
        origin: String::from_utf8_lossy(origin.as_bytes()).into_owned(),
    })?;

    let allowed = match policy {
        OriginPolicy::AllowAll => true,
        OriginPolicy::SameHost => {
            let host = headers.get(header::HOST).and_then(|h| h.to_str().ok());
            match (origin_authority(origin), host) {
                (Some(authority), Some(host)) => authority.eq_ignore_ascii_case(host),
                _ => false,
            }
        }
        OriginPolicy::AllowList(origins) => {
            let origin = origin.trim_end_matches('/');
            origins.iter().any(|allowed| allowed.eq_ignore_ascii_case(origin))
        }
    };

    if allowed {
        Ok(())
    } else {
        Err(RelayError::OriginRejected {
            origin: origin.to_string(),
        })
    }
}

/// `host[:port]` of an origin, as it would appear in a Host header
fn origin_authority(origin: &str) -> Option<String> {
    let url = Url::parse(origin).ok()?;
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}
