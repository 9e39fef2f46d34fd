//! Client-IP extraction and the geo-IP capability.
//!
//! # Design Decisions
//! - IP resolution order: `X-Forwarded-For` (first hop), `X-Real-IP`,
//!   then the TCP peer address
//! - Geo lookup is a capability seam; tables behind an impl are immutable
//!   after init

use std::net::SocketAddr;

use axum::http::HeaderMap;
use serde::Serialize;

pub const X_FORWARDED_FOR: &str = "X-Forwarded-For";
pub const X_REAL_IP: &str = "X-Real-IP";

/// Best-effort client address for analytics records.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(forwarded) = header_str(headers, X_FORWARDED_FOR) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    if let Some(real_ip) = header_str(headers, X_REAL_IP) {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return real_ip.to_string();
        }
    }
    peer.map(|addr| addr.ip().to_string()).unwrap_or_default()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// Geo-IP lookup capability. The gateway only consumes it; resolution is
/// provided externally.
pub trait GeoIp: Send + Sync {
    fn coordinates(&self, ip: &str) -> Option<Coordinates>;
    fn country(&self, ip: &str) -> Option<String>;
}

/// Default resolver when no geo database is wired in.
pub struct NoGeoIp;

impl GeoIp for NoGeoIp {
    fn coordinates(&self, _ip: &str) -> Option<Coordinates> {
        None
    }

    fn country(&self, _ip: &str) -> Option<String> {
        None
    }
}
