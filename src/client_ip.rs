use axum::http::{HeaderMap, HeaderName};
use std::net::IpAddr;

pub const UNKNOWN_CLIENT: &str = "unknown";

/// Best-effort client identifier from forwarding headers.
///
/// Forwarding headers are set by whoever sent the request, so unless a
/// trusted proxy overwrites them this value is spoofable. It is good enough
/// to key coarse abuse limits on, never to make an access decision. The list
/// of headers consulted is the trust boundary and comes from configuration.
#[derive(Debug, Clone)]
pub struct ClientIpResolver {
    trusted_headers: Vec<HeaderName>,
}

impl Default for ClientIpResolver {
    fn default() -> Self {
        Self::new(vec![
            HeaderName::from_static("x-forwarded-for"),
            HeaderName::from_static("x-real-ip"),
        ])
    }
}

impl ClientIpResolver {
    pub fn new(trusted_headers: Vec<HeaderName>) -> Self {
        Self { trusted_headers }
    }

    pub fn trusted_headers(&self) -> &[HeaderName] {
        &self.trusted_headers
    }

    // First header (in configured order) holding a parseable IP wins.
    // Comma lists (x-forwarded-for) contribute their left-most element.
    pub fn ip_from_headers(&self, headers: &HeaderMap) -> String {
        self.trusted_headers
            .iter()
            .filter_map(|name| headers.get(name))
            .filter_map(|value| value.to_str().ok())
            .filter_map(|value| value.split(',').next())
            .map(str::trim)
            .find(|candidate| candidate.parse::<IpAddr>().is_ok())
            .map(str::to_string)
            .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
    }
}
