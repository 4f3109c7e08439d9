//! Request correlation ids
//!
//! Every request carries a [`RequestId`]. A caller (load balancer, upstream
//! service) may supply one in `x-request-id`; a valid ULID there is kept so
//! log lines line up across hops, anything else is replaced with a fresh id.
//! The id is echoed back on the response under the same header.

use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::time::SystemTime;

use http::header::{HeaderName, HeaderValue};
use http::HeaderMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Header carrying the correlation id in both directions.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Strongly typed request identifier backed by ULID.
///
/// Every [`RequestContext`](crate::context::RequestContext) carries one so log
/// lines emitted by the router, the middleware and the dispatcher can be
/// correlated for a single request.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct RequestId(pub ulid::Ulid);

impl RequestId {
    #[must_use]
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }

    /// Reuse the caller's id when it is a valid ULID, otherwise mint a fresh one.
    #[must_use]
    pub fn from_header_or_new(header_value: Option<&str>) -> Self {
        header_value
            .and_then(|s| s.trim().parse::<RequestId>().ok())
            .unwrap_or_default()
    }

    /// Take the id from inbound request headers, minting one when the header
    /// is missing, not ASCII, or not a ULID.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self::from_header_or_new(
            headers
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok()),
        )
    }

    /// Stamp the id onto outbound headers, replacing any existing value.
    pub fn write_to(&self, headers: &mut HeaderMap) {
        // Crockford base32 is always a valid header value
        if let Ok(value) = HeaderValue::from_str(&self.to_string()) {
            headers.insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
        }
    }

    /// When the id was minted, from the ULID timestamp.
    ///
    /// For ids taken from a caller this is the caller's clock, not ours.
    #[must_use]
    pub fn created_at(&self) -> SystemTime {
        self.0.datetime()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RequestId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(RequestId(ulid::Ulid::from_string(s)?))
    }
}

impl Serialize for RequestId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for RequestId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse::<RequestId>()
            .map_err(|_| serde::de::Error::custom("invalid request id"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_header_reuses_valid_ulid() {
        let original = RequestId::new();
        let text = original.to_string();
        assert_eq!(RequestId::from_header_or_new(Some(&text)), original);
    }

    #[test]
    fn test_from_header_generates_on_garbage() {
        let id = RequestId::from_header_or_new(Some("not-a-ulid"));
        assert_eq!(id.to_string().len(), 26);
        let missing = RequestId::from_header_or_new(None);
        assert_ne!(id, missing);
    }

    #[test]
    fn test_header_round_trip() {
        let mut inbound = HeaderMap::new();
        inbound.insert(
            HeaderName::from_bytes(b"X-Request-Id").unwrap(),
            " 01ARZ3NDEKTSV4RRFFQ69G5FAV ".parse().unwrap(),
        );
        let id = RequestId::from_headers(&inbound);
        assert_eq!(id.to_string(), "01ARZ3NDEKTSV4RRFFQ69G5FAV");

        let mut outbound = HeaderMap::new();
        outbound.insert(REQUEST_ID_HEADER, "stale".parse().unwrap());
        id.write_to(&mut outbound);
        assert_eq!(outbound.get_all(REQUEST_ID_HEADER).iter().count(), 1);
        assert_eq!(outbound[REQUEST_ID_HEADER], "01ARZ3NDEKTSV4RRFFQ69G5FAV");
    }

    #[test]
    fn test_from_headers_mints_when_absent_or_binary() {
        let empty = RequestId::from_headers(&HeaderMap::new());
        let mut binary = HeaderMap::new();
        binary.insert(
            REQUEST_ID_HEADER,
            HeaderValue::from_bytes(b"\xff\xfe").unwrap(),
        );
        let minted = RequestId::from_headers(&binary);
        assert_ne!(empty, minted);
    }

    #[test]
    fn test_created_at_tracks_ulid_timestamp() {
        let before = SystemTime::now() - std::time::Duration::from_secs(1);
        assert!(RequestId::new().created_at() >= before);

        let fixed: RequestId = "01ARZ3NDEKTSV4RRFFQ69G5FAV".parse().unwrap();
        let ms = fixed
            .created_at()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap()
            .as_millis();
        assert_eq!(ms, u128::from(fixed.0.timestamp_ms()));
    }

    #[test]
    fn test_serde_as_string() {
        let id = RequestId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
        let back: RequestId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
