//! Client identification from request headers.
//!
//! The forwarded address is trusted as presented. Nothing here checks that
//! `x-forwarded-for` was set by a trusted hop, so a client that can reach the
//! gate directly can pick its own key.

use std::fmt;

use axum::http::{header, HeaderMap};

/// Header carrying the forwarded client address.
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Opaque identity used to bucket requests in the limiter.
///
/// The forwarded header value is taken verbatim. It is never parsed as an
/// address, so `"1.2.3.4, 10.0.0.1"` and `"1.2.3.4"` are different keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientKey(String);

impl ClientKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClientKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

/// `name/version` pair from the head of a user-agent string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub name: String,
    pub version: Option<String>,
}

/// Best-effort view of a `User-Agent` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAgent {
    /// Header value as sent.
    pub raw: String,
    /// First product token, e.g. `Mozilla/5.0`.
    pub product: Option<Product>,
    /// First entry of the first comment, e.g. `X11` or `Windows NT 10.0`.
    pub platform: Option<String>,
    /// Whether the agent looks like an automated client.
    pub is_bot: bool,
}

const BOT_MARKERS: &[&str] = &["bot", "crawler", "spider", "curl", "wget"];

impl UserAgent {
    /// Parse a user-agent string. Blank input yields `None`; anything else
    /// yields a value, with the parts that could not be recognised left empty.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        let product = raw
            .split(|c: char| c.is_whitespace() || c == '(')
            .find(|token| !token.is_empty())
            .map(|token| match token.split_once('/') {
                Some((name, version)) => Product {
                    name: name.to_string(),
                    version: (!version.is_empty()).then(|| version.to_string()),
                },
                None => Product {
                    name: token.to_string(),
                    version: None,
                },
            });

        let platform = raw
            .split_once('(')
            .and_then(|(_, rest)| rest.split_once(')'))
            .and_then(|(comment, _)| comment.split(';').next())
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);

        let lowered = raw.to_ascii_lowercase();
        let is_bot = BOT_MARKERS.iter().any(|marker| lowered.contains(marker));

        Some(Self {
            raw: raw.to_string(),
            product,
            platform,
            is_bot,
        })
    }
}

/// Who sent a request, as far as the headers tell.
///
/// Inserted into request extensions for admitted requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    pub address: Option<ClientKey>,
    pub user_agent: Option<UserAgent>,
}

impl ClientIdentity {
    /// Extract identity from request headers. Never fails.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            address: client_address(headers),
            user_agent: headers
                .get(header::USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .and_then(UserAgent::parse),
        }
    }
}

/// Forwarded client address, or `None` when the header is missing or empty.
/// Bytes that are not valid UTF-8 are replaced, so such a client is still
/// counted.
pub fn client_address(headers: &HeaderMap) -> Option<ClientKey> {
    headers
        .get(X_FORWARDED_FOR)
        .filter(|v| !v.is_empty())
        .map(|v| ClientKey::new(String::from_utf8_lossy(v.as_bytes())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn forwarded_header_is_taken_verbatim() {
        let mut headers = HeaderMap::new();
        headers.insert(X_FORWARDED_FOR, HeaderValue::from_static("1.2.3.4, 10.0.0.1"));

        let key = client_address(&headers).unwrap();
        assert_eq!(key.as_str(), "1.2.3.4, 10.0.0.1");
    }

    #[test]
    fn missing_or_empty_address_is_absent() {
        let mut headers = HeaderMap::new();
        assert_eq!(client_address(&headers), None);

        headers.insert(X_FORWARDED_FOR, HeaderValue::from_static(""));
        assert_eq!(client_address(&headers), None);
    }

    #[test]
    fn non_utf8_address_still_yields_a_key() {
        let mut headers = HeaderMap::new();
        headers.insert(X_FORWARDED_FOR, HeaderValue::from_bytes(b"1.2.3.4\xff").unwrap());

        let key = client_address(&headers).unwrap();
        assert_eq!(key.as_str(), "1.2.3.4\u{fffd}");
    }

    #[test]
    fn parses_browser_user_agent() {
        let ua = UserAgent::parse(
            "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36",
        )
        .unwrap();

        assert_eq!(
            ua.product,
            Some(Product {
                name: "Mozilla".into(),
                version: Some("5.0".into())
            })
        );
        assert_eq!(ua.platform.as_deref(), Some("X11"));
        assert!(!ua.is_bot);
    }

    #[test]
    fn flags_automated_clients() {
        assert!(UserAgent::parse("curl/8.4.0").unwrap().is_bot);
        assert!(UserAgent::parse("Googlebot/2.1 (+http://www.google.com/bot.html)").unwrap().is_bot);
    }

    #[test]
    fn odd_user_agents_never_fail() {
        let ua = UserAgent::parse("((( ").unwrap();
        assert_eq!(ua.product, None);
        assert_eq!(ua.platform, None);

        assert_eq!(UserAgent::parse("   "), None);
    }

    #[test]
    fn identity_without_headers_is_empty() {
        let identity = ClientIdentity::from_headers(&HeaderMap::new());
        assert_eq!(identity.address, None);
        assert_eq!(identity.user_agent, None);
    }
}
