//! Request-derived values shared by the handlers.

use axum::extract::FromRequestParts;
use axum::http::header::{ACCEPT, CONTENT_LENGTH, HOST, USER_AGENT};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderName};
use std::convert::Infallible;

static X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
static X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

fn header<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok()).filter(|v| !v.is_empty())
}

/// `<proto>://<host>/`, honoring `X-Forwarded-Proto` and `X-Forwarded-Host`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlPrefix(pub String);

impl UrlPrefix {
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let proto = header(headers, &X_FORWARDED_PROTO).unwrap_or("http");
        let host = header(headers, &X_FORWARDED_HOST).or_else(|| header(headers, &HOST)).unwrap_or("");
        Self(format!("{proto}://{host}/"))
    }

    #[must_use]
    pub fn link(&self, id: &str) -> String {
        format!("{}{id}", self.0)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for UrlPrefix {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

/// How the usage page is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Html,
    Text,
}

impl View {
    /// HTML only for browser user agents (`Mozilla/...`, matched on characters 1..7)
    /// that accept `text/html`.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let agent = header(headers, &USER_AGENT).unwrap_or("");
        let accept = header(headers, &ACCEPT).unwrap_or("");
        let browser = agent.get(1..7).is_some_and(|s| s == "ozilla");

        if browser && accept.contains("text/html") { Self::Html } else { Self::Text }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for View {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

/// Upload size announced by `Content-Length`; 0 when absent or unparsable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeclaredSize(pub u64);

impl DeclaredSize {
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self(header(headers, &CONTENT_LENGTH).and_then(|v| v.trim().parse().ok()).unwrap_or(0))
    }
}

impl<S: Send + Sync> FromRequestParts<S> for DeclaredSize {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn prefix_prefers_forwarded_headers() {
        let plain = UrlPrefix::from_headers(&headers(&[("host", "localhost:3000")]));
        assert_eq!(plain.0, "http://localhost:3000/");

        let proxied = UrlPrefix::from_headers(&headers(&[
            ("host", "10.0.0.5:3000"),
            ("x-forwarded-host", "paste.example.com"),
            ("x-forwarded-proto", "https"),
        ]));
        assert_eq!(proxied.link("abc"), "https://paste.example.com/abc");
    }

    #[test]
    fn browsers_get_html() {
        let firefox = headers(&[
            ("user-agent", "Mozilla/5.0 (X11; Linux x86_64)"),
            ("accept", "text/html,application/xhtml+xml"),
        ]);
        assert_eq!(View::from_headers(&firefox), View::Html);

        let curl = headers(&[("user-agent", "curl/8.5.0"), ("accept", "*/*")]);
        assert_eq!(View::from_headers(&curl), View::Text);

        let api = headers(&[("user-agent", "Mozilla/5.0"), ("accept", "application/json")]);
        assert_eq!(View::from_headers(&api), View::Text);
    }

    #[test]
    fn declared_size_defaults_to_zero() {
        assert_eq!(DeclaredSize::from_headers(&headers(&[("content-length", "42")])).0, 42);
        assert_eq!(DeclaredSize::from_headers(&headers(&[("content-length", "nope")])).0, 0);
        assert_eq!(DeclaredSize::from_headers(&HeaderMap::new()).0, 0);
    }
}
