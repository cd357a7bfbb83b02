//! Token candidate extraction.
//!
//! Lookup order, first non-empty match wins, disabled sources skipped:
//!
//! 1. header named `header_name`
//! 2. query parameter of the same name
//! 3. cookie of the same name
//!
//! A value that is present but empty counts as absent.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

use crate::config::Settings;

/// Read access to a request: its credential-carrying parts and its route.
///
/// Extraction only reads headers, query parameters and cookies. Extra
/// validation hooks may also look at the method and path, which sources
/// without an HTTP request report as `None`.
pub trait CredentialSource {
    /// Value of the header `name` (case-insensitive), if present.
    fn header(&self, name: &str) -> Option<Cow<'_, str>>;

    /// Value of the query parameter `name`, if present.
    fn query(&self, name: &str) -> Option<Cow<'_, str>>;

    /// Value of the cookie `name`, if present.
    fn cookie(&self, name: &str) -> Option<Cow<'_, str>>;

    /// Request method, e.g. `GET`.
    fn method(&self) -> Option<&str> {
        None
    }

    /// Request path, without the query string.
    fn path(&self) -> Option<&str> {
        None
    }
}

/// Where a candidate was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Request header.
    Header,
    /// Query string.
    Query,
    /// Cookie.
    Cookie,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Origin::Header => "header",
            Origin::Query => "query",
            Origin::Cookie => "cookie",
        })
    }
}

/// A raw credential, prefix still attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate<'a> {
    /// Raw value.
    pub value: Cow<'a, str>,
    /// Source it came from.
    pub origin: Origin,
}

/// Find the token candidate in `source` according to `settings`.
pub fn extract<'a>(source: &'a dyn CredentialSource, settings: &Settings) -> Option<Candidate<'a>> {
    let name = settings.header_name();
    let sources = settings.sources();

    let lookups: [(bool, Origin); 3] = [
        (sources.headers, Origin::Header),
        (sources.query, Origin::Query),
        (sources.cookies, Origin::Cookie),
    ];

    lookups
        .into_iter()
        .filter(|(enabled, _)| *enabled)
        .find_map(|(_, origin)| {
            let value = match origin {
                Origin::Header => source.header(name),
                Origin::Query => source.query(name),
                Origin::Cookie => source.cookie(name),
            }?;
            (!value.is_empty()).then_some(Candidate { value, origin })
        })
}

/// In-memory [`CredentialSource`], for hosts without an HTTP request type and for tests.
#[derive(Debug, Clone, Default)]
pub struct MapSource {
    headers: HashMap<String, String>,
    query: HashMap<String, String>,
    cookies: HashMap<String, String>,
    method: Option<String>,
    path: Option<String>,
}

impl MapSource {
    /// Empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header. Names are stored lowercased.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Add a query parameter.
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    /// Add a cookie.
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    /// Set the request method.
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Set the request path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

impl CredentialSource for MapSource {
    fn header(&self, name: &str) -> Option<Cow<'_, str>> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(|v| Cow::Borrowed(v.as_str()))
    }

    fn query(&self, name: &str) -> Option<Cow<'_, str>> {
        self.query.get(name).map(|v| Cow::Borrowed(v.as_str()))
    }

    fn cookie(&self, name: &str) -> Option<Cow<'_, str>> {
        self.cookies.get(name).map(|v| Cow::Borrowed(v.as_str()))
    }

    fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        Settings::builder().build().unwrap()
    }

    fn all_sources() -> MapSource {
        MapSource::new()
            .with_header("authorization", "from-header")
            .with_query("authorization", "from-query")
            .with_cookie("authorization", "from-cookie")
    }

    #[test]
    fn header_wins_over_query_and_cookie() {
        let source = all_sources();
        let candidate = extract(&source, &settings()).unwrap();
        assert_eq!(candidate.origin, Origin::Header);
        assert_eq!(candidate.value, "from-header");
    }

    #[test]
    fn query_wins_over_cookie() {
        let source = MapSource::new()
            .with_query("authorization", "from-query")
            .with_cookie("authorization", "from-cookie");
        let candidate = extract(&source, &settings()).unwrap();
        assert_eq!(candidate.origin, Origin::Query);
    }

    #[test]
    fn disabled_sources_skipped() {
        let source = all_sources();

        let no_headers = Settings::builder().disable_headers(true).build().unwrap();
        assert_eq!(extract(&source, &no_headers).unwrap().origin, Origin::Query);

        let cookies_only = Settings::builder()
            .disable_headers(true)
            .disable_query(true)
            .build()
            .unwrap();
        assert_eq!(extract(&source, &cookies_only).unwrap().origin, Origin::Cookie);

        let header_only = Settings::builder()
            .disable_query(true)
            .disable_cookies(true)
            .build()
            .unwrap();
        let source = MapSource::new()
            .with_query("authorization", "from-query")
            .with_cookie("authorization", "from-cookie");
        assert_eq!(extract(&source, &header_only), None);
    }

    #[test]
    fn empty_values_fall_through() {
        let source = MapSource::new()
            .with_header("authorization", "")
            .with_query("authorization", "")
            .with_cookie("authorization", "from-cookie");
        let candidate = extract(&source, &settings()).unwrap();
        assert_eq!(candidate.origin, Origin::Cookie);
        assert_eq!(candidate.value, "from-cookie");
    }

    #[test]
    fn nothing_presented() {
        assert_eq!(extract(&MapSource::new(), &settings()), None);
        let source = MapSource::new().with_header("authorization", "");
        assert_eq!(extract(&source, &settings()), None);
    }

    #[test]
    fn route_is_optional() {
        let source = MapSource::new();
        assert_eq!(source.method(), None);
        assert_eq!(source.path(), None);

        let source = source.with_method("DELETE").with_path("/admin/users");
        assert_eq!(source.method(), Some("DELETE"));
        assert_eq!(source.path(), Some("/admin/users"));
    }

    #[test]
    fn custom_header_name() {
        let settings = Settings::builder().header_name("x-auth").build().unwrap();
        let source = MapSource::new()
            .with_header("authorization", "wrong")
            .with_header("X-Auth", "right");
        assert_eq!(extract(&source, &settings).unwrap().value, "right");
    }
}
