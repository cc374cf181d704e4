//! Request data seen by every phase of a physical request.
//!
//! This module contains the read side of a request:
//! - `Request`: method, uri, headers and body of the request plus the matched path parameters
//! - `PathParams`: named segments extracted from the request path by the transport
//! - `Queries`: the raw query string decoded into a key/value map

use bytes::Bytes;
use http::request::Parts;
use http::{HeaderMap, Method, Uri, Version};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use tracing::debug;

/// The request of one physical exchange, owned by the transport.
#[derive(Debug)]
pub struct Request {
    head: Parts,
    body: Bytes,
    params: PathParams,
    queries: Queries,
}

impl Request {
    /// Creates a request from its head, its fully read body and the matched path parameters
    pub fn new(head: Parts, body: Bytes, params: PathParams) -> Self {
        let queries = Queries::parse(head.uri.query());
        Self { head, body, params, queries }
    }

    /// Returns the HTTP method of the request
    pub fn method(&self) -> &Method {
        &self.head.method
    }

    /// Returns the URI of the request
    pub fn uri(&self) -> &Uri {
        &self.head.uri
    }

    /// Returns the path component of the URI
    pub fn path(&self) -> &str {
        self.head.uri.path()
    }

    /// Returns the HTTP version of the request
    pub fn version(&self) -> Version {
        self.head.version
    }

    /// Returns the HTTP headers of the request
    pub fn headers(&self) -> &HeaderMap {
        &self.head.headers
    }

    /// Returns the raw request body
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the path parameters extracted from the request URL
    pub fn params(&self) -> &PathParams {
        &self.params
    }

    /// Returns the decoded query string
    pub fn queries(&self) -> &Queries {
        &self.queries
    }

    /// Deserializes the query string into `T`
    pub fn query<T: DeserializeOwned>(&self) -> Result<T, serde_qs::Error> {
        serde_qs::from_str(self.head.uri.query().unwrap_or_default())
    }

    /// Deserializes the body as json into `T`
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Represents path parameters extracted from the URL path of an HTTP request.
///
/// For a route declared as `/users/:id`, a request to `/users/42` carries one
/// parameter named `id` with the value `42`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    inner: Vec<(String, String)>,
}

impl PathParams {
    /// Creates an empty PathParams instance with no parameters
    #[inline]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns true if there are no path parameters
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the number of path parameters
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Gets the value of a path parameter by its name
    /// Returns None if the parameter doesn't exist
    pub fn get(&self, key: impl AsRef<str>) -> Option<&str> {
        let key = key.as_ref();
        self.inner.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PathParams {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self { inner: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
    }
}

impl<'k, 'v> From<matchit::Params<'k, 'v>> for PathParams {
    fn from(params: matchit::Params<'k, 'v>) -> Self {
        params.iter().collect()
    }
}

/// The query string of a request decoded as `application/x-www-form-urlencoded`.
///
/// When a key repeats, the last value wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Queries {
    inner: HashMap<String, String>,
}

impl Queries {
    fn parse(query: Option<&str>) -> Self {
        let Some(query) = query else {
            return Self::default();
        };

        match serde_urlencoded::from_str::<Vec<(String, String)>>(query) {
            Ok(pairs) => Self { inner: pairs.into_iter().collect() },
            Err(e) => {
                debug!(query, cause = %e, "ignore malformed query string");
                Self::default()
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.inner.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{PathParams, Request};
    use bytes::Bytes;
    use serde::Deserialize;

    fn request(uri: &str, body: &'static str) -> Request {
        let (head, ()) = http::Request::builder().uri(uri).body(()).unwrap().into_parts();
        Request::new(head, Bytes::from_static(body.as_bytes()), PathParams::from_iter([("id", "7")]))
    }

    #[test]
    fn test_queries_are_decoded() {
        let req = request("/users?name=hello%20world&page=2", "");
        assert_eq!(req.queries().len(), 2);
        assert_eq!(req.queries().get("name"), Some("hello world"));
        assert_eq!(req.queries().get("page"), Some("2"));
        assert_eq!(req.queries().get("zip"), None);
    }

    #[test]
    fn test_no_query_string() {
        let req = request("/users", "");
        assert!(req.queries().is_empty());
    }

    #[test]
    fn test_typed_query_and_json() {
        #[derive(Deserialize)]
        struct Page {
            page: u32,
        }

        #[derive(Deserialize)]
        struct User {
            name: String,
        }

        let req = request("/users?page=3", r#"{"name":"zava"}"#);
        assert_eq!(req.query::<Page>().unwrap().page, 3);
        assert_eq!(req.json::<User>().unwrap().name, "zava");
        assert_eq!(req.params().get("id"), Some("7"));
        assert_eq!(req.path(), "/users");
    }
}
