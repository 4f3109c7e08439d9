//! # Request Context
//!
//! [`RequestContext`] is the mutable per-request state threaded through the
//! router, every middleware and the terminal handler. It stores; it does not
//! decide anything.
//!
//! One context is created per inbound request at the transport boundary
//! ([`RequestContext::from_request`] or [`RequestContext::new`]), handed to
//! [`Dispatcher::dispatch`](crate::dispatcher::Dispatcher::dispatch) by
//! `&mut`, and read back by the transport ([`RequestContext::into_response`]).
//! Contexts are never shared between requests, so nothing here is synchronized.
//!
//! ## Parameter storage
//!
//! Path and query parameters live in a [`ParamVec`], a `SmallVec` that stays on
//! the stack for up to [`MAX_INLINE_PARAMS`] entries. Names are `Arc<str>`
//! handed out by the route trie, so binding a parameter clones a pointer rather
//! than the name.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, Method, StatusCode};
use smallvec::SmallVec;

use crate::ids::RequestId;

/// Maximum number of path/query parameters before heap allocation.
/// Most REST APIs have ≤4 path params (e.g., /users/:id/posts/:postId).
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated parameter storage for the hot path.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

type Attribute = Box<dyn Any + Send + Sync>;

/// Mutable state for a single request/response cycle.
pub struct RequestContext {
    request_id: RequestId,
    method: Method,
    path: String,
    headers: HeaderMap,
    request_body: Vec<u8>,
    params: ParamVec,
    query: ParamVec,
    attributes: HashMap<String, Attribute>,
    status: u16,
    response_headers: HeaderMap,
    body: Vec<u8>,
    ready: bool,
}

impl RequestContext {
    /// Create a context for `method` and `path` with no headers.
    ///
    /// Anything after a `?` in `path` is parsed as the query string.
    #[must_use]
    pub fn new(method: Method, path: &str) -> Self {
        Self::with_headers(method, path, HeaderMap::new())
    }

    /// Create a context carrying the inbound request headers.
    #[must_use]
    pub fn with_headers(method: Method, path: &str, headers: HeaderMap) -> Self {
        let (path, query) = match path.split_once('?') {
            Some((path, query)) => (path, parse_query(query)),
            None => (path, ParamVec::new()),
        };
        let request_id = RequestId::from_headers(&headers);
        Self {
            request_id,
            method,
            path: path.to_string(),
            headers,
            request_body: Vec::new(),
            params: ParamVec::new(),
            query,
            attributes: HashMap::new(),
            status: 200,
            response_headers: HeaderMap::new(),
            body: Vec::new(),
            ready: false,
        }
    }

    /// Build a context from a decoded transport request.
    ///
    /// The path comes from the URI without its query string, which is parsed
    /// separately. The body is kept as raw bytes.
    #[must_use]
    pub fn from_request<B: Into<Vec<u8>>>(req: http::Request<B>) -> Self {
        let (parts, body) = req.into_parts();
        let mut ctx = Self::with_headers(parts.method, parts.uri.path(), parts.headers);
        if let Some(query) = parts.uri.query() {
            ctx.query = parse_query(query);
        }
        ctx.request_body = body.into();
        ctx
    }

    /// Convert the final response state into a transport response.
    ///
    /// A status outside `100..=999` cannot be represented and becomes a 500.
    #[must_use]
    pub fn into_response(self) -> http::Response<Vec<u8>> {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = http::Response::new(self.body);
        *response.status_mut() = status;
        *response.headers_mut() = self.response_headers;
        response
    }

    #[inline]
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    #[inline]
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[inline]
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Rewrite the request path, e.g. for internal forwarding.
    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = path.into();
    }

    #[inline]
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get a request header by name (case-insensitive).
    ///
    /// Returns `None` for headers whose value is not visible ASCII.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Raw request body bytes; empty unless built by [`from_request`](Self::from_request).
    #[must_use]
    pub fn request_body(&self) -> &[u8] {
        &self.request_body
    }

    /// Get a path parameter bound during route resolution.
    #[inline]
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    #[inline]
    #[must_use]
    pub fn params(&self) -> &ParamVec {
        &self.params
    }

    /// Bind a path parameter, replacing any previous value under the same name.
    pub fn set_param(&mut self, name: Arc<str>, value: impl Into<String>) {
        self.replace_param(name, value.into());
    }

    /// Bind a path parameter and hand back the value it displaced.
    pub(crate) fn replace_param(&mut self, name: Arc<str>, value: String) -> Option<String> {
        match self.params.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => Some(std::mem::replace(&mut slot.1, value)),
            None => {
                self.params.push((name, value));
                None
            }
        }
    }

    /// Remove a path parameter, returning its value.
    pub fn remove_param(&mut self, name: &str) -> Option<String> {
        let idx = self.params.iter().position(|(k, _)| k.as_ref() == name)?;
        Some(self.params.remove(idx).1)
    }

    pub(crate) fn clear_params(&mut self) {
        self.params.clear();
    }

    /// Get a query parameter; the last occurrence wins for repeated keys.
    #[inline]
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    #[inline]
    #[must_use]
    pub fn query(&self) -> &ParamVec {
        &self.query
    }

    /// Store an arbitrary value for later middleware or the handler.
    pub fn set_attribute<T>(&mut self, key: impl Into<String>, value: T)
    where
        T: Any + Send + Sync,
    {
        self.attributes.insert(key.into(), Box::new(value));
    }

    /// Fetch an attribute; `None` if it is missing or of another type.
    #[must_use]
    pub fn attribute<T: Any>(&self, key: &str) -> Option<&T> {
        self.attributes.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    pub fn attribute_mut<T: Any>(&mut self, key: &str) -> Option<&mut T> {
        self.attributes
            .get_mut(key)
            .and_then(|v| v.downcast_mut::<T>())
    }

    /// Remove an attribute and hand it back if it has type `T`.
    pub fn remove_attribute<T: Any>(&mut self, key: &str) -> Option<T> {
        let boxed = self.attributes.remove(key)?;
        boxed.downcast::<T>().ok().map(|b| *b)
    }

    #[inline]
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Set the response status. Can be called any number of times; the last
    /// write wins.
    pub fn set_status(&mut self, status: u16) -> &mut Self {
        self.status = status;
        self
    }

    #[inline]
    #[must_use]
    pub fn response_headers(&self) -> &HeaderMap {
        &self.response_headers
    }

    /// Add or replace a response header.
    ///
    /// Invalid header names or values are dropped with a warning rather than
    /// failing the request.
    pub fn set_header(&mut self, name: &str, value: &str) -> &mut Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.response_headers.insert(name, value);
            }
            _ => {
                tracing::warn!(
                    request_id = %self.request_id,
                    header = %name,
                    "Dropping invalid response header"
                );
            }
        }
        self
    }

    #[inline]
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Append bytes to the response body.
    pub fn write_body(&mut self, bytes: &[u8]) -> &mut Self {
        self.body.extend_from_slice(bytes);
        self
    }

    /// Replace the response body.
    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) -> &mut Self {
        self.body = body.into();
        self
    }

    /// Replace the body with plain text and set `content-type`.
    pub fn text(&mut self, body: impl Into<String>) -> &mut Self {
        self.response_headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        self.set_body(body.into())
    }

    /// Replace the body with rendered HTML and set `content-type`.
    pub fn html(&mut self, body: impl Into<String>) -> &mut Self {
        self.response_headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        );
        self.set_body(body.into())
    }

    /// Serialize `value` as the JSON response body.
    pub fn json<T: serde::Serialize>(&mut self, value: &T) -> anyhow::Result<&mut Self> {
        let bytes = serde_json::to_vec(value)?;
        self.response_headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(self.set_body(bytes))
    }

    /// Whether the matched handler completed and the response may be sent.
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub(crate) fn mark_ready(&mut self) {
        self.ready = true;
    }

    /// Discard any partial response and replace it with `status` and `body`.
    pub(crate) fn reset_response(&mut self, status: u16, body: &str) {
        self.status = status;
        self.response_headers.clear();
        self.body.clear();
        self.ready = false;
        if !body.is_empty() {
            self.text(body.to_string());
        }
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("request_id", &self.request_id)
            .field("method", &self.method)
            .field("path", &self.path)
            .field("params", &self.params)
            .field("query", &self.query)
            .field("attributes", &self.attributes.keys().collect::<Vec<_>>())
            .field("status", &self.status)
            .field("body_len", &self.body.len())
            .field("ready", &self.ready)
            .finish_non_exhaustive()
    }
}

fn parse_query(query: &str) -> ParamVec {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (Arc::from(k.as_ref()), v.into_owned()))
        .collect()
}
