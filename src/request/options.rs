use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;

/// Body sent with a request.
#[derive(Clone, Debug)]
pub enum RequestBody {
    Json(Value),
    Form(Vec<(String, String)>),
    Bytes(Bytes),
}

/// Per-request settings stored on a [`Task`](crate::Task) and merged with
/// per-execution overrides.
#[derive(Clone, Debug, Default)]
pub struct RequestOptions {
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
    /// A JSON object sent as the query string for GET, HEAD, OPTIONS and
    /// DELETE, and as a JSON body for every other method.
    pub params: Option<Value>,
    pub body: Option<RequestBody>,
    /// Bounds the whole exchange, body included unless streaming.
    pub timeout: Option<Duration>,
    /// Defer reading the body until the caller asks for it.
    pub stream: Option<bool>,
    /// Free-form label carried into diagnostics.
    pub tag: Option<String>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header. Names or values that are not valid HTTP are skipped.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            _ => tracing::warn!(header = name, "skipping invalid header"),
        }
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    pub fn form(mut self, fields: Vec<(String, String)>) -> Self {
        self.body = Some(RequestBody::Form(fields));
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(RequestBody::Bytes(body.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = Some(stream);
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn is_stream(&self) -> bool {
        self.stream.unwrap_or(false)
    }

    /// `overrides` layered over `self`.
    ///
    /// Override headers replace every value stored under the same name,
    /// a non-empty override query replaces the whole query, and any other
    /// field set on the override wins.
    pub fn merged(&self, overrides: &RequestOptions) -> RequestOptions {
        let mut headers = self.headers.clone();
        for name in overrides.headers.keys() {
            headers.remove(name);
        }
        for (name, value) in overrides.headers.iter() {
            headers.append(name.clone(), value.clone());
        }

        let query = if overrides.query.is_empty() {
            self.query.clone()
        } else {
            overrides.query.clone()
        };

        RequestOptions {
            headers,
            query,
            params: overrides.params.clone().or_else(|| self.params.clone()),
            body: overrides.body.clone().or_else(|| self.body.clone()),
            timeout: overrides.timeout.or(self.timeout),
            stream: overrides.stream.or(self.stream),
            tag: overrides.tag.clone().or_else(|| self.tag.clone()),
        }
    }
}
