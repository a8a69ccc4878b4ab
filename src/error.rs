use std::any::Any;
use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Configuration and runner failures. These are raised to the caller,
/// unlike per-task failures which never abort a batch.
#[derive(Debug, Error)]
pub enum Error {
    #[error("pool size must be between 1 and {max}, got {size}")]
    InvalidPoolSize { size: usize, max: usize },

    #[error("no tokio runtime is running on this thread")]
    NoRuntime,

    #[error("pool was closed while a unit was waiting for a slot")]
    PoolClosed,

    #[error("invalid HTTP version '{0}'. Valid values: AUTO, HTTP1_ONLY, HTTP2, HTTP2_PRIOR_KNOWLEDGE")]
    InvalidHttpVersion(String),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("invalid proxy URL: {0}")]
    ProxyUrl(#[from] url::ParseError),
}

/// Failure reported by an [`HttpClient`](crate::HttpClient) while performing one request.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {} timed out after {:.2} seconds", .url, .timeout.as_secs_f64())]
    Timeout { url: String, timeout: Duration },

    #[error("{url} returned HTTP status {status}")]
    Status { url: String, status: StatusCode },

    #[error("failed to read response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("response body from {url} was already consumed")]
    BodyConsumed { url: String },

    /// A read of the deferred body failed earlier; `message` is that error.
    #[error("response body from {url} is unavailable: {message}")]
    BodyUnavailable { url: String, message: String },

    #[error("failed to decode response body from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("request to {url} failed: {message}")]
    Other { url: String, message: String },
}

impl TransportError {
    pub fn other(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Other { url: url.into(), message: message.into() }
    }

    /// Short, stable name of the failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Http { .. } | Self::Other { .. } => "HttpError",
            Self::Timeout { .. } => "Timeout",
            Self::Status { .. } => "HttpStatusError",
            Self::Body { .. } | Self::BodyConsumed { .. } | Self::BodyUnavailable { .. } => "BodyError",
            Self::Decode { .. } => "DecodeError",
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Http { url, .. }
            | Self::Timeout { url, .. }
            | Self::Status { url, .. }
            | Self::Body { url, .. }
            | Self::BodyConsumed { url }
            | Self::BodyUnavailable { url, .. }
            | Self::Decode { url, .. }
            | Self::Other { url, .. } => url,
        }
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Http { source, .. } => source.is_timeout(),
            _ => false,
        }
    }
}

/// A unit failed for a reason unrelated to the network call: it panicked.
#[derive(Debug, Error)]
#[error("unit panicked: {message}")]
pub struct ExecutionError {
    message: String,
}

impl ExecutionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }

    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self { message }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// What an exception handler or diagnostic sink receives for a failed task.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

impl TaskError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(e) => e.kind(),
            Self::Execution(_) => "ExecutionError",
        }
    }

    pub fn as_transport(&self) -> Option<&TransportError> {
        match self {
            Self::Transport(e) => Some(e),
            Self::Execution(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payloads_become_messages() {
        let err = ExecutionError::from_panic(Box::new("boom"));
        assert_eq!(err.message(), "boom");

        let err = ExecutionError::from_panic(Box::new(String::from("owned boom")));
        assert_eq!(err.message(), "owned boom");

        let err = ExecutionError::from_panic(Box::new(42_u8));
        assert_eq!(err.message(), "non-string panic payload");
    }

    #[test]
    fn task_error_kinds() {
        let timeout = TransportError::Timeout {
            url: "http://example.test/".into(),
            timeout: Duration::from_millis(1500),
        };
        assert!(timeout.is_timeout());
        assert_eq!(timeout.to_string(), "request to http://example.test/ timed out after 1.50 seconds");

        let err = TaskError::from(timeout);
        assert_eq!(err.kind(), "Timeout");
        assert_eq!(err.as_transport().map(TransportError::url), Some("http://example.test/"));

        let err = TaskError::from(ExecutionError::new("bad"));
        assert_eq!(err.kind(), "ExecutionError");
        assert!(err.as_transport().is_none());
    }
}
