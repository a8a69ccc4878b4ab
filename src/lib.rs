//! Concurrent HTTP requests with bounded parallelism.
//!
//! Build [`Task`]s with the verb helpers ([`get`], [`post`], ...), then hand
//! a batch to [`map`] for responses in input order or to [`imap`] for a
//! stream of responses in completion order. A failing request never aborts
//! its siblings: it is routed to the exception handler if one was given,
//! otherwise to the runner's [`DiagnosticSink`], and simply produces no
//! response.
//!
//! ```no_run
//! use rusty_req_pool::{get, map, MapOptions};
//!
//! # async fn run() -> rusty_req_pool::Result<()> {
//! let tasks = vec![get("https://example.com/a"), get("https://example.com/b")];
//! let responses = map(tasks, MapOptions::new().size(4)).await?;
//! for res in responses.into_iter().flatten() {
//!     println!("{} {}", res.url(), res.status());
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use reqwest::Method;

pub mod concurrency;
pub mod diagnostics;
pub mod error;
pub mod network;
pub mod request;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use concurrency::{
    Dispatcher, ExceptionHandler, ImapOptions, MapOptions, Outcome, Pool, PoolSlot, ResponseStream, Runner,
    UnitHandle,
};
pub use diagnostics::{DebugTarget, DiagnosticSink, TracingSink, WriterSink};
pub use error::{Error, ExecutionError, Result, TaskError, TransportError};
pub use network::{
    default_client, ClientConfig, ClientFactory, DefaultClientFactory, HttpClient, HttpVersion, ProxyConfig,
    SharedClient,
};
pub use request::{RequestBody, RequestOptions, Response, ResponseHook, Task};

/// Builds tasks whose client comes from a [`ClientFactory`].
///
/// `Requests::default()` hands every task the shared [`default_client`].
#[derive(Clone)]
pub struct Requests {
    factory: Arc<dyn ClientFactory>,
}

impl Default for Requests {
    fn default() -> Self {
        Self::with_factory(DefaultClientFactory)
    }
}

impl Requests {
    pub fn with_factory(factory: impl ClientFactory + 'static) -> Self {
        Self { factory: Arc::new(factory) }
    }

    /// Every task shares `client`.
    pub fn with_client(client: SharedClient) -> Self {
        Self::with_factory(move || client.clone())
    }

    pub fn request(&self, method: Method, url: impl Into<String>, options: RequestOptions) -> Task {
        Task::with_shared_client(method, url, options, self.factory.client())
    }

    pub fn get(&self, url: impl Into<String>) -> Task {
        self.request(Method::GET, url, RequestOptions::default())
    }

    pub fn options(&self, url: impl Into<String>) -> Task {
        self.request(Method::OPTIONS, url, RequestOptions::default())
    }

    pub fn head(&self, url: impl Into<String>) -> Task {
        self.request(Method::HEAD, url, RequestOptions::default())
    }

    pub fn post(&self, url: impl Into<String>) -> Task {
        self.request(Method::POST, url, RequestOptions::default())
    }

    pub fn put(&self, url: impl Into<String>) -> Task {
        self.request(Method::PUT, url, RequestOptions::default())
    }

    pub fn patch(&self, url: impl Into<String>) -> Task {
        self.request(Method::PATCH, url, RequestOptions::default())
    }

    pub fn delete(&self, url: impl Into<String>) -> Task {
        self.request(Method::DELETE, url, RequestOptions::default())
    }
}

impl std::fmt::Debug for Requests {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Requests").finish_non_exhaustive()
    }
}

pub fn request(method: Method, url: impl Into<String>, options: RequestOptions) -> Task {
    Requests::default().request(method, url, options)
}

pub fn get(url: impl Into<String>) -> Task {
    Requests::default().get(url)
}

pub fn options(url: impl Into<String>) -> Task {
    Requests::default().options(url)
}

pub fn head(url: impl Into<String>) -> Task {
    Requests::default().head(url)
}

pub fn post(url: impl Into<String>) -> Task {
    Requests::default().post(url)
}

pub fn put(url: impl Into<String>) -> Task {
    Requests::default().put(url)
}

pub fn patch(url: impl Into<String>) -> Task {
    Requests::default().patch(url)
}

pub fn delete(url: impl Into<String>) -> Task {
    Requests::default().delete(url)
}

/// [`Runner::map`] on the current runtime with the default sink.
pub async fn map<I>(tasks: I, options: MapOptions) -> Result<Vec<Option<Arc<Response>>>>
where
    I: IntoIterator,
    I::Item: Into<Arc<Task>>,
{
    Runner::current()?.map(tasks, options).await
}

/// [`Runner::imap`] on the current runtime with the default sink.
///
/// Must be called from within a tokio runtime.
pub fn imap<I>(tasks: I, options: ImapOptions) -> Result<ResponseStream>
where
    I: IntoIterator,
    I::IntoIter: Send + 'static,
    I::Item: Into<Arc<Task>>,
{
    Runner::current()?.imap(tasks, options)
}
