use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use reqwest::Method;

use crate::diagnostics::log_response;
use crate::error::TransportError;
use crate::network::{default_client, SharedClient};
use crate::request::{RequestOptions, Response};

/// Observer invoked with every response a task produces.
pub type ResponseHook = Arc<dyn Fn(&Response) + Send + Sync>;

/// One request waiting to be sent, plus the slot its response lands in.
///
/// A task is built by the caller, handed to a runner (usually behind an
/// `Arc` so the caller keeps a view of it) and executed by exactly one
/// concurrency unit. The response slot is written once and never again.
pub struct Task {
    method: Method,
    url: String,
    options: RequestOptions,
    client: SharedClient,
    hook: Option<ResponseHook>,
    response: OnceCell<Arc<Response>>,
}

impl Task {
    /// A task using the shared [`default_client`].
    pub fn new(method: Method, url: impl Into<String>, options: RequestOptions) -> Self {
        Self::with_shared_client(method, url, options, default_client())
    }

    pub fn with_shared_client(
        method: Method,
        url: impl Into<String>,
        options: RequestOptions,
        client: SharedClient,
    ) -> Self {
        Self {
            method,
            url: url.into(),
            options,
            client,
            hook: None,
            response: OnceCell::new(),
        }
    }

    pub fn with_client(mut self, client: SharedClient) -> Self {
        self.client = client;
        self
    }

    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    /// Registers a hook called synchronously with each successful response.
    pub fn on_response<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Response) + Send + Sync + 'static,
    {
        self.hook = Some(Arc::new(hook));
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn options(&self) -> &RequestOptions {
        &self.options
    }

    pub fn tag(&self) -> Option<&str> {
        self.options.tag.as_deref()
    }

    pub fn client(&self) -> &SharedClient {
        &self.client
    }

    /// The stored response, once the task has completed successfully.
    pub fn response(&self) -> Option<&Arc<Response>> {
        self.response.get()
    }

    /// Sends the request with `overrides` layered over the stored options.
    ///
    /// The response hook runs before the result slot is filled. The first
    /// successful response fills the slot; a later execution still returns
    /// its own response but leaves the slot as is.
    pub async fn execute(&self, overrides: Option<&RequestOptions>) -> Result<Arc<Response>, TransportError> {
        let options = match overrides {
            Some(overrides) => self.options.merged(overrides),
            None => self.options.clone(),
        };

        let response = Arc::new(self.client.send(&self.method, &self.url, &options).await?);
        log_response(self, &response);

        // a panicking hook must leave the slot empty
        if let Some(hook) = &self.hook {
            hook(&response);
        }
        if self.response.set(response.clone()).is_err() {
            tracing::debug!(method = %self.method, url = %self.url, "result slot already filled; keeping the first response");
        }
        Ok(response)
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("options", &self.options)
            .field("has_hook", &self.hook.is_some())
            .field("response", &self.response.get().map(|r| r.status()))
            .finish()
    }
}
