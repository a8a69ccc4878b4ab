use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use once_cell::sync::Lazy;
use reqwest::{Client, Method};

use crate::error::{Result, TransportError};
use crate::network::{HttpVersion, ProxyConfig};
use crate::request::executor::execute_request;
use crate::request::{RequestOptions, Response};

/// The HTTP capability a [`Task`](crate::Task) executes against.
///
/// Implementations must tolerate concurrent use: one handle is normally
/// shared by every unit of a batch.
pub trait HttpClient: Send + Sync {
    fn send<'a>(
        &'a self,
        method: &'a Method,
        url: &'a str,
        options: &'a RequestOptions,
    ) -> BoxFuture<'a, std::result::Result<Response, TransportError>>;
}

pub type SharedClient = Arc<dyn HttpClient>;

impl HttpClient for Client {
    fn send<'a>(
        &'a self,
        method: &'a Method,
        url: &'a str,
        options: &'a RequestOptions,
    ) -> BoxFuture<'a, std::result::Result<Response, TransportError>> {
        Box::pin(execute_request(self, method, url, options))
    }
}

/// Settings for building a reqwest-backed client.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub timeout: Option<Duration>,
    pub user_agent: Option<String>,
    pub gzip: bool,
    pub brotli: bool,
    pub deflate: bool,
    pub http_version: HttpVersion,
    pub proxy: Option<ProxyConfig>,
    pub accept_invalid_certs: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(30)),
            user_agent: None,
            gzip: true,
            brotli: true,
            deflate: true,
            http_version: HttpVersion::Auto,
            proxy: None,
            accept_invalid_certs: false,
        }
    }
}

impl ClientConfig {
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn http_version(mut self, http_version: HttpVersion) -> Self {
        self.http_version = http_version;
        self
    }

    pub fn proxy(mut self, proxy: ProxyConfig) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    pub fn build(&self) -> Result<Client> {
        let mut builder = Client::builder()
            .gzip(self.gzip)
            .brotli(self.brotli)
            .deflate(self.deflate)
            .danger_accept_invalid_certs(self.accept_invalid_certs);

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(user_agent) = &self.user_agent {
            builder = builder.user_agent(user_agent.as_str());
        }
        builder = self.http_version.apply_to_builder(builder);
        if let Some(proxy) = &self.proxy {
            builder = proxy.apply_to_builder(builder)?;
        }

        Ok(builder.build()?)
    }

    pub fn build_shared(&self) -> Result<SharedClient> {
        Ok(Arc::new(self.build()?))
    }
}

/// Stands in for a client that could not be built; every send fails with
/// the build error.
#[derive(Debug)]
struct UnavailableClient {
    reason: String,
}

impl HttpClient for UnavailableClient {
    fn send<'a>(
        &'a self,
        _method: &'a Method,
        url: &'a str,
        _options: &'a RequestOptions,
    ) -> BoxFuture<'a, std::result::Result<Response, TransportError>> {
        let error = TransportError::other(url, format!("default client unavailable: {}", self.reason));
        Box::pin(futures::future::ready(Err(error)))
    }
}

static DEFAULT_CLIENT: Lazy<SharedClient> = Lazy::new(|| match ClientConfig::default().build_shared() {
    Ok(client) => client,
    Err(e) => {
        tracing::error!(error = %e, "could not build the default client");
        Arc::new(UnavailableClient { reason: e.to_string() })
    }
});

/// The process-wide client used when a task is not given one.
///
/// Built once, on first use, from [`ClientConfig::default`]: a 30 second
/// timeout with gzip, brotli and deflate decoding enabled. If that build
/// fails, every request sent through it fails with the build error.
pub fn default_client() -> SharedClient {
    DEFAULT_CLIENT.clone()
}

/// Supplies the client handle for each task a [`Requests`](crate::Requests) creates.
pub trait ClientFactory: Send + Sync {
    fn client(&self) -> SharedClient;
}

impl<F> ClientFactory for F
where
    F: Fn() -> SharedClient + Send + Sync,
{
    fn client(&self) -> SharedClient {
        self()
    }
}

/// Hands every task the shared [`default_client`].
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultClientFactory;

impl ClientFactory for DefaultClientFactory {
    fn client(&self) -> SharedClient {
        default_client()
    }
}
