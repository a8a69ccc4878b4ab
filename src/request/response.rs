use std::time::{Duration, SystemTime};

use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{StatusCode, Version};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use url::Url;

use crate::error::TransportError;

#[derive(Debug)]
enum Body {
    Buffered(Bytes),
    Deferred(Mutex<DeferredBody>),
}

#[derive(Debug)]
enum DeferredBody {
    Pending(reqwest::Response),
    /// Taken by a read that was dropped before it finished.
    Taken,
    Ready(Bytes),
    Failed(String),
}

/// The outcome of one successful request.
///
/// With streaming enabled the body stays on the connection until the
/// first call to [`bytes`](Response::bytes) or one of its siblings; the
/// bytes are then cached so the response can be read from every holder.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    version: Version,
    url: Url,
    headers: HeaderMap,
    started_at: SystemTime,
    elapsed: Duration,
    body: Body,
}

impl Response {
    /// A fully buffered response, for [`HttpClient`](crate::HttpClient)
    /// implementations that do not go through reqwest.
    pub fn new(status: StatusCode, url: Url, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            version: Version::HTTP_11,
            url,
            headers,
            started_at: SystemTime::now(),
            elapsed: Duration::ZERO,
            body: Body::Buffered(body.into()),
        }
    }

    pub fn with_timing(mut self, started_at: SystemTime, elapsed: Duration) -> Self {
        self.started_at = started_at;
        self.elapsed = elapsed;
        self
    }

    pub(crate) async fn buffered(res: reqwest::Response) -> Result<Self, TransportError> {
        let mut response = Self::head(&res);
        let body = res
            .bytes()
            .await
            .map_err(|source| TransportError::Body { url: response.url.to_string(), source })?;
        response.body = Body::Buffered(body);
        Ok(response)
    }

    fn head(res: &reqwest::Response) -> Self {
        Self {
            status: res.status(),
            version: res.version(),
            url: res.url().clone(),
            headers: res.headers().clone(),
            started_at: SystemTime::now(),
            elapsed: Duration::ZERO,
            body: Body::Buffered(Bytes::new()),
        }
    }

    pub(crate) fn deferred(res: reqwest::Response) -> Self {
        let mut response = Self::head(&res);
        response.body = Body::Deferred(Mutex::new(DeferredBody::Pending(res)));
        response
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn started_at(&self) -> SystemTime {
        self.started_at
    }

    /// Time spent on the exchange; excludes a deferred body.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn finished_at(&self) -> SystemTime {
        self.started_at + self.elapsed
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self.body, Body::Deferred(_))
    }

    pub fn error_for_status(&self) -> Result<(), TransportError> {
        if self.status.is_client_error() || self.status.is_server_error() {
            return Err(TransportError::Status { url: self.url.to_string(), status: self.status });
        }
        Ok(())
    }

    pub async fn bytes(&self) -> Result<Bytes, TransportError> {
        let cell = match &self.body {
            Body::Buffered(bytes) => return Ok(bytes.clone()),
            Body::Deferred(cell) => cell,
        };

        let mut state = cell.lock().await;
        match std::mem::replace(&mut *state, DeferredBody::Taken) {
            DeferredBody::Pending(res) => match res.bytes().await {
                Ok(bytes) => {
                    *state = DeferredBody::Ready(bytes.clone());
                    Ok(bytes)
                }
                Err(source) => {
                    *state = DeferredBody::Failed(source.to_string());
                    Err(TransportError::Body { url: self.url.to_string(), source })
                }
            },
            DeferredBody::Ready(bytes) => {
                *state = DeferredBody::Ready(bytes.clone());
                Ok(bytes)
            }
            DeferredBody::Failed(message) => {
                *state = DeferredBody::Failed(message.clone());
                Err(TransportError::BodyUnavailable { url: self.url.to_string(), message })
            }
            DeferredBody::Taken => Err(TransportError::BodyConsumed { url: self.url.to_string() }),
        }
    }

    /// Body as text; invalid UTF-8 is replaced.
    pub async fn text(&self) -> Result<String, TransportError> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub async fn json<T: DeserializeOwned>(&self) -> Result<T, TransportError> {
        let bytes = self.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|source| TransportError::Decode { url: self.url.to_string(), source })
    }
}
