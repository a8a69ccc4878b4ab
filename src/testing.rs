//! In-crate doubles for exercising the runners without a network.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use tokio::time::Instant;
use url::Url;

use crate::diagnostics::DiagnosticSink;
use crate::error::{TaskError, TransportError};
use crate::network::HttpClient;
use crate::request::{RequestOptions, Response, Task};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Behavior {
    Succeed,
    Fail,
    Panic,
}

#[derive(Clone, Copy, Debug)]
struct Route {
    delay: Duration,
    behavior: Behavior,
}

#[derive(Clone, Debug)]
pub(crate) struct Span {
    pub url: String,
    pub start: Instant,
    pub end: Instant,
}

struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Answers every URL with its own text after a per-route delay.
#[derive(Default)]
pub(crate) struct MockClient {
    routes: HashMap<String, Route>,
    active: AtomicUsize,
    peak: AtomicUsize,
    started: AtomicUsize,
    spans: Mutex<Vec<Span>>,
    last_options: Mutex<Option<RequestOptions>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, url: &str, delay_ms: u64, behavior: Behavior) -> Self {
        self.routes
            .insert(url.to_string(), Route { delay: Duration::from_millis(delay_ms), behavior });
        self
    }

    pub fn delay(self, url: &str, delay_ms: u64) -> Self {
        self.route(url, delay_ms, Behavior::Succeed)
    }

    pub fn fail(self, url: &str) -> Self {
        self.route(url, 0, Behavior::Fail)
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn spans(&self) -> Vec<Span> {
        self.spans.lock().unwrap().clone()
    }

    pub fn span(&self, url: &str) -> Span {
        self.spans().into_iter().find(|s| s.url == url).unwrap()
    }

    pub fn last_options(&self) -> Option<RequestOptions> {
        self.last_options.lock().unwrap().clone()
    }
}

impl HttpClient for MockClient {
    fn send<'a>(
        &'a self,
        _method: &'a Method,
        url: &'a str,
        options: &'a RequestOptions,
    ) -> BoxFuture<'a, Result<Response, TransportError>> {
        Box::pin(async move {
            let route = self
                .routes
                .get(url)
                .copied()
                .unwrap_or(Route { delay: Duration::ZERO, behavior: Behavior::Succeed });
            *self.last_options.lock().unwrap() = Some(options.clone());

            self.started.fetch_add(1, Ordering::SeqCst);
            let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now_active, Ordering::SeqCst);
            let _guard = ActiveGuard(&self.active);

            let start = Instant::now();
            tokio::time::sleep(route.delay).await;
            self.spans.lock().unwrap().push(Span { url: url.to_string(), start, end: Instant::now() });

            match route.behavior {
                Behavior::Succeed => match Url::parse(url) {
                    Ok(parsed) => Ok(Response::new(StatusCode::OK, parsed, HeaderMap::new(), url.to_string())),
                    Err(e) => Err(TransportError::other(url, e.to_string())),
                },
                Behavior::Fail => Err(TransportError::other(url, "connection refused")),
                Behavior::Panic => panic!("mock client blew up on {url}"),
            }
        })
    }
}

/// Collects every report instead of logging it.
#[derive(Default)]
pub(crate) struct RecordingSink {
    reports: Mutex<Vec<(String, &'static str)>>,
}

impl RecordingSink {
    pub fn reports(&self) -> Vec<(String, &'static str)> {
        self.reports.lock().unwrap().clone()
    }
}

impl DiagnosticSink for RecordingSink {
    fn report(&self, task: &Task, error: &TaskError) {
        self.reports.lock().unwrap().push((task.url().to_string(), error.kind()));
    }
}

pub(crate) fn task(client: &Arc<MockClient>, url: &str) -> Task {
    Task::with_shared_client(Method::GET, url, RequestOptions::new(), client.clone())
}
