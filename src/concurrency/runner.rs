use std::sync::Arc;

use futures::stream::{self, Stream};
use futures::StreamExt;
use tokio::runtime::Handle;

use crate::diagnostics::DiagnosticSink;
use crate::error::{Error, Result};
use crate::request::{Response, Task};

use super::bulk::run_all;
use super::dispatcher::{Dispatcher, Outcome};
use super::options::{ImapOptions, MapOptions};
use super::streaming::{run_streaming, ResponseStream};
use super::Pool;

/// Entry point for batch execution on an explicit runtime.
#[derive(Clone, Debug)]
pub struct Runner {
    dispatcher: Dispatcher,
}

impl Runner {
    pub fn new(runtime: Handle) -> Self {
        Self { dispatcher: Dispatcher::new(runtime) }
    }

    /// A runner on the runtime this thread is running in.
    pub fn current() -> Result<Self> {
        Handle::try_current().map(Self::new).map_err(|_| Error::NoRuntime)
    }

    /// Routes unhandled failures to `sink` instead of `tracing`.
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.dispatcher = self.dispatcher.with_sink(sink);
        self
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Sends every task and returns one entry per task, in input order:
    /// the response, or `None` if the task failed.
    ///
    /// The input is collected before anything is sent. Fails only for an
    /// invalid pool size; request failures stay inside their own entry.
    pub async fn map<I>(&self, tasks: I, options: MapOptions) -> Result<Vec<Option<Arc<Response>>>>
    where
        I: IntoIterator,
        I::Item: Into<Arc<Task>>,
    {
        let outcomes = self.map_outcomes(tasks, options).await?;
        Ok(outcomes.into_iter().map(Outcome::into_response).collect())
    }

    /// Like [`map`](Runner::map), keeping the error of each failed task.
    pub async fn map_outcomes<I>(&self, tasks: I, options: MapOptions) -> Result<Vec<Outcome>>
    where
        I: IntoIterator,
        I::Item: Into<Arc<Task>>,
    {
        let pool = options.size.map(Pool::new).transpose()?;
        let tasks: Vec<Arc<Task>> = tasks.into_iter().map(Into::into).collect();
        tracing::debug!(tasks = tasks.len(), size = ?options.size, stream = options.stream, "map started");

        run_all(&self.dispatcher, tasks, pool.as_ref(), options.stream, options.exception_handler).await
    }

    /// Streams responses in completion order from a lazily consumed iterator.
    pub fn imap<I>(&self, tasks: I, options: ImapOptions) -> Result<ResponseStream>
    where
        I: IntoIterator,
        I::IntoIter: Send + 'static,
        I::Item: Into<Arc<Task>>,
    {
        self.imap_stream(stream::iter(tasks), options)
    }

    /// Streams responses in completion order from an async source.
    pub fn imap_stream<S>(&self, tasks: S, options: ImapOptions) -> Result<ResponseStream>
    where
        S: Stream + Send + 'static,
        S::Item: Into<Arc<Task>>,
    {
        let pool = Pool::new(options.size)?;
        let input = tasks.map(|task| -> Arc<Task> { task.into() }).boxed();
        Ok(run_streaming(self.dispatcher.clone(), input, pool, options.stream, options.exception_handler))
    }
}
