use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::task::{JoinError, JoinHandle};

use crate::diagnostics::{DiagnosticSink, TracingSink};
use crate::error::{ExecutionError, Result, TaskError};
use crate::request::{RequestOptions, Response, Task};

use super::Pool;

/// Called once with the task and the error for every failed unit.
/// Whatever it does, the failure stops there.
pub type ExceptionHandler = Arc<dyn Fn(&Task, &TaskError) + Send + Sync>;

/// How one concurrency unit ended.
#[derive(Debug)]
pub enum Outcome {
    Success(Arc<Response>),
    /// Already routed to the exception handler or the diagnostic sink.
    Failed(TaskError),
    /// The unit was aborted before it finished. Never reported.
    Cancelled,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn response(&self) -> Option<&Arc<Response>> {
        match self {
            Outcome::Success(res) => Some(res),
            _ => None,
        }
    }

    pub fn into_response(self) -> Option<Arc<Response>> {
        match self {
            Outcome::Success(res) => Some(res),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&TaskError> {
        match self {
            Outcome::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Spawns one concurrency unit per task on an explicit runtime.
#[derive(Clone)]
pub struct Dispatcher {
    runtime: Handle,
    sink: Arc<dyn DiagnosticSink>,
}

impl Dispatcher {
    pub fn new(runtime: Handle) -> Self {
        Self { runtime, sink: Arc::new(TracingSink) }
    }

    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn runtime(&self) -> &Handle {
        &self.runtime
    }

    /// Spawns a unit that executes `task` with `stream` as an override.
    ///
    /// With a pool, the call itself waits for a free slot before spawning
    /// and the unit holds that slot until it ends. Without one the unit
    /// starts immediately.
    pub async fn dispatch(
        &self,
        task: Arc<Task>,
        pool: Option<&Pool>,
        stream: bool,
        handler: Option<ExceptionHandler>,
    ) -> Result<UnitHandle> {
        let slot = match pool {
            Some(pool) => Some(pool.acquire().await?),
            None => None,
        };

        let unit_task = task.clone();
        let sink = self.sink.clone();
        let join = self.runtime.spawn(async move {
            let outcome = run_unit(&unit_task, stream, handler, sink.as_ref()).await;
            drop(slot);
            outcome
        });

        Ok(UnitHandle { task, sink: self.sink.clone(), join })
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher").field("runtime", &self.runtime).finish_non_exhaustive()
    }
}

async fn run_unit(
    task: &Task,
    stream: bool,
    handler: Option<ExceptionHandler>,
    sink: &dyn DiagnosticSink,
) -> Outcome {
    let overrides = RequestOptions::new().stream(stream);
    let result = AssertUnwindSafe(task.execute(Some(&overrides))).catch_unwind().await;

    let error = match result {
        Ok(Ok(response)) => return Outcome::Success(response),
        Ok(Err(e)) => TaskError::Transport(e),
        Err(payload) => TaskError::Execution(ExecutionError::from_panic(payload)),
    };

    let Some(handler) = handler else {
        sink.report(task, &error);
        return Outcome::Failed(error);
    };
    match std::panic::catch_unwind(AssertUnwindSafe(|| handler(task, &error))) {
        Ok(()) => Outcome::Failed(error),
        Err(payload) => {
            let error = TaskError::Execution(ExecutionError::from_panic(payload));
            sink.report(task, &error);
            Outcome::Failed(error)
        }
    }
}

/// Resolves to the [`Outcome`] of a dispatched unit.
///
/// Dropping the handle detaches the unit; it still runs to completion.
pub struct UnitHandle {
    task: Arc<Task>,
    sink: Arc<dyn DiagnosticSink>,
    join: JoinHandle<Outcome>,
}

impl UnitHandle {
    pub fn task(&self) -> &Arc<Task> {
        &self.task
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    #[cfg(test)]
    pub(crate) fn abort(&self) {
        self.join.abort();
    }

    fn settle(&self, result: std::result::Result<Outcome, JoinError>) -> Outcome {
        match result {
            Ok(outcome) => outcome,
            Err(e) if e.is_cancelled() => Outcome::Cancelled,
            Err(e) => {
                // only the sink itself can panic past run_unit
                let error = TaskError::Execution(ExecutionError::from_panic(e.into_panic()));
                tracing::error!(url = self.task.url(), error = %error, "diagnostic sink panicked");
                Outcome::Failed(error)
            }
        }
    }
}

impl Future for UnitHandle {
    type Output = Outcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let result = match Pin::new(&mut self.join).poll(cx) {
            Poll::Ready(result) => result,
            Poll::Pending => return Poll::Pending,
        };
        Poll::Ready(self.settle(result))
    }
}

impl fmt::Debug for UnitHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitHandle")
            .field("task", &self.task)
            .field("finished", &self.join.is_finished())
            .finish()
    }
}
