use std::sync::Arc;

use futures::stream::{self, BoxStream, FuturesUnordered};
use futures::StreamExt;

use crate::request::{Response, Task};

use super::dispatcher::{Dispatcher, ExceptionHandler, Outcome, UnitHandle};
use super::Pool;

/// Responses in completion order. Single pass.
pub type ResponseStream = BoxStream<'static, Arc<Response>>;

struct StreamState {
    dispatcher: Dispatcher,
    input: BoxStream<'static, Arc<Task>>,
    input_done: bool,
    in_flight: FuturesUnordered<UnitHandle>,
    pool: Pool,
    stream: bool,
    handler: Option<ExceptionHandler>,
}

enum Event {
    Pulled(Option<Arc<Task>>),
    Settled(Option<Outcome>),
}

impl StreamState {
    fn saturated(&self) -> bool {
        self.in_flight.len() >= self.pool.capacity()
    }

    async fn admit(&mut self, next: Option<Arc<Task>>) {
        let Some(task) = next else {
            self.input_done = true;
            return;
        };
        match self.dispatcher.dispatch(task, Some(&self.pool), self.stream, self.handler.clone()).await {
            Ok(handle) => self.in_flight.push(handle),
            Err(e) => {
                tracing::error!(error = %e, "stopping stream: could not dispatch task");
                self.input_done = true;
            }
        }
    }

    /// Waits for the next event, pulling input only while there is room.
    async fn next_event(&mut self) -> Event {
        if self.input_done || self.saturated() {
            return Event::Settled(self.in_flight.next().await);
        }
        if self.in_flight.is_empty() {
            return Event::Pulled(self.input.next().await);
        }
        tokio::select! {
            outcome = self.in_flight.next() => Event::Settled(outcome),
            next = self.input.next() => Event::Pulled(next),
        }
    }
}

async fn next_response(mut state: StreamState) -> Option<(Arc<Response>, StreamState)> {
    loop {
        match state.next_event().await {
            Event::Pulled(next) => state.admit(next).await,
            Event::Settled(Some(outcome)) => {
                if let Some(response) = outcome.into_response() {
                    return Some((response, state));
                }
            }
            Event::Settled(None) => break,
        }
    }

    if let Err(e) = state.pool.join().await {
        tracing::warn!(error = %e, "pool closed before draining");
    }
    None
}

/// Lazily pulls tasks from `input`, keeping at most `pool.capacity()`
/// in flight, and yields each successful response as soon as its unit
/// finishes. Failed and cancelled tasks yield nothing.
///
/// Dropping the stream stops admitting new tasks; units already in flight
/// are detached and still run to completion.
pub(crate) fn run_streaming(
    dispatcher: Dispatcher,
    input: BoxStream<'static, Arc<Task>>,
    pool: Pool,
    stream: bool,
    handler: Option<ExceptionHandler>,
) -> ResponseStream {
    let state = StreamState {
        dispatcher,
        input,
        input_done: false,
        in_flight: FuturesUnordered::new(),
        pool,
        stream,
        handler,
    };
    stream::unfold(state, next_response).boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskError;
    use crate::testing::{task, MockClient, RecordingSink};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::runtime::Handle;

    fn input(client: &Arc<MockClient>, urls: &[&str]) -> BoxStream<'static, Arc<Task>> {
        let tasks: Vec<Arc<Task>> = urls.iter().map(|url| Arc::new(task(client, url))).collect();
        stream::iter(tasks).boxed()
    }

    async fn drain(responses: ResponseStream) -> Vec<String> {
        let responses: Vec<Arc<Response>> = responses.collect().await;
        let mut bodies = Vec::new();
        for res in responses {
            bodies.push(res.text().await.unwrap());
        }
        bodies
    }

    #[tokio::test(start_paused = true)]
    async fn failed_task_is_omitted() {
        let client = Arc::new(
            MockClient::new()
                .delay("http://mock/a", 30)
                .delay("http://mock/b", 10)
                .fail("http://mock/c")
                .delay("http://mock/d", 20)
                .delay("http://mock/e", 5),
        );
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = Dispatcher::new(Handle::current()).with_sink(sink.clone());
        let pool = Pool::new(2).unwrap();
        let urls = ["http://mock/a", "http://mock/b", "http://mock/c", "http://mock/d", "http://mock/e"];

        let bodies = drain(run_streaming(dispatcher, input(&client, &urls), pool.clone(), false, None)).await;

        assert_eq!(bodies.len(), 4);
        let unique: HashSet<_> = bodies.iter().cloned().collect();
        let expected: HashSet<_> =
            ["http://mock/a", "http://mock/b", "http://mock/d", "http://mock/e"].iter().map(|s| s.to_string()).collect();
        assert_eq!(unique, expected);
        assert_eq!(sink.reports(), vec![("http://mock/c".to_string(), "HttpError")]);
        assert_eq!(client.peak(), 2);
        assert_eq!(client.active(), 0);
        assert_eq!(pool.available(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn yields_in_completion_order() {
        let client = Arc::new(
            MockClient::new()
                .delay("http://mock/slow", 300)
                .delay("http://mock/fast", 10)
                .delay("http://mock/mid", 100),
        );
        let dispatcher = Dispatcher::new(Handle::current());
        let urls = ["http://mock/slow", "http://mock/fast", "http://mock/mid"];

        let bodies = drain(run_streaming(dispatcher, input(&client, &urls), Pool::new(3).unwrap(), false, None)).await;

        assert_eq!(bodies, vec!["http://mock/fast", "http://mock/mid", "http://mock/slow"]);
    }

    #[tokio::test]
    async fn empty_input_ends_immediately() {
        let dispatcher = Dispatcher::new(Handle::current());
        let responses = run_streaming(dispatcher, stream::empty().boxed(), Pool::new(2).unwrap(), false, None);
        assert!(drain(responses).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn input_is_pulled_lazily() {
        let client = Arc::new(MockClient::new());
        let pulled = Arc::new(AtomicUsize::new(0));
        let counter = pulled.clone();
        let source_client = client.clone();
        let source = stream::iter(0..)
            .map(move |i| {
                counter.fetch_add(1, Ordering::SeqCst);
                Arc::new(task(&source_client, &format!("http://mock/{i}")))
            })
            .boxed();
        let dispatcher = Dispatcher::new(Handle::current());

        let mut responses = run_streaming(dispatcher, source, Pool::new(2).unwrap(), false, None);
        let first_three: Vec<_> = (&mut responses).take(3).collect().await;

        assert_eq!(first_three.len(), 3);
        assert!(pulled.load(Ordering::SeqCst) <= 5);
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_stream_lets_in_flight_units_finish() {
        let client = Arc::new(
            MockClient::new()
                .delay("http://mock/a", 10)
                .delay("http://mock/b", 200)
                .delay("http://mock/c", 200),
        );
        let dispatcher = Dispatcher::new(Handle::current());
        let pool = Pool::new(2).unwrap();
        let tasks: Vec<Arc<Task>> =
            ["http://mock/a", "http://mock/b", "http://mock/c"].iter().map(|url| Arc::new(task(&client, url))).collect();
        let watched = tasks[1].clone();

        let mut responses = run_streaming(dispatcher, stream::iter(tasks).boxed(), pool.clone(), false, None);
        let first = responses.next().await.unwrap();
        assert_eq!(first.text().await.unwrap(), "http://mock/a");
        drop(responses);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(watched.response().is_some());
        assert_eq!(client.active(), 0);
        assert_eq!(pool.available(), 2);
    }

    #[tokio::test]
    async fn handler_failures_never_end_the_stream() {
        let client = Arc::new(MockClient::new().fail("http://mock/x"));
        let handled = Arc::new(AtomicUsize::new(0));
        let count = handled.clone();
        let handler: ExceptionHandler = Arc::new(move |_: &Task, _: &TaskError| {
            count.fetch_add(1, Ordering::SeqCst);
        });
        let dispatcher = Dispatcher::new(Handle::current());
        let urls = ["http://mock/x", "http://mock/y", "http://mock/z"];

        let bodies =
            drain(run_streaming(dispatcher, input(&client, &urls), Pool::new(1).unwrap(), false, Some(handler))).await;

        assert_eq!(bodies.len(), 2);
        assert_eq!(handled.load(Ordering::SeqCst), 1);
    }
}
