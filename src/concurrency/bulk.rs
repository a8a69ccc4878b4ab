use std::sync::Arc;

use futures::future::join_all;

use crate::error::Result;
use crate::request::Task;

use super::dispatcher::{Dispatcher, ExceptionHandler, Outcome};
use super::Pool;

/// Dispatches every task up front and waits for all of them.
///
/// Outcomes line up with `tasks` by index. With a pool, dispatching
/// pauses whenever the pool is full, so at most `pool.capacity()` units
/// run at once.
pub(crate) async fn run_all(
    dispatcher: &Dispatcher,
    tasks: Vec<Arc<Task>>,
    pool: Option<&Pool>,
    stream: bool,
    handler: Option<ExceptionHandler>,
) -> Result<Vec<Outcome>> {
    let mut jobs = Vec::with_capacity(tasks.len());
    for task in tasks {
        jobs.push(dispatcher.dispatch(task, pool, stream, handler.clone()).await?);
    }

    let outcomes = join_all(jobs).await;
    if let Some(pool) = pool {
        pool.join().await?;
    }
    Ok(outcomes)
}
