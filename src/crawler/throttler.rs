//! Bounded-concurrency task execution
//!
//! This module handles:
//! - Keeping a constant number of tasks in flight until the queue is empty
//! - Starting the next task the moment any in-flight task settles
//! - Firing one completion callback, on the last settle or on a batch timeout
//!
//! A batch timeout only fires the callback early; nothing is cancelled, so
//! stragglers and not-yet-started tasks keep running in the background.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::{JoinHandle, JoinSet};

/// A deferred unit of work; the future is created only when a slot is free
pub type Task = Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send>;

/// Wraps an async closure into a [`Task`]
pub fn task<F, Fut>(start: F) -> Task
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Box::new(move || Box::pin(start()))
}

/// Callback guard that runs at most once, whoever gets there first
struct Completion {
    fired: AtomicBool,
    callback: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Completion {
    fn new(callback: impl FnOnce() + Send + 'static) -> Self {
        Self {
            fired: AtomicBool::new(false),
            callback: Mutex::new(Some(Box::new(callback))),
        }
    }

    fn fire(&self) {
        if self.fired.swap(true, Ordering::SeqCst) {
            return;
        }

        let callback = match self.callback.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(callback) = callback {
            callback();
        }
    }
}

/// Runs `tasks` with at most `max_concurrency` in flight
///
/// `on_complete` fires exactly once: after the last task settles, or when
/// `timeout` elapses first. The returned handle resolves once it has fired.
/// A `max_concurrency` of 0 is treated as 1.
///
/// Must be called from within a tokio runtime.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use sumi_harvest::crawler::{run_bounded, task};
///
/// # async fn demo() {
/// let tasks = (0..10).map(|i| task(move || async move {
///     tokio::time::sleep(Duration::from_millis(10 * i)).await;
/// }));
///
/// run_bounded(tasks, 3, || println!("done"), Duration::from_secs(5))
///     .await
///     .unwrap();
/// # }
/// ```
pub fn run_bounded<I, F>(
    tasks: I,
    max_concurrency: usize,
    on_complete: F,
    timeout: Duration,
) -> JoinHandle<()>
where
    I: IntoIterator<Item = Task>,
    I::IntoIter: Send + 'static,
    F: FnOnce() + Send + 'static,
{
    let completion = Arc::new(Completion::new(on_complete));
    let ceiling = max_concurrency.max(1);
    let pending = tasks.into_iter();

    let driver_completion = Arc::clone(&completion);
    let driver = tokio::spawn(async move {
        let settled = drive(pending, ceiling).await;
        tracing::debug!("Throttled batch settled after {} task(s)", settled);
        driver_completion.fire();
    });

    tokio::spawn(async move {
        if tokio::time::timeout(timeout, driver).await.is_err() {
            tracing::warn!(
                "Batch timeout of {:?} elapsed with tasks still running",
                timeout
            );
        }
        completion.fire();
    })
}

/// Keeps `ceiling` tasks in flight until the iterator is exhausted
///
/// Returns the number of tasks that settled.
async fn drive(mut pending: impl Iterator<Item = Task>, ceiling: usize) -> usize {
    let mut in_flight = JoinSet::new();
    let mut settled = 0;

    for start in pending.by_ref().take(ceiling) {
        in_flight.spawn(start());
    }

    while let Some(joined) = in_flight.join_next().await {
        settled += 1;
        if let Err(e) = joined {
            tracing::error!("Throttled task aborted: {}", e);
        }

        if let Some(start) = pending.next() {
            in_flight.spawn(start());
        }
    }

    settled
}
