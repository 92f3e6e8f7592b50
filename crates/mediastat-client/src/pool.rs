//! Bounded fan-out with a cooperative wall-clock deadline.
//!
//! [`run_bounded`] spawns `min(concurrency, N)` workers that claim indices
//! from a shared atomic cursor. The deadline is checked only before a claim:
//! work already in flight runs to completion, but the join stops waiting for
//! it once the deadline passes. Slots that never receive a result stay
//! `None`, which callers map to their "unavailable" value.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

/// Scheduling parameters for [`run_bounded`].
#[derive(Debug, Clone, Copy)]
pub struct PoolOptions {
    /// Upper bound on concurrent workers.
    pub concurrency: usize,
    /// No new work is claimed after this instant. `None` waits for everything.
    pub deadline: Option<Instant>,
    /// Pause before the single retry of a failed item.
    pub retry_delay: Duration,
}

impl PoolOptions {
    #[must_use]
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency,
            deadline: None,
            retry_delay: Duration::from_millis(250),
        }
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    #[must_use]
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }
}

/// Positional results of a pool run.
#[derive(Debug)]
pub struct PoolOutcome<R> {
    /// One slot per input item, in input order. `None` means the item failed
    /// twice or was not finished before the deadline.
    pub slots: Vec<Option<R>>,
    /// `true` if the deadline cut the run short.
    pub deadline_reached: bool,
}

impl<R> PoolOutcome<R> {
    /// Number of slots without a result.
    #[must_use]
    pub fn missing(&self) -> usize {
        self.slots.iter().filter(|s| s.is_none()).count()
    }
}

/// Runs `work` over `items` with bounded concurrency and an optional deadline.
///
/// Each index is claimed exactly once across all workers. A failed item is
/// retried once after `options.retry_delay`; a second failure leaves its slot
/// empty instead of failing the batch. The returned slots follow input order
/// regardless of completion order.
pub async fn run_bounded<T, R, E, F, Fut>(
    items: Vec<T>,
    options: PoolOptions,
    work: F,
) -> PoolOutcome<R>
where
    T: Clone + Send + Sync + 'static,
    R: Send + 'static,
    E: std::fmt::Display + Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
{
    let total = items.len();
    let mut slots: Vec<Option<R>> = std::iter::repeat_with(|| None).take(total).collect();
    if total == 0 {
        return PoolOutcome {
            slots,
            deadline_reached: false,
        };
    }

    let workers = options.concurrency.max(1).min(total);
    let items = Arc::new(items);
    let work = Arc::new(work);
    let cursor = Arc::new(AtomicUsize::new(0));
    let (tx, mut rx) = mpsc::unbounded_channel::<(usize, Option<R>)>();

    for _ in 0..workers {
        let items = Arc::clone(&items);
        let work = Arc::clone(&work);
        let cursor = Arc::clone(&cursor);
        let tx = tx.clone();
        let PoolOptions {
            deadline,
            retry_delay,
            ..
        } = options;
        tokio::spawn(async move {
            loop {
                if deadline.is_some_and(|d| Instant::now() >= d) {
                    break;
                }
                let index = cursor.fetch_add(1, Ordering::SeqCst);
                let Some(item) = items.get(index) else {
                    break;
                };
                let result = run_with_retry(work.as_ref(), item, index, retry_delay).await;
                if tx.send((index, result)).is_err() {
                    // The join has already returned; nobody will read this.
                    break;
                }
            }
        });
    }
    drop(tx);

    let deadline_timer = async move {
        match options.deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline_timer);

    let mut timer_fired = false;
    loop {
        tokio::select! {
            biased;
            received = rx.recv() => match received {
                Some((index, result)) => slots[index] = result,
                None => break,
            },
            () = &mut deadline_timer => {
                timer_fired = true;
                break;
            }
        }
    }

    let unclaimed = cursor.load(Ordering::SeqCst) < total;
    let deadline_reached = timer_fired || unclaimed;
    let outcome = PoolOutcome {
        slots,
        deadline_reached,
    };
    if outcome.deadline_reached {
        tracing::warn!(
            total,
            missing = outcome.missing(),
            "deadline reached before all work finished"
        );
    }
    outcome
}

async fn run_with_retry<T, R, E, F, Fut>(
    work: &F,
    item: &T,
    index: usize,
    retry_delay: Duration,
) -> Option<R>
where
    T: Clone,
    E: std::fmt::Display,
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    match work(item.clone()).await {
        Ok(value) => return Some(value),
        Err(err) => {
            tracing::warn!(index, error = %err, "work item failed, retrying once");
        }
    }
    tokio::time::sleep(retry_delay).await;
    match work(item.clone()).await {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(index, error = %err, "work item failed twice, leaving it unavailable");
            None
        }
    }
}

#[cfg(test)]
#[path = "pool_test.rs"]
mod tests;
