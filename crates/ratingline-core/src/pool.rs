//! Bounded fan-out with a join barrier.
//!
//! A fixed number of rayon workers pull items from a lock-free queue; the
//! call returns only when every item has been processed or skipped.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::shutdown::is_shutdown_requested;

/// Lock-free queue handing out items to workers in submission order
struct WorkQueue<S> {
    items: Vec<S>,
    cursor: AtomicUsize,
}

impl<S> WorkQueue<S> {
    fn new(items: Vec<S>) -> Self {
        Self {
            items,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Claim the next item; `None` once drained
    fn next(&self) -> Option<&S> {
        let i = self.cursor.fetch_add(1, Ordering::Relaxed);
        self.items.get(i)
    }
}

/// Process `items` on at most `workers` threads and collect the outputs.
///
/// Output order follows completion, not submission; callers index results
/// by a key carried in the item. Once shutdown is requested no further
/// items are started, and items already running finish normally.
pub fn fan_out<S, R>(items: Vec<S>, workers: usize, work: impl Fn(&S) -> R + Sync) -> Vec<R>
where
    S: Sync,
    R: Send,
{
    if items.is_empty() {
        return Vec::new();
    }
    let workers = workers.clamp(1, items.len());
    let total = items.len();
    let queue = WorkQueue::new(items);
    let results: Mutex<Vec<R>> = Mutex::new(Vec::with_capacity(total));

    let pool = match rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("fan-out-{i}"))
        .build()
    {
        Ok(pool) => pool,
        Err(e) => {
            log::warn!("cannot build worker pool ({e}), running sequentially");
            let mut out = Vec::with_capacity(total);
            while let Some(item) = queue.next() {
                if is_shutdown_requested() {
                    break;
                }
                out.push(work(item));
            }
            return out;
        }
    };

    pool.scope(|s| {
        for _ in 0..workers {
            s.spawn(|_| {
                while let Some(item) = queue.next() {
                    if is_shutdown_requested() {
                        break;
                    }
                    let r = work(item);
                    results.lock().unwrap_or_else(|e| e.into_inner()).push(r);
                }
            });
        }
    });

    results.into_inner().unwrap_or_else(|e| e.into_inner())
}
