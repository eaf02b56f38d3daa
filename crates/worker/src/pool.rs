//! Bounded pool for job handlers.
//!
//! Submission never waits: when every slot is taken the task is handed
//! back so the caller can run it inline.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;

pub struct WorkerPool {
    slots: Option<Arc<Semaphore>>,
    tracker: TaskTracker,
}

impl WorkerPool {
    /// A pool of `size` concurrent tasks. A size of zero rejects every
    /// submission.
    pub fn new(size: usize) -> Self {
        let slots = (size > 0).then(|| Arc::new(Semaphore::new(size.min(Semaphore::MAX_PERMITS))));
        Self {
            slots,
            tracker: TaskTracker::new(),
        }
    }

    /// Spawn `task` if a slot is free, otherwise return it unchanged.
    pub fn try_spawn<F>(&self, task: F) -> Result<(), F>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Some(slots) = &self.slots else {
            return Err(task);
        };
        match Arc::clone(slots).try_acquire_owned() {
            Ok(permit) => {
                self.tracker.spawn(async move {
                    task.await;
                    drop(permit);
                });
                Ok(())
            }
            Err(_) => Err(task),
        }
    }

    /// Tasks spawned and not yet finished.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Stop accepting work and wait for running tasks.
    /// Returns `false` if they did not finish within `timeout`.
    pub async fn drain(&self, timeout: Duration) -> bool {
        self.tracker.close();
        tokio::time::timeout(timeout, self.tracker.wait()).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Notify;

    #[tokio::test]
    async fn zero_sized_pool_hands_tasks_back() {
        let pool = WorkerPool::new(0);
        assert!(pool.try_spawn(async {}).is_err());
    }

    #[tokio::test]
    async fn full_pool_hands_tasks_back_until_a_slot_frees() {
        let pool = WorkerPool::new(1);
        let gate = Arc::new(Notify::new());

        let waiter = Arc::clone(&gate);
        assert!(pool.try_spawn(async move { waiter.notified().await }).is_ok());
        assert!(pool.try_spawn(async {}).is_err());

        gate.notify_one();
        assert!(pool.drain(Duration::from_secs(1)).await);
        assert_eq!(pool.in_flight(), 0);
    }

    #[tokio::test]
    async fn drain_times_out_on_stuck_task() {
        let pool = WorkerPool::new(2);
        assert!(pool
            .try_spawn(async { tokio::time::sleep(Duration::from_secs(30)).await })
            .is_ok());
        assert!(!pool.drain(Duration::from_millis(20)).await);
    }
}
