//! In-process queue implementing both [`JobPublisher`] and [`JobQueue`].

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use s2v_core::job::StoryJobMessage;
use tokio::sync::{Mutex, Notify};

use crate::consumer::{Delivery, JobQueue};
use crate::error::QueueError;
use crate::publisher::JobPublisher;

#[derive(Default)]
struct State {
    ready: VecDeque<Delivery>,
    in_flight: HashMap<String, Delivery>,
}

pub struct MemoryQueue {
    state: Mutex<State>,
    notify: Notify,
    next_id: AtomicU64,
    closed: AtomicBool,
    wait: Duration,
}

impl MemoryQueue {
    /// A queue whose `fetch` waits up to `wait` for a message.
    pub fn new(wait: Duration) -> Self {
        Self {
            state: Mutex::new(State::default()),
            notify: Notify::new(),
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
            wait,
        }
    }

    /// Enqueue a raw body, bypassing job encoding.
    pub async fn push_raw(&self, body: Vec<u8>) -> String {
        let id = format!("{:020}-0", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.state.lock().await.ready.push_back(Delivery {
            id: id.clone(),
            body,
            redelivered: false,
        });
        self.notify.notify_one();
        id
    }

    /// Simulate a consumer crash: every unacknowledged message goes back to
    /// the front of the queue as a redelivery.
    pub async fn crash(&self) {
        let mut state = self.state.lock().await;
        let mut pending: Vec<Delivery> = state.in_flight.drain().map(|(_, d)| d).collect();
        pending.sort_by(|a, b| a.id.cmp(&b.id));
        for mut delivery in pending.into_iter().rev() {
            delivery.redelivered = true;
            state.ready.push_front(delivery);
        }
        drop(state);
        self.notify.notify_one();
    }

    /// Stop handing out messages; pending fetches return `QueueError::Closed`.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub async fn ready_len(&self) -> usize {
        self.state.lock().await.ready.len()
    }

    pub async fn in_flight_len(&self) -> usize {
        self.state.lock().await.in_flight.len()
    }

    async fn try_take(&self) -> Option<Delivery> {
        let mut state = self.state.lock().await;
        let delivery = state.ready.pop_front()?;
        state.in_flight.insert(delivery.id.clone(), delivery.clone());
        Some(delivery)
    }
}

#[async_trait]
impl JobPublisher for MemoryQueue {
    async fn publish(&self, job: &StoryJobMessage) -> Result<(), QueueError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(QueueError::Closed);
        }
        self.push_raw(job.encode()?).await;
        Ok(())
    }
}

#[async_trait]
impl JobQueue for MemoryQueue {
    async fn fetch(&self) -> Result<Option<Delivery>, QueueError> {
        let deadline = tokio::time::Instant::now() + self.wait;
        loop {
            if self.closed.load(Ordering::SeqCst) {
                return Err(QueueError::Closed);
            }
            let notified = self.notify.notified();
            if let Some(delivery) = self.try_take().await {
                return Ok(Some(delivery));
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn commit(&self, delivery: &Delivery) -> Result<(), QueueError> {
        self.state.lock().await.in_flight.remove(&delivery.id);
        Ok(())
    }
}
