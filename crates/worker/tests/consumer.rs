//! Consumer loop against the in-memory queue.

mod common;

use std::sync::Arc;
use std::time::Duration;

use s2v_db::models::status::OperationStatus;
use s2v_db::{Datastore, MemoryStore};
use s2v_model::RpcCode;
use s2v_queue::{JobPublisher, JobQueue, MemoryQueue};
use s2v_worker::{ConsumerLoop, DisabledStorage, JobHandler, WorkerPool};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use common::{create_job, handler, seed_story, shot, FakeModel};

/// Run the loop until `done` holds, then stop it.
async fn run_until<F, Fut>(consumer: Arc<ConsumerLoop>, done: F)
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let cancel = CancellationToken::new();
    let task = {
        let consumer = Arc::clone(&consumer);
        let cancel = cancel.clone();
        tokio::spawn(async move { consumer.run(cancel).await })
    };

    tokio::time::timeout(Duration::from_secs(5), async {
        while !done().await {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("consumer did not reach the expected state");

    cancel.cancel();
    task.await.unwrap();
    assert!(consumer.drain(Duration::from_secs(1)).await);
}

async fn status_of(store: &MemoryStore, id: Uuid) -> OperationStatus {
    store.find_operation(id).await.unwrap().unwrap().status
}

#[tokio::test]
async fn processes_and_commits_jobs() {
    let store = Arc::new(MemoryStore::new());
    let queue = Arc::new(MemoryQueue::new(Duration::from_millis(20)));
    let a = seed_story(&store).await;
    let b = seed_story(&store).await;
    queue.publish(&create_job(&a)).await.unwrap();
    queue.publish(&create_job(&b)).await.unwrap();

    let model = FakeModel::returning_shots(vec![shot("1", "http://x/1.png")]);
    let handler = Arc::new(handler(&store, model, Arc::new(DisabledStorage)));
    let consumer = Arc::new(ConsumerLoop::new(queue.clone(), handler, WorkerPool::new(4)));

    let (s, q) = (store.clone(), queue.clone());
    let (op_a, op_b) = (a.operation_id, b.operation_id);
    run_until(consumer, move || {
        let (s, q) = (s.clone(), q.clone());
        async move {
            status_of(&s, op_a).await == OperationStatus::Succeeded
                && status_of(&s, op_b).await == OperationStatus::Succeeded
                && q.in_flight_len().await == 0
        }
    })
    .await;

    assert_eq!(queue.ready_len().await, 0);
}

#[tokio::test]
async fn failed_job_is_still_committed() {
    let store = Arc::new(MemoryStore::new());
    let queue = Arc::new(MemoryQueue::new(Duration::from_millis(20)));
    let seeded = seed_story(&store).await;
    queue.publish(&create_job(&seeded)).await.unwrap();

    let model = FakeModel::failing(RpcCode::Internal);
    let handler = Arc::new(handler(&store, model.clone(), Arc::new(DisabledStorage)));
    let consumer = Arc::new(ConsumerLoop::new(queue.clone(), handler, WorkerPool::new(2)));

    let (s, q) = (store.clone(), queue.clone());
    let op = seeded.operation_id;
    run_until(consumer, move || {
        let (s, q) = (s.clone(), q.clone());
        async move {
            status_of(&s, op).await == OperationStatus::Failed && q.in_flight_len().await == 0
        }
    })
    .await;

    assert_eq!(queue.ready_len().await, 0);
    assert_eq!(model.call_count(), 1);
}

#[tokio::test]
async fn zero_sized_pool_processes_inline() {
    let store = Arc::new(MemoryStore::new());
    let queue = Arc::new(MemoryQueue::new(Duration::from_millis(20)));
    let seeded = seed_story(&store).await;
    queue.publish(&create_job(&seeded)).await.unwrap();

    let model = FakeModel::returning_shots(vec![shot("1", "")]);
    let handler = Arc::new(handler(&store, model, Arc::new(DisabledStorage)));
    let consumer = Arc::new(ConsumerLoop::new(queue.clone(), handler, WorkerPool::new(0)));

    let (s, q) = (store.clone(), queue.clone());
    let op = seeded.operation_id;
    run_until(consumer, move || {
        let (s, q) = (s.clone(), q.clone());
        async move {
            status_of(&s, op).await == OperationStatus::Succeeded && q.in_flight_len().await == 0
        }
    })
    .await;
}

#[tokio::test]
async fn redelivery_after_crash_is_idempotent_and_counted() {
    let store = Arc::new(MemoryStore::new());
    let queue = Arc::new(MemoryQueue::new(Duration::from_millis(20)));
    let seeded = seed_story(&store).await;
    queue.publish(&create_job(&seeded)).await.unwrap();

    let model = FakeModel::returning_shots(vec![shot("1", "http://x/1.png"), shot("2", "")]);
    let handler: Arc<JobHandler> = Arc::new(handler(&store, model.clone(), Arc::new(DisabledStorage)));

    // Handle the job, then crash before committing.
    let delivery = queue.fetch().await.unwrap().unwrap();
    handler.handle(&delivery.body).await.unwrap();
    assert_eq!(store.shot_count(seeded.story_id), 2);
    queue.crash().await;

    let consumer = Arc::new(ConsumerLoop::new(queue.clone(), handler, WorkerPool::new(2)));
    let (s, q) = (store.clone(), queue.clone());
    let op = seeded.operation_id;
    run_until(consumer, move || {
        let (s, q) = (s.clone(), q.clone());
        async move {
            let retries = s.find_operation(op).await.unwrap().unwrap().retries;
            retries == 1 && q.ready_len().await == 0 && q.in_flight_len().await == 0
        }
    })
    .await;

    assert_eq!(model.call_count(), 1);
    assert_eq!(store.shot_count(seeded.story_id), 2);
    assert_eq!(status_of(&store, op).await, OperationStatus::Succeeded);
}

#[tokio::test]
async fn closed_queue_stops_the_loop() {
    let store = Arc::new(MemoryStore::new());
    let queue = Arc::new(MemoryQueue::new(Duration::from_millis(20)));
    let handler = Arc::new(handler(
        &store,
        FakeModel::returning_shots(vec![]),
        Arc::new(DisabledStorage),
    ));
    let consumer = ConsumerLoop::new(queue.clone(), handler, WorkerPool::new(1));

    queue.close();
    tokio::time::timeout(Duration::from_secs(1), consumer.run(CancellationToken::new()))
        .await
        .expect("loop should exit once the queue is closed");
}
