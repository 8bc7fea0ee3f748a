use super::{drain_texts, open_handle, registry};
use crate::{DeliveryResult, DispatchConfig, DispatchLoop, DispatchStep, Metrics, ShutdownCoordinator};

use relay_core::UserId;
use relay_queue::{MemoryQueue, NotificationQueue, QueueError, Result as QueueResult};

use std::panic::Location;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use error_location::ErrorLocation;
use metrics_exporter_prometheus::PrometheusBuilder;
use serde_json::{Value, json};

/// Memory queue that counts how often it is polled
struct CountingQueue {
    inner: MemoryQueue,
    pops: AtomicUsize,
}

impl CountingQueue {
    fn with_items(items: Vec<String>) -> Self {
        Self {
            inner: MemoryQueue::with_items(items),
            pops: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl NotificationQueue for CountingQueue {
    async fn pop(&self) -> QueueResult<Option<String>> {
        self.pops.fetch_add(1, Ordering::SeqCst);
        self.inner.pop().await
    }

    async fn push(&self, item: String) -> QueueResult<()> {
        self.inner.push(item).await
    }

    fn name(&self) -> &str {
        "counting"
    }
}

/// Queue whose backend is always down
struct BrokenQueue;

#[async_trait]
impl NotificationQueue for BrokenQueue {
    async fn pop(&self) -> QueueResult<Option<String>> {
        let source = redis::RedisError::from((redis::ErrorKind::IoError, "connection refused"));
        Err(QueueError::Command {
            command: "LPOP",
            key: "broken".to_string(),
            source,
            location: ErrorLocation::from(Location::caller()),
        })
    }

    async fn push(&self, _item: String) -> QueueResult<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "broken"
    }
}

/// Queue whose first item was removed but is not UTF-8
struct BadBytesQueue {
    inner: MemoryQueue,
    served_bad_item: AtomicBool,
}

#[async_trait]
impl NotificationQueue for BadBytesQueue {
    async fn pop(&self) -> QueueResult<Option<String>> {
        if self.served_bad_item.swap(true, Ordering::SeqCst) {
            return self.inner.pop().await;
        }
        let source = String::from_utf8(vec![b'{', 0xff, b'}']).unwrap_err();
        Err(QueueError::InvalidEncoding {
            key: "bad-bytes".to_string(),
            source,
            location: ErrorLocation::from(Location::caller()),
        })
    }

    async fn push(&self, item: String) -> QueueResult<()> {
        self.inner.push(item).await
    }

    fn name(&self) -> &str {
        "bad-bytes"
    }
}

fn config() -> DispatchConfig {
    DispatchConfig {
        poll_interval: Duration::from_millis(10),
        ..DispatchConfig::default()
    }
}

fn item(user_id: i64, payload: Value) -> String {
    json!({ "user_id": user_id, "payload": payload }).to_string()
}

#[tokio::test]
async fn given_one_item_when_loop_runs_then_delivered_exactly_once() {
    // Given
    let registry = registry();
    let (handle, mut rx) = open_handle(8);
    registry.connect(handle, UserId(7), None).await.unwrap();
    let queue = Arc::new(CountingQueue::with_items(vec![item(7, json!({"x": 1}))]));
    let shutdown = ShutdownCoordinator::new();
    let dispatch = DispatchLoop::new(queue.clone(), registry, config(), Metrics::new());

    // When
    let task = tokio::spawn(dispatch.run(shutdown.subscribe_guard()));
    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown.shutdown();
    tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("loop should stop on shutdown")
        .unwrap();

    // Then
    let texts = drain_texts(&mut rx);
    assert_eq!(texts.len(), 1);
    let frame: Value = serde_json::from_str(&texts[0]).unwrap();
    assert_eq!(frame, json!({"user_id": 7, "payload": {"x": 1}}));
    assert!(queue.pops.load(Ordering::SeqCst) >= 2);
}

#[tokio::test]
async fn given_malformed_item_when_dispatched_then_next_item_still_delivered() {
    // Given
    let registry = registry();
    let (handle, mut rx) = open_handle(8);
    registry.connect(handle, UserId(1), None).await.unwrap();
    let queue = Arc::new(MemoryQueue::with_items(vec![
        "not json".to_string(),
        json!({"payload": 1}).to_string(),
        item(1, json!("ok")),
    ]));
    let dispatch = DispatchLoop::new(queue, registry, config(), Metrics::new());

    // When
    let first = dispatch.dispatch_next().await;
    let second = dispatch.dispatch_next().await;
    let third = dispatch.dispatch_next().await;
    let fourth = dispatch.dispatch_next().await;

    // Then
    assert_eq!(first, DispatchStep::Malformed);
    assert_eq!(second, DispatchStep::Malformed);
    assert_eq!(
        third,
        DispatchStep::Dispatched {
            user_id: UserId(1),
            result: DeliveryResult::Delivered(1),
        }
    );
    assert_eq!(fourth, DispatchStep::Empty);
    assert_eq!(drain_texts(&mut rx).len(), 1);
}

#[tokio::test]
async fn given_offline_user_when_dispatched_then_item_consumed_without_delivery() {
    let queue = Arc::new(MemoryQueue::with_items(vec![item(3, json!(null))]));
    let dispatch = DispatchLoop::new(queue.clone(), registry(), config(), Metrics::new());

    let step = dispatch.dispatch_next().await;

    assert_eq!(
        step,
        DispatchStep::Dispatched {
            user_id: UserId(3),
            result: DeliveryResult::NoRecipient,
        }
    );
    assert!(queue.is_empty().await);
}

#[tokio::test]
async fn given_large_payload_when_dispatched_then_frame_is_bounded() {
    // Given
    let registry = registry();
    let (handle, mut rx) = open_handle(8);
    registry.connect(handle, UserId(2), None).await.unwrap();
    let items: Vec<u32> = (0..500).collect();
    let queue = Arc::new(MemoryQueue::with_items(vec![item(2, json!({"items": items}))]));
    let config = DispatchConfig {
        max_payload_length: 300,
        ..config()
    };
    let dispatch = DispatchLoop::new(queue, registry, config, Metrics::new());

    // When
    dispatch.dispatch_next().await;

    // Then
    let texts = drain_texts(&mut rx);
    assert_eq!(texts.len(), 1);
    assert!(texts[0].len() <= 300);
    let frame: Value = serde_json::from_str(&texts[0]).unwrap();
    assert_eq!(frame["user_id"], json!(2));
    assert!(frame["payload"]["items"].as_array().unwrap().len() < 500);
}

#[tokio::test]
async fn given_irreducible_frame_over_hard_limit_when_dispatched_then_dropped() {
    // Given
    let registry = registry();
    let (handle, mut rx) = open_handle(8);
    registry.connect(handle, UserId(4), None).await.unwrap();
    let queue = Arc::new(MemoryQueue::with_items(vec![item(4, json!("x".repeat(200)))]));
    let config = DispatchConfig {
        max_payload_length: 50,
        max_frame_length: 100,
        ..config()
    };
    let dispatch = DispatchLoop::new(queue, registry, config, Metrics::new());

    // When
    let step = dispatch.dispatch_next().await;

    // Then
    assert!(matches!(
        step,
        DispatchStep::Oversized { user_id: UserId(4), frame_length } if frame_length > 100
    ));
    assert!(drain_texts(&mut rx).is_empty());
}

#[tokio::test]
async fn given_failing_queue_when_loop_runs_then_keeps_polling_until_shutdown() {
    // Given
    let dispatch = DispatchLoop::new(Arc::new(BrokenQueue), registry(), config(), Metrics::new());
    let shutdown = ShutdownCoordinator::new();

    // When
    let step = dispatch.dispatch_next().await;
    let task = tokio::spawn(dispatch.run(shutdown.subscribe_guard()));
    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown.shutdown();

    // Then
    assert_eq!(step, DispatchStep::QueueFailed);
    assert!(step.should_back_off());
    tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("loop should stop on shutdown")
        .unwrap();
}

#[tokio::test]
async fn given_shutdown_before_start_when_run_then_returns_immediately() {
    let queue = Arc::new(CountingQueue::with_items(vec![item(1, json!(1))]));
    let dispatch = DispatchLoop::new(queue.clone(), registry(), config(), Metrics::new());
    let shutdown = ShutdownCoordinator::new();
    shutdown.shutdown();

    dispatch.run(shutdown.subscribe_guard()).await;

    assert_eq!(queue.pops.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn given_undecodable_item_when_dispatched_then_malformed_without_back_off() {
    // Given
    let registry = registry();
    let (handle, mut rx) = open_handle(8);
    registry.connect(handle, UserId(5), None).await.unwrap();
    let queue = Arc::new(BadBytesQueue {
        inner: MemoryQueue::with_items(vec![item(5, json!("after"))]),
        served_bad_item: AtomicBool::new(false),
    });
    let dispatch = DispatchLoop::new(queue, registry, config(), Metrics::new());

    // When
    let first = dispatch.dispatch_next().await;
    let second = dispatch.dispatch_next().await;

    // Then
    assert_eq!(first, DispatchStep::Malformed);
    assert!(!first.should_back_off());
    assert_eq!(
        second,
        DispatchStep::Dispatched {
            user_id: UserId(5),
            result: DeliveryResult::Delivered(1),
        }
    );
    assert_eq!(drain_texts(&mut rx).len(), 1);
}

#[tokio::test]
async fn given_camel_case_item_when_dispatched_then_frame_keeps_producer_key() {
    // Given
    let registry = registry();
    let (handle, mut rx) = open_handle(8);
    registry.connect(handle, UserId(7), None).await.unwrap();
    let raw = json!({"userId": 7, "payload": {"x": 1}, "kind": "note"}).to_string();
    let queue = Arc::new(MemoryQueue::with_items(vec![raw]));
    let dispatch = DispatchLoop::new(queue, registry, config(), Metrics::new());

    // When
    dispatch.dispatch_next().await;

    // Then
    assert_eq!(
        drain_texts(&mut rx),
        vec![r#"{"userId":7,"payload":{"x":1},"kind":"note"}"#]
    );
}

#[test]
fn given_dropped_items_when_dispatched_then_latency_recorded_only_for_delivery() {
    // Given
    let recorder = PrometheusBuilder::new().build_recorder();
    let metrics_handle = recorder.handle();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let queue = Arc::new(MemoryQueue::with_items(vec![
        "not json".to_string(),
        item(4, json!("x".repeat(200))),
        item(4, json!("ok")),
    ]));
    let config = DispatchConfig {
        max_payload_length: 50,
        max_frame_length: 100,
        ..config()
    };
    let dispatch = DispatchLoop::new(queue, registry(), config, Metrics::new());

    // When
    let (dropped, rendered_after_drops, delivered, rendered_after_delivery) =
        ::metrics::with_local_recorder(&recorder, || {
            runtime.block_on(async {
                let dropped = vec![dispatch.dispatch_next().await, dispatch.dispatch_next().await];
                let rendered_after_drops = metrics_handle.render();
                let delivered = dispatch.dispatch_next().await;
                (dropped, rendered_after_drops, delivered, metrics_handle.render())
            })
        });

    // Then
    assert_eq!(dropped[0], DispatchStep::Malformed);
    assert!(matches!(dropped[1], DispatchStep::Oversized { .. }));
    assert!(rendered_after_drops.contains("notifications_dropped"));
    assert!(!rendered_after_drops.contains("dispatch_latency_ms"));

    assert!(matches!(delivered, DispatchStep::Dispatched { .. }));
    assert!(rendered_after_delivery.contains("dispatch_latency_ms"));
}
