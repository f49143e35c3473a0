//! In-process queue backend and the prefixing decorator.

use crate::error::StorageError;
use crate::storage::{prefixed, ConsumerFn, Message, QueueAdapter, PREFIX_KEY};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Per-stream buffer size of the runtime's built-in memory queue.
pub const DEFAULT_MEMORY_QUEUE_CAPACITY: usize = 10_000;

/// A failing message is handed back to its consumer at most this many extra times.
pub const MAX_REDELIVERIES: u32 = 3;

const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(1);

type ConsumerSlot = Arc<RwLock<Option<ConsumerFn>>>;

struct Stream {
    tx: mpsc::Sender<Message>,
    rx: Option<mpsc::Receiver<Message>>,
    consumer: ConsumerSlot,
    worker: Option<JoinHandle<()>>,
}

/// One bounded channel per stream, drained by a spawned task once a consumer registers.
/// `append` never waits: a stream holding `capacity` undelivered messages rejects
/// further ones with [`StorageError::QueueFull`].
///
/// [`QueueAdapter::register`] spawns onto the current Tokio runtime and must be called
/// from within one.
pub struct MemoryQueue {
    capacity: usize,
    retry_backoff: Duration,
    streams: Mutex<HashMap<String, Stream>>,
    closed: AtomicBool,
    stop_tx: watch::Sender<bool>,
}

impl MemoryQueue {
    pub fn new(capacity: usize) -> Self {
        let (stop_tx, _) = watch::channel(false);
        MemoryQueue {
            capacity: capacity.max(1),
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            streams: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
            stop_tx,
        }
    }

    /// Redelivery waits `backoff * attempt` before handing the message back.
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn streams(&self) -> MutexGuard<'_, HashMap<String, Stream>> {
        self.streams.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn stream_entry<'a>(streams: &'a mut HashMap<String, Stream>, name: &str, capacity: usize) -> &'a mut Stream {
        streams.entry(name.to_string()).or_insert_with(|| {
            let (tx, rx) = mpsc::channel(capacity);
            Stream {
                tx,
                rx: Some(rx),
                consumer: Arc::new(RwLock::new(None)),
                worker: None,
            }
        })
    }
}

impl Default for MemoryQueue {
    fn default() -> Self {
        MemoryQueue::new(DEFAULT_MEMORY_QUEUE_CAPACITY)
    }
}

async fn drain(stream: String, mut rx: mpsc::Receiver<Message>, slot: ConsumerSlot, backoff: Duration) {
    while let Some(mut message) = rx.recv().await {
        loop {
            let consumer = slot.read().unwrap_or_else(PoisonError::into_inner).clone();
            let Some(consumer) = consumer else { break };
            match consumer(message.clone()) {
                Ok(()) => break,
                Err(e) if message.error_count < MAX_REDELIVERIES => {
                    message.error_count += 1;
                    tracing::warn!(
                        stream = %stream,
                        id = %message.id,
                        attempt = message.error_count,
                        "consumer failed, redelivering: {}",
                        e
                    );
                    tokio::time::sleep(backoff * message.error_count).await;
                }
                Err(e) => {
                    tracing::error!(stream = %stream, id = %message.id, "message dropped: {}", e);
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl QueueAdapter for MemoryQueue {
    fn name(&self) -> &str {
        "memory"
    }

    async fn append(&self, mut message: Message) -> Result<(), StorageError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StorageError::QueueClosed(message.stream));
        }
        message.id = Uuid::new_v4().to_string();
        let tx = {
            let mut streams = self.streams();
            Self::stream_entry(&mut streams, &message.stream, self.capacity).tx.clone()
        };
        tx.try_send(message).map_err(|e| match e {
            mpsc::error::TrySendError::Full(m) => StorageError::QueueFull(m.stream),
            mpsc::error::TrySendError::Closed(m) => StorageError::QueueClosed(m.stream),
        })
    }

    fn register(&self, stream: &str, consumer: ConsumerFn) {
        let mut streams = self.streams();
        let entry = Self::stream_entry(&mut streams, stream, self.capacity);
        *entry.consumer.write().unwrap_or_else(PoisonError::into_inner) = Some(consumer);
        if let Some(rx) = entry.rx.take() {
            let worker = tokio::spawn(drain(
                stream.to_string(),
                rx,
                entry.consumer.clone(),
                self.retry_backoff,
            ));
            entry.worker = Some(worker);
        }
    }

    async fn run(&self) {
        let mut stop_rx = self.stop_tx.subscribe();
        let _ = stop_rx.wait_for(|stopped| *stopped).await;
    }

    async fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
        for (_, stream) in self.streams().drain() {
            if let Some(worker) = stream.worker {
                worker.abort();
            }
        }
        self.stop_tx.send_replace(true);
    }
}

/// View over a shared queue: stream `s` becomes `prefix:s` on both sides and
/// appended payloads carry the prefix under [`PREFIX_KEY`]. Consumers see `s`.
///
/// `run` and `shutdown` act on the shared backend.
#[derive(Clone)]
pub struct PrefixQueue {
    prefix: String,
    inner: Arc<dyn QueueAdapter>,
}

impl PrefixQueue {
    pub fn new(prefix: impl Into<String>, inner: Arc<dyn QueueAdapter>) -> Self {
        PrefixQueue {
            prefix: prefix.into(),
            inner,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

#[async_trait]
impl QueueAdapter for PrefixQueue {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn append(&self, mut message: Message) -> Result<(), StorageError> {
        message
            .values
            .insert(PREFIX_KEY.to_string(), Value::String(self.prefix.clone()));
        message.stream = prefixed(&self.prefix, &message.stream);
        self.inner.append(message).await
    }

    fn register(&self, stream: &str, consumer: ConsumerFn) {
        let head = prefixed(&self.prefix, "");
        let wrapped: ConsumerFn = Arc::new(move |mut message: Message| {
            if let Some(rest) = message.stream.strip_prefix(head.as_str()) {
                message.stream = rest.to_string();
            }
            consumer(message)
        });
        self.inner.register(&prefixed(&self.prefix, stream), wrapped);
    }

    async fn run(&self) {
        self.inner.run().await
    }

    async fn shutdown(&self) {
        self.inner.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;
    use std::sync::atomic::AtomicU32;
    use tokio::sync::mpsc::unbounded_channel;
    use tokio::time::timeout;

    fn collect_into(tx: mpsc::UnboundedSender<Message>) -> ConsumerFn {
        Arc::new(move |m: Message| {
            let _ = tx.send(m);
            Ok(())
        })
    }

    fn payload(key: &str, value: &str) -> Map<String, Value> {
        let mut values = Map::new();
        values.insert(key.to_string(), Value::String(value.to_string()));
        values
    }

    #[tokio::test]
    async fn delivers_with_fresh_id() {
        let queue = MemoryQueue::new(8);
        let (tx, mut rx) = unbounded_channel();
        queue.register("jobs", collect_into(tx));
        queue
            .append(Message::new("caller-id", "jobs", payload("k", "v")))
            .await
            .unwrap();

        let got = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
        assert_eq!(got.stream, "jobs");
        assert_eq!(got.values["k"], Value::String("v".into()));
        assert!(Uuid::parse_str(&got.id).is_ok());
    }

    #[tokio::test]
    async fn failing_consumer_is_retried_then_dropped() {
        let queue = MemoryQueue::new(8).with_retry_backoff(Duration::from_millis(1));
        let calls = Arc::new(AtomicU32::new(0));
        let seen = calls.clone();
        queue.register(
            "jobs",
            Arc::new(move |_m: Message| {
                seen.fetch_add(1, Ordering::SeqCst);
                Err(StorageError::Consumer("nope".into()))
            }),
        );
        queue.append(Message::new("", "jobs", Map::new())).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1 + MAX_REDELIVERIES);
    }

    #[tokio::test]
    async fn prefixed_views_never_see_each_other() {
        let shared: Arc<dyn QueueAdapter> = Arc::new(MemoryQueue::new(8));
        let x = PrefixQueue::new("tenantX", shared.clone());
        let y = PrefixQueue::new("tenantY", shared.clone());
        let (x_tx, mut x_rx) = unbounded_channel();
        let (y_tx, mut y_rx) = unbounded_channel();
        x.register("orders", collect_into(x_tx));
        y.register("orders", collect_into(y_tx));

        x.append(Message::new("", "orders", payload("order", "1"))).await.unwrap();

        let got = timeout(Duration::from_secs(1), x_rx.recv()).await.unwrap().unwrap();
        assert_eq!(got.stream, "orders");
        assert_eq!(got.prefix(), Some("tenantX"));
        assert!(timeout(Duration::from_millis(50), y_rx.recv()).await.is_err());
    }

    #[tokio::test]
    async fn full_stream_without_consumer_rejects_instead_of_blocking() {
        let queue = MemoryQueue::new(2);
        for _ in 0..2 {
            queue.append(Message::new("", "idle", Map::new())).await.unwrap();
        }
        let err = timeout(Duration::from_secs(1), queue.append(Message::new("", "idle", Map::new())))
            .await
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, StorageError::QueueFull(ref s) if s == "idle"));

        // other streams are unaffected
        queue.append(Message::new("", "busy", Map::new())).await.unwrap();

        let (tx, mut rx) = unbounded_channel();
        queue.register("idle", collect_into(tx));
        for _ in 0..2 {
            timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
        }
    }

    #[tokio::test]
    async fn shutdown_releases_run_and_closes_appends() {
        let queue = Arc::new(MemoryQueue::new(4));
        let runner = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.run().await })
        };
        queue.shutdown().await;
        timeout(Duration::from_secs(1), runner).await.unwrap().unwrap();
        let err = queue.append(Message::new("", "jobs", Map::new())).await.unwrap_err();
        assert!(matches!(err, StorageError::QueueClosed(_)));
    }
}
