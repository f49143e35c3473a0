//! Storage adapter contracts the runtime hands out per tenant: cache, queue, lock.
//!
//! Backends (Redis, in-memory, ...) implement the traits; the runtime only stores
//! `Arc<dyn ...>` handles and decorates them with key prefixes on read.

pub mod cache;
pub mod locker;
pub mod queue;

pub use cache::{MemoryCache, PrefixCache};
pub use locker::{Lease, MemoryLocker};
pub use queue::{MemoryQueue, PrefixQueue, DEFAULT_MEMORY_QUEUE_CAPACITY, MAX_REDELIVERIES};

use crate::error::StorageError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

/// Payload key under which [`PrefixQueue`] records its prefix.
pub const PREFIX_KEY: &str = "__prefix";

/// Queue message: id, stream name and a JSON object payload.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub stream: String,
    pub values: Map<String, Value>,
    #[serde(default)]
    pub error_count: u32,
}

impl Message {
    pub fn new(id: impl Into<String>, stream: impl Into<String>, values: Map<String, Value>) -> Self {
        Message {
            id: id.into(),
            stream: stream.into(),
            values,
            error_count: 0,
        }
    }

    /// Prefix stamped by [`PrefixQueue`], if any.
    pub fn prefix(&self) -> Option<&str> {
        self.values.get(PREFIX_KEY).and_then(Value::as_str)
    }
}

/// Consumer callback. An `Err` asks the queue to redeliver.
pub type ConsumerFn = Arc<dyn Fn(Message) -> Result<(), StorageError> + Send + Sync>;

#[async_trait]
pub trait CacheAdapter: Send + Sync {
    fn name(&self) -> &str;
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    /// `ttl` of `None` keeps the value until deleted.
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), StorageError>;
    async fn del(&self, key: &str) -> Result<(), StorageError>;
    /// Missing keys count as zero. Returns the new value.
    async fn increase(&self, key: &str) -> Result<i64, StorageError>;
    async fn decrease(&self, key: &str) -> Result<i64, StorageError>;
    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StorageError>;
}

#[async_trait]
pub trait QueueAdapter: Send + Sync {
    fn name(&self) -> &str;
    /// Enqueue without waiting for a consumer. Backends with bounded buffers return
    /// [`StorageError::QueueFull`] rather than blocking.
    async fn append(&self, message: Message) -> Result<(), StorageError>;
    /// Start delivering messages of `stream` to `consumer`. Replaces an earlier consumer.
    fn register(&self, stream: &str, consumer: ConsumerFn);
    /// Resolves once [`QueueAdapter::shutdown`] is called.
    async fn run(&self);
    async fn shutdown(&self);
}

#[async_trait]
pub trait LockerAdapter: Send + Sync {
    fn name(&self) -> &str;
    async fn lock(&self, key: &str, ttl: Duration) -> Result<Lease, StorageError>;
    async fn unlock(&self, lease: &Lease) -> Result<(), StorageError>;
}

/// `prefix:key`, or `key` untouched when the prefix is empty.
pub(crate) fn prefixed(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}:{}", prefix, key)
    }
}
