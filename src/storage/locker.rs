//! In-process lock backend.

use crate::error::StorageError;
use crate::storage::LockerAdapter;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Proof of ownership returned by [`LockerAdapter::lock`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lease {
    pub key: String,
    pub token: Uuid,
    pub ttl: Duration,
}

struct Held {
    token: Uuid,
    expires_at: Instant,
}

/// One unexpired lease per key. Expired leases may be taken over.
#[derive(Default)]
pub struct MemoryLocker {
    held: Mutex<HashMap<String, Held>>,
}

impl MemoryLocker {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LockerAdapter for MemoryLocker {
    fn name(&self) -> &str {
        "memory"
    }

    async fn lock(&self, key: &str, ttl: Duration) -> Result<Lease, StorageError> {
        let now = Instant::now();
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        if held.get(key).is_some_and(|h| h.expires_at > now) {
            return Err(StorageError::LockNotObtained(key.to_string()));
        }
        let token = Uuid::new_v4();
        held.insert(
            key.to_string(),
            Held {
                token,
                expires_at: now + ttl,
            },
        );
        Ok(Lease {
            key: key.to_string(),
            token,
            ttl,
        })
    }

    async fn unlock(&self, lease: &Lease) -> Result<(), StorageError> {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        match held.get(&lease.key) {
            Some(h) if h.token == lease.token => {
                held.remove(&lease.key);
                Ok(())
            }
            _ => Err(StorageError::LeaseLost(lease.key.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_lock_fails_until_unlocked() {
        let locker = MemoryLocker::new();
        let lease = locker.lock("job", Duration::from_secs(5)).await.unwrap();
        assert!(matches!(
            locker.lock("job", Duration::from_secs(5)).await,
            Err(StorageError::LockNotObtained(_))
        ));
        locker.unlock(&lease).await.unwrap();
        assert!(locker.lock("job", Duration::from_secs(5)).await.is_ok());
    }

    #[tokio::test]
    async fn expired_lease_can_be_taken_over() {
        let locker = MemoryLocker::new();
        let stale = locker.lock("job", Duration::from_millis(5)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let fresh = locker.lock("job", Duration::from_secs(5)).await.unwrap();
        assert_ne!(stale.token, fresh.token);
        assert!(matches!(locker.unlock(&stale).await, Err(StorageError::LeaseLost(_))));
        locker.unlock(&fresh).await.unwrap();
    }
}
