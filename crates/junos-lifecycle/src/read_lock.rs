//! Process-wide serialization of reads.

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

/// Serializes device reads across dispatchers.
///
/// Clones share the same lock; hand one clone to every dispatcher that talks
/// to the same device.
#[derive(Debug, Clone, Default)]
pub struct ReadLock(Arc<Mutex<()>>);

/// Held while a read runs.
#[derive(Debug)]
pub struct ReadGuard<'a>(#[allow(dead_code)] MutexGuard<'a, ()>);

impl ReadLock {
    /// Creates a new, unshared lock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for the lock.
    pub async fn acquire(&self) -> ReadGuard<'_> {
        ReadGuard(self.0.lock().await)
    }

    /// Takes the lock if it is free.
    pub fn try_acquire(&self) -> Option<ReadGuard<'_>> {
        self.0.try_lock().ok().map(ReadGuard)
    }

    /// Returns true if a read holds the lock.
    pub fn is_held(&self) -> bool {
        self.0.try_lock().is_err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clones_share_lock() {
        let lock = ReadLock::new();
        let other = lock.clone();

        let guard = lock.acquire().await;
        assert!(other.is_held());
        assert!(other.try_acquire().is_none());

        drop(guard);
        assert!(!other.is_held());
        assert!(other.try_acquire().is_some());
    }

    #[tokio::test]
    async fn test_waiter_proceeds_after_release() {
        let lock = ReadLock::new();
        let guard = lock.acquire().await;

        let waiter = {
            let lock = lock.clone();
            tokio::spawn(async move {
                let _guard = lock.acquire().await;
            })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
    }
}
