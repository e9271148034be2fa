//! Per-auction mutual exclusion.
//!
//! Every mutation of one auction's bid set or status runs under that auction's lock, so two concurrent bid
//! submissions can never interleave inside a rank recompute. Different auctions are independent and proceed in
//! parallel. The sweep takes the same lock before touching an auction, so it serializes against live bid traffic
//! on a per-auction basis only.
use std::{
    collections::HashMap,
    sync::{Arc, Mutex as StdMutex},
    time::Duration,
};

use log::*;
use thiserror::Error;
use tokio::{
    sync::{Mutex, OwnedMutexGuard},
    time::{sleep, timeout},
};

use crate::db_types::AuctionId;

#[derive(Debug, Clone, Error)]
#[error("Auction {0} is busy. Try again.")]
pub struct LockBusy(pub AuctionId);

/// An in-process registry of one async mutex per auction id. Cloning shares the registry.
#[derive(Clone, Default)]
pub struct AuctionLocks {
    locks: Arc<StdMutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl AuctionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, auction_id: &AuctionId) -> Arc<Mutex<()>> {
        let mut map = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(map.entry(auction_id.as_str().to_string()).or_default())
    }

    /// Acquires the auction's lock, waiting at most `wait` per attempt over `attempts` attempts with doubling
    /// backoff in between. Surfaces [`LockBusy`] once the attempts are exhausted; callers treat that as a
    /// transient failure, never as a validation error.
    pub async fn acquire(
        &self,
        auction_id: &AuctionId,
        wait: Duration,
        attempts: u32,
    ) -> Result<OwnedMutexGuard<()>, LockBusy> {
        let lock = self.entry(auction_id);
        let mut backoff = Duration::from_millis(25);
        for attempt in 1..=attempts.max(1) {
            match timeout(wait, Arc::clone(&lock).lock_owned()).await {
                Ok(guard) => return Ok(guard),
                Err(_) => {
                    debug!("🔒️ Attempt {attempt} to lock auction {auction_id} timed out after {wait:?}");
                    sleep(backoff).await;
                    backoff *= 2;
                },
            }
        }
        warn!("🔒️ Could not lock auction {auction_id} after {attempts} attempts");
        Err(LockBusy(auction_id.clone()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn locks_are_per_auction() {
        let locks = AuctionLocks::new();
        let a = AuctionId::from("a");
        let b = AuctionId::from("b");
        let wait = Duration::from_millis(20);
        let _guard_a = locks.acquire(&a, wait, 1).await.unwrap();
        // A different auction is not blocked.
        let _guard_b = locks.acquire(&b, wait, 1).await.unwrap();
        // The same auction is.
        assert!(locks.acquire(&a, wait, 2).await.is_err());
    }

    #[tokio::test]
    async fn lock_is_released_with_the_guard() {
        let locks = AuctionLocks::new();
        let a = AuctionId::from("a");
        let wait = Duration::from_millis(20);
        {
            let _guard = locks.acquire(&a, wait, 1).await.unwrap();
        }
        assert!(locks.acquire(&a, wait, 1).await.is_ok());
    }
}
