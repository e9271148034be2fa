use std::{fmt::Debug, sync::Arc};

use chrono::{DateTime, Utc};
use log::*;
use tokio::sync::Mutex;

use crate::{
    db_types::{Auction, AuctionId, AuctionStatus, DepositStatus},
    events::{AuctionClosedEvent, CloseReason, DepositForfeitedEvent, DepositWarningEvent, EventProducers},
    helpers::AuctionLocks,
    rae_api::{AuctionEngineError, EngineConfig},
    traits::{AuctionStore, ForfeitureSplit, SweepResult},
};

/// The periodic batch entrypoint, meant to be invoked on a fixed schedule (hourly is plenty).
///
/// One pass closes `Active` auctions whose deadline has gone by, sends the one-time forfeiture warning for
/// escrowed deposits whose buyer has been idle for 48 hours, and forfeits deposits idle for 72 hours. Each pass is
/// idempotent: reruns warn no one twice and never re-forfeit.
///
/// A pass never runs concurrently with another pass ([`Self::try_run_sweep`] skips when one is in flight), but runs
/// happily alongside live bid traffic: every auction it mutates is taken under the same per-auction lock the flow
/// API uses. One misbehaving auction is logged, reported in [`SweepResult::errors`] and skipped; it never stops
/// the rest of the pass.
pub struct SweepApi<B> {
    db: B,
    producers: EventProducers,
    locks: AuctionLocks,
    config: EngineConfig,
    gate: Arc<Mutex<()>>,
}

impl<B> Debug for SweepApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SweepApi")
    }
}

impl<B> SweepApi<B> {
    /// `locks` must be the same registry the [`crate::AuctionFlowApi`] over this store uses, or the sweep and bid
    /// traffic will not serialize against each other.
    pub fn new(db: B, producers: EventProducers, locks: AuctionLocks) -> Self {
        Self { db, producers, locks, config: EngineConfig::default(), gate: Arc::new(Mutex::new(())) }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }
}

impl<B> SweepApi<B>
where B: AuctionStore
{
    /// Runs one sweep pass, waiting first for any pass already in flight to finish.
    pub async fn run_sweep(&self) -> Result<SweepResult, AuctionEngineError> {
        let _pass = self.gate.lock().await;
        self.sweep_once().await
    }

    /// Runs one sweep pass, or returns `None` without doing anything if a pass is already in flight. This is the
    /// entrypoint for a scheduled tick: overlapping passes are skipped, never queued up.
    pub async fn try_run_sweep(&self) -> Option<Result<SweepResult, AuctionEngineError>> {
        match self.gate.try_lock() {
            Ok(_pass) => Some(self.sweep_once().await),
            Err(_) => {
                info!("🧹️ A sweep pass is already running; skipping this tick");
                None
            },
        }
    }

    async fn sweep_once(&self) -> Result<SweepResult, AuctionEngineError> {
        let now = Utc::now();
        let mut result = SweepResult::default();

        // Pass 1: the deadline has gone by; bidding ends.
        let expired = self.db.expired_active_auctions(now).await?;
        trace!("🧹️ {} auction(s) past their deadline", expired.len());
        for auction in expired {
            match self.close_expired(&auction, now).await {
                Ok(true) => result.closed.push(auction.auction_id.clone()),
                Ok(false) => {},
                Err(e) => {
                    warn!("🧹️ Failed to close expired auction {}: {e}. Skipping.", auction.auction_id);
                    result.errors.push(auction.auction_id.clone());
                },
            }
        }

        // Pass 2: buyers idle for 48h (but less than 72h) get the one-time warning.
        let warn_before = now - self.config.warning_after;
        let forfeit_before = now - self.config.forfeit_after;
        let candidates = self.db.forfeiture_candidates(warn_before, Some(forfeit_before)).await?;
        for auction in candidates {
            match self.warn_buyer(&auction).await {
                Ok(true) => result.warned.push(auction.auction_id.clone()),
                Ok(false) => {},
                Err(e) => {
                    warn!("🧹️ Failed to warn the buyer of auction {}: {e}. Skipping.", auction.auction_id);
                    result.errors.push(auction.auction_id.clone());
                },
            }
        }

        // Pass 3: buyers idle for 72h forfeit the deposit.
        let overdue = self.db.forfeiture_candidates(forfeit_before, None).await?;
        for auction in overdue {
            match self.forfeit(&auction).await {
                Ok(true) => result.forfeited.push(auction.auction_id.clone()),
                Ok(false) => {},
                Err(e) => {
                    warn!("🧹️ Failed to forfeit the deposit of auction {}: {e}. Skipping.", auction.auction_id);
                    result.errors.push(auction.auction_id.clone());
                },
            }
        }

        info!(
            "🧹️ Sweep complete: {} closed, {} warned, {} forfeited, {} error(s)",
            result.closed_count(),
            result.warned_count(),
            result.forfeited_count(),
            result.error_count()
        );
        Ok(result)
    }

    /// `Active → Closed` once the deadline is in the past. Re-checks under the auction's lock, since a soft-close
    /// extension may have moved the deadline since the selection query ran.
    async fn close_expired(&self, auction: &Auction, now: DateTime<Utc>) -> Result<bool, AuctionEngineError> {
        let _guard =
            self.locks.acquire(&auction.auction_id, self.config.lock_wait, self.config.lock_attempts).await?;
        let fresh = self.fetch_required(&auction.auction_id).await?;
        if fresh.status != AuctionStatus::Active || fresh.deadline > now {
            return Ok(false);
        }
        let closed = self.db.update_auction_status(&fresh.auction_id, AuctionStatus::Closed).await?;
        info!("🧹️ Auction {} closed: deadline reached", closed.auction_id);
        self.emit_closed(&closed).await;
        Ok(true)
    }

    /// Emits the one-time forfeiture warning. The guard record in the store keeps repeated sweeps from warning
    /// twice, so this is safe to re-run.
    async fn warn_buyer(&self, auction: &Auction) -> Result<bool, AuctionEngineError> {
        let newly_recorded = self.db.record_forfeiture_warning(&auction.auction_id).await?;
        if !newly_recorded {
            return Ok(false);
        }
        let closed_at = auction.closed_at.ok_or_else(|| {
            AuctionEngineError::InvalidAuction(format!("closed auction {} has no closed_at", auction.auction_id))
        })?;
        let forfeit_at = closed_at + self.config.forfeit_after;
        info!("🧹️ Warning the buyer of auction {}: deposit forfeits at {forfeit_at}", auction.auction_id);
        for producer in &self.producers.deposit_warning_producer {
            producer.publish_event(DepositWarningEvent { auction: auction.clone(), forfeit_at }).await;
        }
        Ok(true)
    }

    /// Applies the 72h forfeiture: deposit split between the platform and the top two bidders, auction abandoned.
    /// An auction with no bids at all is left untouched; that failure mode is not settled by this path.
    async fn forfeit(&self, auction: &Auction) -> Result<bool, AuctionEngineError> {
        let _guard =
            self.locks.acquire(&auction.auction_id, self.config.lock_wait, self.config.lock_attempts).await?;
        let fresh = self.fetch_required(&auction.auction_id).await?;
        if fresh.status != AuctionStatus::Closed
            || fresh.winner_bid_id.is_some()
            || fresh.deposit_status != DepositStatus::Escrowed
        {
            // The buyer acted (or another pass got here first) between selection and locking.
            return Ok(false);
        }
        let deposit = self
            .db
            .fetch_deposit(&fresh.auction_id)
            .await?
            .ok_or_else(|| AuctionEngineError::DepositMissing(fresh.auction_id.clone()))?;
        let bids = self.db.fetch_bids(&fresh.auction_id).await?;
        let split = match ForfeitureSplit::compute(deposit.amount, &bids) {
            Some(split) => split,
            None => {
                debug!("🧹️ Auction {} has no bids; leaving it out of forfeiture", fresh.auction_id);
                return Ok(false);
            },
        };
        let (abandoned, _) = self.db.apply_forfeiture(&fresh.auction_id).await?;
        info!(
            "🧹️ Deposit of {} for auction {} forfeited: {} to the platform, {} to bidders",
            split.deposit,
            fresh.auction_id,
            split.platform_fee,
            split.total_to_bidders()
        );
        for producer in &self.producers.deposit_forfeited_producer {
            producer.publish_event(DepositForfeitedEvent { auction: abandoned.clone(), split: split.clone() }).await;
        }
        Ok(true)
    }

    async fn fetch_required(&self, auction_id: &AuctionId) -> Result<Auction, AuctionEngineError> {
        self.db
            .fetch_auction(auction_id)
            .await?
            .ok_or_else(|| AuctionEngineError::AuctionNotFound(auction_id.clone()))
    }

    async fn emit_closed(&self, auction: &Auction) {
        let invited = match self.db.fetch_invitations(&auction.auction_id).await {
            Ok(invitations) => invitations.into_iter().map(|i| i.supplier_id).collect(),
            Err(e) => {
                error!("🔔️ Could not load invitations for the close notification of {}: {e}", auction.auction_id);
                Vec::new()
            },
        };
        for producer in &self.producers.auction_closed_producer {
            let event = AuctionClosedEvent {
                auction: auction.clone(),
                reason: CloseReason::DeadlineReached,
                invited_suppliers: invited.clone(),
            };
            producer.publish_event(event).await;
        }
    }
}
