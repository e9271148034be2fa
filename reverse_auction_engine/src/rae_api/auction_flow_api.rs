use std::{fmt::Debug, future::Future};

use chrono::Utc;
use log::*;
use rae_common::Rial;
use tokio::time::timeout;

use crate::{
    db_types::{Auction, AuctionId, AuctionStatus, AuctionStyle, Bid, DepositPayment, DepositStatus, Invitation, InvitationSource, NewAuction},
    events::{AuctionClosedEvent, AuctionPublishedEvent, AuctionReviewedEvent, BidReceivedEvent, CloseReason, EventProducers},
    helpers::AuctionLocks,
    rae_api::{ranking, rules, AuctionEngineError, EngineConfig},
    traits::{AuctionStore, BidReceipt, DepositUpdate, GatewayError, PaymentGateway, PaymentVerification},
};

/// `AuctionFlowApi` drives the auction state machine in response to buyer, supplier, admin and gateway events.
///
/// Every mutation of a single auction runs under that auction's lock (see [`AuctionLocks`]), spanning validation,
/// the write, the rank recompute and the soft-close check as one critical section. State is always read fresh under
/// the lock; nothing is cached across calls.
///
/// Transitions are idempotent: re-applying a transition that has already happened is an Ok no-op, never an error,
/// because the sweep and gateway callbacks may be delivered more than once.
pub struct AuctionFlowApi<B> {
    db: B,
    producers: EventProducers,
    locks: AuctionLocks,
    config: EngineConfig,
}

impl<B> Debug for AuctionFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AuctionFlowApi")
    }
}

impl<B> AuctionFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers, locks: AuctionLocks::new(), config: EngineConfig::default() }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// The lock registry, for sharing with a [`crate::SweepApi`] over the same store.
    pub fn locks(&self) -> AuctionLocks {
        self.locks.clone()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}

impl<B> AuctionFlowApi<B>
where B: AuctionStore
{
    //---------------------------------------- Lifecycle -------------------------------------------------------------

    /// Stores a new sourcing request in `Draft`. A request with a deposit amount is a "verified" request: the 1:1
    /// deposit record is created alongside, in `Unpaid`. Idempotent on the public auction id.
    pub async fn create_auction(&self, auction: NewAuction) -> Result<Auction, AuctionEngineError> {
        if let (Some(reserve), starting) = (auction.reserve_price, auction.starting_price) {
            if reserve >= starting {
                return Err(AuctionEngineError::InvalidAuction(format!(
                    "reserve price {reserve} must be below the starting price {starting}"
                )));
            }
        }
        if let Some(deposit) = auction.deposit {
            if deposit.value() <= 0 {
                return Err(AuctionEngineError::InvalidAuction(format!("deposit amount {deposit} must be positive")));
            }
        }
        let deposit = auction.deposit;
        let (stored, created) = self.db.insert_auction(auction).await?;
        if created {
            debug!("🏷️ Auction {} created in Draft for buyer {}", stored.auction_id, stored.buyer_id);
            if let Some(amount) = deposit {
                self.db.create_deposit(&stored.auction_id, amount).await?;
                debug!("🏷️ Deposit of {amount} attached to auction {}", stored.auction_id);
            }
        }
        Ok(stored)
    }

    /// Buyer submits the draft for admin review. Requires a description, and (for verified requests) the deposit
    /// record. `Draft → PendingReview`.
    pub async fn submit_for_review(
        &self,
        auction_id: &AuctionId,
        buyer_id: &str,
    ) -> Result<Auction, AuctionEngineError> {
        let _guard = self.lock(auction_id).await?;
        let auction = self.fetch_required(auction_id).await?;
        self.assert_buyer(&auction, buyer_id)?;
        match auction.status {
            AuctionStatus::PendingReview => Ok(auction),
            AuctionStatus::Draft => {
                if auction.description.as_deref().map(str::trim).unwrap_or("").is_empty() {
                    return Err(AuctionEngineError::IncompleteDraft(
                        auction.auction_id.clone(),
                        "a description is required".into(),
                    ));
                }
                if auction.requires_deposit() && self.db.fetch_deposit(auction_id).await?.is_none() {
                    return Err(AuctionEngineError::IncompleteDraft(
                        auction.auction_id.clone(),
                        "a verified request needs its deposit record".into(),
                    ));
                }
                let updated = self.db.update_auction_status(auction_id, AuctionStatus::PendingReview).await?;
                info!("🏷️ Auction {auction_id} submitted for review");
                Ok(updated)
            },
            from => Err(AuctionEngineError::InvalidTransition { from, attempted: "submit for review" }),
        }
    }

    /// Admin approval. `PendingReview → Approved`, and straight on to `Active` when no deposit is required or the
    /// deposit is already in escrow.
    pub async fn approve(&self, auction_id: &AuctionId) -> Result<Auction, AuctionEngineError> {
        let _guard = self.lock(auction_id).await?;
        let auction = self.fetch_required(auction_id).await?;
        match auction.status {
            AuctionStatus::Approved | AuctionStatus::Active => Ok(auction),
            AuctionStatus::PendingReview => {
                let approved = self.db.update_auction_status(auction_id, AuctionStatus::Approved).await?;
                info!("🏷️ Auction {auction_id} approved");
                self.emit_reviewed(&approved, true, None).await;
                let deposit_held = approved.deposit_status == DepositStatus::Escrowed;
                if !approved.requires_deposit() || deposit_held {
                    self.activate(&approved).await
                } else {
                    Ok(approved)
                }
            },
            from => Err(AuctionEngineError::InvalidTransition { from, attempted: "approve" }),
        }
    }

    /// Admin rejection. `PendingReview → Rejected` (terminal).
    pub async fn reject(&self, auction_id: &AuctionId, reason: &str) -> Result<Auction, AuctionEngineError> {
        let _guard = self.lock(auction_id).await?;
        let auction = self.fetch_required(auction_id).await?;
        match auction.status {
            AuctionStatus::Rejected => Ok(auction),
            AuctionStatus::PendingReview => {
                let rejected = self.db.update_auction_status(auction_id, AuctionStatus::Rejected).await?;
                info!("🏷️ Auction {auction_id} rejected: {reason}");
                self.emit_reviewed(&rejected, false, Some(reason)).await;
                Ok(rejected)
            },
            from => Err(AuctionEngineError::InvalidTransition { from, attempted: "reject" }),
        }
    }

    /// `Approved → Active`: open for bids, auto-invite the category's suppliers, announce to everyone invited.
    /// Callers hold the auction's lock.
    async fn activate(&self, auction: &Auction) -> Result<Auction, AuctionEngineError> {
        let active = self.db.update_auction_status(&auction.auction_id, AuctionStatus::Active).await?;
        let newly_invited = self.run_auto_invite(&active).await?;
        debug!("🏷️ Auction {} activated with {} auto-invited suppliers", active.auction_id, newly_invited.len());
        let invited = self.invited_suppliers(&active.auction_id).await?;
        self.emit_published(&active, invited).await;
        self.db.mark_invitations_notified(&active.auction_id).await?;
        Ok(active)
    }

    //--------------------------------------- Invitations ------------------------------------------------------------

    /// Invites every supplier with an active listing in the auction's category. Idempotent; returns only the
    /// suppliers that were newly invited by this call. Invitations are never revoked, even if a supplier later
    /// loses catalog eligibility.
    pub async fn auto_invite(&self, auction_id: &AuctionId) -> Result<Vec<String>, AuctionEngineError> {
        let auction = self.fetch_required(auction_id).await?;
        self.run_auto_invite(&auction).await
    }

    async fn run_auto_invite(&self, auction: &Auction) -> Result<Vec<String>, AuctionEngineError> {
        let suppliers = self.db.suppliers_in_category(&auction.category_id).await?;
        let mut newly_invited = Vec::new();
        for supplier_id in suppliers {
            let (_, created) =
                self.db.insert_invitation(&auction.auction_id, &supplier_id, InvitationSource::Auto).await?;
            if created {
                newly_invited.push(supplier_id);
            }
        }
        Ok(newly_invited)
    }

    /// Manual invitation by the buyer. Idempotent; the second element is `false` if the supplier was already
    /// invited.
    pub async fn invite(
        &self,
        auction_id: &AuctionId,
        buyer_id: &str,
        supplier_id: &str,
    ) -> Result<(Invitation, bool), AuctionEngineError> {
        let auction = self.fetch_required(auction_id).await?;
        self.assert_buyer(&auction, buyer_id)?;
        let result = self.db.insert_invitation(auction_id, supplier_id, InvitationSource::Manual).await?;
        Ok(result)
    }

    pub async fn is_invited(&self, auction_id: &AuctionId, supplier_id: &str) -> Result<bool, AuctionEngineError> {
        Ok(self.db.is_invited(auction_id, supplier_id).await?)
    }

    /// Records that the supplier opened the auction. First view wins; later calls are no-ops.
    pub async fn mark_invitation_viewed(
        &self,
        auction_id: &AuctionId,
        supplier_id: &str,
    ) -> Result<(), AuctionEngineError> {
        Ok(self.db.mark_invitation_viewed(auction_id, supplier_id).await?)
    }

    //------------------------------------------- Bids ---------------------------------------------------------------

    /// Submits (or replaces) the supplier's bid.
    ///
    /// Validation is fail-fast in the order documented on [`rules::validate_bid`]. On acceptance the bid is
    /// upserted, all ranks are recomputed, and (for `LiveReverse` auctions) a bid inside the soft-close window
    /// pushes the deadline out, up to the extension cap. The buyer is notified; other suppliers are not, because
    /// bids are sealed.
    pub async fn submit_bid(
        &self,
        auction_id: &AuctionId,
        supplier_id: &str,
        price: Rial,
        notes: Option<String>,
    ) -> Result<BidReceipt, AuctionEngineError> {
        let _guard = self.lock(auction_id).await?;
        let auction = self.fetch_required(auction_id).await?;
        let now = Utc::now();
        let invited = self.db.is_invited(auction_id, supplier_id).await?;
        let prior = self.db.fetch_bid_for_supplier(auction_id, supplier_id).await?;
        rules::validate_bid(&auction, prior.as_ref(), invited, price, now)?;
        let bid = self.db.upsert_bid(auction_id, supplier_id, price, notes).await?;
        trace!("🔨️ Bid of {price} by {supplier_id} accepted on auction {auction_id}");

        let bids = self.db.fetch_bids(auction_id).await?;
        let ranks = ranking::assign_ranks(&bids);
        self.db.write_ranks(auction_id, &ranks).await?;

        let mut receipt = BidReceipt::new(self.require_bid(bid.id).await?);
        if auction.style == AuctionStyle::LiveReverse
            && auction.time_remaining(now) <= self.config.soft_close_window
            && auction.extension_count < self.config.max_extensions
        {
            let new_deadline = auction.deadline + self.config.extension_amount;
            let extended =
                self.db.extend_deadline(auction_id, new_deadline, auction.extension_count + 1).await?;
            info!(
                "🔨️ Soft close: auction {auction_id} extended to {new_deadline} (extension {} of {})",
                extended.extension_count, self.config.max_extensions
            );
            receipt = receipt.with_extension(new_deadline);
        }
        let auction = self.fetch_required(auction_id).await?;
        debug!(
            "🔨️ Auction {auction_id} now has {} bid(s); best price {}",
            bids.len(),
            bids.first().map(|b| b.price).unwrap_or(auction.starting_price)
        );
        self.emit_bid_received(&auction, &receipt.bid).await;
        Ok(receipt)
    }

    /// All bids on the auction in rank order. Buyer-only: bids are sealed from the other suppliers.
    pub async fn bids_for_buyer(
        &self,
        auction_id: &AuctionId,
        buyer_id: &str,
    ) -> Result<Vec<Bid>, AuctionEngineError> {
        let auction = self.fetch_required(auction_id).await?;
        self.assert_buyer(&auction, buyer_id)?;
        Ok(self.db.fetch_bids(auction_id).await?)
    }

    /// The supplier's own current bid, if any. Requires an invitation.
    pub async fn bid_for_supplier(
        &self,
        auction_id: &AuctionId,
        supplier_id: &str,
    ) -> Result<Option<Bid>, AuctionEngineError> {
        if !self.db.is_invited(auction_id, supplier_id).await? {
            return Err(AuctionEngineError::NotAuthorized(format!(
                "supplier {supplier_id} is not invited to auction {auction_id}"
            )));
        }
        Ok(self.db.fetch_bid_for_supplier(auction_id, supplier_id).await?)
    }

    //---------------------------------------- Closing ---------------------------------------------------------------

    /// Buyer accepts a bid. On an `Active` auction this closes early (subject to the early-close guard) and awards
    /// in one step; on a `Closed` auction it picks the winner. An escrowed deposit is refunded: the buyer acted.
    pub async fn accept_bid(
        &self,
        auction_id: &AuctionId,
        buyer_id: &str,
        bid_id: i64,
    ) -> Result<Auction, AuctionEngineError> {
        let _guard = self.lock(auction_id).await?;
        let auction = self.fetch_required(auction_id).await?;
        self.assert_buyer(&auction, buyer_id)?;
        if auction.status == AuctionStatus::Awarded && auction.winner_bid_id == Some(bid_id) {
            return Ok(auction);
        }
        match auction.status {
            AuctionStatus::Active => {
                self.assert_early_close_allowed(&auction)?;
                self.require_bid_on(&auction, bid_id).await?;
                self.db.update_auction_status(auction_id, AuctionStatus::Closed).await?;
                self.finish_award(&auction, bid_id, CloseReason::BidAccepted).await
            },
            AuctionStatus::Closed => {
                self.require_bid_on(&auction, bid_id).await?;
                self.finish_award(&auction, bid_id, CloseReason::BidAccepted).await
            },
            from => Err(AuctionEngineError::InvalidTransition { from, attempted: "accept a bid on" }),
        }
    }

    /// Buyer cancels bidding without picking a winner. `Active → Closed`; the deposit stays in escrow and the
    /// grace window starts running.
    pub async fn close_early(&self, auction_id: &AuctionId, buyer_id: &str) -> Result<Auction, AuctionEngineError> {
        let _guard = self.lock(auction_id).await?;
        let auction = self.fetch_required(auction_id).await?;
        self.assert_buyer(&auction, buyer_id)?;
        match auction.status {
            AuctionStatus::Closed => Ok(auction),
            AuctionStatus::Active => {
                self.assert_early_close_allowed(&auction)?;
                let closed = self.db.update_auction_status(auction_id, AuctionStatus::Closed).await?;
                info!("🏷️ Auction {auction_id} closed early by the buyer");
                self.emit_closed(&closed, CloseReason::ClosedEarly).await;
                Ok(closed)
            },
            from => Err(AuctionEngineError::InvalidTransition { from, attempted: "close" }),
        }
    }

    /// Early close is unconditional for sealed auctions. A live reverse auction may only be cut short while more
    /// than the cutoff (1 hour) remains; inside that window the bidders are owed the natural finish.
    fn assert_early_close_allowed(&self, auction: &Auction) -> Result<(), AuctionEngineError> {
        if auction.style == AuctionStyle::LiveReverse
            && auction.time_remaining(Utc::now()) <= self.config.early_close_cutoff
        {
            return Err(AuctionEngineError::EarlyCloseTooLate);
        }
        Ok(())
    }

    async fn finish_award(
        &self,
        auction: &Auction,
        bid_id: i64,
        reason: CloseReason,
    ) -> Result<Auction, AuctionEngineError> {
        let awarded = self.db.award_auction(&auction.auction_id, bid_id).await?;
        info!("🏷️ Auction {} awarded to bid {bid_id}", auction.auction_id);
        if awarded.deposit_status == DepositStatus::Escrowed {
            self.db.update_deposit(&auction.auction_id, DepositUpdate::status(DepositStatus::Refunded)).await?;
            info!("💰️ Deposit for auction {} refunded to the buyer", auction.auction_id);
        }
        self.emit_closed(&awarded, reason).await;
        Ok(awarded)
    }

    //----------------------------------------- Deposits -------------------------------------------------------------

    /// Asks the gateway to open the deposit payment. `Unpaid → Pending`, storing the gateway's track id. May be
    /// repeated while still `Pending` (e.g. the buyer abandoned the payment page); the track id is replaced.
    pub async fn request_deposit<G: PaymentGateway>(
        &self,
        auction_id: &AuctionId,
        buyer_id: &str,
        gateway: &G,
    ) -> Result<DepositPayment, AuctionEngineError> {
        let _guard = self.lock(auction_id).await?;
        let auction = self.fetch_required(auction_id).await?;
        self.assert_buyer(&auction, buyer_id)?;
        let deposit = self.require_deposit(auction_id).await?;
        if !matches!(deposit.status, DepositStatus::Unpaid | DepositStatus::Pending) {
            return Err(AuctionEngineError::DepositState(
                auction_id.clone(),
                format!("cannot request payment from status {}", deposit.status),
            ));
        }
        let track_id = self.bounded(gateway.request_payment(deposit.amount, auction_id.as_str())).await?;
        debug!("💰️ Gateway opened payment {track_id} for auction {auction_id}");
        let updated = self
            .db
            .update_deposit(auction_id, DepositUpdate::status(DepositStatus::Pending).with_track_id(&track_id))
            .await?;
        Ok(updated)
    }

    /// The gateway's payment callback, fed in by the transport layer. `Pending → Paid`. Idempotent: a deposit that
    /// is already `Paid` or `Escrowed` is returned unchanged.
    pub async fn confirm_paid(
        &self,
        auction_id: &AuctionId,
        track_id: &str,
    ) -> Result<DepositPayment, AuctionEngineError> {
        let _guard = self.lock(auction_id).await?;
        let deposit = self.require_deposit(auction_id).await?;
        match deposit.status {
            DepositStatus::Paid | DepositStatus::Escrowed => Ok(deposit),
            DepositStatus::Pending => {
                if deposit.track_id.as_deref() != Some(track_id) {
                    return Err(AuctionEngineError::DepositState(
                        auction_id.clone(),
                        format!("callback track id {track_id} does not match the requested payment"),
                    ));
                }
                let updated =
                    self.db.update_deposit(auction_id, DepositUpdate::status(DepositStatus::Paid)).await?;
                info!("💰️ Deposit for auction {auction_id} reported paid (track {track_id})");
                Ok(updated)
            },
            other => Err(AuctionEngineError::DepositState(
                auction_id.clone(),
                format!("cannot confirm payment from status {other}"),
            )),
        }
    }

    /// Verifies the payment with the gateway and moves the deposit into escrow. `Paid → Escrowed` on confirmation;
    /// a definitive gateway rejection moves it to `Failed` (returned, not an error, since the call itself succeeded).
    /// Escrow on an `Approved` auction activates it.
    pub async fn verify_deposit<G: PaymentGateway>(
        &self,
        auction_id: &AuctionId,
        gateway: &G,
    ) -> Result<DepositPayment, AuctionEngineError> {
        let _guard = self.lock(auction_id).await?;
        let auction = self.fetch_required(auction_id).await?;
        let deposit = self.require_deposit(auction_id).await?;
        match deposit.status {
            DepositStatus::Escrowed => Ok(deposit),
            DepositStatus::Pending | DepositStatus::Paid => {
                let track_id = deposit.track_id.clone().ok_or_else(|| {
                    AuctionEngineError::DepositState(auction_id.clone(), "no track id to verify".into())
                })?;
                match self.bounded(gateway.verify_payment(&track_id)).await? {
                    PaymentVerification::Verified { ref_number } => {
                        let update =
                            DepositUpdate::status(DepositStatus::Escrowed).with_ref_number(&ref_number);
                        let updated = self.db.update_deposit(auction_id, update).await?;
                        info!("💰️ Deposit for auction {auction_id} verified and held in escrow (ref {ref_number})");
                        if auction.status == AuctionStatus::Approved {
                            self.activate(&auction).await?;
                        }
                        Ok(updated)
                    },
                    PaymentVerification::Rejected { reason } => {
                        let updated =
                            self.db.update_deposit(auction_id, DepositUpdate::status(DepositStatus::Failed)).await?;
                        warn!("💰️ Gateway rejected the deposit for auction {auction_id}: {reason}");
                        Ok(updated)
                    },
                }
            },
            other => Err(AuctionEngineError::DepositState(
                auction_id.clone(),
                format!("cannot verify payment from status {other}"),
            )),
        }
    }

    //----------------------------------------- Plumbing -------------------------------------------------------------

    async fn lock(&self, auction_id: &AuctionId) -> Result<tokio::sync::OwnedMutexGuard<()>, AuctionEngineError> {
        Ok(self.locks.acquire(auction_id, self.config.lock_wait, self.config.lock_attempts).await?)
    }

    async fn fetch_required(&self, auction_id: &AuctionId) -> Result<Auction, AuctionEngineError> {
        self.db
            .fetch_auction(auction_id)
            .await?
            .ok_or_else(|| AuctionEngineError::AuctionNotFound(auction_id.clone()))
    }

    fn assert_buyer(&self, auction: &Auction, buyer_id: &str) -> Result<(), AuctionEngineError> {
        if auction.buyer_id != buyer_id {
            return Err(AuctionEngineError::NotAuthorized(format!(
                "user {buyer_id} is not the buyer of auction {}",
                auction.auction_id
            )));
        }
        Ok(())
    }

    async fn require_bid(&self, bid_id: i64) -> Result<Bid, AuctionEngineError> {
        self.db
            .fetch_bid(bid_id)
            .await?
            .ok_or(AuctionEngineError::Store(crate::traits::AuctionStoreError::BidNotFound(bid_id)))
    }

    async fn require_bid_on(&self, auction: &Auction, bid_id: i64) -> Result<Bid, AuctionEngineError> {
        let bid = self.require_bid(bid_id).await?;
        if bid.auction_id != auction.id {
            return Err(AuctionEngineError::Store(crate::traits::AuctionStoreError::BidAuctionMismatch {
                auction_id: auction.auction_id.clone(),
                bid_id,
            }));
        }
        Ok(bid)
    }

    async fn require_deposit(&self, auction_id: &AuctionId) -> Result<DepositPayment, AuctionEngineError> {
        self.db
            .fetch_deposit(auction_id)
            .await?
            .ok_or_else(|| AuctionEngineError::DepositMissing(auction_id.clone()))
    }

    async fn invited_suppliers(&self, auction_id: &AuctionId) -> Result<Vec<String>, AuctionEngineError> {
        let invitations = self.db.fetch_invitations(auction_id).await?;
        Ok(invitations.into_iter().map(|i| i.supplier_id).collect())
    }

    /// Bounds an outbound gateway call by the configured timeout. An elapsed timer is a gateway failure; it says
    /// nothing about the fate of the underlying payment.
    async fn bounded<T, F>(&self, fut: F) -> Result<T, AuctionEngineError>
    where F: Future<Output = Result<T, GatewayError>> {
        match timeout(self.config.gateway_timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(AuctionEngineError::Gateway(GatewayError::Timeout)),
        }
    }

    //------------------------------------------ Events --------------------------------------------------------------

    async fn emit_published(&self, auction: &Auction, invited_suppliers: Vec<String>) {
        for producer in &self.producers.auction_published_producer {
            let event =
                AuctionPublishedEvent { auction: auction.clone(), invited_suppliers: invited_suppliers.clone() };
            producer.publish_event(event).await;
        }
    }

    async fn emit_reviewed(&self, auction: &Auction, approved: bool, reason: Option<&str>) {
        for producer in &self.producers.auction_reviewed_producer {
            let event = AuctionReviewedEvent {
                auction: auction.clone(),
                approved,
                reason: reason.map(ToString::to_string),
            };
            producer.publish_event(event).await;
        }
    }

    async fn emit_bid_received(&self, auction: &Auction, bid: &Bid) {
        for producer in &self.producers.bid_received_producer {
            producer.publish_event(BidReceivedEvent { auction: auction.clone(), bid: bid.clone() }).await;
        }
    }

    async fn emit_closed(&self, auction: &Auction, reason: CloseReason) {
        let invited = match self.invited_suppliers(&auction.auction_id).await {
            Ok(list) => list,
            Err(e) => {
                error!("🔔️ Could not load invitations for the close notification of {}: {e}", auction.auction_id);
                Vec::new()
            },
        };
        for producer in &self.producers.auction_closed_producer {
            let event =
                AuctionClosedEvent { auction: auction.clone(), reason, invited_suppliers: invited.clone() };
            producer.publish_event(event).await;
        }
    }
}
