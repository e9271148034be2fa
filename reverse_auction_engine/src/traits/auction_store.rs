use chrono::{DateTime, Utc};
use rae_common::Rial;
use thiserror::Error;

use crate::{
    db_types::{
        Auction,
        AuctionId,
        AuctionStatus,
        Bid,
        DepositPayment,
        Invitation,
        InvitationSource,
        Listing,
        NewAuction,
    },
    traits::{DepositUpdate, RankAssignment},
};

/// The persistence contract for the reverse-auction engine.
///
/// The contract covers:
/// * Auction records and their status/deadline fields
/// * Bids, including the ordered read and atomic rank write the ledger needs
/// * Invitations and the supplier-catalog lookup behind auto-invitation
/// * Deposit payments and the forfeiture bookkeeping for the sweep
///
/// Multi-row updates ([`Self::write_ranks`], [`Self::award_auction`], [`Self::apply_forfeiture`]) must be atomic.
/// The engine serializes mutations per auction above this layer, so implementations do not need their own
/// auction-level locking, but they must not interleave the rows of a single call.
#[allow(async_fn_in_trait)]
pub trait AuctionStore: Clone {
    /// The URL of the backing database.
    fn url(&self) -> &str;

    //----------------------------------------- Auctions -------------------------------------------------------------

    /// Stores a new auction in `Draft` status. Idempotent: if an auction with the same public id already exists, it
    /// is returned unchanged and the second element is `false`.
    async fn insert_auction(&self, auction: NewAuction) -> Result<(Auction, bool), AuctionStoreError>;

    async fn fetch_auction(&self, auction_id: &AuctionId) -> Result<Option<Auction>, AuctionStoreError>;

    /// Sets the auction status. Moving to `Closed` stamps `closed_at` (if not already set); all updates stamp
    /// `updated_at`. Status legality is the engine's concern, not the store's.
    async fn update_auction_status(
        &self,
        auction_id: &AuctionId,
        status: AuctionStatus,
    ) -> Result<Auction, AuctionStoreError>;

    /// Moves the deadline and stores the new extension count in one update.
    async fn extend_deadline(
        &self,
        auction_id: &AuctionId,
        new_deadline: DateTime<Utc>,
        extension_count: i64,
    ) -> Result<Auction, AuctionStoreError>;

    /// Atomically records the winning bid: sets `winner_bid_id`, moves the auction to `Awarded`, and flags the bid
    /// as winning (clearing the flag on every other bid of the auction).
    async fn award_auction(&self, auction_id: &AuctionId, bid_id: i64) -> Result<Auction, AuctionStoreError>;

    /// All `Active` auctions whose deadline lies at or before `now`.
    async fn expired_active_auctions(&self, now: DateTime<Utc>) -> Result<Vec<Auction>, AuctionStoreError>;

    /// Closed auctions with no winner and an escrowed deposit whose `closed_at` lies before `older_than`
    /// (and after `newer_than`, when given). This is the sweep's selection query; it is read-only.
    async fn forfeiture_candidates(
        &self,
        older_than: DateTime<Utc>,
        newer_than: Option<DateTime<Utc>>,
    ) -> Result<Vec<Auction>, AuctionStoreError>;

    //------------------------------------------- Bids ---------------------------------------------------------------

    /// Inserts the supplier's bid, or replaces their existing bid's price and notes in place. There is never more
    /// than one bid row per (auction, supplier); `created_at` is preserved on replacement so the tie-break stays
    /// with the supplier's first submission time.
    async fn upsert_bid(
        &self,
        auction_id: &AuctionId,
        supplier_id: &str,
        price: Rial,
        notes: Option<String>,
    ) -> Result<Bid, AuctionStoreError>;

    /// All bids on the auction, ordered by `(price ASC, created_at ASC)`.
    async fn fetch_bids(&self, auction_id: &AuctionId) -> Result<Vec<Bid>, AuctionStoreError>;

    async fn fetch_bid_for_supplier(
        &self,
        auction_id: &AuctionId,
        supplier_id: &str,
    ) -> Result<Option<Bid>, AuctionStoreError>;

    async fn fetch_bid(&self, bid_id: i64) -> Result<Option<Bid>, AuctionStoreError>;

    /// Applies a full rank assignment in one transaction. Every bid of the auction must appear in `ranks`.
    async fn write_ranks(
        &self,
        auction_id: &AuctionId,
        ranks: &[RankAssignment],
    ) -> Result<(), AuctionStoreError>;

    //---------------------------------------- Invitations -----------------------------------------------------------

    /// Creates an invitation. Idempotent: an existing (auction, supplier) pair is returned unchanged with `false`.
    async fn insert_invitation(
        &self,
        auction_id: &AuctionId,
        supplier_id: &str,
        source: InvitationSource,
    ) -> Result<(Invitation, bool), AuctionStoreError>;

    async fn is_invited(&self, auction_id: &AuctionId, supplier_id: &str) -> Result<bool, AuctionStoreError>;

    async fn fetch_invitations(&self, auction_id: &AuctionId) -> Result<Vec<Invitation>, AuctionStoreError>;

    /// Stamps `viewed_at` on the supplier's invitation, first view wins. A missing invitation is a no-op.
    async fn mark_invitation_viewed(
        &self,
        auction_id: &AuctionId,
        supplier_id: &str,
    ) -> Result<(), AuctionStoreError>;

    /// Stamps `notified_at` on every invitation of the auction that has not been notified yet.
    async fn mark_invitations_notified(&self, auction_id: &AuctionId) -> Result<(), AuctionStoreError>;

    /// Distinct supplier ids with at least one active listing in the category.
    async fn suppliers_in_category(&self, category_id: &str) -> Result<Vec<String>, AuctionStoreError>;

    /// Upserts a supplier-catalog listing. Invitations already granted are unaffected by later listing changes.
    async fn upsert_listing(
        &self,
        supplier_id: &str,
        category_id: &str,
        active: bool,
    ) -> Result<Listing, AuctionStoreError>;

    //------------------------------------------ Deposits ------------------------------------------------------------

    /// Creates the 1:1 deposit record for a verified auction, in `Unpaid` status, and mirrors `Unpaid` onto the
    /// auction's `deposit_status`.
    async fn create_deposit(&self, auction_id: &AuctionId, amount: Rial) -> Result<DepositPayment, AuctionStoreError>;

    async fn fetch_deposit(&self, auction_id: &AuctionId) -> Result<Option<DepositPayment>, AuctionStoreError>;

    /// Applies the given field updates to the deposit. A status change is mirrored onto the auction's
    /// `deposit_status` in the same transaction; moving to `Paid` stamps `paid_at` and to `Escrowed` stamps
    /// `verified_at`.
    async fn update_deposit(
        &self,
        auction_id: &AuctionId,
        update: DepositUpdate,
    ) -> Result<DepositPayment, AuctionStoreError>;

    /// Records that the 48h forfeiture warning was sent for this auction. Returns `false` if a warning was already
    /// recorded, so repeated sweep passes warn at most once.
    async fn record_forfeiture_warning(&self, auction_id: &AuctionId) -> Result<bool, AuctionStoreError>;

    /// Atomically applies a forfeiture: the deposit moves to `Forfeited` and the auction to `Abandoned` with
    /// `deposit_status = Forfeited`. Fails if the deposit is not currently `Escrowed`.
    async fn apply_forfeiture(
        &self,
        auction_id: &AuctionId,
    ) -> Result<(Auction, DepositPayment), AuctionStoreError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), AuctionStoreError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuctionStoreError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("The requested auction {0} does not exist")]
    AuctionNotFound(AuctionId),
    #[error("The requested bid (internal id {0}) does not exist")]
    BidNotFound(i64),
    #[error("Auction {0} has no deposit record")]
    DepositNotFound(AuctionId),
    #[error("Auction {0} already has a deposit record")]
    DepositAlreadyExists(AuctionId),
    #[error("Illegal deposit status change: {0}")]
    DepositStateError(String),
    #[error("Bid {bid_id} does not belong to auction {auction_id}")]
    BidAuctionMismatch { auction_id: AuctionId, bid_id: i64 },
}

impl From<sqlx::Error> for AuctionStoreError {
    fn from(e: sqlx::Error) -> Self {
        AuctionStoreError::DatabaseError(e.to_string())
    }
}
