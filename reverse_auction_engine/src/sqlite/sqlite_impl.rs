//! `SqliteStore` is the concrete SQLite implementation of the engine's persistence contract.
//!
//! It holds a connection pool and delegates row-level work to the functions in [`super::db`], wrapping the multi-row
//! operations (rank recomputes, awards, forfeitures) in transactions so partial writes are never visible.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use rae_common::Rial;
use sqlx::{SqliteConnection, SqlitePool};

use super::db::{auctions, bids, deposits, invitations, new_pool};
use crate::{
    db_types::{
        Auction,
        AuctionId,
        AuctionStatus,
        Bid,
        DepositPayment,
        DepositStatus,
        Invitation,
        InvitationSource,
        Listing,
        NewAuction,
    },
    traits::{AuctionStore, AuctionStoreError, DepositUpdate, RankAssignment},
};

#[derive(Clone)]
pub struct SqliteStore {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteStore ({:?})", self.pool)
    }
}

impl SqliteStore {
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, AuctionStoreError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Resolves the public auction id to the row and its internal primary key.
    async fn require_auction(
        auction_id: &AuctionId,
        conn: &mut SqliteConnection,
    ) -> Result<Auction, AuctionStoreError> {
        auctions::fetch_auction_by_auction_id(auction_id, conn)
            .await?
            .ok_or_else(|| AuctionStoreError::AuctionNotFound(auction_id.clone()))
    }
}

impl AuctionStore for SqliteStore {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_auction(&self, auction: NewAuction) -> Result<(Auction, bool), AuctionStoreError> {
        let mut conn = self.pool.acquire().await?;
        auctions::idempotent_insert(auction, &mut conn).await
    }

    async fn fetch_auction(&self, auction_id: &AuctionId) -> Result<Option<Auction>, AuctionStoreError> {
        let mut conn = self.pool.acquire().await?;
        let auction = auctions::fetch_auction_by_auction_id(auction_id, &mut conn).await?;
        Ok(auction)
    }

    async fn update_auction_status(
        &self,
        auction_id: &AuctionId,
        status: AuctionStatus,
    ) -> Result<Auction, AuctionStoreError> {
        let mut conn = self.pool.acquire().await?;
        auctions::update_status(auction_id, status, &mut conn).await
    }

    async fn extend_deadline(
        &self,
        auction_id: &AuctionId,
        new_deadline: DateTime<Utc>,
        extension_count: i64,
    ) -> Result<Auction, AuctionStoreError> {
        let mut conn = self.pool.acquire().await?;
        auctions::extend_deadline(auction_id, new_deadline, extension_count, &mut conn).await
    }

    async fn award_auction(&self, auction_id: &AuctionId, bid_id: i64) -> Result<Auction, AuctionStoreError> {
        let mut tx = self.pool.begin().await?;
        let auction = Self::require_auction(auction_id, &mut tx).await?;
        let bid = bids::fetch_by_id(bid_id, &mut tx).await?.ok_or(AuctionStoreError::BidNotFound(bid_id))?;
        if bid.auction_id != auction.id {
            return Err(AuctionStoreError::BidAuctionMismatch { auction_id: auction_id.clone(), bid_id });
        }
        let auction = auctions::set_winner(auction_id, bid_id, &mut tx).await?;
        bids::mark_single_winner(auction.id, bid_id, &mut tx).await?;
        tx.commit().await?;
        Ok(auction)
    }

    async fn expired_active_auctions(&self, now: DateTime<Utc>) -> Result<Vec<Auction>, AuctionStoreError> {
        let mut conn = self.pool.acquire().await?;
        let auctions = auctions::expired_active(now, &mut conn).await?;
        Ok(auctions)
    }

    async fn forfeiture_candidates(
        &self,
        older_than: DateTime<Utc>,
        newer_than: Option<DateTime<Utc>>,
    ) -> Result<Vec<Auction>, AuctionStoreError> {
        let mut conn = self.pool.acquire().await?;
        let auctions = auctions::forfeiture_candidates(older_than, newer_than, &mut conn).await?;
        Ok(auctions)
    }

    async fn upsert_bid(
        &self,
        auction_id: &AuctionId,
        supplier_id: &str,
        price: Rial,
        notes: Option<String>,
    ) -> Result<Bid, AuctionStoreError> {
        let mut conn = self.pool.acquire().await?;
        let auction = Self::require_auction(auction_id, &mut conn).await?;
        let bid = bids::upsert(auction.id, supplier_id, price, notes, &mut conn).await?;
        Ok(bid)
    }

    async fn fetch_bids(&self, auction_id: &AuctionId) -> Result<Vec<Bid>, AuctionStoreError> {
        let mut conn = self.pool.acquire().await?;
        let auction = Self::require_auction(auction_id, &mut conn).await?;
        let bids = bids::fetch_for_auction(auction.id, &mut conn).await?;
        Ok(bids)
    }

    async fn fetch_bid_for_supplier(
        &self,
        auction_id: &AuctionId,
        supplier_id: &str,
    ) -> Result<Option<Bid>, AuctionStoreError> {
        let mut conn = self.pool.acquire().await?;
        let auction = Self::require_auction(auction_id, &mut conn).await?;
        let bid = bids::fetch_for_supplier(auction.id, supplier_id, &mut conn).await?;
        Ok(bid)
    }

    async fn fetch_bid(&self, bid_id: i64) -> Result<Option<Bid>, AuctionStoreError> {
        let mut conn = self.pool.acquire().await?;
        let bid = bids::fetch_by_id(bid_id, &mut conn).await?;
        Ok(bid)
    }

    async fn write_ranks(
        &self,
        auction_id: &AuctionId,
        ranks: &[RankAssignment],
    ) -> Result<(), AuctionStoreError> {
        let mut tx = self.pool.begin().await?;
        let auction = Self::require_auction(auction_id, &mut tx).await?;
        for assignment in ranks {
            let bid = bids::fetch_by_id(assignment.bid_id, &mut tx)
                .await?
                .ok_or(AuctionStoreError::BidNotFound(assignment.bid_id))?;
            if bid.auction_id != auction.id {
                return Err(AuctionStoreError::BidAuctionMismatch {
                    auction_id: auction_id.clone(),
                    bid_id: assignment.bid_id,
                });
            }
            bids::write_rank(assignment, &mut tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn insert_invitation(
        &self,
        auction_id: &AuctionId,
        supplier_id: &str,
        source: InvitationSource,
    ) -> Result<(Invitation, bool), AuctionStoreError> {
        let mut conn = self.pool.acquire().await?;
        let auction = Self::require_auction(auction_id, &mut conn).await?;
        let result = invitations::idempotent_insert(auction.id, supplier_id, source, &mut conn).await?;
        Ok(result)
    }

    async fn is_invited(&self, auction_id: &AuctionId, supplier_id: &str) -> Result<bool, AuctionStoreError> {
        let mut conn = self.pool.acquire().await?;
        let auction = Self::require_auction(auction_id, &mut conn).await?;
        let invitation = invitations::fetch_for_supplier(auction.id, supplier_id, &mut conn).await?;
        Ok(invitation.is_some())
    }

    async fn fetch_invitations(&self, auction_id: &AuctionId) -> Result<Vec<Invitation>, AuctionStoreError> {
        let mut conn = self.pool.acquire().await?;
        let auction = Self::require_auction(auction_id, &mut conn).await?;
        let invitations = invitations::fetch_for_auction(auction.id, &mut conn).await?;
        Ok(invitations)
    }

    async fn mark_invitation_viewed(
        &self,
        auction_id: &AuctionId,
        supplier_id: &str,
    ) -> Result<(), AuctionStoreError> {
        let mut conn = self.pool.acquire().await?;
        let auction = Self::require_auction(auction_id, &mut conn).await?;
        invitations::mark_viewed(auction.id, supplier_id, &mut conn).await?;
        Ok(())
    }

    async fn mark_invitations_notified(&self, auction_id: &AuctionId) -> Result<(), AuctionStoreError> {
        let mut conn = self.pool.acquire().await?;
        let auction = Self::require_auction(auction_id, &mut conn).await?;
        invitations::mark_notified(auction.id, &mut conn).await?;
        Ok(())
    }

    async fn suppliers_in_category(&self, category_id: &str) -> Result<Vec<String>, AuctionStoreError> {
        let mut conn = self.pool.acquire().await?;
        let suppliers = invitations::suppliers_in_category(category_id, &mut conn).await?;
        Ok(suppliers)
    }

    async fn upsert_listing(
        &self,
        supplier_id: &str,
        category_id: &str,
        active: bool,
    ) -> Result<Listing, AuctionStoreError> {
        let mut conn = self.pool.acquire().await?;
        let listing = invitations::upsert_listing(supplier_id, category_id, active, &mut conn).await?;
        Ok(listing)
    }

    async fn create_deposit(
        &self,
        auction_id: &AuctionId,
        amount: Rial,
    ) -> Result<DepositPayment, AuctionStoreError> {
        let mut tx = self.pool.begin().await?;
        let auction = Self::require_auction(auction_id, &mut tx).await?;
        let deposit = deposits::insert(auction.id, auction_id, amount, &mut tx).await?;
        auctions::set_deposit_status(auction_id, DepositStatus::Unpaid, &mut tx).await?;
        tx.commit().await?;
        Ok(deposit)
    }

    async fn fetch_deposit(&self, auction_id: &AuctionId) -> Result<Option<DepositPayment>, AuctionStoreError> {
        let mut conn = self.pool.acquire().await?;
        let auction = Self::require_auction(auction_id, &mut conn).await?;
        let deposit = deposits::fetch_by_auction(auction.id, &mut conn).await?;
        Ok(deposit)
    }

    async fn update_deposit(
        &self,
        auction_id: &AuctionId,
        update: DepositUpdate,
    ) -> Result<DepositPayment, AuctionStoreError> {
        let mut tx = self.pool.begin().await?;
        let auction = Self::require_auction(auction_id, &mut tx).await?;
        let deposit = deposits::update(auction.id, auction_id, update, &mut tx).await?;
        auctions::set_deposit_status(auction_id, deposit.status, &mut tx).await?;
        tx.commit().await?;
        Ok(deposit)
    }

    async fn record_forfeiture_warning(&self, auction_id: &AuctionId) -> Result<bool, AuctionStoreError> {
        let mut conn = self.pool.acquire().await?;
        let auction = Self::require_auction(auction_id, &mut conn).await?;
        let first_warning = deposits::record_warning(auction.id, &mut conn).await?;
        Ok(first_warning)
    }

    async fn apply_forfeiture(
        &self,
        auction_id: &AuctionId,
    ) -> Result<(Auction, DepositPayment), AuctionStoreError> {
        let mut tx = self.pool.begin().await?;
        let auction = Self::require_auction(auction_id, &mut tx).await?;
        let deposit = deposits::forfeit(auction.id, auction_id, &mut tx).await?;
        let auction = auctions::update_status(auction_id, AuctionStatus::Abandoned, &mut tx).await?;
        auctions::set_deposit_status(auction_id, DepositStatus::Forfeited, &mut tx).await?;
        tx.commit().await?;
        let auction = Auction { deposit_status: DepositStatus::Forfeited, ..auction };
        Ok((auction, deposit))
    }

    async fn close(&mut self) -> Result<(), AuctionStoreError> {
        self.pool.close().await;
        Ok(())
    }
}
