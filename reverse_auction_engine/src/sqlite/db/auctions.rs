use chrono::{DateTime, Utc};
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Auction, AuctionId, AuctionStatus, DepositStatus, NewAuction},
    traits::AuctionStoreError,
};

/// Inserts the auction in `Draft`, returning `false` in the second element if the public id already exists.
pub async fn idempotent_insert(
    auction: NewAuction,
    conn: &mut SqliteConnection,
) -> Result<(Auction, bool), AuctionStoreError> {
    let inserted = match fetch_auction_by_auction_id(&auction.auction_id, conn).await? {
        Some(auction) => (auction, false),
        None => {
            let auction = insert_auction(auction, conn).await?;
            debug!("🗃️ Auction {} inserted with id {}", auction.auction_id, auction.id);
            (auction, true)
        },
    };
    Ok(inserted)
}

async fn insert_auction(auction: NewAuction, conn: &mut SqliteConnection) -> Result<Auction, AuctionStoreError> {
    let deposit_status =
        if auction.deposit.is_some() { DepositStatus::Unpaid } else { DepositStatus::NotRequired };
    let now = Utc::now();
    let auction = sqlx::query_as(
        r#"
            INSERT INTO auctions (
                auction_id,
                buyer_id,
                category_id,
                description,
                starting_price,
                reserve_price,
                min_decrement,
                deadline,
                style,
                status,
                deposit_status,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12)
            RETURNING *;
        "#,
    )
    .bind(auction.auction_id)
    .bind(auction.buyer_id)
    .bind(auction.category_id)
    .bind(auction.description)
    .bind(auction.starting_price)
    .bind(auction.reserve_price)
    .bind(auction.min_decrement)
    .bind(auction.deadline)
    .bind(auction.style)
    .bind(AuctionStatus::Draft)
    .bind(deposit_status)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(auction)
}

pub async fn fetch_auction_by_auction_id(
    auction_id: &AuctionId,
    conn: &mut SqliteConnection,
) -> Result<Option<Auction>, sqlx::Error> {
    let auction = sqlx::query_as("SELECT * FROM auctions WHERE auction_id = $1")
        .bind(auction_id.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(auction)
}

/// Sets the status. Moving to `Closed` stamps `closed_at` if it is not already set.
pub async fn update_status(
    auction_id: &AuctionId,
    status: AuctionStatus,
    conn: &mut SqliteConnection,
) -> Result<Auction, AuctionStoreError> {
    let now = Utc::now();
    let auction: Option<Auction> = sqlx::query_as(
        r#"
            UPDATE auctions
            SET status = $1,
                closed_at = CASE WHEN $1 = 'Closed' AND closed_at IS NULL THEN $2 ELSE closed_at END,
                updated_at = $2
            WHERE auction_id = $3
            RETURNING *;
        "#,
    )
    .bind(status)
    .bind(now)
    .bind(auction_id.as_str())
    .fetch_optional(conn)
    .await?;
    auction.ok_or_else(|| AuctionStoreError::AuctionNotFound(auction_id.clone()))
}

pub async fn extend_deadline(
    auction_id: &AuctionId,
    new_deadline: DateTime<Utc>,
    extension_count: i64,
    conn: &mut SqliteConnection,
) -> Result<Auction, AuctionStoreError> {
    let auction: Option<Auction> = sqlx::query_as(
        "UPDATE auctions SET deadline = $1, extension_count = $2, updated_at = $3 WHERE auction_id = $4 RETURNING *",
    )
    .bind(new_deadline)
    .bind(extension_count)
    .bind(Utc::now())
    .bind(auction_id.as_str())
    .fetch_optional(conn)
    .await?;
    auction.ok_or_else(|| AuctionStoreError::AuctionNotFound(auction_id.clone()))
}

/// Records the winner and moves the auction to `Awarded`. The bid-side flag update lives in
/// [`crate::sqlite::db::bids::mark_single_winner`]; the two run in one transaction at the impl level.
pub async fn set_winner(
    auction_id: &AuctionId,
    bid_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Auction, AuctionStoreError> {
    let auction: Option<Auction> = sqlx::query_as(
        "UPDATE auctions SET winner_bid_id = $1, status = $2, updated_at = $3 WHERE auction_id = $4 RETURNING *",
    )
    .bind(bid_id)
    .bind(AuctionStatus::Awarded)
    .bind(Utc::now())
    .bind(auction_id.as_str())
    .fetch_optional(conn)
    .await?;
    auction.ok_or_else(|| AuctionStoreError::AuctionNotFound(auction_id.clone()))
}

/// Mirrors a deposit status change onto the owning auction row.
pub async fn set_deposit_status(
    auction_id: &AuctionId,
    status: DepositStatus,
    conn: &mut SqliteConnection,
) -> Result<(), AuctionStoreError> {
    sqlx::query("UPDATE auctions SET deposit_status = $1, updated_at = $2 WHERE auction_id = $3")
        .bind(status)
        .bind(Utc::now())
        .bind(auction_id.as_str())
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn expired_active(
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Auction>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM auctions WHERE status = 'Active' AND deadline <= $1 ORDER BY deadline")
        .bind(now)
        .fetch_all(conn)
        .await
}

/// The sweep's selection: closed, no winner, deposit in escrow, `closed_at` inside the given window.
pub async fn forfeiture_candidates(
    older_than: DateTime<Utc>,
    newer_than: Option<DateTime<Utc>>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Auction>, sqlx::Error> {
    match newer_than {
        Some(newer_than) => {
            sqlx::query_as(
                r#"
                    SELECT * FROM auctions
                    WHERE status = 'Closed' AND winner_bid_id IS NULL AND deposit_status = 'Escrowed'
                      AND closed_at <= $1 AND closed_at > $2
                    ORDER BY closed_at;
                "#,
            )
            .bind(older_than)
            .bind(newer_than)
            .fetch_all(conn)
            .await
        },
        None => {
            sqlx::query_as(
                r#"
                    SELECT * FROM auctions
                    WHERE status = 'Closed' AND winner_bid_id IS NULL AND deposit_status = 'Escrowed'
                      AND closed_at <= $1
                    ORDER BY closed_at;
                "#,
            )
            .bind(older_than)
            .fetch_all(conn)
            .await
        },
    }
}
