use chrono::Utc;
use log::debug;
use rae_common::Rial;
use sqlx::SqliteConnection;

use crate::{
    db_types::{AuctionId, DepositPayment, DepositStatus},
    traits::{AuctionStoreError, DepositUpdate},
};

/// Creates the 1:1 deposit record for the auction, in `Unpaid` status.
pub async fn insert(
    auction_pk: i64,
    auction_id: &AuctionId,
    amount: Rial,
    conn: &mut SqliteConnection,
) -> Result<DepositPayment, AuctionStoreError> {
    if fetch_by_auction(auction_pk, &mut *conn).await?.is_some() {
        return Err(AuctionStoreError::DepositAlreadyExists(auction_id.clone()));
    }
    let now = Utc::now();
    let deposit = sqlx::query_as(
        r#"
            INSERT INTO deposit_payments (auction_id, amount, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING *;
        "#,
    )
    .bind(auction_pk)
    .bind(amount)
    .bind(DepositStatus::Unpaid)
    .bind(now)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Deposit record of {amount} created for auction {auction_id}");
    Ok(deposit)
}

pub async fn fetch_by_auction(
    auction_pk: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<DepositPayment>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM deposit_payments WHERE auction_id = $1")
        .bind(auction_pk)
        .fetch_optional(conn)
        .await
}

/// Applies the given field updates. Absent fields keep their stored values. Moving to `Paid` stamps `paid_at`; moving
/// to `Escrowed` stamps `verified_at`. Mirroring a status change onto the auction row is the caller's job, in the
/// same transaction.
pub async fn update(
    auction_pk: i64,
    auction_id: &AuctionId,
    update: DepositUpdate,
    conn: &mut SqliteConnection,
) -> Result<DepositPayment, AuctionStoreError> {
    let current = fetch_by_auction(auction_pk, &mut *conn)
        .await?
        .ok_or_else(|| AuctionStoreError::DepositNotFound(auction_id.clone()))?;
    let now = Utc::now();
    let status = update.status.unwrap_or(current.status);
    let track_id = update.track_id.or(current.track_id);
    let ref_number = update.ref_number.or(current.ref_number);
    let paid_at = match (status, current.paid_at) {
        (DepositStatus::Paid, None) => Some(now),
        (_, existing) => existing,
    };
    let verified_at = match (status, current.verified_at) {
        (DepositStatus::Escrowed, None) => Some(now),
        (_, existing) => existing,
    };
    let deposit = sqlx::query_as(
        r#"
            UPDATE deposit_payments
            SET status = $1, track_id = $2, ref_number = $3, paid_at = $4, verified_at = $5, updated_at = $6
            WHERE auction_id = $7
            RETURNING *;
        "#,
    )
    .bind(status)
    .bind(track_id)
    .bind(ref_number)
    .bind(paid_at)
    .bind(verified_at)
    .bind(now)
    .bind(auction_pk)
    .fetch_one(conn)
    .await?;
    Ok(deposit)
}

/// Records that the forfeiture warning went out. `false` means a warning row already existed.
pub async fn record_warning(auction_pk: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("INSERT OR IGNORE INTO forfeiture_warnings (auction_id, created_at) VALUES ($1, $2)")
        .bind(auction_pk)
        .bind(Utc::now())
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Moves an `Escrowed` deposit to `Forfeited`, failing on any other current status.
pub async fn forfeit(
    auction_pk: i64,
    auction_id: &AuctionId,
    conn: &mut SqliteConnection,
) -> Result<DepositPayment, AuctionStoreError> {
    let current = fetch_by_auction(auction_pk, &mut *conn)
        .await?
        .ok_or_else(|| AuctionStoreError::DepositNotFound(auction_id.clone()))?;
    if current.status != DepositStatus::Escrowed {
        return Err(AuctionStoreError::DepositStateError(format!(
            "cannot forfeit deposit of auction {auction_id} in status {}",
            current.status
        )));
    }
    let deposit = sqlx::query_as(
        "UPDATE deposit_payments SET status = $1, updated_at = $2 WHERE auction_id = $3 RETURNING *",
    )
    .bind(DepositStatus::Forfeited)
    .bind(Utc::now())
    .bind(auction_pk)
    .fetch_one(conn)
    .await?;
    Ok(deposit)
}
