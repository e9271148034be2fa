use chrono::Utc;
use log::trace;
use rae_common::Rial;
use sqlx::SqliteConnection;

use crate::{db_types::Bid, traits::RankAssignment};

/// Inserts the supplier's bid, or replaces the price and notes on their existing row. `created_at` is preserved on
/// replacement: the rank tie-break stays with the supplier's first submission time.
pub async fn upsert(
    auction_pk: i64,
    supplier_id: &str,
    price: Rial,
    notes: Option<String>,
    conn: &mut SqliteConnection,
) -> Result<Bid, sqlx::Error> {
    let now = Utc::now();
    let bid: Bid = sqlx::query_as(
        r#"
            INSERT INTO bids (auction_id, supplier_id, price, notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            ON CONFLICT (auction_id, supplier_id) DO UPDATE
            SET price = excluded.price, notes = excluded.notes, updated_at = excluded.updated_at
            RETURNING *;
        "#,
    )
    .bind(auction_pk)
    .bind(supplier_id)
    .bind(price)
    .bind(notes)
    .bind(now)
    .fetch_one(conn)
    .await?;
    trace!("🗃️ Bid row {} for supplier {supplier_id} written", bid.id);
    Ok(bid)
}

/// All bids of the auction in rank order: price ascending, then creation time, then row id.
pub async fn fetch_for_auction(auction_pk: i64, conn: &mut SqliteConnection) -> Result<Vec<Bid>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM bids WHERE auction_id = $1 ORDER BY price, created_at, id")
        .bind(auction_pk)
        .fetch_all(conn)
        .await
}

pub async fn fetch_for_supplier(
    auction_pk: i64,
    supplier_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Bid>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM bids WHERE auction_id = $1 AND supplier_id = $2")
        .bind(auction_pk)
        .bind(supplier_id)
        .fetch_optional(conn)
        .await
}

pub async fn fetch_by_id(bid_id: i64, conn: &mut SqliteConnection) -> Result<Option<Bid>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM bids WHERE id = $1").bind(bid_id).fetch_optional(conn).await
}

/// Writes one rank assignment row. Callers wrap the full recompute in a transaction so a half-applied assignment
/// is never visible.
pub async fn write_rank(assignment: &RankAssignment, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE bids SET rank = $1, is_winning = $2, updated_at = $3 WHERE id = $4")
        .bind(assignment.rank)
        .bind(assignment.is_winning)
        .bind(Utc::now())
        .bind(assignment.bid_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Flags exactly one bid of the auction as winning. Used when awarding, where the winner is chosen by the buyer
/// rather than by rank.
pub async fn mark_single_winner(
    auction_pk: i64,
    bid_id: i64,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE bids SET is_winning = (id = $1), updated_at = $2 WHERE auction_id = $3")
        .bind(bid_id)
        .bind(Utc::now())
        .bind(auction_pk)
        .execute(conn)
        .await?;
    Ok(())
}
