use chrono::Utc;
use log::debug;
use sqlx::SqliteConnection;

use crate::db_types::{Invitation, InvitationSource, Listing};

/// Creates the invitation, returning `false` in the second element if the (auction, supplier) pair already exists.
/// Invitations are never revoked once created.
pub async fn idempotent_insert(
    auction_pk: i64,
    supplier_id: &str,
    source: InvitationSource,
    conn: &mut SqliteConnection,
) -> Result<(Invitation, bool), sqlx::Error> {
    if let Some(existing) = fetch_for_supplier(auction_pk, supplier_id, &mut *conn).await? {
        return Ok((existing, false));
    }
    let invitation = sqlx::query_as(
        r#"
            INSERT INTO invitations (auction_id, supplier_id, source, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(auction_pk)
    .bind(supplier_id)
    .bind(source)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Supplier {supplier_id} invited ({source})");
    Ok((invitation, true))
}

pub async fn fetch_for_supplier(
    auction_pk: i64,
    supplier_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Invitation>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM invitations WHERE auction_id = $1 AND supplier_id = $2")
        .bind(auction_pk)
        .bind(supplier_id)
        .fetch_optional(conn)
        .await
}

pub async fn fetch_for_auction(auction_pk: i64, conn: &mut SqliteConnection) -> Result<Vec<Invitation>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM invitations WHERE auction_id = $1 ORDER BY created_at, id")
        .bind(auction_pk)
        .fetch_all(conn)
        .await
}

/// First view wins; later calls leave the original timestamp.
pub async fn mark_viewed(auction_pk: i64, supplier_id: &str, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE invitations SET viewed_at = $1 WHERE auction_id = $2 AND supplier_id = $3 AND viewed_at IS NULL",
    )
    .bind(Utc::now())
    .bind(auction_pk)
    .bind(supplier_id)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn mark_notified(auction_pk: i64, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE invitations SET notified_at = $1 WHERE auction_id = $2 AND notified_at IS NULL")
        .bind(Utc::now())
        .bind(auction_pk)
        .execute(conn)
        .await?;
    Ok(())
}

/// Distinct suppliers with at least one active listing in the category. The auto-invite source set.
pub async fn suppliers_in_category(
    category_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT DISTINCT supplier_id FROM listings WHERE category_id = $1 AND active = 1 ORDER BY supplier_id",
    )
    .bind(category_id)
    .fetch_all(conn)
    .await
}

pub async fn upsert_listing(
    supplier_id: &str,
    category_id: &str,
    active: bool,
    conn: &mut SqliteConnection,
) -> Result<Listing, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO listings (supplier_id, category_id, active, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (supplier_id, category_id) DO UPDATE SET active = excluded.active
            RETURNING *;
        "#,
    )
    .bind(supplier_id)
    .bind(category_id)
    .bind(active)
    .bind(Utc::now())
    .fetch_one(conn)
    .await
}
