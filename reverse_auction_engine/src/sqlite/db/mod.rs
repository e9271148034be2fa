//! # SQLite database methods
//!
//! "Low-level" SQLite interactions, kept as plain functions that accept a `&mut SqliteConnection`. Callers obtain a
//! connection from the pool, or open a transaction and pass `&mut *tx` when several of these calls must land
//! atomically.
//!
//! All timestamps are bound from Rust rather than left to SQL defaults, so that stored values and query parameters
//! compare in one consistent format.
use std::env;

use log::info;
use sqlx::{sqlite::SqlitePoolOptions, Error as SqlxError, SqlitePool};

pub mod auctions;
pub mod bids;
pub mod deposits;
pub mod invitations;

const SQLITE_DB_URL: &str = "sqlite://data/rae_store.db";

pub fn db_url() -> String {
    let result = env::var("RAE_DATABASE_URL").unwrap_or_else(|_| {
        info!("RAE_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}
