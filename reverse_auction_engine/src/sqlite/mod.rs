//! SQLite backend for the reverse-auction engine.
mod sqlite_impl;

pub mod db;

pub use sqlite_impl::SqliteStore;

/// Runs the engine's schema migrations against the given pool.
pub async fn run_migrations(pool: &sqlx::SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./src/sqlite/migrations").run(pool).await
}
