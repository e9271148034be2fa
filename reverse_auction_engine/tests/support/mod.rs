#![allow(dead_code)]
pub mod prepare_env;

use chrono::{DateTime, Duration, Utc};
use log::*;
use rae_common::Rial;
use reverse_auction_engine::{
    db_types::{Auction, AuctionId, AuctionStyle, NewAuction},
    events::EventProducers,
    AuctionFlowApi,
    AuctionStore,
    GatewayError,
    PaymentGateway,
    PaymentVerification,
    SqliteStore,
};
use sqlx::{migrate::MigrateDatabase, Sqlite};

use crate::support::prepare_env::{prepare_test_env, random_db_path};

pub const BUYER: &str = "buyer-1";
pub const CATEGORY: &str = "steel-rebar";

pub async fn new_store() -> SqliteStore {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteStore::new_with_url(&url, 5).await.expect("Error creating database")
}

pub async fn setup() -> AuctionFlowApi<SqliteStore> {
    let db = new_store().await;
    AuctionFlowApi::new(db, EventProducers::default())
}

pub async fn tear_down(mut api: AuctionFlowApi<SqliteStore>) {
    let url = api.db().url().to_string();
    if let Err(e) = api.db_mut().close().await {
        error!("🚀️ Failed to close database: {e}");
    }
    Sqlite::drop_database(&url).await.unwrap();
}

/// A plausible sourcing request: 1,000,000 IRR starting price, 50,000 IRR minimum decrement, two hours of bidding.
pub fn sourcing_request(id: &str) -> NewAuction {
    NewAuction::new(
        AuctionId::from(id),
        BUYER.into(),
        CATEGORY.into(),
        Rial::from(1_000_000),
        Utc::now() + Duration::hours(2),
        AuctionStyle::LiveReverse,
    )
    .with_description("600 tonnes of grade-60 rebar, delivered to the Bandar Abbas depot")
    .with_min_decrement(Rial::from(50_000))
}

/// Lists the suppliers in [`CATEGORY`] and walks the request through draft, review and approval. Without a deposit
/// the approval activates the auction, so the result is open for bids with every supplier auto-invited.
pub async fn live_auction(api: &AuctionFlowApi<SqliteStore>, request: NewAuction, suppliers: &[&str]) -> Auction {
    for supplier in suppliers {
        api.db().upsert_listing(supplier, CATEGORY, true).await.expect("Error seeding the listing");
    }
    let auction = api.create_auction(request).await.expect("Error creating the auction");
    api.submit_for_review(&auction.auction_id, BUYER).await.expect("Error submitting for review");
    api.approve(&auction.auction_id).await.expect("Error approving the auction")
}

/// Rewrites the deadline directly, for tests that need an auction already past it.
pub async fn force_deadline(store: &SqliteStore, auction_id: &AuctionId, deadline: DateTime<Utc>) {
    sqlx::query("UPDATE auctions SET deadline = $1 WHERE auction_id = $2")
        .bind(deadline)
        .bind(auction_id.as_str())
        .execute(store.pool())
        .await
        .expect("Error rewriting the deadline");
}

/// Back-dates `closed_at`, for tests that need the 48h/72h windows to have elapsed.
pub async fn force_closed_at(store: &SqliteStore, auction_id: &AuctionId, closed_at: DateTime<Utc>) {
    sqlx::query("UPDATE auctions SET closed_at = $1 WHERE auction_id = $2")
        .bind(closed_at)
        .bind(auction_id.as_str())
        .execute(store.pool())
        .await
        .expect("Error rewriting closed_at");
}

/// A gateway double that always opens a payment and settles it with a fixed verdict, after an optional delay.
#[derive(Clone)]
pub struct FakeGateway {
    pub verdict: PaymentVerification,
    pub delay: Option<std::time::Duration>,
}

impl FakeGateway {
    pub fn approving() -> Self {
        Self { verdict: PaymentVerification::Verified { ref_number: "ref-000123".into() }, delay: None }
    }

    pub fn rejecting(reason: &str) -> Self {
        Self { verdict: PaymentVerification::Rejected { reason: reason.into() }, delay: None }
    }

    /// Makes every gateway call stall for `delay` before answering.
    pub fn delayed(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    async fn stall(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

impl PaymentGateway for FakeGateway {
    async fn request_payment(&self, amount: Rial, callback_ref: &str) -> Result<String, GatewayError> {
        self.stall().await;
        info!("🪝️ Fake gateway opened a payment of {amount} for {callback_ref}");
        Ok(format!("track-{callback_ref}"))
    }

    async fn verify_payment(&self, _track_id: &str) -> Result<PaymentVerification, GatewayError> {
        self.stall().await;
        Ok(self.verdict.clone())
    }
}
