//! Reverse Auction Engine
//!
//! The Reverse Auction Engine powers a B2B sourcing marketplace in which buyers publish requests and invited
//! suppliers compete by underbidding one another. This library contains the core logic for the engine. It is
//! presentation-agnostic: there is no HTTP layer here, only the auction rules and their persistence.
//!
//! The library is divided into two main sections:
//! 1. Database management and control ([`mod@sqlite`] and the contracts in [`mod@traits`]). SQLite is the supported
//!    backend. You should never need to access the database directly. Instead, use the public API provided by the
//!    engine. The exception is the data types used in the database. These are defined in the `db_types` module and
//!    are public.
//! 2. The engine's public API ([`AuctionFlowApi`] and [`SweepApi`]). These provide the public-facing functionality:
//!    the auction lifecycle, bid validation and ranking, invitations, deposit escrow, and the background sweep that
//!    enforces deadlines and forfeitures.
//!
//! The engine also provides a set of events that can be subscribed to. These events are emitted when certain actions
//! occur, such as an auction going live or a bid arriving. A simple actor framework is used so that you can hook into
//! these events and perform custom actions, typically dispatching notifications.
pub mod db_types;
pub mod events;
pub mod helpers;
mod rae_api;
#[cfg(feature = "sqlite")]
pub mod sqlite;
mod traits;

#[cfg(feature = "sqlite")]
pub use sqlite::{run_migrations, SqliteStore};
pub use rae_api::{
    auction_flow_api::AuctionFlowApi,
    config::EngineConfig,
    errors::{AuctionEngineError, BidRejection},
    ranking::assign_ranks,
    rules::validate_bid,
    sweep_api::SweepApi,
};
pub use traits::{
    AuctionStore,
    AuctionStoreError,
    BidReceipt,
    BidderShare,
    DepositUpdate,
    ForfeitureSplit,
    GatewayError,
    PaymentGateway,
    PaymentVerification,
    RankAssignment,
    SweepResult,
};
