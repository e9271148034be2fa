//! # Backend contracts.
//!
//! This module defines the interface contracts that concrete backends must implement for the reverse-auction engine.
//!
//! ## Persistence
//! The [`AuctionStore`] trait is the persistence contract: CRUD over auctions, bids, invitations and deposit
//! payments, plus the handful of compound queries the engine needs (the ordered bid read for ranking, the sweep
//! window query, the persisted warning guard). The engine never touches a database directly; everything goes through
//! this trait so that the core logic stays storage-agnostic.
//!
//! ## Payment gateway
//! The [`PaymentGateway`] trait is the outbound contract for requesting and verifying deposit payments. The engine
//! only consumes the request/verify/callback surface; the gateway's own ledger is out of scope.
mod auction_store;
mod data_objects;
mod payment_gateway;

pub use auction_store::{AuctionStore, AuctionStoreError};
pub use data_objects::{BidReceipt, BidderShare, DepositUpdate, ForfeitureSplit, RankAssignment, SweepResult};
pub use payment_gateway::{GatewayError, PaymentGateway, PaymentVerification};
