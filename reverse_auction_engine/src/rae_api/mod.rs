//! The public engine API.
//!
//! * [`AuctionFlowApi`] drives the auction state machine: review transitions, activation with auto-invitation,
//!   bid submission with ranking and soft close, early close, awarding, and the gateway-driven deposit flow.
//! * [`SweepApi`] is the periodic batch entrypoint: it closes expired auctions and runs the 48h-warning /
//!   72h-forfeiture passes over escrowed deposits.
//! * [`EngineConfig`] holds the tunable windows and timeouts, with environment overrides.
pub mod auction_flow_api;
pub mod config;
pub mod errors;
pub mod ranking;
pub mod rules;
pub mod sweep_api;

pub use auction_flow_api::AuctionFlowApi;
pub use config::EngineConfig;
pub use errors::{AuctionEngineError, BidRejection};
pub use sweep_api::SweepApi;
