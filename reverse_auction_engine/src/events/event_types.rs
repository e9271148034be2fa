use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Auction, Bid},
    traits::ForfeitureSplit,
};

/// The auction went live and is open for bids.
/// Recipients: the buyer and every invited supplier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuctionPublishedEvent {
    pub auction: Auction,
    pub invited_suppliers: Vec<String>,
}

impl AuctionPublishedEvent {
    pub fn event_type(&self) -> &'static str {
        "auction_published"
    }
}

/// A bid was accepted. Bids are sealed, so the only recipient is the buyer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BidReceivedEvent {
    pub auction: Auction,
    pub bid: Bid,
}

impl BidReceivedEvent {
    pub fn event_type(&self) -> &'static str {
        "bid_received"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloseReason {
    DeadlineReached,
    BidAccepted,
    ClosedEarly,
}

/// Bidding has ended. Recipients: the buyer and every invited supplier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuctionClosedEvent {
    pub auction: Auction,
    pub reason: CloseReason,
    pub invited_suppliers: Vec<String>,
}

impl AuctionClosedEvent {
    pub fn event_type(&self) -> &'static str {
        "auction_closed"
    }
}

/// The admin review decision. Recipient: the buyer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuctionReviewedEvent {
    pub auction: Auction,
    pub approved: bool,
    pub reason: Option<String>,
}

impl AuctionReviewedEvent {
    pub fn event_type(&self) -> &'static str {
        if self.approved {
            "auction_approved"
        } else {
            "auction_rejected"
        }
    }
}

/// The buyer has 24 hours left to pick a winner before the deposit is forfeited. Recipient: the buyer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositWarningEvent {
    pub auction: Auction,
    pub forfeit_at: DateTime<Utc>,
}

impl DepositWarningEvent {
    pub fn event_type(&self) -> &'static str {
        "deposit_forfeiture_warning"
    }
}

/// The deposit was forfeited and split. Recipients: the buyer, and each paid bidder with their share.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositForfeitedEvent {
    pub auction: Auction,
    pub split: ForfeitureSplit,
}

impl DepositForfeitedEvent {
    pub fn event_type(&self) -> &'static str {
        "deposit_forfeited"
    }
}
