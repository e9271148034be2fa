use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use log::error;
use rae_common::Rial;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid conversion: {0}")]
pub struct ConversionError(pub String);

//--------------------------------------      AuctionId      ---------------------------------------------------------
/// The public, opaque identifier of an auction. Rows also carry an internal `i64` primary key, but everything that
/// crosses the engine boundary refers to auctions by this id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct AuctionId(pub String);

impl FromStr for AuctionId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for AuctionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AuctionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for AuctionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl AuctionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------    AuctionStyle     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum AuctionStyle {
    /// Bids are hidden from other suppliers; the buyer may close the auction at any time.
    Sealed,
    /// A descending-price auction with soft-close deadline extensions.
    LiveReverse,
}

impl Display for AuctionStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuctionStyle::Sealed => write!(f, "Sealed"),
            AuctionStyle::LiveReverse => write!(f, "LiveReverse"),
        }
    }
}

impl FromStr for AuctionStyle {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Sealed" => Ok(Self::Sealed),
            "LiveReverse" => Ok(Self::LiveReverse),
            s => Err(ConversionError(format!("Invalid auction style: {s}"))),
        }
    }
}

//--------------------------------------    AuctionStatus    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum AuctionStatus {
    /// The buyer is still editing the sourcing request. Invisible to suppliers.
    Draft,
    /// Submitted and waiting for an admin review decision.
    PendingReview,
    /// Approved by an admin, but not yet open for bids (e.g. the deposit has not reached escrow yet).
    Approved,
    /// Rejected by an admin. Terminal.
    Rejected,
    /// Open for bids until the deadline.
    Active,
    /// The deadline passed, or the buyer closed the auction early. Waiting for the buyer to pick a winner.
    Closed,
    /// The buyer selected a winning bid. Terminal.
    Awarded,
    /// The buyer never acted and the deposit was forfeited. Terminal.
    Abandoned,
}

impl AuctionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AuctionStatus::Rejected | AuctionStatus::Awarded | AuctionStatus::Abandoned)
    }
}

impl Display for AuctionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuctionStatus::Draft => write!(f, "Draft"),
            AuctionStatus::PendingReview => write!(f, "PendingReview"),
            AuctionStatus::Approved => write!(f, "Approved"),
            AuctionStatus::Rejected => write!(f, "Rejected"),
            AuctionStatus::Active => write!(f, "Active"),
            AuctionStatus::Closed => write!(f, "Closed"),
            AuctionStatus::Awarded => write!(f, "Awarded"),
            AuctionStatus::Abandoned => write!(f, "Abandoned"),
        }
    }
}

impl FromStr for AuctionStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Draft" => Ok(Self::Draft),
            "PendingReview" => Ok(Self::PendingReview),
            "Approved" => Ok(Self::Approved),
            "Rejected" => Ok(Self::Rejected),
            "Active" => Ok(Self::Active),
            "Closed" => Ok(Self::Closed),
            "Awarded" => Ok(Self::Awarded),
            "Abandoned" => Ok(Self::Abandoned),
            s => Err(ConversionError(format!("Invalid auction status: {s}"))),
        }
    }
}

impl From<String> for AuctionStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid auction status: {value}. But this conversion cannot fail. Defaulting to Draft");
            AuctionStatus::Draft
        })
    }
}

//--------------------------------------    DepositStatus    ---------------------------------------------------------
/// The escrow lifecycle of a verified request's deposit. Free requests stay at `NotRequired` forever.
/// `Forfeited`, `Refunded` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum DepositStatus {
    NotRequired,
    /// A deposit is required but no payment has been requested from the gateway yet.
    Unpaid,
    /// A payment request is with the gateway and we are waiting for the callback.
    Pending,
    /// The gateway callback reported payment, but it has not been verified yet.
    Paid,
    /// Payment verified; the deposit is held in escrow by the platform.
    Escrowed,
    /// The buyer failed to act within the grace window and the deposit was split.
    Forfeited,
    /// Returned to the buyer after the auction was awarded.
    Refunded,
    /// The gateway definitively rejected the payment.
    Failed,
}

impl DepositStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DepositStatus::Forfeited | DepositStatus::Refunded | DepositStatus::Failed)
    }
}

impl Display for DepositStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DepositStatus::NotRequired => write!(f, "NotRequired"),
            DepositStatus::Unpaid => write!(f, "Unpaid"),
            DepositStatus::Pending => write!(f, "Pending"),
            DepositStatus::Paid => write!(f, "Paid"),
            DepositStatus::Escrowed => write!(f, "Escrowed"),
            DepositStatus::Forfeited => write!(f, "Forfeited"),
            DepositStatus::Refunded => write!(f, "Refunded"),
            DepositStatus::Failed => write!(f, "Failed"),
        }
    }
}

impl FromStr for DepositStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NotRequired" => Ok(Self::NotRequired),
            "Unpaid" => Ok(Self::Unpaid),
            "Pending" => Ok(Self::Pending),
            "Paid" => Ok(Self::Paid),
            "Escrowed" => Ok(Self::Escrowed),
            "Forfeited" => Ok(Self::Forfeited),
            "Refunded" => Ok(Self::Refunded),
            "Failed" => Ok(Self::Failed),
            s => Err(ConversionError(format!("Invalid deposit status: {s}"))),
        }
    }
}

//--------------------------------------  InvitationSource   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum InvitationSource {
    /// Created by the category match when the auction went active.
    Auto,
    /// Added by the buyer explicitly.
    Manual,
}

impl Display for InvitationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvitationSource::Auto => write!(f, "Auto"),
            InvitationSource::Manual => write!(f, "Manual"),
        }
    }
}

//--------------------------------------      Auction        ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Auction {
    pub id: i64,
    pub auction_id: AuctionId,
    pub buyer_id: String,
    pub category_id: String,
    pub description: Option<String>,
    pub starting_price: Rial,
    /// Buyer-only visible. The engine never exposes this to suppliers.
    pub reserve_price: Option<Rial>,
    pub min_decrement: Option<Rial>,
    pub deadline: DateTime<Utc>,
    pub style: AuctionStyle,
    pub status: AuctionStatus,
    pub extension_count: i64,
    pub deposit_status: DepositStatus,
    pub winner_bid_id: Option<i64>,
    pub closed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Auction {
    pub fn requires_deposit(&self) -> bool {
        self.deposit_status != DepositStatus::NotRequired
    }

    pub fn time_remaining(&self, now: DateTime<Utc>) -> Duration {
        self.deadline - now
    }
}

//--------------------------------------     NewAuction      ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewAuction {
    pub auction_id: AuctionId,
    pub buyer_id: String,
    pub category_id: String,
    pub description: Option<String>,
    pub starting_price: Rial,
    pub reserve_price: Option<Rial>,
    pub min_decrement: Option<Rial>,
    pub deadline: DateTime<Utc>,
    pub style: AuctionStyle,
    /// Set for a "verified" request: the buyer pre-pays a deposit of this amount, to be held in escrow.
    pub deposit: Option<Rial>,
}

impl NewAuction {
    pub fn new(
        auction_id: AuctionId,
        buyer_id: String,
        category_id: String,
        starting_price: Rial,
        deadline: DateTime<Utc>,
        style: AuctionStyle,
    ) -> Self {
        Self {
            auction_id,
            buyer_id,
            category_id,
            description: None,
            starting_price,
            reserve_price: None,
            min_decrement: None,
            deadline,
            style,
            deposit: None,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_reserve_price(mut self, reserve: Rial) -> Self {
        self.reserve_price = Some(reserve);
        self
    }

    pub fn with_min_decrement(mut self, decrement: Rial) -> Self {
        self.min_decrement = Some(decrement);
        self
    }

    pub fn verified(mut self, deposit: Rial) -> Self {
        self.deposit = Some(deposit);
        self
    }
}

//--------------------------------------        Bid          ---------------------------------------------------------
/// A supplier's single active offer on an auction. A supplier never has two live bids on the same auction; a
/// resubmission with a lower price replaces this row in place.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Bid {
    pub id: i64,
    /// Internal id of the owning auction.
    pub auction_id: i64,
    pub supplier_id: String,
    pub price: Rial,
    pub notes: Option<String>,
    /// 1-based position after the last rank recompute. `None` until the first recompute.
    pub rank: Option<i64>,
    pub is_winning: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------     Invitation      ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Invitation {
    pub id: i64,
    pub auction_id: i64,
    pub supplier_id: String,
    pub source: InvitationSource,
    pub viewed_at: Option<DateTime<Utc>>,
    pub notified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------      Listing        ---------------------------------------------------------
/// The slice of the supplier catalog the invitation registry needs: which suppliers are active in which category.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Listing {
    pub id: i64,
    pub supplier_id: String,
    pub category_id: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------   DepositPayment    ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DepositPayment {
    pub id: i64,
    pub auction_id: i64,
    pub amount: Rial,
    pub status: DepositStatus,
    /// The gateway's tracking id, assigned when the payment request is made.
    pub track_id: Option<String>,
    /// The gateway's settlement reference, assigned on verification.
    pub ref_number: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn status_round_trips() {
        for status in [
            AuctionStatus::Draft,
            AuctionStatus::PendingReview,
            AuctionStatus::Approved,
            AuctionStatus::Rejected,
            AuctionStatus::Active,
            AuctionStatus::Closed,
            AuctionStatus::Awarded,
            AuctionStatus::Abandoned,
        ] {
            assert_eq!(status.to_string().parse::<AuctionStatus>().unwrap(), status);
        }
        assert!("Open".parse::<AuctionStatus>().is_err());
    }

    #[test]
    fn terminal_statuses() {
        assert!(AuctionStatus::Rejected.is_terminal());
        assert!(AuctionStatus::Awarded.is_terminal());
        assert!(AuctionStatus::Abandoned.is_terminal());
        assert!(!AuctionStatus::Closed.is_terminal());
        assert!(DepositStatus::Forfeited.is_terminal());
        assert!(!DepositStatus::Escrowed.is_terminal());
    }

    #[test]
    fn deposit_status_round_trips() {
        for status in [
            DepositStatus::NotRequired,
            DepositStatus::Unpaid,
            DepositStatus::Pending,
            DepositStatus::Paid,
            DepositStatus::Escrowed,
            DepositStatus::Forfeited,
            DepositStatus::Refunded,
            DepositStatus::Failed,
        ] {
            assert_eq!(status.to_string().parse::<DepositStatus>().unwrap(), status);
        }
    }
}
