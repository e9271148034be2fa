use chrono::{DateTime, Utc};
use rae_common::Rial;
use serde::{Deserialize, Serialize};

use crate::db_types::{AuctionId, Bid, DepositStatus};

/// One row of a full rank recompute, applied atomically by [`crate::AuctionStore::write_ranks`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankAssignment {
    pub bid_id: i64,
    pub rank: i64,
    pub is_winning: bool,
}

/// The outcome of an accepted bid submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BidReceipt {
    pub bid: Bid,
    /// Set when the bid landed inside the soft-close window and pushed the deadline out.
    pub extended_deadline: Option<DateTime<Utc>>,
}

impl BidReceipt {
    pub fn new(bid: Bid) -> Self {
        Self { bid, extended_deadline: None }
    }

    pub fn with_extension(mut self, deadline: DateTime<Utc>) -> Self {
        self.extended_deadline = Some(deadline);
        self
    }
}

/// Field updates for a deposit record. Only the fields the escrow flow is allowed to touch are exposed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DepositUpdate {
    pub status: Option<DepositStatus>,
    pub track_id: Option<String>,
    pub ref_number: Option<String>,
}

impl DepositUpdate {
    pub fn status(status: DepositStatus) -> Self {
        Self { status: Some(status), ..Default::default() }
    }

    pub fn with_track_id(mut self, track_id: &str) -> Self {
        self.track_id = Some(track_id.to_string());
        self
    }

    pub fn with_ref_number(mut self, ref_number: &str) -> Self {
        self.ref_number = Some(ref_number.to_string());
        self
    }
}

/// Summary of one sweep pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepResult {
    /// Active auctions closed because their deadline passed.
    pub closed: Vec<AuctionId>,
    /// Auctions whose buyer received the one-time 48h forfeiture warning in this pass.
    pub warned: Vec<AuctionId>,
    /// Auctions whose deposit was forfeited in this pass.
    pub forfeited: Vec<AuctionId>,
    /// Auctions that failed mid-sweep and were skipped. They will be retried on the next pass.
    pub errors: Vec<AuctionId>,
}

impl SweepResult {
    pub fn closed_count(&self) -> usize {
        self.closed.len()
    }

    pub fn warned_count(&self) -> usize {
        self.warned.len()
    }

    pub fn forfeited_count(&self) -> usize {
        self.forfeited.len()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn total_count(&self) -> usize {
        self.closed_count() + self.warned_count() + self.forfeited_count()
    }
}

/// One bidder's share of a forfeited deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidderShare {
    pub supplier_id: String,
    pub amount: Rial,
}

/// How a forfeited deposit is divided: half to the platform, a quarter each to the two best-ranked bidders.
///
/// When only one bidder exists their quarter is still paid but the second quarter is retained by the platform, so
/// the explicit shares sum to three quarters of the deposit. Integer division remainders are likewise retained;
/// callers must not assume the shares always sum to exactly the deposit amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForfeitureSplit {
    pub deposit: Rial,
    pub platform_fee: Rial,
    pub first_bidder: BidderShare,
    pub second_bidder: Option<BidderShare>,
}

impl ForfeitureSplit {
    /// Computes the split for a deposit of `amount` over bids ordered by rank. Returns `None` when there are no
    /// bids at all: a bid-less auction is never forfeited.
    pub fn compute(amount: Rial, ranked_bids: &[Bid]) -> Option<Self> {
        let first = ranked_bids.first()?;
        let quarter = amount / 4;
        let platform_fee = amount / 2;
        let first_bidder = BidderShare { supplier_id: first.supplier_id.clone(), amount: quarter };
        let second_bidder =
            ranked_bids.get(1).map(|b| BidderShare { supplier_id: b.supplier_id.clone(), amount: quarter });
        Some(Self { deposit: amount, platform_fee, first_bidder, second_bidder })
    }

    /// The total actually paid out to bidders (excludes the platform fee).
    pub fn total_to_bidders(&self) -> Rial {
        self.first_bidder.amount + self.second_bidder.as_ref().map(|b| b.amount).unwrap_or_default()
    }

    /// Everything the platform keeps: its fee plus any unclaimed or rounding remainder.
    pub fn retained_by_platform(&self) -> Rial {
        self.deposit - self.total_to_bidders()
    }
}

#[cfg(test)]
mod test {
    use chrono::Utc;

    use super::*;

    fn bid(id: i64, supplier: &str, price: i64) -> Bid {
        let now = Utc::now();
        Bid {
            id,
            auction_id: 1,
            supplier_id: supplier.to_string(),
            price: Rial::from(price),
            notes: None,
            rank: Some(id),
            is_winning: id == 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn split_with_two_bidders_conserves_the_deposit() {
        let bids = vec![bid(1, "s1", 800_000), bid(2, "s2", 900_000)];
        let split = ForfeitureSplit::compute(Rial::from(5_000_000), &bids).unwrap();
        assert_eq!(split.platform_fee, Rial::from(2_500_000));
        assert_eq!(split.first_bidder.supplier_id, "s1");
        assert_eq!(split.first_bidder.amount, Rial::from(1_250_000));
        let second = split.second_bidder.as_ref().unwrap();
        assert_eq!(second.supplier_id, "s2");
        assert_eq!(second.amount, Rial::from(1_250_000));
        assert_eq!(split.platform_fee + split.total_to_bidders(), Rial::from(5_000_000));
    }

    #[test]
    fn split_with_one_bidder_pays_three_quarters() {
        let bids = vec![bid(1, "s1", 800_000)];
        let split = ForfeitureSplit::compute(Rial::from(4_000_000), &bids).unwrap();
        assert_eq!(split.platform_fee, Rial::from(2_000_000));
        assert_eq!(split.first_bidder.amount, Rial::from(1_000_000));
        assert!(split.second_bidder.is_none());
        assert_eq!(split.platform_fee + split.total_to_bidders(), Rial::from(3_000_000));
        assert_eq!(split.retained_by_platform(), Rial::from(3_000_000));
    }

    #[test]
    fn split_with_no_bidders_is_none() {
        assert!(ForfeitureSplit::compute(Rial::from(5_000_000), &[]).is_none());
    }
}
