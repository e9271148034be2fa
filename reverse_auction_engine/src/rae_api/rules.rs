//! The bid validation gauntlet.
//!
//! Validation is fail-fast with a fixed order; the first violated rule is the one reported. The order is part of
//! the API contract because callers surface the reason verbatim.
use chrono::{DateTime, Utc};
use rae_common::Rial;

use crate::{
    db_types::{Auction, AuctionStatus, Bid},
    rae_api::BidRejection,
};

/// Validates a bid of `price` against the auction, the supplier's prior bid (if any), and the invitation check
/// result. Rules, in order:
/// 1. the auction is `Active`
/// 2. the deadline has not passed
/// 3. the supplier is invited
/// 4. the price is strictly below the starting price
/// 5. the price strictly undercuts the supplier's prior bid, and the undercut (or the gap to the starting price,
///    for a first bid) meets the minimum decrement when one is set
pub fn validate_bid(
    auction: &Auction,
    prior: Option<&Bid>,
    invited: bool,
    price: Rial,
    now: DateTime<Utc>,
) -> Result<(), BidRejection> {
    if auction.status != AuctionStatus::Active {
        return Err(BidRejection::AuctionNotActive);
    }
    if now >= auction.deadline {
        return Err(BidRejection::DeadlinePassed);
    }
    if !invited {
        return Err(BidRejection::NotInvited);
    }
    if price >= auction.starting_price {
        return Err(BidRejection::PriceTooHigh { starting_price: auction.starting_price });
    }
    let decrement = auction.min_decrement.filter(|d| d.value() > 0);
    match prior {
        Some(prior) => {
            if price >= prior.price {
                return Err(BidRejection::NotLowerThanPrevious { previous: prior.price });
            }
            if let Some(required) = decrement {
                if prior.price - price < required {
                    return Err(BidRejection::DecrementTooSmall { required });
                }
            }
        },
        None => {
            if let Some(required) = decrement {
                if auction.starting_price - price < required {
                    return Err(BidRejection::DecrementTooSmall { required });
                }
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use chrono::Duration;

    use super::*;
    use crate::db_types::{AuctionId, AuctionStyle, DepositStatus};

    fn auction(status: AuctionStatus, starting: i64, decrement: Option<i64>) -> Auction {
        let now = Utc::now();
        Auction {
            id: 1,
            auction_id: AuctionId::from("a-1"),
            buyer_id: "buyer".into(),
            category_id: "steel".into(),
            description: Some("bulk rebar".into()),
            starting_price: Rial::from(starting),
            reserve_price: None,
            min_decrement: decrement.map(Rial::from),
            deadline: now + Duration::hours(2),
            style: AuctionStyle::LiveReverse,
            status,
            extension_count: 0,
            deposit_status: DepositStatus::NotRequired,
            winner_bid_id: None,
            closed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn prior_bid(price: i64) -> Bid {
        let now = Utc::now();
        Bid {
            id: 7,
            auction_id: 1,
            supplier_id: "s1".into(),
            price: Rial::from(price),
            notes: None,
            rank: Some(1),
            is_winning: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn rejection_order_is_fail_fast() {
        let now = Utc::now();
        // Inactive auction trumps everything else, even an uninvited supplier with a bad price.
        let a = auction(AuctionStatus::Closed, 1_000_000, None);
        assert_eq!(
            validate_bid(&a, None, false, Rial::from(2_000_000), now),
            Err(BidRejection::AuctionNotActive)
        );
        // Active but past deadline.
        let mut a = auction(AuctionStatus::Active, 1_000_000, None);
        a.deadline = now - Duration::minutes(1);
        assert_eq!(validate_bid(&a, None, false, Rial::from(2_000_000), now), Err(BidRejection::DeadlinePassed));
        // Deadline fine, but not invited.
        let a = auction(AuctionStatus::Active, 1_000_000, None);
        assert_eq!(validate_bid(&a, None, false, Rial::from(2_000_000), now), Err(BidRejection::NotInvited));
        // Invited, but at/above starting price.
        assert_eq!(
            validate_bid(&a, None, true, Rial::from(1_000_000), now),
            Err(BidRejection::PriceTooHigh { starting_price: Rial::from(1_000_000) })
        );
    }

    #[test]
    fn replacement_must_strictly_undercut() {
        let now = Utc::now();
        let a = auction(AuctionStatus::Active, 1_000_000, None);
        let prior = prior_bid(900_000);
        assert_eq!(
            validate_bid(&a, Some(&prior), true, Rial::from(900_000), now),
            Err(BidRejection::NotLowerThanPrevious { previous: Rial::from(900_000) })
        );
        assert!(validate_bid(&a, Some(&prior), true, Rial::from(899_999), now).is_ok());
    }

    #[test]
    fn minimum_decrement_applies_to_first_and_replacement_bids() {
        let now = Utc::now();
        let a = auction(AuctionStatus::Active, 1_000_000, Some(50_000));
        // First bid must sit at least one decrement below the starting price.
        assert_eq!(
            validate_bid(&a, None, true, Rial::from(960_000), now),
            Err(BidRejection::DecrementTooSmall { required: Rial::from(50_000) })
        );
        assert!(validate_bid(&a, None, true, Rial::from(950_000), now).is_ok());
        // A replacement measures the decrement against the supplier's own prior bid.
        let prior = prior_bid(900_000);
        assert_eq!(
            validate_bid(&a, Some(&prior), true, Rial::from(870_000), now),
            Err(BidRejection::DecrementTooSmall { required: Rial::from(50_000) })
        );
        assert!(validate_bid(&a, Some(&prior), true, Rial::from(850_000), now).is_ok());
    }
}
