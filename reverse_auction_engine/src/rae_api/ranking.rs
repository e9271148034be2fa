//! Deterministic bid ranking.
//!
//! Ranking is a full re-sort of the auction's bids, not an incremental update. Bid counts are bounded by the
//! invited-supplier count, so correctness wins over micro-optimization here.
use crate::{db_types::Bid, traits::RankAssignment};

/// Assigns ranks 1..N over the given bids: price ascending (lower wins a reverse auction), `created_at` ascending as
/// the tie-break (first to bid wins the tie), internal id as a final total-order guarantee. Ties are never collapsed
/// into a shared rank; exactly one bid (rank 1) is marked winning.
pub fn assign_ranks(bids: &[Bid]) -> Vec<RankAssignment> {
    let mut ordered: Vec<&Bid> = bids.iter().collect();
    ordered.sort_by(|a, b| a.price.cmp(&b.price).then(a.created_at.cmp(&b.created_at)).then(a.id.cmp(&b.id)));
    ordered
        .iter()
        .enumerate()
        .map(|(i, bid)| RankAssignment { bid_id: bid.id, rank: (i + 1) as i64, is_winning: i == 0 })
        .collect()
}

#[cfg(test)]
mod test {
    use chrono::{Duration, Utc};
    use rae_common::Rial;

    use super::*;

    fn bid(id: i64, price: i64, seconds_ago: i64) -> Bid {
        let created_at = Utc::now() - Duration::seconds(seconds_ago);
        Bid {
            id,
            auction_id: 1,
            supplier_id: format!("s{id}"),
            price: Rial::from(price),
            notes: None,
            rank: None,
            is_winning: false,
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn ranks_are_exactly_one_to_n_with_one_winner() {
        let bids = vec![bid(1, 900, 30), bid(2, 700, 20), bid(3, 800, 10), bid(4, 750, 5)];
        let mut ranks: Vec<i64> = assign_ranks(&bids).iter().map(|r| r.rank).collect();
        ranks.sort_unstable();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
        let winners = assign_ranks(&bids).iter().filter(|r| r.is_winning).count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn lower_price_always_ranks_better() {
        let bids = vec![bid(1, 900, 30), bid(2, 700, 20), bid(3, 800, 10)];
        let ranks = assign_ranks(&bids);
        let rank_of = |id: i64| ranks.iter().find(|r| r.bid_id == id).unwrap().rank;
        assert_eq!(rank_of(2), 1);
        assert_eq!(rank_of(3), 2);
        assert_eq!(rank_of(1), 3);
        assert!(ranks.iter().find(|r| r.bid_id == 2).unwrap().is_winning);
    }

    #[test]
    fn equal_prices_tie_break_on_creation_time() {
        // Bid 2 has the same price but bid earlier.
        let bids = vec![bid(1, 800, 10), bid(2, 800, 60)];
        let ranks = assign_ranks(&bids);
        let rank_of = |id: i64| ranks.iter().find(|r| r.bid_id == id).unwrap().rank;
        assert_eq!(rank_of(2), 1);
        assert_eq!(rank_of(1), 2);
    }

    #[test]
    fn empty_bid_set_yields_no_ranks() {
        assert!(assign_ranks(&[]).is_empty());
    }
}
