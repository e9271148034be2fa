use chrono::{Duration, Utc};
use log::*;
use rae_common::Rial;
use reverse_auction_engine::{AuctionEngineError, AuctionStore, BidRejection};
use tokio::runtime::Runtime;

use crate::support::{live_auction, setup, sourcing_request, tear_down, BUYER};

mod support;

#[test]
fn underbidding_reranks_and_replacements_are_in_place() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async move {
        let api = setup().await;
        let auction = live_auction(&api, sourcing_request("auc-1001"), &["s1", "s2"]).await;
        let id = &auction.auction_id;

        // First bid: 100,000 below the start clears the 50,000 decrement.
        let receipt = api.submit_bid(id, "s1", Rial::from(900_000), None).await.expect("s1's first bid");
        assert_eq!(receipt.bid.rank, Some(1));
        assert!(receipt.bid.is_winning);

        // A higher (but valid) bid from s2 lands behind s1.
        let receipt = api.submit_bid(id, "s2", Rial::from(950_000), None).await.expect("s2's first bid");
        assert_eq!(receipt.bid.rank, Some(2));
        assert!(!receipt.bid.is_winning);

        // s2 undercuts and takes the lead; s1 is demoted in the same recompute.
        let receipt = api.submit_bid(id, "s2", Rial::from(800_000), None).await.expect("s2's replacement bid");
        assert_eq!(receipt.bid.rank, Some(1));
        assert!(receipt.bid.is_winning);

        let bids = api.bids_for_buyer(id, BUYER).await.expect("buyer's bid list");
        assert_eq!(bids.len(), 2, "a replacement must not create a second row");
        assert_eq!(bids[0].supplier_id, "s2");
        assert_eq!(bids[1].supplier_id, "s1");
        assert_eq!(bids[1].rank, Some(2));
        assert!(!bids[1].is_winning);

        // Matching your own previous price is not an undercut.
        let err = api.submit_bid(id, "s1", Rial::from(900_000), None).await.unwrap_err();
        assert!(matches!(
            err,
            AuctionEngineError::Rejected(BidRejection::NotLowerThanPrevious { previous })
                if previous == Rial::from(900_000)
        ));
        assert!(err.is_validation());

        tear_down(api).await;
    });
    info!("🔨️ test complete");
}

#[test]
fn validation_rejects_before_any_write() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async move {
        let api = setup().await;
        let auction = live_auction(&api, sourcing_request("auc-1002"), &["s1"]).await;
        let id = &auction.auction_id;

        // Not invited.
        let err = api.submit_bid(id, "s9", Rial::from(900_000), None).await.unwrap_err();
        assert!(matches!(err, AuctionEngineError::Rejected(BidRejection::NotInvited)));

        // At the starting price.
        let err = api.submit_bid(id, "s1", Rial::from(1_000_000), None).await.unwrap_err();
        assert!(matches!(err, AuctionEngineError::Rejected(BidRejection::PriceTooHigh { .. })));

        // Below the start, but not by a full decrement.
        let err = api.submit_bid(id, "s1", Rial::from(960_000), None).await.unwrap_err();
        assert!(matches!(
            err,
            AuctionEngineError::Rejected(BidRejection::DecrementTooSmall { required })
                if required == Rial::from(50_000)
        ));

        // Nothing was written along the way.
        let bids = api.bids_for_buyer(id, BUYER).await.expect("buyer's bid list");
        assert!(bids.is_empty());

        tear_down(api).await;
    });
    info!("🔨️ test complete");
}

#[test]
fn sealed_bids_are_only_visible_to_their_owner_and_the_buyer() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async move {
        let api = setup().await;
        let auction = live_auction(&api, sourcing_request("auc-1003"), &["s1", "s2"]).await;
        let id = &auction.auction_id;

        api.submit_bid(id, "s1", Rial::from(900_000), Some("FOB Bandar Abbas".into())).await.expect("s1's bid");

        let own = api.bid_for_supplier(id, "s1").await.expect("s1's own view");
        assert_eq!(own.map(|b| b.price), Some(Rial::from(900_000)));

        // An invited supplier with no bid sees an empty slot, not an error.
        let none = api.bid_for_supplier(id, "s2").await.expect("s2's own view");
        assert!(none.is_none());

        // An uninvited supplier sees nothing at all.
        let err = api.bid_for_supplier(id, "s9").await.unwrap_err();
        assert!(matches!(err, AuctionEngineError::NotAuthorized(_)));

        // Bid lists are the buyer's alone.
        let err = api.bids_for_buyer(id, "someone-else").await.unwrap_err();
        assert!(matches!(err, AuctionEngineError::NotAuthorized(_)));

        tear_down(api).await;
    });
    info!("🔨️ test complete");
}

#[test]
fn soft_close_extends_up_to_the_cap() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async move {
        let api = setup().await;
        let auction = live_auction(&api, sourcing_request("auc-1004"), &["s1"]).await;
        let id = &auction.auction_id;

        // A bid outside the window leaves the deadline alone.
        let receipt = api.submit_bid(id, "s1", Rial::from(950_000), None).await.expect("bid outside the window");
        assert!(receipt.extended_deadline.is_none());

        let mut price = 900_000;
        for expected_extensions in 1..=3 {
            support::force_deadline(api.db(), id, Utc::now() + Duration::minutes(2)).await;
            let receipt = api.submit_bid(id, "s1", Rial::from(price), None).await.expect("bid in the window");
            let extended = receipt.extended_deadline.expect("the deadline should have moved");
            assert!(extended > Utc::now() + Duration::minutes(6), "each extension adds five minutes");
            let fresh = api.db().fetch_auction(id).await.unwrap().unwrap();
            assert_eq!(fresh.extension_count, expected_extensions);
            price -= 50_000;
        }

        // The cap: a fourth last-minute bid is accepted but buys no more time.
        support::force_deadline(api.db(), id, Utc::now() + Duration::minutes(2)).await;
        let receipt = api.submit_bid(id, "s1", Rial::from(price), None).await.expect("bid after the cap");
        assert!(receipt.extended_deadline.is_none());
        let fresh = api.db().fetch_auction(id).await.unwrap().unwrap();
        assert_eq!(fresh.extension_count, 3);

        tear_down(api).await;
    });
    info!("🔨️ test complete");
}
