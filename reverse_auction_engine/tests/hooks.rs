use std::{
    sync::{
        atomic::{AtomicI32, Ordering},
        Arc,
    },
    time::Duration,
};

use log::*;
use rae_common::Rial;
use reverse_auction_engine::{events::EventHooks, AuctionFlowApi};
use tokio::runtime::Runtime;

use crate::support::{live_auction, new_store, sourcing_request, tear_down};

mod support;

#[derive(Default, Clone)]
struct HookCalled {
    called: Arc<AtomicI32>,
}

impl HookCalled {
    pub fn called(&self) {
        let _ = self.called.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> i32 {
        self.called.load(Ordering::Relaxed)
    }
}

#[test]
fn hooks_fire_for_publication_bids_and_closes() {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let rt = Runtime::new().unwrap();
    let published = HookCalled::default();
    let bids = HookCalled::default();
    let closed = HookCalled::default();
    let (published_copy, bids_copy, closed_copy) = (published.clone(), bids.clone(), closed.clone());
    rt.block_on(async move {
        let mut hooks = EventHooks::default();
        hooks.on_auction_published(move |event| {
            info!("🪝️ {} {}", event.event_type(), serde_json::to_string(&event).unwrap_or_default());
            published_copy.called();
            Box::pin(async {})
        });
        hooks.on_bid_received(move |event| {
            info!("🪝️ {} bid of {} from {}", event.event_type(), event.bid.price, event.bid.supplier_id);
            bids_copy.called();
            Box::pin(async {})
        });
        hooks.on_auction_closed(move |event| {
            info!("🪝️ {} ({:?})", event.event_type(), event.reason);
            closed_copy.called();
            Box::pin(async {})
        });
        let handlers = reverse_auction_engine::events::EventHandlers::new(10, hooks);
        let producers = handlers.producers();
        handlers.start_handlers().await;

        let db = new_store().await;
        let api = AuctionFlowApi::new(db, producers);
        let auction = live_auction(&api, sourcing_request("auc-5001"), &["s1", "s2"]).await;
        let id = &auction.auction_id;
        let receipt = api.submit_bid(id, "s1", Rial::from(900_000), None).await.expect("s1's bid");
        api.submit_bid(id, "s2", Rial::from(850_000), None).await.expect("s2's bid");
        api.accept_bid(id, support::BUYER, receipt.bid.id).await.expect("Error accepting the bid");

        // Delivery is fire-and-forget; give the handler tasks a beat to drain.
        tokio::time::sleep(Duration::from_millis(250)).await;
        tear_down(api).await;
    });
    assert_eq!(published.count(), 1);
    assert_eq!(bids.count(), 2);
    assert_eq!(closed.count(), 1);
    info!("🪝️ test complete");
}
