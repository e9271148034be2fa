use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{
    AuctionClosedEvent,
    AuctionPublishedEvent,
    AuctionReviewedEvent,
    BidReceivedEvent,
    DepositForfeitedEvent,
    DepositWarningEvent,
    EventHandler,
    EventProducer,
    Handler,
};

macro_rules! hook_setter {
    ($name:ident, $event:ty) => {
        pub fn $name<F>(&mut self, f: F) -> &mut Self
        where F: (Fn($event) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
            self.$name = Some(Arc::new(f));
            self
        }
    };
}

/// The hook functions the embedding application registers to receive lifecycle events. All hooks are optional; an
/// unregistered hook means those events are dropped silently.
#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_auction_published: Option<Handler<AuctionPublishedEvent>>,
    pub on_bid_received: Option<Handler<BidReceivedEvent>>,
    pub on_auction_closed: Option<Handler<AuctionClosedEvent>>,
    pub on_auction_reviewed: Option<Handler<AuctionReviewedEvent>>,
    pub on_deposit_warning: Option<Handler<DepositWarningEvent>>,
    pub on_deposit_forfeited: Option<Handler<DepositForfeitedEvent>>,
}

impl EventHooks {
    hook_setter!(on_auction_published, AuctionPublishedEvent);

    hook_setter!(on_bid_received, BidReceivedEvent);

    hook_setter!(on_auction_closed, AuctionClosedEvent);

    hook_setter!(on_auction_reviewed, AuctionReviewedEvent);

    hook_setter!(on_deposit_warning, DepositWarningEvent);

    hook_setter!(on_deposit_forfeited, DepositForfeitedEvent);
}

/// The producer ends of every registered hook channel. Cloned into each API that emits events.
#[derive(Default, Clone)]
pub struct EventProducers {
    pub auction_published_producer: Vec<EventProducer<AuctionPublishedEvent>>,
    pub bid_received_producer: Vec<EventProducer<BidReceivedEvent>>,
    pub auction_closed_producer: Vec<EventProducer<AuctionClosedEvent>>,
    pub auction_reviewed_producer: Vec<EventProducer<AuctionReviewedEvent>>,
    pub deposit_warning_producer: Vec<EventProducer<DepositWarningEvent>>,
    pub deposit_forfeited_producer: Vec<EventProducer<DepositForfeitedEvent>>,
}

pub struct EventHandlers {
    pub on_auction_published: Option<EventHandler<AuctionPublishedEvent>>,
    pub on_bid_received: Option<EventHandler<BidReceivedEvent>>,
    pub on_auction_closed: Option<EventHandler<AuctionClosedEvent>>,
    pub on_auction_reviewed: Option<EventHandler<AuctionReviewedEvent>>,
    pub on_deposit_warning: Option<EventHandler<DepositWarningEvent>>,
    pub on_deposit_forfeited: Option<EventHandler<DepositForfeitedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        Self {
            on_auction_published: hooks.on_auction_published.map(|f| EventHandler::new(buffer_size, f)),
            on_bid_received: hooks.on_bid_received.map(|f| EventHandler::new(buffer_size, f)),
            on_auction_closed: hooks.on_auction_closed.map(|f| EventHandler::new(buffer_size, f)),
            on_auction_reviewed: hooks.on_auction_reviewed.map(|f| EventHandler::new(buffer_size, f)),
            on_deposit_warning: hooks.on_deposit_warning.map(|f| EventHandler::new(buffer_size, f)),
            on_deposit_forfeited: hooks.on_deposit_forfeited.map(|f| EventHandler::new(buffer_size, f)),
        }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_auction_published {
            result.auction_published_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_bid_received {
            result.bid_received_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_auction_closed {
            result.auction_closed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_auction_reviewed {
            result.auction_reviewed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_deposit_warning {
            result.deposit_warning_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_deposit_forfeited {
            result.deposit_forfeited_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_auction_published {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_bid_received {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_auction_closed {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_auction_reviewed {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_deposit_warning {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_deposit_forfeited {
            tokio::spawn(handler.start_handler());
        }
    }
}
