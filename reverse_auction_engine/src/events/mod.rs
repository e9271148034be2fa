//! Lifecycle notifications.
//!
//! The engine does not deliver notifications itself; it emits typed lifecycle events through async hooks and the
//! transport layer decides what push/SMS/email to send. Delivery is fire-and-forget: a hook that is slow or failing
//! never blocks or fails the state transition that produced the event.
mod channel;
mod event_types;
mod hooks;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::{
    AuctionClosedEvent,
    AuctionPublishedEvent,
    AuctionReviewedEvent,
    BidReceivedEvent,
    CloseReason,
    DepositForfeitedEvent,
    DepositWarningEvent,
};
pub use hooks::{EventHandlers, EventHooks, EventProducers};
