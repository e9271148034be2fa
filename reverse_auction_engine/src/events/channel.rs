//! A small stateless pub-sub channel for lifecycle events.
//!
//! Each hook gets its own [`EventHandler`] actor: producers push events into an mpsc channel, and the actor spawns
//! the (async) hook for every event it receives. Hooks see only the event itself, never engine state.
use std::{future::Future, pin::Pin, sync::Arc};

use log::*;
use tokio::{sync::mpsc, task::JoinSet};

pub type Handler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

pub struct EventHandler<E: Send + Sync + 'static> {
    listener: mpsc::Receiver<E>,
    sender: mpsc::Sender<E>,
    handler: Handler<E>,
}

impl<E: Send + Sync + 'static> EventHandler<E> {
    pub fn new(buffer_size: usize, handler: Handler<E>) -> Self {
        let (sender, listener) = mpsc::channel(buffer_size);
        Self { listener, sender, handler }
    }

    pub fn subscribe(&self) -> EventProducer<E> {
        EventProducer::new(self.sender.clone())
    }

    /// Runs the actor until every producer has been dropped, then drains any in-flight hook invocations.
    pub async fn start_handler(mut self) {
        debug!("🔔️ Starting notification handler");
        // Drop our own sender so the loop ends once the last external producer is gone.
        drop(self.sender);
        let mut jobs = JoinSet::new();
        while let Some(ev) = self.listener.recv().await {
            let handler = Arc::clone(&self.handler);
            jobs.spawn(async move {
                (handler)(ev).await;
            });
            // Reap whatever has already finished so the set does not grow without bound.
            while jobs.try_join_next().is_some() {}
        }
        while let Some(result) = jobs.join_next().await {
            if let Err(e) = result {
                warn!("🔔️ A notification hook panicked or was cancelled: {e}");
            }
        }
        debug!("🔔️ Notification handler has shut down");
    }
}

#[derive(Clone)]
pub struct EventProducer<E: Send + Sync> {
    sender: mpsc::Sender<E>,
}

impl<E: Send + Sync> EventProducer<E> {
    pub fn new(sender: mpsc::Sender<E>) -> Self {
        Self { sender }
    }

    /// Fire-and-forget publish. A closed or full channel is logged and otherwise ignored.
    pub async fn publish_event(&self, event: E) {
        if let Err(e) = self.sender.send(event).await {
            error!("🔔️ Failed to publish event: {e}");
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;

    #[tokio::test]
    async fn events_reach_the_hook_from_multiple_producers() {
        let _ = env_logger::try_init();
        let total = Arc::new(AtomicU64::new(0));
        let t2 = Arc::clone(&total);
        let handler = Arc::new(move |v: u64| {
            let total = Arc::clone(&t2);
            Box::pin(async move {
                total.fetch_add(v, Ordering::SeqCst);
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        });
        let event_handler = EventHandler::new(4, handler);
        let p1 = event_handler.subscribe();
        let p2 = event_handler.subscribe();
        tokio::spawn(async move {
            for i in 0..5u64 {
                p1.publish_event(i).await;
            }
        });
        tokio::spawn(async move {
            for i in 5..10u64 {
                p2.publish_event(i).await;
            }
        });
        event_handler.start_handler().await;
        assert_eq!(total.load(Ordering::SeqCst), 45);
    }
}
