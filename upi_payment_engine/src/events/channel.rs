//! Per-event-type delivery queue.
//!
//! Each hook gets its own bounded queue and dispatcher task, and every event runs the hook in a task of its own. The
//! coordinator holds the [`EventProducer`]s. Hooks receive a copy of the event and nothing else.
use std::{future::Future, pin::Pin, sync::Arc};

use log::*;
use tokio::{sync::mpsc, task::JoinSet};

pub type Handler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

pub struct EventHandler<E: Send + Sync + 'static> {
    inbox: mpsc::Receiver<E>,
    seed: mpsc::Sender<E>,
    hook: Handler<E>,
}

impl<E: Send + Sync + 'static> EventHandler<E> {
    pub fn new(buffer_size: usize, hook: Handler<E>) -> Self {
        let (seed, inbox) = mpsc::channel(buffer_size);
        Self { inbox, seed, hook }
    }

    pub fn subscribe(&self) -> EventProducer<E> {
        EventProducer::new(self.seed.clone())
    }

    /// Dispatches events until the last producer is dropped, then waits for running hooks to finish.
    pub async fn start_handler(self) {
        let Self { mut inbox, seed, hook } = self;
        // The queue must close once the coordinator's producers are gone
        drop(seed);
        debug!("📬️ Event dispatcher is running");
        let mut running = JoinSet::new();
        let mut dispatched = 0usize;
        while let Some(event) = inbox.recv().await {
            running.spawn(hook(event));
            dispatched += 1;
            while let Some(done) = running.try_join_next() {
                report(done);
            }
        }
        debug!("📬️ All producers are gone after {dispatched} events. {} hooks still running", running.len());
        while let Some(done) = running.join_next().await {
            report(done);
        }
        debug!("📬️ Event dispatcher stopped");
    }
}

fn report(done: Result<(), tokio::task::JoinError>) {
    if let Err(e) = done {
        warn!("📬️ An event hook did not complete: {e}");
    }
}

#[derive(Clone)]
pub struct EventProducer<E: Send + Sync> {
    queue: mpsc::Sender<E>,
}

impl<E: Send + Sync> EventProducer<E> {
    pub fn new(queue: mpsc::Sender<E>) -> Self {
        Self { queue }
    }

    /// Queues the event, waiting for room if the hook is behind. An event is dropped, with an error logged, only when
    /// the dispatcher has already stopped.
    pub async fn publish_event(&self, event: E) {
        if self.queue.send(event).await.is_err() {
            error!("📬️ The event dispatcher has stopped. An event was dropped.");
        }
    }
}
