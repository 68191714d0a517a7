//! Multicast delivery of unsolicited native events
//!
//! Two independent channels, `purchasesUpdated` and
//! `billingServiceDisconnected`. Each keeps a registry of subscriber handlers
//! keyed by subscription id. Emitting takes a snapshot of the registry and
//! calls every handler in it, so subscribing or unsubscribing from inside a
//! handler never deadlocks and only affects later events.
//!
//! Events are not buffered: a subscriber sees only events emitted while it is
//! registered.
//!
//! Handlers run on whatever thread the native layer reports from. A handler
//! that panics is logged and skipped; the remaining handlers still run.
//!
//! # Architecture
//!
//! ```text
//! EventBroadcaster
//!     ├── Arc<Channel<PurchasesUpdatedEvent>>     ─┐
//!     └── Arc<Channel<ServiceDisconnectedEvent>>  ─┴─ DashMap<id, handler>
//!
//! Subscription ──Weak──► Channel   (unsubscribes on remove() or drop)
//! ```

use crate::types::{
    PurchasesUpdatedEvent, ServiceDisconnectedEvent, PURCHASES_UPDATED_EVENT,
    SERVICE_DISCONNECTED_EVENT,
};
use dashmap::DashMap;
use futures::channel::mpsc;
use futures::{Stream, StreamExt};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use tracing::{debug, trace, warn};

type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

trait Unsubscribe: Send + Sync {
    fn unsubscribe(&self, id: u64) -> bool;
}

struct Channel<E> {
    name: &'static str,
    handlers: DashMap<u64, Handler<E>>,
}

impl<E> Channel<E> {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            handlers: DashMap::new(),
        }
    }

    fn emit(&self, event: &E) {
        let snapshot: Vec<Handler<E>> = self
            .handlers
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        debug!(
            channel = self.name,
            subscribers = snapshot.len(),
            "emitting event"
        );
        for (index, handler) in snapshot.into_iter().enumerate() {
            // Handlers run on the native callback thread; a panic must not take it down.
            if panic::catch_unwind(AssertUnwindSafe(|| handler(event))).is_err() {
                warn!(channel = self.name, index, "event handler panicked");
            }
        }
    }
}

impl<E> Unsubscribe for Channel<E> {
    fn unsubscribe(&self, id: u64) -> bool {
        let removed = self.handlers.remove(&id).is_some();
        if removed {
            trace!(channel = self.name, id, "subscriber removed");
        }
        removed
    }
}

/// Handle to a live subscription
///
/// Unsubscribes when [`Subscription::remove`] is called or when the handle is
/// dropped.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    channel: &'static str,
    registry: Weak<dyn Unsubscribe>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Name of the channel this subscription listens on
    pub fn channel(&self) -> &'static str {
        self.channel
    }

    /// Stop receiving events
    pub fn remove(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.unsubscribe(self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("channel", &self.channel)
            .finish()
    }
}

/// Events of one channel as a `Stream`
///
/// Holds its subscription; dropping the stream unsubscribes.
pub struct EventStream<E> {
    receiver: mpsc::UnboundedReceiver<E>,
    subscription: Subscription,
}

impl<E> EventStream<E> {
    pub fn subscription_id(&self) -> u64 {
        self.subscription.id()
    }
}

impl<E> Stream for EventStream<E> {
    type Item = E;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<E>> {
        self.receiver.poll_next_unpin(cx)
    }
}

impl<E> fmt::Debug for EventStream<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("subscription", &self.subscription)
            .finish()
    }
}

/// Fan-out of native push notifications to every current subscriber
pub struct EventBroadcaster {
    next_id: AtomicU64,
    purchases_updated: Arc<Channel<PurchasesUpdatedEvent>>,
    service_disconnected: Arc<Channel<ServiceDisconnectedEvent>>,
}

impl EventBroadcaster {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            purchases_updated: Arc::new(Channel::new(PURCHASES_UPDATED_EVENT)),
            service_disconnected: Arc::new(Channel::new(SERVICE_DISCONNECTED_EVENT)),
        }
    }

    /// Subscribe to purchase-state changes
    ///
    /// `handler` runs on the native callback thread and should return quickly.
    pub fn on_purchases_updated<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&PurchasesUpdatedEvent) + Send + Sync + 'static,
    {
        self.subscribe(&self.purchases_updated, Arc::new(handler))
    }

    /// Subscribe to unsolicited connection loss
    ///
    /// `handler` runs on the native callback thread and should return quickly.
    pub fn on_service_disconnected<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&ServiceDisconnectedEvent) + Send + Sync + 'static,
    {
        self.subscribe(&self.service_disconnected, Arc::new(handler))
    }

    pub fn purchases_updated_stream(&self) -> EventStream<PurchasesUpdatedEvent> {
        self.stream(&self.purchases_updated)
    }

    pub fn service_disconnected_stream(&self) -> EventStream<ServiceDisconnectedEvent> {
        self.stream(&self.service_disconnected)
    }

    pub fn emit_purchases_updated(&self, event: &PurchasesUpdatedEvent) {
        self.purchases_updated.emit(event);
    }

    pub fn emit_service_disconnected(&self) {
        self.service_disconnected.emit(&ServiceDisconnectedEvent {});
    }

    pub fn purchases_updated_subscribers(&self) -> usize {
        self.purchases_updated.handlers.len()
    }

    pub fn service_disconnected_subscribers(&self) -> usize {
        self.service_disconnected.handlers.len()
    }

    fn subscribe<E: 'static>(&self, channel: &Arc<Channel<E>>, handler: Handler<E>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        channel.handlers.insert(id, handler);
        trace!(channel = channel.name, id, "subscriber added");

        let registry: Weak<Channel<E>> = Arc::downgrade(channel);
        Subscription {
            id,
            channel: channel.name,
            registry,
        }
    }

    fn stream<E: Clone + Send + 'static>(&self, channel: &Arc<Channel<E>>) -> EventStream<E> {
        let (sender, receiver) = mpsc::unbounded();
        let subscription = self.subscribe(
            channel,
            Arc::new(move |event: &E| {
                // The receiver is gone only while its stream is being dropped.
                let _ = sender.unbounded_send(event.clone());
            }),
        );
        EventStream {
            receiver,
            subscription,
        }
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBroadcaster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBroadcaster")
            .field("purchases_updated", &self.purchases_updated_subscribers())
            .field("service_disconnected", &self.service_disconnected_subscribers())
            .finish()
    }
}
