//! # parts_event - Event Bus and Shared Data
//!
//! Decoupled glue between gameplay pieces:
//! - Typed publish/subscribe bus with priority-ordered delivery
//! - Immediate or queued dispatch
//! - Single-type event channels for command inboxes
//! - Shared data cells for values read by many consumers
//!
//! Every subscription receives a published event at most once. A listener
//! that re-subscribes under the same key replaces its earlier handler rather
//! than adding a second one.

pub mod data;

use crossbeam_channel::{Receiver, Sender};
use parts_core::EntityId;
use std::any::{Any, TypeId};
use std::collections::BTreeMap;

pub use data::DataCell;

/// Event priority
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Low = 0,
    #[default]
    Normal = 1,
    High = 2,
    Critical = 3,
}

/// Event envelope containing metadata
pub struct EventEnvelope {
    /// Event type ID
    pub type_id: TypeId,
    /// Event data
    pub data: Box<dyn Any + Send + Sync>,
    /// Priority
    pub priority: Priority,
    /// Frame the event was published in
    pub frame: u64,
    /// Publishing entity, if known
    pub source: Option<EntityId>,
}

impl EventEnvelope {
    /// Create a new envelope
    pub fn new<E: Event>(event: E, priority: Priority, frame: u64) -> Self {
        Self {
            type_id: TypeId::of::<E>(),
            data: Box::new(event),
            priority,
            frame,
            source: None,
        }
    }

    /// Attach the publishing entity
    pub fn with_source(mut self, source: EntityId) -> Self {
        self.source = Some(source);
        self
    }

    /// Try to downcast to specific event type
    pub fn downcast_ref<E: Event>(&self) -> Option<&E> {
        self.data.downcast_ref::<E>()
    }
}

/// Trait for events
pub trait Event: Send + Sync + 'static {}

impl<T: Send + Sync + 'static> Event for T {}

/// Dynamic event handler
pub type DynamicHandler = Box<dyn Fn(&dyn Any) + Send + Sync>;

/// Subscriber ID
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(pub u64);

struct Subscription {
    id: SubscriberId,
    listener: Option<EntityId>,
    priority: Priority,
    handler: DynamicHandler,
}

/// Event bus for publishing and subscribing to events
pub struct EventBus {
    sender: Sender<EventEnvelope>,
    receiver: Receiver<EventEnvelope>,
    handlers: BTreeMap<TypeId, Vec<Subscription>>,
    next_subscriber_id: u64,
    frame: u64,
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self {
            sender,
            receiver,
            handlers: BTreeMap::new(),
            next_subscriber_id: 1,
            frame: 0,
        }
    }

    /// Queue an event for the next `process`
    pub fn publish<E: Event>(&self, event: E) {
        self.publish_with_priority(event, Priority::Normal);
    }

    /// Queue an event with priority
    pub fn publish_with_priority<E: Event>(&self, event: E, priority: Priority) {
        self.publish_envelope(EventEnvelope::new(event, priority, self.frame));
    }

    /// Queue a prepared envelope
    pub fn publish_envelope(&self, envelope: EventEnvelope) {
        // The receiver lives as long as the bus, so send cannot fail here
        if self.sender.send(envelope).is_err() {
            log::error!("event queue disconnected");
        }
    }

    /// Deliver an event right away to every current subscriber
    pub fn emit<E: Event>(&self, event: &E) {
        self.dispatch(TypeId::of::<E>(), event);
    }

    fn dispatch(&self, type_id: TypeId, data: &dyn Any) {
        if let Some(subs) = self.handlers.get(&type_id) {
            for sub in subs {
                (sub.handler)(data);
            }
        }
    }

    /// Subscribe to an event type
    pub fn subscribe<E: Event, F>(&mut self, handler: F) -> SubscriberId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.insert::<E, F>(None, handler, Priority::Normal)
    }

    /// Subscribe with priority
    pub fn subscribe_with_priority<E: Event, F>(
        &mut self,
        handler: F,
        priority: Priority,
    ) -> SubscriberId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.insert::<E, F>(None, handler, priority)
    }

    /// Subscribe on behalf of a listener entity. A listener holds at most one
    /// subscription per event type; subscribing again replaces the old one.
    pub fn subscribe_keyed<E: Event, F>(&mut self, listener: EntityId, handler: F) -> SubscriberId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        if let Some(subs) = self.handlers.get_mut(&TypeId::of::<E>()) {
            subs.retain(|s| s.listener != Some(listener));
        }
        self.insert::<E, F>(Some(listener), handler, Priority::Normal)
    }

    fn insert<E: Event, F>(
        &mut self,
        listener: Option<EntityId>,
        handler: F,
        priority: Priority,
    ) -> SubscriberId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = SubscriberId(self.next_subscriber_id);
        self.next_subscriber_id += 1;

        let type_id = TypeId::of::<E>();
        let wrapped_handler: DynamicHandler = Box::new(move |any: &dyn Any| {
            if let Some(event) = any.downcast_ref::<E>() {
                handler(event);
            }
        });

        let subs = self.handlers.entry(type_id).or_default();
        subs.push(Subscription {
            id,
            listener,
            priority,
            handler: wrapped_handler,
        });
        // Stable sort keeps subscription order within a priority
        subs.sort_by(|a, b| b.priority.cmp(&a.priority));

        id
    }

    /// Unsubscribe. Returns false if the id was unknown.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let mut found = false;
        for subs in self.handlers.values_mut() {
            let before = subs.len();
            subs.retain(|s| s.id != id);
            found |= subs.len() != before;
        }
        found
    }

    /// Drop every subscription held by a listener entity
    pub fn unsubscribe_listener(&mut self, listener: EntityId) {
        for subs in self.handlers.values_mut() {
            subs.retain(|s| s.listener != Some(listener));
        }
    }

    /// Number of subscribers for an event type
    pub fn subscriber_count<E: Event>(&self) -> usize {
        self.handlers
            .get(&TypeId::of::<E>())
            .map(|s| s.len())
            .unwrap_or(0)
    }

    /// Deliver all queued events, highest priority first
    pub fn process(&mut self) -> usize {
        let mut events: Vec<EventEnvelope> = self.receiver.try_iter().collect();
        events.sort_by(|a, b| b.priority.cmp(&a.priority));

        let count = events.len();
        for envelope in events {
            self.dispatch(envelope.type_id, envelope.data.as_ref());
        }

        self.frame += 1;
        count
    }

    /// Clear all events without processing
    pub fn clear(&self) {
        while self.receiver.try_recv().is_ok() {}
    }

    /// Get pending event count
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Check if there are pending events
    pub fn has_pending(&self) -> bool {
        !self.receiver.is_empty()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Channel for single-type events
///
/// Cloning a channel yields another handle on the same queue, which is how a
/// manager hands out an inbox to the things that send it commands.
pub struct EventChannel<E: Event> {
    sender: Sender<E>,
    receiver: Receiver<E>,
}

impl<E: Event> EventChannel<E> {
    /// Create a new channel
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self { sender, receiver }
    }

    /// Send an event
    pub fn send(&self, event: E) {
        if self.sender.send(event).is_err() {
            log::error!("event channel disconnected");
        }
    }

    /// Receive an event
    pub fn receive(&self) -> Option<E> {
        self.receiver.try_recv().ok()
    }

    /// Drain all events
    pub fn drain(&self) -> Vec<E> {
        self.receiver.try_iter().collect()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Get pending count
    pub fn len(&self) -> usize {
        self.receiver.len()
    }
}

impl<E: Event> Clone for EventChannel<E> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            receiver: self.receiver.clone(),
        }
    }
}

impl<E: Event> Default for EventChannel<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> std::fmt::Debug for EventChannel<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventChannel").field("pending", &self.len()).finish()
    }
}

/// Prelude
pub mod prelude {
    pub use crate::data::DataCell;
    pub use crate::{Event, EventBus, EventChannel, EventEnvelope, Priority, SubscriberId};
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct TestEvent(i32);
    struct OtherEvent;

    #[test]
    fn test_event_bus() {
        let mut bus = EventBus::new();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        bus.subscribe(move |_: &TestEvent| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(TestEvent(42));
        assert_eq!(bus.pending_count(), 1);
        assert_eq!(bus.process(), 1);

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(!bus.has_pending());
    }

    #[test]
    fn test_emit_is_immediate() {
        let mut bus = EventBus::new();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        bus.subscribe(move |e: &TestEvent| seen_clone.lock().push(e.0));

        bus.emit(&TestEvent(7));
        assert_eq!(*seen.lock(), vec![7]);
        assert!(!bus.has_pending());
    }

    #[test]
    fn test_unsubscribe() {
        let mut bus = EventBus::new();
        let counter = Arc::new(AtomicU32::new(0));
        let c = counter.clone();
        let id = bus.subscribe(move |_: &TestEvent| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(TestEvent(1));
        assert!(bus.unsubscribe(id));
        bus.process();
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert!(!bus.unsubscribe(id));
    }

    #[test]
    fn test_keyed_subscription_delivers_once() {
        let mut bus = EventBus::new();
        let counter = Arc::new(AtomicU32::new(0));
        let listener = EntityId::from_raw(5);

        for _ in 0..3 {
            let c = counter.clone();
            bus.subscribe_keyed(listener, move |_: &TestEvent| {
                c.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(bus.subscriber_count::<TestEvent>(), 1);

        bus.emit(&TestEvent(0));
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        bus.unsubscribe_listener(listener);
        bus.emit(&TestEvent(0));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_types_are_isolated() {
        let mut bus = EventBus::new();
        let counter = Arc::new(AtomicU32::new(0));
        let c = counter.clone();
        bus.subscribe(move |_: &OtherEvent| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        bus.publish(TestEvent(1));
        bus.process();
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_event_channel() {
        let channel: EventChannel<TestEvent> = EventChannel::new();
        let sender = channel.clone();

        sender.send(TestEvent(1));
        sender.send(TestEvent(2));
        channel.send(TestEvent(3));
        assert_eq!(channel.len(), 3);

        let events = channel.drain();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].0, 1);
        assert_eq!(events[1].0, 2);
        assert_eq!(events[2].0, 3);
        assert!(channel.receive().is_none());
    }

    #[test]
    fn test_priority() {
        let mut bus = EventBus::new();
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let order1 = order.clone();
        let order2 = order.clone();

        bus.subscribe_with_priority(
            move |e: &TestEvent| {
                order1.lock().push(("low", e.0));
            },
            Priority::Low,
        );

        bus.subscribe_with_priority(
            move |e: &TestEvent| {
                order2.lock().push(("high", e.0));
            },
            Priority::High,
        );

        bus.publish(TestEvent(42));
        bus.process();

        let received = order.lock();
        assert_eq!(received[0].0, "high");
        assert_eq!(received[1].0, "low");
    }
}
