//! Synchronous change notification for the schema model.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::{FieldId, TableId};

/// What changed in a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaEvent {
    TableAdded(TableId),
    /// Fields, relationships or indexes of the table changed.
    TableChanged(TableId),
    FieldChanged { table: TableId, field: FieldId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = dyn FnMut(&SchemaEvent);

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    handlers: Vec<(SubscriptionId, Rc<RefCell<Handler>>)>,
}

/// Callback registry fired on every schema mutation.
///
/// Handles are cheap clones sharing one registry, so a handler may hold a
/// clone and subscribe or unsubscribe while an event is being delivered.
/// Delivery iterates a snapshot taken when the event fires: registry changes
/// made during delivery apply from the next event, and a handler that is
/// already running is not called again re-entrantly.
#[derive(Clone, Default)]
pub struct ChangeNotifier {
    subscribers: Rc<RefCell<Subscribers>>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: FnMut(&SchemaEvent) + 'static,
    {
        let mut subscribers = self.subscribers.borrow_mut();
        let id = SubscriptionId(subscribers.next_id);
        subscribers.next_id += 1;
        let handler: Rc<RefCell<Handler>> = Rc::new(RefCell::new(handler));
        subscribers.handlers.push((id, handler));
        id
    }

    /// Returns false when `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.borrow_mut();
        let before = subscribers.handlers.len();
        subscribers.handlers.retain(|(sid, _)| *sid != id);
        subscribers.handlers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().handlers.len()
    }

    pub fn notify(&self, event: &SchemaEvent) {
        let snapshot: Vec<Rc<RefCell<Handler>>> = self
            .subscribers
            .borrow()
            .handlers
            .iter()
            .map(|(_, handler)| Rc::clone(handler))
            .collect();

        for handler in snapshot {
            if let Ok(mut handler) = handler.try_borrow_mut() {
                (&mut *handler)(event);
            }
        }
    }
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivers_to_all_subscribers() {
        let notifier = ChangeNotifier::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        for tag in 0..2 {
            let seen = Rc::clone(&seen);
            notifier.subscribe(move |event| seen.borrow_mut().push((tag, *event)));
        }

        let event = SchemaEvent::TableChanged(TableId(3));
        notifier.notify(&event);
        assert_eq!(*seen.borrow(), vec![(0, event), (1, event)]);
    }

    #[test]
    fn test_unsubscribe() {
        let notifier = ChangeNotifier::new();
        let count = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&count);
        let id = notifier.subscribe(move |_| *counter.borrow_mut() += 1);

        notifier.notify(&SchemaEvent::TableAdded(TableId(0)));
        assert!(notifier.unsubscribe(id));
        assert!(!notifier.unsubscribe(id));
        notifier.notify(&SchemaEvent::TableAdded(TableId(0)));
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn test_subscribing_during_delivery() {
        let notifier = ChangeNotifier::new();
        let calls = Rc::new(RefCell::new(0));

        let handle = notifier.clone();
        let inner_calls = Rc::clone(&calls);
        notifier.subscribe(move |_| {
            let calls = Rc::clone(&inner_calls);
            handle.subscribe(move |_| *calls.borrow_mut() += 1);
        });

        notifier.notify(&SchemaEvent::TableAdded(TableId(0)));
        assert_eq!(*calls.borrow(), 0);
        assert_eq!(notifier.subscriber_count(), 2);

        notifier.notify(&SchemaEvent::TableAdded(TableId(0)));
        assert_eq!(*calls.borrow(), 1);
        assert_eq!(notifier.subscriber_count(), 3);
    }

    #[test]
    fn test_unsubscribing_self_during_delivery() {
        let notifier = ChangeNotifier::new();
        let handle = notifier.clone();
        let own_id = Rc::new(RefCell::new(None));
        let id_slot = Rc::clone(&own_id);

        let id = notifier.subscribe(move |_| {
            if let Some(id) = *id_slot.borrow() {
                handle.unsubscribe(id);
            }
        });
        *own_id.borrow_mut() = Some(id);

        notifier.notify(&SchemaEvent::TableAdded(TableId(0)));
        assert_eq!(notifier.subscriber_count(), 0);
    }
}
