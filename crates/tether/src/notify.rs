//! Collection change notifier.
//!
//! Subscribers receive a full-collection snapshot reference after any
//! mutation. Notification fires only once the collection has settled into
//! its new state, never mid-mutation; the controller owns that ordering.

use crate::record::Record;
use std::{cell::{Cell, RefCell}, rc::Rc};

///
/// SubscriptionId
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SubscriptionId(u64);

type Subscriber = Rc<dyn Fn(&[Rc<Record>])>;

///
/// ChangeNotifier
///

#[derive(Default)]
pub(crate) struct ChangeNotifier {
    subscribers: RefCell<Vec<(SubscriptionId, Subscriber)>>,
    next_id: Cell<u64>,
}

impl ChangeNotifier {
    pub fn subscribe(&self, subscriber: impl Fn(&[Rc<Record>]) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);

        self.subscribers
            .borrow_mut()
            .push((id, Rc::new(subscriber)));

        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.subscribers.borrow_mut().retain(|(sid, _)| *sid != id);
    }

    /// Deliver the settled collection to every subscriber.
    ///
    /// Subscribers are snapshotted first so one may subscribe or
    /// unsubscribe during delivery.
    pub fn emit(&self, records: &[Rc<Record>]) {
        let snapshot: Vec<Subscriber> = self
            .subscribers
            .borrow()
            .iter()
            .map(|(_, subscriber)| subscriber.clone())
            .collect();

        for subscriber in snapshot {
            subscriber(records);
        }
    }

    pub fn clear(&self) {
        self.subscribers.borrow_mut().clear();
    }
}
