#![forbid(unsafe_code)]

//! Versioned publication slot for the layout contract.
//!
//! The context publishes a freshly projected contract after every frame;
//! the slot swallows projections equal to the current one so subscribers
//! only hear real changes.
//!
//! # Invariants
//!
//! 1. `version` grows by one per accepted publish, never otherwise.
//! 2. Listeners run in subscription order, outside the interior borrow.
//! 3. A dropped [`Subscription`] removes its listener immediately.
//!
//! # Failure Modes
//!
//! - **Publish from a listener**: the nested publish finishes its own
//!   delivery first; the outer delivery then continues with the value it
//!   started with.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

type Listener<T> = Rc<dyn Fn(&T)>;

struct Slot<T> {
    current: T,
    version: u64,
    next_listener: u64,
    listeners: BTreeMap<u64, Listener<T>>,
}

/// Shared slot holding the last published value. Clones share the slot.
pub struct Published<T> {
    slot: Rc<RefCell<Slot<T>>>,
}

impl<T> Clone for Published<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Published<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.slot.borrow();
        f.debug_struct("Published")
            .field("current", &slot.current)
            .field("version", &slot.version)
            .field("listeners", &slot.listeners.len())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Published<T> {
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self {
            slot: Rc::new(RefCell::new(Slot {
                current: initial,
                version: 0,
                next_listener: 0,
                listeners: BTreeMap::new(),
            })),
        }
    }

    /// The last published value.
    #[must_use]
    pub fn current(&self) -> T {
        self.slot.borrow().current.clone()
    }

    /// Replace the value and notify listeners. Equal values are dropped;
    /// returns whether the value was accepted.
    pub fn publish(&self, value: T) -> bool {
        let listeners: Vec<Listener<T>> = {
            let mut slot = self.slot.borrow_mut();
            if slot.current == value {
                return false;
            }
            slot.current = value.clone();
            slot.version += 1;
            slot.listeners.values().cloned().collect()
        };
        tracing::trace!(listeners = listeners.len(), "layout published");
        for listener in &listeners {
            listener(&value);
        }
        true
    }

    /// Listen for accepted publishes until the guard drops.
    pub fn subscribe(&self, listener: impl Fn(&T) + 'static) -> Subscription {
        let id = {
            let mut slot = self.slot.borrow_mut();
            let id = slot.next_listener;
            slot.next_listener += 1;
            slot.listeners.insert(id, Rc::new(listener));
            id
        };
        let weak: Weak<RefCell<Slot<T>>> = Rc::downgrade(&self.slot);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(slot) = weak.upgrade() {
                    slot.borrow_mut().listeners.remove(&id);
                }
            })),
        }
    }

    /// Accepted publishes so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.slot.borrow().version
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.slot.borrow().listeners.len()
    }

    /// Drop every listener. Outstanding guards become inert.
    pub fn detach_all(&self) {
        self.slot.borrow_mut().listeners.clear();
    }
}

/// Guard returned by [`Published::subscribe`].
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("armed", &self.cancel.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn equal_values_are_not_published() {
        let slot = Published::new("closed");
        assert!(!slot.publish("closed"));
        assert_eq!(slot.version(), 0);
        assert!(slot.publish("open"));
        assert_eq!(slot.version(), 1);
        assert_eq!(slot.current(), "open");
    }

    #[test]
    fn dropping_the_guard_unsubscribes() {
        let slot = Published::new(0);
        let seen = Rc::new(Cell::new(0));
        let sink = Rc::clone(&seen);
        let sub = slot.subscribe(move |v| sink.set(*v));
        slot.publish(7);
        assert_eq!(seen.get(), 7);
        drop(sub);
        assert_eq!(slot.listener_count(), 0);
        slot.publish(9);
        assert_eq!(seen.get(), 7);
    }

    #[test]
    fn listeners_run_in_subscription_order() {
        let slot = Published::new(0);
        let order = Rc::new(RefCell::new(String::new()));
        let first = Rc::clone(&order);
        let second = Rc::clone(&order);
        let _a = slot.subscribe(move |_| first.borrow_mut().push('a'));
        let _b = slot.subscribe(move |_| second.borrow_mut().push('b'));
        slot.publish(1);
        assert_eq!(order.borrow().as_str(), "ab");
    }

    #[test]
    fn publishing_from_a_listener_is_allowed() {
        let slot = Published::new(0);
        let handle = slot.clone();
        let _sub = slot.subscribe(move |v| {
            if *v < 3 {
                handle.publish(v + 1);
            }
        });
        slot.publish(1);
        assert_eq!(slot.current(), 3);
        assert_eq!(slot.version(), 3);
    }

    #[test]
    fn detach_all_leaves_guards_inert() {
        let slot = Published::new(0);
        let sub = slot.subscribe(|_| {});
        slot.detach_all();
        assert_eq!(slot.listener_count(), 0);
        drop(sub);
        drop(slot);
    }
}
