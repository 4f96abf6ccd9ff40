//! Push-based subscription plumbing shared by sources and projections.

use core::mem;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// A boxed change callback, the unit of subscription.
pub type Callback<E> = Box<dyn FnMut(&E)>;

struct SetInner<E> {
    entries: Vec<(u64, Callback<E>)>,
    next_id: u64,
    notifying: bool,
    // Registrations and cancellations that arrive mid-delivery; merged after the pass so a
    // subscriber added during a notification never observes the in-flight event.
    pending_add: Vec<(u64, Callback<E>)>,
    pending_remove: Vec<u64>,
    // Live registrations, maintained on subscribe/cancel. `entries` is taken out of the cell
    // during delivery, so it cannot be counted directly mid-notify.
    live: usize,
}

/// An [`Rc`]-shared registry of callbacks for one event stream.
///
/// Delivery is synchronous and in registration order. Subscribing or cancelling from inside a
/// callback is safe; the change takes effect after the current pass.
pub struct SubscriberSet<E> {
    inner: Rc<RefCell<SetInner<E>>>,
}

impl<E> Clone for SubscriberSet<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<E: 'static> Default for SubscriberSet<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: 'static> SubscriberSet<E> {
    #[allow(missing_docs)]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(SetInner {
                entries: Vec::new(),
                next_id: 0,
                notifying: false,
                pending_add: Vec::new(),
                pending_remove: Vec::new(),
                live: 0,
            })),
        }
    }

    /// Registers `callback`, returning a [`Subscription`] that cancels it when dropped.
    pub fn subscribe(&self, callback: Callback<E>) -> Subscription {
        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.live += 1;
            if inner.notifying {
                inner.pending_add.push((id, callback));
            } else {
                inner.entries.push((id, callback));
            }
            id
        };
        let weak = Rc::downgrade(&self.inner);
        Subscription::new(move || cancel(&weak, id))
    }

    /// Number of live registrations, counting ones still pending merge.
    pub fn len(&self) -> usize {
        self.inner.borrow().live
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delivers `event` to every live subscriber.
    ///
    /// # Panics
    ///
    /// Panics on re-entrant notification of the same set: a subscriber synchronously producing
    /// another event on the stream it is subscribed to violates the single-writer delivery
    /// contract and would otherwise deliver into a half-updated registry.
    pub fn notify(&self, event: &E) {
        let mut entries = {
            let mut inner = self.inner.borrow_mut();
            assert!(
                !inner.notifying,
                "re-entrant notification on a subscriber set; do not mutate a list from inside \
                 one of its own change handlers"
            );
            inner.notifying = true;
            mem::take(&mut inner.entries)
        };

        for (id, callback) in entries.iter_mut() {
            let cancelled = self.inner.borrow().pending_remove.contains(id);
            if !cancelled {
                callback(event);
            }
        }

        let mut inner = self.inner.borrow_mut();
        inner.entries = entries;
        let removed = mem::take(&mut inner.pending_remove);
        if !removed.is_empty() {
            inner.entries.retain(|(id, _)| !removed.contains(id));
        }
        let mut added = mem::take(&mut inner.pending_add);
        inner.entries.append(&mut added);
        inner.notifying = false;
    }
}

fn cancel<E>(weak: &Weak<RefCell<SetInner<E>>>, id: u64) {
    // The whole set may already be gone; cancellation is then moot.
    if let Some(inner) = weak.upgrade() {
        let mut inner = inner.borrow_mut();
        if inner.notifying {
            // The registration is either still pending merge or among the in-flight entries;
            // either way it was live until now.
            let pending_len = inner.pending_add.len();
            inner.pending_add.retain(|(entry_id, _)| *entry_id != id);
            if inner.pending_add.len() == pending_len {
                inner.pending_remove.push(id);
            }
            inner.live -= 1;
        } else {
            let entries_len = inner.entries.len();
            inner.entries.retain(|(entry_id, _)| *entry_id != id);
            if inner.entries.len() < entries_len {
                inner.live -= 1;
            }
        }
    }
}

/// RAII cancellation token for one registration on a [`SubscriberSet`].
///
/// Dropping the token cancels the registration; [`detach`](Subscription::detach) keeps it alive
/// for the lifetime of the stream instead. Cancellation is idempotent.
#[must_use = "dropping a Subscription immediately cancels it; call `.detach()` to keep it alive"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub(crate) fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A token that was never subscribed to anything; cancelling it is a no-op.
    pub fn empty() -> Self {
        Self { cancel: None }
    }

    /// Cancels the registration now instead of at drop time.
    pub fn unsubscribe(mut self) {
        self.run_cancel();
    }

    /// Consumes the token without cancelling, leaving the callback registered for the lifetime
    /// of its stream.
    pub fn detach(mut self) {
        self.cancel = None;
    }

    fn run_cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn delivers_in_registration_order_and_stops_after_cancel() {
        let set = SubscriberSet::<u32>::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let first = set.subscribe(Box::new(crate::clone!((seen) move |event: &u32| {
            seen.borrow_mut().push(("first", *event));
        })));
        let _second = set.subscribe(Box::new(crate::clone!((seen) move |event: &u32| {
            seen.borrow_mut().push(("second", *event));
        })));

        set.notify(&1);
        first.unsubscribe();
        set.notify(&2);

        assert_eq!(
            *seen.borrow(),
            [("first", 1), ("second", 1), ("second", 2)],
            "cancelled subscriber kept receiving events"
        );
    }

    #[test]
    fn subscribing_mid_notify_skips_the_in_flight_event() {
        let set = SubscriberSet::<u32>::new();
        let late_count = Rc::new(Cell::new(0u32));

        let set_handle = set.clone();
        let late_count_inner = late_count.clone();
        set.subscribe(Box::new(move |_event: &u32| {
            set_handle
                .subscribe(Box::new(crate::clone!((late_count_inner) move |_event: &u32| {
                    late_count_inner.set(late_count_inner.get() + 1);
                })))
                .detach();
        }))
        .detach();

        set.notify(&1);
        assert_eq!(late_count.get(), 0, "mid-notify subscriber saw the in-flight event");
        set.notify(&2);
        // One registration from the first pass, another from the second.
        assert_eq!(late_count.get(), 1);
    }

    #[test]
    fn cancelling_mid_notify_suppresses_later_delivery_in_the_same_pass() {
        let set = SubscriberSet::<u32>::new();
        let second_calls = Rc::new(Cell::new(0u32));

        let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        set.subscribe(Box::new(crate::clone!((slot) move |_event: &u32| {
            if let Some(subscription) = slot.borrow_mut().take() {
                subscription.unsubscribe();
            }
        })))
        .detach();
        let second = set.subscribe(Box::new(crate::clone!((second_calls) move |_event: &u32| {
            second_calls.set(second_calls.get() + 1);
        })));
        *slot.borrow_mut() = Some(second);

        set.notify(&1);
        set.notify(&2);
        assert_eq!(second_calls.get(), 0, "subscriber ran after being cancelled mid-pass");
    }

    #[test]
    fn len_is_queryable_mid_notify_after_a_cancel() {
        let set = SubscriberSet::<u32>::new();
        let observed = Rc::new(Cell::new(usize::MAX));

        let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let set_handle = set.clone();
        set.subscribe(Box::new(crate::clone!((slot, observed) move |_event: &u32| {
            if let Some(subscription) = slot.borrow_mut().take() {
                subscription.unsubscribe();
            }
            observed.set(set_handle.len());
        })))
        .detach();
        let second = set.subscribe(Box::new(|_event: &u32| {}));
        *slot.borrow_mut() = Some(second);

        assert_eq!(set.len(), 2);
        set.notify(&1);
        assert_eq!(observed.get(), 1, "mid-notify len after a cancel");
        assert_eq!(set.len(), 1);
        assert!(!set.is_empty());
    }

    #[test]
    fn double_cancel_is_a_no_op() {
        let set = SubscriberSet::<u32>::new();
        let subscription = set.subscribe(Box::new(|_event| {}));
        subscription.unsubscribe();
        // The set itself outliving its subscriptions, and vice versa, must both be fine.
        drop(set);
        Subscription::empty().unsubscribe();
    }
}
