//! The mutable observable collection that projections wrap.

use crate::event::ListEvent;
use crate::identity::Identify;
use crate::subscriber::{Callback, SubscriberSet, Subscription};
use crate::watch::Tracked;
use core::mem;
use dyn_clone::{DynClone, clone_trait_object};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
#[cfg(feature = "tracing")]
use tracing::debug;

/// Coalescing floor: batches at or below this many events are always delivered granularly, so
/// incremental consumers keep their per-element state for ordinary edits.
const RESET_MIN_BATCH: usize = 10;

/// Default ratio of batch size to pre-batch length above which a batch collapses to
/// [`ListEvent::Reset`].
const DEFAULT_RESET_THRESHOLD: f32 = 0.3;

/// The ordered-sequence-plus-change-streams contract a
/// [`DerivedList`](crate::derived::DerivedList) consumes.
///
/// Implemented by [`ObservableList`] and by [`DerivedList`](crate::derived::DerivedList) itself,
/// which is what lets projections nest transparently. Implementations are cheap cloneable
/// handles, erased via [`dyn-clone`](dyn_clone) so consumers can hold a
/// `Box<dyn ListSource<T>>`.
pub trait ListSource<T>: DynClone + 'static {
    /// Current number of elements.
    fn len(&self) -> usize;

    /// Returns a clone of the element at `index`, or [`None`] out of bounds.
    fn get(&self, index: usize) -> Option<T>;

    /// Visits every element in order.
    fn for_each(&self, f: &mut dyn FnMut(&T));

    /// Subscribes to the structural change stream.
    fn on_change(&self, callback: Callback<ListEvent<T>>) -> Subscription;

    /// Subscribes to element-level change notifications, which deliver the changed element
    /// itself rather than a position.
    fn on_item_changed(&self, callback: Callback<T>) -> Subscription;

    #[allow(missing_docs)]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

clone_trait_object!(<T> ListSource<T>);

type TrackHook<T> = Box<dyn Fn(&T) -> Subscription>;

struct TrackEntry<T> {
    item: T,
    occurrences: usize,
    // Dropping the entry cancels the element's watcher; without weak references this eviction is
    // what keeps the table from growing unboundedly.
    _watch: Subscription,
}

struct ListInner<T> {
    vec: RefCell<Vec<T>>,
    pending: RefCell<Vec<ListEvent<T>>>,
    changes: SubscriberSet<ListEvent<T>>,
    item_changed: SubscriberSet<T>,
    reset_threshold: Cell<f32>,
    track_hook: RefCell<Option<TrackHook<T>>>,
    track_table: RefCell<Vec<TrackEntry<T>>>,
}

/// An ordered, mutable sequence that emits granular [`ListEvent`]s, coalescing oversized batches
/// into a single [`ListEvent::Reset`].
///
/// `ObservableList` is a cheap cloneable handle; all clones share the same storage and
/// subscriber sets. Single mutations ([`push`](ObservableList::push),
/// [`remove_at`](ObservableList::remove_at), ...) emit immediately; batched edits go through
/// [`write`](ObservableList::write), which delivers the whole batch when the guard drops.
///
/// # Example
///
/// ```
/// use miravec::prelude::*;
///
/// let list = ObservableList::from(["Foo", "Bar"]);
/// let subscription = list.on_change(Box::new(|event| println!("{event:?}")));
/// list.push("Baz"); // prints `Added { from: 2, items: ["Baz"] }`
/// # drop(subscription);
/// ```
pub struct ObservableList<T> {
    inner: Rc<ListInner<T>>,
}

impl<T> Clone for ObservableList<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> Default for ObservableList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> ObservableList<T> {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(ListInner {
                vec: RefCell::new(Vec::new()),
                pending: RefCell::new(Vec::new()),
                changes: SubscriberSet::new(),
                item_changed: SubscriberSet::new(),
                reset_threshold: Cell::new(DEFAULT_RESET_THRESHOLD),
                track_hook: RefCell::new(None),
                track_table: RefCell::new(Vec::new()),
            }),
        }
    }
}

impl<T> ObservableList<T>
where
    T: Clone + Identify + 'static,
{
    /// Current number of elements.
    pub fn len(&self) -> usize {
        self.inner.vec.borrow().len()
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.inner.vec.borrow().is_empty()
    }

    /// Returns a clone of the element at `index`, or [`None`] out of bounds.
    pub fn get(&self, index: usize) -> Option<T> {
        self.inner.vec.borrow().get(index).cloned()
    }

    /// Clones the current contents into a plain [`Vec`].
    pub fn snapshot(&self) -> Vec<T> {
        self.inner.vec.borrow().clone()
    }

    /// Visits every element in order.
    pub fn for_each(&self, mut f: impl FnMut(&T)) {
        for item in self.inner.vec.borrow().iter() {
            f(item);
        }
    }

    /// Index of the first element identical to `item` (see [`Identify`]), if any.
    pub fn index_of(&self, item: &T) -> Option<usize> {
        self.inner.vec.borrow().iter().position(|other| other.identity_eq(item))
    }

    /// Opens a write guard for a batched edit; the queued events are delivered (or coalesced to
    /// a single [`ListEvent::Reset`]) when the guard drops.
    pub fn write(&self) -> WriteGuard<'_, T> {
        WriteGuard {
            list: self,
            len_at_open: self.len(),
        }
    }

    /// Appends an element, emitting [`ListEvent::Added`].
    pub fn push(&self, value: T) {
        self.write().push(value);
    }

    /// Removes and returns the last element, emitting [`ListEvent::Removed`], if any.
    pub fn pop(&self) -> Option<T> {
        self.write().pop()
    }

    /// Inserts `value` at `index`, emitting [`ListEvent::Added`].
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn insert(&self, index: usize, value: T) {
        self.write().insert(index, value);
    }

    /// Removes and returns the element at `index`, emitting [`ListEvent::Removed`].
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn remove_at(&self, index: usize) -> T {
        self.write().remove(index)
    }

    /// Removes the first element identical to `item`, emitting [`ListEvent::Removed`], and
    /// returns it if one was present.
    pub fn remove_item(&self, item: &T) -> Option<T> {
        self.write().remove_item(item)
    }

    /// Removes the first occurrence of each of `items`, emitting one [`ListEvent::Removed`] per
    /// element found.
    pub fn remove_all(&self, items: &[T]) {
        self.write().remove_all(items);
    }

    /// Overwrites the element at `index`, emitting [`ListEvent::Replaced`], and returns the
    /// previous value.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn set(&self, index: usize, value: T) -> T {
        self.write().set(index, value)
    }

    /// Moves the element at `from` to `to`, emitting a single-element [`ListEvent::Moved`].
    /// No-op when `from == to`.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of bounds.
    pub fn move_item(&self, from: usize, to: usize) {
        self.write().move_item(from, to);
    }

    /// Removes every element.
    pub fn clear(&self) {
        self.write().clear();
    }

    /// Replaces the entire contents with `values`.
    pub fn replace(&self, values: impl Into<Vec<T>>) {
        self.write().replace(values);
    }

    /// Keeps only the elements for which `keep` returns `true`, emitting one
    /// [`ListEvent::Removed`] per dropped element.
    pub fn retain(&self, keep: impl FnMut(&T) -> bool) {
        self.write().retain(keep);
    }

    /// Subscribes to the structural change stream.
    pub fn on_change(&self, callback: Callback<ListEvent<T>>) -> Subscription {
        self.inner.changes.subscribe(callback)
    }

    /// Subscribes to element-level change notifications.
    pub fn on_item_changed(&self, callback: Callback<T>) -> Subscription {
        self.inner.item_changed.subscribe(callback)
    }

    /// Delivers an element-level change notification for `item`.
    ///
    /// The escape hatch for element types without [`Tracked`] wiring: callers that mutated an
    /// element's interior state announce it here.
    pub fn notify_item_changed(&self, item: &T) {
        self.inner.item_changed.notify(item);
    }

    /// Adjusts the batch-size-to-length ratio above which a batched edit coalesces into one
    /// [`ListEvent::Reset`]. [`f32::INFINITY`] disables coalescing.
    pub fn set_reset_threshold(&self, threshold: f32) {
        self.inner.reset_threshold.set(threshold);
    }

    /// Wires every current and future element's change stream (see [`Tracked`]) into this
    /// list's item-changed stream.
    ///
    /// Watchers are refcounted per element identity, so a reference-duplicated element holds one
    /// watcher, and are evicted when the last occurrence leaves the list.
    pub fn track_item_changes(&self)
    where
        T: Tracked,
    {
        let weak = Rc::downgrade(&self.inner);
        let hook: TrackHook<T> = Box::new(move |item: &T| {
            let captured = item.clone();
            let weak = weak.clone();
            item.watch(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.item_changed.notify(&captured);
                }
            }))
        });
        *self.inner.track_hook.borrow_mut() = Some(hook);
        for item in self.inner.vec.borrow().iter() {
            self.inner.track_add(item);
        }
    }
}

impl<T> ListInner<T>
where
    T: Clone + Identify + 'static,
{
    fn track_add(&self, item: &T) {
        let hook = self.track_hook.borrow();
        let Some(hook) = hook.as_ref() else { return };
        let mut table = self.track_table.borrow_mut();
        match table.iter_mut().find(|entry| entry.item.identity_eq(item)) {
            Some(entry) => entry.occurrences += 1,
            None => {
                let watch = hook(item);
                table.push(TrackEntry {
                    item: item.clone(),
                    occurrences: 1,
                    _watch: watch,
                });
            }
        }
    }

    fn track_remove(&self, item: &T) {
        if self.track_hook.borrow().is_none() {
            return;
        }
        let mut table = self.track_table.borrow_mut();
        if let Some(position) = table.iter().position(|entry| entry.item.identity_eq(item)) {
            table[position].occurrences -= 1;
            if table[position].occurrences == 0 {
                table.swap_remove(position);
            }
        }
    }

    fn flush(&self, len_at_open: usize) {
        let pending = mem::take(&mut *self.pending.borrow_mut());
        if pending.is_empty() {
            return;
        }
        let threshold = self.reset_threshold.get();
        let coalesce =
            pending.len() > RESET_MIN_BATCH && pending.len() as f32 > threshold * len_at_open as f32;
        #[cfg(feature = "tracing")]
        debug!(
            batch = pending.len(),
            len_at_open, coalesce, "flushing observable list batch"
        );
        if coalesce {
            self.changes.notify(&ListEvent::Reset);
        } else {
            for event in &pending {
                self.changes.notify(event);
            }
        }
    }
}

/// Batched write access to an [`ObservableList`]; queued events flush when the guard drops.
pub struct WriteGuard<'a, T>
where
    T: Clone + Identify + 'static,
{
    list: &'a ObservableList<T>,
    len_at_open: usize,
}

impl<'a, T> WriteGuard<'a, T>
where
    T: Clone + Identify + 'static,
{
    fn inner(&self) -> &ListInner<T> {
        &self.list.inner
    }

    fn queue(&mut self, event: ListEvent<T>) {
        self.inner().pending.borrow_mut().push(event);
    }

    /// Current number of elements, including edits made through this guard.
    pub fn len(&self) -> usize {
        self.inner().vec.borrow().len()
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.inner().vec.borrow().is_empty()
    }

    /// Appends an element, queueing [`ListEvent::Added`].
    pub fn push(&mut self, value: T) {
        let from = {
            let mut vec = self.inner().vec.borrow_mut();
            vec.push(value.clone());
            vec.len() - 1
        };
        self.inner().track_add(&value);
        self.queue(ListEvent::Added {
            from,
            items: vec![value],
        });
    }

    /// Removes the last element if there is one, queueing [`ListEvent::Removed`].
    pub fn pop(&mut self) -> Option<T> {
        let removed = self.inner().vec.borrow_mut().pop();
        if let Some(value) = &removed {
            self.inner().track_remove(value);
            let from = self.inner().vec.borrow().len();
            self.queue(ListEvent::Removed {
                from,
                items: vec![value.clone()],
            });
        }
        removed
    }

    /// Inserts `value` at `index`, queueing [`ListEvent::Added`].
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn insert(&mut self, index: usize, value: T) {
        self.inner().vec.borrow_mut().insert(index, value.clone());
        self.inner().track_add(&value);
        self.queue(ListEvent::Added {
            from: index,
            items: vec![value],
        });
    }

    /// Removes and returns the element at `index`, queueing [`ListEvent::Removed`].
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn remove(&mut self, index: usize) -> T {
        let value = self.inner().vec.borrow_mut().remove(index);
        self.inner().track_remove(&value);
        self.queue(ListEvent::Removed {
            from: index,
            items: vec![value.clone()],
        });
        value
    }

    /// Removes the first element identical to `item`, if present.
    pub fn remove_item(&mut self, item: &T) -> Option<T> {
        let position = self.list.index_of(item)?;
        Some(self.remove(position))
    }

    /// Removes the first occurrence of each of `items`, one [`ListEvent::Removed`] per element
    /// found.
    pub fn remove_all(&mut self, items: &[T]) {
        for item in items {
            self.remove_item(item);
        }
    }

    /// Overwrites the element at `index`, queueing [`ListEvent::Replaced`], and returns the
    /// previous value.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn set(&mut self, index: usize, value: T) -> T {
        let old = {
            let mut vec = self.inner().vec.borrow_mut();
            let len = vec.len();
            if index >= len {
                panic!("WriteGuard::set: index {index} out of bounds for len {len}");
            }
            mem::replace(&mut vec[index], value.clone())
        };
        self.inner().track_remove(&old);
        self.inner().track_add(&value);
        self.queue(ListEvent::Replaced {
            from: index,
            items: vec![value],
        });
        old
    }

    /// Moves the element at `from` to `to`, queueing a single-element [`ListEvent::Moved`].
    /// No-op when `from == to`.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of bounds.
    pub fn move_item(&mut self, from: usize, to: usize) {
        let value = {
            let mut vec = self.inner().vec.borrow_mut();
            let len = vec.len();
            if from >= len || to >= len {
                panic!("WriteGuard::move_item: index out of bounds (len: {len}, from: {from}, to: {to})");
            }
            if from == to {
                return;
            }
            let value = vec.remove(from);
            vec.insert(to, value.clone());
            value
        };
        self.queue(ListEvent::Moved {
            from,
            to,
            items: vec![value],
        });
    }

    /// Removes every element, queueing one [`ListEvent::Removed`] covering them all.
    pub fn clear(&mut self) {
        let removed = mem::take(&mut *self.inner().vec.borrow_mut());
        if removed.is_empty() {
            return;
        }
        for item in &removed {
            self.inner().track_remove(item);
        }
        self.queue(ListEvent::Removed {
            from: 0,
            items: removed,
        });
    }

    /// Replaces the entire contents with `values`.
    pub fn replace(&mut self, values: impl Into<Vec<T>>) {
        self.clear();
        for value in values.into() {
            self.push(value);
        }
    }

    /// Keeps only the elements for which `keep` returns `true`.
    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) {
        let mut index = 0;
        while index < self.len() {
            let value = self.inner().vec.borrow()[index].clone();
            if keep(&value) {
                index += 1;
            } else {
                self.remove(index);
            }
        }
    }
}

impl<'a, T> Drop for WriteGuard<'a, T>
where
    T: Clone + Identify + 'static,
{
    fn drop(&mut self) {
        self.list.inner.flush(self.len_at_open);
    }
}

impl<T> ObservableList<T>
where
    T: Clone + Identify + 'static,
{
    /// Creates a list with initial contents, without emitting events.
    pub fn from_values(values: impl Into<Vec<T>>) -> Self {
        let list = Self::new();
        *list.inner.vec.borrow_mut() = values.into();
        list
    }
}

impl<T, A> From<A> for ObservableList<T>
where
    T: Clone + Identify + 'static,
    Vec<T>: From<A>,
{
    fn from(values: A) -> Self {
        Self::from_values(Vec::from(values))
    }
}

impl<T> ListSource<T> for ObservableList<T>
where
    T: Clone + Identify + 'static,
{
    fn len(&self) -> usize {
        ObservableList::len(self)
    }

    fn get(&self, index: usize) -> Option<T> {
        ObservableList::get(self, index)
    }

    fn for_each(&self, f: &mut dyn FnMut(&T)) {
        ObservableList::for_each(self, f)
    }

    fn on_change(&self, callback: Callback<ListEvent<T>>) -> Subscription {
        ObservableList::on_change(self, callback)
    }

    fn on_item_changed(&self, callback: Callback<T>) -> Subscription {
        ObservableList::on_item_changed(self, callback)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::watch::Var;
    use std::cell::Cell;

    // Records every event a list emits; shared helper for the projection tests too.
    pub(crate) fn record_events<T: Clone + Identify + 'static>(
        list: &ObservableList<T>,
    ) -> (Rc<RefCell<Vec<ListEvent<T>>>>, Subscription) {
        let events = Rc::new(RefCell::new(Vec::new()));
        let subscription = list.on_change(Box::new(crate::clone!((events) move |event: &ListEvent<T>| {
            events.borrow_mut().push(event.clone());
        })));
        (events, subscription)
    }

    #[test]
    fn single_mutations_emit_granular_events() {
        let list = ObservableList::from(["a", "b", "c"]);
        let (events, _subscription) = record_events(&list);

        list.push("d");
        list.insert(1, "x");
        list.remove_at(0);
        list.set(0, "X");
        list.move_item(0, 2);
        list.move_item(2, 2); // no-op

        assert_eq!(
            *events.borrow(),
            [
                ListEvent::Added { from: 3, items: vec!["d"] },
                ListEvent::Added { from: 1, items: vec!["x"] },
                ListEvent::Removed { from: 0, items: vec!["a"] },
                ListEvent::Replaced { from: 0, items: vec!["X"] },
                ListEvent::Moved { from: 0, to: 2, items: vec!["X"] },
            ]
        );
        assert_eq!(list.snapshot(), ["b", "c", "X", "d"]);
    }

    #[test]
    fn batched_writes_flush_once_on_guard_drop() {
        let list = ObservableList::<i32>::new();
        let (events, _subscription) = record_events(&list);

        {
            let mut writer = list.write();
            writer.push(1);
            writer.push(2);
            writer.remove(0);
            assert!(events.borrow().is_empty(), "events leaked before the guard dropped");
        }
        assert_eq!(
            *events.borrow(),
            [
                ListEvent::Added { from: 0, items: vec![1] },
                ListEvent::Added { from: 1, items: vec![2] },
                ListEvent::Removed { from: 0, items: vec![1] },
            ]
        );
    }

    #[test]
    fn oversized_batches_coalesce_to_a_single_reset() {
        let list = ObservableList::from_values((0..4).collect::<Vec<i32>>());
        let (events, _subscription) = record_events(&list);

        {
            let mut writer = list.write();
            for value in 100..120 {
                writer.push(value);
            }
        }
        assert_eq!(events.borrow().len(), 1, "bulk batch was not coalesced");
        assert!(events.borrow()[0].is_reset());
        assert_eq!(list.len(), 24);
    }

    #[test]
    fn reset_coalescing_can_be_disabled() {
        let list = ObservableList::<i32>::new();
        list.set_reset_threshold(f32::INFINITY);
        let (events, _subscription) = record_events(&list);

        {
            let mut writer = list.write();
            for value in 0..20 {
                writer.push(value);
            }
        }
        assert_eq!(events.borrow().len(), 20);
        assert!(events.borrow().iter().all(|event| !event.is_reset()));
    }

    #[test]
    fn remove_all_removes_by_identity_without_touching_later_elements() {
        let list = ObservableList::from(["A", "B", "C", "D"]);
        let (events, _subscription) = record_events(&list);

        list.remove_all(&["B", "C"]);
        assert_eq!(list.snapshot(), ["A", "D"]);
        assert_eq!(
            *events.borrow(),
            [
                ListEvent::Removed { from: 1, items: vec!["B"] },
                ListEvent::Removed { from: 1, items: vec!["C"] },
            ]
        );
    }

    #[test]
    fn tracked_items_feed_the_item_changed_stream() {
        let list = ObservableList::<Var<i32>>::new();
        list.track_item_changes();

        let changed = Rc::new(Cell::new(0u32));
        let _subscription = list.on_item_changed(Box::new(crate::clone!((changed) move |_item: &Var<i32>| {
            changed.set(changed.get() + 1);
        })));

        let item = Var::new(1);
        list.push(item.clone());
        item.set(2);
        assert_eq!(changed.get(), 1);

        // Eviction: once the last occurrence leaves the list, further element changes are not
        // the list's business.
        list.remove_at(0);
        item.set(3);
        assert_eq!(changed.get(), 1, "watcher survived element removal");
    }

    #[test]
    fn duplicated_elements_share_one_refcounted_watcher() {
        let list = ObservableList::<Var<i32>>::new();
        list.track_item_changes();

        let changed = Rc::new(Cell::new(0u32));
        let _subscription = list.on_item_changed(Box::new(crate::clone!((changed) move |_item: &Var<i32>| {
            changed.set(changed.get() + 1);
        })));

        let item = Var::new(1);
        list.push(item.clone());
        list.push(item.clone());
        item.set(2);
        assert_eq!(changed.get(), 1, "duplicate occurrences registered duplicate watchers");

        list.remove_at(0);
        item.set(3);
        assert_eq!(changed.get(), 2, "watcher evicted while an occurrence remained");

        list.remove_at(0);
        item.set(4);
        assert_eq!(changed.get(), 2);
    }

    #[test]
    fn retain_and_clear_emit_removals() {
        let list = ObservableList::from_values((0..6).collect::<Vec<i32>>());
        let (events, _subscription) = record_events(&list);

        list.retain(|value| value % 2 == 0);
        assert_eq!(list.snapshot(), [0, 2, 4]);
        assert_eq!(
            *events.borrow(),
            [
                ListEvent::Removed { from: 1, items: vec![1] },
                ListEvent::Removed { from: 2, items: vec![3] },
                ListEvent::Removed { from: 3, items: vec![5] },
            ]
        );

        events.borrow_mut().clear();
        list.clear();
        assert_eq!(
            *events.borrow(),
            [ListEvent::Removed { from: 0, items: vec![0, 2, 4] }]
        );
        assert!(list.is_empty());
    }
}
