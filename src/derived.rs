//! Derived/projected lists: read-only, incrementally-maintained views over a mutating source.
//!
//! A [`DerivedList`] wraps any [`ListSource`], applies a filter, an optional orderer and a
//! selector, and keeps the projected contents synchronized by reconciling the source's granular
//! [`ListEvent`]s instead of recomputing. The projection is itself a [`ListSource`], so
//! projections nest.

use crate::error::ReadOnlyError;
use crate::event::ListEvent;
use crate::identity::Identify;
use crate::scheduler::{Immediate, Scheduler};
use crate::source::{ListSource, ObservableList};
use crate::subscriber::{Callback, SubscriberSet, Subscription};
use core::cmp::Ordering;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
#[cfg(feature = "tracing")]
use tracing::debug;

type FilterFn<T> = Box<dyn Fn(&T) -> bool>;
type SelectorFn<T, V> = Box<dyn Fn(&T) -> V>;
type OrdererFn<V> = Box<dyn Fn(&V, &V) -> Ordering>;

/// Insertion point of a new item into an ordered slice: the first position whose element is not
/// less than the item, so ties insert before existing equal elements. Callers must treat the
/// result as "first valid insertion slot", not a claim of uniqueness.
fn insertion_point<X>(slice: &[X], mut compare_to_new: impl FnMut(&X) -> Ordering) -> usize {
    slice.partition_point(|existing| compare_to_new(existing) == Ordering::Less)
}

/// New position for the element currently at `current` after its value became `item`, without
/// ever comparing `item` against its own (stale) slot.
///
/// Probes the immediate predecessor (or, for the first element, the successor) to pick the half
/// of the slice to binary-search; when the neighbor already bounds `item`, the element stays
/// put. The result is an index into the slice *after* the element's logical removal from
/// `current`, ready to insert at.
fn new_position_for_existing<X>(
    slice: &[X],
    current: usize,
    item: &X,
    mut compare: impl FnMut(&X, &X) -> Ordering,
) -> usize {
    if slice.len() <= 1 {
        return current;
    }
    let mut position = if current > 0 {
        if compare(item, &slice[current - 1]) == Ordering::Less {
            insertion_point(&slice[..current - 1], |existing| compare(existing, item))
        } else if current + 1 < slice.len() {
            current + 1 + insertion_point(&slice[current + 1..], |existing| compare(existing, item))
        } else {
            // Already last and not less than its predecessor.
            return current;
        }
    } else if compare(item, &slice[1]) == Ordering::Greater {
        2 + insertion_point(&slice[2..], |existing| compare(existing, item))
    } else {
        // First element and not greater than its successor.
        return current;
    };
    // Compensate for the removal of the stale slot at `current`.
    if position >= current {
        position -= 1;
    }
    position
}

struct DerivedState<T, V> {
    /// The projected contents, in derived order.
    items: Vec<V>,
    /// Entry `i` is the source index of the element that produced `items[i]`. Strictly
    /// increasing when no orderer is configured.
    index_to_source: Vec<usize>,
    /// Mirror of the full source contents (filtered-out elements included), used only to locate
    /// elements by identity when an item-changed notification arrives without a position.
    source_copy: Vec<T>,
}

struct DerivedInner<T, V> {
    state: RefCell<DerivedState<T, V>>,
    changes: SubscriberSet<ListEvent<V>>,
    item_changed: SubscriberSet<V>,
    filter: FilterFn<T>,
    orderer: Option<OrdererFn<V>>,
    selector: SelectorFn<T, V>,
    scheduler: Rc<dyn Scheduler>,
    source: Box<dyn ListSource<T>>,
    subscriptions: RefCell<Vec<Subscription>>,
    disposed: Cell<bool>,
}

impl<T, V> DerivedInner<T, V>
where
    T: Clone + Identify + 'static,
    V: Clone + Identify + 'static,
{
    fn index_from_source(&self, state: &DerivedState<T, V>, source_index: usize) -> Option<usize> {
        // Linear reverse lookup; projections are UI-sized.
        state.index_to_source.iter().position(|&entry| entry == source_index)
    }

    fn position_for_new(&self, state: &DerivedState<T, V>, source_index: usize, value: &V) -> usize {
        match &self.orderer {
            Some(orderer) => insertion_point(&state.items, |existing| orderer(existing, value)),
            // Without an orderer the derived list mirrors source order among surviving
            // elements, so the (sorted) index map itself is the ordering key.
            None => insertion_point(&state.index_to_source, |existing| existing.cmp(&source_index)),
        }
    }

    fn rebuild(&self) {
        let mut state = self.state.borrow_mut();
        state.items.clear();
        state.index_to_source.clear();
        state.source_copy.clear();
        let mut source_index = 0;
        self.source.for_each(&mut |item: &T| {
            state.source_copy.push(item.clone());
            if (self.filter)(item) {
                let value = (self.selector)(item);
                let position = self.position_for_new(&state, source_index, &value);
                state.items.insert(position, value);
                state.index_to_source.insert(position, source_index);
            }
            source_index += 1;
        });
    }

    fn emit(&self, events: Vec<ListEvent<V>>) {
        for event in events {
            self.changes.notify(&event);
        }
    }

    fn reconcile(&self, event: ListEvent<T>) {
        if self.disposed.get() {
            return;
        }
        match event {
            ListEvent::Added { from, items } => self.on_added(from, items),
            ListEvent::Removed { from, items } => self.on_removed(from, items.len()),
            ListEvent::Moved { from, to, items } => {
                assert_eq!(
                    items.len(),
                    1,
                    "multi-element moves are unsupported; reconciling one granularly would \
                     corrupt the index map"
                );
                self.on_moved(from, to);
            }
            ListEvent::Replaced { from, items } => match <[T; 1]>::try_from(items) {
                Ok([item]) => self.on_replaced(from, item),
                Err(items) => panic!(
                    "replace events carry exactly one element, got {}",
                    items.len()
                ),
            },
            ListEvent::Reset => self.reset(),
        }
    }

    fn on_added(&self, from: usize, items: Vec<T>) {
        #[cfg(feature = "tracing")]
        debug!(from, count = items.len(), "reconciling source addition");
        let mut emits = Vec::new();
        {
            let mut state = self.state.borrow_mut();
            let count = items.len();
            // Make room before touching anything else so every existing mapping entry keeps
            // pointing at the same logical source element.
            for entry in state.index_to_source.iter_mut() {
                if *entry >= from {
                    *entry += count;
                }
            }
            for (offset, item) in items.iter().enumerate() {
                state.source_copy.insert(from + offset, item.clone());
            }
            for (offset, item) in items.into_iter().enumerate() {
                let source_index = from + offset;
                if (self.filter)(&item) {
                    let value = (self.selector)(&item);
                    let position = self.position_for_new(&state, source_index, &value);
                    state.items.insert(position, value.clone());
                    state.index_to_source.insert(position, source_index);
                    emits.push(ListEvent::Added {
                        from: position,
                        items: vec![value],
                    });
                }
            }
        }
        self.emit(emits);
    }

    fn on_removed(&self, from: usize, count: usize) {
        #[cfg(feature = "tracing")]
        debug!(from, count, "reconciling source removal");
        let mut emits = Vec::new();
        {
            let mut state = self.state.borrow_mut();
            state.source_copy.drain(from..from + count);
            // Drop the affected derived entries first; shifting before removal would corrupt
            // the still-stale mapping entries being looked up.
            for source_index in from..from + count {
                if let Some(position) = self.index_from_source(&state, source_index) {
                    let value = state.items.remove(position);
                    state.index_to_source.remove(position);
                    emits.push(ListEvent::Removed {
                        from: position,
                        items: vec![value],
                    });
                }
            }
            for entry in state.index_to_source.iter_mut() {
                if *entry >= from + count {
                    *entry -= count;
                }
            }
        }
        self.emit(emits);
    }

    fn on_moved(&self, from: usize, to: usize) {
        if from == to {
            return;
        }
        #[cfg(feature = "tracing")]
        debug!(from, to, "reconciling source move");
        let mut emit = None;
        {
            let mut state = self.state.borrow_mut();
            let moved = state.source_copy.remove(from);
            state.source_copy.insert(to, moved);
            let current = self.index_from_source(&state, from);
            // Shift the mapping entries the move slid across; the moved element's own entry
            // (still holding `from`) is deliberately left stale until resolved below.
            if from < to {
                for entry in state.index_to_source.iter_mut() {
                    if *entry > from && *entry <= to {
                        *entry -= 1;
                    }
                }
            } else {
                for entry in state.index_to_source.iter_mut() {
                    if *entry >= to && *entry < from {
                        *entry += 1;
                    }
                }
            }
            let Some(current) = current else { return };
            if self.orderer.is_some() {
                // A pure index move cannot change value order.
                state.index_to_source[current] = to;
            } else {
                let new_position =
                    new_position_for_existing(&state.index_to_source, current, &to, |a, b| a.cmp(b));
                if new_position == current {
                    state.index_to_source[current] = to;
                } else {
                    let value = state.items.remove(current);
                    state.index_to_source.remove(current);
                    state.items.insert(new_position, value.clone());
                    state.index_to_source.insert(new_position, to);
                    emit = Some(ListEvent::Moved {
                        from: current,
                        to: new_position,
                        items: vec![value],
                    });
                }
            }
        }
        if let Some(event) = emit {
            self.changes.notify(&event);
        }
    }

    /// Source-level `set(i, x)`: the element at `i` is a different object now, so an ordered
    /// projection re-homes it with remove+insert rather than pretending the old element moved.
    fn on_replaced(&self, from: usize, item: T) {
        #[cfg(feature = "tracing")]
        debug!(from, "reconciling source replacement");
        let mut emits = Vec::new();
        {
            let mut state = self.state.borrow_mut();
            state.source_copy[from] = item.clone();
            let current = self.index_from_source(&state, from);
            let include = (self.filter)(&item);
            match (current, include) {
                (Some(position), true) => {
                    let value = (self.selector)(&item);
                    if self.orderer.is_some() {
                        let old = state.items.remove(position);
                        state.index_to_source.remove(position);
                        emits.push(ListEvent::Removed {
                            from: position,
                            items: vec![old],
                        });
                        let new_position = self.position_for_new(&state, from, &value);
                        state.items.insert(new_position, value.clone());
                        state.index_to_source.insert(new_position, from);
                        emits.push(ListEvent::Added {
                            from: new_position,
                            items: vec![value],
                        });
                    } else if !value.identity_eq(&state.items[position]) {
                        state.items[position] = value.clone();
                        emits.push(ListEvent::Replaced {
                            from: position,
                            items: vec![value],
                        });
                    }
                }
                (Some(position), false) => {
                    let value = state.items.remove(position);
                    state.index_to_source.remove(position);
                    emits.push(ListEvent::Removed {
                        from: position,
                        items: vec![value],
                    });
                }
                (None, true) => {
                    let value = (self.selector)(&item);
                    let position = self.position_for_new(&state, from, &value);
                    state.items.insert(position, value.clone());
                    state.index_to_source.insert(position, from);
                    emits.push(ListEvent::Added {
                        from: position,
                        items: vec![value],
                    });
                }
                (None, false) => {}
            }
        }
        self.emit(emits);
    }

    fn reconcile_item_changed(&self, item: &T) {
        if self.disposed.get() {
            return;
        }
        let mut emits = Vec::new();
        let mut passthrough = Vec::new();
        {
            let mut state = self.state.borrow_mut();
            // An element may appear multiple times if reference-duplicated; reconcile each
            // occurrence. Structural edits below only touch the derived side, so these source
            // positions stay valid throughout.
            let occurrences: Vec<usize> = state
                .source_copy
                .iter()
                .enumerate()
                .filter(|(_, existing)| existing.identity_eq(item))
                .map(|(source_index, _)| source_index)
                .collect();
            #[cfg(feature = "tracing")]
            debug!(occurrences = occurrences.len(), "reconciling item change");
            let include = (self.filter)(item);
            for source_index in occurrences {
                let current = self.index_from_source(&state, source_index);
                match (current, include) {
                    (Some(position), false) => {
                        let value = state.items.remove(position);
                        state.index_to_source.remove(position);
                        emits.push(ListEvent::Removed {
                            from: position,
                            items: vec![value],
                        });
                    }
                    (None, true) => {
                        let value = (self.selector)(item);
                        let position = self.position_for_new(&state, source_index, &value);
                        state.items.insert(position, value.clone());
                        state.index_to_source.insert(position, source_index);
                        emits.push(ListEvent::Added {
                            from: position,
                            items: vec![value],
                        });
                    }
                    (None, false) => {}
                    (Some(position), true) => {
                        let value = (self.selector)(item);
                        match &self.orderer {
                            None => {
                                // Order never changes without an orderer; replace only when the
                                // selector produced a different object.
                                if value.identity_eq(&state.items[position]) {
                                    passthrough.push(state.items[position].clone());
                                } else {
                                    state.items[position] = value.clone();
                                    emits.push(ListEvent::Replaced {
                                        from: position,
                                        items: vec![value],
                                    });
                                }
                            }
                            Some(orderer) => {
                                let fits = (position == 0
                                    || orderer(&state.items[position - 1], &value) != Ordering::Greater)
                                    && (position + 1 >= state.items.len()
                                        || orderer(&value, &state.items[position + 1]) != Ordering::Greater);
                                if fits {
                                    if value.identity_eq(&state.items[position]) {
                                        passthrough.push(state.items[position].clone());
                                    } else {
                                        state.items[position] = value.clone();
                                        emits.push(ListEvent::Replaced {
                                            from: position,
                                            items: vec![value],
                                        });
                                    }
                                } else {
                                    let new_position = new_position_for_existing(
                                        &state.items,
                                        position,
                                        &value,
                                        |a, b| orderer(a, b),
                                    );
                                    if value.identity_eq(&state.items[position]) {
                                        // Same object, new home: a genuine move, which lets
                                        // binding layers keep per-element UI state.
                                        let moved = state.items.remove(position);
                                        let source_entry = state.index_to_source.remove(position);
                                        state.items.insert(new_position, moved.clone());
                                        state.index_to_source.insert(new_position, source_entry);
                                        emits.push(ListEvent::Moved {
                                            from: position,
                                            to: new_position,
                                            items: vec![moved],
                                        });
                                    } else {
                                        // Non-identity selectors never emit moves: the element
                                        // at the new position is a different object.
                                        let old = state.items.remove(position);
                                        state.index_to_source.remove(position);
                                        emits.push(ListEvent::Removed {
                                            from: position,
                                            items: vec![old],
                                        });
                                        state.items.insert(new_position, value.clone());
                                        state.index_to_source.insert(new_position, source_index);
                                        emits.push(ListEvent::Added {
                                            from: new_position,
                                            items: vec![value],
                                        });
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
        self.emit(emits);
        // Elements that stayed put with identical identity produced no structural event, but
        // nested projections still need to re-evaluate their own filters.
        for value in passthrough {
            self.item_changed.notify(&value);
        }
    }

    fn reset(&self) {
        #[cfg(feature = "tracing")]
        debug!("rebuilding projection from source");
        self.rebuild();
        self.changes.notify(&ListEvent::Reset);
    }
}

/// Builder for a [`DerivedList`], starting from any [`ListSource`].
///
/// [`select`](DerivedListBuilder::select) re-types the projection, so configure it before
/// [`order_by`](DerivedListBuilder::order_by) (the orderer compares selected values).
///
/// # Example
///
/// ```
/// use miravec::prelude::*;
///
/// let numbers = ObservableList::from([5, 1, 3, 2, 4]);
/// let sorted = numbers
///     .derive()
///     .filter(|n| *n != 3)
///     .order_by(|a, b| a.cmp(b))
///     .build();
/// assert_eq!(sorted.snapshot(), [1, 2, 4, 5]);
/// numbers.push(0);
/// assert_eq!(sorted.snapshot(), [0, 1, 2, 4, 5]);
/// ```
pub struct DerivedListBuilder<T, V> {
    source: Box<dyn ListSource<T>>,
    filter: FilterFn<T>,
    orderer: Option<OrdererFn<V>>,
    selector: SelectorFn<T, V>,
    scheduler: Rc<dyn Scheduler>,
}

impl<T> DerivedListBuilder<T, T>
where
    T: Clone + Identify + 'static,
{
    /// Starts a projection over `source` with the identity selector, an always-true filter, no
    /// orderer and the [`Immediate`] scheduler.
    pub fn new(source: impl ListSource<T>) -> Self {
        Self {
            source: Box::new(source),
            filter: Box::new(|_| true),
            orderer: None,
            selector: Box::new(T::clone),
            scheduler: Rc::new(Immediate),
        }
    }
}

impl<T, V> DerivedListBuilder<T, V>
where
    T: Clone + Identify + 'static,
    V: Clone + Identify + 'static,
{
    /// Only source elements passing `filter` appear in the projection.
    pub fn filter(mut self, filter: impl Fn(&T) -> bool + 'static) -> Self {
        self.filter = Box::new(filter);
        self
    }

    /// Keeps the projection sorted by `orderer` instead of mirroring source order.
    pub fn order_by(mut self, orderer: impl Fn(&V, &V) -> Ordering + 'static) -> Self {
        self.orderer = Some(Box::new(orderer));
        self
    }

    /// Maps each included source element through `selector`, re-typing the projection.
    ///
    /// The selector runs once per included element and its result is cached positionally; it is
    /// only re-run when the source element itself changes. Discards any previously configured
    /// orderer, which compared the old value type.
    pub fn select<W>(self, selector: impl Fn(&T) -> W + 'static) -> DerivedListBuilder<T, W>
    where
        W: Clone + Identify + 'static,
    {
        DerivedListBuilder {
            source: self.source,
            filter: self.filter,
            orderer: None,
            selector: Box::new(selector),
            scheduler: self.scheduler,
        }
    }

    /// Runs reactions to source changes on `scheduler` instead of inline.
    pub fn scheduler(mut self, scheduler: impl Scheduler + 'static) -> Self {
        self.scheduler = Rc::new(scheduler);
        self
    }

    /// Performs the initial full pass over the source and starts reconciling its change
    /// streams.
    pub fn build(self) -> DerivedList<T, V> {
        let inner = Rc::new(DerivedInner {
            state: RefCell::new(DerivedState {
                items: Vec::new(),
                index_to_source: Vec::new(),
                source_copy: Vec::new(),
            }),
            changes: SubscriberSet::new(),
            item_changed: SubscriberSet::new(),
            filter: self.filter,
            orderer: self.orderer,
            selector: self.selector,
            scheduler: self.scheduler,
            source: self.source,
            subscriptions: RefCell::new(Vec::new()),
            disposed: Cell::new(false),
        });
        inner.rebuild();

        let weak = Rc::downgrade(&inner);
        let structural = inner.source.on_change(Box::new(move |event: &ListEvent<T>| {
            let Some(inner) = weak.upgrade() else { return };
            let event = event.clone();
            let task_inner = inner.clone();
            inner
                .scheduler
                .schedule(Box::new(move || task_inner.reconcile(event)));
        }));
        let weak = Rc::downgrade(&inner);
        let element = inner.source.on_item_changed(Box::new(move |item: &T| {
            let Some(inner) = weak.upgrade() else { return };
            let item = item.clone();
            let task_inner = inner.clone();
            inner
                .scheduler
                .schedule(Box::new(move || task_inner.reconcile_item_changed(&item)));
        }));
        *inner.subscriptions.borrow_mut() = vec![structural, element];

        DerivedList { inner }
    }
}

/// A read-only ordered sequence kept synchronized with a [`ListSource`] through filtering,
/// optional ordering and per-element selection.
///
/// Cloning is cheap (a shared handle). The projection only mutates by reacting to its source or
/// through [`reset`](DerivedList::reset); every direct mutator fails with [`ReadOnlyError`].
/// Dropping the last handle, or calling [`dispose`](DerivedList::dispose), releases the upstream
/// subscriptions.
pub struct DerivedList<T, V> {
    inner: Rc<DerivedInner<T, V>>,
}

impl<T, V> Clone for DerivedList<T, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T, V> DerivedList<T, V>
where
    T: Clone + Identify + 'static,
    V: Clone + Identify + 'static,
{
    /// Current number of projected elements.
    pub fn len(&self) -> usize {
        self.inner.state.borrow().items.len()
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.inner.state.borrow().items.is_empty()
    }

    /// Returns a clone of the projected element at `index`, or [`None`] out of bounds.
    pub fn get(&self, index: usize) -> Option<V> {
        self.inner.state.borrow().items.get(index).cloned()
    }

    /// Clones the current projected contents into a plain [`Vec`].
    pub fn snapshot(&self) -> Vec<V> {
        self.inner.state.borrow().items.clone()
    }

    /// Visits every projected element in order.
    pub fn for_each(&self, mut f: impl FnMut(&V)) {
        for item in self.inner.state.borrow().items.iter() {
            f(item);
        }
    }

    /// Index of the first projected element identical to `value`, if any.
    pub fn index_of(&self, value: &V) -> Option<usize> {
        self.inner
            .state
            .borrow()
            .items
            .iter()
            .position(|item| item.identity_eq(value))
    }

    /// Subscribes to the projection's structural change stream.
    pub fn on_change(&self, callback: Callback<ListEvent<V>>) -> Subscription {
        self.inner.changes.subscribe(callback)
    }

    /// Subscribes to element-level change notifications forwarded through the projection.
    pub fn on_item_changed(&self, callback: Callback<V>) -> Subscription {
        self.inner.item_changed.subscribe(callback)
    }

    /// Discards all derived state, recomputes it from the live source, and emits exactly one
    /// [`ListEvent::Reset`].
    pub fn reset(&self) {
        self.inner.reset();
    }

    /// Releases the upstream subscriptions; no further reconciliation runs. Idempotent, and the
    /// frozen contents stay readable.
    pub fn dispose(&self) {
        if !self.inner.disposed.replace(true) {
            self.inner.subscriptions.borrow_mut().clear();
        }
    }

    /// Whether [`dispose`](DerivedList::dispose) has run.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Starts a nested projection over this one.
    pub fn derive(&self) -> DerivedListBuilder<V, V> {
        DerivedListBuilder::new(self.clone())
    }
}

impl<T> ObservableList<T>
where
    T: Clone + Identify + 'static,
{
    /// Starts a projection over this list.
    pub fn derive(&self) -> DerivedListBuilder<T, T> {
        DerivedListBuilder::new(self.clone())
    }
}

/// The rejected mutable surface (see [`ReadOnlyError`]): derived lists change only by reacting
/// to their source.
impl<T, V> DerivedList<T, V>
where
    T: Clone + Identify + 'static,
    V: Clone + Identify + 'static,
{
    #[allow(missing_docs)]
    pub fn push(&self, _value: V) -> Result<(), ReadOnlyError> {
        Err(ReadOnlyError::new("push"))
    }

    #[allow(missing_docs)]
    pub fn pop(&self) -> Result<Option<V>, ReadOnlyError> {
        Err(ReadOnlyError::new("pop"))
    }

    #[allow(missing_docs)]
    pub fn insert(&self, _index: usize, _value: V) -> Result<(), ReadOnlyError> {
        Err(ReadOnlyError::new("insert"))
    }

    #[allow(missing_docs)]
    pub fn remove_at(&self, _index: usize) -> Result<V, ReadOnlyError> {
        Err(ReadOnlyError::new("remove_at"))
    }

    #[allow(missing_docs)]
    pub fn remove_item(&self, _value: &V) -> Result<Option<V>, ReadOnlyError> {
        Err(ReadOnlyError::new("remove_item"))
    }

    #[allow(missing_docs)]
    pub fn remove_all(&self, _values: &[V]) -> Result<(), ReadOnlyError> {
        Err(ReadOnlyError::new("remove_all"))
    }

    #[allow(missing_docs)]
    pub fn set(&self, _index: usize, _value: V) -> Result<V, ReadOnlyError> {
        Err(ReadOnlyError::new("set"))
    }

    #[allow(missing_docs)]
    pub fn move_item(&self, _from: usize, _to: usize) -> Result<(), ReadOnlyError> {
        Err(ReadOnlyError::new("move_item"))
    }

    #[allow(missing_docs)]
    pub fn clear(&self) -> Result<(), ReadOnlyError> {
        Err(ReadOnlyError::new("clear"))
    }

    #[allow(missing_docs)]
    pub fn replace(&self, _values: Vec<V>) -> Result<(), ReadOnlyError> {
        Err(ReadOnlyError::new("replace"))
    }

    #[allow(missing_docs)]
    pub fn retain(&self, _keep: impl FnMut(&V) -> bool) -> Result<(), ReadOnlyError> {
        Err(ReadOnlyError::new("retain"))
    }

    #[allow(missing_docs)]
    pub fn sort(&self, _orderer: impl Fn(&V, &V) -> Ordering) -> Result<(), ReadOnlyError> {
        Err(ReadOnlyError::new("sort"))
    }
}

impl<T, V> ListSource<V> for DerivedList<T, V>
where
    T: Clone + Identify + 'static,
    V: Clone + Identify + 'static,
{
    fn len(&self) -> usize {
        DerivedList::len(self)
    }

    fn get(&self, index: usize) -> Option<V> {
        DerivedList::get(self, index)
    }

    fn for_each(&self, f: &mut dyn FnMut(&V)) {
        DerivedList::for_each(self, f)
    }

    fn on_change(&self, callback: Callback<ListEvent<V>>) -> Subscription {
        DerivedList::on_change(self, callback)
    }

    fn on_item_changed(&self, callback: Callback<V>) -> Subscription {
        DerivedList::on_item_changed(self, callback)
    }
}

#[cfg(test)]
impl<T, V> DerivedList<T, V>
where
    T: Clone + Identify + 'static,
    V: Clone + Identify + 'static,
{
    /// Asserts every structural invariant the reconciliation paths are supposed to preserve.
    pub(crate) fn check_invariants(&self) {
        let state = self.inner.state.borrow();
        assert_eq!(
            state.index_to_source.len(),
            state.items.len(),
            "mapping length diverged from projected length"
        );
        for &source_index in &state.index_to_source {
            assert!(
                source_index < state.source_copy.len(),
                "mapping entry {source_index} out of bounds for source copy of length {}",
                state.source_copy.len()
            );
            assert!(
                (self.inner.filter)(&state.source_copy[source_index]),
                "mapped source element at {source_index} no longer passes the filter"
            );
        }
        match &self.inner.orderer {
            None => {
                assert!(
                    state.index_to_source.windows(2).all(|pair| pair[0] < pair[1]),
                    "index map not strictly increasing without an orderer: {:?}",
                    state.index_to_source
                );
            }
            Some(orderer) => {
                assert!(
                    state
                        .items
                        .windows(2)
                        .all(|pair| orderer(&pair[0], &pair[1]) != Ordering::Greater),
                    "projected contents fell out of sorted order"
                );
            }
        }
    }
}
