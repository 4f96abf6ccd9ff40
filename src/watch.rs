//! Observable element properties, the feed for item-changed notifications.

use crate::identity::Identify;
use crate::subscriber::{SubscriberSet, Subscription};
use core::fmt;
use std::cell::RefCell;
use std::rc::Rc;

struct VarInner<T> {
    value: RefCell<T>,
    watchers: SubscriberSet<()>,
}

/// A cloneable, observable single-value cell.
///
/// Cloning a [`Var`] clones the handle, not the value: all clones read and write the same cell,
/// and [`Identify`] compares handles by pointer. Model types expose their mutable fields as
/// `Var`s and implement [`Tracked`] by delegating to them, which is what lets an
/// [`ObservableList`](crate::source::ObservableList) surface element-level changes.
///
/// # Example
///
/// ```
/// use miravec::prelude::*;
///
/// let name = Var::new("Foo".to_string());
/// let watched = name.clone();
/// let subscription = watched.watch(Box::new(|| println!("name changed")));
/// name.set("Bar".to_string()); // prints "name changed"
/// # drop(subscription);
/// ```
pub struct Var<T> {
    inner: Rc<VarInner<T>>,
}

impl<T> Clone for Var<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Var<T> {
    #[allow(missing_docs)]
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(VarInner {
                value: RefCell::new(value),
                watchers: SubscriberSet::new(),
            }),
        }
    }

    /// Returns a clone of the current value.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.inner.value.borrow().clone()
    }

    /// Borrows the current value for the duration of `f`.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Overwrites the value and notifies watchers.
    pub fn set(&self, value: T) {
        *self.inner.value.borrow_mut() = value;
        self.inner.watchers.notify(&());
    }

    /// Mutates the value in place through `f` and notifies watchers.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut self.inner.value.borrow_mut());
        self.inner.watchers.notify(&());
    }
}

impl<T: fmt::Debug> fmt::Debug for Var<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Var").field(&*self.inner.value.borrow()).finish()
    }
}

impl<T> Identify for Var<T> {
    fn identity_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Capability interface for elements whose changes an observable list can track.
///
/// Resolved once when tracking is enabled, not probed per operation. Composite model types
/// implement it by delegating to their [`Var`] fields; tracking through an [`Rc`] handle
/// delegates to the pointee.
pub trait Tracked {
    /// Registers `watcher` to run after every change to this element, returning the registration
    /// token.
    fn watch(&self, watcher: Box<dyn FnMut()>) -> Subscription;
}

impl<T: 'static> Tracked for Var<T> {
    fn watch(&self, mut watcher: Box<dyn FnMut()>) -> Subscription {
        self.inner.watchers.subscribe(Box::new(move |&()| watcher()))
    }
}

impl<T: Tracked + ?Sized> Tracked for Rc<T> {
    fn watch(&self, watcher: Box<dyn FnMut()>) -> Subscription {
        (**self).watch(watcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn clones_share_the_cell_and_watchers_observe_both() {
        let var = Var::new(1);
        let alias = var.clone();
        let changes = Rc::new(Cell::new(0u32));

        let subscription = var.watch(Box::new(crate::clone!((changes) move || {
            changes.set(changes.get() + 1);
        })));

        alias.set(2);
        var.update(|value| *value += 1);
        assert_eq!(var.get(), 3);
        assert_eq!(alias.get(), 3);
        assert_eq!(changes.get(), 2);

        subscription.unsubscribe();
        var.set(4);
        assert_eq!(changes.get(), 2, "watcher fired after unsubscribe");
    }

    #[test]
    fn debug_shows_the_inner_value() {
        let var = Var::new(7);
        assert_eq!(format!("{var:?}"), "Var(7)");
        var.set(8);
        assert_eq!(format!("{var:?}"), "Var(8)");
    }

    #[test]
    fn var_identity_follows_the_handle() {
        let var = Var::new(0);
        assert!(var.identity_eq(&var.clone()));
        assert!(!var.identity_eq(&Var::new(0)));
    }
}
