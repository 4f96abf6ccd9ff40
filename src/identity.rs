//! The reference-identity seam used by reconciliation.
//!
//! Projections need to answer "is this the same element?" in two places: locating a changed
//! element inside the shadow copy of the source, and deciding whether an item-changed
//! reconciliation is a no-op, an in-place replace, or a move. Plain equality is the wrong tool
//! for the latter: a mutated shared object can compare equal to itself before and after the
//! change. [`Identify`] makes the intent explicit per element type instead of guessing.

use std::rc::Rc;
use std::sync::Arc;

/// Identity comparison for list elements.
///
/// Shared handles ([`Rc`], [`Arc`], [`Var`](crate::watch::Var)) compare by pointer; plain value
/// types compare by value, where identity and equality coincide.
pub trait Identify {
    /// Returns `true` when `self` and `other` are the same element.
    fn identity_eq(&self, other: &Self) -> bool;
}

macro_rules! identify_by_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Identify for $ty {
                fn identity_eq(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

identify_by_value! {
    u8, u16, u32, u64, u128, usize,
    i8, i16, i32, i64, i128, isize,
    bool, char, String, &'static str,
}

impl<T: ?Sized> Identify for Rc<T> {
    fn identity_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }
}

impl<T: ?Sized> Identify for Arc<T> {
    fn identity_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

impl<A: Identify, B: Identify> Identify for (A, B) {
    fn identity_eq(&self, other: &Self) -> bool {
        self.0.identity_eq(&other.0) && self.1.identity_eq(&other.1)
    }
}
