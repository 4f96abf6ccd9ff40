//! Error types.

/// Returned by every direct structural mutator on a
/// [`DerivedList`](crate::derived::DerivedList).
///
/// Derived lists only change by reacting to their source or through
/// [`reset`](crate::derived::DerivedList::reset); code holding one that wants different contents
/// must mutate the source list instead. The mutators exist so bindings written against the
/// mutable list surface fail loudly rather than silently diverge from the source.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("derived lists cannot be modified directly (attempted `{operation}`); mutate the source list instead")]
pub struct ReadOnlyError {
    /// Name of the rejected operation.
    pub operation: &'static str,
}

impl ReadOnlyError {
    pub(crate) fn new(operation: &'static str) -> Self {
        Self { operation }
    }
}
