#![doc = include_str!("../README.md")]
#![cfg_attr(feature = "document-features", doc = "## Feature flags")]
#![cfg_attr(feature = "document-features", doc = document_features::document_features!())]

pub mod derived;
pub mod error;
pub mod event;
pub mod identity;
pub mod scheduler;
pub mod source;
pub mod subscriber;
pub mod watch;

/// Clone-capturing closure helper, re-exported from [enclose](https://docs.rs/enclose).
///
/// `clone!((list, events) move |x| ...)` clones `list` and `events` into the closure instead of
/// borrowing them, which is the shape almost every subscription callback wants.
pub use enclose::enclose as clone;

/// `use miravec::prelude::*;` imports everything one needs to start using [miravec](crate).
pub mod prelude {
    pub use crate::{
        clone,
        derived::{DerivedList, DerivedListBuilder},
        error::ReadOnlyError,
        event::ListEvent,
        identity::Identify,
        scheduler::{Immediate, Scheduler, Task, TaskQueue},
        source::{ListSource, ObservableList, WriteGuard},
        subscriber::{Callback, Subscription},
        watch::{Tracked, Var},
    };
    #[doc(no_inline)]
    pub use apply::{Also, Apply};
}
