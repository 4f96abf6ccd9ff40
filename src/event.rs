//! Structured change notifications emitted by [`ObservableList`](crate::source::ObservableList)s
//! and [`DerivedList`](crate::derived::DerivedList)s.

use core::fmt;

/// Describes one structural mutation of an observable list, delivered to
/// [`ListSource::on_change`](crate::source::ListSource::on_change) subscribers.
///
/// Events carry the positions and values recorded at mutation time; replaying a stream of them in
/// order (see [`apply_to_vec`](ListEvent::apply_to_vec)) reconstructs the list's contents.
pub enum ListEvent<T> {
    /// `items` were inserted so that the first of them now lives at index `from`.
    Added {
        #[allow(missing_docs)]
        from: usize,
        #[allow(missing_docs)]
        items: Vec<T>,
    },
    /// `items.len()` contiguous elements starting at index `from` were removed; `items` holds
    /// their values.
    Removed {
        #[allow(missing_docs)]
        from: usize,
        #[allow(missing_docs)]
        items: Vec<T>,
    },
    /// The single element in `items` moved from index `from` to index `to`.
    ///
    /// Multi-element moves are not part of the contract; consumers reject them loudly.
    Moved {
        #[allow(missing_docs)]
        from: usize,
        #[allow(missing_docs)]
        to: usize,
        #[allow(missing_docs)]
        items: Vec<T>,
    },
    /// The element at index `from` was overwritten with the single element in `items`.
    Replaced {
        #[allow(missing_docs)]
        from: usize,
        #[allow(missing_docs)]
        items: Vec<T>,
    },
    /// Too many changes happened at once to describe granularly; assume everything changed and
    /// re-read the list.
    Reset,
}

impl<T> Clone for ListEvent<T>
where
    T: Clone,
{
    fn clone(&self) -> Self {
        match self {
            Self::Added { from, items } => Self::Added {
                from: *from,
                items: items.clone(),
            },
            Self::Removed { from, items } => Self::Removed {
                from: *from,
                items: items.clone(),
            },
            Self::Moved { from, to, items } => Self::Moved {
                from: *from,
                to: *to,
                items: items.clone(),
            },
            Self::Replaced { from, items } => Self::Replaced {
                from: *from,
                items: items.clone(),
            },
            Self::Reset => Self::Reset,
        }
    }
}

impl<T> fmt::Debug for ListEvent<T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added { from, items } => f
                .debug_struct("Added")
                .field("from", from)
                .field("items", items)
                .finish(),
            Self::Removed { from, items } => f
                .debug_struct("Removed")
                .field("from", from)
                .field("items", items)
                .finish(),
            Self::Moved { from, to, items } => f
                .debug_struct("Moved")
                .field("from", from)
                .field("to", to)
                .field("items", items)
                .finish(),
            Self::Replaced { from, items } => f
                .debug_struct("Replaced")
                .field("from", from)
                .field("items", items)
                .finish(),
            Self::Reset => f.debug_struct("Reset").finish(),
        }
    }
}

impl<T> ListEvent<T> {
    /// Replays this event onto a plain [`Vec`] mirroring the list's contents.
    ///
    /// [`Reset`](ListEvent::Reset) is a no-op here: it means "re-read the list", which only the
    /// consumer holding a handle to the list can do.
    pub fn apply_to_vec(&self, vec: &mut Vec<T>)
    where
        T: Clone,
    {
        match self {
            Self::Added { from, items } => {
                for (offset, item) in items.iter().enumerate() {
                    vec.insert(from + offset, item.clone());
                }
            }
            Self::Removed { from, items } => {
                vec.drain(*from..from + items.len());
            }
            Self::Moved { from, to, .. } => {
                let value = vec.remove(*from);
                vec.insert(*to, value);
            }
            Self::Replaced { from, items } => {
                vec[*from] = items[0].clone();
            }
            Self::Reset => {}
        }
    }

    /// Returns `true` for the coalesced [`Reset`](ListEvent::Reset) notification.
    pub fn is_reset(&self) -> bool {
        matches!(self, Self::Reset)
    }
}

#[cfg(test)]
impl<T: PartialEq> PartialEq for ListEvent<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::Added {
                    from: l_from,
                    items: l_items,
                },
                Self::Added {
                    from: r_from,
                    items: r_items,
                },
            ) => l_from == r_from && l_items == r_items,
            (
                Self::Removed {
                    from: l_from,
                    items: l_items,
                },
                Self::Removed {
                    from: r_from,
                    items: r_items,
                },
            ) => l_from == r_from && l_items == r_items,
            (
                Self::Moved {
                    from: l_from,
                    to: l_to,
                    items: l_items,
                },
                Self::Moved {
                    from: r_from,
                    to: r_to,
                    items: r_items,
                },
            ) => l_from == r_from && l_to == r_to && l_items == r_items,
            (
                Self::Replaced {
                    from: l_from,
                    items: l_items,
                },
                Self::Replaced {
                    from: r_from,
                    items: r_items,
                },
            ) => l_from == r_from && l_items == r_items,
            (Self::Reset, Self::Reset) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaying_events_reconstructs_contents() {
        let mut mirror = vec!["a".to_string(), "b".to_string()];

        ListEvent::Added {
            from: 1,
            items: vec!["x".to_string(), "y".to_string()],
        }
        .apply_to_vec(&mut mirror);
        assert_eq!(mirror, ["a", "x", "y", "b"]);

        ListEvent::Moved {
            from: 3,
            to: 0,
            items: vec!["b".to_string()],
        }
        .apply_to_vec(&mut mirror);
        assert_eq!(mirror, ["b", "a", "x", "y"]);

        ListEvent::Replaced {
            from: 2,
            items: vec!["z".to_string()],
        }
        .apply_to_vec(&mut mirror);
        assert_eq!(mirror, ["b", "a", "z", "y"]);

        ListEvent::Removed {
            from: 1,
            items: vec!["a".to_string(), "z".to_string()],
        }
        .apply_to_vec(&mut mirror);
        assert_eq!(mirror, ["b", "y"]);

        // `Reset` carries no payload to replay.
        ListEvent::<String>::Reset.apply_to_vec(&mut mirror);
        assert_eq!(mirror, ["b", "y"]);
    }
}
