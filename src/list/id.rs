//! Identity types for lists and their subscribers.
//!
//! All IDs are newtypes over `u64` drawn from a process-wide counter. They are
//! never reused, so a stale ID held by a late callback can only miss, never
//! alias another entry.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_raw() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl $name {
            pub const INVALID: $name = $name(0);

            /// Allocate a fresh, never-before-seen ID.
            pub fn next() -> Self {
                $name(next_raw())
            }

            #[inline]
            pub fn is_valid(self) -> bool {
                self != Self::INVALID
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if *self == Self::INVALID {
                    write!(f, concat!(stringify!($name), "(INVALID)"))
                } else {
                    write!(f, concat!(stringify!($name), "({})"), self.0)
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Debug::fmt(self, f)
            }
        }
    };
}

define_id!(
    /// Identity of one element container inside a Filter or Order operator.
    ItemId
);

define_id!(
    /// Identity of one member source inside a Merge operator.
    SourceId
);

define_id!(
    /// Handle returned by every `subscribe` call, used to unsubscribe.
    SubscriptionId
);
