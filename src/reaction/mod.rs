//! Recursive wrapping of plain values into observable ones.
//!
//! [`reactify`] is the join point between new data entering the system and
//! data already under observation; [`raw`] and [`unreactify`] are its
//! non-destructive and destructive inverses.

mod reaction;

pub use reaction::{raw, reactify, unreactify, NotifyFn};
