//! The dependency engine.
//!
//! A [`Store`] orchestrates everything: it classifies declared properties,
//! discovers which properties each computed property reads, memoizes
//! computed values, invalidates them through the dependency graph when an
//! upstream value changes, and dispatches watchers.

mod store;

pub use store::{ComputedFn, Store, StoreBuilder, WatchHandle};
