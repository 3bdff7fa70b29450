//! # Canister
//!
//! A minimal reactive state container for Rust.
//!
//! A [`Store`] is declared as plain data (static values plus derived,
//! computed values) and produces a live handle:
//!
//! - static properties can be mutated, and each write propagates
//!   synchronously;
//! - computed properties are lazy and memoized, re-evaluated exactly when a
//!   dependency they actually read has changed;
//! - nested containers are transparently wrapped, so mutations deep inside
//!   them feed back into the same invalidation pipeline;
//! - watchers observe individual properties and receive `(new, old)` pairs.
//!
//! ## Example
//!
//! ```
//! use canister::{Store, Value};
//!
//! let store = Store::builder()
//!     .value("list", vec![1, 2, 3])
//!     .computed("len", |s| {
//!         Value::Int(s.get("list").as_array().unwrap().len() as i64)
//!     })
//!     .build();
//!
//! assert_eq!(store.get("len"), Value::Int(3));
//!
//! let list = store.get("list");
//! list.as_array().unwrap().push(4);
//! assert_eq!(store.get("len"), Value::Int(4));
//! ```
//!
//! Dependency discovery is automatic: a computed property depends on exactly
//! the properties its last evaluation read through the store handle, so
//! conditional reads keep the dependency graph exact.
//!
//! The store is single-threaded: handles are `Rc`-backed and deliberately
//! not `Send`. Dependency cycles between computed properties are not
//! detected and recurse unboundedly.

pub mod error;
pub mod observable;
pub mod reaction;
pub(crate) mod runtime;
pub mod store;
pub mod value;

// Re-export main types for convenience
pub use error::Error;
pub use observable::{ObservableArray, ObservableObject};
pub use reaction::{raw, reactify, unreactify, NotifyFn};
pub use store::{ComputedFn, Store, StoreBuilder, WatchHandle};
pub use value::Value;
