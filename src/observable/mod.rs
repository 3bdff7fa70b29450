//! Observable containers.
//!
//! Thin wrappers over `Vec` and `IndexMap` that intercept mutation, wrap
//! newly inserted values, and fire a single change notification per call.

mod array;
mod object;

pub use array::ObservableArray;
pub use object::ObservableObject;
