//! Runtime support for dependency tracking.
//!
//! This module provides the evaluation context used for dependency
//! discovery and the dependency graph that invalidation walks.

mod context;

pub(crate) use context::{DependencyGraph, TrackingContext};
