//! The tagged value universe.
//!
//! Every piece of data a store can hold is a [`Value`]: primitives, plain
//! containers, or containers already wrapped for observation.

mod value;

pub use value::Value;
