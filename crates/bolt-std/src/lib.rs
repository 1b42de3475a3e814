//! Bolt standard containers.
//!
//! [DeviceVector] keeps its elements in the memory of the accelerator held by a
//! [Control](bolt_runtime::Control), so algorithms can consume it without staging.

mod vector;

pub use vector::*;
