#![warn(missing_docs)]

//! Bolt runtime crate: execution contexts, compute servers and the host device.
//!
//! Every Bolt algorithm receives a [`Control`] that decides where work runs. Work either stays
//! on the calling thread, fans out over a host thread pool, or is launched as tiled kernels on
//! an accelerator reached through a [`client::ComputeClient`].

#[macro_use]
extern crate derive_new;

/// Compute client module.
pub mod client;
/// Configuration module.
pub mod config;
/// Tiled kernel module.
pub mod kernel;
/// Compute server module.
pub mod server;
/// Device storage module.
pub mod storage;

/// Host device runtime.
#[cfg(feature = "host")]
pub mod host;

/// Identifier module.
pub mod id;

mod base;
mod control;
mod error;

pub use base::*;
pub use config::{AcceleratorFallback, AcceleratorKind, RunMode, WaitMode};
pub use control::*;
pub use error::*;
