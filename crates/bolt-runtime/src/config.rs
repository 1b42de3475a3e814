mod base;
mod dispatch;
mod launch;

/// Logging configuration and the dispatch logger.
pub mod logger;

pub use base::*;
pub use dispatch::*;
pub use launch::*;
