use crate::server::{IoError, LaunchError};
use thiserror::Error;

/// Errors surfaced by Bolt algorithms and containers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BoltError {
    /// The execution context can't honour the request, or a configuration value is invalid.
    #[error("invalid configuration: {reason}")]
    Configuration {
        /// What is wrong with the configuration.
        reason: String,
    },

    /// The requested device allocation exceeds what the backend can provide.
    #[error("can't allocate {requested} bytes, the device maximum is {max} bytes")]
    Allocation {
        /// Requested size in bytes.
        requested: u64,
        /// Maximum allocation size of the device in bytes.
        max: u64,
    },

    /// An index or position doesn't belong to its sequence or lies past its end.
    #[error("out of range: {reason}")]
    OutOfRange {
        /// Which index was rejected and why.
        reason: String,
    },

    /// A `[first, last)` range where `first` comes after `last`.
    #[error("invalid range: first ({first}) is past last ({last})")]
    InvalidRange {
        /// Start of the range.
        first: usize,
        /// End of the range.
        last: usize,
    },

    /// A kernel launch failed on the backend.
    #[error("kernel launch failed: {0}")]
    Launch(LaunchError),

    /// A memory transfer failed on the backend.
    #[error("device io failed: {0}")]
    Io(IoError),
}

impl BoltError {
    pub(crate) fn configuration<S: Into<String>>(reason: S) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Creates an [out of range](BoltError::OutOfRange) error.
    pub fn out_of_range<S: Into<String>>(reason: S) -> Self {
        Self::OutOfRange {
            reason: reason.into(),
        }
    }
}

impl From<IoError> for BoltError {
    fn from(err: IoError) -> Self {
        match err {
            IoError::BufferTooBig { size, max } => Self::Allocation {
                requested: size,
                max,
            },
            err => Self::Io(err),
        }
    }
}

impl From<LaunchError> for BoltError {
    fn from(err: LaunchError) -> Self {
        match err {
            LaunchError::IoError(err) => err.into(),
            err => Self::Launch(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::ResourceLimitError;

    #[test]
    fn buffer_too_big_becomes_allocation_error() {
        let err: BoltError = IoError::BufferTooBig { size: 64, max: 32 }.into();

        assert_eq!(
            err,
            BoltError::Allocation {
                requested: 64,
                max: 32
            }
        );
    }

    #[test]
    fn launch_io_errors_are_flattened() {
        let err: BoltError = LaunchError::IoError(IoError::InvalidHandle).into();
        assert_eq!(err, BoltError::Io(IoError::InvalidHandle));

        let limit = ResourceLimitError::SharedMemory {
            requested: 10,
            max: 5,
        };
        let err: BoltError = LaunchError::from(limit.clone()).into();
        assert_eq!(err, BoltError::Launch(LaunchError::TooManyResources(limit)));
    }
}
