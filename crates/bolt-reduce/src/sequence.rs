use bolt_runtime::BoltError;
use bolt_std::{DeviceIter, DeviceVector};
use bytemuck::Pod;
use std::{borrow::Cow, ops::Range};

/// Input of a reduction: a range of host memory or of a [DeviceVector].
#[derive(Debug)]
pub enum Sequence<'a, T: Pod> {
    /// Elements `[first, last)` of a host slice.
    Host {
        /// The slice.
        data: &'a [T],
        /// Index of the first element.
        first: usize,
        /// Index one past the last element.
        last: usize,
    },
    /// Elements `[first, last)` of a device vector.
    Device {
        /// The vector.
        vector: &'a DeviceVector<T>,
        /// Cursor to the first element.
        first: DeviceIter,
        /// Cursor one past the last element.
        last: DeviceIter,
    },
}

impl<'a, T: Pod> Sequence<'a, T> {
    /// Elements `[first, last)` of a host slice.
    pub fn host_range(data: &'a [T], first: usize, last: usize) -> Self {
        Self::Host { data, first, last }
    }

    /// Elements `[first, last)` of a device vector.
    pub fn device_range(vector: &'a DeviceVector<T>, first: DeviceIter, last: DeviceIter) -> Self {
        Self::Device {
            vector,
            first,
            last,
        }
    }

    /// Checks the bounds of the sequence.
    pub(crate) fn resolve(self) -> Result<Resolved<'a, T>, BoltError> {
        match self {
            Sequence::Host { data, first, last } => {
                if first > last {
                    return Err(BoltError::InvalidRange { first, last });
                }
                if last > data.len() {
                    return Err(BoltError::out_of_range(format!(
                        "range ends at {last} past a slice of {} elements",
                        data.len()
                    )));
                }

                Ok(Resolved::Host(&data[first..last]))
            }
            Sequence::Device {
                vector,
                first,
                last,
            } => {
                let range = vector.range(first, last)?;
                Ok(Resolved::Device { vector, range })
            }
        }
    }
}

impl<'a, T: Pod> From<&'a [T]> for Sequence<'a, T> {
    fn from(data: &'a [T]) -> Self {
        Self::host_range(data, 0, data.len())
    }
}

impl<'a, T: Pod, const N: usize> From<&'a [T; N]> for Sequence<'a, T> {
    fn from(data: &'a [T; N]) -> Self {
        Self::host_range(data, 0, N)
    }
}

impl<'a, T: Pod> From<&'a Vec<T>> for Sequence<'a, T> {
    fn from(data: &'a Vec<T>) -> Self {
        Self::host_range(data, 0, data.len())
    }
}

impl<'a, T: Pod> From<&'a DeviceVector<T>> for Sequence<'a, T> {
    fn from(vector: &'a DeviceVector<T>) -> Self {
        Self::device_range(vector, vector.begin(), vector.end())
    }
}

/// A sequence whose bounds were checked.
pub(crate) enum Resolved<'a, T: Pod> {
    Host(&'a [T]),
    Device {
        vector: &'a DeviceVector<T>,
        range: Range<usize>,
    },
}

impl<T: Pod> Resolved<'_, T> {
    pub(crate) fn len(&self) -> usize {
        match self {
            Resolved::Host(data) => data.len(),
            Resolved::Device { range, .. } => range.len(),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The elements in host memory, read back in one transfer for device sequences.
    pub(crate) fn to_host(&self) -> Result<Cow<'_, [T]>, BoltError> {
        match self {
            Resolved::Host(data) => Ok(Cow::Borrowed(data)),
            Resolved::Device { vector, range } => Ok(Cow::Owned(vector.read(range.clone())?)),
        }
    }
}
