use core::sync::atomic::{AtomicU64, Ordering};

static VECTOR_COUNT: AtomicU64 = AtomicU64::new(0);

/// Identity of a [DeviceVector](crate::DeviceVector), stable across reallocations.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct VectorId {
    value: u64,
}

impl VectorId {
    pub(crate) fn new() -> Self {
        Self {
            value: VECTOR_COUNT.fetch_add(1, Ordering::Relaxed),
        }
    }
}

/// Position inside a [DeviceVector](crate::DeviceVector).
///
/// A cursor only remembers its vector and an index, it doesn't borrow the vector. Operations
/// taking a cursor check that it belongs to the vector and lies within its bounds.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct DeviceIter {
    pub(crate) owner: VectorId,
    pub(crate) index: usize,
}

impl DeviceIter {
    pub(crate) fn new(owner: VectorId, index: usize) -> Self {
        Self { owner, index }
    }

    /// Index of the element the cursor points to.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Vector the cursor was created from.
    pub fn owner(&self) -> VectorId {
        self.owner
    }

    /// The cursor moved by `delta` elements, saturating at the first position.
    pub fn offset(&self, delta: isize) -> Self {
        Self::new(self.owner, self.index.saturating_add_signed(delta))
    }

    /// Number of elements from this cursor to `other`.
    ///
    /// Returns `None` when the cursors belong to different vectors.
    pub fn distance_to(&self, other: &Self) -> Option<isize> {
        if self.owner != other.owner {
            return None;
        }

        Some(other.index as isize - self.index as isize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_arithmetic() {
        let owner = VectorId::new();
        let first = DeviceIter::new(owner, 2);
        let last = first.offset(5);

        assert_eq!(last.index(), 7);
        assert_eq!(first.distance_to(&last), Some(5));
        assert_eq!(last.distance_to(&first), Some(-5));
        assert_eq!(first.offset(-4).index(), 0);
        assert_eq!(
            first.distance_to(&DeviceIter::new(VectorId::new(), 2)),
            None
        );
    }
}
