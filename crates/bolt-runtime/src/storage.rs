use crate::{id::HandleId, server::Binding, server::IoError};
use core::ops::Range;
use hashbrown::HashMap;

/// Memory usage of a compute server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryUsage {
    /// Number of live allocations.
    pub number_allocs: u64,
    /// Bytes handed out to allocations.
    pub bytes_in_use: u64,
}

impl core::fmt::Display for MemoryUsage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{} allocations, {} bytes in use",
            self.number_allocs, self.bytes_in_use
        )
    }
}

/// Byte storage living in host memory.
#[derive(Default, Debug)]
pub struct BytesStorage {
    memory: HashMap<HandleId, Vec<u8>>,
}

impl BytesStorage {
    /// Allocates a zeroed buffer of `size` bytes.
    pub fn alloc(&mut self, id: HandleId, size: usize) {
        self.memory.insert(id, vec![0; size]);
    }

    /// Releases a buffer, returning whether it existed.
    pub fn dealloc(&mut self, id: HandleId) -> bool {
        self.memory.remove(&id).is_some()
    }

    /// Bytes covered by the binding.
    pub fn get(&self, binding: &Binding) -> Result<&[u8], IoError> {
        let buffer = self.memory.get(&binding.id).ok_or(IoError::InvalidHandle)?;
        let range = resolve(binding, buffer.len())?;
        Ok(&buffer[range])
    }

    /// Mutable bytes covered by the binding.
    pub fn get_mut(&mut self, binding: &Binding) -> Result<&mut [u8], IoError> {
        let buffer = self
            .memory
            .get_mut(&binding.id)
            .ok_or(IoError::InvalidHandle)?;
        let range = resolve(binding, buffer.len())?;
        Ok(&mut buffer[range])
    }

    /// Whole buffer of an allocation.
    pub fn buffer_mut(&mut self, id: HandleId) -> Result<&mut Vec<u8>, IoError> {
        self.memory.get_mut(&id).ok_or(IoError::InvalidHandle)
    }

    /// Removes a buffer from the storage so it can be borrowed apart from the others.
    ///
    /// It must be given back with [insert](Self::insert).
    pub fn take(&mut self, id: HandleId) -> Result<Vec<u8>, IoError> {
        self.memory.remove(&id).ok_or(IoError::InvalidHandle)
    }

    /// Puts back a buffer removed with [take](Self::take).
    pub fn insert(&mut self, id: HandleId, buffer: Vec<u8>) {
        self.memory.insert(id, buffer);
    }

    /// Current memory usage.
    pub fn usage(&self) -> MemoryUsage {
        MemoryUsage {
            number_allocs: self.memory.len() as u64,
            bytes_in_use: self.memory.values().map(|buffer| buffer.len() as u64).sum(),
        }
    }
}

/// Byte range of a binding inside a buffer of `len` bytes.
pub fn resolve(binding: &Binding, len: usize) -> Result<Range<usize>, IoError> {
    let out_of_bounds = || IoError::OutOfBounds {
        start: binding.offset,
        end: binding.offset.saturating_add(binding.size),
        size: len as u64,
    };
    let end = binding
        .offset
        .checked_add(binding.size)
        .ok_or_else(out_of_bounds)?;

    if end > len as u64 {
        return Err(out_of_bounds());
    }

    Ok(binding.offset as usize..end as usize)
}
