use super::DeviceVector;
use bolt_runtime::BoltError;
use bytemuck::Pod;
use core::ops::{Deref, DerefMut};

/// Host copy of the whole buffer of a [DeviceVector].
///
/// Mutable access marks the mapping dirty. A dirty mapping is written back to the device when
/// it is dropped; use [flush](Self::flush) to write back eagerly and observe failures.
pub struct MappedBuffer<'a, T: Pod> {
    vector: &'a mut DeviceVector<T>,
    data: Vec<T>,
    dirty: bool,
}

impl<'a, T: Pod> MappedBuffer<'a, T> {
    pub(crate) fn new(vector: &'a mut DeviceVector<T>, data: Vec<T>) -> Self {
        Self {
            vector,
            data,
            dirty: false,
        }
    }

    /// Whether the host copy was modified since it was mapped or flushed.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Writes modified elements back to the device.
    pub fn flush(&mut self) -> Result<(), BoltError> {
        if self.dirty {
            self.vector.write_range(0, &self.data)?;
            self.dirty = false;
        }

        Ok(())
    }
}

impl<T: Pod> Deref for MappedBuffer<'_, T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl<T: Pod> DerefMut for MappedBuffer<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.dirty = true;
        &mut self.data
    }
}

impl<T: Pod> Drop for MappedBuffer<'_, T> {
    fn drop(&mut self) {
        if let Err(err) = self.flush() {
            log::error!("Can't write back mapped elements: {err}");
        }
    }
}
