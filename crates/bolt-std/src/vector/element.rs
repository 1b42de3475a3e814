use super::DeviceVector;
use bolt_runtime::BoltError;
use bytemuck::Pod;

/// Read proxy for one element of a [DeviceVector].
///
/// Each [get](Self::get) transfers the element from the device.
#[derive(Debug)]
pub struct ElementRef<'a, T: Pod> {
    vector: &'a DeviceVector<T>,
    index: usize,
}

impl<'a, T: Pod> ElementRef<'a, T> {
    pub(crate) fn new(vector: &'a DeviceVector<T>, index: usize) -> Self {
        Self { vector, index }
    }

    /// Index of the element.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Reads the element.
    pub fn get(&self) -> Result<T, BoltError> {
        self.vector.read_at(self.index)
    }
}

/// Read and write proxy for one element of a [DeviceVector].
///
/// Each [get](Self::get) or [set](Self::set) transfers the element between host and device.
/// The proxy borrows its vector mutably, so the vector can't be resized while it is alive.
#[derive(Debug)]
pub struct ElementMut<'a, T: Pod> {
    vector: &'a mut DeviceVector<T>,
    index: usize,
}

impl<'a, T: Pod> ElementMut<'a, T> {
    pub(crate) fn new(vector: &'a mut DeviceVector<T>, index: usize) -> Self {
        Self { vector, index }
    }

    /// Index of the element.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Reads the element.
    pub fn get(&self) -> Result<T, BoltError> {
        self.vector.read_at(self.index)
    }

    /// Writes the element.
    pub fn set(&mut self, value: T) -> Result<(), BoltError> {
        self.vector.write_range(self.index, &[value])
    }

    /// Reads the element, applies `update` and writes the result back.
    pub fn update<F: FnOnce(T) -> T>(&mut self, update: F) -> Result<T, BoltError> {
        let value = update(self.get()?);
        self.set(value)?;
        Ok(value)
    }
}
