use super::{DeviceIter, ElementMut, ElementRef, MappedBuffer, VectorId};
use bolt_runtime::{
    client::ComputeClient,
    server::{Binding, Handle},
    BoltError, Control,
};
use bytemuck::Pod;
use core::{marker::PhantomData, ops::Range};

/// A growable sequence stored in accelerator memory.
///
/// The vector owns one device allocation of `capacity` elements, of which the first `size` are
/// active. Reading or writing a single element costs one transfer between host and device;
/// bulk operations ([from_slice](Self::from_slice), [to_vec](Self::to_vec), [data](Self::data))
/// move the whole range at once, and shifts inside the buffer never leave the device.
///
/// ```
/// use bolt_runtime::Control;
/// use bolt_std::DeviceVector;
///
/// let ctl = Control::new();
/// let mut vector = DeviceVector::from_slice(&ctl, &[1u32, 2, 3]).unwrap();
/// vector.push_back(4).unwrap();
///
/// assert_eq!(vector.to_vec().unwrap(), [1, 2, 3, 4]);
/// ```
pub struct DeviceVector<T: Pod> {
    id: VectorId,
    client: ComputeClient,
    handle: Option<Handle>,
    size: usize,
    capacity: usize,
    _elem: PhantomData<T>,
}

impl<T: Pod> core::fmt::Debug for DeviceVector<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DeviceVector")
            .field("id", &self.id)
            .field("elem", &core::any::type_name::<T>())
            .field("size", &self.size)
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl<T: Pod> DeviceVector<T> {
    const ELEM_SIZE: usize = core::mem::size_of::<T>();

    /// Creates an empty vector on the accelerator of the context.
    pub fn new(ctl: &Control) -> Result<Self, BoltError> {
        Ok(Self {
            id: VectorId::new(),
            client: ctl.client()?.clone(),
            handle: None,
            size: 0,
            capacity: 0,
            _elem: PhantomData,
        })
    }

    /// Creates a vector of `len` elements.
    ///
    /// When `init` is set every element is `value`, written by a single fill command. Otherwise
    /// the content is unspecified.
    pub fn with_value(ctl: &Control, len: usize, value: T, init: bool) -> Result<Self, BoltError> {
        let mut vector = Self::new(ctl)?;
        vector.handle = vector.allocate(len)?;
        vector.size = len;
        vector.capacity = len;

        if init {
            vector.fill_range(0..len, value)?;
        }

        Ok(vector)
    }

    /// Creates a vector holding a copy of `data`.
    pub fn from_slice(ctl: &Control, data: &[T]) -> Result<Self, BoltError> {
        let mut vector = Self::new(ctl)?;
        vector.handle = vector.allocate(data.len())?;
        vector.size = data.len();
        vector.capacity = data.len();
        vector.write_range(0, data)?;

        Ok(vector)
    }

    /// Creates a vector from the items of an iterator.
    pub fn from_iter<I: IntoIterator<Item = T>>(ctl: &Control, iter: I) -> Result<Self, BoltError> {
        let data: Vec<T> = iter.into_iter().collect();
        Self::from_slice(ctl, &data)
    }

    /// Identity of the vector.
    pub fn id(&self) -> VectorId {
        self.id
    }

    /// Number of active elements.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of elements the current allocation can hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether the vector has no active element.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// The client of the accelerator holding the elements.
    pub fn client(&self) -> &ComputeClient {
        &self.client
    }

    /// The device allocation, `None` while the capacity is zero.
    pub fn handle(&self) -> Option<&Handle> {
        self.handle.as_ref()
    }

    /// Binding over the elements in `range`, `None` when the range is empty.
    pub fn binding(&self, range: Range<usize>) -> Option<Binding> {
        if range.is_empty() {
            return None;
        }

        self.handle.as_ref().map(|handle| {
            handle.offset_binding(
                (range.start * Self::ELEM_SIZE) as u64,
                (range.len() * Self::ELEM_SIZE) as u64,
            )
        })
    }

    /// Cursor to the first element.
    pub fn begin(&self) -> DeviceIter {
        DeviceIter::new(self.id, 0)
    }

    /// Cursor one past the last element.
    pub fn end(&self) -> DeviceIter {
        DeviceIter::new(self.id, self.size)
    }

    /// Cursor to the element at `index`. Bounds are checked when the cursor is used.
    pub fn iter_at(&self, index: usize) -> DeviceIter {
        DeviceIter::new(self.id, index)
    }

    /// Element indices covered by `[first, last)`.
    pub fn range(&self, first: DeviceIter, last: DeviceIter) -> Result<Range<usize>, BoltError> {
        let start = self.position(first)?;
        let end = self.position(last)?;

        if start > end {
            return Err(BoltError::InvalidRange {
                first: start,
                last: end,
            });
        }

        Ok(start..end)
    }

    /// Reads the element at `index`.
    pub fn get(&self, index: usize) -> Result<T, BoltError> {
        self.check_index(index)?;
        self.read_at(index)
    }

    /// Writes `value` at `index`.
    pub fn set(&mut self, index: usize, value: T) -> Result<(), BoltError> {
        self.check_index(index)?;
        self.write_range(index, &[value])
    }

    /// Read proxy for the element at `index`.
    pub fn element(&self, index: usize) -> Result<ElementRef<'_, T>, BoltError> {
        self.check_index(index)?;
        Ok(ElementRef::new(self, index))
    }

    /// Read and write proxy for the element at `index`.
    pub fn element_mut(&mut self, index: usize) -> Result<ElementMut<'_, T>, BoltError> {
        self.check_index(index)?;
        Ok(ElementMut::new(self, index))
    }

    /// First element.
    pub fn front(&self) -> Result<T, BoltError> {
        self.get(0)
    }

    /// Last element.
    pub fn back(&self) -> Result<T, BoltError> {
        match self.size {
            0 => Err(BoltError::out_of_range("back() called on an empty vector")),
            size => self.read_at(size - 1),
        }
    }

    /// Resizes the vector to `len` elements, filling new elements with `value`.
    ///
    /// Nothing happens when `len` equals the capacity, the size included. Any other length
    /// reallocates to exactly `len` elements, keeping the first `min(len, size)` ones. Cursors
    /// are invalidated.
    ///
    /// Fails with [BoltError::Allocation] when the device can't hold `len` elements, in which
    /// case the vector is left untouched.
    pub fn resize(&mut self, len: usize, value: T) -> Result<(), BoltError> {
        if len == self.capacity {
            return Ok(());
        }

        let kept = len.min(self.size);
        self.reallocate(len)?;

        if len > kept {
            self.fill_range(kept..len, value)?;
        }
        self.size = len;

        Ok(())
    }

    /// Grows the capacity to at least `capacity` elements, keeping the active ones.
    pub fn reserve(&mut self, capacity: usize) -> Result<(), BoltError> {
        if capacity <= self.capacity {
            return Ok(());
        }

        self.reallocate(capacity)
    }

    /// Reduces the capacity to the size.
    pub fn shrink_to_fit(&mut self) -> Result<(), BoltError> {
        if self.capacity == self.size {
            return Ok(());
        }

        self.reallocate(self.size)
    }

    /// Appends an element, doubling the capacity when the vector is full.
    pub fn push_back(&mut self, value: T) -> Result<(), BoltError> {
        if self.size == self.capacity {
            self.reallocate(self.grown_capacity(self.size + 1)?)?;
        }

        self.write_range(self.size, &[value])?;
        self.size += 1;

        Ok(())
    }

    /// Removes the last element, if any. The capacity is kept.
    pub fn pop_back(&mut self) {
        self.size = self.size.saturating_sub(1);
    }

    /// Removes the element at `position`, shifting the following ones down.
    ///
    /// Returns a cursor to the element that followed the removed one.
    pub fn erase(&mut self, position: DeviceIter) -> Result<DeviceIter, BoltError> {
        let index = self.position(position)?;
        if index == self.size {
            return Err(BoltError::out_of_range(
                "iterator is pointing past the end of this container",
            ));
        }

        self.shift(index + 1..self.size, index)?;
        self.size -= 1;

        Ok(self.iter_at(index))
    }

    /// Removes the elements in `[first, last)`.
    ///
    /// Erasing the whole vector releases its storage, like [clear](Self::clear).
    pub fn erase_range(
        &mut self,
        first: DeviceIter,
        last: DeviceIter,
    ) -> Result<DeviceIter, BoltError> {
        let range = self.range(first, last)?;

        if range.start == 0 && range.end == self.size {
            self.clear();
            return Ok(self.begin());
        }

        self.shift(range.end..self.size, range.start)?;
        self.size -= range.len();

        Ok(self.iter_at(range.start))
    }

    /// Inserts `value` before `position`.
    ///
    /// Returns a cursor to the inserted element.
    pub fn insert(&mut self, position: DeviceIter, value: T) -> Result<DeviceIter, BoltError> {
        let index = self.position(position)?;

        if index == self.size {
            self.push_back(value)?;
            return Ok(self.iter_at(index));
        }

        if self.size == self.capacity {
            self.reallocate(self.grown_capacity(self.size + 1)?)?;
        }

        self.shift(index..self.size, index + 1)?;
        self.write_range(index, &[value])?;
        self.size += 1;

        Ok(self.iter_at(index))
    }

    /// Inserts `count` copies of `value` before `position`.
    pub fn insert_n(
        &mut self,
        position: DeviceIter,
        count: usize,
        value: T,
    ) -> Result<DeviceIter, BoltError> {
        let index = self.open_gap(position, count)?;
        self.fill_range(index..index + count, value)?;
        self.size += count;

        Ok(self.iter_at(index))
    }

    /// Inserts a copy of `data` before `position`.
    pub fn insert_slice(&mut self, position: DeviceIter, data: &[T]) -> Result<DeviceIter, BoltError> {
        let index = self.open_gap(position, data.len())?;
        self.write_range(index, data)?;
        self.size += data.len();

        Ok(self.iter_at(index))
    }

    /// Exchanges the content of two vectors, cursors follow their storage.
    pub fn swap(&mut self, other: &mut Self) {
        core::mem::swap(self, other);
    }

    /// Replaces the content with `len` copies of `value`.
    pub fn assign(&mut self, len: usize, value: T) -> Result<(), BoltError> {
        if len > self.capacity {
            self.handle = self.allocate(len)?;
            self.capacity = len;
        }

        self.fill_range(0..len, value)?;
        self.size = len;

        Ok(())
    }

    /// Replaces the content with a copy of `data`.
    pub fn assign_slice(&mut self, data: &[T]) -> Result<(), BoltError> {
        if data.len() > self.capacity {
            self.handle = self.allocate(data.len())?;
            self.capacity = data.len();
        }

        self.write_range(0, data)?;
        self.size = data.len();

        Ok(())
    }

    /// Removes every element and releases the storage.
    pub fn clear(&mut self) {
        self.handle = None;
        self.size = 0;
        self.capacity = 0;
    }

    /// Copies the active elements to host memory.
    pub fn to_vec(&self) -> Result<Vec<T>, BoltError> {
        self.read_range(0..self.size)
    }

    /// Copies the elements in `range` to host memory.
    pub fn read(&self, range: Range<usize>) -> Result<Vec<T>, BoltError> {
        if range.start > range.end {
            return Err(BoltError::InvalidRange {
                first: range.start,
                last: range.end,
            });
        }

        if range.end > self.size {
            return Err(BoltError::out_of_range(format!(
                "range ends at {} past a vector of size {}",
                range.end, self.size
            )));
        }

        self.read_range(range)
    }

    /// Maps the whole buffer into host memory, `capacity` elements of which only the first
    /// `size` are active.
    ///
    /// Changes made through the mapping are written back when it is dropped, or by
    /// [MappedBuffer::flush] to observe errors.
    pub fn data(&mut self) -> Result<MappedBuffer<'_, T>, BoltError> {
        let data = self.read_range(0..self.capacity)?;
        Ok(MappedBuffer::new(self, data))
    }

    pub(crate) fn read_at(&self, index: usize) -> Result<T, BoltError> {
        let mut values = self.read_range(index..index + 1)?;
        values
            .pop()
            .ok_or_else(|| BoltError::out_of_range(format!("no element at index {index}")))
    }

    pub(crate) fn read_range(&self, range: Range<usize>) -> Result<Vec<T>, BoltError> {
        match self.binding(range) {
            Some(binding) => {
                let bytes = self.client.read(&binding)?;
                Ok(bytemuck::pod_collect_to_vec(&bytes[..]))
            }
            None => Ok(Vec::new()),
        }
    }

    pub(crate) fn write_range(&mut self, start: usize, data: &[T]) -> Result<(), BoltError> {
        if let Some(binding) = self.binding(start..start + data.len()) {
            self.client.write(&binding, bytemuck::cast_slice(data))?;
        }

        Ok(())
    }

    fn check_index(&self, index: usize) -> Result<(), BoltError> {
        if index >= self.size {
            return Err(BoltError::out_of_range(format!(
                "index {index} is out of bounds for a vector of size {}",
                self.size
            )));
        }

        Ok(())
    }

    // Index of a cursor, which may be the end position.
    fn position(&self, cursor: DeviceIter) -> Result<usize, BoltError> {
        if cursor.owner != self.id {
            return Err(BoltError::out_of_range("iterator is not from this container"));
        }

        if cursor.index > self.size {
            return Err(BoltError::out_of_range(format!(
                "iterator at {} is past the end of a vector of size {}",
                cursor.index, self.size
            )));
        }

        Ok(cursor.index)
    }

    // Moves the elements of `range` so they start at `dest`, within the current allocation.
    fn shift(&self, range: Range<usize>, dest: usize) -> Result<(), BoltError> {
        let len = range.len();
        if let (Some(src), Some(dst)) = (self.binding(range), self.binding(dest..dest + len)) {
            self.client.copy(&src, &dst)?;
        }

        Ok(())
    }

    // Makes room for `count` elements at `position`, returning the index of the gap.
    fn open_gap(&mut self, position: DeviceIter, count: usize) -> Result<usize, BoltError> {
        let index = self.position(position)?;
        let required = self.size.checked_add(count).ok_or_else(|| self.overflow())?;

        if required > self.capacity {
            self.reallocate(required)?;
        }

        self.shift(index..self.size, index + count)?;
        Ok(index)
    }

    fn fill_range(&self, range: Range<usize>, value: T) -> Result<(), BoltError> {
        if let Some(binding) = self.binding(range) {
            self.client.fill(&binding, bytemuck::bytes_of(&value))?;
        }

        Ok(())
    }

    // Capacity after doubling, large enough for `required` elements.
    fn grown_capacity(&self, required: usize) -> Result<usize, BoltError> {
        let doubled = match self.capacity {
            0 => 1,
            capacity => capacity.checked_mul(2).ok_or_else(|| self.overflow())?,
        };

        Ok(doubled.max(required))
    }

    // Moves the elements to a new allocation of `capacity` elements.
    //
    // The new allocation is made before anything changes, so a failure leaves the vector intact.
    fn reallocate(&mut self, capacity: usize) -> Result<(), BoltError> {
        let handle = self.allocate(capacity)?;
        let kept = capacity.min(self.size);

        if let (Some(src), Some(dst)) = (self.binding(0..kept), handle.as_ref()) {
            let dst = dst.offset_binding(0, src.size);
            self.client.copy(&src, &dst)?;
        }

        log::trace!(
            "Reallocated {:?} from {} to {capacity} elements",
            self.id,
            self.capacity
        );
        self.handle = handle;
        self.capacity = capacity;
        self.size = kept;

        Ok(())
    }

    fn allocate(&self, len: usize) -> Result<Option<Handle>, BoltError> {
        if len == 0 || Self::ELEM_SIZE == 0 {
            return Ok(None);
        }

        let bytes = len.checked_mul(Self::ELEM_SIZE).ok_or_else(|| self.overflow())?;
        Ok(Some(self.client.empty(bytes as u64)?))
    }

    fn overflow(&self) -> BoltError {
        BoltError::Allocation {
            requested: u64::MAX,
            max: self.client.properties().memory.max_alloc_size,
        }
    }
}
