use crate::{client::ComputeClient, id::HandleId};

/// Owning reference to one device allocation.
///
/// The allocation is released when the handle is dropped.
pub struct Handle {
    pub(crate) id: HandleId,
    size: u64,
    client: ComputeClient,
}

impl core::fmt::Debug for Handle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Handle")
            .field("id", &self.id)
            .field("size", &self.size)
            .finish()
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.client.free(self.id);
    }
}

impl Handle {
    pub(crate) fn new(id: HandleId, size: u64, client: ComputeClient) -> Self {
        Self { id, size, client }
    }

    /// Id of the allocation.
    pub fn id(&self) -> HandleId {
        self.id
    }

    /// Size of the allocation in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// The client owning the allocation.
    pub fn client(&self) -> &ComputeClient {
        &self.client
    }

    /// Binding over the whole allocation.
    pub fn binding(&self) -> Binding {
        Binding::new(self.id, 0, self.size)
    }

    /// Binding over `size` bytes starting at `offset`.
    ///
    /// The range is validated by the server when the binding is used.
    pub fn offset_binding(&self, offset: u64, size: u64) -> Binding {
        Binding::new(self.id, offset, size)
    }
}

/// Non-owning view over a byte range of an allocation.
#[derive(new, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Binding {
    /// Allocation the binding points into.
    pub id: HandleId,
    /// Offset of the range in bytes.
    pub offset: u64,
    /// Size of the range in bytes.
    pub size: u64,
}

impl Binding {
    /// End of the range in bytes.
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }
}
