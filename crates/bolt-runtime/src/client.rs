use crate::{
    config::WaitMode,
    id::HandleId,
    kernel::{in_tile, TileKernel},
    server::{Binding, Bindings, ComputeServer, DeviceProperties, Handle, IoError, LaunchError},
    storage::MemoryUsage,
};
use std::sync::Arc;

type ServerGuard<'a> = spin::MutexGuard<'a, Box<dyn ComputeServer>>;

/// The ComputeClient is the entry point to require tasks from the ComputeServer.
/// It should be obtained for a specific device via the Compute struct.
///
/// Cloning a client is cheap and every clone talks to the same server.
#[derive(Clone)]
pub struct ComputeClient {
    server: Arc<spin::Mutex<Box<dyn ComputeServer>>>,
    properties: Arc<DeviceProperties>,
}

impl core::fmt::Debug for ComputeClient {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ComputeClient")
            .field("properties", &self.properties)
            .finish()
    }
}

impl ComputeClient {
    /// Create a new client wrapping the given server.
    pub fn new<S: ComputeServer + 'static>(server: S) -> Self {
        let properties = Arc::new(server.properties().clone());

        Self {
            server: Arc::new(spin::Mutex::new(Box::new(server))),
            properties,
        }
    }

    /// Get the properties of the device.
    pub fn properties(&self) -> &DeviceProperties {
        &self.properties
    }

    /// Whether two clients drive the same server.
    pub fn same_server(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.server, &other.server)
    }

    /// Reserves `size` bytes on the device. The content is unspecified.
    pub fn empty(&self, size: u64) -> Result<Handle, IoError> {
        let id = HandleId::new();
        self.server()?.alloc(id, size)?;

        Ok(Handle::new(id, size, self.clone()))
    }

    /// Given a resource, stores it and returns the resource handle.
    pub fn create(&self, data: &[u8]) -> Result<Handle, IoError> {
        let handle = self.empty(data.len() as u64)?;
        self.write(&handle.binding(), data)?;

        Ok(handle)
    }

    /// Given a binding, returns the owned resource as bytes.
    pub fn read(&self, binding: &Binding) -> Result<Vec<u8>, IoError> {
        self.server()?.read(binding)
    }

    /// Reads the whole allocation of a handle.
    pub fn read_one(&self, handle: &Handle) -> Result<Vec<u8>, IoError> {
        self.read(&handle.binding())
    }

    /// Writes host bytes into the range covered by the binding.
    pub fn write(&self, binding: &Binding, data: &[u8]) -> Result<(), IoError> {
        self.server()?.write(binding, data)
    }

    /// Copies `src` into `dst`.
    pub fn copy(&self, src: &Binding, dst: &Binding) -> Result<(), IoError> {
        self.server()?.copy(src, dst)
    }

    /// Repeats `pattern` over the binding.
    pub fn fill(&self, binding: &Binding, pattern: &[u8]) -> Result<(), IoError> {
        self.server()?.fill(binding, pattern)
    }

    /// Executes the `kernel` over `tile_count` tiles.
    ///
    /// The server stays locked until every tile is done. Allocations, transfers and launches
    /// requested from kernel code fail with [IoError::InsideTile].
    pub fn launch(
        &self,
        kernel: &dyn TileKernel,
        tile_count: u32,
        bindings: Bindings,
        wait: WaitMode,
    ) -> Result<(), LaunchError> {
        self.server()?.launch(kernel, tile_count, bindings, wait)
    }

    /// Wait for the completion of every task in the server.
    pub fn sync(&self) {
        self.server.lock().sync()
    }

    /// Get the current memory usage of this client.
    pub fn memory_usage(&self) -> MemoryUsage {
        self.server.lock().memory_usage()
    }

    pub(crate) fn free(&self, id: HandleId) {
        self.server.lock().free(id)
    }

    // Kernel code runs while the launch holds the lock, so locking again from a tile never
    // returns.
    fn server(&self) -> Result<ServerGuard<'_>, IoError> {
        if in_tile() {
            return Err(IoError::InsideTile);
        }

        Ok(self.server.lock())
    }
}
