use crate::{config::WaitMode, id::HandleId, kernel::TileKernel, storage::MemoryUsage};
use core::fmt::Debug;
use thiserror::Error;

mod handle;

pub use handle::*;

/// The compute server is responsible for handling resources and computations over resources.
///
/// Everything in the server is mutable, therefore it should be solely accessed through the
/// [compute client](crate::client::ComputeClient), which serializes every call.
pub trait ComputeServer: Send + Debug {
    /// Properties of the device the server drives.
    fn properties(&self) -> &DeviceProperties;

    /// Reserves `size` bytes under the given id.
    fn alloc(&mut self, id: HandleId, size: u64) -> Result<(), IoError>;

    /// Releases the allocation registered under the given id.
    fn free(&mut self, id: HandleId);

    /// Copies the bytes covered by the binding into host memory.
    fn read(&mut self, binding: &Binding) -> Result<Vec<u8>, IoError>;

    /// Writes host bytes into the range covered by the binding.
    fn write(&mut self, binding: &Binding, data: &[u8]) -> Result<(), IoError>;

    /// Copies `src` into `dst`. Both bindings must have the same size. They may overlap when
    /// they point to the same allocation.
    fn copy(&mut self, src: &Binding, dst: &Binding) -> Result<(), IoError>;

    /// Repeats `pattern` over the whole binding.
    fn fill(&mut self, binding: &Binding, pattern: &[u8]) -> Result<(), IoError>;

    /// Executes `kernel` over `tile_count` tiles.
    ///
    /// The output binding is split in `tile_count` equal windows, one per tile. The call returns
    /// once every tile completed, waiting the way `wait` asks.
    fn launch(
        &mut self,
        kernel: &dyn TileKernel,
        tile_count: u32,
        bindings: Bindings,
        wait: WaitMode,
    ) -> Result<(), LaunchError>;

    /// Waits for all pending work to complete.
    fn sync(&mut self);

    /// Memory currently held by the server.
    fn memory_usage(&self) -> MemoryUsage;
}

/// Properties of a compute device.
#[derive(new, Debug, Clone, PartialEq, Eq)]
pub struct DeviceProperties {
    /// Preferred number of lanes per tile.
    pub tile_dim: u32,
    /// Largest number of lanes a tile can hold.
    pub max_tile_dim: u32,
    /// Number of compute units available.
    pub compute_units: u32,
    /// Shared memory available to one tile, in bytes.
    pub max_shared_memory_size: usize,
    /// Memory properties.
    pub memory: MemoryDeviceProperties,
}

/// Memory properties of a compute device.
#[derive(new, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryDeviceProperties {
    /// Largest single allocation, in bytes.
    pub max_alloc_size: u64,
    /// Alignment of allocations, in bytes.
    pub alignment: u64,
}

/// Bindings of a tiled kernel launch.
#[derive(new, Debug, Clone, Default)]
pub struct Bindings {
    /// Read-only buffers.
    pub inputs: Vec<Binding>,
    /// The buffer receiving one window per tile.
    pub output: Binding,
}

/// Error returned by memory transfers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IoError {
    /// Buffer size exceeds the max available
    #[error("can't allocate buffer of size {size}, the maximum is {max}")]
    BufferTooBig {
        /// The size of the buffer in bytes.
        size: u64,
        /// The maximum allocation size in bytes.
        max: u64,
    },

    /// Handle wasn't found in the storage
    #[error("couldn't find resource for that handle")]
    InvalidHandle,

    /// The binding range is outside of its allocation
    #[error("range {start}..{end} is out of bounds for an allocation of {size} bytes")]
    OutOfBounds {
        /// Start of the range in bytes.
        start: u64,
        /// End of the range in bytes.
        end: u64,
        /// Size of the allocation in bytes.
        size: u64,
    },

    /// The client was called from kernel code while its server runs the launch
    #[error("compute clients can't be used from inside a tile")]
    InsideTile,

    /// Source and destination sizes of a transfer don't match
    #[error("can't transfer {src} bytes into a range of {dst} bytes")]
    SizeMismatch {
        /// Source size in bytes.
        src: u64,
        /// Destination size in bytes.
        dst: u64,
    },
}

/// Kernel launch errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LaunchError {
    /// Too many resources were requested
    #[error("too many resources were requested during launch: {0}")]
    TooManyResources(#[from] ResourceLimitError),

    /// The output of a launch is also one of its inputs
    #[error("the output binding {0} is also bound as an input")]
    AliasedBinding(HandleId),

    /// The bindings can't be split over the tiles
    #[error("invalid bindings: {reason}")]
    InvalidBindings {
        /// Why the bindings were rejected.
        reason: String,
    },

    /// The kernel itself reported a failure
    #[error("kernel {kernel} failed: {reason}")]
    Kernel {
        /// Name of the kernel.
        kernel: String,
        /// The caused of the failure.
        reason: String,
    },

    /// Can't launch because of an IO Error.
    #[error("an io error happened during launch: {0}")]
    IoError(#[from] IoError),
}

/// Resource limit errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceLimitError {
    /// Shared memory exceeds maximum
    #[error("too much shared memory requested, {requested} bytes for a maximum of {max} bytes")]
    SharedMemory {
        /// Value requested
        requested: usize,
        /// Maximum value
        max: usize,
    },

    /// Tile width isn't supported
    #[error("tile width {requested} must be a power of two no larger than {max}")]
    TileDim {
        /// Requested value
        requested: u32,
        /// Maximum value
        max: u32,
    },
}
