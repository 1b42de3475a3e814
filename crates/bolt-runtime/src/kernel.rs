use crate::{
    id::KernelId,
    server::{LaunchError, ResourceLimitError},
};
use bytemuck::Pod;
use core::cell::Cell;

std::thread_local! {
    static ACTIVE_TILES: Cell<u32> = const { Cell::new(0) };
}

/// Whether the current thread is executing a tile.
///
/// Compute clients refuse to be driven from kernel code, their server is locked for the
/// duration of the launch.
pub fn in_tile() -> bool {
    ACTIVE_TILES.with(|tiles| tiles.get() > 0)
}

struct TileGuard;

impl TileGuard {
    fn enter() -> Self {
        ACTIVE_TILES.with(|tiles| tiles.set(tiles.get() + 1));
        Self
    }
}

impl Drop for TileGuard {
    fn drop(&mut self) {
        ACTIVE_TILES.with(|tiles| tiles.set(tiles.get() - 1));
    }
}

/// A kernel executed once per tile.
///
/// A tile is a group of `tile_dim` lanes that share scratch memory and synchronise through
/// barriers. A kernel describes the work of a whole tile: every phase loops over the lanes of
/// the tile, and phases are separated by [TileScope::sync_units]. Tiles are independent from
/// each other and may run concurrently on different workers.
pub trait TileKernel: Send + Sync {
    /// Identifier of the kernel, used for logging.
    fn id(&self) -> KernelId;

    /// Number of lanes in a tile.
    fn tile_dim(&self) -> u32;

    /// Executes one tile.
    fn execute(&self, scope: &mut TileScope<'_>) -> Result<(), LaunchError>;
}

/// Execution state of a single tile.
///
/// The current thread counts as [in a tile](in_tile) while the scope is alive.
pub struct TileScope<'a> {
    tile_pos: u32,
    tile_dim: u32,
    tile_count: u32,
    inputs: &'a [&'a [u8]],
    output: &'a mut [u8],
    shared_memory_used: usize,
    max_shared_memory_size: usize,
    phase: u32,
    _guard: TileGuard,
}

impl<'a> TileScope<'a> {
    /// Creates the scope of the tile at `tile_pos`.
    pub fn new(
        tile_pos: u32,
        tile_dim: u32,
        tile_count: u32,
        inputs: &'a [&'a [u8]],
        output: &'a mut [u8],
        max_shared_memory_size: usize,
    ) -> Self {
        Self {
            tile_pos,
            tile_dim,
            tile_count,
            inputs,
            output,
            shared_memory_used: 0,
            max_shared_memory_size,
            phase: 0,
            _guard: TileGuard::enter(),
        }
    }

    /// Position of the tile in the launch.
    pub fn tile_pos(&self) -> u32 {
        self.tile_pos
    }

    /// Number of lanes in the tile.
    pub fn tile_dim(&self) -> u32 {
        self.tile_dim
    }

    /// Number of tiles in the launch.
    pub fn tile_count(&self) -> u32 {
        self.tile_count
    }

    /// Global index of a lane of this tile.
    pub fn absolute_pos(&self, lane: u32) -> usize {
        self.tile_pos as usize * self.tile_dim as usize + lane as usize
    }

    /// Lanes of the tile, in order.
    pub fn lanes(&self) -> core::ops::Range<u32> {
        0..self.tile_dim
    }

    /// Bytes of the input bound at `index`.
    pub fn input(&self, index: usize) -> Result<&'a [u8], LaunchError> {
        self.inputs
            .get(index)
            .copied()
            .ok_or_else(|| LaunchError::InvalidBindings {
                reason: format!(
                    "input {index} requested but only {} are bound",
                    self.inputs.len()
                ),
            })
    }

    /// The output window owned by this tile.
    pub fn output(&mut self) -> &mut [u8] {
        &mut *self.output
    }

    /// Allocates `len` zeroed elements of scratch memory shared by the lanes of the tile.
    pub fn shared_memory<T: Pod>(&mut self, len: usize) -> Result<Vec<T>, LaunchError> {
        let requested = self.shared_memory_used + len * core::mem::size_of::<T>();

        if requested > self.max_shared_memory_size {
            return Err(ResourceLimitError::SharedMemory {
                requested,
                max: self.max_shared_memory_size,
            }
            .into());
        }

        self.shared_memory_used = requested;
        Ok(bytemuck::zeroed_vec(len))
    }

    /// Barrier between two phases of the tile.
    ///
    /// Every lane finished the previous phase when this returns.
    pub fn sync_units(&mut self) {
        self.phase += 1;
    }

    /// Number of barriers crossed so far.
    pub fn phase(&self) -> u32 {
        self.phase
    }
}
