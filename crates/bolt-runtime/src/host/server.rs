use super::scheduler::Scheduler;
use crate::{
    config::WaitMode,
    id::HandleId,
    kernel::TileKernel,
    server::{Binding, Bindings, ComputeServer, DeviceProperties, IoError, LaunchError},
    storage::{resolve, BytesStorage, MemoryUsage},
};

/// Compute server emulating an accelerator on host threads.
///
/// Allocations are plain host buffers. Tiles of a launch are spread over the scheduler's
/// workers, the lanes of a tile run in lock-step on one worker.
#[derive(Debug)]
pub struct HostServer {
    storage: BytesStorage,
    scheduler: Scheduler,
    properties: DeviceProperties,
}

impl HostServer {
    /// Creates a server with the given properties and number of workers.
    pub fn new(properties: DeviceProperties, workers: usize) -> Self {
        Self {
            storage: BytesStorage::default(),
            scheduler: Scheduler::new(workers),
            properties,
        }
    }
}

impl ComputeServer for HostServer {
    fn properties(&self) -> &DeviceProperties {
        &self.properties
    }

    fn alloc(&mut self, id: HandleId, size: u64) -> Result<(), IoError> {
        let max = self.properties.memory.max_alloc_size;
        if size > max || usize::try_from(size).is_err() {
            return Err(IoError::BufferTooBig { size, max });
        }

        log::trace!("Allocating {size} bytes for {id}");
        self.storage.alloc(id, size as usize);
        Ok(())
    }

    fn free(&mut self, id: HandleId) {
        if !self.storage.dealloc(id) {
            log::warn!("Freeing unknown allocation {id}");
        }
    }

    fn read(&mut self, binding: &Binding) -> Result<Vec<u8>, IoError> {
        self.storage.get(binding).map(|bytes| bytes.to_vec())
    }

    fn write(&mut self, binding: &Binding, data: &[u8]) -> Result<(), IoError> {
        let bytes = self.storage.get_mut(binding)?;
        if bytes.len() != data.len() {
            return Err(IoError::SizeMismatch {
                src: data.len() as u64,
                dst: bytes.len() as u64,
            });
        }

        bytes.copy_from_slice(data);
        Ok(())
    }

    fn copy(&mut self, src: &Binding, dst: &Binding) -> Result<(), IoError> {
        if src.size != dst.size {
            return Err(IoError::SizeMismatch {
                src: src.size,
                dst: dst.size,
            });
        }

        if src.id == dst.id {
            let buffer = self.storage.buffer_mut(src.id)?;
            let src_range = resolve(src, buffer.len())?;
            let dst_range = resolve(dst, buffer.len())?;
            buffer.copy_within(src_range, dst_range.start);
            return Ok(());
        }

        let data = self.storage.get(src)?.to_vec();
        self.storage.get_mut(dst)?.copy_from_slice(&data);
        Ok(())
    }

    fn fill(&mut self, binding: &Binding, pattern: &[u8]) -> Result<(), IoError> {
        let bytes = self.storage.get_mut(binding)?;
        if pattern.is_empty() || bytes.len() % pattern.len() != 0 {
            return Err(IoError::SizeMismatch {
                src: pattern.len() as u64,
                dst: bytes.len() as u64,
            });
        }

        for chunk in bytes.chunks_exact_mut(pattern.len()) {
            chunk.copy_from_slice(pattern);
        }
        Ok(())
    }

    fn launch(
        &mut self,
        kernel: &dyn TileKernel,
        tile_count: u32,
        bindings: Bindings,
        wait: WaitMode,
    ) -> Result<(), LaunchError> {
        let tile_dim = kernel.tile_dim();
        if !tile_dim.is_power_of_two() || tile_dim > self.properties.max_tile_dim {
            return Err(crate::server::ResourceLimitError::TileDim {
                requested: tile_dim,
                max: self.properties.max_tile_dim,
            }
            .into());
        }

        let output_id = bindings.output.id;
        if bindings.inputs.iter().any(|input| input.id == output_id) {
            return Err(LaunchError::AliasedBinding(output_id));
        }

        log::trace!(
            "Launching {} over {tile_count} tiles of {tile_dim} lanes",
            kernel.id()
        );

        // The output buffer leaves the storage so inputs can be borrowed next to it.
        let mut output = self.storage.take(output_id)?;
        let result = match resolve(&bindings.output, output.len()) {
            Ok(range) => {
                let inputs: Result<Vec<&[u8]>, IoError> = bindings
                    .inputs
                    .iter()
                    .map(|binding| self.storage.get(binding))
                    .collect();

                match inputs {
                    Ok(inputs) => self.scheduler.dispatch_execute(
                        kernel,
                        tile_count,
                        &inputs,
                        &mut output[range],
                        self.properties.max_shared_memory_size,
                        wait,
                    ),
                    Err(err) => Err(err.into()),
                }
            }
            Err(err) => Err(err.into()),
        };
        self.storage.insert(output_id, output);

        result
    }

    fn sync(&mut self) {
        // Launches complete before returning, nothing is pending.
    }

    fn memory_usage(&self) -> MemoryUsage {
        self.storage.usage()
    }
}
