use bolt::{
    config::WaitMode,
    id::HandleId,
    kernel::{TileKernel, TileScope},
    server::{
        Binding, Bindings, ComputeServer, DeviceProperties, IoError, LaunchError,
        MemoryDeviceProperties,
    },
    storage::{resolve, BytesStorage, MemoryUsage},
};
use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};

/// The dummy server is used to test that algorithms only go through the compute server
/// interface. Tiles run one after the other on the calling thread.
#[derive(Debug)]
pub struct DummyServer {
    storage: BytesStorage,
    properties: DeviceProperties,
    launches: Arc<AtomicU32>,
}

impl DummyServer {
    pub fn new(launches: Arc<AtomicU32>) -> Self {
        Self {
            storage: BytesStorage::default(),
            properties: DeviceProperties::new(
                8,
                64,
                2,
                4096,
                MemoryDeviceProperties::new(1 << 20, 4),
            ),
            launches,
        }
    }
}

impl ComputeServer for DummyServer {
    fn properties(&self) -> &DeviceProperties {
        &self.properties
    }

    fn alloc(&mut self, id: HandleId, size: u64) -> Result<(), IoError> {
        let max = self.properties.memory.max_alloc_size;
        if size > max {
            return Err(IoError::BufferTooBig { size, max });
        }

        self.storage.alloc(id, size as usize);
        Ok(())
    }

    fn free(&mut self, id: HandleId) {
        self.storage.dealloc(id);
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
        let data = self.read(src)?;
        self.write(dst, &data)
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
        _wait: WaitMode,
    ) -> Result<(), LaunchError> {
        self.launches.fetch_add(1, Ordering::Relaxed);

        let mut output = self.storage.take(bindings.output.id)?;
        let range = resolve(&bindings.output, output.len())?;
        let inputs = bindings
            .inputs
            .iter()
            .map(|binding| self.storage.get(binding))
            .collect::<Result<Vec<_>, _>>()?;

        let window = range.len() / tile_count as usize;
        let mut result = Ok(());

        for (pos, chunk) in output[range].chunks_mut(window).enumerate() {
            let mut scope = TileScope::new(
                pos as u32,
                kernel.tile_dim(),
                tile_count,
                &inputs,
                chunk,
                self.properties.max_shared_memory_size,
            );
            result = kernel.execute(&mut scope);
            if result.is_err() {
                break;
            }
        }

        self.storage.insert(bindings.output.id, output);
        result
    }

    fn sync(&mut self) {
        // Nothing to do with dummy backend.
    }

    fn memory_usage(&self) -> MemoryUsage {
        self.storage.usage()
    }
}
