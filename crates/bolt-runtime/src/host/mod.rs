mod scheduler;
mod server;

pub use scheduler::Scheduler;
pub use server::HostServer;

use crate::{
    client::ComputeClient,
    server::{DeviceProperties, MemoryDeviceProperties},
    ComputeRuntime,
};
use sysinfo::System;

const DEFAULT_TILE_DIM: u32 = 64;
const MAX_TILE_DIM: u32 = 1024;
const MAX_SHARED_MEMORY_SIZE: usize = 64 * 1024;
const ALIGNMENT: u64 = 4;

static RUNTIME: ComputeRuntime<HostDevice> = ComputeRuntime::new();

/// The host device, an accelerator emulated on host worker threads.
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq)]
pub struct HostDevice {
    /// Index of the device, host devices with different indices have separate memory.
    pub index: usize,
}

impl HostDevice {
    /// Creates the host device with the given index.
    pub fn new(index: usize) -> Self {
        Self { index }
    }
}

/// Options overriding the properties detected for a host device.
#[derive(Default, Clone, Debug)]
pub struct HostOptions {
    /// Largest single allocation in bytes. Defaults to the system memory.
    pub max_alloc_size: Option<u64>,
    /// Preferred number of lanes per tile.
    pub tile_dim: Option<u32>,
    /// Reported number of compute units. Defaults to the available parallelism.
    pub compute_units: Option<u32>,
    /// Shared memory per tile in bytes.
    pub max_shared_memory_size: Option<usize>,
    /// Number of worker threads executing tiles.
    pub workers: Option<usize>,
}

/// Runtime giving access to host device clients.
#[derive(Debug)]
pub struct HostRuntime;

impl HostRuntime {
    /// The shared client of a host device, created on first use.
    pub fn client(device: &HostDevice) -> ComputeClient {
        RUNTIME.client(device, || create_client(HostOptions::default()))
    }

    /// Registers a host device configured with explicit options.
    ///
    /// # Panics
    ///
    /// If a client is already registered for the given device.
    pub fn register(device: &HostDevice, options: HostOptions) -> ComputeClient {
        let client = create_client(options);
        RUNTIME.register(device, client.clone());
        client
    }

    /// A standalone client that isn't shared through the registry.
    pub fn client_with_options(options: HostOptions) -> ComputeClient {
        create_client(options)
    }
}

fn create_client(options: HostOptions) -> ComputeClient {
    let parallelism = std::thread::available_parallelism()
        .map(|parallelism| parallelism.get())
        .unwrap_or(1);

    let max_alloc_size = options.max_alloc_size.unwrap_or_else(system_memory);
    let properties = DeviceProperties::new(
        options.tile_dim.unwrap_or(DEFAULT_TILE_DIM),
        MAX_TILE_DIM,
        options.compute_units.unwrap_or(parallelism as u32),
        options
            .max_shared_memory_size
            .unwrap_or(MAX_SHARED_MEMORY_SIZE),
        MemoryDeviceProperties::new(max_alloc_size, ALIGNMENT),
    );
    log::debug!("Creating host device with {properties:?}");

    let server = HostServer::new(properties, options.workers.unwrap_or(parallelism));
    ComputeClient::new(server)
}

fn system_memory() -> u64 {
    let mut system = System::new();
    system.refresh_memory();

    let total = system
        .cgroup_limits()
        .map(|limits| limits.total_memory)
        .unwrap_or(system.total_memory());

    match total {
        0 => u64::MAX,
        total => total,
    }
}
