use crate::client::ComputeClient;
use core::ops::DerefMut;
use hashbrown::HashMap;

/// The compute type has the responsibility to retrieve the correct compute client based on the
/// given device.
pub struct ComputeRuntime<Device> {
    clients: spin::Mutex<Option<HashMap<Device, ComputeClient>>>,
}

impl<Device> Default for ComputeRuntime<Device>
where
    Device: core::hash::Hash + PartialEq + Eq + Clone + core::fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<Device> ComputeRuntime<Device>
where
    Device: core::hash::Hash + PartialEq + Eq + Clone + core::fmt::Debug,
{
    /// Create a new compute.
    pub const fn new() -> Self {
        Self {
            clients: spin::Mutex::new(None),
        }
    }

    /// Get the compute client for the given device.
    ///
    /// Provide the init function to create a new client if it isn't already initialized.
    pub fn client<Init>(&self, device: &Device, init: Init) -> ComputeClient
    where
        Init: Fn() -> ComputeClient,
    {
        let mut clients = self.clients.lock();
        let clients = clients.deref_mut().get_or_insert_with(HashMap::new);

        clients
            .entry(device.clone())
            .or_insert_with(|| {
                log::debug!("Creating compute client for device {device:?}");
                init()
            })
            .clone()
    }

    /// Register the compute client for the given device.
    ///
    /// # Note
    ///
    /// This function is mostly useful when the creation of the compute client needs options the
    /// init function can't provide.
    ///
    /// # Panics
    ///
    /// If a client is already registered for the given device.
    pub fn register(&self, device: &Device, client: ComputeClient) {
        let mut clients = self.clients.lock();
        let clients = clients.deref_mut().get_or_insert_with(HashMap::new);

        if clients.contains_key(device) {
            panic!("Client already created for device {device:?}");
        }

        clients.insert(device.clone(), client);
    }
}
