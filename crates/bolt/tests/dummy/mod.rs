mod server;

pub use server::*;

use bolt::{client::ComputeClient, Control};
use std::sync::{atomic::AtomicU32, Arc};

/// A control whose accelerator is a [DummyServer], with the counter of its launches.
pub fn dummy_control() -> (Control, Arc<AtomicU32>) {
    let launches = Arc::new(AtomicU32::new(0));
    let client = ComputeClient::new(DummyServer::new(launches.clone()));

    (Control::new().with_client(client), launches)
}
