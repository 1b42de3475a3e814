use crate::{config::LaunchSettings, host, sequence::Resolved, tiled::TransformReduceKernel};
use bolt_runtime::{
    config::DispatchLogLevel,
    kernel::TileKernel,
    server::{Binding, Bindings, Handle},
    BoltError, Control,
};
use bytemuck::Pod;
use core::mem::size_of;

/// Runs a transform-reduce on the accelerator of `ctl`.
///
/// Device sequences living on the accelerator are bound in place. Host sequences and vectors
/// of another accelerator are staged in a temporary buffer first. Each tile writes one partial
/// result, and the partial results are combined on the host in tile order.
pub(crate) fn launch_transform_reduce<T, O, F, R>(
    ctl: &Control,
    input: &Resolved<'_, T>,
    transform: &F,
    init: O,
    reduce: &R,
) -> Result<O, BoltError>
where
    T: Pod + Send + Sync,
    O: Pod + Send + Sync,
    F: Fn(T) -> O + Send + Sync,
    R: Fn(O, O) -> O + Send + Sync,
{
    let client = ctl.client()?;

    // Zero sized elements have nothing to bind.
    if size_of::<T>() == 0 || size_of::<O>() == 0 {
        let data = input.to_host()?;
        return Ok(host::serial(&data, transform, init, reduce));
    }

    let len = input.len();
    let settings =
        LaunchSettings::generate(len, size_of::<O>(), client.properties(), ctl.launch_config())?;

    let (binding, _staging) = bind_input(ctl, input)?;
    let output = client.empty(settings.tile_count as u64 * size_of::<O>() as u64)?;

    let kernel = TransformReduceKernel::new(len, settings.tile_dim, init, transform, reduce);
    ctl.log(DispatchLogLevel::Full, || {
        format!(
            "[{}] len={len} tiles={} wait={:?}",
            kernel.id(),
            settings.tile_count,
            ctl.wait_mode()
        )
    });

    client.launch(
        &kernel,
        settings.tile_count,
        Bindings::new(vec![binding], output.binding()),
        ctl.wait_mode(),
    )?;

    let bytes = client.read_one(&output)?;
    let partials: Vec<O> = bytemuck::pod_collect_to_vec(&bytes[..]);

    Ok(partials.into_iter().fold(init, |acc, partial| reduce(acc, partial)))
}

/// Binding of the input on the accelerator, with the staging buffer backing it if one was
/// needed. The staging buffer is freed when dropped.
fn bind_input<T: Pod>(
    ctl: &Control,
    input: &Resolved<'_, T>,
) -> Result<(Binding, Option<Handle>), BoltError> {
    let client = ctl.client()?;

    if let Resolved::Device { vector, range } = input {
        if vector.client().same_server(client) {
            if let Some(binding) = vector.binding(range.clone()) {
                return Ok((binding, None));
            }
        }
        log::debug!("Staging {} elements from another accelerator", range.len());
    }

    let data = input.to_host()?;
    let staging = client.create(bytemuck::cast_slice(&data))?;

    Ok((staging.binding(), Some(staging)))
}
