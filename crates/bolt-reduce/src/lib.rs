//! Transform-reduce over host slices and device vectors.
//!
//! [transform_reduce] maps every element of a sequence and combines the results with an
//! associative function. The [Control](bolt_runtime::Control) passed to each call picks one of
//! three strategies: a serial fold, one partition per thread of the host pool, or tiled kernels
//! on the accelerator.

#[macro_use]
extern crate derive_new;

mod config;
mod host;
mod instructions;
mod launch;
mod sequence;
mod tiled;

pub use config::*;
pub use instructions::*;
pub use sequence::*;
pub use tiled::TransformReduceKernel;


#[cfg(feature = "export_tests")]
pub use test_log;

use bolt_runtime::{BoltError, Control, ExecutionStrategy};
use bytemuck::Pod;

/// Maps every element of `input` with `transform` and combines the results with `reduce`,
/// starting from `init`.
///
/// An empty sequence returns `init`, whatever the strategy.
///
/// # Ordering
///
/// `reduce` must be associative. The accelerator combines per-tile partial results in tile
/// order, not element order, and the multicore strategy combines per-partition results in
/// partition order. Every lane and partition starts from `init`, so `init` must be an identity
/// of `reduce` for the strategies to agree. Floating point sums may differ in their last bits
/// between strategies.
///
/// On the accelerator, `transform` and `reduce` run inside tiles while the device is busy with
/// the launch. Device calls made from them, such as reading a [DeviceVector](bolt_std::DeviceVector),
/// fail with [IoError::InsideTile](bolt_runtime::server::IoError::InsideTile).
///
/// # Errors
///
/// - [BoltError::Configuration] when the accelerator is forced but the context has none.
/// - [BoltError::InvalidRange] and [BoltError::OutOfRange] for malformed sequences.
/// - [BoltError::Allocation], [BoltError::Launch] and [BoltError::Io] from the accelerator.
///
/// ```
/// use bolt_runtime::Control;
/// use bolt_reduce::transform_reduce;
///
/// let values = [0, 10, 42, 55, 13, 42];
/// let count = transform_reduce(
///     &Control::new(),
///     &values[..],
///     |value: i32| (value == 42) as u32,
///     0,
///     |a, b| a + b,
/// )
/// .unwrap();
///
/// assert_eq!(count, 2);
/// ```
pub fn transform_reduce<'a, T, O, F, R>(
    ctl: &Control,
    input: impl Into<Sequence<'a, T>>,
    transform: F,
    init: O,
    reduce: R,
) -> Result<O, BoltError>
where
    T: Pod + Send + Sync,
    O: Pod + Send + Sync,
    F: Fn(T) -> O + Send + Sync,
    R: Fn(O, O) -> O + Send + Sync,
{
    let input = input.into().resolve()?;
    let strategy = ctl.resolve(input.len())?;

    if input.is_empty() {
        return Ok(init);
    }

    match strategy {
        ExecutionStrategy::Serial => {
            let data = input.to_host()?;
            Ok(host::serial(&data, &transform, init, &reduce))
        }
        ExecutionStrategy::MultiCore => {
            let data = input.to_host()?;
            Ok(host::multicore(ctl, &data, &transform, init, &reduce))
        }
        ExecutionStrategy::Accelerator => {
            launch::launch_transform_reduce(ctl, &input, &transform, init, &reduce)
        }
    }
}

/// Combines the elements of `input` with `reduce`, starting from `init`.
///
/// Same as [transform_reduce] with the identity transform.
pub fn reduce<'a, T, R>(
    ctl: &Control,
    input: impl Into<Sequence<'a, T>>,
    init: T,
    reduce: R,
) -> Result<T, BoltError>
where
    T: Pod + Send + Sync,
    R: Fn(T, T) -> T + Send + Sync,
{
    transform_reduce(ctl, input, |value| value, init, reduce)
}

/// Reduces `input` with a [ReduceInstruction], starting from its null value.
pub fn reduce_with<'a, I, T>(ctl: &Control, input: impl Into<Sequence<'a, T>>) -> Result<T, BoltError>
where
    I: ReduceInstruction<T>,
    T: Pod + Send + Sync,
{
    transform_reduce(ctl, input, |value| value, I::null_value(), I::combine)
}

/// Maps `input` with `transform` and reduces the results with a [ReduceInstruction].
pub fn transform_reduce_with<'a, I, T, O, F>(
    ctl: &Control,
    input: impl Into<Sequence<'a, T>>,
    transform: F,
) -> Result<O, BoltError>
where
    I: ReduceInstruction<O>,
    T: Pod + Send + Sync,
    O: Pod + Send + Sync,
    F: Fn(T) -> O + Send + Sync,
{
    transform_reduce(ctl, input, transform, I::null_value(), I::combine)
}
