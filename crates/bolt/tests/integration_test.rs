mod dummy;

use bolt::{algorithm::TransformReduceKernel, prelude::*, AcceleratorFallback};
use dummy::dummy_control;
use pretty_assertions::assert_eq;
use serial_test::serial;
use std::sync::atomic::Ordering;

#[test_log::test]
fn algorithms_run_on_a_custom_server() {
    let (mut ctl, launches) = dummy_control();
    ctl.set_force_run_mode(RunMode::Accelerator);
    let vector = DeviceVector::from_iter(&ctl, 0..100u32).unwrap();

    let sum = reduce_with::<Sum, u32>(&ctl, &vector).unwrap();

    assert_eq!(sum, 4950);
    assert_eq!(launches.load(Ordering::Relaxed), 1);
    // The launch output is released, the vector stays.
    assert_eq!(vector.client().memory_usage().number_allocs, 1);
}

#[test_log::test]
fn containers_work_on_a_custom_server() {
    let (ctl, launches) = dummy_control();
    let mut vector = DeviceVector::from_slice(&ctl, &[1u16, 2, 3]).unwrap();

    vector.insert(vector.iter_at(1), 9).unwrap();
    assert_eq!(vector.capacity(), 6);
    vector.resize(6, 0).unwrap();
    assert_eq!(vector.size(), 4);
    vector.resize(7, 4).unwrap();
    vector.erase(vector.begin()).unwrap();

    assert_eq!(vector.to_vec().unwrap(), [9, 2, 3, 4, 4, 4]);
    assert_eq!(launches.load(Ordering::Relaxed), 0);
}

#[test_log::test]
fn forced_accelerator_without_one_fails() {
    let mut ctl = Control::new().without_accelerator();
    ctl.set_force_run_mode(RunMode::Accelerator);

    let result = reduce_with::<Sum, i32>(&ctl, &[1, 2, 3]);

    assert!(matches!(result, Err(BoltError::Configuration { .. })));
}

#[test_log::test]
fn large_inputs_fall_back_without_accelerator() {
    let mut ctl = Control::new().without_accelerator();
    ctl.set_multicore_threshold(4);
    ctl.set_accelerator_threshold(8);
    let values = (0..64i64).collect::<Vec<_>>();

    assert_eq!(reduce_with::<Sum, i64>(&ctl, &values).unwrap(), 2016);

    ctl.set_accelerator_fallback(AcceleratorFallback::Error);
    assert!(matches!(
        reduce_with::<Sum, i64>(&ctl, &values),
        Err(BoltError::Configuration { .. })
    ));
}

#[test_log::test]
fn invalid_ranges_are_rejected() {
    let ctl = Control::new();
    let values = [1u8, 2, 3];
    let vector = DeviceVector::from_slice(&ctl, &values).unwrap();
    let other = DeviceVector::from_slice(&ctl, &values).unwrap();

    assert!(matches!(
        reduce_with::<Sum, u8>(&ctl, Sequence::host_range(&values, 2, 1)),
        Err(BoltError::InvalidRange { first: 2, last: 1 })
    ));
    assert!(matches!(
        reduce_with::<Sum, u8>(&ctl, Sequence::host_range(&values, 0, 4)),
        Err(BoltError::OutOfRange { .. })
    ));
    assert!(matches!(
        reduce_with::<Sum, u8>(
            &ctl,
            Sequence::device_range(&vector, other.begin(), vector.end())
        ),
        Err(BoltError::OutOfRange { .. })
    ));
}

#[test_log::test]
fn kernel_shape_follows_the_launch_config() {
    let (mut ctl, launches) = dummy_control();
    ctl.set_force_run_mode(RunMode::Accelerator);
    ctl.set_tile_dim(4).unwrap();
    ctl.set_compute_units(1).unwrap();
    ctl.set_tiles_per_compute_unit(3).unwrap();
    let values = (1..=50u64).collect::<Vec<_>>();

    let product = transform_reduce(
        &ctl,
        &values,
        |value: u64| value % 3 + 1,
        1,
        |a: u64, b: u64| a * b % 1_000_007,
    )
    .unwrap();

    let expected = values
        .iter()
        .fold(1, |acc, value| acc * (value % 3 + 1) % 1_000_007);
    assert_eq!(product, expected);
    assert_eq!(launches.load(Ordering::Relaxed), 1);
    assert!(ctl.set_tile_dim(6).is_err());
}

#[test_log::test]
fn kernel_ids_name_the_tile_width() {
    let transform = |value: u32| value;
    let reduce = |a: u32, b: u32| a + b;
    let kernel = TransformReduceKernel::<u32, _, _, _>::new(16, 8, 0, &transform, &reduce);

    assert_eq!(
        bolt::kernel::TileKernel::id(&kernel).to_string(),
        "TransformReduceKernel(w=8)"
    );
}

#[test]
#[serial]
fn default_control_is_shared() {
    let first = Control::get_default();
    let second = Control::get_default();

    assert!(core::ptr::eq(first, second));
    assert_eq!(Control::new().run_mode(), first.run_mode());
}
