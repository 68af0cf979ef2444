//! Handle lifecycle integration tests against the simulator.

use stagedrive_adapter::{SimConfig, SimStage};
use stagedrive_core::{DeviceRegistry, Handle, ReturnCode, StageError};
use stagedrive_core::protocol::Axis;

fn bench() -> DeviceRegistry {
    let registry = DeviceRegistry::new();
    registry
        .attach(Box::new(SimStage::new(SimConfig::piezo(1001))))
        .unwrap();
    registry
        .attach(Box::new(SimStage::new(SimConfig::stepper(2001))))
        .unwrap();
    registry
        .attach(Box::new(SimStage::new(SimConfig::tip_tilt(1002))))
        .unwrap();
    registry
}

#[test]
fn ungranted_handle_fails_every_operation() {
    let registry = bench();
    let stage = registry.stage(Handle::from_raw(5));

    let err = stage.product_info().unwrap_err();
    assert_eq!(err.code(), ReturnCode::InvalidHandle);
    let err = stage.read_position(Axis::X).unwrap_err();
    assert_eq!(err.code(), ReturnCode::InvalidHandle);
    let err = stage.wait().unwrap_err();
    assert_eq!(err.code(), ReturnCode::InvalidHandle);
    let err = stage.wfma_stop().unwrap_err();
    assert_eq!(err.code(), ReturnCode::InvalidHandle);

    // and no device was grabbed as a side effect
    assert_eq!(registry.count(), 0);
}

#[test]
fn grab_or_existing_is_idempotent() {
    let registry = bench();
    let first = registry.grab_or_existing(Some(2001)).unwrap();
    let second = registry.grab_or_existing(Some(2001)).unwrap();
    assert_eq!(first, second);
    assert_eq!(registry.count(), 1);

    // plain grab of the same device is refused
    let err = registry.grab(Some(2001)).unwrap_err();
    assert_eq!(err.code(), ReturnCode::DeviceNotReady);
}

#[test]
fn grab_or_existing_without_serial_falls_back_to_granted() {
    let registry = DeviceRegistry::new();
    registry
        .attach(Box::new(SimStage::new(SimConfig::piezo(1001))))
        .unwrap();
    let first = registry.grab_or_existing(None).unwrap();
    // pool is empty now; the same handle comes back
    let second = registry.grab_or_existing(None).unwrap();
    assert_eq!(first, second);
}

#[test]
fn release_all_invalidates_previous_handles() {
    let registry = bench();
    let handles = registry.grab_all();
    assert_eq!(handles.len(), 3);
    assert_eq!(registry.count(), 3);

    registry.release_all();
    assert_eq!(registry.count(), 0);

    for handle in handles {
        let err = registry.stage(handle).serial_number().unwrap_err();
        assert_eq!(err.code(), ReturnCode::InvalidHandle);
    }
}

#[test]
fn released_handles_are_never_reused() {
    let registry = bench();
    let old = registry.grab(Some(1001)).unwrap();
    registry.release(old).unwrap();

    let newer = registry.grab(Some(1001)).unwrap();
    assert_ne!(old, newer);
    assert!(newer.raw() > old.raw());

    // the stale handle still reports invalid-handle
    let err = registry.stage(old).product_info().unwrap_err();
    assert!(matches!(err, StageError::InvalidHandle(_)));
}

#[test]
fn list_handles_is_bounded_by_capacity() {
    let registry = bench();
    registry.grab_all();
    assert_eq!(registry.list_handles(0).len(), 0);
    assert_eq!(registry.list_handles(2).len(), 2);
    let all = registry.list_handles(16);
    assert_eq!(all.len(), 3);
    assert!(all.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn release_invalidates_armed_waveform_state() {
    let registry = bench();
    let handle = registry.grab(Some(1001)).unwrap();
    registry
        .stage(handle)
        .setup_read_waveform(Axis::X, 32, 1.0)
        .unwrap();
    registry.release(handle).unwrap();

    // a fresh grab of the same physical device starts unarmed
    let handle = registry.grab(Some(1001)).unwrap();
    let err = registry
        .stage(handle)
        .trigger_read_waveform(Axis::X, 32)
        .unwrap_err();
    assert_eq!(err.code(), ReturnCode::UsageError);
}
