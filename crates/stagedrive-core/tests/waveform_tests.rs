//! Waveform pipeline integration tests against the simulator.

use stagedrive_adapter::{SimConfig, SimStage};
use stagedrive_core::{DeviceRegistry, Handle, ReturnCode};
use stagedrive_core::protocol::{Axis, MAX_WAVEFORM_POINTS};

fn grab(registry: &DeviceRegistry, config: SimConfig) -> Handle {
    registry.attach(Box::new(SimStage::new(config))).unwrap();
    registry.grab(None).unwrap()
}

#[test]
fn split_read_returns_exactly_the_armed_count() {
    let registry = DeviceRegistry::new();
    let handle = grab(&registry, SimConfig::piezo(1001));
    let stage = registry.stage(handle);

    stage.setup_read_waveform(Axis::X, 64, 0.5).unwrap();
    let samples = stage.trigger_read_waveform(Axis::X, 64).unwrap();
    assert_eq!(samples.len(), 64);

    // the trigger disarmed the axis; a second trigger has nothing to match
    let err = stage.trigger_read_waveform(Axis::X, 64).unwrap_err();
    assert_eq!(err.code(), ReturnCode::UsageError);
}

#[test]
fn trigger_must_match_the_armed_count() {
    let registry = DeviceRegistry::new();
    let handle = grab(&registry, SimConfig::piezo(1001));
    let stage = registry.stage(handle);

    stage.setup_read_waveform(Axis::X, 64, 0.5).unwrap();
    let err = stage.trigger_read_waveform(Axis::X, 32).unwrap_err();
    assert_eq!(err.code(), ReturnCode::UsageError);

    // the mismatch left the setup armed; the matching trigger still works
    let samples = stage.trigger_read_waveform(Axis::X, 64).unwrap();
    assert_eq!(samples.len(), 64);
}

#[test]
fn point_count_bounds_are_enforced_before_arming() {
    let registry = DeviceRegistry::new();
    let handle = grab(&registry, SimConfig::piezo(1001));
    let stage = registry.stage(handle);

    let err = stage.setup_read_waveform(Axis::X, 0, 0.5).unwrap_err();
    assert_eq!(err.code(), ReturnCode::ArgumentError);
    let err = stage
        .setup_read_waveform(Axis::X, MAX_WAVEFORM_POINTS + 1, 0.5)
        .unwrap_err();
    assert_eq!(err.code(), ReturnCode::ArgumentError);
    let err = stage.setup_read_waveform(Axis::X, 64, 0.0).unwrap_err();
    assert_eq!(err.code(), ReturnCode::ArgumentError);

    // nothing was armed by the rejected setups
    let err = stage.trigger_read_waveform(Axis::X, 64).unwrap_err();
    assert_eq!(err.code(), ReturnCode::UsageError);

    // the inclusive maximum is accepted
    stage
        .setup_read_waveform(Axis::X, MAX_WAVEFORM_POINTS, 0.5)
        .unwrap();
}

#[test]
fn armed_state_is_per_axis() {
    let registry = DeviceRegistry::new();
    let handle = grab(&registry, SimConfig::piezo(1001));
    let stage = registry.stage(handle);

    stage.setup_read_waveform(Axis::X, 16, 0.5).unwrap();
    // axis Y was never armed
    let err = stage.trigger_read_waveform(Axis::Y, 16).unwrap_err();
    assert_eq!(err.code(), ReturnCode::UsageError);
    assert_eq!(stage.trigger_read_waveform(Axis::X, 16).unwrap().len(), 16);
}

#[test]
fn load_then_read_tracks_the_playback() {
    let registry = DeviceRegistry::new();
    let handle = grab(&registry, SimConfig::piezo(1001));
    let stage = registry.stage(handle);

    let ramp: Vec<f64> = (0..50).map(|i| i as f64).collect();
    stage.load_waveform(Axis::Z, 1.0, &ramp).unwrap();
    // playback ends at the last sample
    assert_eq!(stage.read_position(Axis::Z).unwrap(), 49.0);

    // a load trigger needs a load setup, not a read setup
    stage.setup_read_waveform(Axis::Z, 8, 1.0).unwrap();
    let err = stage.trigger_load_waveform(Axis::Z).unwrap_err();
    assert_eq!(err.code(), ReturnCode::UsageError);
}

#[test]
fn waveforms_are_a_piezo_capability() {
    let registry = DeviceRegistry::new();
    let handle = grab(&registry, SimConfig::stepper(2001));
    let stage = registry.stage(handle);

    let err = stage.setup_read_waveform(Axis::X, 16, 0.5).unwrap_err();
    assert_eq!(err.code(), ReturnCode::UsageError);
    let err = stage.wfma_setup(&[1.0], &[1.0], &[1.0], 1.0, 1).unwrap_err();
    assert_eq!(err.code(), ReturnCode::UsageError);
}

#[test]
fn wfma_capture_echoes_the_playback_buffers() {
    let registry = DeviceRegistry::new();
    let handle = grab(&registry, SimConfig::piezo(1001));
    let stage = registry.stage(handle);

    let x: Vec<f64> = (0..20).map(|i| i as f64).collect();
    let y: Vec<f64> = (0..20).map(|i| 2.0 * i as f64).collect();
    let z = vec![5.0; 20];
    stage.wfma_setup(&x, &y, &z, 1.0, 1).unwrap();
    let capture = stage.wfma_trigger_and_read().unwrap();
    assert_eq!(capture.x, x);
    assert_eq!(capture.y, y);
    assert_eq!(capture.z, z);

    // the read disarmed the pipeline
    let err = stage.wfma_trigger_and_read().unwrap_err();
    assert_eq!(err.code(), ReturnCode::UsageError);
}

#[test]
fn wfma_split_trigger_then_read() {
    let registry = DeviceRegistry::new();
    let handle = grab(&registry, SimConfig::piezo(1001));
    let stage = registry.stage(handle);

    // reading before the trigger is a sequencing error
    let buf = vec![1.0, 2.0, 3.0];
    stage.wfma_setup(&buf, &buf, &buf, 1.0, 1).unwrap();
    let err = stage.wfma_read().unwrap_err();
    assert_eq!(err.code(), ReturnCode::UsageError);

    stage.wfma_trigger().unwrap();
    // a second trigger of the same setup is rejected
    let err = stage.wfma_trigger().unwrap_err();
    assert_eq!(err.code(), ReturnCode::UsageError);

    let capture = stage.wfma_read().unwrap();
    assert_eq!(capture.x, buf);
}

#[test]
fn wfma_rejects_mismatched_buffer_lengths() {
    let registry = DeviceRegistry::new();
    let handle = grab(&registry, SimConfig::piezo(1001));
    let stage = registry.stage(handle);

    let err = stage
        .wfma_setup(&[1.0, 2.0], &[1.0], &[1.0, 2.0], 1.0, 1)
        .unwrap_err();
    assert_eq!(err.code(), ReturnCode::ArgumentError);
    let err = stage.wfma_setup(&[], &[], &[], 1.0, 1).unwrap_err();
    assert_eq!(err.code(), ReturnCode::ArgumentError);
}

#[test]
fn wfma_stop_aborts_and_disarms() {
    let registry = DeviceRegistry::new();
    let handle = grab(&registry, SimConfig::piezo(1001));
    let stage = registry.stage(handle);

    let buf = vec![1.0, 2.0, 3.0];
    stage.wfma_setup(&buf, &buf, &buf, 1.0, 0).unwrap();
    stage.wfma_stop().unwrap();

    // the aborted acquisition cannot be triggered or read
    let err = stage.wfma_trigger().unwrap_err();
    assert_eq!(err.code(), ReturnCode::UsageError);
    let err = stage.wfma_read().unwrap_err();
    assert_eq!(err.code(), ReturnCode::UsageError);

    // stopping an idle pipeline is not an error
    stage.wfma_stop().unwrap();
}

#[test]
fn wfma_requires_all_three_axes() {
    let registry = DeviceRegistry::new();
    // bitmap 0b011: no Z axis
    let handle = grab(&registry, SimConfig::piezo(1001).with_axes(0x03));
    let stage = registry.stage(handle);

    let buf = vec![1.0, 2.0];
    let err = stage.wfma_setup(&buf, &buf, &buf, 1.0, 1).unwrap_err();
    assert_eq!(err.code(), ReturnCode::InvalidAxis);
}
