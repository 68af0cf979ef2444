//! Telemetry, calibration and clock-binder integration tests.

use stagedrive_adapter::{AdapterError, SimConfig, SimStage, StageAdapter};
use stagedrive_core::{DeviceRegistry, Handle, ReturnCode};
use stagedrive_core::protocol::{
    Axis, Clock, ClockBinding, ClockPolarity, Command, Response, products,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Simulator wrapper whose cable can be "pulled" from the outside while
/// the registry owns the adapter.
struct FlakyStage {
    inner: SimStage,
    attached: Arc<AtomicBool>,
}

impl StageAdapter for FlakyStage {
    fn transact(&mut self, command: Command) -> Result<Response, AdapterError> {
        if !self.attached.load(Ordering::SeqCst) {
            return match command {
                Command::Probe { .. } => Ok(Response::Attached(false)),
                _ => Err(AdapterError::Timeout),
            };
        }
        self.inner.transact(command)
    }
}

fn grab(registry: &DeviceRegistry, config: SimConfig) -> Handle {
    registry.attach(Box::new(SimStage::new(config))).unwrap();
    registry.grab(None).unwrap()
}

#[test]
fn product_info_reports_the_device_identity() {
    let registry = DeviceRegistry::new();
    let handle = grab(&registry, SimConfig::piezo(1001));
    let stage = registry.stage(handle);

    let info = stage.product_info().unwrap();
    assert_eq!(info.product_id, products::NANO_DRIVE_3);
    assert_eq!(info.axis_bitmap, 0x07);
    assert_eq!(info.adc_resolution, 16);

    let firmware = stage.firmware_version().unwrap();
    assert_eq!(firmware.version, 101);
    assert_eq!(firmware.profile, 3);

    assert_eq!(stage.serial_number().unwrap(), 1001);
}

#[test]
fn calibration_reports_the_travel_range() {
    let registry = DeviceRegistry::new();
    let handle = grab(&registry, SimConfig::piezo(1001));
    let stage = registry.stage(handle);

    let range = stage.calibration(Axis::X).unwrap();
    assert_eq!(range.min, 0.0);
    assert_eq!(range.max, 100.0);

    // calibration is a piezo concept
    let stepper = grab(&registry, SimConfig::stepper(2001));
    let err = registry.stage(stepper).calibration(Axis::X).unwrap_err();
    assert_eq!(err.code(), ReturnCode::UsageError);
}

#[test]
fn theta_queries_require_tip_tilt_support() {
    let registry = DeviceRegistry::new();
    let plain = grab(&registry, SimConfig::piezo(1001));
    let tilted = grab(&registry, SimConfig::tip_tilt(1002));

    let err = registry.stage(plain).theta_range(Axis::X).unwrap_err();
    assert_eq!(err.code(), ReturnCode::UsageError);
    let err = registry.stage(plain).tip_tilt_center().unwrap_err();
    assert_eq!(err.code(), ReturnCode::UsageError);

    let stage = registry.stage(tilted);
    let range = stage.theta_range(Axis::Y).unwrap();
    assert_eq!(range.min, -2.0);
    assert_eq!(range.max, 2.0);
    assert_eq!(stage.tip_tilt_center().unwrap(), 50.0);
    // theta only exists on the two tilt axes
    let err = stage.theta_range(Axis::Z).unwrap_err();
    assert_eq!(err.code(), ReturnCode::InvalidAxis);
}

#[test]
fn commanded_position_follows_writes() {
    let registry = DeviceRegistry::new();
    let handle = grab(&registry, SimConfig::piezo(1001));
    let stage = registry.stage(handle);

    assert_eq!(stage.commanded_position().unwrap(), [0.0; 3]);
    stage.write_position(Axis::X, 10.0).unwrap();
    stage.write_position(Axis::Y, 250.0).unwrap();
    // the commanded record stores the clamped actual
    assert_eq!(stage.commanded_position().unwrap(), [10.0, 100.0, 0.0]);
}

#[test]
fn heartbeat_reads_false_once_the_device_goes_silent() {
    let registry = DeviceRegistry::new();
    let attached = Arc::new(AtomicBool::new(true));
    registry
        .attach(Box::new(FlakyStage {
            inner: SimStage::new(SimConfig::piezo(1001)),
            attached: Arc::clone(&attached),
        }))
        .unwrap();
    let handle = registry.grab(None).unwrap();
    let stage = registry.stage(handle);

    assert!(stage.device_attached(Duration::from_millis(50)).unwrap());

    attached.store(false, Ordering::SeqCst);
    // the probe degrades to false, never to an error
    assert!(!stage.device_attached(Duration::from_millis(50)).unwrap());
    // ordinary operations do fail on the silent device
    let err = stage.read_position(Axis::X).unwrap_err();
    assert_eq!(err.code(), ReturnCode::DeviceNotAttached);
}

#[test]
fn heartbeat_still_requires_a_valid_handle() {
    let registry = DeviceRegistry::new();
    let handle = grab(&registry, SimConfig::piezo(1001));
    registry.release(handle).unwrap();

    let err = registry
        .stage(handle)
        .device_attached(Duration::from_millis(50))
        .unwrap_err();
    assert_eq!(err.code(), ReturnCode::InvalidHandle);
}

#[test]
fn rebinding_an_axis_overwrites_the_previous_binding() {
    let registry = DeviceRegistry::new();
    let handle = grab(&registry, SimConfig::piezo(1001));
    let stage = registry.stage(handle);

    assert_eq!(stage.clock_binding(Axis::X).unwrap(), None);
    stage
        .bind_clock(Clock::Pixel, Axis::X, ClockPolarity::LowToHigh)
        .unwrap();
    stage
        .bind_clock(Clock::Frame, Axis::X, ClockPolarity::HighToLow)
        .unwrap();

    // last write wins, no unbind step
    assert_eq!(
        stage.clock_binding(Axis::X).unwrap(),
        Some(ClockBinding {
            clock: Clock::Frame,
            axis: Axis::X,
            polarity: ClockPolarity::HighToLow,
        })
    );
    assert_eq!(stage.clock_binding(Axis::Y).unwrap(), None);
}

#[test]
fn reset_clears_every_binding() {
    let registry = DeviceRegistry::new();
    let handle = grab(&registry, SimConfig::piezo(1001));
    let stage = registry.stage(handle);

    stage
        .bind_clock(Clock::Pixel, Axis::X, ClockPolarity::LowToHigh)
        .unwrap();
    stage
        .bind_clock(Clock::Line, Axis::Y, ClockPolarity::LowToHigh)
        .unwrap();
    stage.reset_clock_defaults().unwrap();
    assert_eq!(stage.clock_binding(Axis::X).unwrap(), None);
    assert_eq!(stage.clock_binding(Axis::Y).unwrap(), None);
}

#[test]
fn clock_operations_are_a_piezo_capability() {
    let registry = DeviceRegistry::new();
    let handle = grab(&registry, SimConfig::stepper(2001));
    let stage = registry.stage(handle);

    let err = stage
        .bind_clock(Clock::Pixel, Axis::X, ClockPolarity::LowToHigh)
        .unwrap_err();
    assert_eq!(err.code(), ReturnCode::UsageError);
    let err = stage.pixel_clock().unwrap_err();
    assert_eq!(err.code(), ReturnCode::UsageError);
    let err = stage.clock_frequency().unwrap_err();
    assert_eq!(err.code(), ReturnCode::UsageError);
}

#[test]
fn clock_pulses_and_frequency_on_a_piezo_stage() {
    let registry = DeviceRegistry::new();
    let handle = grab(&registry, SimConfig::piezo(1001));
    let stage = registry.stage(handle);

    stage.pixel_clock().unwrap();
    stage.line_clock().unwrap();
    stage.frame_clock().unwrap();
    stage.aux_clock().unwrap();
    stage
        .set_clock_polarity(Clock::Aux, ClockPolarity::HighToLow)
        .unwrap();

    let frequency = stage.clock_frequency().unwrap();
    assert!(frequency.adc_hz > 0.0);
    assert!(frequency.dac_hz > 0.0);
}
