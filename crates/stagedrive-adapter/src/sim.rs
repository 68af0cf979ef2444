//! Deterministic in-process stage simulator
//!
//! `SimStage` executes the full command vocabulary against an in-memory
//! device model: piezo axes clamp writes to their calibration range,
//! stepper moves take wall time proportional to distance over velocity,
//! and the waveform engine echoes playback buffers as captures. Used by
//! the core's test suites and the CLI; never by production transports.

use crate::{AdapterError, StageAdapter};
use stagedrive_protocol::{
    Axis, ClockFrequency, Command, FirmwareVersion, MotorInfo, ProductInformation, Range,
    Response, StatusWord, StepDirection, StepLeg, products,
};
use std::time::{Duration, Instant};
use tracing::trace;

/// Tip/tilt capability of a simulated piezo stage.
#[derive(Debug, Clone, Copy)]
pub struct ThetaProfile {
    pub range: Range,
    pub center: f64,
}

/// Static description of a simulated device.
#[derive(Debug, Clone)]
pub struct SimConfig {
    pub serial: u32,
    pub info: ProductInformation,
    /// Per-axis travel range; `None` for axes the bitmap omits. Piezo only.
    pub calibration: [Option<Range>; 4],
    pub theta: Option<ThetaProfile>,
    /// Motor characteristics; present iff this is a stepper device.
    pub motor: Option<MotorInfo>,
    /// Encoder presence bitmap (stepper only).
    pub encoder_bitmap: u8,
}

impl SimConfig {
    /// Three-axis piezo nanopositioner with 100 µm travel per axis.
    pub fn piezo(serial: u32) -> Self {
        let travel = Range { min: 0.0, max: 100.0 };
        Self {
            serial,
            info: ProductInformation {
                axis_bitmap: 0x07,
                adc_resolution: 16,
                dac_resolution: 16,
                product_id: products::NANO_DRIVE_3,
                firmware_version: 101,
                firmware_profile: 3,
            },
            calibration: [Some(travel), Some(travel), Some(travel), None],
            theta: None,
            motor: None,
            encoder_bitmap: 0,
        }
    }

    /// Tip/tilt Z piezo stage with a ±2 mrad angular range.
    pub fn tip_tilt(serial: u32) -> Self {
        let mut config = Self::piezo(serial);
        config.info.product_id = products::NANO_DRIVE_TIP_TILT;
        config.theta = Some(ThetaProfile {
            range: Range { min: -2.0, max: 2.0 },
            center: 50.0,
        });
        config
    }

    /// Three-axis micro-stepping motor stage.
    pub fn stepper(serial: u32) -> Self {
        Self {
            serial,
            info: ProductInformation {
                axis_bitmap: 0x07,
                adc_resolution: 0,
                dac_resolution: 0,
                product_id: products::MICRO_DRIVE_3,
                firmware_version: 24,
                firmware_profile: 1,
            },
            calibration: [None; 4],
            theta: None,
            motor: Some(MotorInfo {
                encoder_resolution: 5.0e-5,
                step_size: 9.525e-5,
                max_velocity: 4.0,
                max_velocity_two_axis: 3.0,
                max_velocity_three_axis: 2.5,
                min_velocity: 1.0e-3,
            }),
            encoder_bitmap: 0x07,
        }
    }

    pub fn with_axes(mut self, bitmap: u8) -> Self {
        self.info.axis_bitmap = bitmap;
        self
    }

    pub fn with_step_size(mut self, step_size: f64) -> Self {
        if let Some(motor) = self.motor.as_mut() {
            motor.step_size = step_size;
        }
        self
    }

    pub fn with_encoders(mut self, bitmap: u8) -> Self {
        self.encoder_bitmap = bitmap;
        self
    }
}

#[derive(Debug, Clone)]
struct SimArmed {
    read: bool,
    points: u32,
    #[allow(dead_code)]
    interval_ms: f64,
    samples: Vec<f64>,
}

#[derive(Debug, Clone)]
struct SimWfma {
    x: Vec<f64>,
    y: Vec<f64>,
    z: Vec<f64>,
    triggered: bool,
}

/// Simulated stage device.
pub struct SimStage {
    config: SimConfig,
    attached: bool,
    /// Current physical position per axis (µm for piezo axes).
    position: [f64; 4],
    /// Last commanded X/Y/Z positions.
    commanded: [f64; 3],
    microsteps: [i32; 4],
    encoders: [f64; 4],
    moving_until: Option<Instant>,
    stopped_short: bool,
    armed: [Option<SimArmed>; 4],
    wfma: Option<SimWfma>,
}

impl SimStage {
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            attached: true,
            position: [0.0; 4],
            commanded: [0.0; 3],
            microsteps: [0; 4],
            encoders: [0.0; 4],
            moving_until: None,
            stopped_short: false,
            armed: [None, None, None, None],
            wfma: None,
        }
    }

    /// Simulate unplugging the device; every subsequent command fails.
    pub fn detach(&mut self) {
        self.attached = false;
    }

    pub fn serial(&self) -> u32 {
        self.config.serial
    }

    fn is_moving(&self) -> bool {
        self.moving_until.is_some_and(|t| Instant::now() < t)
    }

    fn status(&self) -> StatusWord {
        let mut word = 0u16;
        if self.is_moving() {
            word |= StatusWord::MOVING;
        }
        if self.stopped_short {
            word |= StatusWord::STOPPED_SHORT;
        }
        StatusWord(word)
    }

    fn motor(&self) -> Result<&MotorInfo, AdapterError> {
        self.config
            .motor
            .as_ref()
            .ok_or(AdapterError::Unsupported("stepper command on piezo stage"))
    }

    fn travel(&self, axis: Axis) -> Result<Range, AdapterError> {
        if self.config.motor.is_some() {
            return Err(AdapterError::Unsupported("piezo command on stepper stage"));
        }
        self.config.calibration[axis.index()]
            .ok_or_else(|| AdapterError::Fault(format!("no calibration for axis {axis}")))
    }

    fn apply_leg(&mut self, motor: MotorInfo, leg: StepLeg) -> Duration {
        let idx = leg.axis.index();
        self.microsteps[idx] += leg.microsteps;
        let distance = leg.microsteps as f64 * motor.step_size;
        if self.config.encoder_bitmap & leg.axis.bit() != 0 {
            self.encoders[idx] += distance;
        }
        let velocity = leg.velocity.max(motor.min_velocity);
        Duration::from_secs_f64(distance.abs() / velocity)
    }

    fn start_move(&mut self, duration: Duration) {
        self.stopped_short = false;
        self.moving_until = Some(Instant::now() + duration);
    }

    fn execute(&mut self, command: Command) -> Result<Response, AdapterError> {
        use Command::*;
        match command {
            GetProductInfo => Ok(Response::ProductInfo(self.config.info)),
            GetFirmwareVersion => Ok(Response::Firmware(FirmwareVersion {
                version: self.config.info.firmware_version,
                profile: self.config.info.firmware_profile,
            })),
            GetSerialNumber => Ok(Response::Serial(self.config.serial)),
            Probe { .. } => Ok(Response::Attached(self.attached)),

            ReadPosition { axis } => {
                self.travel(axis)?;
                Ok(Response::Position(self.position[axis.index()]))
            }
            WritePosition { axis, position } => {
                let travel = self.travel(axis)?;
                let actual = travel.clamp(position);
                self.position[axis.index()] = actual;
                if axis != Axis::Aux {
                    self.commanded[axis.index()] = actual;
                }
                Ok(Response::Position(actual))
            }
            WriteTheta { axis, milliradians } => {
                let theta = self
                    .config
                    .theta
                    .as_ref()
                    .ok_or(AdapterError::Unsupported("theta write on non-tip/tilt stage"))?;
                let _ = axis;
                Ok(Response::Position(theta.range.clamp(milliradians)))
            }
            GetCalibration { axis } => self.travel(axis).map(Response::Range),
            GetThetaRange { axis } => {
                let theta = self
                    .config
                    .theta
                    .as_ref()
                    .ok_or(AdapterError::Unsupported("theta range on non-tip/tilt stage"))?;
                let _ = axis;
                Ok(Response::Range(theta.range))
            }
            GetTipTiltCenter => {
                let theta = self
                    .config
                    .theta
                    .as_ref()
                    .ok_or(AdapterError::Unsupported("tip/tilt center on non-tip/tilt stage"))?;
                Ok(Response::Position(theta.center))
            }
            GetCommandedPosition => {
                if self.config.motor.is_some() {
                    return Err(AdapterError::Unsupported("commanded position on stepper stage"));
                }
                Ok(Response::Triple(self.commanded))
            }

            MoveSteps { leg } => {
                let motor = *self.motor()?;
                let duration = self.apply_leg(motor, leg);
                self.start_move(duration);
                Ok(Response::Ack)
            }
            MoveThreeSteps { legs } => {
                let motor = *self.motor()?;
                // all legs start together; the move lasts as long as the
                // slowest leg
                let longest = legs
                    .into_iter()
                    .map(|leg| self.apply_leg(motor, leg))
                    .max()
                    .unwrap_or(Duration::ZERO);
                self.start_move(longest);
                Ok(Response::Ack)
            }
            SingleStep { axis, direction } => {
                let motor = *self.motor()?;
                let steps = match direction {
                    StepDirection::Forward => 1,
                    StepDirection::Reverse => -1,
                };
                let leg = StepLeg { axis, velocity: 1.0, microsteps: steps };
                let duration = self.apply_leg(motor, leg);
                self.start_move(duration);
                Ok(Response::Ack)
            }
            ReadStatus => Ok(Response::Status(self.status())),
            ReadMoveStatus => Ok(Response::Moving(self.is_moving())),
            Stop => {
                if self.is_moving() {
                    self.stopped_short = true;
                }
                self.moving_until = None;
                Ok(Response::Status(self.status()))
            }
            ReadEncoders => {
                self.motor()?;
                Ok(Response::Encoders(self.encoders))
            }
            ResetEncoder { axis } => {
                self.motor()?;
                self.encoders[axis.index()] = 0.0;
                Ok(Response::Ack)
            }
            ReadMicrosteps { axis } => {
                self.motor()?;
                Ok(Response::Microsteps(self.microsteps[axis.index()]))
            }
            GetMotorInfo => self.motor().map(|m| Response::MotorInfo(*m)),
            GetEncoderBitmap => {
                self.motor()?;
                Ok(Response::Bitmap(self.config.encoder_bitmap))
            }

            WaveformArmRead { axis, points, interval_ms } => {
                self.travel(axis)?;
                self.armed[axis.index()] = Some(SimArmed {
                    read: true,
                    points,
                    interval_ms,
                    samples: Vec::new(),
                });
                Ok(Response::Ack)
            }
            WaveformTriggerRead { axis } => match self.armed[axis.index()].take() {
                Some(armed) if armed.read => {
                    let level = self.position[axis.index()];
                    Ok(Response::Samples(vec![level; armed.points as usize]))
                }
                other => {
                    self.armed[axis.index()] = other;
                    Err(AdapterError::Fault("read waveform not armed".into()))
                }
            },
            WaveformArmLoad { axis, interval_ms, samples } => {
                self.travel(axis)?;
                self.armed[axis.index()] = Some(SimArmed {
                    read: false,
                    points: samples.len() as u32,
                    interval_ms,
                    samples,
                });
                Ok(Response::Ack)
            }
            WaveformTriggerLoad { axis } => match self.armed[axis.index()].take() {
                Some(armed) if !armed.read => {
                    if let Some(last) = armed.samples.last() {
                        let travel = self.travel(axis)?;
                        self.position[axis.index()] = travel.clamp(*last);
                        if axis != Axis::Aux {
                            self.commanded[axis.index()] = self.position[axis.index()];
                        }
                    }
                    Ok(Response::Ack)
                }
                other => {
                    self.armed[axis.index()] = other;
                    Err(AdapterError::Fault("load waveform not armed".into()))
                }
            },

            WfmaArm { x, y, z, interval_ms: _, iterations: _ } => {
                if self.config.motor.is_some() {
                    return Err(AdapterError::Unsupported("wfma on stepper stage"));
                }
                self.wfma = Some(SimWfma { x, y, z, triggered: false });
                Ok(Response::Ack)
            }
            WfmaTrigger => {
                let wfma = self
                    .wfma
                    .as_mut()
                    .ok_or_else(|| AdapterError::Fault("wfma not armed".into()))?;
                wfma.triggered = true;
                Ok(Response::Ack)
            }
            WfmaRead => {
                let wfma = match self.wfma.take() {
                    Some(wfma) if wfma.triggered => wfma,
                    other => {
                        self.wfma = other;
                        return Err(AdapterError::Fault("wfma not triggered".into()));
                    }
                };
                // the ADC tracks the DAC during playback, so the capture
                // echoes the playback buffers
                for (axis, buf) in [(Axis::X, &wfma.x), (Axis::Y, &wfma.y), (Axis::Z, &wfma.z)] {
                    if let Some(last) = buf.last() {
                        self.position[axis.index()] = *last;
                        self.commanded[axis.index()] = *last;
                    }
                }
                Ok(Response::TripleSamples { x: wfma.x, y: wfma.y, z: wfma.z })
            }
            WfmaStop => {
                // abort policy: zero-fill and discard
                if let Some(wfma) = self.wfma.as_mut() {
                    wfma.x.fill(0.0);
                    wfma.y.fill(0.0);
                    wfma.z.fill(0.0);
                }
                self.wfma = None;
                Ok(Response::Ack)
            }

            BindClock { .. } | SetClockPolarity { .. } | ResetClockDefaults | PulseClock { .. } => {
                if self.config.motor.is_some() {
                    return Err(AdapterError::Unsupported("clock command on stepper stage"));
                }
                Ok(Response::Ack)
            }
            GetClockFrequency => {
                if self.config.motor.is_some() {
                    return Err(AdapterError::Unsupported("clock command on stepper stage"));
                }
                Ok(Response::Frequency(ClockFrequency {
                    adc_hz: 150_000.0,
                    dac_hz: 16_666.0,
                }))
            }
        }
    }
}

impl StageAdapter for SimStage {
    fn transact(&mut self, command: Command) -> Result<Response, AdapterError> {
        if !self.attached && !matches!(command, Command::Probe { .. }) {
            return Err(AdapterError::NotAttached);
        }
        trace!(serial = self.config.serial, ?command, "sim transact");
        self.execute(command)
    }
}
