//! # Stagedrive Core
//!
//! Handle-based control core for multi-axis precision positioning stages:
//! piezo-actuated nanopositioners (continuous analog position writes) and
//! micro-stepping motor stages (velocity plus discrete step counts) behind
//! one lifecycle, error model and synchronization surface.
//!
//! ## Layers
//!
//! - [`DeviceRegistry`] owns every live handle: grab, enumerate, release.
//! - [`Stage`] is the per-handle facade. It re-resolves its handle on
//!   every call, so a released handle always reports the invalid-handle
//!   condition, and serializes operations against the inherently serial
//!   transport.
//! - Motion, waveform, clock and telemetry operations live in their own
//!   modules as `Stage` methods.
//!
//! ## Quick start
//!
//! ```rust
//! use stagedrive_adapter::{SimConfig, SimStage};
//! use stagedrive_core::{DeviceRegistry, Rounding};
//! use stagedrive_core::protocol::Axis;
//!
//! # fn main() -> stagedrive_core::Result<()> {
//! let registry = DeviceRegistry::new();
//! registry.attach(Box::new(SimStage::new(SimConfig::stepper(2001))))?;
//!
//! let handle = registry.grab(None)?;
//! let stage = registry.stage(handle);
//! stage.move_relative(Axis::X, 1.0, 0.5, Rounding::Nearest)?;
//! stage.wait()?;
//! registry.release(handle)?;
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod device;
pub mod error;
pub mod legacy;
pub mod motion;
pub mod registry;
pub mod telemetry;
pub mod waveform;

/// Wire-level types, re-exported for callers.
pub use stagedrive_protocol as protocol;

pub use device::{DeviceRecord, Family, PiezoProfile, StepperProfile};
pub use error::{Result, StageError};
pub use motion::{DEFAULT_WAIT_TIMEOUT, MoveLeg};
pub use registry::{DeviceRegistry, Handle, Stage};
pub use waveform::WfmaCapture;

// commonly used wire types, re-exported at the crate root
pub use stagedrive_protocol::{
    Axis, AxisBitmap, Clock, ClockBinding, ClockFrequency, ClockPolarity, MotorInfo,
    ProductInformation, Range, ReturnCode, Rounding, StatusWord, StepDirection, StepLeg,
};
