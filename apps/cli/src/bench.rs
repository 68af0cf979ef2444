//! The simulated device bench the CLI operates on.

use anyhow::Result;
use stagedrive_adapter::{SimConfig, SimStage};
use stagedrive_core::DeviceRegistry;
use tracing::debug;

/// Serial of the three-axis piezo nanopositioner.
pub const PIEZO_SERIAL: u32 = 1001;
/// Serial of the tip/tilt Z piezo stage.
pub const TIP_TILT_SERIAL: u32 = 1002;
/// Serial of the three-axis micro-stepping stage.
pub const STEPPER_SERIAL: u32 = 2001;

/// Build a registry with the fixed simulated bench attached.
pub fn simulated_bench() -> Result<DeviceRegistry> {
    let registry = DeviceRegistry::new();
    registry.attach(Box::new(SimStage::new(SimConfig::piezo(PIEZO_SERIAL))))?;
    registry.attach(Box::new(SimStage::new(SimConfig::tip_tilt(TIP_TILT_SERIAL))))?;
    registry.attach(Box::new(SimStage::new(SimConfig::stepper(STEPPER_SERIAL))))?;
    debug!("simulated bench attached");
    Ok(registry)
}
