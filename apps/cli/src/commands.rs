//! Subcommand argument structs and their execution.

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use stagedrive_core::{DeviceRegistry, Rounding, Stage};
use stagedrive_core::protocol::Axis;
use tracing::info;

/// Axis selector, lowercase on the command line.
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum AxisArg {
    X,
    Y,
    Z,
    Aux,
}

impl From<AxisArg> for Axis {
    fn from(arg: AxisArg) -> Axis {
        match arg {
            AxisArg::X => Axis::X,
            AxisArg::Y => Axis::Y,
            AxisArg::Z => Axis::Z,
            AxisArg::Aux => Axis::Aux,
        }
    }
}

/// Distance-to-microstep rounding mode.
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum RoundingArg {
    Nearest,
    Truncate,
    Up,
}

impl From<RoundingArg> for Rounding {
    fn from(arg: RoundingArg) -> Rounding {
        match arg {
            RoundingArg::Nearest => Rounding::Nearest,
            RoundingArg::Truncate => Rounding::Truncate,
            RoundingArg::Up => Rounding::Up,
        }
    }
}

#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Device serial number
    #[arg(short, long)]
    pub serial: u32,
}

#[derive(Args, Debug)]
pub struct MoveArgs {
    /// Device serial number
    #[arg(short, long)]
    pub serial: u32,

    /// Axis to move
    #[arg(short, long)]
    pub axis: AxisArg,

    /// Velocity in mm/s
    #[arg(short, long)]
    pub velocity: f64,

    /// Signed distance in mm
    #[arg(short, long)]
    pub distance: f64,

    /// Distance-to-microstep rounding mode
    #[arg(short, long, value_enum, default_value_t = RoundingArg::Nearest)]
    pub rounding: RoundingArg,
}

#[derive(Args, Debug)]
pub struct PositionArgs {
    /// Device serial number
    #[arg(short, long)]
    pub serial: u32,

    /// Axis to address
    #[arg(short, long)]
    pub axis: AxisArg,

    /// Absolute target in µm; omit to only read
    #[arg(short, long)]
    pub target: Option<f64>,
}

#[derive(Args, Debug)]
pub struct WaveArgs {
    /// Device serial number
    #[arg(short, long)]
    pub serial: u32,

    /// Axis to acquire from
    #[arg(short, long)]
    pub axis: AxisArg,

    /// Number of data points
    #[arg(short, long, default_value_t = 64)]
    pub points: u32,

    /// Sample interval in milliseconds
    #[arg(short, long, default_value_t = 1.0)]
    pub interval: f64,
}

/// Grab one device, run `f` on its stage, release the handle afterwards.
fn with_stage<T>(
    registry: &DeviceRegistry,
    serial: u32,
    f: impl FnOnce(Stage<'_>) -> Result<T>,
) -> Result<T> {
    let handle = registry
        .grab(Some(serial))
        .with_context(|| format!("cannot grab device {serial}"))?;
    let result = f(registry.stage(handle));
    registry.release(handle)?;
    result
}

pub fn list(registry: &DeviceRegistry) -> Result<()> {
    let handles = registry.grab_all();
    println!("{:<8} {:<10} {:<12} {:<8} axes", "handle", "serial", "product", "family");
    for handle in handles {
        let stage = registry.stage(handle);
        let serial = stage.serial_number()?;
        let info = stage.product_info()?;
        let family = match info.family() {
            Some(f) => format!("{f:?}"),
            None => "unknown".to_string(),
        };
        println!(
            "{:<8} {:<10} 0x{:04x}       {:<8} 0b{:04b}",
            handle.to_string(),
            serial,
            info.product_id,
            family,
            info.axis_bitmap,
        );
    }
    registry.release_all();
    Ok(())
}

pub fn info(registry: &DeviceRegistry, args: InfoArgs) -> Result<()> {
    with_stage(registry, args.serial, |stage| {
        let info = stage.product_info()?;
        let firmware = stage.firmware_version()?;
        println!("serial:    {}", args.serial);
        println!("product:   0x{:04x}", info.product_id);
        println!("axes:      0b{:04b}", info.axis_bitmap);
        println!("adc/dac:   {} / {} bit", info.adc_resolution, info.dac_resolution);
        println!("firmware:  v{} profile {}", firmware.version, firmware.profile);

        match info.family() {
            Some(stagedrive_core::protocol::DeviceFamily::Piezo) => {
                for axis in info.axes().iter() {
                    let range = stage.calibration(axis)?;
                    println!("travel {axis}:  {:.3} .. {:.3} µm", range.min, range.max);
                }
            }
            Some(stagedrive_core::protocol::DeviceFamily::Stepper) => {
                let motor = stage.motor_info()?;
                println!("step size: {:.6} mm", motor.step_size);
                println!(
                    "velocity:  {:.4} .. {:.4} mm/s (three-axis limit {:.4})",
                    motor.min_velocity, motor.max_velocity, motor.max_velocity_three_axis,
                );
            }
            None => {}
        }
        Ok(())
    })
}

pub fn move_stage(registry: &DeviceRegistry, args: MoveArgs) -> Result<()> {
    with_stage(registry, args.serial, |stage| {
        let axis = Axis::from(args.axis);
        stage.move_relative(axis, args.velocity, args.distance, args.rounding.into())?;
        info!(%axis, args.velocity, args.distance, "move issued, waiting");
        stage.wait()?;
        let microsteps = stage.microstep_position(axis)?;
        println!("axis {axis} idle at {microsteps} microsteps");
        Ok(())
    })
}

pub fn position(registry: &DeviceRegistry, args: PositionArgs) -> Result<()> {
    with_stage(registry, args.serial, |stage| {
        let axis = Axis::from(args.axis);
        if let Some(target) = args.target {
            let actual = stage.write_position(axis, target)?;
            println!("axis {axis} commanded {target:.3} µm, reached {actual:.3} µm");
        } else {
            let current = stage.read_position(axis)?;
            println!("axis {axis} at {current:.3} µm");
        }
        Ok(())
    })
}

pub fn wave(registry: &DeviceRegistry, args: WaveArgs) -> Result<()> {
    with_stage(registry, args.serial, |stage| {
        let axis = Axis::from(args.axis);
        let samples = stage.read_waveform(axis, args.points, args.interval)?;
        println!(
            "axis {axis}: {} samples at {} ms interval",
            samples.len(),
            args.interval
        );
        for chunk in samples.chunks(8) {
            let row: Vec<String> = chunk.iter().map(|v| format!("{v:8.3}")).collect();
            println!("  {}", row.join(" "));
        }
        Ok(())
    })
}
