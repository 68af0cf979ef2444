//! Clock & trigger binder
//!
//! Couples logical timing sources (pixel/line/frame/auxiliary) to
//! physical axes and polarity modes. Binding is configuration, not a
//! resource grant: rebinding an axis silently overwrites its previous
//! binding, and a per-device default state always exists to reset to.

use crate::device::{expect_ack, expect_frequency};
use crate::error::Result;
use crate::registry::Stage;
use stagedrive_protocol::{Axis, Clock, ClockBinding, ClockFrequency, ClockPolarity, Command};
use tracing::debug;

impl Stage<'_> {
    /// Bind a clock to an axis with the given polarity. Last write wins
    /// per axis; no unbind step is needed.
    pub fn bind_clock(&self, clock: Clock, axis: Axis, polarity: ClockPolarity) -> Result<()> {
        self.with_device(|dev| {
            dev.require_axis(axis)?;
            dev.piezo()?;
            expect_ack(dev.transact(Command::BindClock { clock, axis, polarity })?)?;
            let binding = ClockBinding { clock, axis, polarity };
            if let Some(previous) = dev.record.clock_bindings[axis.index()].replace(binding) {
                debug!(axis = %axis, ?previous, ?binding, "clock binding replaced");
            }
            Ok(())
        })
    }

    /// Set the edge polarity a clock pulses with.
    pub fn set_clock_polarity(&self, clock: Clock, polarity: ClockPolarity) -> Result<()> {
        self.with_device(|dev| {
            dev.piezo()?;
            expect_ack(dev.transact(Command::SetClockPolarity { clock, polarity })?)
        })
    }

    /// Reset every clock binding and polarity to the device defaults.
    pub fn reset_clock_defaults(&self) -> Result<()> {
        self.with_device(|dev| {
            dev.piezo()?;
            expect_ack(dev.transact(Command::ResetClockDefaults)?)?;
            dev.record.clock_bindings = [None; 4];
            Ok(())
        })
    }

    /// Current binding of an axis, if any.
    pub fn clock_binding(&self, axis: Axis) -> Result<Option<ClockBinding>> {
        self.with_device(|dev| {
            dev.require_axis(axis)?;
            Ok(dev.record.clock_bindings[axis.index()])
        })
    }

    /// Emit one pulse on the pixel clock.
    pub fn pixel_clock(&self) -> Result<()> {
        self.pulse(Clock::Pixel)
    }

    /// Emit one pulse on the line clock.
    pub fn line_clock(&self) -> Result<()> {
        self.pulse(Clock::Line)
    }

    /// Emit one pulse on the frame clock.
    pub fn frame_clock(&self) -> Result<()> {
        self.pulse(Clock::Frame)
    }

    /// Emit one pulse on the auxiliary clock.
    pub fn aux_clock(&self) -> Result<()> {
        self.pulse(Clock::Aux)
    }

    fn pulse(&self, clock: Clock) -> Result<()> {
        self.with_device(|dev| {
            dev.piezo()?;
            expect_ack(dev.transact(Command::PulseClock { clock })?)
        })
    }

    /// Current ADC/DAC frequency pair.
    pub fn clock_frequency(&self) -> Result<ClockFrequency> {
        self.with_device(|dev| {
            dev.piezo()?;
            expect_frequency(dev.transact(Command::GetClockFrequency)?)
        })
    }
}
