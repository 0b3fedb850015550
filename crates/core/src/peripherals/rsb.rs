// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Allwinner Reduced Serial Bus (RSB) controller.
//!
//! Only the completion contract a boot loader or OS driver depends on is
//! modelled: starting a transfer completes it immediately and raises the
//! interrupt, abort or a write-one-to-clear of STAT drops it again. No
//! slave device ever sees traffic.

use crate::interrupt::InterruptController;
use crate::signals::{DigitalLevel, InterruptLine};
use crate::{AccessSizes, SimResult, SimulationError};
use bitflags::bitflags;
use std::sync::Arc;

pub const RSB_WINDOW_SIZE: u64 = 0x400;

/// Register layout of the RSB window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsbRegister {
    Ctrl,
    Ccr,
    Inte,
    Stat,
    Daddr0,
    Pmcr,
    Cmd,
    Saddr,
}

impl RsbRegister {
    pub fn from_offset(offset: u64) -> Option<Self> {
        match offset {
            0x00 => Some(Self::Ctrl),
            0x04 => Some(Self::Ccr),
            0x08 => Some(Self::Inte),
            0x0C => Some(Self::Stat),
            0x10 => Some(Self::Daddr0),
            0x28 => Some(Self::Pmcr),
            0x2C => Some(Self::Cmd),
            0x30 => Some(Self::Saddr),
            _ => None,
        }
    }
}

bitflags! {
    /// RSB_CTRL. Only GLB_INTEN is stored; the transfer bits are triggers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RsbCtrl: u32 {
        const GLB_INTEN = 1 << 1;
        const ABT_XFER = 1 << 6;
        const START_XFER = 1 << 7;
    }
}

bitflags! {
    /// RSB_STAT, write-one-to-clear.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RsbStat: u32 {
        const TOVER = 1 << 0;
    }
}

/// Persisted register state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RsbState {
    pub ctrl: u32,
    pub stat: u32,
}

#[derive(Debug, Default)]
pub struct Rsb {
    state: RsbState,
    irq: InterruptLine,
}

impl Rsb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect_irq(&mut self, controller: Arc<dyn InterruptController>, pin: u32) {
        self.irq = InterruptLine::connected(controller, pin);
        self.update_irq();
    }

    pub fn state(&self) -> RsbState {
        self.state
    }

    pub fn irq(&self) -> &InterruptLine {
        &self.irq
    }

    fn update_irq(&self) {
        let pending = RsbStat::from_bits_retain(self.state.stat).contains(RsbStat::TOVER);
        self.irq.set(DigitalLevel::from(pending));
    }

    fn write_ctrl(&mut self, value: u32) {
        let v = RsbCtrl::from_bits_retain(value);
        self.state.ctrl = (v & RsbCtrl::GLB_INTEN).bits();

        if v.contains(RsbCtrl::START_XFER) {
            tracing::trace!("RSB: transfer started");
            self.state.stat |= RsbStat::TOVER.bits();
            self.update_irq();
        }
        if v.contains(RsbCtrl::ABT_XFER) {
            tracing::trace!("RSB: transfer aborted");
            self.state.stat = 0;
            self.update_irq();
        }
    }

    fn write_stat(&mut self, value: u32) {
        if RsbStat::from_bits_retain(value).contains(RsbStat::TOVER) {
            self.state.stat = 0;
            self.update_irq();
        }
    }
}

impl crate::Peripheral for Rsb {
    fn read(&self, offset: u64, _size: u8) -> SimResult<u64> {
        let value = match RsbRegister::from_offset(offset) {
            Some(RsbRegister::Ctrl) => self.state.ctrl,
            Some(RsbRegister::Stat) => self.state.stat,
            Some(reg) => {
                tracing::warn!("RSB: read of unwired register {:?}", reg);
                0
            }
            None => {
                tracing::warn!("RSB: out-of-bounds read at offset {:#05x}", offset);
                0
            }
        };
        Ok(value as u64)
    }

    fn write(&mut self, offset: u64, _size: u8, value: u64) -> SimResult<()> {
        let value = value as u32;
        match RsbRegister::from_offset(offset) {
            Some(RsbRegister::Ctrl) => self.write_ctrl(value),
            Some(RsbRegister::Stat) => self.write_stat(value),
            Some(reg) => tracing::warn!(
                "RSB: write of unwired register {:?} (value {:#010x})",
                reg,
                value
            ),
            None => tracing::warn!(
                "RSB: out-of-bounds write at offset {:#05x} (value {:#010x})",
                offset,
                value
            ),
        }
        Ok(())
    }

    fn access_sizes(&self) -> AccessSizes {
        AccessSizes::new(4, 4)
    }

    fn reset(&mut self) {
        self.state = RsbState::default();
        self.irq.lower();
    }

    fn as_any(&self) -> Option<&dyn std::any::Any> {
        Some(self)
    }

    fn as_any_mut(&mut self) -> Option<&mut dyn std::any::Any> {
        Some(self)
    }

    fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self.state).unwrap_or(serde_json::Value::Null)
    }

    fn restore(&mut self, state: serde_json::Value) -> SimResult<()> {
        self.state = serde_json::from_value(state)
            .map_err(|e| SimulationError::Snapshot(format!("rsb: {}", e)))?;
        self.update_irq();
        Ok(())
    }
}
