// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod block;
pub mod board;
pub mod bus;
pub mod chardev;
pub mod interrupt;
pub mod memory;
pub mod peripherals;
pub mod signals;
pub mod snapshot;
pub mod soc;

use std::any::Any;

#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("Memory access violation at {0:#x}")]
    MemoryViolation(u64),
    #[error("Invalid {size}-byte access at {addr:#x}")]
    InvalidAccess { addr: u64, size: u8 },
    #[error("Snapshot error: {0}")]
    Snapshot(String),
}

pub type SimResult<T> = Result<T, SimulationError>;

/// Fatal board/SoC configuration errors, reported before any device runs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error(
        "Window '{name}' [{base:#x}, +{size:#x}) overlaps '{other}' [{other_base:#x}, +{other_size:#x})"
    )]
    Overlap {
        name: String,
        base: u64,
        size: u64,
        other: String,
        other_base: u64,
        other_size: u64,
    },
    #[error("Window '{name}' at {base:#x} with size {size:#x} is empty or wraps the address space")]
    InvalidWindow { name: String, base: u64, size: u64 },
    #[error("This machine can only be used with {expected:#x} bytes of RAM (got {actual:#x})")]
    RamSize { expected: u64, actual: u64 },
    #[error("This board can only be used with {expected} CPU (got '{actual}')")]
    CpuModel { expected: String, actual: String },
    #[error("Unknown CPU model '{0}'")]
    UnknownCpuModel(String),
    #[error("CPU count {actual} outside supported range {min}..={max}")]
    CpuCount { min: u32, max: u32, actual: u32 },
    #[error("BIOS not supported for this machine")]
    BiosUnsupported,
}

/// Access widths (in bytes) a memory-mapped window accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessSizes {
    pub min: u8,
    pub max: u8,
    pub unaligned: bool,
}

impl AccessSizes {
    pub const fn new(min: u8, max: u8) -> Self {
        Self {
            min,
            max,
            unaligned: false,
        }
    }

    pub fn permits(&self, addr: u64, size: u8) -> bool {
        if !size.is_power_of_two() || size < self.min || size > self.max {
            return false;
        }
        self.unaligned || addr % size as u64 == 0
    }
}

impl Default for AccessSizes {
    fn default() -> Self {
        Self::new(1, 4)
    }
}

/// Trait representing a memory-mapped peripheral.
///
/// Offsets are relative to the window base. The bus only forwards accesses
/// that satisfy [`Peripheral::access_sizes`].
pub trait Peripheral: std::fmt::Debug + Send {
    fn read(&self, offset: u64, size: u8) -> SimResult<u64>;
    fn write(&mut self, offset: u64, size: u8, value: u64) -> SimResult<()>;
    fn access_sizes(&self) -> AccessSizes {
        AccessSizes::default()
    }
    /// Return to power-on state. Interrupt outputs must follow.
    fn reset(&mut self) {}
    fn as_any(&self) -> Option<&dyn Any> {
        None
    }
    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        None
    }
    fn snapshot(&self) -> serde_json::Value {
        serde_json::Value::Null
    }
    fn restore(&mut self, _state: serde_json::Value) -> SimResult<()> {
        Ok(())
    }
}

/// Trait representing the system bus
pub trait Bus {
    fn read(&self, addr: u64, size: u8) -> SimResult<u64>;
    fn write(&mut self, addr: u64, size: u8, value: u64) -> SimResult<()>;

    fn read_u8(&self, addr: u64) -> SimResult<u8> {
        Ok(self.read(addr, 1)? as u8)
    }

    fn read_u16(&self, addr: u64) -> SimResult<u16> {
        Ok(self.read(addr, 2)? as u16)
    }

    fn read_u32(&self, addr: u64) -> SimResult<u32> {
        Ok(self.read(addr, 4)? as u32)
    }

    fn write_u8(&mut self, addr: u64, value: u8) -> SimResult<()> {
        self.write(addr, 1, value as u64)
    }

    fn write_u16(&mut self, addr: u64, value: u16) -> SimResult<()> {
        self.write(addr, 2, value as u64)
    }

    fn write_u32(&mut self, addr: u64, value: u32) -> SimResult<()> {
        self.write(addr, 4, value as u64)
    }
}

pub const KIB: u64 = 1024;
pub const MIB: u64 = 1024 * KIB;
pub const GIB: u64 = 1024 * MIB;
