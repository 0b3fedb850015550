// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::{AccessSizes, SimResult};

/// Placeholder for real hardware that is not modelled.
///
/// Reads return zero and writes are dropped, so a guest probing the window
/// keeps running instead of taking a bus fault.
#[derive(Debug, Clone)]
pub struct UnimplementedDevice {
    name: String,
}

impl UnimplementedDevice {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl crate::Peripheral for UnimplementedDevice {
    fn read(&self, offset: u64, size: u8) -> SimResult<u64> {
        tracing::debug!(
            "{}: unimplemented device read (size {}, offset {:#x})",
            self.name,
            size,
            offset
        );
        Ok(0)
    }

    fn write(&mut self, offset: u64, size: u8, value: u64) -> SimResult<()> {
        tracing::debug!(
            "{}: unimplemented device write (size {}, offset {:#x}, value {:#x})",
            self.name,
            size,
            offset,
            value
        );
        Ok(())
    }

    fn access_sizes(&self) -> AccessSizes {
        AccessSizes {
            min: 1,
            max: 8,
            unaligned: true,
        }
    }

    fn as_any(&self) -> Option<&dyn std::any::Any> {
        Some(self)
    }
}
