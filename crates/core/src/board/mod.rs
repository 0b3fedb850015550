// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod pinephone;

use crate::chardev::{BufferBackend, NullBackend, SerialHosts, StdoutBackend};
use anyhow::Result;
use labwired_a64_config::{BoardManifest, SerialBackendKind};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Machine options a board is created with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineConfig {
    pub cpu_type: String,
    pub smp_cpus: u32,
    pub ram_size: u64,
    pub bios: Option<PathBuf>,
    pub kernel: Option<PathBuf>,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            cpu_type: "cortex-a53".to_string(),
            smp_cpus: crate::soc::A64_NUM_CPUS,
            ram_size: 2 * crate::GIB,
            bios: None,
            kernel: None,
        }
    }
}

impl MachineConfig {
    pub fn from_manifest(manifest: &BoardManifest) -> Result<Self> {
        Ok(Self {
            cpu_type: manifest.machine.cpu_type.clone(),
            smp_cpus: manifest.machine.smp_cpus,
            ram_size: manifest.ram_size_bytes()?,
            bios: manifest.boot.bios.clone(),
            kernel: manifest.boot.kernel.clone(),
        })
    }
}

/// How the first instruction fetch will be satisfied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootSource {
    /// A kernel image is handed to the CPU loader, entered at `loader_start`.
    Kernel { path: PathBuf, loader_start: u64 },
    /// boot0 was copied from the SD card into SRAM A1.
    BootRom,
    /// Nothing to boot; cores start on whatever memory holds.
    None,
}

/// Host side of the serial ports declared in a manifest.
#[derive(Debug, Default)]
pub struct HostSerial {
    pub hosts: SerialHosts,
    pub captures: BTreeMap<usize, BufferBackend>,
}

impl HostSerial {
    pub fn from_manifest(manifest: &BoardManifest) -> Self {
        let mut serial = Self::default();
        for binding in &manifest.serial {
            match binding.backend {
                SerialBackendKind::Stdout => {
                    serial.hosts.set(binding.index, Arc::new(StdoutBackend));
                }
                SerialBackendKind::Capture => {
                    let capture = BufferBackend::new();
                    serial.hosts.set(binding.index, Arc::new(capture.clone()));
                    serial.captures.insert(binding.index, capture);
                }
                SerialBackendKind::Discard => {
                    serial.hosts.set(binding.index, Arc::new(NullBackend));
                }
            }
        }
        serial
    }
}
