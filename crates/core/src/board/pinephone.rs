// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Pine64 Pinephone: A64, 2 GiB of DRAM, boot from SD.

use super::{BootSource, HostSerial, MachineConfig};
use crate::block::{BlockBackend, MmapBlockDevice};
use crate::chardev::{BufferBackend, SerialHosts};
use crate::soc::memmap::A64Device;
use crate::soc::{A64Soc, CpuModel, A64_NUM_CPUS};
use crate::{ConfigError, GIB};
use anyhow::{Context, Result};
use labwired_a64_config::BoardManifest;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

pub const PINEPHONE_RAM_SIZE: u64 = 2 * GIB;
pub const PINEPHONE_CPU: CpuModel = CpuModel::CortexA53;

#[derive(Debug)]
pub struct Pinephone {
    soc: A64Soc,
    boot: BootSource,
    ram_size: u64,
    captures: BTreeMap<usize, BufferBackend>,
}

impl Pinephone {
    /// Board constraints, checked in the order the machine reports them.
    pub fn validate(cfg: &MachineConfig) -> Result<CpuModel, ConfigError> {
        if cfg.bios.is_some() {
            return Err(ConfigError::BiosUnsupported);
        }
        if cfg.ram_size != PINEPHONE_RAM_SIZE {
            return Err(ConfigError::RamSize {
                expected: PINEPHONE_RAM_SIZE,
                actual: cfg.ram_size,
            });
        }

        let wrong_cpu = || ConfigError::CpuModel {
            expected: PINEPHONE_CPU.to_string(),
            actual: cfg.cpu_type.clone(),
        };
        let model: CpuModel = cfg.cpu_type.parse().map_err(|_| wrong_cpu())?;
        if model != PINEPHONE_CPU {
            return Err(wrong_cpu());
        }

        if cfg.smp_cpus != A64_NUM_CPUS {
            return Err(ConfigError::CpuCount {
                min: A64_NUM_CPUS,
                max: A64_NUM_CPUS,
                actual: cfg.smp_cpus,
            });
        }
        Ok(model)
    }

    pub fn init(
        cfg: &MachineConfig,
        sd: Option<&dyn BlockBackend>,
        serial: &SerialHosts,
    ) -> Result<Self> {
        let model = Self::validate(cfg)?;
        let mut soc = A64Soc::with_layout(
            cfg.smp_cpus,
            model,
            &crate::soc::memmap::SocLayout::a64(),
            serial,
        )?;

        let loader_start = soc.memmap().base(A64Device::Sdram);
        let boot = match (&cfg.kernel, sd) {
            (Some(path), _) => BootSource::Kernel {
                path: path.clone(),
                loader_start,
            },
            (None, Some(blk)) if blk.is_available() => {
                soc.bootrom_setup(blk)
                    .context("Failed to load boot0 from SD card")?;
                BootSource::BootRom
            }
            _ => BootSource::None,
        };

        info!("Pinephone: init done, boot source {:?}", boot);
        Ok(Self {
            soc,
            boot,
            ram_size: cfg.ram_size,
            captures: BTreeMap::new(),
        })
    }

    pub fn from_manifest(manifest: &BoardManifest) -> Result<Self> {
        let cfg = MachineConfig::from_manifest(manifest)?;
        let serial = HostSerial::from_manifest(manifest);

        let sd = match &manifest.boot.sd_image {
            Some(path) => Some(
                MmapBlockDevice::open(path)
                    .with_context(|| format!("Failed to open SD image {:?}", path))?,
            ),
            None => None,
        };

        let mut board = Self::init(
            &cfg,
            sd.as_ref().map(|d| d as &dyn BlockBackend),
            &serial.hosts,
        )
        .with_context(|| format!("Failed to build board '{}'", manifest.name))?;
        board.captures = serial.captures;
        Ok(board)
    }

    pub fn from_manifest_file(path: impl AsRef<Path>) -> Result<Self> {
        let manifest = BoardManifest::from_file(path)?;
        Self::from_manifest(&manifest)
    }

    pub fn soc(&self) -> &A64Soc {
        &self.soc
    }

    pub fn soc_mut(&mut self) -> &mut A64Soc {
        &mut self.soc
    }

    pub fn boot_source(&self) -> &BootSource {
        &self.boot
    }

    pub fn ram_size(&self) -> u64 {
        self.ram_size
    }

    /// Output captured for host serial port `index`, if it was declared as a capture.
    pub fn serial_output(&self, index: usize) -> Option<Vec<u8>> {
        self.captures.get(&index).map(|c| c.contents())
    }

    pub fn reset(&mut self) {
        self.soc.reset();
    }
}
