// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Allwinner A64 system-on-chip.

pub mod bootrom;
pub mod memmap;

use crate::bus::SystemBus;
use crate::chardev::SerialHosts;
use crate::interrupt::{Gic, InterruptController};
use crate::peripherals::rsb::Rsb;
use crate::peripherals::stub::UnimplementedDevice;
use crate::peripherals::uart::Uart16550;
use crate::snapshot::SocSnapshot;
use crate::{ConfigError, SimResult, SimulationError};
use bootrom::RomBlob;
use memmap::{A64Device, MemoryMap, SocLayout};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

pub const A64_NUM_CPUS: u32 = 4;

/// GIC shared peripheral interrupt inputs.
pub const A64_GIC_SPI_UART4: u32 = 4;
pub const A64_GIC_SPI_RSB: u32 = 39;

/// Host serial port backing UART4.
pub const A64_UART4_SERIAL_INDEX: usize = 3;

/// UART4 registers sit on 32-bit boundaries.
const UART_REGSHIFT: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuModel {
    CortexA7,
    CortexA53,
    CortexA72,
}

impl CpuModel {
    pub fn as_str(self) -> &'static str {
        match self {
            CpuModel::CortexA7 => "cortex-a7",
            CpuModel::CortexA53 => "cortex-a53",
            CpuModel::CortexA72 => "cortex-a72",
        }
    }
}

impl fmt::Display for CpuModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CpuModel {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let v = value.trim().to_ascii_lowercase();
        let v = v.strip_suffix("-arm-cpu").unwrap_or(&v);
        match v {
            "cortex-a7" => Ok(Self::CortexA7),
            "cortex-a53" => Ok(Self::CortexA53),
            "cortex-a72" => Ok(Self::CortexA72),
            _ => Err(ConfigError::UnknownCpuModel(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuCore {
    pub index: u32,
    pub powered: bool,
}

/// Cores of the SoC. Instruction execution belongs to the CPU model; this
/// only tracks which cores are allowed to run.
#[derive(Debug, Clone)]
pub struct CpuCluster {
    model: CpuModel,
    cores: Vec<CpuCore>,
}

impl CpuCluster {
    pub fn new(model: CpuModel, count: u32) -> Result<Self, ConfigError> {
        if count == 0 || count > A64_NUM_CPUS {
            return Err(ConfigError::CpuCount {
                min: 1,
                max: A64_NUM_CPUS,
                actual: count,
            });
        }
        let mut cluster = Self {
            model,
            cores: (0..count)
                .map(|index| CpuCore {
                    index,
                    powered: false,
                })
                .collect(),
        };
        cluster.reset();
        Ok(cluster)
    }

    /// Boot core on, secondaries held off until firmware releases them.
    pub fn reset(&mut self) {
        for core in &mut self.cores {
            core.powered = core.index == 0;
        }
    }

    pub fn model(&self) -> CpuModel {
        self.model
    }

    pub fn len(&self) -> usize {
        self.cores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cores.is_empty()
    }

    pub fn cores(&self) -> &[CpuCore] {
        &self.cores
    }

    pub fn set_powered(&mut self, index: u32, powered: bool) {
        match self.cores.iter_mut().find(|c| c.index == index) {
            Some(core) => core.powered = powered,
            None => tracing::warn!("CPU: no core {} to power {}", index, powered),
        }
    }

    fn powered(&self) -> Vec<bool> {
        self.cores.iter().map(|c| c.powered).collect()
    }
}

/// A64 composition: owns the address space and everything mapped in it.
#[derive(Debug)]
pub struct A64Soc {
    layout: SocLayout,
    bus: SystemBus,
    gic: Arc<Gic>,
    cpus: CpuCluster,
    pub(crate) roms: Vec<RomBlob>,
}

impl A64Soc {
    pub fn new(cpu_count: u32, cpu_model: CpuModel) -> Result<Self, ConfigError> {
        Self::with_layout(cpu_count, cpu_model, &SocLayout::a64(), &SerialHosts::new())
    }

    pub fn with_layout(
        cpu_count: u32,
        cpu_model: CpuModel,
        layout: &SocLayout,
        serial: &SerialHosts,
    ) -> Result<Self, ConfigError> {
        let cpus = CpuCluster::new(cpu_model, cpu_count)?;
        let gic = Arc::new(Gic::new());
        let map = &layout.map;
        let mut bus = SystemBus::new();

        for dev in [A64Device::SramA1, A64Device::SramA2, A64Device::SramC] {
            bus.add_ram(dev.name(), map.base(dev), map.size(dev))?;
        }

        let mut rsb = Rsb::new();
        rsb.connect_irq(gic.clone(), A64_GIC_SPI_RSB);
        bus.add_peripheral(
            A64Device::Rsb.name(),
            map.base(A64Device::Rsb),
            map.size(A64Device::Rsb),
            Box::new(rsb),
        )?;

        let mut uart = match serial.get(A64_UART4_SERIAL_INDEX) {
            Some(backend) => Uart16550::new(UART_REGSHIFT, backend),
            None => {
                info!(
                    "No host serial port {}; UART4 output discarded",
                    A64_UART4_SERIAL_INDEX
                );
                Uart16550::unconnected(UART_REGSHIFT)
            }
        };
        uart.connect_irq(gic.clone(), A64_GIC_SPI_UART4);
        bus.add_peripheral(
            A64Device::Uart4.name(),
            map.base(A64Device::Uart4),
            map.size(A64Device::Uart4),
            Box::new(uart),
        )?;

        for window in &layout.unimplemented {
            bus.add_peripheral(
                &window.name,
                window.base,
                window.size,
                Box::new(UnimplementedDevice::new(&window.name)),
            )?;
        }

        info!(
            "A64: composed {} x {} with {} windows",
            cpu_count,
            cpu_model,
            bus.windows().len()
        );

        Ok(Self {
            layout: layout.clone(),
            bus,
            gic,
            cpus,
            roms: Vec::new(),
        })
    }

    pub fn memmap(&self) -> &MemoryMap {
        &self.layout.map
    }

    pub fn layout(&self) -> &SocLayout {
        &self.layout
    }

    pub fn bus(&self) -> &SystemBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut SystemBus {
        &mut self.bus
    }

    pub fn gic(&self) -> Arc<Gic> {
        self.gic.clone()
    }

    pub fn irq_level(&self, pin: u32) -> bool {
        self.gic.irq_level(pin)
    }

    pub fn cpus(&self) -> &CpuCluster {
        &self.cpus
    }

    pub fn cpus_mut(&mut self) -> &mut CpuCluster {
        &mut self.cpus
    }

    pub fn rsb(&self) -> Option<&Rsb> {
        self.bus.peripheral::<Rsb>(A64Device::Rsb.name())
    }

    pub fn uart(&self) -> Option<&Uart16550> {
        self.bus.peripheral::<Uart16550>(A64Device::Uart4.name())
    }

    pub fn roms(&self) -> &[RomBlob] {
        &self.roms
    }

    /// System reset: devices to power-on state, ROM blobs rewritten,
    /// secondary cores off.
    pub fn reset(&mut self) {
        self.bus.reset_peripherals();
        for rom in &self.roms {
            if let Err(e) = self.bus.load_image(rom.addr, &rom.data) {
                tracing::warn!("ROM '{}' not reinstalled: {}", rom.name, e);
            }
        }
        self.cpus.reset();
    }

    pub fn snapshot(&self) -> SocSnapshot {
        SocSnapshot::new(self.cpus.powered(), self.bus.snapshot_peripherals())
    }

    /// Restores device and core state. On error the SoC is left as it was.
    pub fn restore(&mut self, snap: &SocSnapshot) -> SimResult<()> {
        if snap.cpu_powered.len() != self.cpus.len() {
            return Err(SimulationError::Snapshot(format!(
                "snapshot has {} cores, SoC has {}",
                snap.cpu_powered.len(),
                self.cpus.len()
            )));
        }
        self.bus.restore_peripherals(&snap.peripherals)?;
        for (index, powered) in snap.cpu_powered.iter().enumerate() {
            self.cpus.set_powered(index as u32, *powered);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_model_parsing() {
        assert_eq!("cortex-a53".parse::<CpuModel>().unwrap(), CpuModel::CortexA53);
        assert_eq!(
            "Cortex-A53-arm-cpu".parse::<CpuModel>().unwrap(),
            CpuModel::CortexA53
        );
        assert_eq!(
            "cortex-m3".parse::<CpuModel>(),
            Err(ConfigError::UnknownCpuModel("cortex-m3".to_string()))
        );
    }

    #[test]
    fn test_cluster_holds_secondaries_off() {
        let mut cpus = CpuCluster::new(CpuModel::CortexA53, 4).unwrap();
        assert_eq!(cpus.powered(), vec![true, false, false, false]);

        cpus.set_powered(2, true);
        cpus.reset();
        assert_eq!(cpus.powered(), vec![true, false, false, false]);
    }

    #[test]
    fn test_cluster_size_limits() {
        assert!(matches!(
            CpuCluster::new(CpuModel::CortexA53, 0),
            Err(ConfigError::CpuCount { actual: 0, .. })
        ));
        assert!(CpuCluster::new(CpuModel::CortexA53, 5).is_err());
        assert_eq!(CpuCluster::new(CpuModel::CortexA7, 1).unwrap().len(), 1);
    }
}
