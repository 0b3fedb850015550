// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::memory::LinearMemory;
use crate::{AccessSizes, ConfigError, Peripheral, SimResult, SimulationError};
use std::collections::BTreeMap;

/// What backs a window of the physical address space.
#[derive(Debug)]
pub enum RegionKind {
    /// Directly addressable memory.
    Ram(LinearMemory),
    /// Register-backed I/O.
    Io(Box<dyn Peripheral>),
}

#[derive(Debug)]
pub struct RegionEntry {
    pub name: String,
    pub base: u64,
    pub size: u64,
    pub kind: RegionKind,
}

impl RegionEntry {
    fn contains(&self, addr: u64) -> bool {
        addr >= self.base && addr - self.base < self.size
    }
}

/// Read-only view of an installed window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub name: String,
    pub base: u64,
    pub size: u64,
    pub is_ram: bool,
}

impl Window {
    pub fn end(&self) -> u64 {
        self.base + self.size
    }

    pub fn overlaps(&self, other: &Window) -> bool {
        self.base < other.end() && other.base < self.end()
    }
}

const RAM_ACCESS: AccessSizes = AccessSizes {
    min: 1,
    max: 8,
    unaligned: true,
};

/// Physical address space: a set of non-overlapping windows.
#[derive(Debug, Default)]
pub struct SystemBus {
    regions: Vec<RegionEntry>,
}

impl SystemBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks that `[base, base + size)` is a valid, unclaimed window.
    fn claim(&self, name: &str, base: u64, size: u64) -> Result<(), ConfigError> {
        if size == 0 || base.checked_add(size).is_none() {
            return Err(ConfigError::InvalidWindow {
                name: name.to_string(),
                base,
                size,
            });
        }

        for r in &self.regions {
            if base < r.base + r.size && r.base < base + size {
                return Err(ConfigError::Overlap {
                    name: name.to_string(),
                    base,
                    size,
                    other: r.name.clone(),
                    other_base: r.base,
                    other_size: r.size,
                });
            }
        }
        Ok(())
    }

    pub fn add_ram(&mut self, name: &str, base: u64, size: u64) -> Result<(), ConfigError> {
        self.claim(name, base, size)?;
        tracing::debug!("Bus: RAM '{}' at {:#010x} ({:#x} bytes)", name, base, size);
        self.regions.push(RegionEntry {
            name: name.to_string(),
            base,
            size,
            kind: RegionKind::Ram(LinearMemory::new(size as usize, base)),
        });
        Ok(())
    }

    pub fn add_peripheral(
        &mut self,
        name: &str,
        base: u64,
        size: u64,
        dev: Box<dyn Peripheral>,
    ) -> Result<(), ConfigError> {
        self.claim(name, base, size)?;
        tracing::debug!("Bus: I/O '{}' at {:#010x} ({:#x} bytes)", name, base, size);
        self.regions.push(RegionEntry {
            name: name.to_string(),
            base,
            size,
            kind: RegionKind::Io(dev),
        });
        Ok(())
    }

    pub fn windows(&self) -> Vec<Window> {
        let mut out: Vec<Window> = self
            .regions
            .iter()
            .map(|r| Window {
                name: r.name.clone(),
                base: r.base,
                size: r.size,
                is_ram: matches!(r.kind, RegionKind::Ram(_)),
            })
            .collect();
        out.sort_by_key(|w| w.base);
        out
    }

    pub fn window(&self, name: &str) -> Option<Window> {
        self.windows().into_iter().find(|w| w.name == name)
    }

    fn find(&self, addr: u64) -> Option<&RegionEntry> {
        self.regions.iter().find(|r| r.contains(addr))
    }

    fn find_mut(&mut self, addr: u64) -> Option<&mut RegionEntry> {
        self.regions.iter_mut().find(|r| r.contains(addr))
    }

    /// Returns the RAM window containing `addr`.
    pub fn ram(&self, addr: u64) -> Option<&LinearMemory> {
        match self.find(addr).map(|r| &r.kind) {
            Some(RegionKind::Ram(mem)) => Some(mem),
            _ => None,
        }
    }

    /// Copies `data` into the RAM window starting at `addr`.
    ///
    /// The whole image must fit in a single RAM window; otherwise nothing is
    /// written.
    pub fn load_image(&mut self, addr: u64, data: &[u8]) -> SimResult<()> {
        match self.find_mut(addr).map(|r| &mut r.kind) {
            Some(RegionKind::Ram(mem)) => {
                if mem.load(addr, data) {
                    Ok(())
                } else {
                    Err(SimulationError::MemoryViolation(addr))
                }
            }
            _ => Err(SimulationError::MemoryViolation(addr)),
        }
    }

    pub fn read_bytes(&self, addr: u64, len: usize) -> SimResult<Vec<u8>> {
        self.ram(addr)
            .and_then(|mem| mem.slice(addr, len))
            .map(|s| s.to_vec())
            .ok_or(SimulationError::MemoryViolation(addr))
    }

    pub fn peripheral<T: 'static>(&self, name: &str) -> Option<&T> {
        self.regions.iter().find(|r| r.name == name).and_then(|r| {
            match &r.kind {
                RegionKind::Io(dev) => dev.as_any()?.downcast_ref::<T>(),
                RegionKind::Ram(_) => None,
            }
        })
    }

    pub fn peripheral_mut<T: 'static>(&mut self, name: &str) -> Option<&mut T> {
        self.regions
            .iter_mut()
            .find(|r| r.name == name)
            .and_then(|r| match &mut r.kind {
                RegionKind::Io(dev) => dev.as_any_mut()?.downcast_mut::<T>(),
                RegionKind::Ram(_) => None,
            })
    }

    pub fn reset_peripherals(&mut self) {
        for r in &mut self.regions {
            if let RegionKind::Io(dev) = &mut r.kind {
                dev.reset();
            }
        }
    }

    /// Device state of every I/O window that carries any.
    pub fn snapshot_peripherals(&self) -> BTreeMap<String, serde_json::Value> {
        self.regions
            .iter()
            .filter_map(|r| match &r.kind {
                RegionKind::Io(dev) => Some((r.name.clone(), dev.snapshot())),
                RegionKind::Ram(_) => None,
            })
            .filter(|(_, state)| !state.is_null())
            .collect()
    }

    /// Applies `states` to the matching I/O windows.
    ///
    /// All or nothing: if any device rejects its state, every device is put
    /// back to what it held before the call.
    pub fn restore_peripherals(
        &mut self,
        states: &BTreeMap<String, serde_json::Value>,
    ) -> SimResult<()> {
        let saved = self.snapshot_peripherals();
        if let Err(e) = self.apply_states(states) {
            tracing::warn!("Bus: restore rejected, rolling back: {}", e);
            if let Err(rollback) = self.apply_states(&saved) {
                tracing::error!("Bus: rollback failed: {}", rollback);
            }
            return Err(e);
        }
        Ok(())
    }

    fn apply_states(&mut self, states: &BTreeMap<String, serde_json::Value>) -> SimResult<()> {
        for r in &mut self.regions {
            if let RegionKind::Io(dev) = &mut r.kind {
                if let Some(state) = states.get(&r.name) {
                    dev.restore(state.clone())?;
                }
            }
        }
        Ok(())
    }

    fn check_access(region: &RegionEntry, addr: u64, size: u8) -> SimResult<()> {
        let allowed = match &region.kind {
            RegionKind::Ram(_) => RAM_ACCESS,
            RegionKind::Io(dev) => dev.access_sizes(),
        };
        let fits = addr - region.base + size as u64 <= region.size;
        if !fits || !allowed.permits(addr, size) {
            tracing::warn!(
                "Bus: rejected {}-byte access at {:#010x} in '{}'",
                size,
                addr,
                region.name
            );
            return Err(SimulationError::InvalidAccess { addr, size });
        }
        Ok(())
    }
}

impl crate::Bus for SystemBus {
    fn read(&self, addr: u64, size: u8) -> SimResult<u64> {
        let Some(region) = self.find(addr) else {
            return Err(SimulationError::MemoryViolation(addr));
        };
        Self::check_access(region, addr, size)?;

        match &region.kind {
            RegionKind::Ram(mem) => mem
                .read(addr, size)
                .ok_or(SimulationError::MemoryViolation(addr)),
            RegionKind::Io(dev) => dev.read(addr - region.base, size),
        }
    }

    fn write(&mut self, addr: u64, size: u8, value: u64) -> SimResult<()> {
        let Some(region) = self.find_mut(addr) else {
            return Err(SimulationError::MemoryViolation(addr));
        };
        Self::check_access(region, addr, size)?;

        let base = region.base;
        match &mut region.kind {
            RegionKind::Ram(mem) => {
                if mem.write(addr, size, value) {
                    Ok(())
                } else {
                    Err(SimulationError::MemoryViolation(addr))
                }
            }
            RegionKind::Io(dev) => dev.write(addr - base, size, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peripherals::stub::UnimplementedDevice;
    use crate::Bus;

    #[derive(Debug, Default)]
    struct Scratch {
        value: u32,
    }

    impl Peripheral for Scratch {
        fn read(&self, _offset: u64, _size: u8) -> SimResult<u64> {
            Ok(self.value as u64)
        }

        fn write(&mut self, _offset: u64, _size: u8, value: u64) -> SimResult<()> {
            self.value = value as u32;
            Ok(())
        }

        fn access_sizes(&self) -> AccessSizes {
            AccessSizes::new(4, 4)
        }

        fn reset(&mut self) {
            self.value = 0;
        }

        fn as_any(&self) -> Option<&dyn std::any::Any> {
            Some(self)
        }

        fn snapshot(&self) -> serde_json::Value {
            serde_json::json!({ "value": self.value })
        }

        fn restore(&mut self, state: serde_json::Value) -> SimResult<()> {
            let value = state["value"]
                .as_u64()
                .ok_or_else(|| SimulationError::Snapshot("scratch".to_string()))?;
            self.value = value as u32;
            Ok(())
        }
    }

    #[test]
    fn test_overlapping_windows_are_rejected() {
        let mut bus = SystemBus::new();
        bus.add_ram("sram", 0x1_0000, 0x8000).unwrap();

        let err = bus
            .add_peripheral(
                "late",
                0x1_7FFC,
                0x10,
                Box::new(UnimplementedDevice::new("late")),
            )
            .unwrap_err();
        assert!(matches!(err, ConfigError::Overlap { ref other, .. } if other == "sram"));

        // Adjacent is fine
        bus.add_ram("next", 0x1_8000, 0x1000).unwrap();
        assert_eq!(bus.windows().len(), 2);
    }

    #[test]
    fn test_empty_and_wrapping_windows_are_rejected() {
        let mut bus = SystemBus::new();
        assert!(matches!(
            bus.add_ram("empty", 0x1000, 0),
            Err(ConfigError::InvalidWindow { .. })
        ));
        assert!(matches!(
            bus.add_peripheral(
                "wrap",
                u64::MAX - 0xF,
                0x20,
                Box::new(UnimplementedDevice::new("wrap"))
            ),
            Err(ConfigError::InvalidWindow { .. })
        ));
    }

    #[test]
    fn test_dispatch_to_ram_and_io() {
        let mut bus = SystemBus::new();
        bus.add_ram("sram", 0x0, 0x100).unwrap();
        bus.add_peripheral("scratch", 0x1000, 0x400, Box::new(Scratch::default()))
            .unwrap();

        bus.write_u32(0x10, 0xCAFE_F00D).unwrap();
        assert_eq!(bus.read_u16(0x12).unwrap(), 0xCAFE);

        bus.write_u32(0x1000, 0x1234).unwrap();
        assert_eq!(bus.read_u32(0x1004).unwrap(), 0x1234);
        assert_eq!(bus.peripheral::<Scratch>("scratch").unwrap().value, 0x1234);

        assert!(matches!(
            bus.read_u32(0x2000),
            Err(SimulationError::MemoryViolation(0x2000))
        ));
    }

    #[test]
    fn test_width_policy_is_enforced_by_bus() {
        let mut bus = SystemBus::new();
        bus.add_peripheral("scratch", 0x1000, 0x400, Box::new(Scratch::default()))
            .unwrap();

        assert!(matches!(
            bus.write_u8(0x1000, 0xFF),
            Err(SimulationError::InvalidAccess { size: 1, .. })
        ));
        assert!(matches!(
            bus.read_u32(0x1002),
            Err(SimulationError::InvalidAccess { .. })
        ));
        // Access running off the end of the window
        assert!(matches!(
            bus.read_u32(0x13FE),
            Err(SimulationError::InvalidAccess { .. })
        ));
        assert_eq!(bus.peripheral::<Scratch>("scratch").unwrap().value, 0);
    }

    #[test]
    fn test_load_image_is_all_or_nothing() {
        let mut bus = SystemBus::new();
        bus.add_ram("sram", 0x100, 0x10).unwrap();

        assert!(bus.load_image(0x10C, &[1; 8]).is_err());
        assert_eq!(bus.read_bytes(0x100, 0x10).unwrap(), vec![0; 0x10]);

        bus.load_image(0x108, &[7; 8]).unwrap();
        assert_eq!(bus.read_bytes(0x108, 8).unwrap(), vec![7; 8]);
    }

    #[test]
    fn test_reset_and_snapshot_walk_io_windows() {
        let mut bus = SystemBus::new();
        bus.add_ram("sram", 0x0, 0x100).unwrap();
        bus.add_peripheral("scratch", 0x1000, 0x400, Box::new(Scratch::default()))
            .unwrap();
        bus.add_peripheral(
            "hole",
            0x2000,
            0x400,
            Box::new(UnimplementedDevice::new("hole")),
        )
        .unwrap();

        bus.write_u32(0x1000, 5).unwrap();
        let states = bus.snapshot_peripherals();
        assert_eq!(states.len(), 1);
        assert_eq!(states["scratch"]["value"], 5);

        bus.reset_peripherals();
        assert_eq!(bus.read_u32(0x1000).unwrap(), 0);
    }

    #[test]
    fn test_failed_restore_rolls_back_every_window() {
        let mut bus = SystemBus::new();
        bus.add_peripheral("a", 0x1000, 0x400, Box::new(Scratch::default()))
            .unwrap();
        bus.add_peripheral("b", 0x2000, 0x400, Box::new(Scratch::default()))
            .unwrap();
        bus.write_u32(0x1000, 1).unwrap();
        bus.write_u32(0x2000, 2).unwrap();

        let mut states = BTreeMap::new();
        states.insert("a".to_string(), serde_json::json!({ "value": 10 }));
        states.insert("b".to_string(), serde_json::json!({ "value": "bad" }));
        assert!(matches!(
            bus.restore_peripherals(&states),
            Err(SimulationError::Snapshot(_))
        ));
        assert_eq!(bus.read_u32(0x1000).unwrap(), 1);
        assert_eq!(bus.read_u32(0x2000).unwrap(), 2);

        states.insert("b".to_string(), serde_json::json!({ "value": 20 }));
        bus.restore_peripherals(&states).unwrap();
        assert_eq!(bus.read_u32(0x1000).unwrap(), 10);
        assert_eq!(bus.read_u32(0x2000).unwrap(), 20);
    }
}
