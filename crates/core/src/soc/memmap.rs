// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::peripherals::rsb::RSB_WINDOW_SIZE;
use crate::{GIB, KIB};

/// Address-mapped blocks of the A64 that the SoC composer places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum A64Device {
    SramA1,
    SramA2,
    SramC,
    Uart4,
    Rsb,
    Sdram,
}

impl A64Device {
    pub const ALL: [A64Device; 6] = [
        A64Device::SramA1,
        A64Device::SramA2,
        A64Device::SramC,
        A64Device::Uart4,
        A64Device::Rsb,
        A64Device::Sdram,
    ];

    /// Bus window name.
    pub fn name(self) -> &'static str {
        match self {
            A64Device::SramA1 => "sram-a1",
            A64Device::SramA2 => "sram-a2",
            A64Device::SramC => "sram-c",
            A64Device::Uart4 => "uart4",
            A64Device::Rsb => "r_rsb",
            A64Device::Sdram => "sdram",
        }
    }
}

/// Immutable device → (base, size) table, one slot per [`A64Device`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryMap {
    entries: [(u64, u64); A64Device::ALL.len()],
}

impl MemoryMap {
    pub fn a64() -> Self {
        Self {
            entries: A64Device::ALL.map(|dev| match dev {
                A64Device::SramA1 => (0x0001_0000, 32 * KIB),
                A64Device::SramA2 => (0x0004_4000, 64 * KIB),
                A64Device::SramC => (0x0001_8000, 160 * KIB),
                A64Device::Uart4 => (0x01C2_9000, KIB),
                A64Device::Rsb => (0x01F0_3400, RSB_WINDOW_SIZE),
                A64Device::Sdram => (0x4000_0000, 3 * GIB),
            }),
        }
    }

    /// Same table with one entry moved, for boards or tests that relocate a block.
    pub fn with_base(mut self, dev: A64Device, base: u64) -> Self {
        self.entries[dev as usize].0 = base;
        self
    }

    pub fn base(&self, dev: A64Device) -> u64 {
        self.entries[dev as usize].0
    }

    pub fn size(&self, dev: A64Device) -> u64 {
        self.entries[dev as usize].1
    }
}

/// Real hardware window that is absorbed by a stub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnimplementedWindow {
    pub name: String,
    pub base: u64,
    pub size: u64,
}

impl UnimplementedWindow {
    pub fn new(name: &str, base: u64, size: u64) -> Self {
        Self {
            name: name.to_string(),
            base,
            size,
        }
    }
}

/// Everything the composer needs to lay out the address space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocLayout {
    pub map: MemoryMap,
    pub unimplemented: Vec<UnimplementedWindow>,
}

impl SocLayout {
    pub fn a64() -> Self {
        let map = MemoryMap::a64();
        let unimplemented = vec![
            UnimplementedWindow::new("n-brom", 0x0000_0000, 48 * KIB),
            // Secure BROM is 64 KiB from 0; the first 48 KiB alias n-brom.
            UnimplementedWindow::new("s-brom", 0x0000_C000, 16 * KIB),
            UnimplementedWindow::new(
                A64Device::Sdram.name(),
                map.base(A64Device::Sdram),
                map.size(A64Device::Sdram),
            ),
        ];
        Self { map, unimplemented }
    }

    pub fn with_unimplemented(mut self, window: UnimplementedWindow) -> Self {
        self.unimplemented.push(window);
        self
    }
}

impl Default for SocLayout {
    fn default() -> Self {
        Self::a64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_a64_map_constants() {
        let map = MemoryMap::a64();
        assert_eq!(map.base(A64Device::SramA1), 0x10000);
        assert_eq!(map.base(A64Device::SramC), 0x18000);
        assert_eq!(map.base(A64Device::SramA2), 0x44000);
        assert_eq!(map.base(A64Device::Rsb), 0x01f03400);
        assert_eq!(map.size(A64Device::Rsb), 0x400);
        assert_eq!(map.size(A64Device::SramC), 160 * KIB);
    }

    #[test]
    fn test_every_device_has_its_own_slot() {
        for (i, dev) in A64Device::ALL.into_iter().enumerate() {
            assert_eq!(dev as usize, i, "{:?} out of order in ALL", dev);
        }
        let map = MemoryMap::a64();
        for dev in A64Device::ALL {
            assert_ne!(map.size(dev), 0, "{:?} has no window", dev);
        }
    }

    #[test]
    fn test_relocation_only_touches_one_entry() {
        let map = MemoryMap::a64().with_base(A64Device::Uart4, 0x0200_0000);
        assert_eq!(map.base(A64Device::Uart4), 0x0200_0000);
        assert_eq!(map.base(A64Device::Rsb), 0x01f03400);
    }

    #[test]
    fn test_default_stub_table_covers_brom() {
        let layout = SocLayout::a64();
        let names: Vec<_> = layout.unimplemented.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["n-brom", "s-brom", "sdram"]);
        let brom_end = layout.unimplemented[1].base + layout.unimplemented[1].size;
        assert_eq!(brom_end, 64 * KIB);
    }
}
