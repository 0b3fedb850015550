// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU32, Ordering};

/// Trait representing a shared interrupt controller seen from the device side.
///
/// Inputs are level-sensitive: a device keeps its pin high for as long as
/// its interrupt condition holds.
pub trait InterruptController: Debug + Send + Sync {
    /// Drive input pin `irq` to `level`.
    fn set_irq_level(&self, irq: u32, level: bool);

    /// Current level of input pin `irq`.
    fn irq_level(&self, irq: u32) -> bool;
}

/// Number of shared peripheral interrupt inputs wired on the A64 GIC.
pub const GIC_SPI_COUNT: u32 = 128;

const GIC_SPI_WORDS: usize = (GIC_SPI_COUNT / 32) as usize;

/// SPI input side of the GIC.
///
/// Only the input levels are modelled; distributor and CPU interface
/// registers belong to the CPU model.
#[derive(Debug)]
pub struct Gic {
    spi_level: [AtomicU32; GIC_SPI_WORDS],
}

impl Default for Gic {
    fn default() -> Self {
        Self {
            spi_level: std::array::from_fn(|_| AtomicU32::new(0)),
        }
    }
}

impl Gic {
    pub fn new() -> Self {
        Self::default()
    }

    /// All SPI inputs currently held high, in ascending order.
    pub fn asserted_spis(&self) -> Vec<u32> {
        let mut out = Vec::new();
        for (idx, word) in self.spi_level.iter().enumerate() {
            let mask = word.load(Ordering::SeqCst);
            for bit in 0..32 {
                if (mask & (1 << bit)) != 0 {
                    out.push(idx as u32 * 32 + bit);
                }
            }
        }
        out
    }
}

impl InterruptController for Gic {
    fn set_irq_level(&self, irq: u32, level: bool) {
        if irq >= GIC_SPI_COUNT {
            tracing::warn!("GIC: ignoring level change on nonexistent SPI {}", irq);
            return;
        }
        let idx = (irq / 32) as usize;
        let bit = 1u32 << (irq % 32);
        if level {
            self.spi_level[idx].fetch_or(bit, Ordering::SeqCst);
        } else {
            self.spi_level[idx].fetch_and(!bit, Ordering::SeqCst);
        }
        tracing::trace!("GIC: SPI {} -> {}", irq, level);
    }

    fn irq_level(&self, irq: u32) -> bool {
        if irq >= GIC_SPI_COUNT {
            return false;
        }
        let idx = (irq / 32) as usize;
        (self.spi_level[idx].load(Ordering::SeqCst) & (1 << (irq % 32))) != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gic_levels_are_independent() {
        let gic = Gic::new();
        gic.set_irq_level(4, true);
        gic.set_irq_level(39, true);
        assert_eq!(gic.asserted_spis(), vec![4, 39]);

        gic.set_irq_level(4, false);
        assert!(!gic.irq_level(4));
        assert!(gic.irq_level(39));
    }

    #[test]
    fn test_gic_out_of_range_pin_is_ignored() {
        let gic = Gic::new();
        gic.set_irq_level(GIC_SPI_COUNT, true);
        assert!(!gic.irq_level(GIC_SPI_COUNT));
        assert!(gic.asserted_spis().is_empty());
    }
}
