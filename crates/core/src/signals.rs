// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::interrupt::InterruptController;
use std::cell::Cell;
use std::sync::Arc;

/// Represents a digital signal level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DigitalLevel {
    #[default]
    Low,
    High,
}

impl From<bool> for DigitalLevel {
    fn from(b: bool) -> Self {
        if b {
            DigitalLevel::High
        } else {
            DigitalLevel::Low
        }
    }
}

impl From<DigitalLevel> for bool {
    fn from(level: DigitalLevel) -> Self {
        match level {
            DigitalLevel::High => true,
            DigitalLevel::Low => false,
        }
    }
}

/// Output interrupt line of a peripheral.
///
/// The line remembers the level its device last drove and, once connected,
/// forwards every change to one input pin of a shared interrupt controller.
/// The controller is referenced, not owned: many lines point at the same one.
#[derive(Debug, Clone, Default)]
pub struct InterruptLine {
    binding: Option<(Arc<dyn InterruptController>, u32)>,
    level: Cell<DigitalLevel>,
}

impl InterruptLine {
    /// An unconnected line; level changes are only recorded locally.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connected(controller: Arc<dyn InterruptController>, pin: u32) -> Self {
        Self {
            binding: Some((controller, pin)),
            level: Cell::new(DigitalLevel::Low),
        }
    }

    pub fn pin(&self) -> Option<u32> {
        self.binding.as_ref().map(|(_, pin)| *pin)
    }

    pub fn set(&self, level: DigitalLevel) {
        self.level.set(level);
        if let Some((controller, pin)) = &self.binding {
            controller.set_irq_level(*pin, level.into());
        }
    }

    pub fn raise(&self) {
        self.set(DigitalLevel::High);
    }

    pub fn lower(&self) {
        self.set(DigitalLevel::Low);
    }

    pub fn level(&self) -> DigitalLevel {
        self.level.get()
    }

    pub fn is_high(&self) -> bool {
        self.level.get() == DigitalLevel::High
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interrupt::Gic;

    #[test]
    fn test_unconnected_line_tracks_level() {
        let irq = InterruptLine::new();
        assert!(!irq.is_high());
        irq.raise();
        assert!(irq.is_high());
        assert_eq!(irq.pin(), None);
        irq.lower();
        assert_eq!(irq.level(), DigitalLevel::Low);
    }

    #[test]
    fn test_connected_line_drives_controller_pin() {
        let gic = Arc::new(Gic::new());
        let irq = InterruptLine::connected(gic.clone(), 39);
        irq.raise();
        assert!(gic.irq_level(39));
        assert!(!gic.irq_level(38));
        irq.lower();
        assert!(!gic.irq_level(39));
    }

    #[test]
    fn test_level_bool_conversions() {
        let b: bool = DigitalLevel::High.into();
        assert!(b);
        assert_eq!(DigitalLevel::from(false), DigitalLevel::Low);
    }
}
