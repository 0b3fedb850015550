// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::chardev::{CharBackend, NullBackend};
use crate::interrupt::InterruptController;
use crate::signals::{DigitalLevel, InterruptLine};
use crate::{AccessSizes, SimResult, SimulationError};
use std::cell::Cell;
use std::sync::Arc;

const REG_RBR_THR: u64 = 0;
const REG_IER: u64 = 1;
const REG_IIR_FCR: u64 = 2;
const REG_LCR: u64 = 3;
const REG_MCR: u64 = 4;
const REG_LSR: u64 = 5;
const REG_MSR: u64 = 6;
const REG_SCR: u64 = 7;

const IIR_NO_INTERRUPT: u8 = 0x01;
const IIR_THRE: u8 = 0x02;
const IIR_FIFO_ENABLED: u8 = 0xC0;

const IER_ETBEI: u8 = 0x02;
const IER_MASK: u8 = 0x0F;

const FCR_FIFO_ENABLE: u8 = 0x01;

const LCR_DLAB: u8 = 0x80;

const LSR_THRE: u8 = 0x20;
const LSR_TEMT: u8 = 0x40;

/// DCD | DSR | CTS, what an unconnected null-modem reports.
const MSR_DEFAULT: u8 = 0xB0;

/// Register state that survives a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct UartState {
    pub ier: u8,
    pub fcr: u8,
    pub lcr: u8,
    pub mcr: u8,
    pub scr: u8,
    pub divisor: u16,
    pub thre_pending: bool,
}

/// 16550-compatible UART with registers spaced `1 << regshift` bytes apart.
///
/// Transmit goes straight to the character backend so the transmitter is
/// always empty. The receive path is not modelled.
#[derive(Debug)]
pub struct Uart16550 {
    regshift: u32,
    ier: u8,
    fcr: u8,
    lcr: u8,
    mcr: u8,
    scr: u8,
    divisor: u16,
    thre_pending: Cell<bool>,
    backend: Arc<dyn CharBackend>,
    irq: InterruptLine,
}

impl Uart16550 {
    pub fn new(regshift: u32, backend: Arc<dyn CharBackend>) -> Self {
        Self {
            regshift,
            ier: 0,
            fcr: 0,
            lcr: 0,
            mcr: 0,
            scr: 0,
            divisor: 0,
            thre_pending: Cell::new(false),
            backend,
            irq: InterruptLine::new(),
        }
    }

    /// A UART whose output goes nowhere.
    pub fn unconnected(regshift: u32) -> Self {
        Self::new(regshift, Arc::new(NullBackend))
    }

    pub fn connect_irq(&mut self, controller: Arc<dyn InterruptController>, pin: u32) {
        self.irq = InterruptLine::connected(controller, pin);
        self.update_irq();
    }

    pub fn irq(&self) -> &InterruptLine {
        &self.irq
    }

    pub fn state(&self) -> UartState {
        UartState {
            ier: self.ier,
            fcr: self.fcr,
            lcr: self.lcr,
            mcr: self.mcr,
            scr: self.scr,
            divisor: self.divisor,
            thre_pending: self.thre_pending.get(),
        }
    }

    fn dlab(&self) -> bool {
        self.lcr & LCR_DLAB != 0
    }

    fn pending(&self) -> u8 {
        if self.ier & IER_ETBEI != 0 && self.thre_pending.get() {
            IIR_THRE
        } else {
            IIR_NO_INTERRUPT
        }
    }

    fn update_irq(&self) {
        let active = self.pending() != IIR_NO_INTERRUPT;
        self.irq.set(DigitalLevel::from(active));
    }

    fn read_reg(&self, reg: u64) -> u8 {
        match reg {
            REG_RBR_THR if self.dlab() => self.divisor as u8,
            REG_RBR_THR => 0,
            REG_IER if self.dlab() => (self.divisor >> 8) as u8,
            REG_IER => self.ier,
            REG_IIR_FCR => {
                let id = self.pending();
                if id == IIR_THRE {
                    self.thre_pending.set(false);
                    self.update_irq();
                }
                let fifo = if self.fcr & FCR_FIFO_ENABLE != 0 {
                    IIR_FIFO_ENABLED
                } else {
                    0
                };
                fifo | id
            }
            REG_LCR => self.lcr,
            REG_MCR => self.mcr,
            REG_LSR => LSR_THRE | LSR_TEMT,
            REG_MSR => MSR_DEFAULT,
            REG_SCR => self.scr,
            _ => 0,
        }
    }

    fn write_reg(&mut self, reg: u64, value: u8) {
        match reg {
            REG_RBR_THR if self.dlab() => {
                self.divisor = (self.divisor & 0xFF00) | value as u16;
            }
            REG_RBR_THR => {
                self.backend.write(&[value]);
                self.thre_pending.set(true);
            }
            REG_IER if self.dlab() => {
                self.divisor = (self.divisor & 0x00FF) | ((value as u16) << 8);
            }
            REG_IER => {
                let enabling = value & IER_ETBEI != 0 && self.ier & IER_ETBEI == 0;
                self.ier = value & IER_MASK;
                if enabling {
                    self.thre_pending.set(true);
                }
            }
            REG_IIR_FCR => self.fcr = value,
            REG_LCR => self.lcr = value,
            REG_MCR => self.mcr = value,
            REG_SCR => self.scr = value,
            _ => {}
        }
        self.update_irq();
    }
}

impl crate::Peripheral for Uart16550 {
    fn read(&self, offset: u64, _size: u8) -> SimResult<u64> {
        Ok(self.read_reg(offset >> self.regshift) as u64)
    }

    fn write(&mut self, offset: u64, _size: u8, value: u64) -> SimResult<()> {
        self.write_reg(offset >> self.regshift, value as u8);
        Ok(())
    }

    fn access_sizes(&self) -> AccessSizes {
        AccessSizes::new(1, 4)
    }

    fn reset(&mut self) {
        self.ier = 0;
        self.fcr = 0;
        self.lcr = 0;
        self.mcr = 0;
        self.scr = 0;
        self.divisor = 0;
        self.thre_pending.set(false);
        self.irq.lower();
    }

    fn as_any(&self) -> Option<&dyn std::any::Any> {
        Some(self)
    }

    fn as_any_mut(&mut self) -> Option<&mut dyn std::any::Any> {
        Some(self)
    }

    fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self.state()).unwrap_or(serde_json::Value::Null)
    }

    fn restore(&mut self, state: serde_json::Value) -> SimResult<()> {
        let s: UartState = serde_json::from_value(state)
            .map_err(|e| SimulationError::Snapshot(format!("uart: {}", e)))?;
        self.ier = s.ier;
        self.fcr = s.fcr;
        self.lcr = s.lcr;
        self.mcr = s.mcr;
        self.scr = s.scr;
        self.divisor = s.divisor;
        self.thre_pending.set(s.thre_pending);
        self.update_irq();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chardev::BufferBackend;
    use crate::interrupt::Gic;
    use crate::Peripheral;

    fn setup() -> (Uart16550, BufferBackend, Arc<Gic>) {
        let capture = BufferBackend::new();
        let gic = Arc::new(Gic::new());
        let mut uart = Uart16550::new(2, Arc::new(capture.clone()));
        uart.connect_irq(gic.clone(), 4);
        (uart, capture, gic)
    }

    #[test]
    fn test_uart_transmit_reaches_backend() {
        let (mut uart, capture, _gic) = setup();
        for b in b"boot\n" {
            uart.write(0x00, 4, *b as u64).unwrap();
        }
        assert_eq!(capture.contents(), b"boot\n");
        assert_eq!(uart.read(0x14, 4).unwrap() as u8 & LSR_THRE, LSR_THRE);
    }

    #[test]
    fn test_divisor_latch_hides_data_registers() {
        let (mut uart, capture, _gic) = setup();
        uart.write(0x0C, 4, LCR_DLAB as u64).unwrap();
        uart.write(0x00, 4, 0x0D).unwrap();
        uart.write(0x04, 4, 0x01).unwrap();
        assert_eq!(uart.state().divisor, 0x010D);
        assert!(capture.contents().is_empty());

        uart.write(0x0C, 4, 0x03).unwrap();
        assert_eq!(uart.read(0x04, 4).unwrap(), 0);
    }

    #[test]
    fn test_thre_interrupt_cycle() {
        let (mut uart, _capture, gic) = setup();
        uart.write(0x04, 4, IER_ETBEI as u64).unwrap();
        assert!(gic.irq_level(4));

        // Reading IIR acknowledges the THRE interrupt
        assert_eq!(uart.read(0x08, 4).unwrap() as u8 & 0x0F, IIR_THRE);
        assert!(!gic.irq_level(4));
        assert_eq!(uart.read(0x08, 4).unwrap() as u8 & 0x0F, IIR_NO_INTERRUPT);

        uart.write(0x00, 4, b'A' as u64).unwrap();
        assert!(gic.irq_level(4));

        uart.reset();
        assert!(!gic.irq_level(4));
    }

    #[test]
    fn test_snapshot_restores_irq_level() {
        let (mut uart, _capture, _gic) = setup();
        uart.write(0x04, 4, IER_ETBEI as u64).unwrap();
        uart.write(0x1C, 4, 0x5A).unwrap();
        let saved = uart.snapshot();

        let (mut fresh, _c, gic) = setup();
        fresh.restore(saved).unwrap();
        assert_eq!(fresh.read(0x1C, 4).unwrap(), 0x5A);
        assert!(gic.irq_level(4));
    }
}
