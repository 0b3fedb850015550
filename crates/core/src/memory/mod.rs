// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

/// A simple flat memory storage
#[derive(Debug)]
pub struct LinearMemory {
    pub data: Vec<u8>,
    pub base_addr: u64,
}

impl LinearMemory {
    pub fn new(size: usize, base_addr: u64) -> Self {
        Self {
            data: vec![0; size],
            base_addr,
        }
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Whether `[addr, addr + len)` lies entirely inside this memory.
    pub fn contains_range(&self, addr: u64, len: u64) -> bool {
        let mem_end = self.base_addr + self.size();
        match addr.checked_add(len) {
            Some(end) => addr >= self.base_addr && end <= mem_end,
            None => false,
        }
    }

    /// Little-endian read of `size` bytes.
    pub fn read(&self, addr: u64, size: u8) -> Option<u64> {
        if size > 8 || !self.contains_range(addr, size as u64) {
            return None;
        }
        let offset = (addr - self.base_addr) as usize;
        let mut bytes = [0u8; 8];
        bytes[..size as usize].copy_from_slice(&self.data[offset..offset + size as usize]);
        Some(u64::from_le_bytes(bytes))
    }

    /// Little-endian write of the low `size` bytes of `value`.
    pub fn write(&mut self, addr: u64, size: u8, value: u64) -> bool {
        if size > 8 || !self.contains_range(addr, size as u64) {
            return false;
        }
        let offset = (addr - self.base_addr) as usize;
        let bytes = value.to_le_bytes();
        self.data[offset..offset + size as usize].copy_from_slice(&bytes[..size as usize]);
        true
    }

    pub fn read_u8(&self, addr: u64) -> Option<u8> {
        self.read(addr, 1).map(|v| v as u8)
    }

    pub fn write_u8(&mut self, addr: u64, value: u8) -> bool {
        self.write(addr, 1, value as u64)
    }

    /// Copies `data` in at `addr`. Nothing is written unless all of it fits.
    pub fn load(&mut self, addr: u64, data: &[u8]) -> bool {
        if !self.contains_range(addr, data.len() as u64) {
            return false;
        }
        let offset = (addr - self.base_addr) as usize;
        self.data[offset..offset + data.len()].copy_from_slice(data);
        true
    }

    pub fn slice(&self, addr: u64, len: usize) -> Option<&[u8]> {
        if !self.contains_range(addr, len as u64) {
            return None;
        }
        let offset = (addr - self.base_addr) as usize;
        Some(&self.data[offset..offset + len])
    }
}
