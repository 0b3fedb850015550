// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! First-stage Boot ROM behaviour: pull boot0 off the boot medium into SRAM A1.

use super::memmap::A64Device;
use super::A64Soc;
use crate::block::{BlockBackend, BlockError};
use crate::KIB;

/// boot0 lives 8 KiB into the medium.
pub const BOOT0_OFFSET: u64 = 8 * KIB;
pub const BOOT0_SIZE: usize = 32 * KIB as usize;

const BOOTROM_BLOB_NAME: &str = "allwinner-a64.bootrom";

#[derive(Debug, thiserror::Error)]
pub enum BootLoadError {
    #[error("Boot device is not available")]
    Unavailable,
    #[error("Boot device too small: need {needed:#x} bytes, have {size:#x}")]
    ShortRead { needed: u64, size: u64 },
    #[error("Failed to read boot device: {0}")]
    Io(#[source] BlockError),
    #[error("No memory at {addr:#x} to hold the {len}-byte boot image")]
    NoTarget { addr: u64, len: usize },
    #[error("Boot ROM image already loaded")]
    AlreadyLoaded,
}

impl From<BlockError> for BootLoadError {
    fn from(e: BlockError) -> Self {
        match e {
            BlockError::Unavailable => BootLoadError::Unavailable,
            BlockError::OutOfRange { offset, len, size } => BootLoadError::ShortRead {
                needed: offset.saturating_add(len as u64),
                size,
            },
            other => BootLoadError::Io(other),
        }
    }
}

/// Image written back into memory on every system reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RomBlob {
    pub name: String,
    pub addr: u64,
    pub data: Vec<u8>,
}

impl A64Soc {
    /// Copy boot0 from `blk` into SRAM A1 and keep it as a ROM blob.
    ///
    /// Must run before any core fetches. On failure memory is untouched.
    pub fn bootrom_setup(&mut self, blk: &dyn BlockBackend) -> Result<(), BootLoadError> {
        if self.roms.iter().any(|r| r.name == BOOTROM_BLOB_NAME) {
            return Err(BootLoadError::AlreadyLoaded);
        }
        if !blk.is_available() {
            return Err(BootLoadError::Unavailable);
        }

        let mut buffer = vec![0u8; BOOT0_SIZE];
        blk.read_at(BOOT0_OFFSET, &mut buffer)?;

        let addr = self.memmap().base(A64Device::SramA1);
        self.bus_mut()
            .load_image(addr, &buffer)
            .map_err(|_| BootLoadError::NoTarget {
                addr,
                len: buffer.len(),
            })?;

        tracing::info!(
            "Boot ROM: loaded {:#x} bytes from offset {:#x} to {:#010x}",
            BOOT0_SIZE,
            BOOT0_OFFSET,
            addr
        );
        self.roms.push(RomBlob {
            name: BOOTROM_BLOB_NAME.to_string(),
            addr,
            data: buffer,
        });
        Ok(())
    }
}
