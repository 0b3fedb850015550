// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Random-access block storage used as a boot medium.

use memmap2::Mmap;
use std::fmt::Debug;
use std::fs::File;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum BlockError {
    #[error("Block device is not available")]
    Unavailable,
    #[error("Read of {len} bytes at offset {offset:#x} runs past end of device ({size:#x} bytes)")]
    OutOfRange { offset: u64, len: usize, size: u64 },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub trait BlockBackend: Debug {
    /// Whether media is present and ready to be read.
    fn is_available(&self) -> bool;

    fn size(&self) -> u64;

    /// Fill `buf` from byte `offset`. A read that cannot be satisfied in full
    /// fails without partial results.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<(), BlockError>;
}

fn copy_range(data: &[u8], offset: u64, buf: &mut [u8]) -> Result<(), BlockError> {
    let size = data.len() as u64;
    let end = offset.checked_add(buf.len() as u64);
    match end {
        Some(end) if end <= size => {
            buf.copy_from_slice(&data[offset as usize..end as usize]);
            Ok(())
        }
        _ => Err(BlockError::OutOfRange {
            offset,
            len: buf.len(),
            size,
        }),
    }
}

/// Block device held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlockDevice {
    data: Vec<u8>,
    available: bool,
}

impl MemoryBlockDevice {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            available: true,
        }
    }

    /// A drive with no media inserted.
    pub fn ejected() -> Self {
        Self::default()
    }
}

impl BlockBackend for MemoryBlockDevice {
    fn is_available(&self) -> bool {
        self.available
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<(), BlockError> {
        if !self.available {
            return Err(BlockError::Unavailable);
        }
        copy_range(&self.data, offset, buf)
    }
}

/// Read-only disk image mapped from a host file.
#[derive(Debug)]
pub struct MmapBlockDevice {
    path: PathBuf,
    // Zero-length files cannot be mapped.
    map: Option<Mmap>,
}

impl MmapBlockDevice {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, BlockError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let map = if file.metadata()?.len() == 0 {
            None
        } else {
            // The image is treated as immutable for the lifetime of the map.
            Some(unsafe { Mmap::map(&file)? })
        };
        tracing::info!("Block: mapped '{}'", path.display());
        Ok(Self { path, map })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BlockBackend for MmapBlockDevice {
    fn is_available(&self) -> bool {
        true
    }

    fn size(&self) -> u64 {
        self.map.as_ref().map(|m| m.len() as u64).unwrap_or(0)
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<(), BlockError> {
        let data: &[u8] = self.map.as_deref().unwrap_or(&[]);
        copy_range(data, offset, buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_memory_device_reads_exact_ranges() {
        let dev = MemoryBlockDevice::new((0u8..=255).collect());
        let mut buf = [0u8; 4];
        dev.read_at(0x10, &mut buf).unwrap();
        assert_eq!(buf, [0x10, 0x11, 0x12, 0x13]);

        assert!(matches!(
            dev.read_at(0xFE, &mut buf),
            Err(BlockError::OutOfRange { size: 256, .. })
        ));
    }

    #[test]
    fn test_ejected_device_is_unavailable() {
        let dev = MemoryBlockDevice::ejected();
        assert!(!dev.is_available());
        let mut buf = [0u8; 1];
        assert!(matches!(dev.read_at(0, &mut buf), Err(BlockError::Unavailable)));
    }

    #[test]
    fn test_mmap_device_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"\x00\x01sd-card").unwrap();
        file.flush().unwrap();

        let dev = MmapBlockDevice::open(file.path()).unwrap();
        assert_eq!(dev.size(), 9);
        let mut buf = [0u8; 7];
        dev.read_at(2, &mut buf).unwrap();
        assert_eq!(&buf, b"sd-card");
    }

    #[test]
    fn test_mmap_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let dev = MmapBlockDevice::open(file.path()).unwrap();
        assert_eq!(dev.size(), 0);
        let mut buf = [0u8; 1];
        assert!(dev.read_at(0, &mut buf).is_err());
        assert!(dev.read_at(0, &mut []).is_ok());
    }
}
