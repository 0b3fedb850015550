// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default schema version for YAML configs
fn default_schema_version() -> String {
    "1.0".to_string()
}

fn default_cpu_type() -> String {
    "cortex-a53".to_string()
}

fn default_smp_cpus() -> u32 {
    4
}

fn default_ram_size() -> String {
    "2GiB".to_string()
}

/// Errors found while validating a board manifest after it parsed.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ManifestError {
    #[error("Unsupported schema_version '{0}'. Supported versions: '1.0'")]
    UnsupportedSchema(String),
    #[error("Serial host index {0} is declared more than once")]
    DuplicateSerial(usize),
    #[error("Machine 'smp_cpus' must be greater than zero")]
    NoCpus,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Board {
    #[default]
    Pinephone,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct MachineSection {
    #[serde(default = "default_cpu_type")]
    pub cpu_type: String,
    #[serde(default = "default_smp_cpus")]
    pub smp_cpus: u32,
    #[serde(default = "default_ram_size")]
    pub ram_size: String, // e.g. "2GiB"
}

impl Default for MachineSection {
    fn default() -> Self {
        Self {
            cpu_type: default_cpu_type(),
            smp_cpus: default_smp_cpus(),
            ram_size: default_ram_size(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct BootSection {
    #[serde(default)]
    pub kernel: Option<PathBuf>,
    #[serde(default)]
    pub bios: Option<PathBuf>,
    /// Raw SD card image; boot0 is read from it when no kernel is given.
    #[serde(default)]
    pub sd_image: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SerialBackendKind {
    #[default]
    Stdout,
    Capture,
    Discard,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SerialBinding {
    pub index: usize,
    #[serde(default)]
    pub backend: SerialBackendKind,
}

/// Board-level manifest: which board, its machine parameters, boot media and
/// host serial ports.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BoardManifest {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    pub name: String,
    #[serde(default)]
    pub board: Board,
    #[serde(default)]
    pub machine: MachineSection,
    #[serde(default)]
    pub boot: BootSection,
    #[serde(default)]
    pub serial: Vec<SerialBinding>,
}

impl BoardManifest {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read board manifest at {:?}", path))?;
        let mut manifest = Self::from_yaml(&content)?;

        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        manifest.resolve_paths(base_dir);
        tracing::debug!("Loaded board manifest '{}' from {:?}", manifest.name, path);
        Ok(manifest)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let manifest: Self =
            serde_yaml::from_str(yaml).context("Failed to parse Board Manifest YAML")?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_version != "1.0" {
            return Err(ManifestError::UnsupportedSchema(self.schema_version.clone()).into());
        }
        if self.machine.smp_cpus == 0 {
            return Err(ManifestError::NoCpus.into());
        }

        let mut seen = std::collections::HashSet::new();
        for binding in &self.serial {
            if !seen.insert(binding.index) {
                return Err(ManifestError::DuplicateSerial(binding.index).into());
            }
        }

        if self.boot.kernel.is_some() && self.boot.sd_image.is_some() {
            tracing::warn!(
                "Board '{}': kernel given, SD image will not be used by the Boot ROM",
                self.name
            );
        }
        Ok(())
    }

    /// Size of board RAM in bytes.
    pub fn ram_size_bytes(&self) -> Result<u64> {
        parse_size(&self.machine.ram_size)
            .with_context(|| format!("Invalid machine.ram_size '{}'", self.machine.ram_size))
    }

    /// Makes relative boot media paths relative to the manifest location.
    fn resolve_paths(&mut self, base_dir: &Path) {
        for slot in [
            &mut self.boot.kernel,
            &mut self.boot.bios,
            &mut self.boot.sd_image,
        ] {
            if let Some(p) = slot.as_mut() {
                if p.is_relative() {
                    *p = base_dir.join(&*p);
                }
            }
        }
    }
}

pub fn parse_size(size_str: &str) -> Result<u64> {
    use human_size::{Byte, Size, SpecificSize};
    let s: Size = size_str
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid size format: {}", e))?;
    let bytes: SpecificSize<Byte> = s.into();
    Ok(bytes.value() as u64)
}
