// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const SNAPSHOT_SCHEMA_VERSION: &str = "1.0";

fn default_schema_version() -> String {
    SNAPSHOT_SCHEMA_VERSION.to_string()
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SocSnapshot {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    /// Power state per core, boot core first.
    #[serde(default)]
    pub cpu_powered: Vec<bool>,
    /// Device state keyed by bus window name.
    pub peripherals: BTreeMap<String, serde_json::Value>,
}

impl SocSnapshot {
    pub fn new(cpu_powered: Vec<bool>, peripherals: BTreeMap<String, serde_json::Value>) -> Self {
        Self {
            schema_version: default_schema_version(),
            cpu_powered,
            peripherals,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize snapshot")
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let snap: Self = serde_json::from_str(text).context("Failed to parse snapshot")?;
        if snap.schema_version != SNAPSHOT_SCHEMA_VERSION {
            anyhow::bail!(
                "Unsupported snapshot schema version '{}' (expected '{}')",
                snap.schema_version,
                SNAPSHOT_SCHEMA_VERSION
            );
        }
        Ok(snap)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?)
            .with_context(|| format!("Failed to write snapshot {}", path.display()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
        Self::from_json(&text)
    }
}
