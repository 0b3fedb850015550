// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use labwired_a64_config::{BoardManifest, SerialBackendKind};
use std::path::PathBuf;

#[test]
fn test_full_manifest_parses() {
    let yaml = r#"
schema_version: "1.0"
name: "pinephone-dev"
board: "pinephone"
machine:
  cpu_type: "cortex-a53"
  smp_cpus: 4
  ram_size: "2GiB"
boot:
  sd_image: "/images/sd.img"
serial:
  - index: 0
    backend: discard
  - index: 3
    backend: capture
"#;
    let manifest = BoardManifest::from_yaml(yaml).unwrap();
    assert_eq!(manifest.name, "pinephone-dev");
    assert_eq!(manifest.boot.sd_image, Some(PathBuf::from("/images/sd.img")));
    assert!(manifest.boot.bios.is_none());
    assert_eq!(manifest.serial.len(), 2);
    assert_eq!(manifest.serial[0].backend, SerialBackendKind::Discard);
    assert_eq!(manifest.serial[1].index, 3);
    assert_eq!(manifest.serial[1].backend, SerialBackendKind::Capture);
}

#[test]
fn test_serial_backend_defaults_to_stdout() {
    let yaml = r#"
name: "pinephone"
serial:
  - index: 3
"#;
    let manifest = BoardManifest::from_yaml(yaml).unwrap();
    assert_eq!(manifest.serial[0].backend, SerialBackendKind::Stdout);
}

#[test]
fn test_unknown_board_rejected() {
    let yaml = r#"
name: "orangepi"
board: "orangepi-pc"
"#;
    assert!(BoardManifest::from_yaml(yaml).is_err());
}

#[test]
fn test_machine_overrides_are_kept_for_board_validation() {
    // The manifest layer only parses; board constraints are enforced by the board.
    let yaml = r#"
name: "pinephone"
machine:
  cpu_type: "cortex-a7"
  ram_size: "1GiB"
"#;
    let manifest = BoardManifest::from_yaml(yaml).unwrap();
    assert_eq!(manifest.machine.cpu_type, "cortex-a7");
    assert_eq!(manifest.machine.smp_cpus, 4);
    assert_eq!(manifest.ram_size_bytes().unwrap(), 1024 * 1024 * 1024);
}
