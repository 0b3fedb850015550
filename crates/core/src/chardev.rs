// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Host-side character streams that back emulated serial ports.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

pub trait CharBackend: Debug + Send + Sync {
    fn write(&self, bytes: &[u8]);
}

/// Captures output into a shared buffer.
#[derive(Debug, Clone, Default)]
pub struct BufferBackend {
    sink: Arc<Mutex<Vec<u8>>>,
}

impl BufferBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing buffer, e.g. one also held by a test harness.
    pub fn with_sink(sink: Arc<Mutex<Vec<u8>>>) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> Arc<Mutex<Vec<u8>>> {
        self.sink.clone()
    }

    pub fn contents(&self) -> Vec<u8> {
        self.sink.lock().map(|g| g.clone()).unwrap_or_default()
    }
}

impl CharBackend for BufferBackend {
    fn write(&self, bytes: &[u8]) {
        if let Ok(mut guard) = self.sink.lock() {
            guard.extend_from_slice(bytes);
        }
    }
}

#[derive(Debug, Default)]
pub struct StdoutBackend;

impl CharBackend for StdoutBackend {
    fn write(&self, bytes: &[u8]) {
        let mut out = io::stdout().lock();
        #[allow(unused_must_use)]
        {
            out.write_all(bytes);
            out.flush();
        }
    }
}

#[derive(Debug, Default)]
pub struct NullBackend;

impl CharBackend for NullBackend {
    fn write(&self, _bytes: &[u8]) {}
}

/// Host serial ports, indexed like `-serial` arguments of a machine.
#[derive(Debug, Clone, Default)]
pub struct SerialHosts {
    ports: BTreeMap<usize, Arc<dyn CharBackend>>,
}

impl SerialHosts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, index: usize, backend: Arc<dyn CharBackend>) {
        self.ports.insert(index, backend);
    }

    pub fn with(mut self, index: usize, backend: Arc<dyn CharBackend>) -> Self {
        self.set(index, backend);
        self
    }

    pub fn get(&self, index: usize) -> Option<Arc<dyn CharBackend>> {
        self.ports.get(&index).cloned()
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }
}
