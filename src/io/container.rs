// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Owned byte sources for containers.
//!
//! A [`Container`] is the opened byte source a context exclusively owns for
//! its lifetime. Top-level opens memory-map the file; nested sub-contexts
//! hold resident copies of the parent's bytes, so activating a nested
//! region never re-reads the outer file.

use std::fs::File;
use std::path::Path;

use crate::core::{ExplorerError, Result};

enum ContainerData {
    /// Memory-mapped file (top-level opens)
    Mapped(memmap2::Mmap),
    /// Resident bytes (nested sub-ranges, tests)
    Resident(Vec<u8>),
}

impl std::fmt::Debug for ContainerData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContainerData::Mapped(m) => write!(f, "Mapped({} bytes)", m.len()),
            ContainerData::Resident(v) => write!(f, "Resident({} bytes)", v.len()),
        }
    }
}

/// An opened, seekable byte source plus an origin label.
#[derive(Debug)]
pub struct Container {
    data: ContainerData,
    origin: String,
}

impl Container {
    /// Memory-map a file.
    pub fn map_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let origin = path_ref.to_string_lossy().to_string();

        let file = File::open(path_ref)
            .map_err(|e| ExplorerError::io(format!("Failed to open {origin}: {e}")))?;

        let mmap = unsafe { memmap2::Mmap::map(&file) }
            .map_err(|e| ExplorerError::io(format!("Failed to mmap {origin}: {e}")))?;

        Ok(Self {
            data: ContainerData::Mapped(mmap),
            origin,
        })
    }

    /// Wrap resident bytes (nested sub-ranges and tests).
    pub fn from_bytes(data: Vec<u8>, origin: impl Into<String>) -> Self {
        Self {
            data: ContainerData::Resident(data),
            origin: origin.into(),
        }
    }

    /// All bytes of the container.
    pub fn bytes(&self) -> &[u8] {
        match &self.data {
            ContainerData::Mapped(m) => m,
            ContainerData::Resident(v) => v,
        }
    }

    /// Container length in bytes.
    pub fn len(&self) -> u64 {
        self.bytes().len() as u64
    }

    /// Whether the container is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes().is_empty()
    }

    /// Origin label (path for mapped files, derived label for sub-ranges).
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Bounds-checked slice.
    pub fn slice(&self, offset: u64, len: u64) -> Result<&[u8]> {
        let total = self.len();
        let end = offset
            .checked_add(len)
            .ok_or_else(|| ExplorerError::bounds(len, total, offset))?;
        if end > total {
            return Err(ExplorerError::bounds(len, total, offset));
        }
        Ok(&self.bytes()[offset as usize..end as usize])
    }

    /// New resident container over a sub-range of this one.
    ///
    /// The copy is independent: the child can be parsed or discarded
    /// without affecting this container.
    pub fn sub_container(&self, offset: u64, len: u64, label: &str) -> Result<Container> {
        let data = self.slice(offset, len)?.to_vec();
        Ok(Container::from_bytes(
            data,
            format!("{}:{label}", self.origin),
        ))
    }
}
