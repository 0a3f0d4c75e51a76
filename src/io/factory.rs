// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Module factory: format tag to unopened context.
//!
//! A pure mapping with no I/O. Registering a new format module means one
//! new match arm here plus its signature predicate in
//! [`detection`](crate::io::detection) - nothing else changes.

use std::path::Path;

use crate::core::{ExplorerError, FormatKind, Result};
use crate::io::container::Container;
use crate::io::detection;
use crate::io::formats::{CiaContext, NcchContext, NcsdContext, SaveContext, TmdContext};
use crate::io::traits::FormatContext;

/// All supported format tags, in detection priority order.
pub const SUPPORTED: [FormatKind; 5] = [
    FormatKind::RomCard,
    FormatKind::Ncch,
    FormatKind::SaveFlash,
    FormatKind::Cia,
    FormatKind::TitleMeta,
];

/// Map a format tag to a new, unopened context.
///
/// Returns `None` for [`FormatKind::Unsupported`].
pub fn create_context(kind: FormatKind) -> Option<Box<dyn FormatContext>> {
    match kind {
        FormatKind::RomCard => Some(Box::new(NcsdContext::new())),
        FormatKind::Ncch => Some(Box::new(NcchContext::new())),
        FormatKind::Cia => Some(Box::new(CiaContext::new())),
        FormatKind::SaveFlash => Some(Box::new(SaveContext::new())),
        FormatKind::TitleMeta => Some(Box::new(TmdContext::new())),
        FormatKind::Unsupported => None,
    }
}

/// Detect, build and open a context over an existing container.
///
/// Unrecognized input yields [`ExplorerError::UnsupportedFormat`];
/// recognized-but-invalid input yields the module's parse failure. The
/// two outcomes are never conflated.
pub fn open_container(container: Container) -> Result<Box<dyn FormatContext>> {
    let kind = detection::sniff_bytes(container.bytes());
    let mut context = create_context(kind).ok_or(ExplorerError::UnsupportedFormat)?;
    context.open(container)?;
    Ok(context)
}

/// Detect, build and open a context over a file on disk.
pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Box<dyn FormatContext>> {
    open_container(Container::map_file(path)?)
}

/// Detect, build and open a context over resident bytes.
pub fn open_bytes(data: Vec<u8>, origin: impl Into<String>) -> Result<Box<dyn FormatContext>> {
    open_container(Container::from_bytes(data, origin))
}

/// File-dialog filter covering every supported format, assembled from
/// the modules.
pub fn open_filter() -> String {
    let patterns: Vec<String> = SUPPORTED
        .iter()
        .map(|kind| format!("*.{}", kind.extension()))
        .collect();
    let all = patterns.join(";");
    format!("All Supported ({all})|{all}|All Files|*.*")
}
