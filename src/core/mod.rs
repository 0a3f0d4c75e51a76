// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core types used throughout ctrscope.
//!
//! This module provides the foundational types for the library:
//! - [`ExplorerError`] - Comprehensive error handling
//! - [`FormatKind`] - Detected container format tag
//! - [`Node`] / [`ActivationKey`] - The dual-tree structural model
//! - [`FieldRecord`] / [`FieldTable`] - Field-level introspection rows

pub mod error;
pub mod field;
pub mod node;

pub use error::{ExplorerError, Result};
pub use field::{Endianness, FieldRecord, FieldSurface, FieldTable};
pub use node::{ActivationKey, Node, Selector};

use serde::Serialize;

/// Detected container format tag.
///
/// Produced only by the type sniffer ([`crate::io::detection`]); the
/// [`Unsupported`](FormatKind::Unsupported) value marks input no format
/// module claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FormatKind {
    /// NCSD ROM card image (.3ds/.cci)
    RomCard,
    /// NCCH partition (.cxi/.cfa)
    Ncch,
    /// CTR importable archive (.cia)
    Cia,
    /// Save-data flash image (.sav)
    SaveFlash,
    /// Title metadata record (.tmd)
    TitleMeta,
    /// No known signature matched
    Unsupported,
}

/// Error returned when parsing a `FormatKind` from string fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseFormatKindError {
    _private: (),
}

impl std::fmt::Display for ParseFormatKindError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid format name, expected 'rom', 'ncch', 'cia', 'sav', or 'tmd'"
        )
    }
}

impl std::error::Error for ParseFormatKindError {}

impl std::str::FromStr for FormatKind {
    type Err = ParseFormatKindError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rom" | "3ds" | "cci" | "ncsd" => Ok(FormatKind::RomCard),
            "ncch" | "cxi" | "cfa" => Ok(FormatKind::Ncch),
            "cia" => Ok(FormatKind::Cia),
            "sav" | "save" => Ok(FormatKind::SaveFlash),
            "tmd" => Ok(FormatKind::TitleMeta),
            _ => Err(ParseFormatKindError { _private: () }),
        }
    }
}

impl FormatKind {
    /// Check if the sniffer recognized the input at all.
    pub fn is_supported(&self) -> bool {
        !matches!(self, FormatKind::Unsupported)
    }

    /// Get the primary file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            FormatKind::RomCard => "3ds",
            FormatKind::Ncch => "cxi",
            FormatKind::Cia => "cia",
            FormatKind::SaveFlash => "sav",
            FormatKind::TitleMeta => "tmd",
            FormatKind::Unsupported => "",
        }
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            FormatKind::RomCard => "rom",
            FormatKind::Ncch => "ncch",
            FormatKind::Cia => "cia",
            FormatKind::SaveFlash => "sav",
            FormatKind::TitleMeta => "tmd",
            FormatKind::Unsupported => "unsupported",
        }
    }
}

impl std::fmt::Display for FormatKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatKind::RomCard => write!(f, "NCSD ROM card"),
            FormatKind::Ncch => write!(f, "NCCH partition"),
            FormatKind::Cia => write!(f, "CTR importable archive"),
            FormatKind::SaveFlash => write!(f, "Save flash image"),
            FormatKind::TitleMeta => write!(f, "Title metadata"),
            FormatKind::Unsupported => write!(f, "Unsupported"),
        }
    }
}
