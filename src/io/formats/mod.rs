// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Format-specific context modules.
//!
//! One module per supported container format:
//! - `ncsd/` - NCSD ROM card images (.3ds/.cci)
//! - `ncch/` - NCCH partitions (.cxi/.cfa)
//! - `cia/` - CTR importable archives (.cia), rebuild-capable
//! - `sav/` - Save-data flash images (.sav), rebuild-capable
//! - `tmd/` - Title metadata records (.tmd), rebuild-capable

pub mod cia;
pub mod ncch;
pub mod ncsd;
pub mod sav;
pub mod tmd;

pub use cia::CiaContext;
pub use ncch::NcchContext;
pub use ncsd::NcsdContext;
pub use sav::SaveContext;
pub use tmd::TmdContext;
