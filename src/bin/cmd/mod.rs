// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! CLI subcommands.

mod extract;
mod inspect;
mod rebuild;

pub use extract::ExtractCmd;
pub use inspect::InspectCmd;
pub use rebuild::RebuildCmd;
