// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! # Ctrscope
//!
//! Container inspection library for the Nintendo 3DS ("CTR") software
//! ecosystem: ROM card images, installable archives, save-data images,
//! title metadata, and the filesystems nested inside them.
//!
//! This library provides format handling organized by format:
//! - **NCSD** ROM card support in [`io::formats::ncsd`](crate::io::formats::ncsd)
//! - **NCCH** partition support in [`io::formats::ncch`](crate::io::formats::ncch)
//! - **CIA** archive support in [`io::formats::cia`](crate::io::formats::cia)
//! - **Save image** support in [`io::formats::sav`](crate::io::formats::sav)
//! - **TMD** support in [`io::formats::tmd`](crate::io::formats::tmd)
//!
//! ## Architecture
//!
//! - `io/detection.rs` - fixed-offset signature sniffing into a [`FormatKind`]
//! - `io/factory.rs` - tag to unopened context mapping, auto-detect open
//! - `io/traits.rs` - the [`FormatContext`] capability contract
//! - `io/formats/<fmt>/` - one parser (+ writer where rebuild is defined)
//!   per format
//! - `core/` - error type, tree nodes, activation keys, field records
//! - `update.rs` - fire-and-forget remote version check
//!
//! Every opened container exposes an explorer tree over its structural
//! records and, where the format defines one, a filesystem tree over
//! embedded files. Nodes carry typed [`ActivationKey`]s; activating one
//! can open a nested context over already-resident bytes or extract a
//! byte range. Formats with an inverse transform rebuild byte-exactly:
//! with zero edits, `create` reproduces the opened input.
//!
//! ## Example: Inspecting a ROM card
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use ctrscope::{open_path, FormatContext};
//!
//! let context = open_path("game.3ds")?;
//! let tree = context.explorer_tree().expect("open succeeded");
//! println!("{} ({} nodes)", tree.label, tree.count());
//! # Ok(())
//! # }
//! ```
//!
//! ## Example: Byte-exact rebuild
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use ctrscope::{open_path, FormatContext};
//!
//! let context = open_path("title.tmd")?;
//! if context.can_create() {
//!     let mut out = Vec::new();
//!     context.create(&mut out)?;
//! }
//! # Ok(())
//! # }
//! ```

// Core types
pub mod core;

// Re-export core types for convenience
pub use core::{
    ActivationKey, Endianness, ExplorerError, FieldRecord, FieldSurface, FieldTable, FormatKind,
    Node, Result, Selector,
};

// Rendering helpers
pub mod render;

// I/O layer (container, detection, factory, format modules)
pub mod io;

// Re-export key I/O types
pub use io::{
    create_context, open_bytes, open_container, open_filter, open_path, sniff_bytes, sniff_format,
    Activation, Container, FormatContext,
};

// Background version check
pub mod update;

pub use update::{spawn_version_check, RemoteVersion};
