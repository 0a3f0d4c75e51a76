// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! The per-format context contract.
//!
//! One [`FormatContext`] implementation exists per supported container
//! format. A context is created unopened by the module factory, parses its
//! container fully in [`open`](FormatContext::open), and then serves tree
//! navigation, field-table views, activation and (where supported)
//! byte-exact rebuild.
//!
//! # State machine
//!
//! Unopened → (open Ok) → Ready, serving every other call.
//! Unopened → (open Err) → the error value carries the failure; the
//! context retains no partial model and is simply discarded, never reused.
//! Hosts keep their previous context when a new open fails and swap only
//! on success.

use std::io::Write;

use crate::core::{ActivationKey, ExplorerError, FieldSurface, FormatKind, Node, Result};
use crate::io::container::Container;

/// Result of activating a key on a tree node.
pub enum Activation {
    /// The discriminator maps to no action.
    None,
    /// A new, independent context opened over a sub-range of the parent's
    /// resident bytes.
    Nested(Box<dyn FormatContext>),
    /// Raw bytes extracted from the container, with a suggested file name.
    Extracted {
        /// Suggested output file name
        name: String,
        /// Extracted bytes
        data: Vec<u8>,
    },
}

impl std::fmt::Debug for Activation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Activation::None => write!(f, "None"),
            Activation::Nested(ctx) => write!(f, "Nested({})", ctx.format()),
            Activation::Extracted { name, data } => {
                write!(f, "Extracted({name}, {} bytes)", data.len())
            }
        }
    }
}

/// Capability contract every format module implements.
pub trait FormatContext: Send + std::fmt::Debug {
    /// The format this context parses.
    fn format(&self) -> FormatKind;

    /// Parse the container fully, taking ownership of it.
    ///
    /// Validates structural consistency: declared sizes fit within the
    /// container, nested offsets do not overlap illegally, and digests the
    /// format mandates must match. Any violation fails the open; no
    /// partial model is retained.
    fn open(&mut self, container: Container) -> Result<()>;

    /// Root of the structural hierarchy. `Some` exactly after a
    /// successful open.
    fn explorer_tree(&self) -> Option<&Node>;

    /// Root of the embedded-filesystem hierarchy, or `None` when the
    /// format defines no filesystem (never present-but-empty).
    fn filesystem_tree(&self) -> Option<&Node>;

    /// Section headers for this format's field tables, declared once.
    /// Every emitted record's group index points into this list.
    fn section_headers(&self) -> &'static [&'static str];

    /// Whether this format defines an inverse transform. Constant per
    /// format, queryable before open.
    fn can_create(&self) -> bool {
        false
    }

    /// Rebuild a complete container into `sink`, returning bytes written.
    ///
    /// Only valid when [`can_create`](FormatContext::can_create) is true;
    /// callers must check first. Regions not owned by a parsed field are
    /// copied byte-for-byte from the original; parsed fields re-encode at
    /// their original widths and byte order; mandated digests are
    /// recomputed over the finalized bytes. With zero edits the output
    /// equals the original input exactly. On failure the sink contents
    /// are not a valid container and the caller must discard them.
    fn create(&self, _sink: &mut dyn Write) -> Result<u64> {
        Err(ExplorerError::unsupported_operation(
            "create",
            self.format(),
        ))
    }

    /// Emit the field table for `key` into the host surface.
    ///
    /// A complete replacement of the previously displayed table; no
    /// context state changes.
    fn view(&self, surface: &mut dyn FieldSurface, key: &ActivationKey) -> Result<()>;

    /// Perform the action bound to `key`.
    ///
    /// May open a nested context over resident bytes or extract a byte
    /// range; [`Selector::None`](crate::core::Selector::None) is a legal
    /// no-op.
    fn activate(&self, key: &ActivationKey) -> Result<Activation>;

    /// Save-dialog filter string for this format.
    ///
    /// An explicit capability so hosts never type-check concrete modules
    /// to choose a filter.
    fn save_filter(&self) -> &'static str;
}

/// Guard shared by the format modules: reject keys minted by a different
/// format before dispatching on the selector.
pub(crate) fn check_key(own: FormatKind, key: &ActivationKey) -> Result<()> {
    if key.format != own {
        return Err(ExplorerError::unsupported_operation(
            format!("selector {:?}", key.selector),
            own,
        ));
    }
    Ok(())
}
