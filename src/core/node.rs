// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Tree node and activation key types for the dual-tree structural model.
//!
//! Every opened container exposes an explorer tree (structural/header
//! records) and, where the format defines one, a filesystem tree (embedded
//! files and directories). Nodes carry typed [`ActivationKey`]s instead of
//! untyped tag objects, so a host can re-enter a view or activation without
//! runtime casts.

use serde::Serialize;

use super::FormatKind;

/// Discriminator for a re-enterable action on a tree node.
///
/// One closed enum across all format modules; each context answers only the
/// selectors it minted and rejects foreign ones as a contract violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Selector {
    /// Legal no-op: activation does nothing, view emits nothing.
    None,

    // NCSD ROM card
    /// NCSD header fields
    NcsdHeader,
    /// One partition-table entry; params: [partition index]
    NcsdPartition,
    /// Open a partition as a nested NCCH context; params: [partition index]
    NcsdPartitionOpen,
    /// Extract raw partition bytes; params: [partition index]
    NcsdPartitionExtract,

    // NCCH partition
    /// NCCH header fields
    NcchHeader,
    /// Plain/logo/ExeFS/RomFS region table
    NcchRegions,
    /// ExeFS header and file table
    NcchExefs,
    /// Extract one ExeFS file; params: [file index]
    NcchExefsFileExtract,

    // CIA archive
    /// CIA header fields
    CiaHeader,
    /// One archive section's span; params: [section index]
    CiaSection,
    /// Extract raw section bytes; params: [section index]
    CiaSectionExtract,
    /// Open the embedded TMD as a nested context
    CiaTitleMetaOpen,

    // Save flash image
    /// DISA header fields
    SaveDisaHeader,
    /// DISA partition table entries
    SavePartitionTable,
    /// Inner SAVE filesystem header
    SaveFsHeader,
    /// Extract one file from the SAVE filesystem; params: [file index]
    SaveFileExtract,

    // Title metadata
    /// Signature type and signature bytes
    TmdSignature,
    /// TMD header fields
    TmdHeader,
    /// One content chunk record; params: [chunk index]
    TmdChunk,
}

/// Identifies a re-enterable action bound to a tree [`Node`].
///
/// Carries the originating format, the action discriminator and its
/// parameter list, plus the label a host shows in a context menu.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivationKey {
    /// Format of the context that minted this key
    pub format: FormatKind,
    /// Which field/section/sub-structure the action addresses
    pub selector: Selector,
    /// Action parameters (indices into the parsed model)
    pub params: Vec<u64>,
    /// Menu label (e.g., "Open as NCCH", "Extract file")
    pub label: String,
}

impl ActivationKey {
    /// Create a key with no parameters.
    pub fn new(format: FormatKind, selector: Selector, label: impl Into<String>) -> Self {
        Self {
            format,
            selector,
            params: Vec::new(),
            label: label.into(),
        }
    }

    /// Set the parameter list.
    pub fn with_params(mut self, params: Vec<u64>) -> Self {
        self.params = params;
        self
    }

    /// Get parameter `i` or a bounds-style default of 0.
    pub fn param(&self, i: usize) -> u64 {
        self.params.get(i).copied().unwrap_or(0)
    }
}

/// An element of exactly one of the two trees.
///
/// Child order is structurally meaningful: it mirrors on-disk layout.
/// A node with no keys is inert (pure navigation).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    /// Display label
    pub label: String,
    /// Re-enterable actions; the first is the default
    pub keys: Vec<ActivationKey>,
    /// Ordered children
    pub children: Vec<Node>,
}

impl Node {
    /// Create an inert node.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            keys: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Attach a key (builder style).
    pub fn with_key(mut self, key: ActivationKey) -> Self {
        self.keys.push(key);
        self
    }

    /// Attach a child (builder style).
    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// Append a child.
    pub fn push_child(&mut self, child: Node) {
        self.children.push(child);
    }

    /// The designated default action, if any.
    pub fn default_key(&self) -> Option<&ActivationKey> {
        self.keys.first()
    }

    /// Whether this node carries no actions.
    pub fn is_inert(&self) -> bool {
        self.keys.is_empty()
    }

    /// Total node count including this node.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Node::count).sum::<usize>()
    }

    /// Depth-first traversal over this node and all descendants.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Node)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}
