// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Format detection integration tests.
//!
//! Tests cover:
//! - Signature detection for every supported format
//! - Detection purity: determinism, no visible read-position change
//! - Unsupported vs malformed staying distinct outcomes

mod common;

use std::fs::File;
use std::io::Read;

use common::{build_cia, build_ncch, build_ncsd, build_save, build_tmd, temp_file};
use ctrscope::{open_path, sniff_bytes, sniff_format, ExplorerError, FormatContext, FormatKind};

// ============================================================================
// Signature Detection
// ============================================================================

#[test]
fn test_detect_every_format() {
    let ncch = build_ncch("CTR-P-CTAP", &[]);
    assert_eq!(sniff_bytes(&build_ncsd(&[&ncch])), FormatKind::RomCard);
    assert_eq!(sniff_bytes(&ncch), FormatKind::Ncch);
    assert_eq!(
        sniff_bytes(&build_cia(&[1; 4], &[], &[], &[], &[])),
        FormatKind::Cia
    );
    assert_eq!(sniff_bytes(&build_save(&[])), FormatKind::SaveFlash);
    assert_eq!(sniff_bytes(&build_tmd(&[])), FormatKind::TitleMeta);
}

#[test]
fn test_random_bytes_are_unsupported() {
    // A deterministic pseudo-random pattern with no valid signature.
    let bytes: Vec<u8> = (0u32..0x400)
        .map(|i| (i.wrapping_mul(2654435761) >> 24) as u8)
        .collect();
    assert_eq!(sniff_bytes(&bytes), FormatKind::Unsupported);
}

#[test]
fn test_truncated_input_is_unsupported_not_error() {
    for len in [0, 1, 3, 0x50, 0x103] {
        assert_eq!(sniff_bytes(&vec![0u8; len]), FormatKind::Unsupported);
    }
}

// ============================================================================
// Detection Purity
// ============================================================================

#[test]
fn test_sniff_is_deterministic() {
    let bytes = build_tmd(&[(1, 0, 1, 0x100)]);
    let first = sniff_bytes(&bytes);
    for _ in 0..5 {
        assert_eq!(sniff_bytes(&bytes), first);
    }
}

#[test]
fn test_sniff_format_restores_position_on_file() {
    let data = build_save(&[("f", b"contents")]);
    let (path, _guard) = temp_file("probe.sav", &data);

    let mut file = File::open(&path).unwrap();
    let kind = sniff_format(&mut file).unwrap();
    assert_eq!(kind, FormatKind::SaveFlash);

    // A subsequent full read must see the whole file.
    let mut contents = Vec::new();
    file.read_to_end(&mut contents).unwrap();
    assert_eq!(contents, data);
}

// ============================================================================
// Unsupported vs Malformed
// ============================================================================

#[test]
fn test_unsupported_file_outcome() {
    let (path, _guard) = temp_file("garbage.bin", b"not a container at all, promise");
    let err = open_path(&path).unwrap_err();
    assert!(err.is_unsupported_format());
    assert_eq!(err.to_string(), "Format not recognized");
}

#[test]
fn test_malformed_file_outcome() {
    // Recognized NCSD signature, but the image size does not match.
    let ncch = build_ncch("CTR-P-CTAP", &[]);
    let mut data = build_ncsd(&[&ncch]);
    data.truncate(data.len() - 0x200);
    let (path, _guard) = temp_file("broken.3ds", &data);

    let err = open_path(&path).unwrap_err();
    assert!(!err.is_unsupported_format());
    assert!(matches!(err, ExplorerError::Malformed { .. }));
}

#[test]
fn test_open_path_happy_paths() {
    let fixtures: Vec<(&str, Vec<u8>, FormatKind)> = vec![
        (
            "card.3ds",
            build_ncsd(&[&build_ncch("CTR-P-CTAP", &[("icon", b"ICON")])]),
            FormatKind::RomCard,
        ),
        (
            "archive.cia",
            build_cia(&[1; 4], &[2; 8], &[], &[4; 16], &[]),
            FormatKind::Cia,
        ),
        ("save.sav", build_save(&[("game", b"data")]), FormatKind::SaveFlash),
        ("title.tmd", build_tmd(&[(1, 0, 1, 0x100)]), FormatKind::TitleMeta),
    ];

    for (name, data, expected) in fixtures {
        let (path, _guard) = temp_file(name, &data);
        let context = open_path(&path).unwrap();
        assert_eq!(context.format(), expected);
        assert!(context.explorer_tree().is_some());
    }
}
