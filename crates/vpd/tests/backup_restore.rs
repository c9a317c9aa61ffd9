// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com
//
// Reconciler behavior against real (temporary) primary and backup EEPROM
// files: the full decision table, idempotence, the re-entry guard and
// twin synchronisation of single writes.

mod common;

use std::fs;
use std::io::Write;
use std::sync::Mutex;

use common::build_ipz_blob;
use vpd::{
    BackupRestore, BackupRestoreConfig, BackupRestoreStatus, IpzMap, IpzParser, SystemConfig,
    WriteSelector,
};

// The reconcile status is process-wide; keep these tests from interleaving.
static STATUS_LOCK: Mutex<()> = Mutex::new(());

const DEFAULT_TM: &[u8] = b"        ";

fn eeprom_with_tm(value: &[u8], record: &str, keyword: &str) -> tempfile::NamedTempFile {
    let mut padded = [0x20u8; 8];
    padded[..value.len()].copy_from_slice(value);
    let (blob, _) = build_ipz_blob(&[(record, &[(keyword, padded.as_slice())])]);
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&blob).unwrap();
    file.flush().unwrap();
    file
}

fn parse_map(path: &std::path::Path) -> IpzMap {
    let bytes = fs::read(path).unwrap();
    let (map, invalid) = IpzParser::new(&bytes, "").parse().unwrap();
    assert!(invalid.is_empty());
    map
}

fn pair_config(src_path: &str, dst_path: &str, pel: bool) -> BackupRestoreConfig {
    serde_json::from_str(&format!(
        r#"{{
            "source":      {{ "hardwarePath": "{src_path}" }},
            "destination": {{ "hardwarePath": "{dst_path}" }},
            "type": "IPZ",
            "backupMap": [
                {{ "sourceRecord": "VSYS", "sourceKeyword": "TM",
                   "destinationRecord": "VCEN", "destinationKeyword": "FC",
                   "defaultValue": [32, 32, 32, 32, 32, 32, 32, 32],
                   "isPelRequired": {pel} }}
            ]
        }}"#
    ))
    .unwrap()
}

struct Pair {
    src_file: tempfile::NamedTempFile,
    dst_file: tempfile::NamedTempFile,
    reconciler: BackupRestore,
    src_map: IpzMap,
    dst_map: IpzMap,
}

fn setup(src_tm: &[u8], dst_fc: &[u8]) -> Pair {
    let src_file = eeprom_with_tm(src_tm, "VSYS", "TM");
    let dst_file = eeprom_with_tm(dst_fc, "VCEN", "FC");
    let cfg = pair_config(
        src_file.path().to_str().unwrap(),
        dst_file.path().to_str().unwrap(),
        true,
    );
    let src_map = parse_map(src_file.path());
    let dst_map = parse_map(dst_file.path());
    Pair {
        reconciler: BackupRestore::from_parts(SystemConfig::default(), cfg),
        src_file,
        dst_file,
        src_map,
        dst_map,
    }
}

#[test]
fn test_backup_copies_source_to_stale_destination() {
    let _guard = STATUS_LOCK.lock().unwrap();
    BackupRestore::reset_status();

    let mut pair = setup(b"9105-22A", DEFAULT_TM);
    pair.reconciler
        .backup_and_restore(&mut pair.src_map, &mut pair.dst_map)
        .unwrap();

    // Map and hardware both carry the authoritative value now.
    assert_eq!(pair.dst_map["VCEN"]["FC"], b"9105-22A".to_vec());
    assert_eq!(
        parse_map(pair.dst_file.path())["VCEN"]["FC"],
        b"9105-22A".to_vec()
    );
    assert_eq!(BackupRestore::status(), BackupRestoreStatus::Completed);
}

#[test]
fn test_restore_copies_backup_to_stale_source() {
    let _guard = STATUS_LOCK.lock().unwrap();
    BackupRestore::reset_status();

    let mut pair = setup(DEFAULT_TM, b"9786-42H");
    pair.reconciler
        .backup_and_restore(&mut pair.src_map, &mut pair.dst_map)
        .unwrap();

    assert_eq!(pair.src_map["VSYS"]["TM"], b"9786-42H".to_vec());
    assert_eq!(
        parse_map(pair.src_file.path())["VSYS"]["TM"],
        b"9786-42H".to_vec()
    );
}

#[test]
fn test_mismatch_logs_and_leaves_both_sides() {
    let _guard = STATUS_LOCK.lock().unwrap();
    BackupRestore::reset_status();

    let mut pair = setup(b"9105-22A", b"9786-42H");
    let src_before = fs::read(pair.src_file.path()).unwrap();
    let dst_before = fs::read(pair.dst_file.path()).unwrap();

    pair.reconciler
        .backup_and_restore(&mut pair.src_map, &mut pair.dst_map)
        .unwrap();

    // Source stays authoritative; neither EEPROM is rewritten.
    assert_eq!(pair.src_map["VSYS"]["TM"], b"9105-22A".to_vec());
    assert_eq!(pair.dst_map["VCEN"]["FC"], b"9786-42H".to_vec());
    assert_eq!(fs::read(pair.src_file.path()).unwrap(), src_before);
    assert_eq!(fs::read(pair.dst_file.path()).unwrap(), dst_before);
}

#[test]
fn test_both_default_performs_no_writes() {
    let _guard = STATUS_LOCK.lock().unwrap();
    BackupRestore::reset_status();

    let mut pair = setup(DEFAULT_TM, DEFAULT_TM);
    let src_before = fs::read(pair.src_file.path()).unwrap();
    let dst_before = fs::read(pair.dst_file.path()).unwrap();

    pair.reconciler
        .backup_and_restore(&mut pair.src_map, &mut pair.dst_map)
        .unwrap();

    assert_eq!(fs::read(pair.src_file.path()).unwrap(), src_before);
    assert_eq!(fs::read(pair.dst_file.path()).unwrap(), dst_before);
}

#[test]
fn test_reconcile_is_idempotent() {
    let _guard = STATUS_LOCK.lock().unwrap();

    BackupRestore::reset_status();
    let mut pair = setup(b"9105-22A", DEFAULT_TM);
    pair.reconciler
        .backup_and_restore(&mut pair.src_map, &mut pair.dst_map)
        .unwrap();

    let src_after_first = fs::read(pair.src_file.path()).unwrap();
    let dst_after_first = fs::read(pair.dst_file.path()).unwrap();
    let maps_after_first = (pair.src_map.clone(), pair.dst_map.clone());

    // Fresh process lifecycle, same (now converged) inputs: nothing moves.
    BackupRestore::reset_status();
    let mut src_map = parse_map(pair.src_file.path());
    let mut dst_map = parse_map(pair.dst_file.path());
    pair.reconciler
        .backup_and_restore(&mut src_map, &mut dst_map)
        .unwrap();

    assert_eq!(fs::read(pair.src_file.path()).unwrap(), src_after_first);
    assert_eq!(fs::read(pair.dst_file.path()).unwrap(), dst_after_first);
    assert_eq!((src_map, dst_map), maps_after_first);
}

#[test]
fn test_reentry_while_invoked_is_noop() {
    let _guard = STATUS_LOCK.lock().unwrap();
    BackupRestore::reset_status();

    let mut pair = setup(b"9105-22A", DEFAULT_TM);
    pair.reconciler
        .backup_and_restore(&mut pair.src_map, &mut pair.dst_map)
        .unwrap();
    assert_eq!(BackupRestore::status(), BackupRestoreStatus::Completed);

    // Without a reset, a second call must not undo a manual edit.
    pair.dst_map
        .get_mut("VCEN")
        .unwrap()
        .insert("FC".into(), DEFAULT_TM.to_vec());
    pair.reconciler
        .backup_and_restore(&mut pair.src_map, &mut pair.dst_map)
        .unwrap();
    assert_eq!(pair.dst_map["VCEN"]["FC"], DEFAULT_TM.to_vec());
}

#[test]
fn test_sync_write_to_twin() {
    let _guard = STATUS_LOCK.lock().unwrap();
    BackupRestore::reset_status();

    let pair = setup(b"9105-22A", b"9105-22A");
    let src_path = pair.src_file.path().to_str().unwrap().to_string();

    // A write landing on the source path replays onto the destination,
    // translated through the backup map tuple.
    let selector = WriteSelector::Ipz {
        record: "VSYS".into(),
        keyword: "TM".into(),
        value: b"9043-11B".to_vec(),
    };
    let mirrored = pair
        .reconciler
        .sync_write_to_twin(&src_path, &selector)
        .unwrap();
    assert_eq!(mirrored, Some(8));
    assert_eq!(
        parse_map(pair.dst_file.path())["VCEN"]["FC"],
        b"9043-11B".to_vec()
    );

    // A path outside the configured pair is ignored.
    let foreign = pair
        .reconciler
        .sync_write_to_twin("/some/other/eeprom", &selector)
        .unwrap();
    assert_eq!(foreign, None);

    // A tuple outside the backup map is ignored.
    let selector = WriteSelector::Ipz {
        record: "VSYS".into(),
        keyword: "SE".into(),
        value: b"1234567".to_vec(),
    };
    assert_eq!(
        pair.reconciler
            .sync_write_to_twin(&src_path, &selector)
            .unwrap(),
        None
    );
}
