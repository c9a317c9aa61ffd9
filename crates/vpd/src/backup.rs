// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Backup-restore reconciler.
//!
//! A handful of system keywords (machine type, feature code, serial
//! number, ...) live on two EEPROMs at once: the primary FRU and a backup
//! FRU. After both sides are parsed, the reconciler walks the configured
//! keyword tuples and decides per tuple which side is stale, copying the
//! authoritative value across and keeping the in-memory maps in sync with
//! what landed on hardware.
//!
//! Decision table per tuple (`default` is the configured unprogrammed
//! value):
//!
//! | source     | destination | action                                   |
//! |------------|-------------|------------------------------------------|
//! | default    | default     | log when `isPelRequired`; no write       |
//! | default    | programmed  | copy destination -> source (restore)     |
//! | programmed | default     | copy source -> destination (backup)      |
//! | programmed | same value  | no-op                                    |
//! | programmed | differs     | log mismatch; source stays authoritative |
//!
//! Running the reconcile twice with unchanged inputs performs no writes
//! the second time. A process-wide status guards re-entry:
//! `NotStarted -> Invoked -> Completed`, monotone.

use std::sync::atomic::{AtomicU8, Ordering};

use crate::config::{BackupRestoreConfig, SystemConfig};
use crate::error::{Result, VpdError};
use crate::facade;
use crate::types::{IpzMap, WriteSelector};

static BACKUP_RESTORE_STATUS: AtomicU8 = AtomicU8::new(0);

/// Process-wide reconcile lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BackupRestoreStatus {
    NotStarted,
    Invoked,
    Completed,
}

impl BackupRestoreStatus {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => BackupRestoreStatus::NotStarted,
            1 => BackupRestoreStatus::Invoked,
            _ => BackupRestoreStatus::Completed,
        }
    }
}

/// Reconciler for one configured primary/backup EEPROM pair.
pub struct BackupRestore {
    sys: SystemConfig,
    cfg: BackupRestoreConfig,
}

impl BackupRestore {
    /// Build from the system config, loading the backup-restore document
    /// it points at.
    ///
    /// # Errors
    ///
    /// `VpdError::Json` when the referenced document cannot be read or
    /// parsed. A system config without a `backupRestoreConfigPath` yields
    /// a reconciler that no-ops.
    pub fn new(sys: &SystemConfig) -> Result<Self> {
        let cfg = match sys.backup_restore_config_path.as_deref() {
            Some(path) if !path.is_empty() => BackupRestoreConfig::load(path)?,
            _ => BackupRestoreConfig::default(),
        };
        Ok(BackupRestore {
            sys: sys.clone(),
            cfg,
        })
    }

    /// Build from already-loaded configuration documents.
    pub fn from_parts(sys: SystemConfig, cfg: BackupRestoreConfig) -> Self {
        BackupRestore { sys, cfg }
    }

    /// Current process-wide status.
    pub fn status() -> BackupRestoreStatus {
        BackupRestoreStatus::from_u8(BACKUP_RESTORE_STATUS.load(Ordering::SeqCst))
    }

    /// Reset the status to `NotStarted`. Only valid at process start (or
    /// between tests); never mid-run.
    pub fn reset_status() {
        BACKUP_RESTORE_STATUS.store(0, Ordering::SeqCst);
    }

    /// Apply the configured tuples across the two parsed maps, persisting
    /// every decision through the write facade.
    ///
    /// Re-entry while a reconcile already ran (status `Invoked` or later)
    /// is a no-op. An unusable configuration (missing `source`,
    /// `destination`, `type` or `backupMap`, or a non-IPZ `type`) logs and
    /// no-ops without failing.
    pub fn backup_and_restore(&self, src: &mut IpzMap, dst: &mut IpzMap) -> Result<()> {
        if BACKUP_RESTORE_STATUS
            .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::warn!("[backup] backup and restore invoked already");
            return Ok(());
        }

        let (Some(source), Some(destination)) = (&self.cfg.source, &self.cfg.destination) else {
            log::warn!(
                "[backup] config JSON is missing source/destination, cannot initiate backup and restore"
            );
            return Ok(());
        };
        let Some(entries) = &self.cfg.backup_map else {
            log::warn!("[backup] config JSON is missing backupMap, nothing to reconcile");
            return Ok(());
        };
        match self.cfg.vpd_type.as_deref() {
            Some("IPZ") => {}
            Some(other) => {
                log::warn!("[backup] unsupported VPD type {other}, only IPZ pairs reconcile");
                return Ok(());
            }
            None => {
                log::warn!("[backup] config JSON is missing type, nothing to reconcile");
                return Ok(());
            }
        }

        let src_path = source.hardware_path();
        let dst_path = destination.hardware_path();

        for entry in entries {
            if !entry.is_complete() {
                log::warn!(
                    "[backup] skipping incomplete backup map entry ({}:{} <-> {}:{})",
                    entry.source_record,
                    entry.source_keyword,
                    entry.destination_record,
                    entry.destination_keyword
                );
                continue;
            }

            let Some(src_val) = keyword_value(src, &entry.source_record, &entry.source_keyword)
            else {
                log::warn!(
                    "[backup] {}:{} not found in source VPD",
                    entry.source_record,
                    entry.source_keyword
                );
                continue;
            };
            let Some(dst_val) =
                keyword_value(dst, &entry.destination_record, &entry.destination_keyword)
            else {
                log::warn!(
                    "[backup] {}:{} not found in destination VPD",
                    entry.destination_record,
                    entry.destination_keyword
                );
                continue;
            };

            let default = &entry.default_value;
            if src_val != dst_val {
                if &dst_val == default {
                    // Destination unprogrammed: back up the source value.
                    self.persist(
                        dst_path,
                        &entry.destination_record,
                        &entry.destination_keyword,
                        &src_val,
                        dst,
                    );
                } else if &src_val == default {
                    // Source unprogrammed: restore it from the backup.
                    self.persist(
                        src_path,
                        &entry.source_record,
                        &entry.source_keyword,
                        &dst_val,
                        src,
                    );
                } else {
                    // Both programmed and diverged. The source stays
                    // authoritative and is published as-is.
                    log::warn!(
                        "[backup] mismatch for {}:{}, source holds {}, destination holds {}",
                        entry.source_record,
                        entry.source_keyword,
                        hex(&src_val),
                        hex(&dst_val)
                    );
                }
            } else if &src_val == default && entry.is_pel_required {
                log::warn!(
                    "[backup] default value found on both source and destination for {}:{}",
                    entry.source_record,
                    entry.source_keyword
                );
            }
        }

        BACKUP_RESTORE_STATUS.store(2, Ordering::SeqCst);
        Ok(())
    }

    /// Write one reconcile decision to hardware (when the side has a
    /// hardware path) and update the in-memory map to match. Hardware
    /// failures are logged and skip the map update so the map never
    /// claims a value the EEPROM does not hold.
    fn persist(
        &self,
        path: Option<&str>,
        record: &str,
        keyword: &str,
        value: &[u8],
        map: &mut IpzMap,
    ) {
        let update_map = |map: &mut IpzMap| {
            if let Some(keywords) = map.get_mut(record) {
                keywords.insert(keyword.to_string(), value.to_vec());
            }
        };

        match path {
            Some(path) => {
                let selector = WriteSelector::Ipz {
                    record: record.to_string(),
                    keyword: keyword.to_string(),
                    value: value.to_vec(),
                };
                match facade::write_keyword(path, &selector, Some(&self.sys)) {
                    Ok(n) if n > 0 => update_map(map),
                    Ok(_) => {}
                    Err(e) => {
                        log::warn!("[backup] failed to update {record}:{keyword} on {path}: {e}")
                    }
                }
            }
            None => {
                // Map-only reconcile for sides without a hardware path.
                update_map(map);
            }
        }
    }

    /// Replay a keyword write that landed on one side of the pair onto
    /// the twin EEPROM, so primary and backup stay coherent outside full
    /// reconciles.
    ///
    /// # Returns
    ///
    /// Bytes written on the twin, or `None` when `path` is not part of
    /// the configured pair or the tuple is not in the backup map.
    pub fn sync_write_to_twin(
        &self,
        path: &str,
        selector: &WriteSelector,
    ) -> Result<Option<usize>> {
        if path.is_empty() {
            return Err(VpdError::InvalidArgument("FRU path is empty".into()));
        }
        let WriteSelector::Ipz {
            record,
            keyword,
            value,
        } = selector
        else {
            // Only IPZ pairs carry a backup map.
            return Ok(None);
        };
        if record.is_empty() || keyword.is_empty() || value.is_empty() {
            return Err(VpdError::InvalidArgument(
                "record, keyword and value must be non-empty".into(),
            ));
        }

        let src_path = self.cfg.source.as_ref().and_then(|s| s.hardware_path());
        let dst_path = self.cfg.destination.as_ref().and_then(|d| d.hardware_path());
        let (is_source_side, twin) = match (src_path, dst_path) {
            (Some(src), Some(dst)) if src == path => (true, dst),
            (Some(src), Some(dst)) if dst == path => (false, src),
            _ => return Ok(None),
        };

        let Some(entries) = &self.cfg.backup_map else {
            return Ok(None);
        };
        for entry in entries {
            if !entry.is_complete() {
                log::warn!("[backup] invalid backup map entry found, skipping");
                continue;
            }
            let matches = if is_source_side {
                entry.source_record == *record && entry.source_keyword == *keyword
            } else {
                entry.destination_record == *record && entry.destination_keyword == *keyword
            };
            if !matches {
                continue;
            }

            let (twin_record, twin_keyword) = if is_source_side {
                (&entry.destination_record, &entry.destination_keyword)
            } else {
                (&entry.source_record, &entry.source_keyword)
            };
            let twin_selector = WriteSelector::Ipz {
                record: twin_record.clone(),
                keyword: twin_keyword.clone(),
                value: value.clone(),
            };
            return facade::write_keyword(twin, &twin_selector, Some(&self.sys)).map(Some);
        }

        Ok(None)
    }
}

fn keyword_value(map: &IpzMap, record: &str, keyword: &str) -> Option<Vec<u8>> {
    map.get(record)?.get(keyword).cloned()
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackupEntry;
    use std::sync::Mutex;

    // The status flag is process-wide; serialize the tests that poke it.
    static STATUS_LOCK: Mutex<()> = Mutex::new(());

    fn entry(default: &[u8], pel: bool) -> BackupEntry {
        BackupEntry {
            source_record: "VSYS".into(),
            source_keyword: "TM".into(),
            destination_record: "VCEN".into(),
            destination_keyword: "FC".into(),
            default_value: default.to_vec(),
            is_pel_required: pel,
        }
    }

    fn cfg(entries: Vec<BackupEntry>) -> BackupRestoreConfig {
        serde_json::from_str::<BackupRestoreConfig>(
            r#"{ "source": {}, "destination": {}, "type": "IPZ" }"#,
        )
        .map(|mut cfg| {
            cfg.backup_map = Some(entries);
            cfg
        })
        .unwrap()
    }

    fn map_with(record: &str, keyword: &str, value: &[u8]) -> IpzMap {
        let mut map = IpzMap::new();
        map.entry(record.to_string())
            .or_default()
            .insert(keyword.to_string(), value.to_vec());
        map
    }

    #[test]
    fn test_map_only_decision_table() {
        let _guard = STATUS_LOCK.lock().unwrap();
        let default = [0x20u8, 0x20];

        // Destination at default: source value is backed up.
        BackupRestore::reset_status();
        let reconciler =
            BackupRestore::from_parts(SystemConfig::default(), cfg(vec![entry(&default, false)]));
        let mut src = map_with("VSYS", "TM", b"9105");
        let mut dst = map_with("VCEN", "FC", &default);
        reconciler.backup_and_restore(&mut src, &mut dst).unwrap();
        assert_eq!(dst["VCEN"]["FC"], b"9105".to_vec());
        assert_eq!(src["VSYS"]["TM"], b"9105".to_vec());
        assert_eq!(BackupRestore::status(), BackupRestoreStatus::Completed);

        // Source at default: restored from the backup.
        BackupRestore::reset_status();
        let mut src = map_with("VSYS", "TM", &default);
        let mut dst = map_with("VCEN", "FC", b"9105");
        reconciler.backup_and_restore(&mut src, &mut dst).unwrap();
        assert_eq!(src["VSYS"]["TM"], b"9105".to_vec());

        // Both programmed and diverged: source stays authoritative.
        BackupRestore::reset_status();
        let mut src = map_with("VSYS", "TM", b"9105");
        let mut dst = map_with("VCEN", "FC", b"9786");
        reconciler.backup_and_restore(&mut src, &mut dst).unwrap();
        assert_eq!(src["VSYS"]["TM"], b"9105".to_vec());
        assert_eq!(dst["VCEN"]["FC"], b"9786".to_vec());

        // Both at default: no mutation either way.
        BackupRestore::reset_status();
        let mut src = map_with("VSYS", "TM", &default);
        let mut dst = map_with("VCEN", "FC", &default);
        reconciler.backup_and_restore(&mut src, &mut dst).unwrap();
        assert_eq!(src["VSYS"]["TM"], default.to_vec());
        assert_eq!(dst["VCEN"]["FC"], default.to_vec());
    }

    #[test]
    fn test_reentry_is_noop() {
        let _guard = STATUS_LOCK.lock().unwrap();
        BackupRestore::reset_status();

        let reconciler = BackupRestore::from_parts(
            SystemConfig::default(),
            cfg(vec![entry(&[0x20], false)]),
        );
        let mut src = map_with("VSYS", "TM", b"9105");
        let mut dst = map_with("VCEN", "FC", &[0x20]);
        reconciler.backup_and_restore(&mut src, &mut dst).unwrap();
        assert_eq!(dst["VCEN"]["FC"], b"9105".to_vec());

        // Second invocation must not touch the maps.
        dst.get_mut("VCEN").unwrap().insert("FC".into(), vec![0x20]);
        reconciler.backup_and_restore(&mut src, &mut dst).unwrap();
        assert_eq!(dst["VCEN"]["FC"], vec![0x20]);
    }

    #[test]
    fn test_unusable_config_noops() {
        let _guard = STATUS_LOCK.lock().unwrap();

        for json in [
            r#"{}"#,
            r#"{ "source": {}, "destination": {}, "backupMap": [] }"#,
            r#"{ "source": {}, "destination": {}, "type": "KWD", "backupMap": [] }"#,
        ] {
            BackupRestore::reset_status();
            let cfg: BackupRestoreConfig = serde_json::from_str(json).unwrap();
            let reconciler = BackupRestore::from_parts(SystemConfig::default(), cfg);
            let mut src = map_with("VSYS", "TM", b"9105");
            let mut dst = map_with("VCEN", "FC", &[0x20]);
            reconciler.backup_and_restore(&mut src, &mut dst).unwrap();
            assert_eq!(dst["VCEN"]["FC"], vec![0x20], "config {json}");
            assert_eq!(BackupRestore::status(), BackupRestoreStatus::Invoked);
        }
    }

    #[test]
    fn test_missing_record_or_keyword_skips_entry() {
        let _guard = STATUS_LOCK.lock().unwrap();
        BackupRestore::reset_status();

        let reconciler = BackupRestore::from_parts(
            SystemConfig::default(),
            cfg(vec![entry(&[0x20], true)]),
        );
        let mut src = IpzMap::new(); // no VSYS at all
        let mut dst = map_with("VCEN", "FC", &[0x20]);
        reconciler.backup_and_restore(&mut src, &mut dst).unwrap();
        assert_eq!(dst["VCEN"]["FC"], vec![0x20]);
    }
}
