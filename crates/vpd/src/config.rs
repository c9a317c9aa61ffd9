// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Configuration models.
//!
//! Two JSON documents drive the library: the system config, which maps
//! hardware paths to their redundant EEPROMs and VPD start offsets, and
//! the backup-restore config, which lists the keyword tuples the
//! reconciler keeps in sync between a primary and a backup EEPROM.
//!
//! Both are deserialized tolerantly: unknown fields are ignored and every
//! consumed field is optional, so a missing section degrades to a no-op
//! instead of an error.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Result, VpdError};

/// Per-FRU entry of the system config.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FruEntry {
    #[serde(rename = "inventoryPath", default)]
    pub inventory_path: Option<String>,
    /// Twin EEPROM that mirrors writes to this FRU.
    #[serde(rename = "redundantEeprom", default)]
    pub redundant_eeprom: Option<String>,
    /// Byte offset of the VPD blob within the EEPROM file.
    #[serde(default)]
    pub offset: u64,
}

/// System configuration, keyed by hardware path.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SystemConfig {
    #[serde(rename = "backupRestoreConfigPath", default)]
    pub backup_restore_config_path: Option<String>,
    #[serde(default)]
    pub frus: BTreeMap<String, Vec<FruEntry>>,
}

impl SystemConfig {
    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        read_json(path.as_ref())
    }

    fn fru(&self, hardware_path: &str) -> Option<&FruEntry> {
        self.frus.get(hardware_path).and_then(|entries| entries.first())
    }

    /// Redundant EEPROM path configured for `hardware_path`, if any.
    pub fn redundant_eeprom(&self, hardware_path: &str) -> Option<&str> {
        self.fru(hardware_path)
            .and_then(|e| e.redundant_eeprom.as_deref())
            .filter(|p| !p.is_empty())
    }

    /// VPD start offset configured for `hardware_path` (0 when absent).
    pub fn vpd_offset(&self, hardware_path: &str) -> u64 {
        self.fru(hardware_path).map(|e| e.offset).unwrap_or(0)
    }
}

/// One side (source or destination) of the backup-restore pair.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EndpointConfig {
    #[serde(rename = "hardwarePath", default)]
    pub hardware_path: Option<String>,
    #[serde(rename = "inventoryPath", default)]
    pub inventory_path: Option<String>,
}

impl EndpointConfig {
    pub fn hardware_path(&self) -> Option<&str> {
        self.hardware_path.as_deref().filter(|p| !p.is_empty())
    }
}

/// One keyword tuple the reconciler keeps in sync.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackupEntry {
    #[serde(rename = "sourceRecord", default)]
    pub source_record: String,
    #[serde(rename = "sourceKeyword", default)]
    pub source_keyword: String,
    #[serde(rename = "destinationRecord", default)]
    pub destination_record: String,
    #[serde(rename = "destinationKeyword", default)]
    pub destination_keyword: String,
    /// The "unprogrammed" value of the keyword; a side holding it is
    /// considered stale and gets overwritten from the other side.
    #[serde(rename = "defaultValue", default)]
    pub default_value: Vec<u8>,
    /// Escalate a both-sides-at-default or mismatch situation to the
    /// event log.
    #[serde(rename = "isPelRequired", default)]
    pub is_pel_required: bool,
}

impl BackupEntry {
    /// An entry with any empty name cannot be applied.
    pub fn is_complete(&self) -> bool {
        !self.source_record.is_empty()
            && !self.source_keyword.is_empty()
            && !self.destination_record.is_empty()
            && !self.destination_keyword.is_empty()
    }
}

/// Backup-restore configuration document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackupRestoreConfig {
    #[serde(default)]
    pub source: Option<EndpointConfig>,
    #[serde(default)]
    pub destination: Option<EndpointConfig>,
    /// VPD format of the pair; "IPZ" is the only supported value.
    #[serde(rename = "type", default)]
    pub vpd_type: Option<String>,
    #[serde(rename = "backupMap", default)]
    pub backup_map: Option<Vec<BackupEntry>>,
}

impl BackupRestoreConfig {
    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        read_json(path.as_ref())
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path)
        .map_err(|e| VpdError::Json(format!("cannot open {}: {e}", path.display())))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| VpdError::Json(format!("JSON parsing failed for {}: {e}", path.display())))
}
