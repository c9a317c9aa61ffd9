// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! IPZ EEPROM editor.
//!
//! The editor mutates a keyword in place on an EEPROM-backed file: it
//! snapshots the whole blob into memory, patches the keyword bytes there,
//! recomputes the enclosing record's ECC from the coherent snapshot, and
//! only then touches the stream. The keyword range is flushed before the
//! ECC range, so a write torn between the two leaves a record that
//! [`EepromEditor::fix_broken_ecc`] can repair.
//!
//! Invariants:
//! - keywords are never rearranged and a record never grows;
//! - the effective write length is `min(new_value.len(), existing_size)`;
//! - no byte outside the record region and its ECC block is modified;
//! - lookup failures leave the stream untouched.

use std::cmp;
use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, VpdError};
use crate::parser::ipz;
use crate::types::RecordInfo;

/// Editor bound to one EEPROM file.
pub struct EepromEditor {
    path: PathBuf,
    start_offset: u64,
}

impl EepromEditor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        EepromEditor {
            path: path.into(),
            start_offset: 0,
        }
    }

    /// Byte offset within the file where the VPD blob starts.
    pub fn with_start_offset(mut self, offset: u64) -> Self {
        self.start_offset = offset;
        self
    }

    /// Overwrite `keyword` in `record` with `value` and rewrite the
    /// record's ECC block.
    ///
    /// # Returns
    ///
    /// Number of keyword bytes actually written:
    /// `min(value.len(), existing_size)`. Bytes past the write length keep
    /// their previous content.
    ///
    /// # Errors
    ///
    /// `RecordNotFound` / `KeywordNotFound` when the lookup fails (stream
    /// untouched), `InvalidArgument` for an empty value, `Io` when the
    /// underlying stream fails.
    pub fn update_keyword(&self, record: &str, keyword: &str, value: &[u8]) -> Result<usize> {
        if value.is_empty() {
            return Err(VpdError::InvalidArgument(
                "keyword value must not be empty".into(),
            ));
        }

        let mut file = self.open()?;
        let mut work = self.snapshot(&mut file)?;
        let info = self.locate_record(&work, record)?;

        let (kw_offset, kw_size) = ipz::find_keyword(&work, info.offset, record, keyword)?;
        let write_len = cmp::min(value.len(), kw_size);

        // Patch the snapshot first so the ECC is computed over the exact
        // bytes the record will hold.
        work[kw_offset..kw_offset + write_len].copy_from_slice(&value[..write_len]);
        let ecc = self.record_ecc(&work, info)?;

        self.write_at(&mut file, kw_offset, &value[..write_len])?;
        self.write_at(&mut file, info.ecc_offset, &ecc)?;
        file.flush().map_err(|e| VpdError::io(&self.path, e))?;

        log::info!(
            "[editor] {write_len} bytes updated for {record}:{keyword} on {}",
            self.path.display()
        );
        Ok(write_len)
    }

    /// Recompute and rewrite only the ECC block of `record`, assuming the
    /// record bytes on the stream are authoritative.
    pub fn fix_broken_ecc(&self, record: &str) -> Result<()> {
        let mut file = self.open()?;
        let work = self.snapshot(&mut file)?;
        let info = self.locate_record(&work, record)?;

        let ecc = self.record_ecc(&work, info)?;
        self.write_at(&mut file, info.ecc_offset, &ecc)?;
        file.flush().map_err(|e| VpdError::io(&self.path, e))?;

        log::info!(
            "[editor] ECC rewritten for record {record} on {}",
            self.path.display()
        );
        Ok(())
    }

    fn open(&self) -> Result<std::fs::File> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.path)
            .map_err(|e| VpdError::io(&self.path, e))
    }

    /// Read the blob (everything past the start offset) into memory.
    fn snapshot(&self, file: &mut std::fs::File) -> Result<Vec<u8>> {
        file.seek(SeekFrom::Start(self.start_offset))
            .map_err(|e| VpdError::io(&self.path, e))?;
        let mut work = Vec::new();
        file.read_to_end(&mut work)
            .map_err(|e| VpdError::io(&self.path, e))?;
        if work.is_empty() {
            return Err(VpdError::TruncatedVpd);
        }
        Ok(work)
    }

    fn locate_record(&self, work: &[u8], record: &str) -> Result<RecordInfo> {
        let info = ipz::record_details_in(work, record)?;
        let record_end = info
            .offset
            .checked_add(info.length)
            .ok_or(VpdError::TruncatedVpd)?;
        let ecc_end = info
            .ecc_offset
            .checked_add(info.ecc_length)
            .ok_or(VpdError::TruncatedVpd)?;
        if record_end > work.len() || ecc_end > work.len() {
            return Err(VpdError::TruncatedVpd);
        }
        Ok(info)
    }

    /// ECC block over the record region of the snapshot.
    fn record_ecc(&self, work: &[u8], info: RecordInfo) -> Result<Vec<u8>> {
        let ecc = vpd_ecc::create_ecc(&work[info.offset..info.offset + info.length]);
        if ecc.len() > info.ecc_length {
            return Err(VpdError::MalformedVpd(format!(
                "advertised ECC region of {} bytes cannot hold {} ECC bytes",
                info.ecc_length,
                ecc.len()
            )));
        }
        Ok(ecc)
    }

    /// Write `bytes` at a blob-relative offset.
    fn write_at(&self, file: &mut std::fs::File, blob_offset: usize, bytes: &[u8]) -> Result<()> {
        file.seek(SeekFrom::Start(self.start_offset + blob_offset as u64))
            .map_err(|e| VpdError::io(&self.path, e))?;
        file.write_all(bytes)
            .map_err(|e| VpdError::io(&self.path, e))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
