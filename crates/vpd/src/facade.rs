// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Keyword read/write facade.
//!
//! Thin validation-and-dispatch layer between callers and the parsers and
//! editor. Reads address a byte buffer; writes address an EEPROM file and
//! go through the editor so the record ECC is maintained.
//!
//! Policy notes:
//! - The synthetic records `VHDR` and `VTOC` are structural; reads and
//!   writes on them are rejected.
//! - Keyword-format VPD is read-only through this facade: the layout
//!   carries a whole-blob checksum instead of per-record ECC, and the
//!   modules using it are never reprogrammed in the field.

use crate::config::SystemConfig;
use crate::editor::EepromEditor;
use crate::error::{Result, VpdError};
use crate::parser::{detect_format, DdimmParser, IpzParser, IsdimmParser, KwdParser};
use crate::types::{KeywordMap, KeywordValue, ReadSelector, VpdKind, WriteSelector};

/// Records that exist for the format's own bookkeeping and are not
/// addressable through the facade.
fn is_synthetic_record(record: &str) -> bool {
    record == "VHDR" || record == "VTOC"
}

/// Read one keyword value out of a raw VPD buffer.
///
/// IPZ reads address `(record, keyword)`; flat formats (keyword VPD,
/// DDIMM, ISDIMM) address `(keyword)` alone.
///
/// # Errors
///
/// - `VpdError::InvalidArgument` for reads on `VHDR`/`VTOC`, a selector
///   that does not match the buffer's format, or an integer-valued
///   keyword.
/// - `VpdError::RecordNotFound` / `VpdError::KeywordNotFound` for failed
///   lookups.
pub fn read_keyword(vpd: &[u8], selector: &ReadSelector) -> Result<Vec<u8>> {
    match selector {
        ReadSelector::Ipz { record, keyword } => {
            if is_synthetic_record(record) {
                log::warn!("[facade] read cannot be performed on {record} record");
                return Err(VpdError::InvalidArgument(format!(
                    "read not allowed on record {record}"
                )));
            }
            if detect_format(vpd) != VpdKind::IpzVpd {
                return Err(VpdError::InvalidArgument(
                    "record/keyword selector on a non-IPZ buffer".into(),
                ));
            }
            IpzParser::new(vpd, "").read_keyword_from_record(record, keyword)
        }
        ReadSelector::Kwd { keyword } => {
            let map = parse_flat(vpd)?;
            match map.get(keyword) {
                Some(KeywordValue::Bytes(bytes)) => Ok(bytes.clone()),
                Some(KeywordValue::Size(_)) => Err(VpdError::InvalidArgument(format!(
                    "keyword {keyword} is not byte-valued"
                ))),
                None => Err(VpdError::KeywordNotFound(keyword.clone())),
            }
        }
    }
}

fn parse_flat(vpd: &[u8]) -> Result<KeywordMap> {
    match detect_format(vpd) {
        VpdKind::KeywordVpd => KwdParser::new(vpd).parse(),
        VpdKind::Ddr4Ddimm | VpdKind::Ddr5Ddimm => DdimmParser::new(vpd).parse(),
        VpdKind::Ddr4Isdimm | VpdKind::Ddr5Isdimm => IsdimmParser::new(vpd).parse(),
        VpdKind::IpzVpd => Err(VpdError::InvalidArgument(
            "keyword selector on an IPZ buffer; address (record, keyword)".into(),
        )),
        VpdKind::Invalid => Err(VpdError::DataException(
            "unable to determine VPD format".into(),
        )),
    }
}

/// Write one keyword value to the EEPROM at `path` and keep the record
/// ECC coherent.
///
/// When `config` lists a redundant EEPROM for `path`, the write is
/// mirrored there; a mirror failure is logged and does not fail the
/// primary write.
///
/// # Returns
///
/// Number of bytes written on the primary path:
/// `min(value.len(), existing_size)`.
pub fn write_keyword(
    path: &str,
    selector: &WriteSelector,
    config: Option<&SystemConfig>,
) -> Result<usize> {
    match selector {
        WriteSelector::Ipz {
            record,
            keyword,
            value,
        } => {
            if is_synthetic_record(record) {
                log::warn!("[facade] write operation not allowed on record {record}");
                return Err(VpdError::InvalidArgument(format!(
                    "write not allowed on record {record}"
                )));
            }
            if value.is_empty() {
                return Err(VpdError::InvalidArgument(
                    "keyword value must not be empty".into(),
                ));
            }

            let offset = config.map(|c| c.vpd_offset(path)).unwrap_or(0);
            let written = EepromEditor::new(path)
                .with_start_offset(offset)
                .update_keyword(record, keyword, value)?;

            if let Some(redundant) = config.and_then(|c| c.redundant_eeprom(path)) {
                let offset = config.map(|c| c.vpd_offset(redundant)).unwrap_or(0);
                match EepromEditor::new(redundant)
                    .with_start_offset(offset)
                    .update_keyword(record, keyword, value)
                {
                    Ok(n) => log::info!(
                        "[facade] mirrored {n} bytes of {record}:{keyword} to {redundant}"
                    ),
                    Err(e) => log::warn!(
                        "[facade] failed to mirror {record}:{keyword} to {redundant}: {e}"
                    ),
                }
            }

            Ok(written)
        }
        WriteSelector::Kwd { keyword, .. } => {
            log::warn!("[facade] rejecting write of {keyword} to keyword-format VPD");
            Err(VpdError::InvalidArgument(
                "keyword-format VPD is read-only".into(),
            ))
        }
    }
}

/// Recompute and rewrite the ECC block of `record` on the EEPROM at
/// `path`, leaving the record bytes untouched.
pub fn fix_ecc(path: &str, record: &str, config: Option<&SystemConfig>) -> Result<()> {
    if is_synthetic_record(record) {
        return Err(VpdError::InvalidArgument(format!(
            "ECC fix not allowed on record {record}"
        )));
    }
    let offset = config.map(|c| c.vpd_offset(path)).unwrap_or(0);
    EepromEditor::new(path)
        .with_start_offset(offset)
        .fix_broken_ecc(record)
}
