// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! IPZ VPD parser.
//!
//! IPZ is the recursive, ECC-protected format: a fixed VHDR header points
//! at a VTOC table-of-contents record whose "PT" keyword lists every other
//! record together with its ECC block. The parser walks
//! VHDR -> VTOC -> records -> keywords and verifies the ECC of each region
//! before trusting its bytes.
//!
//! # Failure semantics
//!
//! - VHDR or VTOC damage is fatal: the whole parse fails.
//! - A damaged record is skipped: it lands in the invalid-record list and
//!   the remaining records still parse.
//! - One-bit ECC corrections are transparent: the corrected bytes are the
//!   ones parsed, and the record is NOT considered invalid.

use std::path::PathBuf;

use vpd_ecc::EccStatus;

use crate::constants::{
    IPZ_MIN_SIZE, KW_NAME_LEN, LAST_KW, POUND_KW_PREFIX, PT_ENTRY_LEN, RECORD_HEADER_LEN,
    RECORD_NAME_LEN, VHDR_ECC_LEN, VHDR_ECC_OFFSET, VHDR_NAME_OFFSET, VHDR_RECORD_LEN,
    VHDR_RECORD_OFFSET, VTOC_ECC_LEN_OFFSET, VTOC_ECC_PTR_OFFSET, VTOC_LEN_OFFSET,
    VTOC_PTR_OFFSET,
};
use crate::dump::dump_bad_vpd;
use crate::error::{Result, VpdError};
use crate::reader::{read_u16_le, Cursor};
use crate::types::{InvalidRecord, IpzMap, KeywordValueMap, RecordInfo};

/// Parser for one IPZ blob. Borrows the bytes for the duration of the
/// parse; the emitted map owns its keyword values.
pub struct IpzParser<'a> {
    vpd: &'a [u8],
    path: String,
    dump_dir: PathBuf,
}

impl<'a> IpzParser<'a> {
    /// `path` is the device path the bytes came from; it keys log messages
    /// and bad-VPD dumps. Pass an empty string for in-memory buffers, which
    /// also disables dumping.
    pub fn new(vpd: &'a [u8], path: &str) -> Self {
        IpzParser {
            vpd,
            path: path.to_string(),
            dump_dir: PathBuf::from(crate::constants::BAD_VPD_DIR),
        }
    }

    /// Redirect bad-VPD dumps away from the default side directory.
    pub fn with_dump_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dump_dir = dir.into();
        self
    }

    /// Parse the whole blob.
    ///
    /// # Returns
    ///
    /// The record map plus the list of records that failed their ECC or
    /// structural checks and were left out of the map.
    ///
    /// # Errors
    ///
    /// Fatal only when the VHDR or VTOC region is malformed or fails its
    /// ECC check uncorrectably.
    pub fn parse(&self) -> Result<(IpzMap, Vec<InvalidRecord>)> {
        let mut work = self.vpd.to_vec();

        self.check_header(&mut work)?;
        let pt = self.check_toc(&mut work)?;
        let (records, mut invalid) = self.scan_pt(&mut work, &pt)?;

        let mut map = IpzMap::new();
        for (pt_name, offset) in records {
            match parse_record(&work, offset) {
                Ok((name, keywords)) => {
                    map.entry(name).or_insert(keywords);
                }
                Err(e) => {
                    log::warn!("[ipz] skipping record {pt_name} on {}: {e}", self.path);
                    invalid.push(InvalidRecord {
                        name: pt_name,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if !invalid.is_empty() {
            self.report_invalid(&invalid);
        }

        Ok((map, invalid))
    }

    /// Second walk from the VTOC "PT" keyword straight to one keyword's
    /// value, without exhaustive parsing and without ECC verification.
    pub fn read_keyword_from_record(&self, record: &str, keyword: &str) -> Result<Vec<u8>> {
        let info = record_details_in(self.vpd, record)?;
        let (offset, length) = find_keyword(self.vpd, info.offset, record, keyword)?;
        Ok(self.vpd[offset..offset + length].to_vec())
    }

    /// Locate `record` through the VTOC table of contents.
    pub fn record_details(&self, record: &str) -> Result<RecordInfo> {
        record_details_in(self.vpd, record)
    }

    fn check_header(&self, work: &mut [u8]) -> Result<()> {
        if work.len() < IPZ_MIN_SIZE {
            return Err(VpdError::MalformedVpd(
                "buffer smaller than minimum IPZ size".into(),
            ));
        }

        if &work[VHDR_NAME_OFFSET..VHDR_NAME_OFFSET + RECORD_NAME_LEN] != b"VHDR" {
            return Err(VpdError::MalformedVpd("VHDR record not found".into()));
        }

        let status = ecc_check_region(
            work,
            "VHDR",
            VHDR_RECORD_OFFSET,
            VHDR_RECORD_LEN,
            VHDR_ECC_OFFSET,
            VHDR_ECC_LEN,
        )?;
        if status == EccStatus::Corrected {
            log::info!("[ipz] one bit correction performed for VHDR on {}", self.path);
        }
        Ok(())
    }

    /// Verify the VTOC record and return its "PT" keyword value.
    fn check_toc(&self, work: &mut [u8]) -> Result<Vec<u8>> {
        let vtoc_offset = read_u16_le(&work[VTOC_PTR_OFFSET..]) as usize;
        let vtoc_length = read_u16_le(&work[VTOC_LEN_OFFSET..]) as usize;
        let ecc_offset = read_u16_le(&work[VTOC_ECC_PTR_OFFSET..]) as usize;
        let ecc_length = read_u16_le(&work[VTOC_ECC_LEN_OFFSET..]) as usize;

        let name = record_name_at(work, vtoc_offset)?;
        if name != "VTOC" {
            return Err(VpdError::MalformedVpd("VTOC record not found".into()));
        }

        let status = ecc_check_region(
            work,
            "VTOC",
            vtoc_offset,
            vtoc_length,
            ecc_offset,
            ecc_length,
        )?;
        if status == EccStatus::Corrected {
            log::info!("[ipz] one bit correction performed for VTOC on {}", self.path);
        }

        let (offset, length) = find_keyword(work, vtoc_offset, "VTOC", "PT")?;
        Ok(work[offset..offset + length].to_vec())
    }

    /// Walk the PT entries, ECC-checking each referenced record region.
    /// Records that fail go to the invalid list; the walk continues.
    fn scan_pt(
        &self,
        work: &mut [u8],
        pt: &[u8],
    ) -> Result<(Vec<(String, usize)>, Vec<InvalidRecord>)> {
        if pt.len() % PT_ENTRY_LEN != 0 {
            return Err(VpdError::MalformedVpd(format!(
                "PT keyword length {} is not a multiple of {PT_ENTRY_LEN}",
                pt.len()
            )));
        }

        let mut records = Vec::new();
        let mut invalid = Vec::new();

        for entry in pt.chunks_exact(PT_ENTRY_LEN) {
            let name = match ascii_name(&entry[..RECORD_NAME_LEN]) {
                Ok(name) => name,
                Err(e) => {
                    invalid.push(InvalidRecord {
                        name: "????".into(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };
            let offset = read_u16_le(&entry[6..]) as usize;
            let length = read_u16_le(&entry[8..]) as usize;
            let ecc_offset = read_u16_le(&entry[10..]) as usize;
            let ecc_length = read_u16_le(&entry[12..]) as usize;

            match check_record_entry(work, &name, offset, length, ecc_offset, ecc_length) {
                Ok(EccStatus::Corrected) => {
                    log::info!(
                        "[ipz] one bit correction performed for record {name} on {}",
                        self.path
                    );
                    records.push((name, offset));
                }
                Ok(_) => records.push((name, offset)),
                Err(e) => {
                    log::warn!("[ipz] record {name} failed checks on {}: {e}", self.path);
                    invalid.push(InvalidRecord {
                        name,
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok((records, invalid))
    }

    fn report_invalid(&self, invalid: &[InvalidRecord]) {
        let summary: Vec<String> = invalid
            .iter()
            .map(|r| format!("{{{},{}}}", r.name, r.reason))
            .collect();
        log::warn!(
            "[ipz] check failed for record(s) [{}] while parsing {}; re-program VPD",
            summary.join(","),
            self.path
        );

        if self.path.is_empty() {
            return;
        }
        match dump_bad_vpd(&self.path, self.vpd, &self.dump_dir) {
            Ok(target) => {
                log::warn!("[ipz] offending blob dumped to {}", target.display());
            }
            Err(e) => {
                log::warn!("[ipz] failed to dump bad VPD for {}: {e}", self.path);
            }
        }
    }
}

/// ECC-check `[data_offset, data_offset + data_length)` against its ECC
/// block, both inside `work`. On a one-bit correction the corrected bytes
/// are written back so downstream parsing sees them.
fn ecc_check_region(
    work: &mut [u8],
    what: &str,
    data_offset: usize,
    data_length: usize,
    ecc_offset: usize,
    ecc_length: usize,
) -> Result<EccStatus> {
    let data_end = data_offset
        .checked_add(data_length)
        .ok_or(VpdError::TruncatedVpd)?;
    let ecc_end = ecc_offset
        .checked_add(ecc_length)
        .ok_or(VpdError::TruncatedVpd)?;
    if data_end > work.len() || ecc_end > work.len() {
        return Err(VpdError::TruncatedVpd);
    }

    // Scratch copy so an uncorrectable region never half-mutates the
    // working buffer.
    let mut scratch = work[data_offset..data_end].to_vec();
    let ecc = work[ecc_offset..ecc_end].to_vec();

    match vpd_ecc::check_and_correct(&mut scratch, &ecc) {
        Ok(EccStatus::Ok) => Ok(EccStatus::Ok),
        Ok(EccStatus::Corrected) => {
            work[data_offset..data_end].copy_from_slice(&scratch);
            Ok(EccStatus::Corrected)
        }
        Ok(EccStatus::Uncorrectable) => {
            Err(VpdError::EccUncorrectable(format!("{what} region")))
        }
        Err(e) => Err(VpdError::MalformedVpd(format!("{what} ECC block unusable: {e}"))),
    }
}

fn check_record_entry(
    work: &mut [u8],
    name: &str,
    offset: usize,
    length: usize,
    ecc_offset: usize,
    ecc_length: usize,
) -> Result<EccStatus> {
    if offset == 0 || length == 0 {
        return Err(VpdError::DataException(
            "invalid record offset or length".into(),
        ));
    }
    if ecc_offset == 0 || ecc_length == 0 {
        return Err(VpdError::MalformedVpd("invalid ECC offset or length".into()));
    }
    ecc_check_region(work, name, offset, length, ecc_offset, ecc_length)
}

fn ascii_name(bytes: &[u8]) -> Result<String> {
    if !bytes.is_ascii() {
        return Err(VpdError::MalformedVpd("name is not ASCII".into()));
    }
    // is_ascii() implies valid UTF-8.
    Ok(String::from_utf8_lossy(bytes).into_owned())
}

/// Record name, 4 ASCII bytes behind the record header.
fn record_name_at(work: &[u8], record_offset: usize) -> Result<String> {
    let start = record_offset
        .checked_add(RECORD_HEADER_LEN)
        .ok_or(VpdError::TruncatedVpd)?;
    let bytes = work
        .get(start..start + RECORD_NAME_LEN)
        .ok_or(VpdError::TruncatedVpd)?;
    ascii_name(bytes)
}

fn parse_record(work: &[u8], record_offset: usize) -> Result<(String, KeywordValueMap)> {
    let name = record_name_at(work, record_offset)?;
    let keywords = parse_keywords(work, record_offset + RECORD_HEADER_LEN + RECORD_NAME_LEN)?;
    Ok((name, keywords))
}

/// Walk one record's keyword stream until the "PF" sentinel.
///
/// Keywords whose name starts with '#' carry a 2-byte little-endian size;
/// everything else a 1-byte size. A duplicate keyword makes the whole
/// record invalid: last-wins would silently hide reprogrammed data.
fn parse_keywords(work: &[u8], start: usize) -> Result<KeywordValueMap> {
    let mut cur = Cursor::new(work);
    cur.seek(start)?;

    let mut map = KeywordValueMap::new();
    loop {
        let name_bytes = cur.take(KW_NAME_LEN)?;
        let name = ascii_name(name_bytes)?;
        if name == LAST_KW {
            break;
        }

        let length = if name_bytes[0] == POUND_KW_PREFIX {
            cur.read_u16_le()? as usize
        } else {
            cur.read_u8()? as usize
        };
        let value = cur.take(length)?.to_vec();

        if map.insert(name.clone(), value).is_some() {
            return Err(VpdError::MalformedVpd(format!(
                "duplicate keyword {name} in record"
            )));
        }
    }

    Ok(map)
}

/// Find `keyword` inside the record at `record_offset`.
///
/// # Returns
///
/// Absolute offset and length of the keyword's data bytes.
pub(crate) fn find_keyword(
    work: &[u8],
    record_offset: usize,
    record: &str,
    keyword: &str,
) -> Result<(usize, usize)> {
    let found = record_name_at(work, record_offset)?;
    if found != record {
        return Err(VpdError::MalformedVpd(format!(
            "record at offset {record_offset} is {found}, not {record}"
        )));
    }

    let mut cur = Cursor::new(work);
    cur.seek(record_offset + RECORD_HEADER_LEN + RECORD_NAME_LEN)?;

    loop {
        let name_bytes = cur.take(KW_NAME_LEN)?;
        let name = ascii_name(name_bytes)?;
        if name == LAST_KW {
            return Err(VpdError::KeywordNotFound(keyword.to_string()));
        }

        let length = if name_bytes[0] == POUND_KW_PREFIX {
            cur.read_u16_le()? as usize
        } else {
            cur.read_u8()? as usize
        };
        let offset = cur.position();
        cur.advance(length)?;

        if name == keyword {
            return Ok((offset, length));
        }
    }
}

/// Locate `record` in the VTOC "PT" keyword of `vpd`.
pub(crate) fn record_details_in(vpd: &[u8], record: &str) -> Result<RecordInfo> {
    if vpd.len() < IPZ_MIN_SIZE {
        return Err(VpdError::MalformedVpd(
            "buffer smaller than minimum IPZ size".into(),
        ));
    }

    let vtoc_offset = read_u16_le(&vpd[VTOC_PTR_OFFSET..]) as usize;
    let (pt_offset, pt_length) = find_keyword(vpd, vtoc_offset, "VTOC", "PT")?;
    let pt = &vpd[pt_offset..pt_offset + pt_length];

    for entry in pt.chunks_exact(PT_ENTRY_LEN) {
        if &entry[..RECORD_NAME_LEN] == record.as_bytes() {
            let info = RecordInfo {
                offset: read_u16_le(&entry[6..]) as usize,
                length: read_u16_le(&entry[8..]) as usize,
                ecc_offset: read_u16_le(&entry[10..]) as usize,
                ecc_length: read_u16_le(&entry[12..]) as usize,
            };
            if info.offset == 0 {
                return Err(VpdError::RecordNotFound(record.to_string()));
            }
            return Ok(info);
        }
    }

    Err(VpdError::RecordNotFound(record.to_string()))
}
