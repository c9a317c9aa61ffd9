// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Keyword VPD parser.
//!
//! Wire format:
//!
//! ```text
//! 0x82 <desc_size:2 LE> <description> 0x84|0x90 <size:2 LE>
//!   { <kw_name:2> <kw_size:1> <data> }*
//! 0x79 <checksum:1> 0x78
//! ```
//!
//! The one-byte checksum is the two's complement of the unsigned byte sum
//! from the 0x84/0x90 tag up to (exclusive) the 0x79 tag.

use crate::constants::{
    KWD_ALT_PAIR_TAG, KWD_END_TAG, KWD_PAIR_END_TAG, KWD_PAIR_TAG, KWD_START_TAG, KW_NAME_LEN,
};
use crate::error::{Result, VpdError};
use crate::reader::Cursor;
use crate::types::{KeywordMap, KeywordValue};

/// Parser for one keyword-format blob.
pub struct KwdParser<'a> {
    vpd: &'a [u8],
}

impl<'a> KwdParser<'a> {
    pub fn new(vpd: &'a [u8]) -> Self {
        KwdParser { vpd }
    }

    /// Parse the blob into a flat keyword map.
    ///
    /// # Errors
    ///
    /// - `VpdError::TruncatedVpd` when any read would leave the buffer.
    /// - `VpdError::MalformedVpd` when a tag is absent or out of place.
    /// - `VpdError::DataException` on a zero-sized keyword block or a
    ///   checksum mismatch.
    pub fn parse(&self) -> Result<KeywordMap> {
        if self.vpd.is_empty() {
            return Err(VpdError::DataException(
                "keyword VPD buffer is empty".into(),
            ));
        }

        let mut cur = Cursor::new(self.vpd);
        if cur.read_u8()? != KWD_START_TAG {
            return Err(VpdError::MalformedVpd(
                "invalid large resource type identifier string".into(),
            ));
        }

        // Skip the description block.
        let desc_size = cur.read_u16_le()? as usize;
        cur.advance(desc_size)?;

        let pair_tag = cur.peek_u8()?;
        if pair_tag != KWD_PAIR_TAG && pair_tag != KWD_ALT_PAIR_TAG {
            return Err(VpdError::MalformedVpd(
                "invalid keyword VPD start tag".into(),
            ));
        }
        let checksum_start = cur.position();

        let map = self.populate_map(&mut cur)?;

        if cur.peek_u8()? != KWD_PAIR_END_TAG {
            return Err(VpdError::MalformedVpd(
                "invalid small resource type end tag".into(),
            ));
        }
        let checksum_end = cur.position();
        self.validate_checksum(checksum_start, checksum_end)?;

        cur.advance(2)?; // 0x79 and the checksum byte
        if cur.read_u8()? != KWD_END_TAG {
            return Err(VpdError::MalformedVpd("invalid small resource type".into()));
        }

        Ok(map)
    }

    /// Walk the keyword-value block, leaving the cursor on the 0x79 tag.
    fn populate_map(&self, cur: &mut Cursor<'a>) -> Result<KeywordMap> {
        cur.advance(1)?; // the 0x84/0x90 tag

        let total = cur.read_u16_le()? as usize;
        if total == 0 {
            return Err(VpdError::DataException(
                "keyword block size is 0, badly formed keyword VPD".into(),
            ));
        }

        let mut map = KeywordMap::new();
        let mut remaining = total;
        while remaining > 0 {
            let name_bytes = cur.take(KW_NAME_LEN)?;
            if !name_bytes.is_ascii() {
                return Err(VpdError::MalformedVpd("keyword name is not ASCII".into()));
            }
            let name = String::from_utf8_lossy(name_bytes).into_owned();

            let size = cur.read_u8()? as usize;
            let value = cur.take(size)?.to_vec();

            let step = KW_NAME_LEN + 1 + size;
            if step > remaining {
                return Err(VpdError::MalformedVpd(
                    "keyword pair overruns the declared block size".into(),
                ));
            }
            remaining -= step;

            map.entry(name).or_insert(KeywordValue::Bytes(value));
        }

        Ok(map)
    }

    /// Two's complement of the byte sum over `[start, end)`, compared to
    /// the byte stored right after the 0x79 tag at `end`.
    fn validate_checksum(&self, start: usize, end: usize) -> Result<()> {
        let sum = self.vpd[start..end]
            .iter()
            .fold(0u8, |acc, b| acc.wrapping_add(*b));
        let computed = sum.wrapping_neg();

        let stored = *self
            .vpd
            .get(end + 1)
            .ok_or(VpdError::TruncatedVpd)?;

        if computed != stored {
            return Err(VpdError::DataException(format!(
                "invalid checksum: stored {stored:#04x}, computed {computed:#04x}"
            )));
        }
        Ok(())
    }
}
