// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Shared data types of the VPD core.

use std::collections::BTreeMap;
use std::fmt;

/// Raw VPD bytes.
pub type Binary = Vec<u8>;

/// Keyword name to raw value, one IPZ record's worth.
pub type KeywordValueMap = BTreeMap<String, Vec<u8>>;

/// Parsed IPZ VPD: record name to keyword map. `BTreeMap` keeps iteration
/// deterministic, which the reconciler and the log output rely on.
pub type IpzMap = BTreeMap<String, KeywordValueMap>;

/// Value of one keyword in the flat (keyword / SPD) map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeywordValue {
    /// Raw bytes as stored on the module.
    Bytes(Vec<u8>),
    /// Derived integer value; only `MemorySizeInKB` uses this.
    Size(u64),
}

impl KeywordValue {
    /// Byte view of the value, `None` for integer-valued keywords.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            KeywordValue::Bytes(b) => Some(b),
            KeywordValue::Size(_) => None,
        }
    }
}

/// Parsed keyword VPD / SPD: flat keyword to value map.
pub type KeywordMap = BTreeMap<String, KeywordValue>;

/// Classification of a raw VPD buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VpdKind {
    IpzVpd,
    KeywordVpd,
    Ddr4Ddimm,
    Ddr5Ddimm,
    Ddr4Isdimm,
    Ddr5Isdimm,
    Invalid,
}

impl fmt::Display for VpdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VpdKind::IpzVpd => "IPZ",
            VpdKind::KeywordVpd => "keyword",
            VpdKind::Ddr4Ddimm => "DDR4 DDIMM",
            VpdKind::Ddr5Ddimm => "DDR5 DDIMM",
            VpdKind::Ddr4Isdimm => "DDR4 ISDIMM",
            VpdKind::Ddr5Isdimm => "DDR5 ISDIMM",
            VpdKind::Invalid => "invalid",
        };
        f.write_str(name)
    }
}

/// Location of one record and its ECC block, as advertised by the VTOC
/// "PT" keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordInfo {
    pub offset: usize,
    pub length: usize,
    pub ecc_offset: usize,
    pub ecc_length: usize,
}

/// One record the IPZ parser had to skip, with the reason it was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidRecord {
    pub name: String,
    pub reason: String,
}

/// What to read: addressing differs between the nested IPZ layout and the
/// flat keyword layouts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadSelector {
    Ipz { record: String, keyword: String },
    Kwd { keyword: String },
}

/// What to write. Keyword-format writes exist in the selector so callers
/// get a typed rejection rather than a silent ignore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteSelector {
    Ipz {
        record: String,
        keyword: String,
        value: Vec<u8>,
    },
    Kwd {
        keyword: String,
        value: Vec<u8>,
    },
}

/// Result of dispatching a buffer to the matching parser.
///
/// DDIMM and ISDIMM modules produce the same flat map shape as keyword
/// VPD, so they share the `Kwd` variant. `Empty` is the neutral state the
/// reconciler uses for a side it could not parse.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedVpd {
    Empty,
    Ipz {
        map: IpzMap,
        invalid: Vec<InvalidRecord>,
    },
    Kwd(KeywordMap),
}

impl ParsedVpd {
    /// The IPZ map, if this is a clean or partially-clean IPZ parse.
    pub fn as_ipz(&self) -> Option<&IpzMap> {
        match self {
            ParsedVpd::Ipz { map, .. } => Some(map),
            _ => None,
        }
    }
}
