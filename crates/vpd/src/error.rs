// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types for the VPD library.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, VpdError>;

/// Typed failures surfaced by the VPD core.
///
/// Per-record parse failures do NOT appear here: the IPZ parser collects
/// them in its invalid-record list and returns the partial map alongside.
/// Everything below terminates the operation that raised it.
#[derive(Debug)]
pub enum VpdError {
    /// A read would run past the end of the buffer.
    TruncatedVpd,
    /// A required tag or sentinel is absent or out of place.
    MalformedVpd(String),
    /// ECC check determined the region cannot be corrected. Fatal for the
    /// VHDR and VTOC regions; per-record otherwise.
    EccUncorrectable(String),
    /// Record lookup through the VTOC table of contents failed.
    RecordNotFound(String),
    /// Keyword lookup inside a located record failed.
    KeywordNotFound(String),
    /// Caller input rejected (synthetic record, empty value, selector that
    /// does not match the VPD format, ...).
    InvalidArgument(String),
    /// Field values outside the range the format allows (reserved JEDEC
    /// encodings, checksum mismatch, zero sizes).
    DataException(String),
    /// Configuration JSON could not be read or deserialized.
    Json(String),
    /// The underlying stream failed.
    Io { path: PathBuf, source: io::Error },
}

impl VpdError {
    /// Short machine-friendly tag of the error kind, used for the
    /// invalid-record list and dump file annotations.
    pub fn kind(&self) -> &'static str {
        match self {
            VpdError::TruncatedVpd => "TruncatedVpd",
            VpdError::MalformedVpd(_) => "MalformedVpd",
            VpdError::EccUncorrectable(_) => "EccUncorrectable",
            VpdError::RecordNotFound(_) => "RecordNotFound",
            VpdError::KeywordNotFound(_) => "KeywordNotFound",
            VpdError::InvalidArgument(_) => "InvalidArgument",
            VpdError::DataException(_) => "DataException",
            VpdError::Json(_) => "Json",
            VpdError::Io { .. } => "Io",
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        VpdError::Io {
            path: path.into(),
            source,
        }
    }
}

impl fmt::Display for VpdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VpdError::TruncatedVpd => write!(f, "truncated VPD data"),
            VpdError::MalformedVpd(reason) => write!(f, "malformed VPD: {reason}"),
            VpdError::EccUncorrectable(region) => {
                write!(f, "uncorrectable ECC error in {region}")
            }
            VpdError::RecordNotFound(name) => write!(f, "record {name} not found"),
            VpdError::KeywordNotFound(name) => write!(f, "keyword {name} not found"),
            VpdError::InvalidArgument(reason) => write!(f, "invalid argument: {reason}"),
            VpdError::DataException(reason) => write!(f, "bad VPD data: {reason}"),
            VpdError::Json(reason) => write!(f, "configuration JSON error: {reason}"),
            VpdError::Io { path, source } => {
                write!(f, "I/O error on {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for VpdError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            VpdError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_context() {
        let err = VpdError::MalformedVpd("VHDR record not found".into());
        assert_eq!(err.to_string(), "malformed VPD: VHDR record not found");
        assert_eq!(err.kind(), "MalformedVpd");

        let err = VpdError::io("/sys/bus/i2c/eeprom", io::Error::other("nack"));
        assert!(err.to_string().contains("/sys/bus/i2c/eeprom"));
    }
}
