// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! VPD parsers and the format dispatcher.
//!
//! # Module Organization
//!
//! - `detect`: tag-based format classification
//! - `ipz`: recursive ECC-protected IPZ format
//! - `kwd`: flat keyword format with a trailer checksum
//! - `ddimm`: JEDEC DDR4/DDR5 DDIMM SPD with the 11S barcode block
//! - `isdimm`: raw JEDEC SPD for industry-standard modules

pub mod ddimm;
pub mod detect;
pub mod ipz;
pub mod isdimm;
pub mod kwd;

pub use ddimm::DdimmParser;
pub use detect::detect_format;
pub use ipz::IpzParser;
pub use isdimm::IsdimmParser;
pub use kwd::KwdParser;

use crate::error::{Result, VpdError};
use crate::types::{ParsedVpd, VpdKind};

/// Classify `vpd` and run the matching parser.
///
/// # Arguments
///
/// - `vpd`: raw EEPROM content.
/// - `path`: device path the bytes came from, used for diagnostics and
///   bad-VPD dumps. May be empty for in-memory buffers.
/// - `start_offset`: offset within `vpd` where the blob actually starts
///   (EEPROMs shared with other content do not start VPD at byte 0).
///
/// # Errors
///
/// - `VpdError::InvalidArgument` for an empty buffer.
/// - `VpdError::TruncatedVpd` when `start_offset` is past the end.
/// - `VpdError::DataException` when no format matches.
/// - Whatever the selected parser raises.
pub fn parse_vpd(vpd: &[u8], path: &str, start_offset: usize) -> Result<ParsedVpd> {
    if vpd.is_empty() {
        return Err(VpdError::InvalidArgument("empty VPD buffer".into()));
    }
    let blob = vpd.get(start_offset..).ok_or(VpdError::TruncatedVpd)?;

    let kind = detect_format(blob);
    log::debug!("[parser] {path} classified as {kind} VPD");

    match kind {
        VpdKind::IpzVpd => match IpzParser::new(blob, path).parse() {
            Ok((map, invalid)) => Ok(ParsedVpd::Ipz { map, invalid }),
            Err(e) => {
                // A fatal header/TOC failure bypasses the parser's own
                // invalid-record reporting; preserve the evidence here.
                if !path.is_empty() && matches!(e, VpdError::EccUncorrectable(_)) {
                    let dir = std::path::Path::new(crate::constants::BAD_VPD_DIR);
                    if let Err(dump_err) = crate::dump::dump_bad_vpd(path, blob, dir) {
                        log::warn!("[parser] failed to dump bad VPD for {path}: {dump_err}");
                    }
                }
                Err(e)
            }
        },
        VpdKind::KeywordVpd => Ok(ParsedVpd::Kwd(KwdParser::new(blob).parse()?)),
        VpdKind::Ddr4Ddimm | VpdKind::Ddr5Ddimm => {
            Ok(ParsedVpd::Kwd(DdimmParser::new(blob).parse()?))
        }
        VpdKind::Ddr4Isdimm | VpdKind::Ddr5Isdimm => {
            Ok(ParsedVpd::Kwd(IsdimmParser::new(blob).parse()?))
        }
        VpdKind::Invalid => Err(VpdError::DataException(format!(
            "unable to determine VPD format for {path}"
        ))),
    }
}
