// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! VPD format detection.
//!
//! Classification probes fixed tag bytes, in the same precedence order the
//! EEPROM fleet relies on: the IPZ resource tag wins over the keyword
//! start tag, which wins over the JEDEC SPD type bytes. A buffer too short
//! for the class its tags suggest is `Invalid`, never an error.

use crate::constants::{
    DDIMM_11S_OFFSET, DDIMM_11S_TAG, DDIMM_MIN_SIZE, IPZ_MIN_SIZE, IPZ_RECORD_TAG,
    IPZ_TAG_OFFSET, ISDIMM_MIN_SIZE, KWD_MIN_SIZE, KWD_START_TAG, SPD_DRAM_TYPE_DDR4,
    SPD_DRAM_TYPE_DDR5, SPD_DRAM_TYPE_OFFSET, SPD_MODULE_TYPE_DDIMM, SPD_MODULE_TYPE_MASK,
    SPD_MODULE_TYPE_OFFSET,
};
use crate::types::VpdKind;

/// Classify a raw VPD buffer.
///
/// Deterministic and total: exactly one [`VpdKind`] comes back for any
/// input, `VpdKind::Invalid` when nothing matches.
pub fn detect_format(vpd: &[u8]) -> VpdKind {
    if vpd.len() > IPZ_TAG_OFFSET && vpd[IPZ_TAG_OFFSET] == IPZ_RECORD_TAG {
        if vpd.len() < IPZ_MIN_SIZE {
            return VpdKind::Invalid;
        }
        return VpdKind::IpzVpd;
    }

    if !vpd.is_empty() && vpd[0] == KWD_START_TAG {
        if vpd.len() < KWD_MIN_SIZE {
            return VpdKind::Invalid;
        }
        return VpdKind::KeywordVpd;
    }

    if vpd.len() <= SPD_MODULE_TYPE_OFFSET {
        return VpdKind::Invalid;
    }

    let dram_type = vpd[SPD_DRAM_TYPE_OFFSET];
    if vpd[SPD_MODULE_TYPE_OFFSET] & SPD_MODULE_TYPE_MASK == SPD_MODULE_TYPE_DDIMM {
        let has_11s_tag = vpd.len() >= DDIMM_MIN_SIZE
            && &vpd[DDIMM_11S_OFFSET..DDIMM_11S_OFFSET + DDIMM_11S_TAG.len()] == DDIMM_11S_TAG;
        if !has_11s_tag {
            log::debug!("[detect] 11S barcode tag not found in DDIMM SPD");
            return VpdKind::Invalid;
        }
        return match dram_type {
            SPD_DRAM_TYPE_DDR5 => VpdKind::Ddr5Ddimm,
            SPD_DRAM_TYPE_DDR4 => VpdKind::Ddr4Ddimm,
            _ => VpdKind::Invalid,
        };
    }

    match dram_type {
        SPD_DRAM_TYPE_DDR5 if vpd.len() >= ISDIMM_MIN_SIZE => VpdKind::Ddr5Isdimm,
        SPD_DRAM_TYPE_DDR4 if vpd.len() >= ISDIMM_MIN_SIZE => VpdKind::Ddr4Isdimm,
        _ => VpdKind::Invalid,
    }
}
