// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! DDIMM SPD parser (JEDEC DDR4 and DDR5 with the 11S barcode block).
//!
//! Emits the module capacity as `MemorySizeInKB` plus the identity
//! keywords `PN`, `FN`, `SN`, `CC` and `DI` read from the 11S barcode area
//! and the DRAM manufacturer id bytes.

use crate::constants::{
    CONVERT_GB_TO_KB, CONVERT_MB_TO_KB, DDIMM_CC_LEN, DDIMM_CC_OFFSET, DDIMM_MFG_ID_LEN,
    DDIMM_MFG_ID_OFFSET, DDIMM_MIN_SIZE, DDIMM_PN_LEN, DDIMM_PN_OFFSET, DDIMM_SN_LEN,
    DDIMM_SN_OFFSET, JEDEC_DIE_COUNT_MASK, JEDEC_DIE_COUNT_SHIFT, JEDEC_NUM_RANKS_MASK,
    JEDEC_PRI_BUS_WIDTH_MASK, JEDEC_PRI_BUS_WIDTH_MULTIPLIER, JEDEC_RESERVED_BITS,
    JEDEC_SDRAMCAP_MULTIPLIER, JEDEC_SDRAMCAP_RESERVED, JEDEC_SDRAM_CAP_MASK,
    JEDEC_SDRAM_WIDTH_MASK, JEDEC_SDRAM_WIDTH_MULTIPLIER, JEDEC_SIGNAL_LOADING_MASK,
    JEDEC_SINGLE_LOAD_STACK, MASK_BITS_01, MASK_BITS_012, MASK_BITS_01234, MASK_BITS_345,
    MASK_BITS_567, MASK_BIT_6, MASK_BIT_7, SPD_BYTE_12, SPD_BYTE_13, SPD_BYTE_234, SPD_BYTE_235,
    SPD_BYTE_4, SPD_BYTE_6, SPD_DRAM_TYPE_DDR4, SPD_DRAM_TYPE_DDR5, SPD_DRAM_TYPE_OFFSET,
};
use crate::error::{Result, VpdError};
use crate::types::{KeywordMap, KeywordValue};

/// Parser for one DDIMM SPD blob.
pub struct DdimmParser<'a> {
    vpd: &'a [u8],
}

impl<'a> DdimmParser<'a> {
    pub fn new(vpd: &'a [u8]) -> Self {
        DdimmParser { vpd }
    }

    /// Parse capacity and identity keywords.
    ///
    /// # Errors
    ///
    /// `VpdError::DataException` when a capacity field holds a reserved
    /// JEDEC encoding or the computed size comes out zero;
    /// `VpdError::TruncatedVpd` when the blob is shorter than the DDIMM
    /// identity area.
    pub fn parse(&self) -> Result<KeywordMap> {
        if self.vpd.is_empty() {
            return Err(VpdError::DataException("DDIMM SPD buffer is empty".into()));
        }
        if self.vpd.len() < DDIMM_MIN_SIZE {
            return Err(VpdError::TruncatedVpd);
        }

        let size_kb = self.ddimm_size_kb()?;
        if size_kb == 0 {
            return Err(VpdError::DataException("calculated dimm size is 0".into()));
        }

        let mut map = KeywordMap::new();
        map.insert("MemorySizeInKB".into(), KeywordValue::Size(size_kb));

        let pn = self.vpd[DDIMM_PN_OFFSET..DDIMM_PN_OFFSET + DDIMM_PN_LEN].to_vec();
        let sn = self.vpd[DDIMM_SN_OFFSET..DDIMM_SN_OFFSET + DDIMM_SN_LEN].to_vec();
        let cc = self.vpd[DDIMM_CC_OFFSET..DDIMM_CC_OFFSET + DDIMM_CC_LEN].to_vec();
        let di = self.vpd[DDIMM_MFG_ID_OFFSET..DDIMM_MFG_ID_OFFSET + DDIMM_MFG_ID_LEN].to_vec();

        // The FRU number of a DDIMM is its part number.
        map.insert("FN".into(), KeywordValue::Bytes(pn.clone()));
        map.insert("PN".into(), KeywordValue::Bytes(pn));
        map.insert("SN".into(), KeywordValue::Bytes(sn));
        map.insert("CC".into(), KeywordValue::Bytes(cc));
        map.insert("DI".into(), KeywordValue::Bytes(di));

        Ok(map)
    }

    fn ddimm_size_kb(&self) -> Result<u64> {
        match self.vpd[SPD_DRAM_TYPE_OFFSET] {
            SPD_DRAM_TYPE_DDR5 => ddr5_size_kb(self.vpd),
            SPD_DRAM_TYPE_DDR4 => ddr4_size_mb(self.vpd).map(|mb| mb * CONVERT_MB_TO_KB),
            other => Err(VpdError::DataException(format!(
                "DDIMM is neither DDR4 nor DDR5, SPD byte 2 is {other:#04x}"
            ))),
        }
    }
}

/// Reject field codes outside `[min, max]` after masking and shifting.
fn check_range(what: &str, byte: u8, mask: u8, shift: u8, min: u8, max: u8) -> Result<u8> {
    let value = (byte & mask) >> shift;
    if value < min || value > max {
        return Err(VpdError::DataException(format!(
            "{what} code {value} outside [{min}..{max}], SPD byte is {byte:#04x}"
        )));
    }
    Ok(value)
}

/// SDRAM density per die in Gb from the SPD byte 4 code.
fn ddr5_density_per_die(code: u8) -> u64 {
    match code {
        c if c < 5 => u64::from(c) * 4,
        5 => 24,
        6 => 32,
        7 => 48,
        8 => 64,
        _ => 0,
    }
}

/// Die per package from the SPD byte 4 high bits.
fn ddr5_die_per_package(code: u8) -> u64 {
    if code < 2 {
        u64::from(code) + 1
    } else {
        1 << (code - 1)
    }
}

/// DDR5 DDIMM capacity in KB from SPD bytes 4, 6, 234 and 235.
fn ddr5_size_kb(spd: &[u8]) -> Result<u64> {
    let b4 = spd[SPD_BYTE_4];
    let b6 = spd[SPD_BYTE_6];
    let b234 = spd[SPD_BYTE_234];
    let b235 = spd[SPD_BYTE_235];

    check_range("channels per phy (low)", b235, MASK_BITS_01, 0, 1, 3)?;
    check_range("channels per phy (high)", b235, MASK_BITS_345, 3, 1, 3)?;
    let channels_per_phy = u64::from(b235 & MASK_BITS_01 != 0) + u64::from(b235 & MASK_BITS_345 != 0);
    let channels_per_ddimm = (u64::from((b235 & MASK_BIT_6) >> 6)
        + u64::from((b235 & MASK_BIT_7) >> 7))
        * channels_per_phy;

    check_range("bus width per channel", b235, MASK_BITS_012, 0, 1, 3)?;
    let bus_width_per_channel: u64 = 32;

    let die_code = check_range("die per package", b4, MASK_BITS_567, 5, 0, 5)?;
    let die_per_package = ddr5_die_per_package(die_code);

    let density_code = check_range("SDRAM density per die", b4, MASK_BITS_01234, 0, 1, 8)?;
    let density_per_die = ddr5_density_per_die(density_code);

    if b234 & MASK_BIT_7 != 0 {
        // Asymmetrical rank mixes are not characterised for this module
        // family; the capacity tables only cover the symmetrical case.
        return Err(VpdError::DataException(
            "asymmetrical DDR5 rank mix is not supported".into(),
        ));
    }
    let ranks_per_channel = if b235 & MASK_BIT_6 != 0 {
        u64::from(b234 & MASK_BITS_012) + 1
    } else {
        0
    };

    let width_code = check_range("dram width", b6, MASK_BITS_567, 5, 0, 3)?;
    let dram_width = 4u64 * (1 << width_code);

    let size_gb = (channels_per_ddimm
        * bus_width_per_channel
        * die_per_package
        * density_per_die
        * ranks_per_channel)
        / (8 * dram_width);

    Ok(size_gb * CONVERT_GB_TO_KB)
}

/// JEDEC DDR4 module capacity in MB from SPD bytes 4, 6, 12 and 13.
/// Shared with the ISDIMM parser, which runs the same arithmetic on raw
/// DDR4 SPD.
pub(crate) fn ddr4_size_mb(spd: &[u8]) -> Result<u64> {
    if spd.len() <= SPD_BYTE_13 {
        return Err(VpdError::TruncatedVpd);
    }

    let cap_code = spd[SPD_BYTE_4] & JEDEC_SDRAM_CAP_MASK;
    if cap_code > JEDEC_SDRAMCAP_RESERVED {
        return Err(VpdError::DataException(
            "bad data in SPD byte 4, cannot calculate SDRAM capacity".into(),
        ));
    }
    let sdram_capacity = (1u64 << cap_code) * JEDEC_SDRAMCAP_MULTIPLIER;

    let bus_code = spd[SPD_BYTE_13] & JEDEC_PRI_BUS_WIDTH_MASK;
    if bus_code > JEDEC_RESERVED_BITS {
        return Err(VpdError::DataException(
            "bad data in SPD byte 13, cannot calculate primary bus width".into(),
        ));
    }
    let primary_bus_width = (1u64 << bus_code) * JEDEC_PRI_BUS_WIDTH_MULTIPLIER;

    let width_code = spd[SPD_BYTE_12] & JEDEC_SDRAM_WIDTH_MASK;
    if width_code > JEDEC_RESERVED_BITS {
        return Err(VpdError::DataException(
            "bad data in SPD byte 12, cannot calculate SDRAM width".into(),
        ));
    }
    let sdram_width = (1u64 << width_code) * JEDEC_SDRAM_WIDTH_MULTIPLIER;

    let ranks_code = (spd[SPD_BYTE_12] & JEDEC_NUM_RANKS_MASK) >> JEDEC_RESERVED_BITS;
    if ranks_code > JEDEC_RESERVED_BITS {
        return Err(VpdError::DataException(
            "bad data in SPD byte 12, cannot calculate number of ranks".into(),
        ));
    }
    let mut logical_ranks = u64::from(ranks_code) + 1;

    if spd[SPD_BYTE_6] & JEDEC_SIGNAL_LOADING_MASK == JEDEC_SINGLE_LOAD_STACK {
        let die_count =
            u64::from((spd[SPD_BYTE_6] & JEDEC_DIE_COUNT_MASK) >> JEDEC_DIE_COUNT_SHIFT) + 1;
        logical_ranks *= die_count;
    }

    Ok((sdram_capacity / JEDEC_PRI_BUS_WIDTH_MULTIPLIER) * (primary_bus_width / sdram_width)
        * logical_ranks)
}
