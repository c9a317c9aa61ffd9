// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! ISDIMM SPD parser (industry-standard JEDEC modules, no 11S barcode).
//!
//! Raw SPD carries no printable part or serial number, so the DDR4 path
//! synthesises them from the module-organisation bytes and looks the FRU
//! number and CCIN up in fixed tables keyed by the synthesised part number
//! and the module frequency. DDR5 ISDIMMs are not characterised yet and
//! report placeholder identity values.

use crate::constants::{
    CONVERT_MB_TO_KB, ISDIMM_DDR4_MFG_ID_LSB_OFFSET, ISDIMM_DDR4_MFG_ID_MSB_OFFSET,
    ISDIMM_DDR4_SN_OFFSET, ISDIMM_MIN_SIZE, SPD_BYTE_12, SPD_BYTE_18, SPD_BYTE_4, SPD_BYTE_6,
    SPD_DRAM_TYPE_DDR4, SPD_DRAM_TYPE_DDR5, SPD_DRAM_TYPE_OFFSET,
};
use crate::error::{Result, VpdError};
use crate::parser::ddimm::ddr4_size_mb;
use crate::types::{KeywordMap, KeywordValue};

/// FRU number by (synthesised part number, SPD byte 18 MTB units). The MTB
/// units encode the module frequency band:
/// 10 = DDR4-1600, 9 = 1866, 8 = 2133, 7 = 2400, 6 = 2666, 5 = 3200.
const PN_FREQ_FN_MAP: &[((&str, u8), &str)] = &[
    (("8421000", 6), "78P4191"),
    (("8421008", 6), "78P4192"),
    (("8529000", 6), "78P4197"),
    (("8529008", 6), "78P4198"),
    (("8529928", 6), "78P4199"),
    (("8529B28", 6), "78P4200"),
    (("8631928", 6), "78P6925"),
    (("8529000", 5), "78P7317"),
    (("8529008", 5), "78P7318"),
    (("8631008", 5), "78P6815"),
];

/// CCIN by FRU number.
const FN_CCIN_MAP: &[(&str, &str)] = &[
    ("78P4191", "324D"),
    ("78P4192", "324E"),
    ("78P4197", "324E"),
    ("78P4198", "324F"),
    ("78P4199", "325A"),
    ("78P4200", "324C"),
    ("78P6925", "32BC"),
    ("78P7317", "331A"),
    ("78P7318", "331F"),
    ("78P6815", "32BB"),
];

const UNKNOWN_FRU_NUMBER: &str = "FFFFFFF";
const UNKNOWN_CCIN: &str = "XXXX";

/// Parser for one raw JEDEC SPD blob.
pub struct IsdimmParser<'a> {
    vpd: &'a [u8],
}

impl<'a> IsdimmParser<'a> {
    pub fn new(vpd: &'a [u8]) -> Self {
        IsdimmParser { vpd }
    }

    /// Parse identity keywords and, where derivable, the module capacity.
    ///
    /// A capacity that cannot be computed is logged and omitted rather
    /// than failing the parse: the identity keywords are still worth
    /// publishing for a module with odd organisation bytes.
    pub fn parse(&self) -> Result<KeywordMap> {
        if self.vpd.is_empty() {
            return Err(VpdError::DataException("ISDIMM SPD buffer is empty".into()));
        }
        if self.vpd.len() < ISDIMM_MIN_SIZE {
            return Err(VpdError::TruncatedVpd);
        }

        match self.vpd[SPD_DRAM_TYPE_OFFSET] {
            SPD_DRAM_TYPE_DDR4 => Ok(self.parse_ddr4()),
            SPD_DRAM_TYPE_DDR5 => Ok(self.parse_ddr5()),
            other => Err(VpdError::DataException(format!(
                "ISDIMM is neither DDR4 nor DDR5, SPD byte 2 is {other:#04x}"
            ))),
        }
    }

    fn parse_ddr4(&self) -> KeywordMap {
        let mut map = KeywordMap::new();

        match ddr4_size_mb(self.vpd) {
            Ok(size_mb) if size_mb > 0 => {
                map.insert(
                    "MemorySizeInKB".into(),
                    KeywordValue::Size(size_mb * CONVERT_MB_TO_KB),
                );
            }
            Ok(_) => log::warn!("[isdimm] calculated dimm size is 0"),
            Err(e) => log::warn!("[isdimm] dimm size calculation failed: {e}"),
        }

        let part_number = format!(
            "{:02X}{:02X}{:02X}{:X}",
            self.vpd[SPD_BYTE_4],
            self.vpd[SPD_BYTE_4 + 1],
            self.vpd[SPD_BYTE_6],
            self.vpd[SPD_BYTE_12] & 0x0F
        );
        let fru_number = ddr4_fru_number(&part_number, self.vpd[SPD_BYTE_18]);
        let ccin = ddr4_ccin(fru_number);
        let serial_number = format!(
            "{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}",
            self.vpd[ISDIMM_DDR4_MFG_ID_MSB_OFFSET],
            self.vpd[ISDIMM_DDR4_MFG_ID_LSB_OFFSET],
            self.vpd[ISDIMM_DDR4_SN_OFFSET],
            self.vpd[ISDIMM_DDR4_SN_OFFSET + 1],
            self.vpd[ISDIMM_DDR4_SN_OFFSET + 2],
            self.vpd[ISDIMM_DDR4_SN_OFFSET + 3],
        );
        let mfg_id = vec![
            self.vpd[ISDIMM_DDR4_MFG_ID_LSB_OFFSET],
            self.vpd[ISDIMM_DDR4_MFG_ID_MSB_OFFSET],
        ];

        // The published part number of an ISDIMM is its FRU number.
        map.insert("PN".into(), KeywordValue::Bytes(fru_number.into()));
        map.insert("FN".into(), KeywordValue::Bytes(fru_number.into()));
        map.insert("SN".into(), KeywordValue::Bytes(serial_number.into_bytes()));
        map.insert("CC".into(), KeywordValue::Bytes(ccin.into()));
        map.insert("DI".into(), KeywordValue::Bytes(mfg_id));
        map
    }

    /// DDR5 ISDIMM identity tables are still owned by the memory team;
    /// until they land, every module reports the placeholder identity.
    fn parse_ddr5(&self) -> KeywordMap {
        let mut map = KeywordMap::new();
        let fru_number = ddr4_fru_number("0123456", 0);
        map.insert("PN".into(), KeywordValue::Bytes(fru_number.into()));
        map.insert("FN".into(), KeywordValue::Bytes(fru_number.into()));
        map.insert(
            "SN".into(),
            KeywordValue::Bytes(b"444444444444".to_vec()),
        );
        map.insert("CC".into(), KeywordValue::Bytes(UNKNOWN_CCIN.into()));
        map
    }
}

fn ddr4_fru_number(part_number: &str, mtb_units: u8) -> &'static str {
    PN_FREQ_FN_MAP
        .iter()
        .find(|((pn, units), _)| *pn == part_number && *units == mtb_units)
        .map(|(_, fn_)| *fn_)
        .unwrap_or(UNKNOWN_FRU_NUMBER)
}

fn ddr4_ccin(fru_number: &str) -> &'static str {
    FN_CCIN_MAP
        .iter()
        .find(|(fn_, _)| *fn_ == fru_number)
        .map(|(_, ccin)| *ccin)
        .unwrap_or(UNKNOWN_CCIN)
}
