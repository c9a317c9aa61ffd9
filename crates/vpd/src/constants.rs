// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fixed offsets, tags and masks of the supported VPD wire formats.
//!
//! All multi-byte scalars in IPZ and keyword VPD are little-endian.

// =======================================================================
// IPZ layout
//
//   offset  size  field
//     0      11   VHDR ECC block
//    11      44   VHDR record body (0x84 tag, "VHDR" name at 17)
//    35       2   VTOC record offset (LE)
//    37       2   VTOC record length (LE)
//    39       2   VTOC ECC offset (LE)
//    41       2   VTOC ECC length (LE)
// =======================================================================

/// Offset of the VHDR ECC block.
pub const VHDR_ECC_OFFSET: usize = 0;
/// Length of the VHDR ECC block.
pub const VHDR_ECC_LEN: usize = 11;
/// Offset of the VHDR record body; also where the 0x84 resource tag sits.
pub const VHDR_RECORD_OFFSET: usize = 11;
/// Length of the VHDR record body covered by its ECC.
pub const VHDR_RECORD_LEN: usize = 44;
/// Offset of the ASCII record name "VHDR".
pub const VHDR_NAME_OFFSET: usize = 17;
/// Offset of the 2-byte VTOC record offset.
pub const VTOC_PTR_OFFSET: usize = 35;
/// Offset of the 2-byte VTOC record length.
pub const VTOC_LEN_OFFSET: usize = 37;
/// Offset of the 2-byte VTOC ECC offset.
pub const VTOC_ECC_PTR_OFFSET: usize = 39;
/// Offset of the 2-byte VTOC ECC length.
pub const VTOC_ECC_LEN_OFFSET: usize = 41;
/// Smallest byte count a buffer must have to be walked as IPZ at all.
pub const IPZ_MIN_SIZE: usize = 44;

/// Large-resource tag opening every IPZ record body.
pub const IPZ_RECORD_TAG: u8 = 0x84;
/// Offset probed by the format detector for [`IPZ_RECORD_TAG`].
pub const IPZ_TAG_OFFSET: usize = 11;
/// Small-resource tag closing every IPZ record body.
pub const IPZ_RECORD_END_TAG: u8 = 0x78;

/// Length of an IPZ record name.
pub const RECORD_NAME_LEN: usize = 4;
/// Length of a keyword name.
pub const KW_NAME_LEN: usize = 2;
/// Record header bytes in front of the record name:
/// id (1) + record size (2) + "RT" keyword name (2) + keyword size (1).
pub const RECORD_HEADER_LEN: usize = 6;
/// One entry of the VTOC "PT" keyword:
/// name (4) + type (2) + offset (2) + length (2) + ECC offset (2) + ECC length (2).
pub const PT_ENTRY_LEN: usize = 14;
/// Sentinel keyword terminating every keyword list.
pub const LAST_KW: &str = "PF";
/// Keywords starting with '#' carry a 2-byte little-endian size.
pub const POUND_KW_PREFIX: u8 = b'#';

// =======================================================================
// Keyword VPD layout
// =======================================================================

/// Large-resource identifier-string tag opening a keyword VPD blob.
pub const KWD_START_TAG: u8 = 0x82;
/// Tag opening the keyword-value block.
pub const KWD_PAIR_TAG: u8 = 0x84;
/// Vendor-defined alternate tag for the keyword-value block.
pub const KWD_ALT_PAIR_TAG: u8 = 0x90;
/// Small-resource tag ending the keyword-value block, followed by the
/// one-byte checksum.
pub const KWD_PAIR_END_TAG: u8 = 0x79;
/// Small-resource end tag closing the blob.
pub const KWD_END_TAG: u8 = 0x78;
/// Tag (1) + description size (2) + pair tag (1) + size (2) + trailer (3).
pub const KWD_MIN_SIZE: usize = 9;

// =======================================================================
// JEDEC SPD (DDR4 / DDR5, DDIMM and ISDIMM)
// =======================================================================

/// SPD byte holding the DRAM device type.
pub const SPD_DRAM_TYPE_OFFSET: usize = 2;
/// SPD byte holding the module type in its low nibble.
pub const SPD_MODULE_TYPE_OFFSET: usize = 3;
pub const SPD_MODULE_TYPE_MASK: u8 = 0x0F;
pub const SPD_MODULE_TYPE_DDIMM: u8 = 0x0A;
pub const SPD_DRAM_TYPE_DDR4: u8 = 0x0C;
pub const SPD_DRAM_TYPE_DDR5: u8 = 0x12;

/// Offset of the ASCII "11S" barcode tag on DDIMM modules.
pub const DDIMM_11S_OFFSET: usize = 416;
pub const DDIMM_11S_TAG: &[u8; 3] = b"11S";
/// Part number: 7 ASCII bytes following the 11S tag.
pub const DDIMM_PN_OFFSET: usize = 419;
pub const DDIMM_PN_LEN: usize = 7;
/// Serial number: 12 ASCII bytes following the part number.
pub const DDIMM_SN_OFFSET: usize = 426;
pub const DDIMM_SN_LEN: usize = 12;
/// CCIN: 4 ASCII bytes following the serial number.
pub const DDIMM_CC_OFFSET: usize = 438;
pub const DDIMM_CC_LEN: usize = 4;
/// DRAM manufacturer id on DDIMM modules.
pub const DDIMM_MFG_ID_OFFSET: usize = 0x228;
pub const DDIMM_MFG_ID_LEN: usize = 2;
/// A DDIMM SPD must at least reach past the manufacturer id.
pub const DDIMM_MIN_SIZE: usize = DDIMM_MFG_ID_OFFSET + DDIMM_MFG_ID_LEN;

/// DDR4 ISDIMM identity fields live in SPD bytes 320..329.
pub const ISDIMM_MIN_SIZE: usize = 512;
pub const ISDIMM_DDR4_MFG_ID_LSB_OFFSET: usize = 320;
pub const ISDIMM_DDR4_MFG_ID_MSB_OFFSET: usize = 321;
pub const ISDIMM_DDR4_SN_OFFSET: usize = 325;
pub const ISDIMM_DDR4_SN_RAW_LEN: usize = 4;

/// JEDEC DDR4 field masks (SPD bytes 4, 6, 12, 13).
pub const JEDEC_SDRAM_CAP_MASK: u8 = 0x0F;
pub const JEDEC_PRI_BUS_WIDTH_MASK: u8 = 0x07;
pub const JEDEC_SDRAM_WIDTH_MASK: u8 = 0x07;
pub const JEDEC_NUM_RANKS_MASK: u8 = 0x38;
pub const JEDEC_DIE_COUNT_MASK: u8 = 0x70;
pub const JEDEC_SIGNAL_LOADING_MASK: u8 = 0x03;
pub const JEDEC_SINGLE_LOAD_STACK: u8 = 0x02;

/// JEDEC DDR4 multipliers and reserved-code limits.
pub const JEDEC_SDRAMCAP_MULTIPLIER: u64 = 256;
pub const JEDEC_PRI_BUS_WIDTH_MULTIPLIER: u64 = 8;
pub const JEDEC_SDRAM_WIDTH_MULTIPLIER: u64 = 4;
pub const JEDEC_SDRAMCAP_RESERVED: u8 = 7;
pub const JEDEC_RESERVED_BITS: u8 = 3;
pub const JEDEC_DIE_COUNT_SHIFT: u8 = 4;

/// DDR5 SPD bytes consumed by the capacity math.
pub const SPD_BYTE_4: usize = 4;
pub const SPD_BYTE_6: usize = 6;
pub const SPD_BYTE_12: usize = 12;
pub const SPD_BYTE_13: usize = 13;
pub const SPD_BYTE_18: usize = 18;
pub const SPD_BYTE_234: usize = 234;
pub const SPD_BYTE_235: usize = 235;

pub const MASK_BITS_01: u8 = 0x03;
pub const MASK_BITS_012: u8 = 0x07;
pub const MASK_BITS_345: u8 = 0x38;
pub const MASK_BITS_567: u8 = 0xE0;
pub const MASK_BITS_01234: u8 = 0x1F;
pub const MASK_BIT_6: u8 = 0x40;
pub const MASK_BIT_7: u8 = 0x80;

pub const CONVERT_MB_TO_KB: u64 = 1024;
pub const CONVERT_GB_TO_KB: u64 = 1024 * 1024;

// =======================================================================
// Misc
// =======================================================================

/// Side directory receiving dumps of blobs that failed structural or ECC
/// checks, keyed by device path.
pub const BAD_VPD_DIR: &str = "/var/lib/vpd/dumps";
