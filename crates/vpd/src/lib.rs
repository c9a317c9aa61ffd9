// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # vpd - FRU Vital Product Data core
//!
//! Parsing, editing and ECC maintenance for the binary VPD blobs stored
//! on the EEPROMs of field-replaceable units. The crate is a pure
//! library: it takes bytes, configuration and paths, and hands back
//! structured maps, ECC status and write byte-counts. Inventory brokers,
//! D-Bus publishing, event logging and daemon plumbing live with the
//! callers.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vpd::{parse_vpd, ParsedVpd, Result};
//!
//! fn main() -> Result<()> {
//!     let bytes = std::fs::read("/sys/bus/i2c/drivers/at24/8-0050/eeprom")
//!         .expect("readable EEPROM");
//!
//!     match parse_vpd(&bytes, "/sys/bus/i2c/drivers/at24/8-0050/eeprom", 0)? {
//!         ParsedVpd::Ipz { map, invalid } => {
//!             for (record, keywords) in &map {
//!                 println!("{record}: {} keywords", keywords.len());
//!             }
//!             for bad in &invalid {
//!                 eprintln!("skipped {}: {}", bad.name, bad.reason);
//!             }
//!         }
//!         ParsedVpd::Kwd(map) => println!("{} keywords", map.len()),
//!         ParsedVpd::Empty => {}
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------------+
//! |                        Facade layer                          |
//! |      read_keyword / write_keyword / fix_ecc / reconcile      |
//! +--------------------------------------------------------------+
//! |   Dispatcher: detect_format -> IPZ | KWD | DDIMM | ISDIMM    |
//! +--------------------------------------------------------------+
//! |  IPZ parser/editor        |  flat parsers (KWD, SPD)         |
//! |  VHDR -> VTOC -> records  |  tag walk / JEDEC byte math      |
//! +--------------------------------------------------------------+
//! |        vpd-ecc: interleave + (39,32) single-bit ECC          |
//! +--------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ParsedVpd`] | Tagged parse result, one variant per map shape |
//! | [`IpzMap`] | Record name -> keyword name -> raw bytes |
//! | [`KeywordMap`] | Flat keyword -> value map of the simpler formats |
//! | [`EepromEditor`] | In-place keyword writes with ECC rewrite |
//! | [`BackupRestore`] | Primary/backup EEPROM reconciler |
//!
//! ## Modules Overview
//!
//! - [`parser`] - format detection, the four parsers, the dispatcher
//! - [`editor`] - buffered EEPROM editing
//! - [`facade`] - validated keyword read/write entry points
//! - [`backup`] - backup-restore reconciler
//! - [`config`] - serde models of the JSON configuration documents
//! - [`dump`] - bad-VPD side-directory dumps

pub mod backup;
pub mod config;
pub mod constants;
pub mod dump;
pub mod editor;
pub mod error;
pub mod facade;
pub mod parser;
pub mod reader;
pub mod types;

pub use backup::{BackupRestore, BackupRestoreStatus};
pub use config::{BackupEntry, BackupRestoreConfig, EndpointConfig, FruEntry, SystemConfig};
pub use editor::EepromEditor;
pub use error::{Result, VpdError};
pub use facade::{fix_ecc, read_keyword, write_keyword};
pub use parser::{detect_format, parse_vpd, DdimmParser, IpzParser, IsdimmParser, KwdParser};
pub use types::{
    Binary, InvalidRecord, IpzMap, KeywordMap, KeywordValue, KeywordValueMap, ParsedVpd,
    ReadSelector, RecordInfo, VpdKind, WriteSelector,
};

// The ECC primitives are part of the public surface; callers computing or
// verifying ECC blocks out-of-band use these rather than depending on the
// codec crate directly.
pub use vpd_ecc::{check_and_correct as check_ecc, create_ecc as compute_ecc, EccError, EccStatus};
