// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bad-VPD dump support.
//!
//! Blobs that fail structural or ECC checks are copied into a side
//! directory so operators can pull them out with a debug dump and inspect
//! what is actually on the EEPROM. One file per device path; a newer dump
//! replaces the previous one.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Write `vpd` into `dump_dir`, named after `device_path`.
///
/// # Returns
///
/// Path of the written dump file.
pub fn dump_bad_vpd(device_path: &str, vpd: &[u8], dump_dir: &Path) -> io::Result<PathBuf> {
    if device_path.is_empty() || vpd.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "device path and VPD must be non-empty",
        ));
    }

    fs::create_dir_all(dump_dir)?;

    let name: String = device_path
        .trim_start_matches('/')
        .replace('/', "_");
    let target = dump_dir.join(format!("{name}.vpd"));

    if target.exists() {
        fs::remove_file(&target)?;
    }
    fs::write(&target, vpd)?;

    Ok(target)
}
