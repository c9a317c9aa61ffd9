// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com
//
// Shared builders assembling byte-exact VPD blobs for the integration
// tests, ECC blocks included.

// Each test binary pulls in this module; not every binary uses every
// builder.
#![allow(dead_code)]

use std::collections::BTreeMap;

use vpd::RecordInfo;

/// Byte length of one record body built by [`record_body`].
fn record_body_len(keywords: &[(&str, &[u8])]) -> usize {
    // tag (1) + size (2) + "RT" (2) + size (1) + name (4)
    let mut len = 10;
    for (name, value) in keywords {
        let size_field = if name.starts_with('#') { 2 } else { 1 };
        len += 2 + size_field + value.len();
    }
    // "PF" (2) + size (1) + data (1) + end tag (1)
    len + 5
}

/// One IPZ record body: header, RT keyword, payload keywords, PF sentinel
/// and the closing small-resource tag.
fn record_body(name: &str, keywords: &[(&str, &[u8])]) -> Vec<u8> {
    assert_eq!(name.len(), 4, "record names are 4 ASCII bytes");
    let mut body = vec![0x84u8, 0, 0];
    body.extend_from_slice(b"RT");
    body.push(4);
    body.extend_from_slice(name.as_bytes());
    for (kw, value) in keywords {
        assert_eq!(kw.len(), 2, "keyword names are 2 ASCII bytes");
        body.extend_from_slice(kw.as_bytes());
        if kw.starts_with('#') {
            body.extend_from_slice(&(value.len() as u16).to_le_bytes());
        } else {
            body.push(value.len() as u8);
        }
        body.extend_from_slice(value);
    }
    body.extend_from_slice(b"PF");
    body.push(1);
    body.push(0x00);
    body.push(0x78);

    let size = (body.len() - 3) as u16;
    body[1..3].copy_from_slice(&size.to_le_bytes());
    body
}

fn ecc_len(data_len: usize) -> usize {
    data_len.div_ceil(4)
}

/// Assemble a complete IPZ blob: VHDR, VTOC, the given records, and every
/// ECC block.
///
/// Returns the blob plus the location of each record (by name) for tests
/// that corrupt specific regions.
pub fn build_ipz_blob(
    records: &[(&str, &[(&str, &[u8])])],
) -> (Vec<u8>, BTreeMap<String, RecordInfo>) {
    assert!(records.len() <= 18, "PT size byte would overflow");

    // VTOC body length is fixed once the record count is known: its only
    // payload keyword is PT with one 14-byte entry per record.
    let pt_len = records.len() * 14;
    let pt_placeholder = vec![0u8; pt_len];
    let vtoc_offset = 55usize;
    let vtoc_len = record_body_len(&[("PT", pt_placeholder.as_slice())]);
    let vtoc_ecc_offset = vtoc_offset + vtoc_len;
    let vtoc_ecc_len = ecc_len(vtoc_len);

    // Lay the records out back to back, each followed by its ECC block.
    let mut infos = BTreeMap::new();
    let mut cursor = vtoc_ecc_offset + vtoc_ecc_len;
    let mut bodies = Vec::new();
    for (name, keywords) in records {
        let body = record_body(name, keywords);
        let info = RecordInfo {
            offset: cursor,
            length: body.len(),
            ecc_offset: cursor + body.len(),
            ecc_length: ecc_len(body.len()),
        };
        cursor = info.ecc_offset + info.ecc_length;
        infos.insert((*name).to_string(), info);
        bodies.push((name, body, info));
    }

    let mut pt = Vec::with_capacity(pt_len);
    for (name, _, info) in &bodies {
        pt.extend_from_slice(name.as_bytes());
        pt.extend_from_slice(&[0, 0]);
        pt.extend_from_slice(&(info.offset as u16).to_le_bytes());
        pt.extend_from_slice(&(info.length as u16).to_le_bytes());
        pt.extend_from_slice(&(info.ecc_offset as u16).to_le_bytes());
        pt.extend_from_slice(&(info.ecc_length as u16).to_le_bytes());
    }

    let mut blob = vec![0u8; cursor];

    // VHDR record body at 11, 44 bytes, holding the VD version keyword and
    // a single-entry PT pointing at the VTOC. The PT entry lands exactly
    // on the fixed VTOC pointer offsets 35..43.
    blob[11] = 0x84;
    blob[12..14].copy_from_slice(&41u16.to_le_bytes());
    blob[14..16].copy_from_slice(b"RT");
    blob[16] = 4;
    blob[17..21].copy_from_slice(b"VHDR");
    blob[21..23].copy_from_slice(b"VD");
    blob[23] = 2;
    blob[24..26].copy_from_slice(&[0x01, 0x00]);
    blob[26..28].copy_from_slice(b"PT");
    blob[28] = 14;
    blob[29..33].copy_from_slice(b"VTOC");
    blob[33..35].copy_from_slice(&[0, 0]);
    blob[35..37].copy_from_slice(&(vtoc_offset as u16).to_le_bytes());
    blob[37..39].copy_from_slice(&(vtoc_len as u16).to_le_bytes());
    blob[39..41].copy_from_slice(&(vtoc_ecc_offset as u16).to_le_bytes());
    blob[41..43].copy_from_slice(&(vtoc_ecc_len as u16).to_le_bytes());
    blob[43..45].copy_from_slice(b"PF");
    blob[45] = 1;
    blob[46] = 0x00;
    blob[47] = 0x78;

    let vhdr_ecc = vpd::compute_ecc(&blob[11..55]);
    blob[0..11].copy_from_slice(&vhdr_ecc);

    let vtoc_body = record_body("VTOC", &[("PT", &pt)]);
    assert_eq!(vtoc_body.len(), vtoc_len);
    blob[vtoc_offset..vtoc_offset + vtoc_len].copy_from_slice(&vtoc_body);
    let vtoc_ecc = vpd::compute_ecc(&vtoc_body);
    blob[vtoc_ecc_offset..vtoc_ecc_offset + vtoc_ecc_len].copy_from_slice(&vtoc_ecc);

    for (_, body, info) in &bodies {
        blob[info.offset..info.offset + info.length].copy_from_slice(body);
        let ecc = vpd::compute_ecc(body);
        blob[info.ecc_offset..info.ecc_offset + info.ecc_length].copy_from_slice(&ecc);
    }

    (blob, infos)
}

/// The blob most tests start from: one VINI record with identity keywords.
pub fn golden_vini_blob() -> (Vec<u8>, BTreeMap<String, RecordInfo>) {
    build_ipz_blob(&[(
        "VINI",
        &[
            ("SN", b"1234567890AB".as_slice()),
            ("PN", b"PART123".as_slice()),
            ("CC", b"ABCD".as_slice()),
        ],
    )])
}

/// A well-formed keyword-format blob with a correct trailer checksum.
pub fn build_kwd_blob(pairs: &[(&str, &[u8])]) -> Vec<u8> {
    let desc = b"display panel";
    let mut blob = vec![0x82u8];
    blob.extend_from_slice(&(desc.len() as u16).to_le_bytes());
    blob.extend_from_slice(desc);

    let checksum_start = blob.len();
    blob.push(0x84);
    let total: usize = pairs.iter().map(|(_, v)| 3 + v.len()).sum();
    blob.extend_from_slice(&(total as u16).to_le_bytes());
    for (name, value) in pairs {
        blob.extend_from_slice(name.as_bytes());
        blob.push(value.len() as u8);
        blob.extend_from_slice(value);
    }

    let sum = blob[checksum_start..]
        .iter()
        .fold(0u8, |acc, b| acc.wrapping_add(*b));
    blob.push(0x79);
    blob.push(sum.wrapping_neg());
    blob.push(0x78);
    blob
}
