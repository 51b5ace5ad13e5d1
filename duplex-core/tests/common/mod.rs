// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Shared fixtures: build images and trailer records inside a SimFlash.

#![allow(dead_code)]

use duplex_core::image::{ImageHeader, SemVer, HDR_SIZE, IMG_HDR_MAGIC, IMG_HDR_VER};
use duplex_core::layout::Slot;
use duplex_core::sim::SimFlash;
use duplex_core::trailer::{Journal, SlotState, TrailerRecord};
use duplex_core::verify::body_crc32;

/// A stack pointer inside the AXI SRAM window.
pub const SP_OK: u32 = 0x2401_0000;

/// Deterministic body with a plausible vector table at its head.
pub fn make_body(entry: u32, len: usize, seed: u8) -> Vec<u8> {
    assert!(len >= 8, "body must hold at least the two vector words");
    let mut body = vec![0u8; len];
    body[0..4].copy_from_slice(&SP_OK.to_le_bytes());
    body[4..8].copy_from_slice(&(entry + 0x99).to_le_bytes());
    for (i, b) in body.iter_mut().enumerate().skip(8) {
        *b = seed.wrapping_mul(31).wrapping_add(i as u8);
    }
    body
}

/// Write a complete valid image (header + body) into `slot`; returns its
/// body CRC, which is also the record binding key.
pub fn install_image(
    flash: &mut SimFlash,
    slot: Slot,
    ver: (u16, u16, u16),
    body_len: usize,
    seed: u8,
) -> u32 {
    let entry = slot.base + HDR_SIZE;
    let body = make_body(entry, body_len, seed);
    flash.fill(entry, &body);
    let crc = body_crc32(flash, entry, body_len as u32);

    let hdr = ImageHeader {
        magic: IMG_HDR_MAGIC,
        hdr_version: IMG_HDR_VER,
        flags: 0xFFFF,
        ver: SemVer::new(ver.0, ver.1, ver.2),
        img_size: body_len as u32,
        img_crc32: crc,
    };
    flash.fill(slot.base, &hdr.encode());
    flash.clear_reads();
    crc
}

/// The byte stream an external writer would deliver for an image of
/// `body_len` bytes: encoded header, `0xFF` padding to `HDR_SIZE`, body.
pub fn image_stream(slot: Slot, ver: (u16, u16, u16), body_len: usize, seed: u8) -> Vec<u8> {
    let entry = slot.base + HDR_SIZE;
    let body = make_body(entry, body_len, seed);

    let mut scratch = SimFlash::new();
    scratch.fill(entry, &body);
    let crc = body_crc32(&mut scratch, entry, body_len as u32);

    let hdr = ImageHeader {
        magic: IMG_HDR_MAGIC,
        hdr_version: IMG_HDR_VER,
        flags: 0xFFFF,
        ver: SemVer::new(ver.0, ver.1, ver.2),
        img_size: body_len as u32,
        img_crc32: crc,
    };

    let mut stream = hdr.encode().to_vec();
    stream.resize(HDR_SIZE as usize, 0xFF);
    stream.extend_from_slice(&body);
    stream
}

/// Append a record through the real journal path.
pub fn append_rec(flash: &mut SimFlash, slot: Slot, state: SlotState, attempt: u32, crc: u32) {
    let journal = Journal::new(slot.trailer_base);
    let rec = TrailerRecord {
        seq: journal.next_seq(flash),
        state,
        attempt,
        img_crc32: crc,
    };
    journal.append(flash, &rec).unwrap();
}

pub fn last_rec(flash: &SimFlash, slot: Slot) -> Option<TrailerRecord> {
    Journal::new(slot.trailer_base).read_last(flash)
}
