// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Image verification: header magic, vector-table sanity, body CRC.
//!
//! Checks run cheapest-first and short-circuit, so a slot of erased flash
//! costs one header read and a corrupted body is only discovered by the CRC
//! pass that would have to run anyway.
//!
//! The CRC variant is CRC-32/ISO-HDLC (IEEE polynomial `0x04C11DB7`, init
//! `0xFFFFFFFF`, reflected, inverted output) to match the host tool that
//! stamps `img_crc32`; the body is padded with `0xFF` to a 4-byte multiple
//! before digesting, mirroring how the tool pads the final word.

use crc::{Crc, CRC_32_ISO_HDLC};

use crate::flash::Flash;
use crate::image::{ImageHeader, HDR_FIELD_LEN, HDR_SIZE, IMG_HDR_MAGIC, IMG_HDR_VER};
use crate::layout::{Slot, VectorWindows};

const IMAGE_CRC: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Chunk size for CRC computation. Small enough that the watchdog gets
/// serviced between chunks even on a full 768 KiB body.
pub const CRC_CHUNK: usize = 2048;

/// First failing check of an image, if any.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ImageFault {
    Magic,
    Vector,
    Size,
    Crc,
}

/// Result of inspecting one slot.
///
/// `hdr` is present once the magic/version check passed, even if a later
/// check failed, so callers can still log what the slot claims to contain.
#[derive(Clone, Copy, Debug)]
pub struct ImageView {
    pub base: u32,
    pub entry: u32,
    pub hdr: Option<ImageHeader>,
    pub fault: Option<ImageFault>,
}

impl ImageView {
    pub fn is_valid(&self) -> bool {
        self.fault.is_none()
    }

    /// Header of a fully valid image, `None` otherwise.
    pub fn valid_header(&self) -> Option<ImageHeader> {
        match self.fault {
            None => self.hdr,
            Some(_) => None,
        }
    }
}

/// Validate the image in `slot`.
pub fn inspect<F: Flash>(flash: &mut F, slot: Slot, windows: &VectorWindows) -> ImageView {
    let entry = slot.base + HDR_SIZE;

    let mut raw = [0u8; HDR_FIELD_LEN];
    flash.read(slot.base, &mut raw);
    let hdr = ImageHeader::decode(&raw);

    if hdr.magic != IMG_HDR_MAGIC || hdr.hdr_version != IMG_HDR_VER {
        return ImageView {
            base: slot.base,
            entry,
            hdr: None,
            fault: Some(ImageFault::Magic),
        };
    }

    let mut view = ImageView {
        base: slot.base,
        entry,
        hdr: Some(hdr),
        fault: None,
    };

    let mut vectors = [0u8; 8];
    flash.read(entry, &mut vectors);
    let sp = u32::from_le_bytes([vectors[0], vectors[1], vectors[2], vectors[3]]);
    let reset = u32::from_le_bytes([vectors[4], vectors[5], vectors[6], vectors[7]]);
    if !windows.stack_ok(sp) || !windows.reset_ok(reset) {
        view.fault = Some(ImageFault::Vector);
        return view;
    }

    if hdr.img_size == 0 || hdr.img_size > slot.app_size - HDR_SIZE {
        view.fault = Some(ImageFault::Size);
        return view;
    }

    flash.invalidate_dcache(entry, hdr.img_size);
    if body_crc32(flash, entry, hdr.img_size) != hdr.img_crc32 {
        view.fault = Some(ImageFault::Crc);
        return view;
    }

    view
}

/// CRC-32 over `len` bytes at `base`, chunked so the watchdog stays fed,
/// with the tail padded to the next 4-byte group with `0xFF`.
pub fn body_crc32<F: Flash>(flash: &mut F, base: u32, len: u32) -> u32 {
    let mut digest = IMAGE_CRC.digest();
    let mut chunk = [0u8; CRC_CHUNK];
    let mut addr = base;
    let mut remaining = len as usize;

    while remaining > 0 {
        let n = remaining.min(CRC_CHUNK);
        flash.read(addr, &mut chunk[..n]);
        digest.update(&chunk[..n]);
        addr += n as u32;
        remaining -= n;
        flash.kick_watchdog();
    }

    let tail = (len % 4) as usize;
    if tail != 0 {
        digest.update(&[0xFFu8; 3][..4 - tail]);
    }

    digest.finalize()
}
