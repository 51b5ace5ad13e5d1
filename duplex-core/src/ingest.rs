// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Streaming writer for new images arriving in the inactive slot.
//!
//! The transport (serial, USB, whatever feeds the bytes) is somebody else's
//! problem; this module turns an arbitrary bytestream into whole-word flash
//! programs. Bytes accumulate in a `0xFF`-prefilled scratch word and every
//! full word is programmed immediately, so a lost connection leaves a
//! partial image whose CRC cannot match and which the verifier will refuse.
//!
//! The caller erases the target range first (the size may only be known from
//! the incoming stream's metadata, which is why erasing is a separate step).

use crate::flash::{Flash, FlashErr, WORDLINE};
use crate::layout::{Slot, SECTOR_SIZE};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IngestErr {
    /// Destination is not wordline-aligned or not inside the inactive app
    /// region.
    Range,
    /// More bytes than the declared size.
    Overflow,
    /// Stream ended with fewer bytes than declared.
    SizeMismatch,
    Flash(FlashErr),
}

impl From<FlashErr> for IngestErr {
    fn from(e: FlashErr) -> Self {
        IngestErr::Flash(e)
    }
}

/// Erase every sector covering `[start, start + len)` in the inactive app
/// region. The trailer sector is out of bounds on purpose; it is managed by
/// the journal alone.
pub fn erase_range<F: Flash>(flash: &mut F, start: u32, len: u32) -> Result<(), IngestErr> {
    let slot = Slot::inactive();
    if start < slot.base || start >= slot.app_end() {
        return Err(IngestErr::Range);
    }
    if len == 0 {
        return Ok(());
    }
    if len > slot.app_end() - start {
        return Err(IngestErr::Range);
    }

    let first = (start - slot.base) / SECTOR_SIZE;
    let last = (start + len - 1 - slot.base) / SECTOR_SIZE;
    for sector in first..=last {
        flash.erase_sector(slot.base + sector * SECTOR_SIZE)?;
    }
    Ok(())
}

/// In-progress write session targeting the inactive slot.
#[derive(Debug)]
pub struct ImageWriter {
    base: u32,
    declared: u32,
    addr: u32,
    received: u32,
    fill: usize,
    buf: [u8; WORDLINE],
}

/// Open a write session for `dst_size` bytes at `dst_base`.
pub fn begin(dst_base: u32, dst_size: u32) -> Result<ImageWriter, IngestErr> {
    let slot = Slot::inactive();
    if dst_base % WORDLINE as u32 != 0 {
        return Err(IngestErr::Range);
    }
    if dst_base < slot.base || dst_base >= slot.app_end() {
        return Err(IngestErr::Range);
    }
    if dst_size == 0 || dst_size > slot.app_end() - dst_base {
        return Err(IngestErr::Range);
    }

    Ok(ImageWriter {
        base: dst_base,
        declared: dst_size,
        addr: dst_base,
        received: 0,
        fill: 0,
        buf: [0xFF; WORDLINE],
    })
}

impl ImageWriter {
    /// Feed stream bytes, programming a word each time the scratch fills.
    pub fn write<F: Flash>(&mut self, flash: &mut F, mut data: &[u8]) -> Result<(), IngestErr> {
        if data.len() as u32 > self.declared - self.received {
            return Err(IngestErr::Overflow);
        }

        while !data.is_empty() {
            let take = (WORDLINE - self.fill).min(data.len());
            self.buf[self.fill..self.fill + take].copy_from_slice(&data[..take]);
            self.fill += take;
            self.received += take as u32;
            data = &data[take..];

            if self.fill == WORDLINE {
                self.flush(flash)?;
            }
        }
        Ok(())
    }

    /// Close the session: pad the final partial word with `0xFF`, program
    /// it, and check the byte count against the declared size.
    pub fn end<F: Flash>(&mut self, flash: &mut F) -> Result<(), IngestErr> {
        if self.fill > 0 {
            self.flush(flash)?;
        }
        if self.received != self.declared {
            return Err(IngestErr::SizeMismatch);
        }
        Ok(())
    }

    /// Bytes accepted so far.
    pub fn received(&self) -> u32 {
        self.received
    }

    /// Start of the destination range.
    pub fn base(&self) -> u32 {
        self.base
    }

    fn flush<F: Flash>(&mut self, flash: &mut F) -> Result<(), IngestErr> {
        flash.program_word(self.addr, &self.buf)?;
        self.addr += WORDLINE as u32;
        self.fill = 0;
        self.buf = [0xFF; WORDLINE];
        Ok(())
    }
}
