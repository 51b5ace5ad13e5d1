// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Append-only trailer journal.
//!
//! The last sector of each slot is a journal of 32-byte records. Records are
//! never rewritten: each state transition appends a new record, and the
//! highest-offset record before the first erased word is authoritative.
//! Because the record size equals the flash word, an append is atomic; a
//! reader sees either the whole record or erased space.

use crate::flash::{Flash, FlashErr, WORDLINE};
use crate::layout::TRAILER_SIZE;

pub const TR_MAGIC: u32 = 0x544C_5252; // "TLRR"

// Wire values. The high half keeps records distinguishable from both erased
// flash and zeroed memory.
pub const TR_STATE_NEW: u32 = 0xAAAA_0001;
pub const TR_STATE_PENDING: u32 = 0xAAAA_0002;
pub const TR_STATE_CONFIRMED: u32 = 0xAAAA_0003;
pub const TR_STATE_REJECTED: u32 = 0xAAAA_0004;

/// Lifecycle state carried by a trailer record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SlotState {
    New,
    Pending,
    Confirmed,
    Rejected,
}

impl SlotState {
    pub const fn to_wire(self) -> u32 {
        match self {
            SlotState::New => TR_STATE_NEW,
            SlotState::Pending => TR_STATE_PENDING,
            SlotState::Confirmed => TR_STATE_CONFIRMED,
            SlotState::Rejected => TR_STATE_REJECTED,
        }
    }

    pub fn from_wire(v: u32) -> Option<Self> {
        match v {
            TR_STATE_NEW => Some(SlotState::New),
            TR_STATE_PENDING => Some(SlotState::Pending),
            TR_STATE_CONFIRMED => Some(SlotState::Confirmed),
            TR_STATE_REJECTED => Some(SlotState::Rejected),
            _ => None,
        }
    }
}

/// One journal record. On flash this is exactly one 32-byte word:
/// magic, seq, state, attempt, img_crc32, then reserved padding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TrailerRecord {
    pub seq: u32,
    pub state: SlotState,
    /// Trial count: `1..=MAX_ATTEMPTS` for `Pending`, `0` otherwise.
    pub attempt: u32,
    /// Binds this record to the image whose body CRC matches.
    pub img_crc32: u32,
}

impl TrailerRecord {
    pub fn encode(&self) -> [u8; WORDLINE] {
        let mut b = [0u8; WORDLINE];
        b[0..4].copy_from_slice(&TR_MAGIC.to_le_bytes());
        b[4..8].copy_from_slice(&self.seq.to_le_bytes());
        b[8..12].copy_from_slice(&self.state.to_wire().to_le_bytes());
        b[12..16].copy_from_slice(&self.attempt.to_le_bytes());
        b[16..20].copy_from_slice(&self.img_crc32.to_le_bytes());
        b
    }

    /// `None` for anything that is not a well-formed record: bad magic or an
    /// unknown state word (a torn program ends up here and is skipped).
    pub fn decode(b: &[u8; WORDLINE]) -> Option<Self> {
        let magic = u32::from_le_bytes([b[0], b[1], b[2], b[3]]);
        if magic != TR_MAGIC {
            return None;
        }
        let state = SlotState::from_wire(u32::from_le_bytes([b[8], b[9], b[10], b[11]]))?;
        Some(TrailerRecord {
            seq: u32::from_le_bytes([b[4], b[5], b[6], b[7]]),
            state,
            attempt: u32::from_le_bytes([b[12], b[13], b[14], b[15]]),
            img_crc32: u32::from_le_bytes([b[16], b[17], b[18], b[19]]),
        })
    }
}

/// All 32 bytes reading `0xFF` is the only reliable empty predicate, since
/// partial word programs are forbidden.
fn is_blank(b: &[u8; WORDLINE]) -> bool {
    b.iter().all(|&x| x == 0xFF)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TrailerErr {
    /// No erased word left; erase and retry.
    Full,
    Flash(FlashErr),
}

impl From<FlashErr> for TrailerErr {
    fn from(e: FlashErr) -> Self {
        TrailerErr::Flash(e)
    }
}

/// Journal over one trailer sector.
#[derive(Clone, Copy, Debug)]
pub struct Journal {
    base: u32,
}

impl Journal {
    pub const fn new(trailer_base: u32) -> Self {
        Journal { base: trailer_base }
    }

    /// Last well-formed record before the first erased word, if any.
    pub fn read_last<F: Flash>(&self, flash: &F) -> Option<TrailerRecord> {
        let mut last = None;
        let mut buf = [0u8; WORDLINE];
        for off in (0..TRAILER_SIZE).step_by(WORDLINE) {
            flash.read(self.base + off, &mut buf);
            if is_blank(&buf) {
                break;
            }
            if let Some(rec) = TrailerRecord::decode(&buf) {
                last = Some(rec);
            }
        }
        last
    }

    /// Program `rec` into the first erased word.
    pub fn append<F: Flash>(&self, flash: &mut F, rec: &TrailerRecord) -> Result<(), TrailerErr> {
        let mut buf = [0u8; WORDLINE];
        for off in (0..TRAILER_SIZE).step_by(WORDLINE) {
            flash.read(self.base + off, &mut buf);
            if is_blank(&buf) {
                flash.program_word(self.base + off, &rec.encode())?;
                return Ok(());
            }
        }
        Err(TrailerErr::Full)
    }

    /// Append, erasing the sector and retrying once if the journal is full.
    /// Recycling loses history but not current state: the record being
    /// appended carries the current intent.
    pub fn append_or_recycle<F: Flash>(
        &self,
        flash: &mut F,
        rec: &TrailerRecord,
    ) -> Result<(), TrailerErr> {
        match self.append(flash, rec) {
            Err(TrailerErr::Full) => {
                self.erase(flash)?;
                self.append(flash, rec)
            }
            other => other,
        }
    }

    /// `true` iff the final word of the sector is non-erased.
    pub fn is_full<F: Flash>(&self, flash: &F) -> bool {
        let mut buf = [0u8; WORDLINE];
        flash.read(self.base + TRAILER_SIZE - WORDLINE as u32, &mut buf);
        !is_blank(&buf)
    }

    pub fn erase<F: Flash>(&self, flash: &mut F) -> Result<(), TrailerErr> {
        flash.erase_sector(self.base)?;
        Ok(())
    }

    /// Sequence number for the next record; `1` on an empty journal.
    pub fn next_seq<F: Flash>(&self, flash: &F) -> u32 {
        self.read_last(flash).map(|r| r.seq + 1).unwrap_or(1)
    }
}
