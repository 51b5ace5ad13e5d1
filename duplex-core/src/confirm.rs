// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Application-side trial confirmation.
//!
//! After the bootloader hands control to a pending image, the application
//! runs its self-tests and calls [`confirm_self`] to durably record success.
//! This module is the only legitimate producer of `Confirmed` records;
//! `Rejected` is written exclusively by the bootloader.
//!
//! The running image's identity comes from the header embedded at the active
//! slot base. The header is trusted here: whether the image actually matches
//! its CRC was the verifier's business at boot time.

use crate::flash::Flash;
use crate::image::{ImageHeader, HDR_FIELD_LEN};
use crate::layout::Slot;
use crate::trailer::{Journal, SlotState, TrailerErr, TrailerRecord};

fn running_crc32<F: Flash>(flash: &F) -> u32 {
    let mut raw = [0u8; HDR_FIELD_LEN];
    flash.read(Slot::active().base, &mut raw);
    ImageHeader::decode(&raw).img_crc32
}

fn last_bound<F: Flash>(flash: &F) -> Option<TrailerRecord> {
    let crc = running_crc32(flash);
    Journal::new(Slot::active().trailer_base)
        .read_last(flash)
        .filter(|r| r.img_crc32 == crc)
}

/// `true` iff the running image is on trial.
pub fn is_pending<F: Flash>(flash: &F) -> bool {
    matches!(
        last_bound(flash).map(|r| r.state),
        Some(SlotState::Pending)
    )
}

/// `true` iff the running image has already been confirmed.
pub fn is_confirmed<F: Flash>(flash: &F) -> bool {
    matches!(
        last_bound(flash).map(|r| r.state),
        Some(SlotState::Confirmed)
    )
}

/// Append a `Confirmed` record for the running image.
///
/// Idempotent: if the journal already ends in a bound `Confirmed`, nothing
/// is written. A full journal is erased and the append retried once.
pub fn confirm_self<F: Flash>(flash: &mut F) -> Result<(), TrailerErr> {
    let crc = running_crc32(flash);
    let journal = Journal::new(Slot::active().trailer_base);

    if let Some(last) = journal.read_last(flash) {
        if last.state == SlotState::Confirmed && last.img_crc32 == crc {
            return Ok(());
        }
    }

    let rec = TrailerRecord {
        seq: journal.next_seq(flash),
        state: SlotState::Confirmed,
        attempt: 0,
        img_crc32: crc,
    };
    journal.append_or_recycle(flash, &rec)
}
