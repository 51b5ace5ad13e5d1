// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Boot decision state machine.
//!
//! Runs once per reset. It inspects both slots and their trailer journals,
//! appends whatever record the transition requires, and returns the action
//! to execute. Records are always written *before* the caller acts on the
//! outcome, so a crash between the two leaves a state the next boot
//! re-derives correctly.
//!
//! The machine never returns an error: a failed trailer write degrades to
//! the same decision without the record, which at worst costs one extra
//! trial on the next reset and never boots a known-bad image.

use crate::flash::Flash;
use crate::image::ImageHeader;
use crate::layout::{Slot, VectorWindows};
use crate::trailer::{Journal, SlotState, TrailerRecord};
use crate::verify::{inspect, ImageView};

/// Number of boots after which an unconfirmed pending image is rejected.
pub const MAX_ATTEMPTS: u32 = 3;

/// Action chosen by [`decide`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Outcome {
    /// Jump to the active image.
    BootActive,
    /// Jump to the active image; it is on trial and must confirm itself.
    ContinuePending,
    /// Toggle the bank swap to promote the inactive image.
    SwapToNew,
    /// Toggle the bank swap to roll back to the other slot.
    SwapToOld,
    /// No safe boot target; halt and wait for reprogramming.
    Recovery,
}

/// Run the decision algorithm against the current flash state.
pub fn decide<F: Flash>(flash: &mut F, windows: &VectorWindows) -> Outcome {
    let active_slot = Slot::active();
    let inactive_slot = Slot::inactive();

    let active = inspect(flash, active_slot, windows);
    let inactive = inspect(flash, inactive_slot, windows);
    log_view("active", &active);
    log_view("inactive", &inactive);

    let active_journal = Journal::new(active_slot.trailer_base);
    let inactive_journal = Journal::new(inactive_slot.trailer_base);

    // Records that do not bind to the image now in the slot are stale
    // leftovers of an earlier image and carry no authority.
    let atr = bound_record(&active, active_journal.read_last(flash));
    let itr = bound_record(&inactive, inactive_journal.read_last(flash));

    let Some(active_hdr) = active.valid_header() else {
        // Active is unbootable; fail over to the other slot if it offers
        // anything better than halting.
        return rollback_or_recovery(flash, &inactive, itr, &inactive_journal);
    };

    match atr {
        Some(rec) => match rec.state {
            SlotState::Pending if rec.attempt >= MAX_ATTEMPTS => {
                push(flash, &active_journal, SlotState::Rejected, 0, rec.img_crc32);
                rollback_or_recovery(flash, &inactive, itr, &inactive_journal)
            }
            SlotState::Pending => {
                push(
                    flash,
                    &active_journal,
                    SlotState::Pending,
                    rec.attempt + 1,
                    rec.img_crc32,
                );
                Outcome::ContinuePending
            }
            SlotState::Rejected => {
                rollback_or_recovery(flash, &inactive, itr, &inactive_journal)
            }
            SlotState::Confirmed => {
                upgrade_or_boot(flash, &active_hdr, &inactive, itr, &inactive_journal)
            }
            // Nothing in the lifecycle writes New today; treat it like a
            // fresh image and start the trial.
            SlotState::New => {
                push(
                    flash,
                    &active_journal,
                    SlotState::Pending,
                    1,
                    active_hdr.img_crc32,
                );
                Outcome::ContinuePending
            }
        },
        None => {
            // Fresh image (or stale trailer): open its trial.
            push(
                flash,
                &active_journal,
                SlotState::Pending,
                1,
                active_hdr.img_crc32,
            );
            Outcome::ContinuePending
        }
    }
}

/// Keep `rec` only if it binds to the (valid) image in `view`.
fn bound_record(view: &ImageView, rec: Option<TrailerRecord>) -> Option<TrailerRecord> {
    let hdr = view.valid_header()?;
    rec.filter(|r| r.img_crc32 == hdr.img_crc32)
}

/// The active image is confirmed; check whether the inactive slot holds a
/// strictly newer candidate that has not already been tried and judged.
fn upgrade_or_boot<F: Flash>(
    flash: &mut F,
    active_hdr: &ImageHeader,
    inactive: &ImageView,
    itr: Option<TrailerRecord>,
    inactive_journal: &Journal,
) -> Outcome {
    let Some(candidate) = inactive.valid_header() else {
        return Outcome::BootActive;
    };
    if candidate.ver.cmp_precedence(&active_hdr.ver) != core::cmp::Ordering::Greater {
        return Outcome::BootActive;
    }
    match itr.map(|r| r.state) {
        // Already judged; a rejected candidate stays rejected and a
        // confirmed one is not an upgrade.
        Some(SlotState::Rejected) | Some(SlotState::Confirmed) => Outcome::BootActive,
        // A crash after the append but before the swap lands here; the
        // trial is already open, do not append again.
        Some(SlotState::Pending) => Outcome::SwapToNew,
        Some(SlotState::New) | None => {
            push(
                flash,
                inactive_journal,
                SlotState::Pending,
                1,
                candidate.img_crc32,
            );
            Outcome::SwapToNew
        }
    }
}

/// Fail over to the inactive slot, or halt if it is invalid or rejected.
fn rollback_or_recovery<F: Flash>(
    flash: &mut F,
    inactive: &ImageView,
    itr: Option<TrailerRecord>,
    inactive_journal: &Journal,
) -> Outcome {
    let Some(hdr) = inactive.valid_header() else {
        return Outcome::Recovery;
    };
    if matches!(itr.map(|r| r.state), Some(SlotState::Rejected)) {
        return Outcome::Recovery;
    }
    if itr.is_none() {
        // The swap target has no open trial yet; give it one so the next
        // boot counts attempts against it.
        push(flash, inactive_journal, SlotState::Pending, 1, hdr.img_crc32);
    }
    Outcome::SwapToOld
}

/// Best-effort append: sequence the record, recycle the sector if full, and
/// degrade silently if flash programming fails.
fn push<F: Flash>(flash: &mut F, journal: &Journal, state: SlotState, attempt: u32, img_crc32: u32) {
    let rec = TrailerRecord {
        seq: journal.next_seq(flash),
        state,
        attempt,
        img_crc32,
    };
    if journal.append_or_recycle(flash, &rec).is_err() {
        #[cfg(feature = "defmt")]
        defmt::warn!(
            "trailer append failed ({=u32:08x}, {}), continuing without record",
            img_crc32,
            state
        );
    }
}

#[cfg(feature = "defmt")]
fn log_view(name: &str, view: &ImageView) {
    match (&view.hdr, &view.fault) {
        (Some(hdr), None) => defmt::println!(
            "{=str} {=u32:08x}: valid ver={} size={=u32} crc={=u32:08x}",
            name,
            view.base,
            hdr.ver,
            hdr.img_size,
            hdr.img_crc32
        ),
        (_, Some(fault)) => {
            defmt::println!("{=str} {=u32:08x}: invalid ({})", name, view.base, fault)
        }
        (None, None) => {}
    }
}

#[cfg(not(feature = "defmt"))]
fn log_view(_name: &str, _view: &ImageView) {}
