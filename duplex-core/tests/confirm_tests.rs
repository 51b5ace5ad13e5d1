// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Unit tests for the application-side confirmer.

mod common;

use common::{append_rec, install_image, last_rec};
use duplex_core::confirm::{confirm_self, is_confirmed, is_pending};
use duplex_core::flash::WORDLINE;
use duplex_core::layout::{Slot, TRAILER_SIZE};
use duplex_core::sim::SimFlash;
use duplex_core::trailer::SlotState;

#[test]
fn test_confirm_appends_single_bound_record() {
    let mut flash = SimFlash::new();
    let crc = install_image(&mut flash, Slot::active(), (1, 0, 0), 4096, 1);
    append_rec(&mut flash, Slot::active(), SlotState::Pending, 1, crc);

    assert!(is_pending(&flash));
    assert!(!is_confirmed(&flash));

    confirm_self(&mut flash).unwrap();

    let rec = last_rec(&flash, Slot::active()).unwrap();
    assert_eq!(rec.state, SlotState::Confirmed);
    assert_eq!(rec.attempt, 0);
    assert_eq!(rec.img_crc32, crc);
    assert_eq!(rec.seq, 2);

    assert!(!is_pending(&flash));
    assert!(is_confirmed(&flash));
}

#[test]
fn test_confirm_is_idempotent() {
    let mut flash = SimFlash::new();
    let crc = install_image(&mut flash, Slot::active(), (1, 0, 0), 4096, 1);
    append_rec(&mut flash, Slot::active(), SlotState::Pending, 1, crc);

    confirm_self(&mut flash).unwrap();
    let seq = last_rec(&flash, Slot::active()).unwrap().seq;

    confirm_self(&mut flash).unwrap();
    confirm_self(&mut flash).unwrap();
    assert_eq!(last_rec(&flash, Slot::active()).unwrap().seq, seq);
}

#[test]
fn test_confirm_with_no_prior_record() {
    let mut flash = SimFlash::new();
    let crc = install_image(&mut flash, Slot::active(), (1, 0, 0), 4096, 1);

    confirm_self(&mut flash).unwrap();
    let rec = last_rec(&flash, Slot::active()).unwrap();
    assert_eq!(rec.state, SlotState::Confirmed);
    assert_eq!(rec.img_crc32, crc);
    assert_eq!(rec.seq, 1);
}

#[test]
fn test_confirm_supersedes_stale_record() {
    let mut flash = SimFlash::new();
    let crc = install_image(&mut flash, Slot::active(), (1, 0, 0), 4096, 1);
    // Leftover confirmation of a previous image in this slot.
    append_rec(&mut flash, Slot::active(), SlotState::Confirmed, 0, 0xAA);

    assert!(!is_confirmed(&flash), "stale record must not bind");
    confirm_self(&mut flash).unwrap();

    let rec = last_rec(&flash, Slot::active()).unwrap();
    assert_eq!(rec.state, SlotState::Confirmed);
    assert_eq!(rec.img_crc32, crc);
    assert!(is_confirmed(&flash));
}

#[test]
fn test_confirm_recycles_full_trailer() {
    let mut flash = SimFlash::new();
    let crc = install_image(&mut flash, Slot::active(), (1, 0, 0), 4096, 1);
    let slots = TRAILER_SIZE as usize / WORDLINE;
    for _ in 0..slots {
        append_rec(&mut flash, Slot::active(), SlotState::Pending, 1, crc);
    }

    confirm_self(&mut flash).unwrap();
    let rec = last_rec(&flash, Slot::active()).unwrap();
    assert_eq!(rec.state, SlotState::Confirmed);
    assert_eq!(rec.img_crc32, crc);
}

#[test]
fn test_pending_checks_binding_not_just_state() {
    let mut flash = SimFlash::new();
    install_image(&mut flash, Slot::active(), (1, 0, 0), 4096, 1);
    // Pending record for some other image.
    append_rec(&mut flash, Slot::active(), SlotState::Pending, 1, 0xAA);

    assert!(!is_pending(&flash));
}
