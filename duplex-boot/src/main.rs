// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Duplex bootloader for STM32H743 dual-bank flash with trial/confirm/revert
//! rollback.

#![no_std]
#![no_main]

mod boot;
mod peripherals;

use defmt_rtt as _;
use panic_probe as _;

use cortex_m_rt::entry;
use duplex_core::{decision, hw, layout};

defmt::timestamp!("{=u64:us}", { 0 });

#[entry]
fn main() -> ! {
    // Decided on the previous pass: hand over before touching anything.
    if boot::jump_armed() {
        unsafe { boot::jump_to_active() }
    }

    defmt::println!("duplex-boot init");

    let mut board = peripherals::init();
    let parts = board.flash.take().expect("flash peripheral already taken");
    let (mut flash, mut opt) = hw::split(parts.flash, parts.scb);

    defmt::println!("swap state: {=bool}", opt.read_swap());

    let outcome = decision::decide(&mut flash, &layout::VECTOR_WINDOWS);
    defmt::println!("outcome: {}", outcome);

    boot::execute(outcome, &mut board, &mut opt)
}
