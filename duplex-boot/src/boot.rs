// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Outcome execution: cross-reset jump marker, the jump itself, and the
//! recovery loop.
//!
//! Booting is two-phase. The decision pass ends by writing a magic word
//! into a reserved RAM location and soft-resetting; the very first thing
//! the next pass does, before any peripheral is touched, is check that
//! marker and jump. The application therefore always starts with every
//! peripheral in its reset state.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::StatefulOutputPin;

use duplex_core::decision::Outcome;
use duplex_core::hw::OptionBytes;
use duplex_core::image::HDR_SIZE;
use duplex_core::layout::ACTIVE_SLOT_BASE;

use crate::peripherals::Board;

/// "Decision made, jump immediately."
pub const JUMP_MAGIC: u32 = 0xB007_A55A;

/// Fixed DTCM word, kept out of the zero-initialized RAM region by the
/// linker script so it survives a soft reset.
pub const JUMP_FLAG_ADDR: u32 = 0x2001_FFF0;

/// Check and consume the jump marker.
pub fn jump_armed() -> bool {
    let flag = unsafe { (JUMP_FLAG_ADDR as *const u32).read_volatile() };
    unsafe { (JUMP_FLAG_ADDR as *mut u32).write_volatile(0) };
    flag == JUMP_MAGIC
}

/// Arm the marker and soft-reset. Does not return.
pub fn arm_jump_and_reset() -> ! {
    unsafe { (JUMP_FLAG_ADDR as *mut u32).write_volatile(JUMP_MAGIC) };
    cortex_m::asm::dsb();
    cortex_m::peripheral::SCB::sys_reset();
}

/// Jump into the active image: vector table base, then MSP, then the reset
/// handler, with barriers between the VTOR write and the branch.
///
/// # Safety
/// Must run before any peripheral or interrupt configuration, with the
/// active slot known to contain a verified image from the previous pass.
pub unsafe fn jump_to_active() -> ! {
    let entry = ACTIVE_SLOT_BASE + HDR_SIZE;

    const SCB_VTOR: *mut u32 = 0xE000_ED08 as *mut u32;
    SCB_VTOR.write_volatile(entry);
    cortex_m::asm::dsb();
    cortex_m::asm::isb();

    let sp = (entry as *const u32).read_volatile();
    let reset = (entry as *const u32).offset(1).read_volatile();

    core::arch::asm!(
        "msr msp, {sp}",
        "bx {reset}",
        sp = in(reg) sp,
        reset = in(reg) reset,
        options(noreturn)
    );
}

/// Carry out a decision. Every arm ends in a reset or an endless loop.
pub fn execute(outcome: Outcome, board: &mut Board, opt: &mut OptionBytes) -> ! {
    match outcome {
        Outcome::BootActive | Outcome::ContinuePending => arm_jump_and_reset(),
        Outcome::SwapToNew | Outcome::SwapToOld => {
            let target = !opt.read_swap();
            defmt::println!("toggling bank swap to {=bool}", target);
            cortex_m::interrupt::disable();
            opt.set_swap(target)
        }
        Outcome::Recovery => recovery(board),
    }
}

/// Terminal state: no safe boot target. Signal on the LED and wait for
/// external reprogramming.
pub fn recovery(board: &mut Board) -> ! {
    defmt::println!("recovery: no safe boot target, waiting for reprogramming");
    loop {
        board.led.toggle().ok();
        board.delay.delay_ms(100u32);
    }
}
