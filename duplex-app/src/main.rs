// Copyright (c) 2026 ADNT Sarl <info@adnt.io>
// SPDX-License-Identifier: MIT

//! Sample application for the duplex bootloader.
//!
//! Demonstrates the application side of the rollback contract: carry an
//! image header at the slot base, run self-tests on the first boot after an
//! update, and confirm the trial so the bootloader stops counting attempts.
//! If this binary crashes (or simply never confirms), three resets later the
//! bootloader swaps back on its own.

#![no_std]
#![no_main]

use defmt_rtt as _;
use panic_probe as _;

use cortex_m_rt::entry;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::StatefulOutputPin;
use stm32h7xx_hal::{pac, prelude::*};

use duplex_core::confirm;
use duplex_core::hw;
use duplex_core::image::{ImageHeader, SemVer, HDR_FIELD_LEN, IMG_HDR_MAGIC, IMG_HDR_VER};

defmt::timestamp!("{=u64:us}", { 0 });

/// In-flash header at offset 0 of the slot. `img_size` and `img_crc32` are
/// stamped by the release tooling after the build; the zeros here never
/// reach a device unpatched, since an unstamped image fails verification.
#[link_section = ".image_header"]
#[used]
static IMAGE_HEADER: [u8; HDR_FIELD_LEN] = ImageHeader {
    magic: IMG_HDR_MAGIC,
    hdr_version: IMG_HDR_VER,
    flags: 0xFFFF,
    ver: SemVer {
        major: 1,
        minor: 0,
        patch: 0,
        reserved: 0,
        build: 1,
    },
    img_size: 0,
    img_crc32: 0,
}
.encode();

/// Post-update self test. Anything observable can gate the confirmation;
/// a failure here leaves the trial pending and the bootloader reverts.
fn self_test() -> bool {
    let hdr = ImageHeader::decode(&IMAGE_HEADER);
    hdr.magic == IMG_HDR_MAGIC && hdr.hdr_version == IMG_HDR_VER
}

#[entry]
fn main() -> ! {
    let mut cp = cortex_m::Peripherals::take().unwrap();
    let dp = pac::Peripherals::take().unwrap();

    let pwr = dp.PWR.constrain();
    let pwrcfg = pwr.freeze();
    let rcc = dp.RCC.constrain();
    let ccdr = rcc.sys_ck(64.MHz()).freeze(pwrcfg, &dp.SYSCFG);

    cp.SCB.enable_icache();
    cp.SCB.enable_dcache(&mut cp.CPUID);

    let gpiob = dp.GPIOB.split(ccdr.peripheral.GPIOB);
    let mut led = gpiob.pb0.into_push_pull_output();
    let mut delay = stm32h7xx_hal::delay::Delay::new(cp.SYST, ccdr.clocks);

    let (mut flash, _opt) = hw::split(dp.FLASH, cp.SCB);

    let ver = ImageHeader::decode(&IMAGE_HEADER).ver;
    defmt::println!("duplex-app {} up", ver);

    if confirm::is_pending(&flash) {
        if self_test() {
            match confirm::confirm_self(&mut flash) {
                Ok(()) => defmt::println!("trial confirmed"),
                Err(e) => defmt::println!("confirm failed: {}", e),
            }
        } else {
            defmt::println!("self test failed, leaving trial pending");
        }
    } else if confirm::is_confirmed(&flash) {
        defmt::println!("already confirmed");
    }

    loop {
        led.toggle().ok();
        delay.delay_ms(500u32);
    }
}
