// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Peripheral initialization for the bootloader.

use stm32h7xx_hal as hal;
use stm32h7xx_hal::{pac, prelude::*};

pub type LedPin = hal::gpio::gpiob::PB0<hal::gpio::Output<hal::gpio::PushPull>>;

pub struct Board {
    pub led: LedPin,
    pub delay: hal::delay::Delay,
    pub flash: Option<FlashParts>,
}

/// The pieces the flash/option-byte drivers take ownership of.
pub struct FlashParts {
    pub flash: pac::FLASH,
    pub scb: cortex_m::peripheral::SCB,
}

pub fn init() -> Board {
    let mut cp = cortex_m::Peripherals::take().unwrap();
    let dp = pac::Peripherals::take().unwrap();

    let pwr = dp.PWR.constrain();
    let pwrcfg = pwr.freeze();

    let rcc = dp.RCC.constrain();
    let ccdr = rcc.sys_ck(64.MHz()).freeze(pwrcfg, &dp.SYSCFG);

    cp.SCB.enable_icache();
    cp.SCB.enable_dcache(&mut cp.CPUID);

    let gpiob = dp.GPIOB.split(ccdr.peripheral.GPIOB);
    let led = gpiob.pb0.into_push_pull_output();

    let delay = hal::delay::Delay::new(cp.SYST, ccdr.clocks);

    Board {
        led,
        delay,
        flash: Some(FlashParts {
            flash: dp.FLASH,
            scb: cp.SCB,
        }),
    }
}
