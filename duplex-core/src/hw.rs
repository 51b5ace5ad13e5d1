// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! STM32H7 flash controller and option-byte drivers.
//!
//! Register sequences follow RM0433: bank-local `KEYR` unlock, `CR.PG` plus
//! eight 32-bit writes per 256-bit flash word, `CR.SER/SNB/START` sector
//! erase, `QW`/`BSY` polling, `SR` error bits. Erase and program run with
//! interrupts disabled and the data cache cleaned before and invalidated
//! after, since the flash contents change underneath any cached lines.
//!
//! When the banks are swapped, the *logical* low window is served by
//! physical bank 2 whose operations are still driven through the bank 2
//! register set, so the driver maps addresses to register banks through the
//! live swap state in `OPTCR`.

use cortex_m::peripheral::SCB;
use stm32h7xx_hal::pac;

use crate::flash::{Flash, FlashErr, WORDLINE};
use crate::layout::{physical_bank_base, FLASH_BANK1_BASE, FLASH_BANK2_BASE, SECTOR_SIZE};

// RM0433 section 4.9.2 / 4.9.3
const FLASH_KEY1: u32 = 0x4567_0123;
const FLASH_KEY2: u32 = 0xCDEF_89AB;
const FLASH_OPT_KEY1: u32 = 0x0819_2A3B;
const FLASH_OPT_KEY2: u32 = 0x4C5D_6E7F;

/// Flash-word parallelism (PSIZE = x64).
const PSIZE_X64: u8 = 0b11;

/// Flash controller capability: the only holder of bank erase/program
/// access. Constructed by [`split`], destroyed by reset.
pub struct FlashCtl {
    regs: &'static pac::flash::RegisterBlock,
    scb: SCB,
}

/// Option-byte capability: the only writer of the swap-bank bit.
pub struct OptionBytes {
    regs: &'static pac::flash::RegisterBlock,
}

/// Split the FLASH peripheral into its two capabilities. Consumes the PAC
/// singleton so each register set has exactly one holder; the bank control
/// registers and the option-byte registers are disjoint.
pub fn split(_flash: pac::FLASH, scb: SCB) -> (FlashCtl, OptionBytes) {
    let regs = unsafe { &*pac::FLASH::ptr() };
    (FlashCtl { regs, scb }, OptionBytes { regs })
}

impl FlashCtl {
    /// Resolve a logical address to the register bank controlling its
    /// physical backing, plus the sector index within that bank.
    fn bank_regs(&self, addr: u32) -> (&'static pac::flash::BANK, u32) {
        // OPTCR mirrors the swap state currently in effect.
        let swapped = self.regs.optcr.read().swap_bank().bit();
        let low_window = addr < FLASH_BANK2_BASE;
        let window_base = if low_window {
            FLASH_BANK1_BASE
        } else {
            FLASH_BANK2_BASE
        };
        let sector = (addr - window_base) / SECTOR_SIZE;

        if physical_bank_base(low_window, swapped) == FLASH_BANK1_BASE {
            (self.regs.bank1(), sector)
        } else {
            (self.regs.bank2(), sector)
        }
    }

    fn unlock(bank: &pac::flash::BANK) {
        if bank.cr.read().lock().bit() {
            bank.keyr.write(|w| unsafe { w.keyr().bits(FLASH_KEY1) });
            bank.keyr.write(|w| unsafe { w.keyr().bits(FLASH_KEY2) });
        }
    }

    fn lock(bank: &pac::flash::BANK) {
        bank.cr.modify(|_, w| w.lock().set_bit());
    }

    fn clear_errors(bank: &pac::flash::BANK) {
        bank.ccr.modify(|_, w| {
            w.clr_wrperr()
                .set_bit()
                .clr_pgserr()
                .set_bit()
                .clr_strberr()
                .set_bit()
                .clr_incerr()
                .set_bit()
                .clr_operr()
                .set_bit()
                .clr_eop()
                .set_bit()
        });
    }

    fn wait_idle(bank: &pac::flash::BANK) {
        while bank.sr.read().qw().bit() {}
        while bank.sr.read().bsy().bit() {}
    }

    fn status_ok(bank: &pac::flash::BANK) -> bool {
        let sr = bank.sr.read();
        // rdperr/rdserr are omitted; speculative reads can raise them.
        !(sr.wrperr().bit()
            || sr.pgserr().bit()
            || sr.strberr().bit()
            || sr.incerr().bit()
            || sr.operr().bit()
            || sr.dbeccerr().bit())
    }
}

impl Flash for FlashCtl {
    fn erase_sector(&mut self, addr: u32) -> Result<(), FlashErr> {
        let (bank, sector) = self.bank_regs(addr);
        let sector_base = addr - addr % SECTOR_SIZE;

        cortex_m::interrupt::disable();
        self.scb
            .clean_dcache_by_address(sector_base as usize, SECTOR_SIZE as usize);

        Self::unlock(bank);
        Self::clear_errors(bank);
        bank.cr
            .modify(|_, w| unsafe { w.psize().bits(PSIZE_X64).snb().bits(sector as u8) });
        bank.cr.modify(|_, w| w.ser().set_bit());
        bank.cr.modify(|_, w| w.start().set_bit());
        Self::wait_idle(bank);
        let ok = Self::status_ok(bank);
        bank.cr.modify(|_, w| w.ser().clear_bit());
        Self::lock(bank);

        self.scb
            .clean_invalidate_dcache_by_address(sector_base as usize, SECTOR_SIZE as usize);
        unsafe { cortex_m::interrupt::enable() };

        if ok {
            Ok(())
        } else {
            Err(FlashErr::Erase)
        }
    }

    fn program_word(&mut self, addr: u32, word: &[u8; WORDLINE]) -> Result<(), FlashErr> {
        debug_assert_eq!(addr % WORDLINE as u32, 0);
        let (bank, _) = self.bank_regs(addr);

        cortex_m::interrupt::disable();
        self.scb
            .clean_dcache_by_address(addr as usize, WORDLINE);

        Self::unlock(bank);
        Self::clear_errors(bank);
        bank.cr
            .modify(|_, w| unsafe { w.psize().bits(PSIZE_X64).pg().set_bit() });

        for (i, chunk) in word.chunks_exact(4).enumerate() {
            let value = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            let dst = (addr as usize + i * 4) as *mut u32;
            unsafe { core::ptr::write_volatile(dst, value) };
        }
        cortex_m::asm::dsb();

        Self::wait_idle(bank);
        let ok = Self::status_ok(bank);
        bank.cr.modify(|_, w| w.pg().clear_bit());
        Self::lock(bank);

        self.scb
            .clean_invalidate_dcache_by_address(addr as usize, WORDLINE);
        unsafe { cortex_m::interrupt::enable() };

        if ok {
            Ok(())
        } else {
            Err(FlashErr::Program)
        }
    }

    fn read(&self, addr: u32, buf: &mut [u8]) {
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = unsafe { ((addr as usize + i) as *const u8).read_volatile() };
        }
    }

    fn invalidate_dcache(&mut self, addr: u32, len: u32) {
        self.scb
            .clean_invalidate_dcache_by_address(addr as usize, len as usize);
    }

    fn kick_watchdog(&mut self) {
        // Harmless if the independent watchdog was never started.
        let iwdg = unsafe { &*pac::IWDG::ptr() };
        iwdg.kr.write(|w| unsafe { w.key().bits(0xAAAA) });
    }
}

impl OptionBytes {
    /// Current state of the swap-banks option bit.
    pub fn read_swap(&self) -> bool {
        self.regs.optsr_cur.read().swap_bank_opt().bit()
    }

    /// Program the swap-banks bit and launch the option-byte reload. The
    /// reload remaps the banks and resets the device; if the hardware does
    /// not reset on its own, force it.
    ///
    /// Interrupts must be disabled at entry.
    pub fn set_swap(&mut self, enable: bool) -> ! {
        self.regs
            .optkeyr
            .write(|w| unsafe { w.optkeyr().bits(FLASH_OPT_KEY1) });
        self.regs
            .optkeyr
            .write(|w| unsafe { w.optkeyr().bits(FLASH_OPT_KEY2) });

        self.regs
            .optsr_prg
            .modify(|_, w| w.swap_bank_opt().bit(enable));
        self.regs.optcr.modify(|_, w| w.optstart().set_bit());

        while self.regs.optsr_cur.read().opt_busy().bit() {}

        cortex_m::asm::dsb();
        SCB::sys_reset();
    }
}
