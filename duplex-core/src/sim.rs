// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! RAM-backed flash model for host tests.
//!
//! Models the properties the subsystem depends on: erased flash reads as
//! `0xFF`, programming is word-granular and only legal on erased words, and
//! erase is sector-granular. Violating a programming precondition panics so
//! a buggy caller fails its test instead of silently corrupting state.

use core::cell::RefCell;

use crate::flash::{Flash, FlashErr, WORDLINE};
use crate::layout::{FLASH_BANK1_BASE, FLASH_BANK2_BASE, FLASH_BANK_SIZE, SECTOR_SIZE};

pub struct SimFlash {
    base: u32,
    mem: Vec<u8>,
    /// Fail the next erase/program calls when set.
    pub fail_erase: bool,
    pub fail_program: bool,
    /// Record every `(addr, len)` read. Off by default; journal scans make
    /// the log enormous otherwise.
    pub track_reads: bool,
    reads: RefCell<Vec<(u32, usize)>>,
}

impl SimFlash {
    /// A device covering both banks, fully erased.
    pub fn new() -> Self {
        Self::with_range(FLASH_BANK1_BASE, (FLASH_BANK_SIZE * 2) as usize)
    }

    pub fn with_range(base: u32, len: usize) -> Self {
        SimFlash {
            base,
            mem: vec![0xFF; len],
            fail_erase: false,
            fail_program: false,
            track_reads: false,
            reads: RefCell::new(Vec::new()),
        }
    }

    fn idx(&self, addr: u32, len: usize) -> usize {
        let off = addr
            .checked_sub(self.base)
            .unwrap_or_else(|| panic!("address {addr:#010x} below flash base")) as usize;
        assert!(
            off + len <= self.mem.len(),
            "access at {addr:#010x}+{len} beyond flash end"
        );
        off
    }

    /// Raw poke for test setup; bypasses the programming rules.
    pub fn fill(&mut self, addr: u32, bytes: &[u8]) {
        let i = self.idx(addr, bytes.len());
        self.mem[i..i + bytes.len()].copy_from_slice(bytes);
    }

    /// Raw peek for assertions.
    pub fn get(&self, addr: u32, len: usize) -> &[u8] {
        let i = self.idx(addr, len);
        &self.mem[i..i + len]
    }

    /// Model the option-byte bank swap: exchange the contents of the two
    /// physical banks, as the remap makes the CPU see it after reset.
    pub fn swap_banks(&mut self) {
        let b1 = self.idx(FLASH_BANK1_BASE, FLASH_BANK_SIZE as usize);
        let b2 = self.idx(FLASH_BANK2_BASE, FLASH_BANK_SIZE as usize);
        for i in 0..FLASH_BANK_SIZE as usize {
            self.mem.swap(b1 + i, b2 + i);
        }
    }

    /// Every tracked `(addr, len)` read since the last [`Self::clear_reads`].
    pub fn reads(&self) -> Vec<(u32, usize)> {
        self.reads.borrow().clone()
    }

    pub fn clear_reads(&self) {
        self.reads.borrow_mut().clear();
    }
}

impl Default for SimFlash {
    fn default() -> Self {
        Self::new()
    }
}

impl Flash for SimFlash {
    fn erase_sector(&mut self, addr: u32) -> Result<(), FlashErr> {
        if self.fail_erase {
            return Err(FlashErr::Erase);
        }
        let sector_base = addr - (addr - self.base) % SECTOR_SIZE;
        let i = self.idx(sector_base, SECTOR_SIZE as usize);
        self.mem[i..i + SECTOR_SIZE as usize].fill(0xFF);
        Ok(())
    }

    fn program_word(&mut self, addr: u32, word: &[u8; WORDLINE]) -> Result<(), FlashErr> {
        assert_eq!(
            addr % WORDLINE as u32,
            0,
            "program at unaligned address {addr:#010x}"
        );
        if self.fail_program {
            return Err(FlashErr::Program);
        }
        let i = self.idx(addr, WORDLINE);
        assert!(
            self.mem[i..i + WORDLINE].iter().all(|&b| b == 0xFF),
            "program of non-erased word at {addr:#010x}"
        );
        self.mem[i..i + WORDLINE].copy_from_slice(word);
        Ok(())
    }

    fn read(&self, addr: u32, buf: &mut [u8]) {
        if self.track_reads {
            self.reads.borrow_mut().push((addr, buf.len()));
        }
        let i = self.idx(addr, buf.len());
        buf.copy_from_slice(&self.mem[i..i + buf.len()]);
    }
}
