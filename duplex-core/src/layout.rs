// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Slot geometry for the dual-bank flash layout.
//!
//! Both slots live at fixed *logical* addresses; the hardware bank swap
//! remaps which physical bank backs each window at reset. Code that operates
//! on addresses never needs the swap state. Only operations tied to bank
//! identity (erase/program register selection, whole-bank wipes) consult
//! [`physical_bank_base`].

/// Physical bank bases. Independent of the swap state.
pub const FLASH_BANK1_BASE: u32 = 0x0800_0000;
pub const FLASH_BANK2_BASE: u32 = 0x0810_0000;
pub const FLASH_BANK_SIZE: u32 = 0x0010_0000;

/// First 128 KiB of the boot bank is the bootloader itself.
pub const BOOTLOADER_SIZE: u32 = 0x0002_0000;

/// One slot: 896 KiB total, the last sector of which is the trailer.
pub const SLOT_TOTAL_SIZE: u32 = 0x000E_0000;
pub const TRAILER_SIZE: u32 = 0x0002_0000;
pub const SLOT_APP_SIZE: u32 = SLOT_TOTAL_SIZE - TRAILER_SIZE;

/// Physical erase unit (128 KiB on STM32H7).
pub const SECTOR_SIZE: u32 = 0x0002_0000;

/// Logical slot windows. The CPU always executes from the active window.
pub const ACTIVE_SLOT_BASE: u32 = FLASH_BANK1_BASE + BOOTLOADER_SIZE;
pub const INACTIVE_SLOT_BASE: u32 = FLASH_BANK2_BASE + BOOTLOADER_SIZE;

/// A slot's address layout: header + body at `base`, trailer sector at
/// `trailer_base = base + app_size`.
#[derive(Clone, Copy, Debug)]
pub struct Slot {
    pub base: u32,
    pub trailer_base: u32,
    pub app_size: u32,
}

impl Slot {
    const fn at(base: u32) -> Self {
        Slot {
            base,
            trailer_base: base + SLOT_APP_SIZE,
            app_size: SLOT_APP_SIZE,
        }
    }

    /// The slot the CPU executes from, at logical `0x0802_0000`.
    pub const fn active() -> Self {
        Self::at(ACTIVE_SLOT_BASE)
    }

    /// The update target slot, at logical `0x0812_0000`.
    pub const fn inactive() -> Self {
        Self::at(INACTIVE_SLOT_BASE)
    }

    /// End of the app region (exclusive); the trailer starts here.
    pub const fn app_end(&self) -> u32 {
        self.base + self.app_size
    }
}

/// Physical bank base backing the active (or inactive) logical window for a
/// given swap state.
pub fn physical_bank_base(active: bool, swapped: bool) -> u32 {
    if active {
        if swapped {
            FLASH_BANK2_BASE
        } else {
            FLASH_BANK1_BASE
        }
    } else if swapped {
        FLASH_BANK1_BASE
    } else {
        FLASH_BANK2_BASE
    }
}

/// One recognized RAM window for the initial stack pointer check.
#[derive(Clone, Copy, Debug)]
pub struct RamWindow {
    pub mask: u32,
    pub base: u32,
}

/// Address windows used by the vector-table sanity check.
#[derive(Clone, Copy, Debug)]
pub struct VectorWindows {
    pub ram: &'static [RamWindow],
    pub flash_start: u32,
    pub flash_end: u32,
}

impl VectorWindows {
    /// `true` iff `sp` points into one of the recognized RAM windows.
    pub fn stack_ok(&self, sp: u32) -> bool {
        self.ram.iter().any(|w| sp & w.mask == w.base)
    }

    /// `true` iff `pc` lies within the flash address space.
    pub fn reset_ok(&self, pc: u32) -> bool {
        (self.flash_start..self.flash_end).contains(&pc)
    }
}

/// Reference platform windows: stack in DTCM or AXI SRAM, reset handler
/// anywhere in the 2 MiB flash space.
pub const VECTOR_WINDOWS: VectorWindows = VectorWindows {
    ram: &[
        RamWindow { mask: 0x2FF0_0000, base: 0x2000_0000 }, // DTCM
        RamWindow { mask: 0x2FF0_0000, base: 0x2400_0000 }, // AXI SRAM
    ],
    flash_start: FLASH_BANK1_BASE,
    flash_end: FLASH_BANK2_BASE + FLASH_BANK_SIZE,
};
