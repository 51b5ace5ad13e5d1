// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Core logic for the duplex dual-slot firmware update subsystem.
//!
//! This crate holds everything that does not touch hardware directly: the
//! on-flash data model (image header, trailer records), the flash access
//! trait, the trailer journal, the image verifier, the boot decision state
//! machine, the application-side confirmer and the image ingest writer.
//!
//! It supports both `no_std` (target) and `std` (host) environments:
//! - Default: `no_std` mode for the bootloader and application binaries
//! - `std` feature: enables the simulated flash used by the host test suite
//! - `embedded` feature: enables the STM32H7 flash and option-byte drivers
//! - `defmt` feature: enables logging from the boot decision path

#![cfg_attr(not(feature = "std"), no_std)]

pub mod confirm;
pub mod decision;
pub mod flash;
pub mod image;
pub mod ingest;
pub mod layout;
pub mod trailer;
pub mod verify;

// STM32H7 flash controller and option-byte drivers (requires embedded feature)
#[cfg(feature = "embedded")]
pub mod hw;

// RAM-backed flash model for host tests (requires std feature)
#[cfg(feature = "std")]
pub mod sim;

// Re-export commonly used types
pub use decision::{decide, Outcome, MAX_ATTEMPTS};
pub use flash::{Flash, FlashErr, WORDLINE};
pub use image::{ImageHeader, SemVer, HDR_SIZE, IMG_HDR_MAGIC, IMG_HDR_VER};
pub use layout::{Slot, VectorWindows};
pub use trailer::{Journal, SlotState, TrailerErr, TrailerRecord, TR_MAGIC};
pub use verify::{inspect, ImageFault, ImageView};
