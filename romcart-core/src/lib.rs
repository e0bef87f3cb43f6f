// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

//! romcart-core
//!
//! Control plane of the ROM cartridge emulator: the ROM catalog, the
//! terminal menu, flash provisioning, background downloads and the
//! boot/run orchestrator.
//!
//! Everything outside the control plane (storage, flash, WiFi, the download
//! engine, configuration, terminal, LED, select button, cartridge port and
//! time) is reached through the traits in [`hal`].  A board implements them
//! and hands them to [`boot::Orchestrator`]:
//!
//! ```
//! use romcart_core::boot::{BootOutcome, Orchestrator};
//! use romcart_core::memory::MemoryBoard;
//!
//! let mut board = MemoryBoard::new();
//! board.terminal.push_line("e");
//! let outcome = Orchestrator::new(board.peripherals()).run();
//! assert_eq!(outcome, BootOutcome::Reset);
//! ```

pub mod boot;
pub mod catalog;
pub mod command;
pub mod download;
pub mod error;
pub mod flash;
pub mod hal;
#[cfg(any(test, feature = "memory"))]
pub mod memory;
pub mod menu;
pub mod remote;
pub mod scan;
pub mod screen;
pub mod settings;
