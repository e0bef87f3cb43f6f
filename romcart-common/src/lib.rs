// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

//! romcart-common
//!
//! Types and constants shared between the ROM cartridge emulator control
//! plane (`romcart-core`) and the boards that run it (`romcart-sim`).

pub mod args;
pub mod constants;
pub mod types;
