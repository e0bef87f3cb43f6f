// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

#![allow(dead_code)]

use romcart_common::types::ConfigKey;
use romcart_core::boot::{BootOutcome, Orchestrator};
use romcart_core::hal::ConfigStore;
use romcart_core::memory::MemoryBoard;

pub const CATALOG_URL: &str = "http://roms.example.com/catalog/roms.csv";

pub const CATALOG_CSV: &str = "\"URL\",\"Name\",\"Description\",\"Tags\",\"Size (KB)\"\n\
\"alpha.rom\",\"Alpha\",\"The%20first%20one\",\"demo\",\"16\"\n\
\"bravo%20two.rom\",\"Bravo%20Two\",\"A%20platformer\",\"game%2Cplatform\",\"32\"\n\
\"charlie.stc\",\"Charlie\",\"Third\",\"tool\",\"64\"\n";

/// A board with a ROMs folder, a cached remote catalog and a catalog URL.
pub fn board_with_catalog() -> MemoryBoard {
    let mut board = MemoryBoard::new();
    board.storage.add_dir("/roms");
    board.storage.add_file("/roms/roms.csv", CATALOG_CSV.as_bytes());
    board.config.put_string(ConfigKey::RomHttpCatalog, CATALOG_URL);
    board
}

pub fn boot(board: &mut MemoryBoard) -> BootOutcome {
    Orchestrator::new(board.peripherals()).run()
}
