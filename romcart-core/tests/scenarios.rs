// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

mod common;

use common::{CATALOG_URL, board_with_catalog, boot};
use romcart_common::constants::{ROM_IMAGE_FLASH_OFFSET, WIFI_CONNECT_ATTEMPTS};
use romcart_common::types::{ConfigKey, DeviceMode, HostCommand};
use romcart_core::boot::BootOutcome;
use romcart_core::error::NetworkError;
use romcart_core::hal::{ConfigStore, DownloadEngine, DownloadStatus};
use romcart_core::memory::{MemoryBoard, Staged};
use romcart_core::settings;

#[test]
fn empty_folder_shows_no_roms_message() {
    let mut board = MemoryBoard::new();
    board.storage.add_dir("/roms");
    board.terminal.push_line("b");

    assert_eq!(boot(&mut board), BootOutcome::Reset);
    let output = board.terminal.output();
    assert!(output.contains("No ROMs found in the SD card."));
    assert!(output.contains("or copy them to folder '/roms'"));
    assert!(!output.contains("Page "));
}

#[test]
fn remote_row_two_is_downloaded_and_selected() {
    let mut board = board_with_catalog();
    board.terminal.push_line("d");
    board.terminal.push_line("2");
    board.terminal.push_line("");
    board.terminal.push_idle(50);

    assert_eq!(boot(&mut board), BootOutcome::Reset);

    let output = board.terminal.output();
    assert!(output.contains("1. Alpha\n2. Bravo Two\n3. Charlie\n"));
    assert!(output.contains("ROM number: 2\n"));
    assert!(output.contains("Name: Bravo Two\n"));
    assert!(output.contains("Filename: bravo two.rom\n"));
    assert!(output.contains("Description: A platformer\n"));
    assert!(output.contains("Tags: game,platform\n"));
    assert!(output.contains("Size: 32 KB\n"));

    let targets = board.download.targets();
    assert_eq!(targets[0].0, CATALOG_URL);
    assert_eq!(
        targets.last().unwrap(),
        &(
            "http://roms.example.com/bravo%20two.rom".to_string(),
            "/roms/bravo two.rom".to_string()
        )
    );
    assert_eq!(board.download.starts(), 1);
    assert_eq!(board.download.status(), DownloadStatus::Idle);
    assert_eq!(
        settings::selected_rom(&board.config).as_deref(),
        Some("bravo two.rom")
    );
    assert!(output.contains("[L] Launch ROM: bravo two.rom"));
}

#[test]
fn wifi_timeouts_do_not_block_boot() {
    let mut board = board_with_catalog();
    for _ in 0..WIFI_CONNECT_ATTEMPTS {
        board.network.push_connect(Err(NetworkError::Timeout));
    }

    assert_eq!(boot(&mut board), BootOutcome::Reset);
    assert_eq!(board.network.connect_attempts(), WIFI_CONNECT_ATTEMPTS as usize);
    assert_eq!(board.download.targets().len(), 1);
    let output = board.terminal.output();
    assert!(output.contains("Configuring network"));
    assert!(output.contains("Network status: Not connected"));
}

#[test]
fn wifi_connects_on_a_later_attempt() {
    let mut board = board_with_catalog();
    board.network.push_connect(Err(NetworkError::Timeout));

    boot(&mut board);
    assert_eq!(board.network.connect_attempts(), 2);
    assert!(board.terminal.output().contains("Network status: Connected"));
}

#[test]
fn catalog_download_starts_after_delay() {
    let mut board = board_with_catalog();
    board.terminal.push_idle(40);

    boot(&mut board);
    assert_eq!(board.download.starts(), 1);
    assert_eq!(board.download.finishes(), 1);
    assert_eq!(settings::selected_rom(&board.config), None);
}

#[test]
fn launch_then_return_to_setup() {
    let mut board = MemoryBoard::new();
    board.storage.add_file("/roms/game.rom", &[0xAB, 0xCD, 0x01, 0x02]);
    board.terminal.push_line("b");
    board.terminal.push_line("1");
    board.terminal.push_line("l");

    assert_eq!(boot(&mut board), BootOutcome::Reset);
    assert_eq!(settings::device_mode(&board.config), DeviceMode::Direct);
    assert_eq!(
        board.flash.read(ROM_IMAGE_FLASH_OFFSET, 4),
        &[0xCD, 0xAB, 0x02, 0x01]
    );
    assert_eq!(board.cartridge.host_commands(), &[HostCommand::Reset]);

    board.button.press_after(3);
    assert_eq!(boot(&mut board), BootOutcome::Reset);
    assert!(matches!(
        board.cartridge.staged().last(),
        Some(Staged::CachedImage { .. })
    ));
    assert_eq!(settings::device_mode(&board.config), DeviceMode::Setup);
    assert_eq!(
        settings::selected_rom(&board.config).as_deref(),
        Some("game.rom")
    );
}

#[test]
fn alternate_app_clears_selection() {
    let mut board = MemoryBoard::new();
    board.config.put_string(ConfigKey::RomSelected, "game.rom");
    board.config.put_integer(ConfigKey::RomMode, DeviceMode::Setup.value());
    board.terminal.push_line("x");

    assert_eq!(boot(&mut board), BootOutcome::JumpToAlternateApp);
    assert_eq!(settings::selected_rom(&board.config), None);
    assert_eq!(settings::device_mode(&board.config), DeviceMode::Setup);
    assert!(board.config.commits() >= 1);
    assert!(board.terminal.output().contains("Launching Booster app..."));
}
