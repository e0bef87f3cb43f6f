// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

//! Boot/run orchestrator.
//!
//! Reads the persisted device mode and either:
//! - serves the cached ROM image until select is pressed (Direct/Delayed), or
//! - runs the setup menu: storage and network bring-up, the catalog
//!   download, then the main loop until the session ends.
//!
//! [`Orchestrator::run`] returns what the board should do next rather than
//! resetting the device itself.

use log::{debug, error, info, warn};

use romcart_common::constants::{
    ROM_IMAGE_FLASH_ADDRESS, ROM_IMAGE_SIZE, SLEEP_LOOP_MS, WIFI_CONNECT_ATTEMPTS,
};
use romcart_common::types::{ConfigKey, DeviceMode, HostCommand, WifiMode};

use crate::command::Input;
use crate::download::{DownloadOrchestrator, DownloadStep, catalog_cache_path, request_download};
use crate::error::NetworkError;
use crate::hal::{ButtonState, Peripherals};
use crate::menu::Session;
use crate::screen;
use crate::settings;

/// What the board must do once [`Orchestrator::run`] returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum BootOutcome {
    /// Reset the device, booting again in the persisted mode
    Reset,

    /// Jump to the alternate (booster) application
    JumpToAlternateApp,

    /// Restore default settings, then reset
    EraseAndReset,
}

/// A long press of select, seen while waiting for something else.
struct LongPress;

pub struct Orchestrator<'a> {
    p: Peripherals<'a>,
    session: Session,
    downloads: DownloadOrchestrator,
}

impl<'a> Orchestrator<'a> {
    pub fn new(p: Peripherals<'a>) -> Self {
        let roms_folder = settings::roms_folder(&*p.config);
        Self {
            p,
            session: Session::new(&roms_folder),
            downloads: DownloadOrchestrator::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Runs one boot to completion.
    pub fn run(&mut self) -> BootOutcome {
        let mode = settings::device_mode(&*self.p.config);
        info!("Starting in {} mode", mode);

        if mode.emulates() {
            self.run_emulation(mode)
        } else {
            self.run_setup()
        }
    }

    /// Blocks until select is pressed, optionally blinking the indicator.
    fn wait_for_select(&mut self, blink: bool) -> Result<(), LongPress> {
        loop {
            match self.p.button.poll() {
                ButtonState::Pressed => return Ok(()),
                ButtonState::LongPressed => return Err(LongPress),
                ButtonState::Released => {
                    if blink {
                        self.p.indicator.toggle();
                    }
                    self.p.clock.sleep_ms(SLEEP_LOOP_MS);
                }
            }
        }
    }

    fn run_emulation(&mut self, mode: DeviceMode) -> BootOutcome {
        if mode == DeviceMode::Delayed {
            info!("Waiting for select before serving ROM");
            if self.wait_for_select(true).is_err() {
                return BootOutcome::EraseAndReset;
            }
        }

        debug!(
            "Staging cached image 0x{:08X}, {} bytes",
            ROM_IMAGE_FLASH_ADDRESS, ROM_IMAGE_SIZE
        );
        self.p
            .cartridge
            .stage_cached_image(ROM_IMAGE_FLASH_ADDRESS, ROM_IMAGE_SIZE);
        self.p.indicator.on();

        if self.wait_for_select(false).is_err() {
            return BootOutcome::EraseAndReset;
        }

        info!("Select pressed, returning to setup");
        if let Err(e) = settings::set_device_mode(self.p.config, DeviceMode::Setup) {
            error!("Failed to save device mode: {}", e);
        }
        BootOutcome::Reset
    }

    fn run_setup(&mut self) -> BootOutcome {
        self.p.cartridge.stage_menu_firmware();

        let roms_folder = self.session.roms_folder().to_string();
        if let Err(e) = self.p.storage.mount(&roms_folder) {
            error!("Error initialising storage: {}", e);
            return self.storage_recovery();
        }
        info!("Storage ready, ROMs in {}", roms_folder);

        screen::title(self.p.terminal);
        self.p.terminal.print("\n\nConfiguring network... please wait...\n");
        self.p.terminal.refresh();

        if self.connect_network() {
            info!("Network connected");
        }
        self.request_catalog(&roms_folder);

        self.session.start(&mut self.p);
        self.p.indicator.on();

        while self.session.keep_running() {
            self.tick();
        }

        self.p.cartridge.send_host_command(HostCommand::Reset);
        self.p.clock.sleep_ms(SLEEP_LOOP_MS);

        if self.session.jump_to_alternate() {
            self.p.config.put_string(ConfigKey::RomSelected, "");
            if let Err(e) = settings::set_device_mode(self.p.config, DeviceMode::Setup) {
                error!("Failed to save settings: {}", e);
            }
            BootOutcome::JumpToAlternateApp
        } else {
            BootOutcome::Reset
        }
    }

    /// One main loop iteration: network, terminal, downloads, sleep.
    fn tick(&mut self) {
        self.p.network.poll();

        if let Some(line) = self.p.terminal.read_line() {
            self.session.handle_line(&mut self.p, &line);
            self.p.terminal.refresh();
        }

        let now = self.p.clock.now_ms();
        match self.downloads.step(self.p.download, now) {
            DownloadStep::Completed => self.session.on_download_complete(&mut self.p),
            DownloadStep::Failed(e) => self.session.on_download_failed(&mut self.p, &e),
            _ => {}
        }

        self.p.clock.sleep_ms(SLEEP_LOOP_MS);
    }

    /// Shown when storage cannot be brought up.  Keeps servicing the network
    /// and terminal until a long press.
    fn storage_recovery(&mut self) -> BootOutcome {
        screen::title(self.p.terminal);
        self.p.terminal.print("\n\nSD card error.\n");
        self.p.terminal.print("Check the card is inserted correctly.\n");
        self.p.terminal.print("Insert card and restart the computer.\n");
        self.p.terminal.refresh();

        loop {
            self.p.network.poll();
            if let Some(line) = self.p.terminal.read_line() {
                match Input::parse(&line).command {
                    Some(command) if command.available_without_storage() => {
                        self.session.handle_line(&mut self.p, &line);
                        self.p.terminal.refresh();
                    }
                    _ => debug!("Ignoring {:?} without storage", line.trim()),
                }
            }
            self.p.indicator.toggle();
            if self.p.button.poll() == ButtonState::LongPressed {
                warn!("Long press, erasing settings");
                return BootOutcome::EraseAndReset;
            }
            self.p.clock.sleep_ms(SLEEP_LOOP_MS);
        }
    }

    /// Brings up WiFi in station mode, retrying timeouts.  Returns whether
    /// the network connected.  Never blocks beyond the retry budget.
    fn connect_network(&mut self) -> bool {
        let Some(mode) = settings::wifi_mode(&*self.p.config) else {
            info!("No WiFi mode configured, not initialising network");
            return false;
        };
        if mode == WifiMode::Ap {
            info!("WiFi mode is AP, not initialising network");
            return false;
        }

        if let Err(e) = self.p.network.init(WifiMode::Sta) {
            warn!("Error initialising network: {}", e);
            return false;
        }

        for attempt in 1..=WIFI_CONNECT_ATTEMPTS {
            match self.p.network.connect() {
                Ok(()) => return true,
                Err(NetworkError::Timeout) => {
                    warn!(
                        "Timeout connecting to WiFi (attempt {}/{})",
                        attempt, WIFI_CONNECT_ATTEMPTS
                    );
                }
                Err(e) => {
                    warn!("Error connecting to WiFi: {}", e);
                    return false;
                }
            }
        }

        warn!(
            "Giving up on WiFi after {} attempts, continuing without network",
            WIFI_CONNECT_ATTEMPTS
        );
        false
    }

    fn request_catalog(&mut self, roms_folder: &str) {
        match settings::catalog_url(&*self.p.config) {
            Some(url) => request_download(self.p.download, &url, &catalog_cache_path(roms_folder)),
            None => info!("No catalog URL configured"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{ConfigStore, DownloadEngine, DownloadStatus};
    use crate::memory::{MemoryBoard, Staged};

    #[test]
    fn direct_mode_serves_until_select() {
        let mut board = MemoryBoard::new();
        board.config.put_integer(ConfigKey::RomMode, 0);
        board.button.press_after(5);

        let outcome = Orchestrator::new(board.peripherals()).run();
        assert_eq!(outcome, BootOutcome::Reset);
        assert_eq!(
            board.cartridge.staged(),
            &[Staged::CachedImage {
                flash_address: ROM_IMAGE_FLASH_ADDRESS,
                len: ROM_IMAGE_SIZE
            }]
        );
        assert_eq!(board.button.polls(), 6);
        assert_eq!(settings::device_mode(&board.config), DeviceMode::Setup);
        assert!(board.terminal.output().is_empty());
        assert_eq!(board.indicator.toggles(), 0);
    }

    #[test]
    fn delayed_mode_waits_before_staging() {
        let mut board = MemoryBoard::new();
        board.config.put_integer(ConfigKey::RomMode, 1);
        board.button.press_after(2);

        let outcome = Orchestrator::new(board.peripherals()).run();
        assert_eq!(outcome, BootOutcome::EraseAndReset);
        assert_eq!(board.cartridge.staged().len(), 1);
        assert_eq!(settings::device_mode(&board.config), DeviceMode::Delayed);
        assert_eq!(board.indicator.toggles(), 2);
    }

    #[test]
    fn long_press_before_staging_erases() {
        let mut board = MemoryBoard::new();
        board.config.put_integer(ConfigKey::RomMode, 1);
        board.button.push(ButtonState::LongPressed);

        let outcome = Orchestrator::new(board.peripherals()).run();
        assert_eq!(outcome, BootOutcome::EraseAndReset);
        assert!(board.cartridge.staged().is_empty());
    }

    #[test]
    fn storage_failure_enters_recovery() {
        let mut board = MemoryBoard::new();
        board.storage.fail_mount();
        board.button.push(ButtonState::Released);
        board.button.push(ButtonState::Pressed);
        board.terminal.set_fallback(None);

        let outcome = Orchestrator::new(board.peripherals()).run();
        assert_eq!(outcome, BootOutcome::EraseAndReset);
        assert_eq!(board.cartridge.staged(), &[Staged::MenuFirmware]);
        assert!(board.terminal.output().contains("SD card error."));
        assert_eq!(board.indicator.toggles(), 3);
        assert_eq!(board.network.polls(), 3);
    }

    #[test]
    fn recovery_only_accepts_settings_and_help() {
        let mut board = MemoryBoard::new();
        board.storage.fail_mount();
        board.terminal.push_line("x");
        board.terminal.push_line("b");
        board.terminal.push_line("put_str roms_folder /sd");
        board.terminal.set_fallback(None);
        board.button.push(ButtonState::Released);
        board.button.push(ButtonState::Released);
        board.button.push(ButtonState::Released);

        let outcome = Orchestrator::new(board.peripherals()).run();
        assert_eq!(outcome, BootOutcome::EraseAndReset);
        assert!(!board.terminal.output().contains("Booster"));
        assert!(board.cartridge.host_commands().is_empty());
        assert_eq!(settings::roms_folder(&board.config), "/sd");
        assert_eq!(settings::device_mode(&board.config), DeviceMode::Setup);
    }

    #[test]
    fn ap_mode_skips_network() {
        let mut board = MemoryBoard::new();
        board.config.put_integer(ConfigKey::WifiMode, 1);
        board
            .config
            .put_string(ConfigKey::RomHttpCatalog, "http://host/roms.csv");

        let outcome = Orchestrator::new(board.peripherals()).run();
        assert_eq!(outcome, BootOutcome::Reset);
        assert_eq!(board.network.init_mode(), None);
        assert_eq!(
            board.download.targets(),
            &[("http://host/roms.csv".to_string(), "/roms/roms.csv".to_string())]
        );
    }

    #[test]
    fn connect_error_stops_retrying() {
        let mut board = MemoryBoard::new();
        board.network.push_connect(Err(NetworkError::Connect(-2)));

        Orchestrator::new(board.peripherals()).run();
        assert_eq!(board.network.connect_attempts(), 1);
        assert_eq!(board.network.init_mode(), Some(WifiMode::Sta));
    }

    #[test]
    fn exit_resets_without_touching_settings() {
        let mut board = MemoryBoard::new();
        board.terminal.push_line("e");

        let outcome = Orchestrator::new(board.peripherals()).run();
        assert_eq!(outcome, BootOutcome::Reset);
        assert_eq!(
            board.cartridge.host_commands(),
            &[HostCommand::Continue, HostCommand::Reset]
        );
        assert_eq!(board.config.saves(), 0);
        assert_eq!(board.download.status(), DownloadStatus::Idle);
    }
}
