// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

//! Menu state machine.
//!
//! [`Session`] owns the catalog and every piece of menu state.  Each input
//! line is tokenised by [`crate::command`]; recognised commands are handled
//! directly, anything else goes to the default handler for the current menu
//! level (page/ROM numbers, and RETURN to confirm a download).
//!
//! Launch, AlternateApp and Exit end the session by clearing `keep_running`.

use log::{debug, info, warn};

use romcart_common::constants::ROM_IMAGE_FLASH_ADDRESS;
use romcart_common::types::{DeviceMode, HostCommand};

use crate::catalog::{Catalog, LongText, join_path};
use crate::command::{COMMANDS, Command, Input};
use crate::download::{catalog_cache_path, request_download, rom_download_url};
use crate::error::DownloadError;
use crate::flash::program_file;
use crate::hal::Peripherals;
use crate::remote::parse_catalog;
use crate::scan::scan_folder;
use crate::screen;
use crate::settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum MenuLevel {
    Main,
    BrowseLocal,
    BrowseRemote,

    /// Showing one remote entry, waiting for RETURN to download it
    BrowseRemoteDetail,

    Launch,
    Settings,
    Exit,
    AlternateApp,
}

/// Current menu level, and whether it is a submenu of another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuState {
    pub level: MenuLevel,
    pub submenu: bool,
}

impl MenuState {
    fn new(level: MenuLevel) -> Self {
        Self {
            level,
            submenu: level == MenuLevel::BrowseRemoteDetail,
        }
    }

    /// The level a submenu belongs to
    pub fn parent(&self) -> MenuLevel {
        match self.level {
            MenuLevel::BrowseRemoteDetail => MenuLevel::BrowseRemote,
            level => level,
        }
    }
}

/// The interactive session: catalog, menu state and selection state.
#[derive(Debug, Clone)]
pub struct Session {
    catalog: Catalog,
    menu: MenuState,
    roms_folder: String,
    keep_running: bool,
    jump_to_alternate: bool,
    delayed_launch: bool,

    /// Catalog index of the remote entry being shown in detail
    remote_selection: Option<usize>,

    /// Filename of the ROM being downloaded
    pending_download: Option<String>,
}

impl Session {
    pub fn new(roms_folder: &str) -> Self {
        Self {
            catalog: Catalog::new(),
            menu: MenuState::new(MenuLevel::Main),
            roms_folder: roms_folder.to_string(),
            keep_running: true,
            jump_to_alternate: false,
            delayed_launch: false,
            remote_selection: None,
            pending_download: None,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn menu(&self) -> MenuState {
        self.menu
    }

    pub fn level(&self) -> MenuLevel {
        self.menu.level
    }

    pub fn roms_folder(&self) -> &str {
        &self.roms_folder
    }

    pub fn keep_running(&self) -> bool {
        self.keep_running
    }

    /// Whether the session ended asking for the alternate application
    pub fn jump_to_alternate(&self) -> bool {
        self.jump_to_alternate
    }

    pub fn delayed_launch(&self) -> bool {
        self.delayed_launch
    }

    pub fn remote_selection(&self) -> Option<usize> {
        self.remote_selection
    }

    pub fn pending_download(&self) -> Option<&str> {
        self.pending_download.as_deref()
    }

    fn enter(&mut self, level: MenuLevel) {
        if self.menu.level != level {
            debug!("Menu {} -> {}", self.menu.level, level);
        }
        self.menu = MenuState::new(level);
    }

    /// Shows the main menu.  Called once when the session starts.
    pub fn start(&mut self, p: &mut Peripherals<'_>) {
        p.terminal.clear_screen();
        self.show_main(p);
        p.terminal.refresh();
    }

    /// Handles one line of terminal input.
    pub fn handle_line(&mut self, p: &mut Peripherals<'_>, line: &str) {
        let input = Input::parse(line);
        match input.command {
            Some(command) => {
                if self.remote_selection.take().is_some() {
                    debug!("Discarding remote selection");
                }
                self.run_command(p, command, input.arg);
            }
            None => self.default_handler(p, &input),
        }
    }

    fn run_command(&mut self, p: &mut Peripherals<'_>, command: Command, arg: &str) {
        match command {
            Command::Menu => self.show_main(p),
            Command::NextPage => self.turn_page(p, true),
            Command::PrevPage => self.turn_page(p, false),
            Command::Help => show_help(p),
            Command::Clear => p.terminal.clear_screen(),
            Command::BrowseLocal => self.browse_local(p),
            Command::BrowseRemote => self.browse_remote(p),
            Command::Launch => self.launch(p),
            Command::ToggleDelay => {
                self.delayed_launch = !self.delayed_launch;
                info!("Delayed launch {}", if self.delayed_launch { "on" } else { "off" });
                self.show_main(p);
            }
            Command::AlternateApp => {
                self.enter(MenuLevel::AlternateApp);
                p.terminal.print("Launching Booster app...\n");
                p.terminal.print("The computer will boot shortly...\n\n");
                p.terminal.print("If it doesn't boot, power it on and off.\n");
                self.jump_to_alternate = true;
                self.keep_running = false;
            }
            Command::Exit => {
                self.enter(MenuLevel::Exit);
                p.terminal.print("Exiting terminal...\n");
                p.cartridge.send_host_command(HostCommand::Continue);
                self.keep_running = false;
            }
            Command::Settings(command) => {
                self.enter(MenuLevel::Settings);
                settings::run(command, arg, p.config, p.terminal);
            }
        }
    }

    fn show_main(&mut self, p: &mut Peripherals<'_>) {
        self.enter(MenuLevel::Main);

        let terminal = &mut *p.terminal;
        screen::title(terminal);
        terminal.print("\n\n");
        terminal.print("[B] Browse ROMs in microSD card\n");
        terminal.print("[D] Download ROMs from internet server\n");
        terminal.print("[S] Settings\n\n");
        terminal.print("[E] Exit to desktop\n");
        terminal.print("[X] Return to booster menu\n\n");
        if self.delayed_launch {
            terminal.print("[R] Disable ROM delay/ripper mode\n");
        } else {
            terminal.print("[R] Enable ROM delay/ripper mode\n");
        }
        terminal.print("\n");
        if let Some(selected) = settings::selected_rom(&*p.config) {
            terminal.print(&screen::fit_line(&format!("[L] Launch ROM: {}", selected)));
        }
        terminal.print("\n");
        terminal.print("[M] Refresh this menu\n\n");
        terminal.print("Network status: ");
        if p.network.is_connected() {
            terminal.print("Connected\n");
        } else {
            terminal.print("Not connected\n");
        }
        terminal.print("\nSelect an option: ");
    }

    fn turn_page(&mut self, p: &mut Peripherals<'_>, forward: bool) {
        match self.menu.parent() {
            MenuLevel::BrowseLocal | MenuLevel::BrowseRemote => {
                self.enter(self.menu.parent());
                if forward {
                    self.catalog.next_page();
                } else {
                    self.catalog.prev_page();
                }
                screen::catalog_page(p.terminal, &self.catalog);
            }
            _ => self.show_main(p),
        }
    }

    fn browse_local(&mut self, p: &mut Peripherals<'_>) {
        if let Err(e) = scan_folder(p.storage, &self.roms_folder, &mut self.catalog) {
            warn!("Local scan failed: {}", e);
        }
        self.enter(MenuLevel::BrowseLocal);

        if self.catalog.is_empty() {
            p.terminal.print("No ROMs found in the SD card.\n");
            p.terminal.print("Download ROMs from internet,\n");
            p.terminal.print(&format!("or copy them to folder '{}'\n\n", self.roms_folder));
        } else {
            screen::catalog_page(p.terminal, &self.catalog);
        }
    }

    fn browse_remote(&mut self, p: &mut Peripherals<'_>) {
        let csv_path = catalog_cache_path(&self.roms_folder);
        if let Err(e) = parse_catalog(p.storage, &csv_path, &self.roms_folder, &mut self.catalog) {
            warn!("Remote catalog unavailable: {}", e);
        }
        self.enter(MenuLevel::BrowseRemote);

        if self.catalog.is_empty() {
            p.terminal.print("No ROMs in the download catalog.\n");
            p.terminal.print("Check the network connection,\n");
            p.terminal.print("then try again shortly.\n\n");
        } else {
            screen::catalog_page(p.terminal, &self.catalog);
        }
    }

    /// Parses a 1-based ROM number, returning the catalog index
    fn rom_index(&self, token: &str) -> Option<usize> {
        token
            .parse::<usize>()
            .ok()
            .filter(|&number| number >= 1 && number <= self.catalog.len())
            .map(|number| number - 1)
    }

    fn default_handler(&mut self, p: &mut Peripherals<'_>, input: &Input<'_>) {
        match self.menu.level {
            MenuLevel::Main => self.show_main(p),
            MenuLevel::BrowseLocal => match self.rom_index(input.key) {
                Some(index) => self.select_local(p, index),
                None => invalid_number(p),
            },
            MenuLevel::BrowseRemote => match self.rom_index(input.key) {
                Some(index) => {
                    if let Some(entry) = self.catalog.get(index) {
                        screen::entry_detail(p.terminal, index + 1, entry);
                    }
                    self.remote_selection = Some(index);
                    self.enter(MenuLevel::BrowseRemoteDetail);
                }
                None => invalid_number(p),
            },
            MenuLevel::BrowseRemoteDetail => {
                let selection = self.remote_selection.take();
                match selection {
                    Some(index) if input.is_empty() => self.confirm_download(p, index),
                    _ => {
                        self.enter(MenuLevel::BrowseRemote);
                        screen::catalog_page(p.terminal, &self.catalog);
                    }
                }
            }
            MenuLevel::Launch | MenuLevel::Exit | MenuLevel::AlternateApp => {}
            MenuLevel::Settings => {
                if !input.is_empty() {
                    p.terminal
                        .print("Unknown command. Type 'help' for a list of commands.\n");
                }
            }
        }
    }

    fn select_local(&mut self, p: &mut Peripherals<'_>, index: usize) {
        let Some(entry) = self.catalog.get(index) else {
            return;
        };
        let filename = entry.filename.to_string();
        p.terminal
            .print(&screen::fit_line(&format!("Selected ROM: {}", filename)));

        if let Err(e) = settings::set_selected_rom(p.config, &filename) {
            warn!("Failed to save selection: {}", e);
            p.terminal.print(&format!("Error saving selection: {}\n", e));
            return;
        }
        info!("Selected {}", filename);
        self.show_main(p);
    }

    fn confirm_download(&mut self, p: &mut Peripherals<'_>, index: usize) {
        let Some(entry) = self.catalog.get(index) else {
            self.show_main(p);
            return;
        };
        let filename = entry.filename.to_string();
        let destination = entry.path.to_string();

        if let Err(e) = settings::set_selected_rom(p.config, "") {
            warn!("Failed to clear selection: {}", e);
        }

        let url = settings::catalog_url(&*p.config)
            .ok_or_else(|| DownloadError::InvalidUrl(String::new()))
            .and_then(|catalog_url| rom_download_url(&catalog_url, &filename));
        match url {
            Ok(url) => {
                request_download(p.download, &url, &destination);
                self.pending_download = Some(filename);
                self.show_main(p);
            }
            Err(e) => {
                warn!("Cannot download {}: {}", filename, e);
                self.show_main(p);
                p.terminal.print("\nNo catalog URL configured.\n");
            }
        }
    }

    fn launch(&mut self, p: &mut Peripherals<'_>) {
        let Some(selected) = settings::selected_rom(&*p.config) else {
            self.show_main(p);
            p.terminal.print("\nNo ROM selected. Browse and pick one first.\n");
            return;
        };
        let source: LongText = match join_path(&self.roms_folder, &selected) {
            Ok(path) => path,
            Err(e) => {
                warn!("Cannot launch {}: {}", selected, e);
                p.terminal.print(&format!("Error loading ROM: {}\n", e));
                return;
            }
        };
        let previous = self.menu.level;

        self.enter(MenuLevel::Launch);
        p.terminal.print("The ROM will boot shortly...\n\n");
        if self.delayed_launch {
            p.terminal
                .print("ROM delay/ripper mode enabled. You must press SELECT to activate the ROM.\n");
        }
        p.terminal.print("To return to this menu, press SELECT\n");
        p.terminal.print("If ROM doesn't boot, reset the computer\n");
        p.terminal.refresh();

        info!("Loading {} into flash at 0x{:08X}", source, ROM_IMAGE_FLASH_ADDRESS);
        let mode = if self.delayed_launch {
            DeviceMode::Delayed
        } else {
            DeviceMode::Direct
        };
        let result = program_file(p.storage, p.flash, &source, ROM_IMAGE_FLASH_ADDRESS)
            .map_err(|e| e.to_string())
            .and_then(|_| settings::set_device_mode(p.config, mode).map_err(|e| e.to_string()));

        match result {
            Ok(()) => {
                info!("Launching {} in {} mode", selected, mode);
                self.keep_running = false;
            }
            Err(e) => {
                warn!("Error loading ROM into flash: {}", e);
                p.terminal.print(&format!("\nError loading ROM: {}\n", e));
                self.menu = MenuState::new(previous);
            }
        }
    }

    /// Called when the download orchestrator commits a download.  A ROM
    /// download becomes the selected ROM.
    pub fn on_download_complete(&mut self, p: &mut Peripherals<'_>) {
        let Some(filename) = self.pending_download.take() else {
            info!("Catalog download complete");
            return;
        };
        if let Err(e) = settings::set_selected_rom(p.config, &filename) {
            warn!("Failed to save selection: {}", e);
        }
        info!("Downloaded {}", filename);
        self.show_main(p);
        p.terminal.refresh();
    }

    pub fn on_download_failed(&mut self, p: &mut Peripherals<'_>, error: &DownloadError) {
        if let Some(filename) = self.pending_download.take() {
            p.terminal
                .print(&format!("\nDownload of {} failed: {}\n", filename, error));
            p.terminal.refresh();
        }
    }
}

fn invalid_number(p: &mut Peripherals<'_>) {
    p.terminal
        .print("Invalid ROM number. Please select a valid ROM number.\n");
}

fn show_help(p: &mut Peripherals<'_>) {
    p.terminal.print("Available commands:\n");
    for entry in COMMANDS {
        p.terminal
            .print(&screen::fit_line(&format!("  {:<8} {}", entry.key, entry.help)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{ConfigStore, DownloadEngine, DownloadStatus};
    use crate::memory::MemoryBoard;
    use romcart_common::types::ConfigKey;

    const CSV: &str = "\"URL\",\"Name\",\"Description\",\"Tags\",\"Size\"\n\
                       \"one.rom\",\"One\",\"First\",\"a\",\"16\"\n\
                       \"two.rom\",\"Two\",\"Second\",\"b\",\"32\"\n";

    fn board() -> MemoryBoard {
        let mut board = MemoryBoard::new();
        board.storage.add_file("/roms/b.rom", &[0x11; 64]);
        board.storage.add_file("/roms/a.img", &[0x22; 64]);
        board.storage.add_file("/roms/roms.csv", CSV.as_bytes());
        board
    }

    fn feed(board: &mut MemoryBoard, session: &mut Session, lines: &[&str]) {
        let mut p = board.peripherals();
        for line in lines {
            session.handle_line(&mut p, line);
        }
    }

    #[test]
    fn local_selection_is_persisted() {
        let mut board = board();
        let mut session = Session::new("/roms");
        feed(&mut board, &mut session, &["b"]);
        assert_eq!(session.level(), MenuLevel::BrowseLocal);
        assert!(board.terminal.take_output().contains("1. a.img\n2. b.rom\n"));

        feed(&mut board, &mut session, &["9"]);
        assert!(board.terminal.take_output().contains("Invalid ROM number"));
        assert_eq!(session.level(), MenuLevel::BrowseLocal);

        feed(&mut board, &mut session, &["2"]);
        assert_eq!(session.level(), MenuLevel::Main);
        assert_eq!(board.config.get(ConfigKey::RomSelected).as_deref(), Some("b.rom"));
        assert!(board.terminal.output().contains("[L] Launch ROM: b.rom"));
    }

    #[test]
    fn other_input_leaves_detail_view() {
        let mut board = board();
        let mut session = Session::new("/roms");
        feed(&mut board, &mut session, &["d", "1"]);
        assert_eq!(session.level(), MenuLevel::BrowseRemoteDetail);
        assert!(session.menu().submenu);
        assert_eq!(session.remote_selection(), Some(0));

        feed(&mut board, &mut session, &["zzz"]);
        assert_eq!(session.level(), MenuLevel::BrowseRemote);
        assert_eq!(session.remote_selection(), None);
        assert_eq!(board.download.status(), DownloadStatus::Idle);

        feed(&mut board, &mut session, &["2", "b"]);
        assert_eq!(session.remote_selection(), None);
        assert_eq!(session.level(), MenuLevel::BrowseLocal);
    }

    #[test]
    fn confirm_without_catalog_url_requests_nothing() {
        let mut board = board();
        board.config.put_string(ConfigKey::RomSelected, "old.rom");
        let mut session = Session::new("/roms");
        feed(&mut board, &mut session, &["d", "2", ""]);
        assert_eq!(session.level(), MenuLevel::Main);
        assert!(board.download.targets().is_empty());
        assert_eq!(session.pending_download(), None);
        assert!(board.terminal.output().contains("No catalog URL configured"));
    }

    #[test]
    fn launch_programs_flash_and_sets_mode() {
        let mut board = board();
        let mut session = Session::new("/roms");
        feed(&mut board, &mut session, &["b", "1", "r", "l"]);

        assert!(!session.keep_running());
        assert!(!session.jump_to_alternate());
        assert_eq!(session.level(), MenuLevel::Launch);
        assert_eq!(
            board.config.get(ConfigKey::RomMode).as_deref(),
            Some(DeviceMode::Delayed.value().to_string().as_str())
        );
        let offset = romcart_common::constants::ROM_IMAGE_FLASH_OFFSET;
        assert_eq!(board.flash.read(offset, 2), &[0x22, 0x22]);
    }

    #[test]
    fn failed_launch_keeps_mode_and_level() {
        let mut board = board();
        board.config.put_string(ConfigKey::RomSelected, "gone.rom");
        let mut session = Session::new("/roms");
        feed(&mut board, &mut session, &["m", "l"]);

        assert!(session.keep_running());
        assert_eq!(session.level(), MenuLevel::Main);
        assert_eq!(board.config.get(ConfigKey::RomMode).as_deref(), Some("255"));
        assert!(board.terminal.output().contains("Error loading ROM"));
    }

    #[test]
    fn launch_without_selection() {
        let mut board = board();
        let mut session = Session::new("/roms");
        feed(&mut board, &mut session, &["l"]);
        assert!(session.keep_running());
        assert_eq!(session.level(), MenuLevel::Main);
        assert!(board.terminal.output().contains("No ROM selected"));
        assert_eq!(board.flash.erase_count(), 0);
    }

    #[test]
    fn exit_and_alternate_app_end_the_session() {
        let mut board = board();
        let mut session = Session::new("/roms");
        feed(&mut board, &mut session, &["e"]);
        assert!(!session.keep_running());
        assert_eq!(session.level(), MenuLevel::Exit);
        assert_eq!(board.cartridge.host_commands(), &[HostCommand::Continue]);

        let mut session = Session::new("/roms");
        feed(&mut board, &mut session, &["X"]);
        assert!(!session.keep_running());
        assert!(session.jump_to_alternate());
        assert_eq!(session.level(), MenuLevel::AlternateApp);
    }

    #[test]
    fn paging_outside_browse_shows_main() {
        let mut board = board();
        let mut session = Session::new("/roms");
        feed(&mut board, &mut session, &["s", "n"]);
        assert_eq!(session.level(), MenuLevel::Main);
        feed(&mut board, &mut session, &["?"]);
        assert!(board.terminal.output().contains("Select an option: "));
    }

    #[test]
    fn settings_level_is_pass_through() {
        let mut board = board();
        let mut session = Session::new("/roms");
        feed(&mut board, &mut session, &["put_str roms_folder /games", "12"]);
        assert_eq!(session.level(), MenuLevel::Settings);
        assert_eq!(board.config.get(ConfigKey::RomsFolder).as_deref(), Some("/games"));
        assert!(board.terminal.output().contains("Unknown command"));
    }
}
