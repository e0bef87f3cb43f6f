// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

//! Collaborator interfaces.
//!
//! The control plane drives the board only through these traits.  A firmware
//! build implements them over the real SD card, flash, WiFi chip and
//! cartridge port; `romcart-sim` implements them over the host; and
//! the `memory` module (feature `memory`) provides in-memory versions for tests.

use romcart_common::types::{ConfigKey, HostCommand, WifiMode};

use crate::error::{DownloadError, FlashError, NetworkError, StorageError};

/// A single folder listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
    pub is_hidden: bool,
}

/// An open file.
pub trait StorageFile {
    /// Size of the file in bytes
    fn size(&self) -> u64;

    /// Reads up to `buf.len()` bytes.  Returns 0 at end of file.  May return
    /// fewer bytes than requested before end of file.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Moves to an absolute position from the start of the file
    fn seek(&mut self, position: u64) -> Result<(), StorageError>;

    /// Current absolute position
    fn position(&self) -> u64;
}

/// The file system holding ROM images and the downloaded catalog.
pub trait Storage {
    /// Brings up the file system, creating `folder` if it does not exist
    fn mount(&mut self, folder: &str) -> Result<(), StorageError>;

    /// Lists the entries directly inside `folder`
    fn read_dir(&mut self, folder: &str) -> Result<Vec<DirEntry>, StorageError>;

    /// Opens `path` read-only
    fn open(&mut self, path: &str) -> Result<Box<dyn StorageFile>, StorageError>;
}

/// Nonvolatile flash.  Offsets are relative to
/// [`XIP_BASE`](romcart_common::constants::XIP_BASE).
///
/// Erase and program must only be called with interrupts disabled - use
/// [`AtomicFlashAccess`](crate::flash::AtomicFlashAccess) rather than calling
/// `disable_interrupts` directly.
pub trait Flash {
    /// Erases `len` bytes from a sector aligned `offset`
    fn erase(&mut self, offset: u32, len: usize) -> Result<(), FlashError>;

    /// Programs `data`, a whole number of pages, at a page aligned `offset`
    fn program(&mut self, offset: u32, data: &[u8]) -> Result<(), FlashError>;

    /// Disables interrupts, returning the state to restore
    fn disable_interrupts(&mut self) -> u32;

    /// Restores the interrupt state returned by `disable_interrupts`
    fn restore_interrupts(&mut self, saved: u32);
}

/// WiFi bring-up and the network stack.
pub trait Network {
    /// Initialises the WiFi chip in the given mode
    fn init(&mut self, mode: WifiMode) -> Result<(), NetworkError>;

    /// Makes one attempt to join the configured network as a station
    fn connect(&mut self) -> Result<(), NetworkError>;

    /// Services the network stack.  Called once per main loop iteration.
    fn poll(&mut self);

    /// Whether an address has been acquired
    fn is_connected(&self) -> bool;
}

/// Download engine status, owned by the engine and advanced by
/// [`DownloadOrchestrator`](crate::download::DownloadOrchestrator).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display)]
pub enum DownloadStatus {
    #[default]
    Idle,
    Requested,
    NotStarted,
    InProgress,
    Completed,
}

/// The background HTTP download engine.
pub trait DownloadEngine {
    /// Sets the URL to fetch and the storage path to write it to
    fn set_target(&mut self, url: &str, destination: &str);

    /// Starts the transfer.  On success the engine moves to `InProgress`.
    fn start(&mut self) -> Result<(), DownloadError>;

    /// Advances an in-progress transfer, moving to `Completed` when done
    fn poll(&mut self);

    fn status(&self) -> DownloadStatus;

    fn set_status(&mut self, status: DownloadStatus);

    /// Closes the transfer and commits the downloaded file
    fn finish(&mut self) -> Result<(), DownloadError>;

    /// Acknowledges a finished transfer
    fn confirm(&mut self) -> Result<(), DownloadError>;
}

/// Persistent key/value settings.
pub trait ConfigStore {
    fn get(&self, key: ConfigKey) -> Option<String>;

    fn put_string(&mut self, key: ConfigKey, value: &str);

    fn put_integer(&mut self, key: ConfigKey, value: i64);

    /// Persists pending changes.  `commit` forces them to nonvolatile storage.
    fn save(&mut self, commit: bool) -> Result<(), StorageError>;

    /// All keys and values, in key order
    fn entries(&self) -> Vec<(ConfigKey, String)>;

    /// Restores every key to its default
    fn reset(&mut self);
}

/// Line oriented text terminal on the host computer's screen.
pub trait Terminal {
    fn print(&mut self, text: &str);

    fn clear_screen(&mut self);

    /// Returns the next complete input line, if one has been typed.  Never
    /// blocks.
    fn read_line(&mut self) -> Option<String>;

    /// Pushes buffered output to the display
    fn refresh(&mut self) {}
}

/// Status LED.
pub trait Indicator {
    fn on(&mut self);

    fn off(&mut self);

    /// Toggles the LED, rate limited by the implementation
    fn toggle(&mut self);
}

/// State of the physical select button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    Released,

    /// A short press has completed (pushed and released)
    Pressed,

    /// Held long enough to request erase-and-reset
    LongPressed,
}

pub trait SelectButton {
    fn poll(&mut self) -> ButtonState;
}

/// The ROM emulation engine serving the host computer.
pub trait Cartridge {
    /// Copies the cached image at `flash_address` into execution memory and
    /// starts serving it
    fn stage_cached_image(&mut self, flash_address: u32, len: usize);

    /// Copies the terminal firmware into execution memory and starts serving
    /// it
    fn stage_menu_firmware(&mut self);

    /// Sends a command to the host computer's display driver
    fn send_host_command(&mut self, command: HostCommand);
}

/// Monotonic time and sleeping.
pub trait Clock {
    fn now_ms(&self) -> u64;

    fn sleep_ms(&mut self, ms: u64);
}

/// Every collaborator the control plane uses, borrowed for the duration of a
/// boot.
pub struct Peripherals<'a> {
    pub storage: &'a mut dyn Storage,
    pub flash: &'a mut dyn Flash,
    pub network: &'a mut dyn Network,
    pub download: &'a mut dyn DownloadEngine,
    pub config: &'a mut dyn ConfigStore,
    pub terminal: &'a mut dyn Terminal,
    pub indicator: &'a mut dyn Indicator,
    pub button: &'a mut dyn SelectButton,
    pub cartridge: &'a mut dyn Cartridge,
    pub clock: &'a mut dyn Clock,
}
