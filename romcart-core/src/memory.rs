// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

//! In-memory collaborators.
//!
//! A complete board held in memory, used by this crate's tests and by
//! anything else wanting to drive the control plane without hardware.
//! Scripted collaborators replay queued responses and record what they were
//! asked to do.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use romcart_common::constants::{FLASH_PAGE_SIZE, FLASH_SECTOR_SIZE, FLASH_SIZE};
use romcart_common::types::{ConfigKey, HostCommand, WifiMode};
use strum::IntoEnumIterator;

use crate::error::{DownloadError, FlashError, NetworkError, StorageError};
use crate::hal::{
    ButtonState, Cartridge, Clock, ConfigStore, DirEntry, DownloadEngine, DownloadStatus, Flash,
    Indicator, Network, Peripherals, SelectButton, Storage, StorageFile, Terminal,
};

fn normalise(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

fn child_of<'p>(path: &'p str, folder: &str) -> Option<&'p str> {
    let rest = if folder == "/" {
        path.strip_prefix('/')?
    } else {
        path.strip_prefix(folder)?.strip_prefix('/')?
    };
    (!rest.is_empty()).then_some(rest)
}

/// A file system of paths and byte vectors.  Folders exist if created with
/// [`add_dir`](Self::add_dir) or if they contain a file.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    files: BTreeMap<String, Vec<u8>>,
    dirs: BTreeSet<String>,
    hidden: BTreeSet<String>,
    read_limit: Option<usize>,
    fail_mount: bool,
    mounted: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limits every read to at most `limit` bytes
    pub fn with_read_limit(mut self, limit: usize) -> Self {
        self.read_limit = Some(limit.max(1));
        self
    }

    /// Makes [`Storage::mount`] fail, as if no card were inserted
    pub fn fail_mount(&mut self) {
        self.fail_mount = true;
    }

    pub fn add_file(&mut self, path: &str, data: &[u8]) {
        self.files.insert(normalise(path), data.to_vec());
    }

    /// Adds a file carrying the hidden attribute
    pub fn add_hidden_file(&mut self, path: &str, data: &[u8]) {
        self.add_file(path, data);
        self.hidden.insert(normalise(path));
    }

    pub fn add_dir(&mut self, path: &str) {
        self.dirs.insert(normalise(path));
    }

    pub fn file(&self, path: &str) -> Option<&[u8]> {
        self.files.get(&normalise(path)).map(Vec::as_slice)
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    fn folder_exists(&self, folder: &str) -> bool {
        folder == "/"
            || self.dirs.contains(folder)
            || self
                .dirs
                .iter()
                .chain(self.files.keys())
                .any(|path| child_of(path, folder).is_some())
    }
}

impl Storage for MemoryStorage {
    fn mount(&mut self, folder: &str) -> Result<(), StorageError> {
        if self.fail_mount {
            return Err(StorageError::NotMounted);
        }
        self.add_dir(folder);
        self.mounted = true;
        Ok(())
    }

    fn read_dir(&mut self, folder: &str) -> Result<Vec<DirEntry>, StorageError> {
        let folder = normalise(folder);
        if !self.folder_exists(&folder) {
            return Err(StorageError::NotFound(folder));
        }

        let mut listing: BTreeMap<String, DirEntry> = BTreeMap::new();
        for dir in &self.dirs {
            if let Some(rest) = child_of(dir, &folder) {
                let name = rest.split('/').next().unwrap_or(rest).to_string();
                listing.insert(
                    name.clone(),
                    DirEntry {
                        name,
                        is_dir: true,
                        is_hidden: false,
                    },
                );
            }
        }
        for path in self.files.keys() {
            if let Some(rest) = child_of(path, &folder) {
                let (name, is_dir) = match rest.split_once('/') {
                    Some((dir, _)) => (dir.to_string(), true),
                    None => (rest.to_string(), false),
                };
                let is_hidden = self.hidden.contains(path);
                listing.entry(name.clone()).or_insert(DirEntry {
                    name,
                    is_dir,
                    is_hidden,
                });
            }
        }
        Ok(listing.into_values().collect())
    }

    fn open(&mut self, path: &str) -> Result<Box<dyn StorageFile>, StorageError> {
        let path = normalise(path);
        let data = self
            .files
            .get(&path)
            .ok_or_else(|| StorageError::NotFound(path.clone()))?;
        Ok(Box::new(MemoryFile {
            data: data.clone(),
            position: 0,
            read_limit: self.read_limit,
        }))
    }
}

struct MemoryFile {
    data: Vec<u8>,
    position: usize,
    read_limit: Option<usize>,
}

impl StorageFile for MemoryFile {
    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, StorageError> {
        let remaining = &self.data[self.position..];
        let mut len = buf.len().min(remaining.len());
        if let Some(limit) = self.read_limit {
            len = len.min(limit);
        }
        buf[..len].copy_from_slice(&remaining[..len]);
        self.position += len;
        Ok(len)
    }

    fn seek(&mut self, position: u64) -> Result<(), StorageError> {
        let position = usize::try_from(position)
            .ok()
            .filter(|&p| p <= self.data.len())
            .ok_or_else(|| StorageError::Seek(format!("{} beyond end of file", position)))?;
        self.position = position;
        Ok(())
    }

    fn position(&self) -> u64 {
        self.position as u64
    }
}

/// NOR flash: erases to 0xFF, programming can only clear bits.
///
/// Checks alignment and bounds, and counts erase/program calls made without
/// interrupts disabled.
#[derive(Debug, Clone)]
pub struct MemoryFlash {
    data: Vec<u8>,
    interrupts_disabled: bool,
    unguarded_ops: usize,
    erase_count: usize,
    program_count: usize,
    fail_program_at: Option<u32>,
}

impl Default for MemoryFlash {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFlash {
    pub fn new() -> Self {
        Self {
            data: vec![0xFF; FLASH_SIZE],
            interrupts_disabled: false,
            unguarded_ops: 0,
            erase_count: 0,
            program_count: 0,
            fail_program_at: None,
        }
    }

    /// Makes programming at `offset` fail
    pub fn fail_program_at(&mut self, offset: u32) {
        self.fail_program_at = Some(offset);
    }

    pub fn read(&self, offset: u32, len: usize) -> &[u8] {
        &self.data[offset as usize..offset as usize + len]
    }

    pub fn interrupts_disabled(&self) -> bool {
        self.interrupts_disabled
    }

    pub fn unguarded_ops(&self) -> usize {
        self.unguarded_ops
    }

    pub fn erase_count(&self) -> usize {
        self.erase_count
    }

    pub fn program_count(&self) -> usize {
        self.program_count
    }

    fn check(&mut self, offset: u32, len: usize) -> Result<usize, FlashError> {
        if !self.interrupts_disabled {
            self.unguarded_ops += 1;
        }
        let start = offset as usize;
        if start + len > self.data.len() {
            return Err(FlashError::Range { offset, len });
        }
        Ok(start)
    }
}

impl Flash for MemoryFlash {
    fn erase(&mut self, offset: u32, len: usize) -> Result<(), FlashError> {
        let start = self.check(offset, len)?;
        if start % FLASH_SECTOR_SIZE != 0 || len % FLASH_SECTOR_SIZE != 0 {
            return Err(FlashError::Erase(offset));
        }
        self.data[start..start + len].fill(0xFF);
        self.erase_count += 1;
        Ok(())
    }

    fn program(&mut self, offset: u32, data: &[u8]) -> Result<(), FlashError> {
        let start = self.check(offset, data.len())?;
        if self.fail_program_at == Some(offset)
            || start % FLASH_PAGE_SIZE != 0
            || data.len() % FLASH_PAGE_SIZE != 0
        {
            return Err(FlashError::Program(offset));
        }
        for (cell, byte) in self.data[start..start + data.len()].iter_mut().zip(data) {
            *cell &= *byte;
        }
        self.program_count += 1;
        Ok(())
    }

    fn disable_interrupts(&mut self) -> u32 {
        let saved = self.interrupts_disabled as u32;
        self.interrupts_disabled = true;
        saved
    }

    fn restore_interrupts(&mut self, saved: u32) {
        self.interrupts_disabled = saved != 0;
    }
}

/// Configuration held in a map.  Unset keys read as their default, except
/// that an empty default reads as unset.
#[derive(Debug, Clone, Default)]
pub struct MemoryConfig {
    values: HashMap<ConfigKey, String>,
    saves: usize,
    commits: usize,
    fail_save: bool,
}

impl MemoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: ConfigKey, value: &str) -> Self {
        self.values.insert(key, value.to_string());
        self
    }

    pub fn fail_save(&mut self) {
        self.fail_save = true;
    }

    pub fn saves(&self) -> usize {
        self.saves
    }

    pub fn commits(&self) -> usize {
        self.commits
    }
}

impl ConfigStore for MemoryConfig {
    fn get(&self, key: ConfigKey) -> Option<String> {
        match self.values.get(&key) {
            Some(value) => Some(value.clone()),
            None => {
                let default = key.default_value();
                (!default.is_empty()).then(|| default.to_string())
            }
        }
    }

    fn put_string(&mut self, key: ConfigKey, value: &str) {
        self.values.insert(key, value.to_string());
    }

    fn put_integer(&mut self, key: ConfigKey, value: i64) {
        self.values.insert(key, value.to_string());
    }

    fn save(&mut self, commit: bool) -> Result<(), StorageError> {
        if self.fail_save {
            return Err(StorageError::Write("configuration".to_string()));
        }
        self.saves += 1;
        if commit {
            self.commits += 1;
        }
        Ok(())
    }

    fn entries(&self) -> Vec<(ConfigKey, String)> {
        ConfigKey::iter()
            .map(|key| (key, self.get(key).unwrap_or_default()))
            .collect()
    }

    fn reset(&mut self) {
        self.values.clear();
    }
}

/// Replays queued input lines and collects everything printed.
///
/// Each queued `None` is a loop iteration with no input.  Once the script
/// runs out every read returns the fallback line, `e` unless changed, so a
/// main loop always terminates.
#[derive(Debug, Clone)]
pub struct ScriptedTerminal {
    input: VecDeque<Option<String>>,
    fallback: Option<String>,
    output: String,
    clears: usize,
    refreshes: usize,
}

impl Default for ScriptedTerminal {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedTerminal {
    pub fn new() -> Self {
        Self {
            input: VecDeque::new(),
            fallback: Some("e".to_string()),
            output: String::new(),
            clears: 0,
            refreshes: 0,
        }
    }

    pub fn with_lines<'s>(lines: impl IntoIterator<Item = &'s str>) -> Self {
        let mut terminal = Self::new();
        for line in lines {
            terminal.push_line(line);
        }
        terminal
    }

    pub fn push_line(&mut self, line: &str) {
        self.input.push_back(Some(line.to_string()));
    }

    /// Queues `count` reads that return nothing
    pub fn push_idle(&mut self, count: usize) {
        self.input.extend(std::iter::repeat_n(None, count));
    }

    pub fn set_fallback(&mut self, fallback: Option<&str>) {
        self.fallback = fallback.map(str::to_string);
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    /// Returns and clears the collected output
    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }

    pub fn clears(&self) -> usize {
        self.clears
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes
    }
}

impl Terminal for ScriptedTerminal {
    fn print(&mut self, text: &str) {
        self.output.push_str(text);
    }

    fn clear_screen(&mut self) {
        self.clears += 1;
    }

    fn read_line(&mut self) -> Option<String> {
        match self.input.pop_front() {
            Some(line) => line,
            None => self.fallback.clone(),
        }
    }

    fn refresh(&mut self) {
        self.refreshes += 1;
    }
}

/// WiFi that replays queued connect results.  Connects succeed once the
/// queue is empty.
#[derive(Debug, Clone, Default)]
pub struct ScriptedNetwork {
    init_result: Option<NetworkError>,
    connect_results: VecDeque<Result<(), NetworkError>>,
    connected: bool,
    init_mode: Option<WifiMode>,
    connect_attempts: usize,
    polls: usize,
}

impl ScriptedNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_init(&mut self, error: NetworkError) {
        self.init_result = Some(error);
    }

    pub fn push_connect(&mut self, result: Result<(), NetworkError>) {
        self.connect_results.push_back(result);
    }

    pub fn init_mode(&self) -> Option<WifiMode> {
        self.init_mode
    }

    pub fn connect_attempts(&self) -> usize {
        self.connect_attempts
    }

    pub fn polls(&self) -> usize {
        self.polls
    }
}

impl Network for ScriptedNetwork {
    fn init(&mut self, mode: WifiMode) -> Result<(), NetworkError> {
        self.init_mode = Some(mode);
        match self.init_result {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn connect(&mut self) -> Result<(), NetworkError> {
        self.connect_attempts += 1;
        let result = self.connect_results.pop_front().unwrap_or(Ok(()));
        self.connected = result.is_ok();
        result
    }

    fn poll(&mut self) {
        self.polls += 1;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

/// A download engine that completes a started transfer after a fixed number
/// of polls.  Records targets and every call made.
#[derive(Debug, Clone)]
pub struct ScriptedDownloads {
    status: DownloadStatus,
    target: Option<(String, String)>,
    targets: Vec<(String, String)>,
    start_results: VecDeque<Result<(), DownloadError>>,
    polls_to_complete: usize,
    remaining_polls: usize,
    starts: usize,
    polls: usize,
    finishes: usize,
    confirms: usize,
}

impl Default for ScriptedDownloads {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedDownloads {
    pub fn new() -> Self {
        Self {
            status: DownloadStatus::Idle,
            target: None,
            targets: Vec::new(),
            start_results: VecDeque::new(),
            polls_to_complete: 1,
            remaining_polls: 0,
            starts: 0,
            polls: 0,
            finishes: 0,
            confirms: 0,
        }
    }

    pub fn with_polls_to_complete(mut self, polls: usize) -> Self {
        self.polls_to_complete = polls.max(1);
        self
    }

    /// Queues the result of the next `start`.  Starts succeed once the queue
    /// is empty.
    pub fn push_start(&mut self, result: Result<(), DownloadError>) {
        self.start_results.push_back(result);
    }

    /// Every `(url, destination)` set, oldest first
    pub fn targets(&self) -> &[(String, String)] {
        &self.targets
    }

    pub fn starts(&self) -> usize {
        self.starts
    }

    pub fn polls(&self) -> usize {
        self.polls
    }

    pub fn finishes(&self) -> usize {
        self.finishes
    }

    pub fn confirms(&self) -> usize {
        self.confirms
    }
}

impl DownloadEngine for ScriptedDownloads {
    fn set_target(&mut self, url: &str, destination: &str) {
        let target = (url.to_string(), destination.to_string());
        self.targets.push(target.clone());
        self.target = Some(target);
    }

    fn start(&mut self) -> Result<(), DownloadError> {
        self.starts += 1;
        if self.target.is_none() {
            return Err(DownloadError::NoTarget);
        }
        self.start_results.pop_front().unwrap_or(Ok(()))?;
        self.status = DownloadStatus::InProgress;
        self.remaining_polls = self.polls_to_complete;
        Ok(())
    }

    fn poll(&mut self) {
        self.polls += 1;
        if self.status == DownloadStatus::InProgress {
            self.remaining_polls = self.remaining_polls.saturating_sub(1);
            if self.remaining_polls == 0 {
                self.status = DownloadStatus::Completed;
            }
        }
    }

    fn status(&self) -> DownloadStatus {
        self.status
    }

    fn set_status(&mut self, status: DownloadStatus) {
        self.status = status;
    }

    fn finish(&mut self) -> Result<(), DownloadError> {
        self.finishes += 1;
        Ok(())
    }

    fn confirm(&mut self) -> Result<(), DownloadError> {
        self.confirms += 1;
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryIndicator {
    lit: bool,
    toggles: usize,
}

impl MemoryIndicator {
    pub fn is_on(&self) -> bool {
        self.lit
    }

    pub fn toggles(&self) -> usize {
        self.toggles
    }
}

impl Indicator for MemoryIndicator {
    fn on(&mut self) {
        self.lit = true;
    }

    fn off(&mut self) {
        self.lit = false;
    }

    fn toggle(&mut self) {
        self.lit = !self.lit;
        self.toggles += 1;
    }
}

/// Replays queued button states, then reports a long press.
#[derive(Debug, Clone, Default)]
pub struct ScriptedButton {
    states: VecDeque<ButtonState>,
    polls: usize,
}

impl ScriptedButton {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, state: ButtonState) {
        self.states.push_back(state);
    }

    /// Queues `count` released polls followed by a press
    pub fn press_after(&mut self, count: usize) {
        self.states
            .extend(std::iter::repeat_n(ButtonState::Released, count));
        self.states.push_back(ButtonState::Pressed);
    }

    pub fn polls(&self) -> usize {
        self.polls
    }
}

impl SelectButton for ScriptedButton {
    fn poll(&mut self) -> ButtonState {
        self.polls += 1;
        self.states
            .pop_front()
            .unwrap_or(ButtonState::LongPressed)
    }
}

/// What the cartridge was asked to serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staged {
    CachedImage { flash_address: u32, len: usize },
    MenuFirmware,
}

#[derive(Debug, Clone, Default)]
pub struct RecordingCartridge {
    staged: Vec<Staged>,
    host_commands: Vec<HostCommand>,
}

impl RecordingCartridge {
    pub fn staged(&self) -> &[Staged] {
        &self.staged
    }

    pub fn host_commands(&self) -> &[HostCommand] {
        &self.host_commands
    }
}

impl Cartridge for RecordingCartridge {
    fn stage_cached_image(&mut self, flash_address: u32, len: usize) {
        self.staged.push(Staged::CachedImage { flash_address, len });
    }

    fn stage_menu_firmware(&mut self) {
        self.staged.push(Staged::MenuFirmware);
    }

    fn send_host_command(&mut self, command: HostCommand) {
        self.host_commands.push(command);
    }
}

/// A clock that only moves when slept on or advanced.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: u64,
    sleeps: usize,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, ms: u64) {
        self.now += ms;
    }

    pub fn sleeps(&self) -> usize {
        self.sleeps
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now
    }

    fn sleep_ms(&mut self, ms: u64) {
        self.now += ms;
        self.sleeps += 1;
    }
}

/// One of each in-memory collaborator.
#[derive(Debug, Clone, Default)]
pub struct MemoryBoard {
    pub storage: MemoryStorage,
    pub flash: MemoryFlash,
    pub network: ScriptedNetwork,
    pub download: ScriptedDownloads,
    pub config: MemoryConfig,
    pub terminal: ScriptedTerminal,
    pub indicator: MemoryIndicator,
    pub button: ScriptedButton,
    pub cartridge: RecordingCartridge,
    pub clock: ManualClock,
}

impl MemoryBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn peripherals(&mut self) -> Peripherals<'_> {
        Peripherals {
            storage: &mut self.storage,
            flash: &mut self.flash,
            network: &mut self.network,
            download: &mut self.download,
            config: &mut self.config,
            terminal: &mut self.terminal,
            indicator: &mut self.indicator,
            button: &mut self.button,
            cartridge: &mut self.cartridge,
            clock: &mut self.clock,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_lists_direct_children() {
        let mut storage = MemoryStorage::new();
        storage.add_file("/roms/a.rom", b"a");
        storage.add_file("/roms/sub/b.rom", b"b");
        storage.add_hidden_file("/roms/c.rom", b"c");

        let listing = storage.read_dir("/roms/").unwrap();
        let names: Vec<(&str, bool, bool)> = listing
            .iter()
            .map(|e| (e.name.as_str(), e.is_dir, e.is_hidden))
            .collect();
        assert_eq!(
            names,
            [("a.rom", false, false), ("c.rom", false, true), ("sub", true, false)]
        );
        assert!(storage.read_dir("/other").is_err());
    }

    #[test]
    fn flash_is_nor_like() {
        let mut flash = MemoryFlash::new();
        let saved = flash.disable_interrupts();
        flash.erase(0, FLASH_SECTOR_SIZE).unwrap();
        flash.program(0, &[0x0F; FLASH_PAGE_SIZE]).unwrap();
        flash.program(0, &[0xF1; FLASH_PAGE_SIZE]).unwrap();
        flash.restore_interrupts(saved);

        assert_eq!(flash.read(0, 1), &[0x01]);
        assert_eq!(flash.unguarded_ops(), 0);
        assert!(flash.erase(100, FLASH_SECTOR_SIZE).is_err());
        assert!(flash.program(0, &[0; 3]).is_err());
        assert_eq!(flash.unguarded_ops(), 2);
    }

    #[test]
    fn config_defaults_and_reset() {
        let mut config = MemoryConfig::new();
        assert_eq!(config.get(ConfigKey::RomsFolder).as_deref(), Some("/roms"));
        assert_eq!(config.get(ConfigKey::RomSelected), None);
        config.put_integer(ConfigKey::RomMode, 1);
        assert_eq!(config.get(ConfigKey::RomMode).as_deref(), Some("1"));
        config.reset();
        assert_eq!(config.get(ConfigKey::RomMode).as_deref(), Some("255"));
    }
}
