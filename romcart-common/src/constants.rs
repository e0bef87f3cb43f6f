// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

//! Platform and catalog constants.

use static_assertions::const_assert;

/// Release version shown in the menu title.
pub const RELEASE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Base of the execute-in-place flash window.  Flash offsets passed to the
/// erase/program primitives are relative to this.
pub const XIP_BASE: u32 = 0x1000_0000;

/// Smallest erasable unit of the flash.
pub const FLASH_SECTOR_SIZE: usize = 4096;

/// Smallest programmable unit of the flash.
pub const FLASH_PAGE_SIZE: usize = 256;

/// Byte used to pad a partial final page before programming.
pub const FLASH_PAD_BYTE: u8 = 0x00;

/// Offset of the cached ROM image region from [`XIP_BASE`].
pub const ROM_IMAGE_FLASH_OFFSET: u32 = 0x0010_0000;

/// Absolute address of the cached ROM image region.
pub const ROM_IMAGE_FLASH_ADDRESS: u32 = XIP_BASE + ROM_IMAGE_FLASH_OFFSET;

/// Size of one ROM bank served to the host, and the number of banks.
pub const ROM_SIZE_BYTES: usize = 65536;
pub const ROM_BANKS: usize = 2;

/// Size of the cached ROM image region.
pub const ROM_IMAGE_SIZE: usize = ROM_SIZE_BYTES * ROM_BANKS;

/// Total size of the flash device.
pub const FLASH_SIZE: usize = ROM_IMAGE_FLASH_OFFSET as usize + ROM_IMAGE_SIZE;

/// Size of the optional container header some cartridge dumps carry.
pub const ROM_HEADER_SIZE: usize = 4;

/// Maximum number of entries held by the catalog.
pub const MAX_ROMS: usize = 100;

/// Catalog entries shown per page.
pub const ROMS_PER_PAGE: usize = 20;

/// Capacity of short text fields (display name, tags).
pub const MAX_FILENAME_LENGTH: usize = 36;

/// Capacity of long text fields (filename, path, description).
pub const MAX_PATH_SIZE: usize = 128;

/// Longest catalog document line accepted by the remote parser.
pub const MAX_CATALOG_LINE: usize = FLASH_PAGE_SIZE * 2;

/// File extensions recognised as ROM images, compared case-insensitively.
pub const ROM_EXTENSIONS: [&str; 4] = ["img", "rom", "stc", "bin"];

/// Default folder holding ROM images.
pub const DEFAULT_ROMS_FOLDER: &str = "/roms";

/// Name of the downloaded remote catalog inside the ROMs folder.
pub const CATALOG_CACHE_FILENAME: &str = "roms.csv";

/// Width of the host computer's text screen in characters.
pub const TERM_SCREEN_WIDTH: usize = 40;

/// Delay between a download being requested and it being started.
pub const DOWNLOAD_START_DELAY_MS: u64 = 3 * 1000;

/// Main loop and wait loop sleep interval.
pub const SLEEP_LOOP_MS: u64 = 100;

/// WiFi station connect attempts before giving up.
pub const WIFI_CONNECT_ATTEMPTS: u32 = 3;

const_assert!(FLASH_SECTOR_SIZE % FLASH_PAGE_SIZE == 0);
const_assert!(FLASH_PAGE_SIZE % 2 == 0);
const_assert!(ROM_IMAGE_FLASH_OFFSET as usize % FLASH_SECTOR_SIZE == 0);
const_assert!(ROM_IMAGE_SIZE % FLASH_SECTOR_SIZE == 0);
