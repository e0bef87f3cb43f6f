// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

//! Flash provisioner - writes a ROM image file into the cached image region
//! of flash.
//!
//! The file is processed one erase sector at a time:
//! - an optional 4 byte all-zero container header is skipped
//! - a partial final chunk is padded to a whole number of programming pages
//! - each 16-bit word is byte swapped, as the ROM server reads flash as
//!   big-endian words
//! - the destination sector is erased and programmed with interrupts
//!   disabled
//!
//! A failure part way through leaves the already written sectors in place.
//! Programming the same file again is how a failed write is recovered.

use core::ops::{Deref, DerefMut};

use log::{debug, info, warn};

use romcart_common::constants::{
    FLASH_PAD_BYTE, FLASH_PAGE_SIZE, FLASH_SECTOR_SIZE, ROM_HEADER_SIZE, XIP_BASE,
};

use crate::error::{FlashError, StorageError};
use crate::hal::{Flash, Storage, StorageFile};

/// Scoped exclusive access to the flash, with interrupts disabled.
///
/// Interrupts are restored when the guard is dropped, on every return path.
pub struct AtomicFlashAccess<'a> {
    flash: &'a mut dyn Flash,
    saved: u32,
}

impl<'a> AtomicFlashAccess<'a> {
    pub fn new(flash: &'a mut dyn Flash) -> Self {
        let saved = flash.disable_interrupts();
        Self { flash, saved }
    }
}

impl Drop for AtomicFlashAccess<'_> {
    fn drop(&mut self) {
        self.flash.restore_interrupts(self.saved);
    }
}

impl<'a> Deref for AtomicFlashAccess<'a> {
    type Target = dyn Flash + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.flash
    }
}

impl<'a> DerefMut for AtomicFlashAccess<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.flash
    }
}

/// Reads until `buf` is full or the file ends.  Returns the bytes read.
fn fill(file: &mut dyn StorageFile, buf: &mut [u8]) -> Result<usize, StorageError> {
    let mut filled = 0;
    while filled < buf.len() {
        let read = file.read(&mut buf[filled..])?;
        if read == 0 {
            break;
        }
        filled += read;
    }
    Ok(filled)
}

/// Pads `chunk[..len]` up to the next page boundary, returning the padded
/// length.
fn pad_to_page(chunk: &mut [u8], len: usize) -> usize {
    let padded = len.next_multiple_of(FLASH_PAGE_SIZE);
    chunk[len..padded].fill(FLASH_PAD_BYTE);
    padded
}

/// Swaps the bytes of each 16-bit word.
fn swap_halfwords(data: &mut [u8]) {
    for pair in data.chunks_exact_mut(2) {
        pair.swap(0, 1);
    }
}

/// Skips a leading all-zero header, if the file size says there may be one.
fn skip_header(file: &mut dyn StorageFile) -> Result<(), FlashError> {
    let size = file.size();
    let header_size = ROM_HEADER_SIZE as u64;
    if size <= header_size || (size - header_size) % FLASH_SECTOR_SIZE as u64 != 0 {
        return Ok(());
    }

    let mut header = [0u8; ROM_HEADER_SIZE];
    let read = fill(file, &mut header)?;
    if read != ROM_HEADER_SIZE {
        return Err(FlashError::ShortHeader(read));
    }

    if header.iter().all(|&b| b == 0) {
        debug!("Skipping {} byte header", ROM_HEADER_SIZE);
    } else {
        file.seek(0)?;
    }
    Ok(())
}

/// One sector's worth of image, and where it goes.
struct Staging {
    chunk: Vec<u8>,
    offset: u32,
}

impl Staging {
    fn new(offset: u32) -> Self {
        Self {
            chunk: vec![0; FLASH_SECTOR_SIZE],
            offset,
        }
    }

    /// Stages the next chunk of `file`.  Returns the unpadded and padded
    /// lengths, or `None` at end of file.
    fn load(&mut self, file: &mut dyn StorageFile) -> Result<Option<(usize, usize)>, FlashError> {
        let read = fill(file, &mut self.chunk)?;
        if read == 0 {
            return Ok(None);
        }
        let padded = pad_to_page(&mut self.chunk, read);
        swap_halfwords(&mut self.chunk[..padded]);
        Ok(Some((read, padded)))
    }

    fn write(&self, flash: &mut dyn Flash, padded: usize) -> Result<(), FlashError> {
        let mut access = AtomicFlashAccess::new(flash);
        access.erase(self.offset, padded.next_multiple_of(FLASH_SECTOR_SIZE))?;
        access.program(self.offset, &self.chunk[..padded])
    }
}

/// Programs the file at `source` into flash at the absolute address
/// `flash_address`.  Returns the number of image bytes written, excluding
/// any skipped header and page padding.
pub fn program_file(
    storage: &mut dyn Storage,
    flash: &mut dyn Flash,
    source: &str,
    flash_address: u32,
) -> Result<usize, FlashError> {
    let offset = flash_address
        .checked_sub(XIP_BASE)
        .ok_or(FlashError::Address(flash_address))?;

    let mut file = storage
        .open(source)
        .inspect_err(|e| warn!("Failed to open {}: {}", source, e))?;
    skip_header(file.as_mut())?;

    let mut staging = Staging::new(offset);
    let mut written = 0;
    while let Some((read, padded)) = staging.load(file.as_mut())? {
        staging
            .write(flash, padded)
            .inspect_err(|e| warn!("Flash write failed: {}", e))?;
        staging.offset += read as u32;
        written += read;
    }

    info!(
        "Programmed {} bytes from {} at 0x{:08X}",
        written, source, flash_address
    );
    Ok(written)
}
