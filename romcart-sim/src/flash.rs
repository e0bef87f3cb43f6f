// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

//! Flash backed by an image file.  The image is held in memory and written
//! back whenever interrupts are restored after a change.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{error, trace};
use romcart_common::constants::{FLASH_PAGE_SIZE, FLASH_SECTOR_SIZE, FLASH_SIZE};
use romcart_core::error::FlashError;
use romcart_core::hal::Flash;

pub struct FileFlash {
    path: PathBuf,
    data: Vec<u8>,
    interrupts_disabled: bool,
    dirty: bool,
}

impl FileFlash {
    /// Loads the image at `path`, creating an erased image if there is none.
    pub fn open(path: &Path) -> Result<Self> {
        let mut data = if path.exists() {
            fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?
        } else {
            Vec::new()
        };
        data.resize(FLASH_SIZE, 0xFF);
        Ok(Self {
            path: path.to_path_buf(),
            data,
            interrupts_disabled: false,
            dirty: false,
        })
    }

    #[cfg(test)]
    pub fn read(&self, offset: u32, len: usize) -> Option<&[u8]> {
        let start = offset as usize;
        self.data.get(start..start.checked_add(len)?)
    }

    fn range(&self, offset: u32, len: usize) -> Result<std::ops::Range<usize>, FlashError> {
        let start = offset as usize;
        if start + len > self.data.len() {
            return Err(FlashError::Range { offset, len });
        }
        if !self.interrupts_disabled {
            error!("Flash access at 0x{:08X} with interrupts enabled", offset);
        }
        Ok(start..start + len)
    }

    fn sync(&mut self) {
        if self.dirty {
            match fs::write(&self.path, &self.data) {
                Ok(()) => self.dirty = false,
                Err(e) => error!("Failed to write {}: {}", self.path.display(), e),
            }
        }
    }
}

impl Flash for FileFlash {
    fn erase(&mut self, offset: u32, len: usize) -> Result<(), FlashError> {
        if offset as usize % FLASH_SECTOR_SIZE != 0 || len % FLASH_SECTOR_SIZE != 0 {
            return Err(FlashError::Erase(offset));
        }
        let range = self.range(offset, len)?;
        trace!("Erase 0x{:08X} +{}", offset, len);
        self.data[range].fill(0xFF);
        self.dirty = true;
        Ok(())
    }

    fn program(&mut self, offset: u32, data: &[u8]) -> Result<(), FlashError> {
        if offset as usize % FLASH_PAGE_SIZE != 0 || data.len() % FLASH_PAGE_SIZE != 0 {
            return Err(FlashError::Program(offset));
        }
        let range = self.range(offset, data.len())?;
        trace!("Program 0x{:08X} +{}", offset, data.len());
        for (cell, byte) in self.data[range].iter_mut().zip(data) {
            *cell &= *byte;
        }
        self.dirty = true;
        Ok(())
    }

    fn disable_interrupts(&mut self) -> u32 {
        let saved = self.interrupts_disabled as u32;
        self.interrupts_disabled = true;
        saved
    }

    fn restore_interrupts(&mut self, saved: u32) {
        self.interrupts_disabled = saved != 0;
        if !self.interrupts_disabled {
            self.sync();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use romcart_core::flash::AtomicFlashAccess;

    #[test]
    fn writes_persist_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flash.bin");

        let mut flash = FileFlash::open(&path).unwrap();
        {
            let mut access = AtomicFlashAccess::new(&mut flash);
            access.erase(0, FLASH_SECTOR_SIZE).unwrap();
            access.program(0, &[0x5A; FLASH_PAGE_SIZE]).unwrap();
        }
        assert_eq!(fs::metadata(&path).unwrap().len(), FLASH_SIZE as u64);

        let flash = FileFlash::open(&path).unwrap();
        assert_eq!(flash.read(0, 2), Some(&[0x5A, 0x5A][..]));
        assert_eq!(flash.read(FLASH_PAGE_SIZE as u32, 1), Some(&[0xFF][..]));
        assert_eq!(flash.read(FLASH_SIZE as u32, 1), None);
    }

    #[test]
    fn rejects_misaligned_access() {
        let dir = tempfile::tempdir().unwrap();
        let mut flash = FileFlash::open(&dir.path().join("flash.bin")).unwrap();
        assert_eq!(flash.erase(1, FLASH_SECTOR_SIZE), Err(FlashError::Erase(1)));
        assert_eq!(flash.program(0, &[0; 10]), Err(FlashError::Program(0)));
    }
}
