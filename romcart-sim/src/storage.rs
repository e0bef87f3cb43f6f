// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

//! SD card backed by a host directory.  Device paths such as `/roms/a.rom`
//! resolve under the root directory.

use std::fs::{self, File};
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use log::debug;
use romcart_core::error::StorageError;
use romcart_core::hal::{DirEntry, Storage, StorageFile};

/// Maps a device path onto the host directory `root`.
pub fn host_path(root: &Path, path: &str) -> PathBuf {
    root.join(path.trim_start_matches('/'))
}

fn io_error(path: &Path, e: std::io::Error) -> StorageError {
    match e.kind() {
        ErrorKind::NotFound => StorageError::NotFound(path.display().to_string()),
        _ => StorageError::Open {
            path: path.display().to_string(),
            reason: e.to_string(),
        },
    }
}

pub struct DirStorage {
    root: PathBuf,
}

impl DirStorage {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }
}

impl Storage for DirStorage {
    fn mount(&mut self, folder: &str) -> Result<(), StorageError> {
        if !self.root.is_dir() {
            return Err(StorageError::NotMounted);
        }
        let path = host_path(&self.root, folder);
        fs::create_dir_all(&path).map_err(|e| io_error(&path, e))?;
        debug!("Mounted {} at {}", folder, path.display());
        Ok(())
    }

    fn read_dir(&mut self, folder: &str) -> Result<Vec<DirEntry>, StorageError> {
        let path = host_path(&self.root, folder);
        let mut listing = Vec::new();
        for entry in fs::read_dir(&path).map_err(|e| io_error(&path, e))? {
            let entry = entry.map_err(|e| StorageError::Read(e.to_string()))?;
            let file_type = entry
                .file_type()
                .map_err(|e| StorageError::Read(e.to_string()))?;
            listing.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: file_type.is_dir(),
                is_hidden: false,
            });
        }
        Ok(listing)
    }

    fn open(&mut self, path: &str) -> Result<Box<dyn StorageFile>, StorageError> {
        let host = host_path(&self.root, path);
        let file = File::open(&host).map_err(|e| io_error(&host, e))?;
        let size = file
            .metadata()
            .map_err(|e| io_error(&host, e))?
            .len();
        Ok(Box::new(HostFile {
            file,
            size,
            position: 0,
        }))
    }
}

struct HostFile {
    file: File,
    size: u64,
    position: u64,
}

impl StorageFile for HostFile {
    fn size(&self) -> u64 {
        self.size
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, StorageError> {
        let read = self
            .file
            .read(buf)
            .map_err(|e| StorageError::Read(e.to_string()))?;
        self.position += read as u64;
        Ok(read)
    }

    fn seek(&mut self, position: u64) -> Result<(), StorageError> {
        self.position = self
            .file
            .seek(SeekFrom::Start(position))
            .map_err(|e| StorageError::Seek(e.to_string()))?;
        Ok(())
    }

    fn position(&self) -> u64 {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use romcart_core::catalog::Catalog;
    use romcart_core::scan::scan_folder;

    #[test]
    fn scans_and_reads_host_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = DirStorage::new(dir.path());
        storage.mount("/roms").unwrap();
        fs::write(dir.path().join("roms/game.rom"), [1u8, 2, 3, 4, 5]).unwrap();
        fs::write(dir.path().join("roms/notes.txt"), b"x").unwrap();
        fs::create_dir(dir.path().join("roms/sub.rom")).unwrap();

        let mut catalog = Catalog::new();
        scan_folder(&mut storage, "/roms", &mut catalog).unwrap();
        assert_eq!(catalog.len(), 1);

        let mut file = storage.open("/roms/game.rom").unwrap();
        assert_eq!(file.size(), 5);
        let mut buf = [0u8; 3];
        assert_eq!(file.read(&mut buf).unwrap(), 3);
        file.seek(1).unwrap();
        assert_eq!(file.read(&mut buf).unwrap(), 3);
        assert_eq!(buf, [2, 3, 4]);
        assert_eq!(file.position(), 4);
    }

    #[test]
    fn missing_paths_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = DirStorage::new(dir.path());
        assert!(matches!(storage.read_dir("/roms"), Err(StorageError::NotFound(_))));
        assert!(matches!(storage.open("/roms/a.rom"), Err(StorageError::NotFound(_))));

        let mut missing = DirStorage::new(&dir.path().join("no-card"));
        assert_eq!(missing.mount("/roms"), Err(StorageError::NotMounted));
    }
}
