// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

//! Local scanner - fills the catalog from the ROM images in a storage folder.

use log::{debug, info, warn};

use romcart_common::constants::{MAX_ROMS, ROM_EXTENSIONS};

use crate::catalog::{Catalog, Population, RomEntry, bounded, join_path, truncated};
use crate::error::{CapacityError, StorageError};
use crate::hal::Storage;

/// Whether `filename` has one of the recognised ROM image extensions
/// (case-insensitive).  A leading dot does not start an extension.
pub fn has_rom_extension(filename: &str) -> bool {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ROM_EXTENSIONS
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ext)),
        _ => false,
    }
}

fn local_entry(folder: &str, filename: &str) -> Result<RomEntry, CapacityError> {
    Ok(RomEntry {
        filename: bounded(filename, "filename")?,
        path: join_path(folder, filename)?,
        name: truncated(filename),
        ..Default::default()
    })
}

/// Replaces the catalog contents with the ROM images in `folder`.
///
/// Subdirectories, dot-files and files without a ROM extension are ignored.
/// Stops once the catalog is full, flagging `overflow`.  If the folder cannot
/// be listed the catalog is left empty and the error returned.
pub fn scan_folder(
    storage: &mut dyn Storage,
    folder: &str,
    catalog: &mut Catalog,
) -> Result<Population, StorageError> {
    catalog.clear();

    let listing = storage
        .read_dir(folder)
        .inspect_err(|e| warn!("Error opening directory {}: {}", folder, e))?;

    let mut population = Population::default();
    for dir_entry in listing {
        if dir_entry.is_dir || dir_entry.is_hidden || dir_entry.name.starts_with('.') {
            continue;
        }
        if !has_rom_extension(&dir_entry.name) {
            continue;
        }
        if catalog.is_full() {
            warn!("Maximum ROM count reached ({})", MAX_ROMS);
            population.overflow = true;
            break;
        }

        match local_entry(folder, &dir_entry.name) {
            Ok(entry) => {
                catalog.push(entry).map_err(|e| StorageError::Other(e.to_string()))?;
                population.added += 1;
            }
            Err(e) => {
                debug!("Skipping {}: {}", dir_entry.name, e);
                population.skipped += 1;
            }
        }
    }

    catalog.sort();

    info!("Found {} ROMs in {}", catalog.len(), folder);
    Ok(population)
}
