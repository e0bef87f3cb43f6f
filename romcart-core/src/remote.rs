// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

//! Remote catalog parser.
//!
//! The remote catalog is a CSV document, downloaded into the ROMs folder,
//! with a header line followed by one line per ROM:
//!
//! ```text
//! "URL","Name","Description","Tags","Size (KB)"
//! "game%20one.rom","Game%20One","A%20game","arcade","64"
//! ```
//!
//! Every field is double quoted and all but the size are percent-encoded.
//! Lines that break the quoting rules are skipped.

use std::borrow::Cow;

use log::{debug, info, warn};

use romcart_common::constants::{MAX_CATALOG_LINE, MAX_ROMS};

use crate::catalog::{Catalog, Population, RomEntry, bounded, join_path, truncated};
use crate::error::{ParseError, StorageError};
use crate::hal::{Storage, StorageFile};

/// Fields per catalog line: URL, name, description, tags, size.
pub const CATALOG_FIELDS: usize = 5;

const READ_CHUNK: usize = 512;

/// Decodes `%HH` escapes.  Malformed escapes are kept as-is and invalid
/// UTF-8 is replaced.
pub fn percent_decode(text: &str) -> String {
    let decoded = urlencoding::decode_binary(text.as_bytes());
    match String::from_utf8_lossy(&decoded) {
        Cow::Borrowed(s) => s.to_string(),
        Cow::Owned(s) => s,
    }
}

/// Parses the leading decimal digits of `text`, as the size field is
/// sometimes written "64KB".  Anything else is 0.
fn parse_size_kb(text: &str) -> u32 {
    let trimmed = text.trim_start();
    let digits = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    trimmed[..digits].parse().unwrap_or(0)
}

/// Splits a line into its quoted fields, without decoding them.
pub fn split_quoted_fields(
    line: &str,
    line_no: usize,
) -> Result<[&str; CATALOG_FIELDS], ParseError> {
    let mut fields = [""; CATALOG_FIELDS];
    let mut rest = line;
    for (index, field) in fields.iter_mut().enumerate() {
        rest = rest
            .trim_start()
            .strip_prefix('"')
            .ok_or(ParseError::ExpectedQuote {
                line: line_no,
                field: index + 1,
            })?;
        let end = rest.find('"').ok_or(ParseError::Unterminated {
            line: line_no,
            field: index + 1,
        })?;
        *field = &rest[..end];
        rest = rest[end + 1..].trim_start_matches(|c: char| c == ',' || c.is_whitespace());
    }
    Ok(fields)
}

/// Turns one data line into a catalog entry.  The entry's path is
/// `roms_folder/<decoded URL>`.
pub fn parse_catalog_line(
    line: &str,
    line_no: usize,
    roms_folder: &str,
) -> Result<RomEntry, ParseError> {
    let [url, name, description, tags, size] = split_quoted_fields(line, line_no)?;
    let url = percent_decode(url);

    let too_long = |field| ParseError::FieldTooLong {
        line: line_no,
        field,
    };

    Ok(RomEntry {
        filename: bounded(&url, "URL").map_err(|_| too_long("URL"))?,
        path: join_path(roms_folder, &url).map_err(|_| too_long("path"))?,
        name: truncated(&percent_decode(name)),
        description: truncated(&percent_decode(description)),
        tags: truncated(&percent_decode(tags)),
        size_kb: parse_size_kb(size),
    })
}

enum CatalogLine {
    Text(String),
    TooLong,
}

/// Reads a file line by line through a fixed chunk buffer, holding at most
/// [`MAX_CATALOG_LINE`] bytes of any one line.
struct LineReader<'a> {
    file: &'a mut dyn StorageFile,
    chunk: [u8; READ_CHUNK],
    filled: usize,
    pos: usize,
    eof: bool,
}

impl<'a> LineReader<'a> {
    fn new(file: &'a mut dyn StorageFile) -> Self {
        Self {
            file,
            chunk: [0; READ_CHUNK],
            filled: 0,
            pos: 0,
            eof: false,
        }
    }

    fn next_line(&mut self) -> Result<Option<CatalogLine>, StorageError> {
        let mut line: heapless::Vec<u8, MAX_CATALOG_LINE> = heapless::Vec::new();
        let mut overflow = false;
        let mut seen = false;

        loop {
            if self.pos == self.filled {
                if self.eof {
                    break;
                }
                self.filled = self.file.read(&mut self.chunk)?;
                self.pos = 0;
                if self.filled == 0 {
                    self.eof = true;
                    break;
                }
            }

            let byte = self.chunk[self.pos];
            self.pos += 1;
            seen = true;
            if byte == b'\n' {
                break;
            }
            if line.push(byte).is_err() {
                overflow = true;
            }
        }

        if !seen {
            return Ok(None);
        }
        if overflow {
            return Ok(Some(CatalogLine::TooLong));
        }
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Ok(Some(CatalogLine::Text(
            String::from_utf8_lossy(&line).into_owned(),
        )))
    }
}

/// Replaces the catalog contents with the entries in the catalog document at
/// `csv_path`.
///
/// The first line is a header and is discarded.  Malformed lines are counted
/// in `skipped`.  A read error part way through keeps the entries parsed so
/// far.  If the document cannot be opened the catalog is left empty and the
/// error returned.
pub fn parse_catalog(
    storage: &mut dyn Storage,
    csv_path: &str,
    roms_folder: &str,
    catalog: &mut Catalog,
) -> Result<Population, StorageError> {
    catalog.clear();

    let mut file = storage
        .open(csv_path)
        .inspect_err(|e| warn!("Error opening CSV file {}: {}", csv_path, e))?;
    let mut lines = LineReader::new(file.as_mut());
    let mut population = Population::default();

    match lines.next_line() {
        Ok(Some(_)) => {}
        Ok(None) => {
            warn!("Catalog {} is empty", csv_path);
            return Ok(population);
        }
        Err(e) => {
            warn!("Error reading header from {}: {}", csv_path, e);
            return Ok(population);
        }
    }

    let mut line_no = 1;
    loop {
        let line = match lines.next_line() {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("Error reading {} after line {}: {}", csv_path, line_no, e);
                break;
            }
        };
        line_no += 1;

        let text = match line {
            CatalogLine::Text(text) => text,
            CatalogLine::TooLong => {
                debug!(
                    "{}",
                    ParseError::LineTooLong {
                        line: line_no,
                        limit: MAX_CATALOG_LINE
                    }
                );
                population.skipped += 1;
                continue;
            }
        };
        if text.trim().is_empty() {
            continue;
        }

        match parse_catalog_line(&text, line_no, roms_folder) {
            Ok(entry) => {
                if catalog.is_full() {
                    warn!("Maximum ROM count reached ({})", MAX_ROMS);
                    population.overflow = true;
                    break;
                }
                catalog
                    .push(entry)
                    .map_err(|e| StorageError::Other(e.to_string()))?;
                population.added += 1;
            }
            Err(e) => {
                debug!("Skipping catalog line: {}", e);
                population.skipped += 1;
            }
        }
    }

    catalog.sort();

    info!("Found {} ROMs in CSV file", catalog.len());
    Ok(population)
}
