// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

//! Error types, one per failure class.  Apart from storage bring-up, none of
//! these are fatal: callers log them and leave state as it was.

use thiserror::Error;

/// File system failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("storage not mounted")]
    NotMounted,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("failed to open {path}: {reason}")]
    Open { path: String, reason: String },
    #[error("read failed: {0}")]
    Read(String),
    #[error("seek failed: {0}")]
    Seek(String),
    #[error("write failed: {0}")]
    Write(String),
    #[error("storage error: {0}")]
    Other(String),
}

/// Failures while turning a file into a flash image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlashError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("short header read ({0} bytes)")]
    ShortHeader(usize),
    #[error("address 0x{0:08X} is below the flash window")]
    Address(u32),
    #[error("range 0x{offset:08X}+{len} is outside the flash")]
    Range { offset: u32, len: usize },
    #[error("erase failed at offset 0x{0:08X}")]
    Erase(u32),
    #[error("program failed at offset 0x{0:08X}")]
    Program(u32),
}

/// WiFi bring-up failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NetworkError {
    #[error("timed out connecting")]
    Timeout,
    #[error("initialisation failed ({0})")]
    Init(i32),
    #[error("connect failed ({0})")]
    Connect(i32),
}

/// Download engine failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DownloadError {
    #[error("no download target set")]
    NoTarget,
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("no network connection")]
    NoNetwork,
    #[error("transfer failed: {0}")]
    Transfer(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// A remote catalog line that does not follow the quoted-field grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("line {line}: expected '\"' before field {field}")]
    ExpectedQuote { line: usize, field: usize },
    #[error("line {line}: field {field} is not terminated")]
    Unterminated { line: usize, field: usize },
    #[error("line {line}: {field} is too long")]
    FieldTooLong { line: usize, field: &'static str },
    #[error("line {line}: longer than {limit} bytes")]
    LineTooLong { line: usize, limit: usize },
}

/// A bounded container was asked to hold more than it can.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{what} exceeds capacity of {capacity}")]
pub struct CapacityError {
    pub what: &'static str,
    pub capacity: usize,
}
