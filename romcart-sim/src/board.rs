// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

//! The remaining host collaborators: status LED, cartridge port and clock.

use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, trace, warn};
use romcart_common::constants::XIP_BASE;
use romcart_common::types::HostCommand;
use romcart_core::hal::{Cartridge, Clock, Indicator};

/// Status LED, reported through the log.
#[derive(Debug, Default)]
pub struct LogIndicator {
    lit: bool,
}

impl Indicator for LogIndicator {
    fn on(&mut self) {
        if !self.lit {
            debug!("LED on");
        }
        self.lit = true;
    }

    fn off(&mut self) {
        if self.lit {
            debug!("LED off");
        }
        self.lit = false;
    }

    fn toggle(&mut self) {
        self.lit = !self.lit;
        trace!("LED {}", if self.lit { "on" } else { "off" });
    }
}

/// Cartridge port.  Staging the cached image reads it back from the flash
/// image file and reports what would be served.
pub struct SimCartridge {
    flash_image: PathBuf,
}

impl SimCartridge {
    pub fn new(flash_image: PathBuf) -> Self {
        Self { flash_image }
    }
}

impl Cartridge for SimCartridge {
    fn stage_cached_image(&mut self, flash_address: u32, len: usize) {
        let offset = flash_address.saturating_sub(XIP_BASE) as usize;
        match fs::read(&self.flash_image) {
            Ok(image) => match image.get(offset..offset + len) {
                Some(rom) => {
                    let checksum = rom.iter().fold(0u32, |sum, &b| sum.wrapping_add(b as u32));
                    info!(
                        "Serving {} bytes from 0x{:08X}, checksum 0x{:08X}",
                        len, flash_address, checksum
                    );
                }
                None => warn!("Flash image too small to serve 0x{:08X}", flash_address),
            },
            Err(e) => warn!("Cannot read {}: {}", self.flash_image.display(), e),
        }
    }

    fn stage_menu_firmware(&mut self) {
        info!("Serving terminal firmware");
    }

    fn send_host_command(&mut self, command: HostCommand) {
        info!("Host command: {}", command);
    }
}

pub struct SystemClock {
    start: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    fn sleep_ms(&mut self, ms: u64) {
        thread::sleep(Duration::from_millis(ms));
    }
}
