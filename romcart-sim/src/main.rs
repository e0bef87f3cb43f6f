// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

//! romcart-sim
//!
//! Runs the ROM cartridge emulator control plane on the host.  A directory
//! stands in for the SD card, a file for the flash, stdin/stdout for the
//! host computer's terminal and select button.  Each device reset reboots
//! the control plane with the persisted settings.

mod args;
mod board;
mod config;
mod console;
mod download;
mod flash;
mod network;
mod storage;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use romcart_common::types::ConfigKey;
use romcart_core::boot::{BootOutcome, Orchestrator};
use romcart_core::hal::{ConfigStore, Peripherals};
use romcart_core::settings;

use crate::args::Args;
use crate::board::{LogIndicator, SimCartridge, SystemClock};
use crate::config::JsonConfig;
use crate::download::HttpDownloads;
use crate::flash::FileFlash;
use crate::network::SimNetwork;
use crate::storage::DirStorage;

fn init_logging(level: Option<&str>) {
    match level {
        Some(level) => env_logger::Builder::new().parse_filters(level).init(),
        None => env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .init(),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_level.as_deref());

    std::fs::create_dir_all(&args.root)
        .with_context(|| format!("Failed to create {}", args.root.display()))?;

    let mut storage = DirStorage::new(&args.root);
    let mut flash = FileFlash::open(&args.flash_image)
        .with_context(|| format!("Failed to open flash image {}", args.flash_image.display()))?;
    let mut config = JsonConfig::load(&args.config)
        .with_context(|| format!("Failed to load settings {}", args.config.display()))?;
    let mut network = SimNetwork::new(args.wifi_timeouts);
    let mut download = HttpDownloads::new(&args.root)?;
    let (mut terminal, mut button) = console::spawn();
    let mut indicator = LogIndicator::default();
    let mut cartridge = SimCartridge::new(args.flash_image.clone());
    let mut clock = SystemClock::default();

    if let Some(url) = &args.catalog_url {
        config.put_string(ConfigKey::RomHttpCatalog, url);
        config
            .save(true)
            .map_err(|e| anyhow::anyhow!("Failed to save catalog URL: {}", e))?;
    }

    loop {
        let outcome = Orchestrator::new(Peripherals {
            storage: &mut storage,
            flash: &mut flash,
            network: &mut network,
            download: &mut download,
            config: &mut config,
            terminal: &mut terminal,
            indicator: &mut indicator,
            button: &mut button,
            cartridge: &mut cartridge,
            clock: &mut clock,
        })
        .run();
        info!("Boot ended: {}", outcome);

        match outcome {
            BootOutcome::Reset => {}
            BootOutcome::JumpToAlternateApp => {
                println!("\nJumping to the alternate application.");
                break;
            }
            BootOutcome::EraseAndReset => {
                settings::erase(&mut config)
                    .map_err(|e| anyhow::anyhow!("Failed to erase settings: {}", e))?;
                info!("Settings erased");
            }
        }

        if terminal.is_closed() {
            info!("Console closed, powering off");
            break;
        }
        network.power_cycle();
        info!("Resetting device");
    }

    Ok(())
}
