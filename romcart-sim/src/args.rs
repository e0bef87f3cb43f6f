// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[clap(
    name = "romcart-sim",
    about = "ROM cartridge emulator control plane, running on the host",
    version
)]
pub struct Args {
    /// Directory standing in for the SD card
    #[clap(long, default_value = "./sdcard")]
    pub root: PathBuf,

    /// File holding the flash image
    #[clap(long, default_value = "./flash.bin")]
    pub flash_image: PathBuf,

    /// JSON settings file
    #[clap(long, default_value = "./romcart.json")]
    pub config: PathBuf,

    /// WiFi connect attempts that time out before one succeeds
    #[clap(long, default_value_t = 0)]
    pub wifi_timeouts: u32,

    /// Log filter (error, warn, info, debug, trace), overriding RUST_LOG
    #[clap(long)]
    pub log_level: Option<String>,

    /// Sets ROM_HTTP_CATALOG before booting
    #[clap(long)]
    pub catalog_url: Option<String>,
}
