// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

//! Simulated WiFi.  The host is assumed to be online; connecting can be
//! made to time out a configured number of times per boot.

use log::{info, trace};
use romcart_common::types::WifiMode;
use romcart_core::error::NetworkError;
use romcart_core::hal::Network;

pub struct SimNetwork {
    timeouts: u32,
    remaining_timeouts: u32,
    mode: Option<WifiMode>,
    connected: bool,
}

impl SimNetwork {
    pub fn new(timeouts: u32) -> Self {
        Self {
            timeouts,
            remaining_timeouts: timeouts,
            mode: None,
            connected: false,
        }
    }

    /// Drops the connection, as a device reset would
    pub fn power_cycle(&mut self) {
        self.remaining_timeouts = self.timeouts;
        self.mode = None;
        self.connected = false;
    }
}

impl Network for SimNetwork {
    fn init(&mut self, mode: WifiMode) -> Result<(), NetworkError> {
        info!("WiFi initialised in {} mode", mode);
        self.mode = Some(mode);
        Ok(())
    }

    fn connect(&mut self) -> Result<(), NetworkError> {
        if self.mode.is_none() {
            return Err(NetworkError::Init(-1));
        }
        if self.remaining_timeouts > 0 {
            self.remaining_timeouts -= 1;
            return Err(NetworkError::Timeout);
        }
        self.connected = true;
        Ok(())
    }

    fn poll(&mut self) {
        trace!("Network poll");
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
