// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

use std::fmt;

use strum::{EnumIter, EnumString, IntoStaticStr};

use crate::constants::DEFAULT_ROMS_FOLDER;

/// What the device does at boot.  Persisted under [`ConfigKey::RomMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceMode {
    /// Serve the cached ROM image immediately
    Direct,

    /// Serve the cached ROM image once select is pressed (ripper style)
    Delayed,

    /// Interactive setup menu
    Setup,
}

impl DeviceMode {
    pub fn try_from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "direct" => Some(DeviceMode::Direct),
            "delayed" | "delay" => Some(DeviceMode::Delayed),
            "setup" => Some(DeviceMode::Setup),
            other => other.parse::<i64>().ok().and_then(Self::from_value),
        }
    }

    pub fn from_value(value: i64) -> Option<Self> {
        match value {
            0 => Some(DeviceMode::Direct),
            1 => Some(DeviceMode::Delayed),
            255 => Some(DeviceMode::Setup),
            _ => None,
        }
    }

    /// Value stored in the configuration
    pub fn value(&self) -> i64 {
        match self {
            DeviceMode::Direct => 0,
            DeviceMode::Delayed => 1,
            DeviceMode::Setup => 255,
        }
    }

    /// Whether booting in this mode serves the cached image rather than the
    /// menu
    pub fn emulates(&self) -> bool {
        matches!(self, DeviceMode::Direct | DeviceMode::Delayed)
    }
}

impl fmt::Display for DeviceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceMode::Direct => write!(f, "Direct"),
            DeviceMode::Delayed => write!(f, "Delayed"),
            DeviceMode::Setup => write!(f, "Setup"),
        }
    }
}

/// WiFi operating mode.  Persisted under [`ConfigKey::WifiMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiMode {
    /// Station - joins an existing network
    Sta,

    /// Access point - the device hosts its own network
    Ap,
}

impl WifiMode {
    pub fn from_value(value: i64) -> Option<Self> {
        match value {
            0 => Some(WifiMode::Sta),
            1 => Some(WifiMode::Ap),
            _ => None,
        }
    }

    pub fn value(&self) -> i64 {
        match self {
            WifiMode::Sta => 0,
            WifiMode::Ap => 1,
        }
    }
}

impl fmt::Display for WifiMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WifiMode::Sta => write!(f, "STA"),
            WifiMode::Ap => write!(f, "AP"),
        }
    }
}

/// Keys recognised in the persistent configuration store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum ConfigKey {
    RomMode,
    RomSelected,
    RomsFolder,
    RomHttpCatalog,
    RomHttpsCatalog,
    WifiMode,
}

impl ConfigKey {
    /// Value used when the key has never been written, or after an erase
    pub fn default_value(&self) -> &'static str {
        match self {
            ConfigKey::RomMode => "255",
            ConfigKey::RomSelected => "",
            ConfigKey::RomsFolder => DEFAULT_ROMS_FOLDER,
            ConfigKey::RomHttpCatalog => "",
            ConfigKey::RomHttpsCatalog => "",
            ConfigKey::WifiMode => "0",
        }
    }

    pub fn name(&self) -> &'static str {
        self.into()
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Commands sent to the host computer's display driver over the cartridge
/// port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCommand {
    /// Leave the terminal and continue booting to the desktop
    Continue,

    /// Reset the host computer
    Reset,
}

impl fmt::Display for HostCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostCommand::Continue => write!(f, "CONTINUE"),
            HostCommand::Reset => write!(f, "RESET"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn device_mode_values_round_trip_through_config() {
        for mode in [DeviceMode::Direct, DeviceMode::Delayed, DeviceMode::Setup] {
            assert_eq!(DeviceMode::from_value(mode.value()), Some(mode));
        }
        assert_eq!(DeviceMode::from_value(7), None);
        assert_eq!(DeviceMode::try_from_str(" 255 "), Some(DeviceMode::Setup));
        assert_eq!(DeviceMode::try_from_str("Delay"), Some(DeviceMode::Delayed));
        assert!(!DeviceMode::Setup.emulates());
    }

    #[test]
    fn config_key_names() {
        assert_eq!(ConfigKey::RomMode.name(), "ROM_MODE");
        assert_eq!(ConfigKey::RomHttpsCatalog.name(), "ROM_HTTPS_CATALOG");
        assert_eq!("roms_folder".parse::<ConfigKey>(), Ok(ConfigKey::RomsFolder));
        assert_eq!(ConfigKey::iter().count(), 6);
        assert_eq!(ConfigKey::RomsFolder.default_value(), "/roms");
    }
}
