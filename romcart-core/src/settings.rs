// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

//! Typed access to the configuration store, and the terminal settings
//! commands.

use log::{info, warn};

use romcart_common::args::{parse_bool, parse_config_key};
use romcart_common::constants::DEFAULT_ROMS_FOLDER;
use romcart_common::types::{ConfigKey, DeviceMode, WifiMode};

use crate::command::{COMMANDS, Command, SettingsCommand};
use crate::error::StorageError;
use crate::hal::{ConfigStore, Terminal};

fn non_empty(config: &dyn ConfigStore, key: ConfigKey) -> Option<String> {
    config
        .get(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// The persisted device mode.  Missing or unrecognised values mean Setup.
pub fn device_mode(config: &dyn ConfigStore) -> DeviceMode {
    let Some(value) = non_empty(config, ConfigKey::RomMode) else {
        info!("ROM_MODE not set, using Setup");
        return DeviceMode::Setup;
    };
    match value.parse::<i64>().ok().and_then(DeviceMode::from_value) {
        Some(mode) => mode,
        None => {
            warn!("Invalid ROM_MODE {}, using Setup", value);
            DeviceMode::Setup
        }
    }
}

pub fn set_device_mode(config: &mut dyn ConfigStore, mode: DeviceMode) -> Result<(), StorageError> {
    config.put_integer(ConfigKey::RomMode, mode.value());
    config.save(true)
}

/// Filename of the selected ROM, if one is selected.
pub fn selected_rom(config: &dyn ConfigStore) -> Option<String> {
    non_empty(config, ConfigKey::RomSelected)
}

/// Persists `filename` as the selected ROM.  An empty filename clears the
/// selection.
pub fn set_selected_rom(config: &mut dyn ConfigStore, filename: &str) -> Result<(), StorageError> {
    config.put_string(ConfigKey::RomSelected, filename);
    config.save(true)
}

pub fn roms_folder(config: &dyn ConfigStore) -> String {
    non_empty(config, ConfigKey::RomsFolder).unwrap_or_else(|| DEFAULT_ROMS_FOLDER.to_string())
}

/// The remote catalog URL, preferring HTTPS.
pub fn catalog_url(config: &dyn ConfigStore) -> Option<String> {
    non_empty(config, ConfigKey::RomHttpsCatalog)
        .or_else(|| non_empty(config, ConfigKey::RomHttpCatalog))
}

/// WiFi mode, or `None` if WiFi is not configured.  Anything other than AP
/// is treated as station mode.
pub fn wifi_mode(config: &dyn ConfigStore) -> Option<WifiMode> {
    let value = non_empty(config, ConfigKey::WifiMode)?;
    match value.parse::<i64>().ok().and_then(WifiMode::from_value) {
        Some(mode) => Some(mode),
        None => {
            warn!("Invalid WIFI_MODE {}, using STA", value);
            Some(WifiMode::Sta)
        }
    }
}

/// Restores every setting to its default and saves.
pub fn erase(config: &mut dyn ConfigStore) -> Result<(), StorageError> {
    config.reset();
    config.save(true)
}

fn print_entries(config: &dyn ConfigStore, terminal: &mut dyn Terminal) {
    for (key, value) in config.entries() {
        terminal.print(&format!("{}={}\n", key, value));
    }
}

fn report(terminal: &mut dyn Terminal, result: Result<(), StorageError>, done: &str) {
    match result {
        Ok(()) => terminal.print(&format!("{}\n", done)),
        Err(e) => {
            warn!("Failed to save settings: {}", e);
            terminal.print(&format!("Error saving settings: {}\n", e));
        }
    }
}

/// Splits `<key> <value>`, parsing the key.  The value may be empty.
fn key_and_value(arg: &str) -> Result<(ConfigKey, &str), String> {
    let (key, value) = match arg.split_once(char::is_whitespace) {
        Some((key, value)) => (key, value.trim()),
        None => (arg, ""),
    };
    if key.is_empty() {
        return Err("Missing setting name".to_string());
    }
    Ok((parse_config_key(key)?, value))
}

/// Runs one settings command against the configuration store.
pub fn run(
    command: SettingsCommand,
    arg: &str,
    config: &mut dyn ConfigStore,
    terminal: &mut dyn Terminal,
) {
    let result = match command {
        SettingsCommand::Show => {
            terminal.print("Settings commands:\n");
            for entry in COMMANDS
                .iter()
                .filter(|entry| matches!(entry.command, Command::Settings(_)))
            {
                terminal.print(&format!("  {:<22} {}\n", entry.usage, entry.help));
            }
            terminal.print("\n");
            print_entries(config, terminal);
            Ok(())
        }
        SettingsCommand::Print => {
            print_entries(config, terminal);
            Ok(())
        }
        SettingsCommand::Save => {
            report(terminal, config.save(true), "Settings saved");
            Ok(())
        }
        SettingsCommand::Erase => {
            report(terminal, erase(config), "Settings erased");
            Ok(())
        }
        SettingsCommand::Get => parse_config_key(arg).map(|key| match config.get(key) {
            Some(value) => terminal.print(&format!("{}={}\n", key, value)),
            None => terminal.print(&format!("Setting not found: {}\n", key)),
        }),
        SettingsCommand::PutInt => key_and_value(arg).and_then(|(key, value)| {
            let number = value
                .parse::<i64>()
                .map_err(|_| format!("Invalid integer: {}", value))?;
            config.put_integer(key, number);
            terminal.print(&format!("{}={}\n", key, number));
            Ok(())
        }),
        SettingsCommand::PutBool => key_and_value(arg).and_then(|(key, value)| {
            let flag = parse_bool(value)?;
            config.put_string(key, if flag { "true" } else { "false" });
            terminal.print(&format!("{}={}\n", key, flag));
            Ok(())
        }),
        SettingsCommand::PutStr => key_and_value(arg).map(|(key, value)| {
            config.put_string(key, value);
            terminal.print(&format!("{}={}\n", key, value));
        }),
    };

    if let Err(message) = result {
        terminal.print(&format!("{}\n", message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryConfig, ScriptedTerminal};

    #[test]
    fn typed_getters_fall_back_to_defaults() {
        let config = MemoryConfig::new();
        assert_eq!(device_mode(&config), DeviceMode::Setup);
        assert_eq!(roms_folder(&config), "/roms");
        assert_eq!(selected_rom(&config), None);
        assert_eq!(catalog_url(&config), None);
        assert_eq!(wifi_mode(&config), Some(WifiMode::Sta));

        let config = MemoryConfig::new()
            .with(ConfigKey::RomMode, "42")
            .with(ConfigKey::RomsFolder, "  ")
            .with(ConfigKey::WifiMode, "1");
        assert_eq!(device_mode(&config), DeviceMode::Setup);
        assert_eq!(roms_folder(&config), "/roms");
        assert_eq!(wifi_mode(&config), Some(WifiMode::Ap));

        let config = MemoryConfig::new().with(ConfigKey::WifiMode, "");
        assert_eq!(wifi_mode(&config), None);
    }

    #[test]
    fn https_catalog_wins() {
        let config = MemoryConfig::new()
            .with(ConfigKey::RomHttpCatalog, "http://a/roms.csv")
            .with(ConfigKey::RomHttpsCatalog, "https://b/roms.csv");
        assert_eq!(catalog_url(&config).as_deref(), Some("https://b/roms.csv"));

        let config = MemoryConfig::new().with(ConfigKey::RomHttpCatalog, "http://a/roms.csv");
        assert_eq!(catalog_url(&config).as_deref(), Some("http://a/roms.csv"));
    }

    #[test]
    fn put_commands_validate_values() {
        let mut config = MemoryConfig::new();
        let mut terminal = ScriptedTerminal::new();

        run(SettingsCommand::PutInt, "rom_mode 1", &mut config, &mut terminal);
        assert_eq!(device_mode(&config), DeviceMode::Delayed);

        run(SettingsCommand::PutInt, "rom_mode fast", &mut config, &mut terminal);
        assert!(terminal.output().contains("Invalid integer: fast"));
        assert_eq!(device_mode(&config), DeviceMode::Delayed);

        run(SettingsCommand::PutBool, "ROM_SELECTED yes", &mut config, &mut terminal);
        assert_eq!(config.get(ConfigKey::RomSelected).as_deref(), Some("true"));

        run(SettingsCommand::PutStr, "roms_folder /games", &mut config, &mut terminal);
        assert_eq!(roms_folder(&config), "/games");

        run(SettingsCommand::PutStr, "colour red", &mut config, &mut terminal);
        assert!(terminal.output().contains("Unknown setting: colour"));
        assert_eq!(config.saves(), 0);
    }

    #[test]
    fn get_save_and_erase() {
        let mut config = MemoryConfig::new().with(ConfigKey::RomSelected, "a.rom");
        let mut terminal = ScriptedTerminal::new();

        run(SettingsCommand::Get, "rom_selected", &mut config, &mut terminal);
        assert!(terminal.take_output().contains("ROM_SELECTED=a.rom"));

        run(SettingsCommand::Get, "rom_http_catalog", &mut config, &mut terminal);
        assert!(terminal.take_output().contains("Setting not found: ROM_HTTP_CATALOG"));

        run(SettingsCommand::Save, "", &mut config, &mut terminal);
        assert_eq!(config.commits(), 1);

        run(SettingsCommand::Erase, "", &mut config, &mut terminal);
        assert_eq!(selected_rom(&config), None);
        assert_eq!(config.commits(), 2);

        run(SettingsCommand::Print, "", &mut config, &mut terminal);
        let output = terminal.take_output();
        assert!(output.contains("ROM_MODE=255\n"));
        assert!(output.contains("ROMS_FOLDER=/roms\n"));
    }
}
