// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

//! String parsing helpers, usable as `clap` value parsers and by the
//! terminal settings commands.

use crate::types::{ConfigKey, DeviceMode, WifiMode};

pub fn parse_device_mode(s: &str) -> Result<DeviceMode, String> {
    DeviceMode::try_from_str(s).ok_or_else(|| {
        format!(
            "Invalid device mode: {}. Valid values are: direct (0), delayed (1), setup (255)",
            s
        )
    })
}

pub fn parse_wifi_mode(s: &str) -> Result<WifiMode, String> {
    match s.trim().to_lowercase().as_str() {
        "sta" => Ok(WifiMode::Sta),
        "ap" => Ok(WifiMode::Ap),
        other => other
            .parse::<i64>()
            .ok()
            .and_then(WifiMode::from_value)
            .ok_or_else(|| format!("Invalid WiFi mode: {}. Valid values are: sta (0), ap (1)", s)),
    }
}

pub fn parse_config_key(s: &str) -> Result<ConfigKey, String> {
    s.trim()
        .parse::<ConfigKey>()
        .map_err(|_| format!("Unknown setting: {}", s))
}

pub fn parse_bool(s: &str) -> Result<bool, String> {
    match s.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "y" | "on" => Ok(true),
        "false" | "0" | "no" | "n" | "off" => Ok(false),
        _ => Err(format!("Invalid boolean: {}. Use true or false", s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_helpers() {
        assert_eq!(parse_device_mode("0"), Ok(DeviceMode::Direct));
        assert!(parse_device_mode("fast").is_err());
        assert_eq!(parse_wifi_mode("AP"), Ok(WifiMode::Ap));
        assert_eq!(parse_wifi_mode("0"), Ok(WifiMode::Sta));
        assert_eq!(parse_config_key("wifi_mode"), Ok(ConfigKey::WifiMode));
        assert!(parse_config_key("colour").is_err());
        assert_eq!(parse_bool("Yes"), Ok(true));
        assert_eq!(parse_bool("off"), Ok(false));
        assert!(parse_bool("maybe").is_err());
    }
}
