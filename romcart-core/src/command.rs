// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

//! Terminal command table.
//!
//! An input line is split into a command key (the first word) and the rest
//! of the line.  Keys found in [`COMMANDS`] map to a [`Command`]; anything
//! else, including an empty line, is left for the menu's default handler
//! to interpret against the current menu level.

use core::fmt;

/// Configuration commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsCommand {
    Show,
    Print,
    Save,
    Erase,
    Get,
    PutInt,
    PutBool,
    PutStr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Menu,
    NextPage,
    PrevPage,
    Help,
    Clear,
    BrowseLocal,
    BrowseRemote,
    Launch,
    ToggleDelay,
    Exit,
    AlternateApp,
    Settings(SettingsCommand),
}

/// One entry in the command table.
#[derive(Debug, Clone, Copy)]
pub struct CommandEntry {
    pub key: &'static str,
    pub command: Command,
    pub usage: &'static str,
    pub help: &'static str,
}

const fn entry(
    key: &'static str,
    command: Command,
    usage: &'static str,
    help: &'static str,
) -> CommandEntry {
    CommandEntry {
        key,
        command,
        usage,
        help,
    }
}

/// Every recognised command key, matched case-insensitively.
pub const COMMANDS: &[CommandEntry] = &[
    entry("m", Command::Menu, "m", "Show the main menu"),
    entry("?", Command::Menu, "?", "Show the main menu"),
    entry("n", Command::NextPage, "n", "Next page of ROMs"),
    entry("p", Command::PrevPage, "p", "Previous page of ROMs"),
    entry("b", Command::BrowseLocal, "b", "Browse ROMs on the card"),
    entry("d", Command::BrowseRemote, "d", "Browse the download catalog"),
    entry("l", Command::Launch, "l", "Launch the selected ROM"),
    entry("r", Command::ToggleDelay, "r", "Toggle delay/ripper mode"),
    entry("x", Command::AlternateApp, "x", "Return to booster menu"),
    entry("e", Command::Exit, "e", "Exit to desktop"),
    entry("exit", Command::Exit, "exit", "Exit to desktop"),
    entry("h", Command::Help, "h", "Show available commands"),
    entry("help", Command::Help, "help", "Show available commands"),
    entry("clear", Command::Clear, "clear", "Clear the terminal screen"),
    entry("s", Command::Settings(SettingsCommand::Show), "s", "Settings"),
    entry(
        "settings",
        Command::Settings(SettingsCommand::Show),
        "settings",
        "Settings",
    ),
    entry(
        "print",
        Command::Settings(SettingsCommand::Print),
        "print",
        "Show all settings",
    ),
    entry(
        "save",
        Command::Settings(SettingsCommand::Save),
        "save",
        "Save settings",
    ),
    entry(
        "erase",
        Command::Settings(SettingsCommand::Erase),
        "erase",
        "Restore default settings",
    ),
    entry(
        "get",
        Command::Settings(SettingsCommand::Get),
        "get <key>",
        "Show one setting",
    ),
    entry(
        "put_int",
        Command::Settings(SettingsCommand::PutInt),
        "put_int <key> <value>",
        "Set an integer",
    ),
    entry(
        "put_bool",
        Command::Settings(SettingsCommand::PutBool),
        "put_bool <key> <value>",
        "Set a boolean",
    ),
    entry(
        "put_str",
        Command::Settings(SettingsCommand::PutStr),
        "put_str <key> <value>",
        "Set a string",
    ),
];

/// Looks up a command key.
pub fn lookup(key: &str) -> Option<Command> {
    COMMANDS
        .iter()
        .find(|entry| entry.key.eq_ignore_ascii_case(key))
        .map(|entry| entry.command)
}

/// One tokenised input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Input<'a> {
    /// Recognised command, if the key is in the table
    pub command: Option<Command>,

    /// First word of the line
    pub key: &'a str,

    /// Rest of the line, trimmed
    pub arg: &'a str,
}

impl<'a> Input<'a> {
    pub fn parse(line: &'a str) -> Self {
        let line = line.trim();
        let (key, arg) = match line.split_once(char::is_whitespace) {
            Some((key, arg)) => (key, arg.trim()),
            None => (line, ""),
        };
        Self {
            command: lookup(key),
            key,
            arg,
        }
    }

    /// Whether the line was empty (RETURN on its own)
    pub fn is_empty(&self) -> bool {
        self.key.is_empty()
    }
}

impl Command {
    /// Commands that still work when storage is unavailable.
    pub fn available_without_storage(&self) -> bool {
        matches!(self, Command::Settings(_) | Command::Help | Command::Clear)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = COMMANDS
            .iter()
            .find(|entry| entry.command == *self)
            .map(|entry| entry.key)
            .unwrap_or("?");
        write!(f, "{}", key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_key_and_argument() {
        let input = Input::parse("  put_str  ROMS_FOLDER   /games  \r");
        assert_eq!(
            input.command,
            Some(Command::Settings(SettingsCommand::PutStr))
        );
        assert_eq!(input.key, "put_str");
        assert_eq!(input.arg, "ROMS_FOLDER   /games");
    }

    #[test]
    fn keys_are_case_insensitive() {
        assert_eq!(Input::parse("B").command, Some(Command::BrowseLocal));
        assert_eq!(Input::parse("?").command, Some(Command::Menu));
        assert_eq!(Input::parse("Help").command, Some(Command::Help));
    }

    #[test]
    fn unknown_and_empty_lines_fall_through() {
        let number = Input::parse("12");
        assert_eq!(number.command, None);
        assert_eq!(number.key, "12");

        let empty = Input::parse("\n");
        assert!(empty.is_empty());
        assert_eq!(empty.command, None);
    }

    #[test]
    fn table_keys_are_unique() {
        for (ii, a) in COMMANDS.iter().enumerate() {
            for b in &COMMANDS[ii + 1..] {
                assert_ne!(a.key, b.key);
            }
        }
        assert_eq!(Command::Exit.to_string(), "e");
    }

    #[test]
    fn storage_free_commands() {
        for key in ["s", "put_str", "erase", "h", "help", "clear"] {
            let command = lookup(key).unwrap();
            assert!(command.available_without_storage(), "{key}");
        }
        for key in ["m", "b", "d", "l", "r", "x", "e"] {
            let command = lookup(key).unwrap();
            assert!(!command.available_without_storage(), "{key}");
        }
    }
}
