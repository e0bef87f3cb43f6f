// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

//! The host console as the cartridge terminal and select button.
//!
//! A reader thread takes lines from stdin.  `select` presses the select
//! button and `select!` long-presses it; every other line is terminal input.
//! Once stdin closes the terminal reports `e` (exit) and the button reports
//! a press, so a boot always runs to completion.

use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;

use log::{debug, warn};
use romcart_core::hal::{ButtonState, SelectButton, Terminal};

const CLEAR_SCREEN: &str = "\x1B[2J\x1B[H";

/// Sends `line` to the button or the terminal.  Returns false once both
/// receivers have gone.
fn route_line(line: &str, lines: &Sender<String>, button: &Sender<ButtonState>) -> bool {
    match line.trim() {
        "select" => button.send(ButtonState::Pressed).is_ok(),
        "select!" => button.send(ButtonState::LongPressed).is_ok(),
        _ => lines.send(line.to_string()).is_ok(),
    }
}

/// Starts the stdin reader.
pub fn spawn() -> (ConsoleTerminal, ConsoleButton) {
    let (line_tx, line_rx) = mpsc::channel();
    let (button_tx, button_rx) = mpsc::channel();

    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if !route_line(&line, &line_tx, &button_tx) {
                        break;
                    }
                }
                Err(e) => {
                    warn!("Error reading stdin: {}", e);
                    break;
                }
            }
        }
        debug!("stdin closed");
    });

    (
        ConsoleTerminal::new(line_rx, Box::new(io::stdout())),
        ConsoleButton::new(button_rx),
    )
}

pub struct ConsoleTerminal {
    lines: Receiver<String>,
    out: Box<dyn Write + Send>,
    closed: bool,
}

impl ConsoleTerminal {
    pub fn new(lines: Receiver<String>, out: Box<dyn Write + Send>) -> Self {
        Self {
            lines,
            out,
            closed: false,
        }
    }

    /// Whether stdin has closed
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn write(&mut self, text: &str) {
        if let Err(e) = self.out.write_all(text.as_bytes()) {
            warn!("Error writing to console: {}", e);
        }
    }
}

impl Terminal for ConsoleTerminal {
    fn print(&mut self, text: &str) {
        self.write(text);
    }

    fn clear_screen(&mut self) {
        self.write(CLEAR_SCREEN);
    }

    fn read_line(&mut self) -> Option<String> {
        match self.lines.try_recv() {
            Ok(line) => Some(line),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.closed = true;
                Some("e".to_string())
            }
        }
    }

    fn refresh(&mut self) {
        if let Err(e) = self.out.flush() {
            warn!("Error flushing console: {}", e);
        }
    }
}

pub struct ConsoleButton {
    states: Receiver<ButtonState>,
}

impl ConsoleButton {
    pub fn new(states: Receiver<ButtonState>) -> Self {
        Self { states }
    }
}

impl SelectButton for ConsoleButton {
    fn poll(&mut self) -> ButtonState {
        match self.states.try_recv() {
            Ok(state) => state,
            Err(TryRecvError::Empty) => ButtonState::Released,
            Err(TryRecvError::Disconnected) => ButtonState::Pressed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_lines_drive_the_button() {
        let (line_tx, line_rx) = mpsc::channel();
        let (button_tx, button_rx) = mpsc::channel();
        let mut terminal = ConsoleTerminal::new(line_rx, Box::new(io::sink()));
        let mut button = ConsoleButton::new(button_rx);

        assert!(route_line("b", &line_tx, &button_tx));
        assert!(route_line(" select ", &line_tx, &button_tx));
        assert!(route_line("select!", &line_tx, &button_tx));

        assert_eq!(terminal.read_line().as_deref(), Some("b"));
        assert_eq!(terminal.read_line(), None);
        assert_eq!(button.poll(), ButtonState::Pressed);
        assert_eq!(button.poll(), ButtonState::LongPressed);
        assert_eq!(button.poll(), ButtonState::Released);

        drop(line_tx);
        drop(button_tx);
        assert_eq!(terminal.read_line().as_deref(), Some("e"));
        assert!(terminal.is_closed());
        assert_eq!(button.poll(), ButtonState::Pressed);
    }
}
