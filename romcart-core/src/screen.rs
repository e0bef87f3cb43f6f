// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

//! Text rendering for the host computer's screen.

use romcart_common::constants::{RELEASE_VERSION, TERM_SCREEN_WIDTH};

use crate::catalog::{Catalog, Page, RomEntry};
use crate::hal::Terminal;

/// Visible characters allowed on one line, leaving room for the cursor.
pub const LINE_WIDTH: usize = TERM_SCREEN_WIDTH - 2;

/// Cuts `text` to [`LINE_WIDTH`] characters and terminates it with a
/// newline, so a long line is never wrapped by the terminal.
pub fn fit_line(text: &str) -> String {
    let mut line: String = text.trim_end_matches('\n').chars().take(LINE_WIDTH).collect();
    line.push('\n');
    line
}

/// Clears the screen and shows the title line.
pub fn title(terminal: &mut dyn Terminal) {
    terminal.clear_screen();
    terminal.print(&format!("ROM Emulator - {}\n", RELEASE_VERSION));
}

/// Page header, e.g. "Page 1, ROMs 1 to 20 of 42:".
pub fn page_header(page: &Page) -> String {
    let first = if page.start < page.end { page.start + 1 } else { 0 };
    format!(
        "Page {}, ROMs {} to {} of {}:\n\n",
        page.number + 1,
        first,
        page.end,
        page.total
    )
}

/// One numbered catalog line, numbered from 1.
pub fn entry_line(index: usize, entry: &RomEntry) -> String {
    fit_line(&format!("{}. {}", index + 1, entry.name))
}

/// Renders the catalog's current page and the navigation prompt.
pub fn catalog_page(terminal: &mut dyn Terminal, catalog: &Catalog) {
    let page = catalog.page(catalog.current_page());

    terminal.clear_screen();
    terminal.print(&page_header(&page));
    for (index, entry) in catalog.entries()[page.start..page.end].iter().enumerate() {
        terminal.print(&entry_line(page.start + index, entry));
    }
    terminal.print("\n");
    if page.has_next() {
        terminal.print("[N]ext ");
    }
    if page.has_prev() {
        terminal.print("[P]rev ");
    }
    terminal.print("[M]enu or ROM number");
}

/// Shows every field of one remote catalog entry.
pub fn entry_detail(terminal: &mut dyn Terminal, number: usize, entry: &RomEntry) {
    terminal.print(&format!("\nROM number: {}\n", number));
    terminal.print(&fit_line(&format!("Name: {}", entry.name)));
    terminal.print(&fit_line(&format!("Filename: {}", entry.filename)));
    terminal.print(&format!("Description: {}\n", entry.description));
    terminal.print(&fit_line(&format!("Tags: {}", entry.tags)));
    terminal.print(&format!("Size: {} KB\n", entry.size_kb));
    terminal.print("\nPress RETURN to load the ROM.\n");
    terminal.print("Press any other key to return to the menu.\n");
}
