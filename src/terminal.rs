// Copyright (C) 2025  Tom Waddington
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Terminal view for codetyper
//!
//! Draws the buffer on the alternate screen and provides the scroll
//! position, measured in lines, that scroll actions animate.

use anyhow::{Context, Result};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute, queue,
    style::Print,
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use std::io::{IsTerminal, Stdout, Write};

const FALLBACK_ROWS: u16 = 24;

// RAII guard for the alternate screen - only enters it if stdout is a TTY
struct ScreenGuard {
    enabled: bool,
}

impl ScreenGuard {
    fn new() -> Result<Self> {
        let enabled = if std::io::stdout().is_terminal() {
            execute!(std::io::stdout(), EnterAlternateScreen, Hide)
                .context("Failed to enter alternate screen")?;
            true
        } else {
            false
        };
        Ok(ScreenGuard { enabled })
    }
}

impl Drop for ScreenGuard {
    fn drop(&mut self) {
        if self.enabled {
            let _ = execute!(std::io::stdout(), Show, LeaveAlternateScreen);
        }
    }
}

/// Largest useful scroll offset for `line_count` lines in `rows` rows.
pub fn max_scroll(line_count: usize, rows: u16) -> i64 {
    (line_count as i64 - i64::from(rows)).max(0)
}

/// Lines of `text` visible from scroll offset `scroll`.
pub fn visible_lines(text: &str, scroll: i64, rows: u16) -> Vec<&str> {
    let skip = usize::try_from(scroll).unwrap_or(0);
    text.split('\n').skip(skip).take(usize::from(rows)).collect()
}

pub struct TerminalView {
    stdout: Stdout,
    rows: u16,
    scroll: i64,
    text: String,
    screen: ScreenGuard,
}

impl TerminalView {
    pub fn new() -> Result<Self> {
        let screen = ScreenGuard::new()?;
        let rows = terminal::size().map(|(_, rows)| rows).unwrap_or(FALLBACK_ROWS);

        Ok(Self {
            stdout: std::io::stdout(),
            rows,
            scroll: 0,
            text: String::new(),
            screen,
        })
    }

    pub fn scroll_y(&self) -> i64 {
        self.scroll
    }

    /// Moves the view, clamped to the text, and redraws.
    pub fn set_scroll_y(&mut self, y: i64) -> Result<()> {
        let line_count = self.text.split('\n').count();
        self.scroll = y.clamp(0, max_scroll(line_count, self.rows));
        self.draw()
    }

    pub fn render(&mut self, text: &str) -> Result<()> {
        if self.text != text {
            self.text.clear();
            self.text.push_str(text);
        }
        self.draw()
    }

    fn draw(&mut self) -> Result<()> {
        if !self.screen.enabled {
            return Ok(());
        }

        queue!(self.stdout, MoveTo(0, 0), Clear(ClearType::All))?;
        for (row, line) in visible_lines(&self.text, self.scroll, self.rows)
            .into_iter()
            .enumerate()
        {
            queue!(self.stdout, MoveTo(0, row as u16), Print(line))?;
        }
        self.stdout.flush().context("Failed to flush terminal")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_scroll() {
        assert_eq!(max_scroll(10, 24), 0);
        assert_eq!(max_scroll(30, 24), 6);
    }

    #[test]
    fn test_visible_lines() {
        let text = "a\nb\nc\nd";
        assert_eq!(visible_lines(text, 1, 2), vec!["b", "c"]);
        assert_eq!(visible_lines(text, -4, 2), vec!["a", "b"]);
        assert!(visible_lines(text, 9, 2).is_empty());
    }
}
