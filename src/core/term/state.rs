//! Terminal state management
//!
//! [`Terminal`] is the cursor and wrap state machine. It owns the scrollback
//! buffer, turns decoded [`Input`]s into buffer mutations and cursor moves,
//! and reports what changed on screen as [`Change`]s. It never draws.

use crate::config::WrapMode;
use crate::core::scrollback::{RowCells, ScrollbackBuffer};
use crate::error::Result;

/// A decoded unit of console input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    /// Printable character
    Print(char),
    /// Line feed (also VT and FF)
    Newline,
    CarriageReturn,
    /// Backspace or DEL
    Backspace,
    Tab,
}

/// What a transition did to the screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// Characters written left to right starting at (`row`, `col`)
    Run { row: u16, col: u16, text: Vec<char> },
    /// A cell lost from the full scrollback buffer; it now shows background
    Clear { row: u16, col: u16 },
    /// Every row moved up by one, exposing an empty bottom row
    Scroll,
}

/// Ordered list of changes with adjacent character runs merged
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changes {
    list: Vec<Change>,
}

impl Changes {
    pub fn new() -> Self {
        Self::default()
    }

    fn push_char(&mut self, row: u16, col: u16, ch: char) {
        if let Some(Change::Run { row: r, col: c, text }) = self.list.last_mut() {
            if *r == row && *c as usize + text.len() == col as usize {
                text.push(ch);
                return;
            }
        }
        self.list.push(Change::Run { row, col, text: vec![ch] });
    }

    fn push_clear(&mut self, row: u16, col: u16) {
        self.list.push(Change::Clear { row, col });
    }

    fn push_scroll(&mut self) {
        self.list.push(Change::Scroll);
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn has_scroll(&self) -> bool {
        self.list.iter().any(|c| *c == Change::Scroll)
    }

    pub fn as_slice(&self) -> &[Change] {
        &self.list
    }

    pub fn clear(&mut self) {
        self.list.clear();
    }
}

/// Cursor position, both coordinates zero based
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    pub row: u16,
    pub col: u16,
}

/// Logical content of the visible window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    pub rows: Vec<RowCells>,
    pub cursor: Cursor,
}

impl Screen {
    /// Row text with unwritten positions as spaces and trailing blanks trimmed
    pub fn row_text(&self, row: usize) -> String {
        self.rows
            .get(row)
            .map(|cells| {
                let text: String = cells.iter().map(|c| c.unwrap_or(' ')).collect();
                text.trim_end().to_string()
            })
            .unwrap_or_default()
    }
}

/// Cursor and wrap state machine
#[derive(Debug, Clone)]
pub struct Terminal {
    cols: u16,
    rows: u16,
    wrap: WrapMode,
    tab_width: u16,
    cursor: Cursor,
    /// Truncate mode: the last column is written and the rest of the row is dropped
    overflow: bool,
    buffer: ScrollbackBuffer,
}

impl Terminal {
    pub fn new(cols: u16, rows: u16, wrap: WrapMode, tab_width: u16, capacity: usize) -> Result<Self> {
        debug_assert!(cols > 0 && rows > 0);
        Ok(Self {
            cols,
            rows,
            wrap,
            tab_width,
            cursor: Cursor::default(),
            overflow: false,
            buffer: ScrollbackBuffer::new(capacity, cols)?,
        })
    }

    pub fn cols(&self) -> u16 {
        self.cols
    }

    pub fn rows(&self) -> u16 {
        self.rows
    }

    pub fn wrap_mode(&self) -> WrapMode {
        self.wrap
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn buffer(&self) -> &ScrollbackBuffer {
        &self.buffer
    }

    /// Apply one input, appending what changed on screen to `changes`
    pub fn feed(&mut self, input: Input, changes: &mut Changes) {
        match input {
            Input::Print(ch) => self.put(Some(ch), changes),
            Input::Newline => self.newline(changes),
            Input::CarriageReturn => self.carriage_return(),
            Input::Backspace => self.backspace(),
            Input::Tab => self.horizontal_tab(),
        }
    }

    /// Write one cell at the cursor and advance; `None` advances over a hole
    fn put(&mut self, ch: Option<char>, changes: &mut Changes) {
        if self.overflow {
            tracing::trace!("Row {} full, dropped {:?}", self.cursor.row, ch);
            return;
        }

        let Cursor { row, col } = self.cursor;
        if let Some(ch) = ch {
            if let Some((r, c)) = self.buffer.append(row, col, ch) {
                changes.push_clear(r, c);
            }
            changes.push_char(row, col, ch);
        }

        if col + 1 < self.cols {
            self.cursor.col += 1;
            return;
        }

        match self.wrap {
            WrapMode::Wrap => {
                self.buffer.mark_wrapped(row);
                self.cursor.col = 0;
                self.linefeed(changes);
            }
            WrapMode::Truncate => self.overflow = true,
        }
    }

    /// Line feed plus carriage return
    fn newline(&mut self, changes: &mut Changes) {
        self.linefeed(changes);
        self.carriage_return();
    }

    /// Move cursor down, scroll if needed
    fn linefeed(&mut self, changes: &mut Changes) {
        if self.cursor.row + 1 < self.rows {
            self.cursor.row += 1;
        } else {
            self.buffer.scroll_up();
            changes.push_scroll();
        }
    }

    fn carriage_return(&mut self) {
        self.cursor.col = 0;
        self.overflow = false;
    }

    /// Move cursor left; never crosses to the previous row
    fn backspace(&mut self) {
        if self.overflow {
            self.overflow = false;
        } else if self.cursor.col > 0 {
            self.cursor.col -= 1;
        }
    }

    fn horizontal_tab(&mut self) {
        if self.tab_width == 0 || self.overflow {
            return;
        }
        let next = (self.cursor.col / self.tab_width + 1).saturating_mul(self.tab_width);
        self.cursor.col = next.min(self.cols - 1);
    }

    /// Logical content of the visible window
    pub fn screen(&self) -> Screen {
        Screen {
            rows: self.buffer.slice(0..self.rows),
            cursor: self.cursor,
        }
    }

    /// Rebuild this terminal at a new size.
    ///
    /// Stored characters are re-linearized into hard lines and replayed
    /// through the wrap rules at the new width. `self` is left untouched, so
    /// a failure (allocation) leaves the caller with the old state.
    pub fn reflow(&self, cols: u16, rows: u16, capacity: usize) -> Result<Terminal> {
        let mut next = Terminal::new(cols, rows, self.wrap, self.tab_width, capacity)?;
        let mut discard = Changes::new();

        let lines = self.buffer.logical_lines(self.cursor.row);
        let count = lines.len();
        for (i, line) in lines.into_iter().enumerate() {
            for cell in line {
                next.put(cell, &mut discard);
            }
            if i + 1 < count {
                next.newline(&mut discard);
            }
            discard.clear();
        }

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terminal(cols: u16, rows: u16, wrap: WrapMode) -> Terminal {
        Terminal::new(cols, rows, wrap, 8, 10_000).unwrap()
    }

    fn feed_str(term: &mut Terminal, s: &str) -> Changes {
        let mut changes = Changes::new();
        for ch in s.chars() {
            let input = match ch {
                '\n' => Input::Newline,
                '\r' => Input::CarriageReturn,
                '\x08' => Input::Backspace,
                '\t' => Input::Tab,
                c => Input::Print(c),
            };
            term.feed(input, &mut changes);
        }
        changes
    }

    #[test]
    fn test_wrap_scenario_80x24() {
        let mut term = terminal(80, 24, WrapMode::Wrap);
        feed_str(&mut term, &"A".repeat(80));
        feed_str(&mut term, "B");

        assert_eq!(term.cursor(), Cursor { row: 1, col: 1 });
        let screen = term.screen();
        assert_eq!(screen.row_text(0), "A".repeat(80));
        assert_eq!(screen.row_text(1), "B");
    }

    #[test]
    fn test_exact_width_advances_one_row() {
        let mut term = terminal(10, 5, WrapMode::Wrap);
        feed_str(&mut term, "0123456789");
        assert_eq!(term.cursor(), Cursor { row: 1, col: 0 });
        assert_eq!(term.buffer().len(), 10);
    }

    #[test]
    fn test_truncate_keeps_first_columns() {
        let mut term = terminal(10, 5, WrapMode::Truncate);
        feed_str(&mut term, "abcdefghijklmnop");

        assert_eq!(term.cursor(), Cursor { row: 0, col: 9 });
        assert_eq!(term.screen().row_text(0), "abcdefghij");
        assert_eq!(term.screen().row_text(1), "");

        // Newline ends the truncated row
        feed_str(&mut term, "\nxy");
        assert_eq!(term.cursor(), Cursor { row: 1, col: 2 });
        assert_eq!(term.screen().row_text(1), "xy");
    }

    #[test]
    fn test_truncate_backspace_and_carriage_return() {
        let mut term = terminal(4, 2, WrapMode::Truncate);
        feed_str(&mut term, "abcdef\x08Z");
        assert_eq!(term.screen().row_text(0), "abcZ");

        feed_str(&mut term, "\rQ");
        assert_eq!(term.screen().row_text(0), "QbcZ");
        assert_eq!(term.cursor(), Cursor { row: 0, col: 1 });
    }

    #[test]
    fn test_control_characters() {
        let mut term = terminal(20, 5, WrapMode::Wrap);
        feed_str(&mut term, "hello\rj");
        assert_eq!(term.screen().row_text(0), "jello");

        feed_str(&mut term, "\x08\x08\x08");
        assert_eq!(term.cursor().col, 0);

        feed_str(&mut term, "\nab\tc");
        assert_eq!(term.screen().row_text(1), "ab      c");
        assert_eq!(term.cursor(), Cursor { row: 1, col: 9 });
    }

    #[test]
    fn test_backspace_stays_on_row() {
        let mut term = terminal(4, 3, WrapMode::Wrap);
        feed_str(&mut term, "abcd\x08");
        assert_eq!(term.cursor(), Cursor { row: 1, col: 0 });
    }

    #[test]
    fn test_tab_clamps_to_last_column() {
        let mut term = terminal(10, 2, WrapMode::Wrap);
        feed_str(&mut term, "\t\t\t");
        assert_eq!(term.cursor().col, 9);
    }

    #[test]
    fn test_newline_at_bottom_scrolls() {
        let mut term = terminal(5, 3, WrapMode::Wrap);
        let changes = feed_str(&mut term, "a\nb\nc\nd");

        assert_eq!(term.cursor(), Cursor { row: 2, col: 1 });
        let screen = term.screen();
        assert_eq!(screen.row_text(0), "b");
        assert_eq!(screen.row_text(1), "c");
        assert_eq!(screen.row_text(2), "d");
        assert_eq!(
            changes.as_slice().iter().filter(|c| **c == Change::Scroll).count(),
            1
        );
    }

    #[test]
    fn test_scroll_count_matches_lines_past_bottom() {
        let rows = 4;
        let mut term = terminal(8, rows, WrapMode::Wrap);
        let mut scrolls = 0;
        for i in 0..20 {
            let changes = feed_str(&mut term, &format!("{}\n", i));
            scrolls += changes.as_slice().iter().filter(|c| **c == Change::Scroll).count();
        }
        // 20 newlines from row 0 reach the bottom after rows-1 of them
        assert_eq!(scrolls, 20 - (rows as usize - 1));
        assert_eq!(term.buffer().top_line(), scrolls as u64);

        // The most recent rows of output remain, the cursor row is empty
        let screen = term.screen();
        assert_eq!(screen.row_text(0), "17");
        assert_eq!(screen.row_text(1), "18");
        assert_eq!(screen.row_text(2), "19");
        assert_eq!(screen.row_text(3), "");
    }

    #[test]
    fn test_wrap_at_bottom_emits_run_then_scroll() {
        let mut term = terminal(3, 1, WrapMode::Wrap);
        let changes = feed_str(&mut term, "xyz");
        assert_eq!(
            changes.as_slice(),
            &[
                Change::Run { row: 0, col: 0, text: vec!['x', 'y', 'z'] },
                Change::Scroll,
            ]
        );
        assert_eq!(term.screen().row_text(0), "");
    }

    #[test]
    fn test_runs_split_on_position_jump() {
        let mut term = terminal(10, 3, WrapMode::Wrap);
        let changes = feed_str(&mut term, "ab\rc\nd");
        assert_eq!(
            changes.as_slice(),
            &[
                Change::Run { row: 0, col: 0, text: vec!['a', 'b'] },
                Change::Run { row: 0, col: 0, text: vec!['c'] },
                Change::Run { row: 1, col: 0, text: vec!['d'] },
            ]
        );
    }

    #[test]
    fn test_full_buffer_clears_evicted_cells() {
        let mut term = Terminal::new(4, 2, WrapMode::Wrap, 8, 3).unwrap();
        let changes = feed_str(&mut term, "abcd");
        assert_eq!(
            changes.as_slice(),
            &[
                Change::Run { row: 0, col: 0, text: vec!['a', 'b', 'c'] },
                Change::Clear { row: 0, col: 0 },
                Change::Run { row: 0, col: 3, text: vec!['d'] },
            ]
        );
        assert_eq!(term.screen().row_text(0), " bcd");
    }

    #[test]
    fn test_cursor_always_in_bounds() {
        for wrap in [WrapMode::Wrap, WrapMode::Truncate] {
            let mut term = terminal(7, 3, wrap);
            let input = "The quick\tbrown fox\x08\x08 jumps\rover\n\nthe lazy dog.....";
            for ch in input.chars() {
                feed_str(&mut term, &ch.to_string());
                let c = term.cursor();
                assert!(c.row < 3 && c.col < 7, "{:?} out of bounds", c);
            }
        }
    }

    #[test]
    fn test_reflow_narrower() {
        let mut term = terminal(80, 24, WrapMode::Wrap);
        let text: String = (0..80).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        feed_str(&mut term, &text);

        let next = term.reflow(40, 24, 10_000).unwrap();
        let screen = next.screen();
        assert_eq!(screen.row_text(0), &text[..40]);
        assert_eq!(screen.row_text(1), &text[40..]);
        assert_eq!(next.cursor(), Cursor { row: 2, col: 0 });
        // The source terminal is untouched
        assert_eq!(term.screen().row_text(0), text);
    }

    #[test]
    fn test_reflow_wider_joins_wrapped_rows() {
        let mut term = terminal(4, 6, WrapMode::Wrap);
        feed_str(&mut term, "abcdefg\nhi");

        let next = term.reflow(10, 6, 10_000).unwrap();
        let screen = next.screen();
        assert_eq!(screen.row_text(0), "abcdefg");
        assert_eq!(screen.row_text(1), "hi");
        assert_eq!(next.cursor(), Cursor { row: 1, col: 2 });
    }

    #[test]
    fn test_reflow_replays_hard_breaks() {
        let mut term = terminal(4, 6, WrapMode::Wrap);
        // Exactly one row of text, then an explicit newline
        feed_str(&mut term, "abcd\nef");
        assert_eq!(term.screen().row_text(1), "");
        assert_eq!(term.screen().row_text(2), "ef");

        let wider = term.reflow(8, 6, 10_000).unwrap();
        assert_eq!(wider.screen().row_text(0), "abcd");
        assert_eq!(wider.screen().row_text(1), "ef");

        // Same width gives back the same layout
        let same = term.reflow(4, 6, 10_000).unwrap();
        assert_eq!(same.screen(), term.screen());
    }

    #[test]
    fn test_reflow_fewer_rows_keeps_latest() {
        let mut term = terminal(10, 5, WrapMode::Wrap);
        feed_str(&mut term, "1\n2\n3\n4\n5");

        let next = term.reflow(10, 2, 10_000).unwrap();
        let screen = next.screen();
        assert_eq!(screen.row_text(0), "4");
        assert_eq!(screen.row_text(1), "5");
    }
}
