//! Scrollback buffer
//!
//! Remembers every character still needed to redraw the visible window.
//! Cells are kept in write order together with the absolute line and column
//! they were written to. Because the cursor never moves up, absolute lines are
//! non-decreasing from front to back, which makes both ring eviction (drop the
//! front) and scrolling (drop the front while it is above the window) cheap.

use std::collections::{BTreeSet, VecDeque};
use std::ops::Range;

use crate::error::Result;

/// One visible row; `None` marks a position never written
pub type RowCells = Vec<Option<char>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StoredCell {
    line: u64,
    col: u16,
    ch: char,
}

/// Bounded store of written characters
#[derive(Debug, Clone)]
pub struct ScrollbackBuffer {
    cells: VecDeque<StoredCell>,
    capacity: usize,
    columns: u16,
    /// Absolute line shown on row 0
    top: u64,
    /// Absolute lines that continue on the following line
    wrapped: BTreeSet<u64>,
}

impl ScrollbackBuffer {
    /// Create a buffer for `capacity` characters on rows `columns` wide
    pub fn new(capacity: usize, columns: u16) -> Result<Self> {
        let mut cells = VecDeque::new();
        cells.try_reserve_exact(capacity)?;
        Ok(Self {
            cells,
            capacity,
            columns,
            top: 0,
            wrapped: BTreeSet::new(),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn columns(&self) -> u16 {
        self.columns
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Absolute line number of visible row 0
    pub fn top_line(&self) -> u64 {
        self.top
    }

    /// Record `ch` at visible position (`row`, `col`).
    ///
    /// A character already stored at that position is replaced. When the
    /// buffer is full the oldest cell is dropped first, so the capacity never
    /// changes. Returns the visible position of the dropped cell, which the
    /// caller must erase from the screen.
    pub fn append(&mut self, row: u16, col: u16, ch: char) -> Option<(u16, u16)> {
        let line = self.top + row as u64;

        // Only the current line can hold an earlier write at this position,
        // and it sits at the back.
        let existing = self
            .cells
            .iter()
            .rev()
            .take_while(|c| c.line >= line)
            .position(|c| c.line == line && c.col == col);
        if let Some(back) = existing {
            let index = self.cells.len() - 1 - back;
            self.cells.remove(index);
        }

        let evicted = self.evict_oldest_if_full();
        self.cells.push_back(StoredCell { line, col, ch });
        evicted
    }

    /// Drop the oldest cell if the buffer is at capacity, returning its
    /// visible position
    pub fn evict_oldest_if_full(&mut self) -> Option<(u16, u16)> {
        if self.cells.len() < self.capacity {
            return None;
        }
        let cell = self.cells.pop_front()?;
        tracing::trace!("Scrollback full, dropped {:?} at line {}", cell.ch, cell.line);
        // Cells above the window are discarded on scroll, so this one is visible
        Some(((cell.line - self.top) as u16, cell.col))
    }

    /// Note that visible row `row` continues on the next row
    pub fn mark_wrapped(&mut self, row: u16) {
        self.wrapped.insert(self.top + row as u64);
    }

    pub fn is_wrapped(&self, row: u16) -> bool {
        self.wrapped.contains(&(self.top + row as u64))
    }

    /// Shift the window down one line, forgetting the row that leaves the top
    pub fn scroll_up(&mut self) {
        self.top += 1;
        while self.cells.front().is_some_and(|c| c.line < self.top) {
            self.cells.pop_front();
        }
        self.wrapped = self.wrapped.split_off(&self.top);
    }

    /// Character at a visible position
    pub fn cell(&self, row: u16, col: u16) -> Option<char> {
        let line = self.top + row as u64;
        self.cells
            .iter()
            .find(|c| c.line == line && c.col == col)
            .map(|c| c.ch)
    }

    /// Cells of the visible rows in `rows`, each row `columns` wide
    pub fn slice(&self, rows: Range<u16>) -> Vec<RowCells> {
        let width = self.columns as usize;
        let mut out = vec![vec![None; width]; rows.len()];
        let first = self.top + rows.start as u64;
        let last = self.top + rows.end as u64;

        for cell in &self.cells {
            if cell.line < first {
                continue;
            }
            if cell.line >= last {
                break;
            }
            if let Some(slot) = out[(cell.line - first) as usize].get_mut(cell.col as usize) {
                *slot = Some(cell.ch);
            }
        }
        out
    }

    /// Visible rows `0..=through_row` joined across soft wraps.
    ///
    /// Each entry is one hard line in write order, with trailing unwritten
    /// positions trimmed. This is the input for re-wrapping at a new width.
    pub fn logical_lines(&self, through_row: u16) -> Vec<RowCells> {
        let rows = self.slice(0..through_row.saturating_add(1));
        let mut lines = Vec::new();
        let mut current = RowCells::new();

        for (row, mut cells) in rows.into_iter().enumerate() {
            let wrapped = self.is_wrapped(row as u16);
            if !wrapped {
                while cells.last() == Some(&None) {
                    cells.pop();
                }
            }
            current.extend(cells);
            if !wrapped {
                lines.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            while current.last() == Some(&None) {
                current.pop();
            }
            lines.push(current);
        }
        lines
    }

    /// Forget everything and return to line 0
    pub fn clear(&mut self) {
        self.cells.clear();
        self.wrapped.clear();
        self.top = 0;
    }
}
