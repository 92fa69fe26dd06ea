//! Redraw and scroll engine
//!
//! Renders terminal changes onto a [`Surface`]. Character runs are drawn
//! glyph by glyph through the glyph cache. Scrolling either moves the
//! existing pixels up one row and redraws the exposed row, or repaints every
//! visible row from the scrollback buffer; which one is decided once, when
//! the renderer is built. Explicit repaints always rebuild the requested
//! rectangle from the buffer and never trust what is already on screen.

use std::sync::Arc;

use crate::config::Color;
use crate::core::glyph_cache::GlyphCache;
use crate::core::term::{Change, Terminal};
use crate::error::SurfaceError;
use crate::ui::font::{FontId, FontMetrics, FontProvider, Glyph};
use crate::ui::surface::{Capabilities, Point, Rect, Size, Surface};

/// How a one-row scroll reaches the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollStrategy {
    /// Copy pixels up one row, then draw only the exposed bottom row
    MoveAndExpose,
    /// Repaint all visible rows from the buffer
    Repaint,
}

impl ScrollStrategy {
    /// Pick the strategy for a surface. Readback must be both configured and
    /// offered by the window, along with self-moves.
    pub fn select(readback: bool, caps: Capabilities) -> Self {
        if readback && caps.contains(Capabilities::MOVE | Capabilities::READBACK) {
            ScrollStrategy::MoveAndExpose
        } else {
            ScrollStrategy::Repaint
        }
    }
}

/// Pixel layout of the character grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellGeometry {
    pub char_width: u32,
    pub line_height: u32,
    pub line_separation: u32,
}

impl CellGeometry {
    pub fn new(metrics: FontMetrics, line_separation: u32) -> Self {
        Self {
            char_width: metrics.char_width,
            line_height: metrics.line_height,
            line_separation,
        }
    }

    /// Vertical distance between row origins
    pub fn pitch(&self) -> u32 {
        self.line_height + self.line_separation
    }

    /// Columns and rows that fit in `size`, clamped to `u16`
    pub fn grid(&self, size: Size) -> (u16, u16) {
        let cols = size.width.checked_div(self.char_width).unwrap_or(0);
        let rows = size.height.checked_div(self.pitch()).unwrap_or(0);
        (
            cols.min(u16::MAX as u32) as u16,
            rows.min(u16::MAX as u32) as u16,
        )
    }

    /// Pixel rectangle of one cell, line separation included
    pub fn cell_rect(&self, row: u16, col: u16) -> Rect {
        Rect::new(
            (col as u32 * self.char_width) as i32,
            (row as u32 * self.pitch()) as i32,
            self.char_width,
            self.pitch(),
        )
    }
}

/// Draws terminal content for one session
pub struct Renderer {
    fonts: Arc<dyn FontProvider>,
    cache: Arc<GlyphCache>,
    font: FontId,
    geometry: CellGeometry,
    fg: Color,
    bg: Color,
    strategy: ScrollStrategy,
}

impl Renderer {
    pub fn new(
        fonts: Arc<dyn FontProvider>,
        cache: Arc<GlyphCache>,
        font: FontId,
        geometry: CellGeometry,
        colors: (Color, Color),
        strategy: ScrollStrategy,
    ) -> Self {
        Self {
            fonts,
            cache,
            font,
            geometry,
            fg: colors.0,
            bg: colors.1,
            strategy,
        }
    }

    pub fn font(&self) -> FontId {
        self.font
    }

    pub fn geometry(&self) -> CellGeometry {
        self.geometry
    }

    pub fn strategy(&self) -> ScrollStrategy {
        self.strategy
    }

    pub fn set_colors(&mut self, fg: Color, bg: Color) {
        self.fg = fg;
        self.bg = bg;
    }

    fn glyph(&self, ch: char) -> Option<Arc<Glyph>> {
        let fonts = &self.fonts;
        self.cache
            .get_or_render(self.font, ch, |font, ch| fonts.render(font, ch))
    }

    /// Render a batch of changes against `term`'s current state, stopping at
    /// the first failure.
    ///
    /// Moved pixels are only valid for a single scroll per batch, since the
    /// exposed row is read from the buffer as it is now. A batch that scrolls
    /// more than once, or any scroll under [`ScrollStrategy::Repaint`], is
    /// drawn as one full repaint, which already contains every run.
    pub fn apply(&self, surface: &Surface, term: &Terminal, changes: &[Change]) -> Result<(), SurfaceError> {
        let scrolls = changes.iter().filter(|c| **c == Change::Scroll).count();
        if scrolls > 1 || (scrolls == 1 && self.strategy == ScrollStrategy::Repaint) {
            return self.repaint(surface, term, Rect::from_size(surface.size()));
        }

        for change in changes {
            match change {
                Change::Run { row, col, text } => self.draw_run(surface, *row, *col, text)?,
                Change::Clear { row, col } => {
                    surface.fill(self.geometry.cell_rect(*row, *col), self.bg)?
                }
                Change::Scroll => self.scroll(surface, term)?,
            }
        }
        Ok(())
    }

    pub fn set_font(&mut self, font: FontId, geometry: CellGeometry) {
        self.font = font;
        self.geometry = geometry;
    }

    /// Draw characters left to right from (`row`, `col`)
    pub fn draw_run(&self, surface: &Surface, row: u16, col: u16, text: &[char]) -> Result<(), SurfaceError> {
        for (i, ch) in text.iter().enumerate() {
            let cell = self.geometry.cell_rect(row, col.saturating_add(i as u16));
            surface.fill(cell, self.bg)?;
            self.draw_glyph(surface, cell, cell, *ch)?;
        }
        Ok(())
    }

    fn draw_glyph(&self, surface: &Surface, cell: Rect, clip: Rect, ch: char) -> Result<(), SurfaceError> {
        let Some(clip) = cell.intersect(&clip) else {
            return Ok(());
        };
        // No glyph in the font: the cell stays background
        match self.glyph(ch) {
            Some(glyph) => surface.blit(cell.origin(), clip, &glyph.bitmap, self.fg, self.bg),
            None => Ok(()),
        }
    }

    /// Move the visible text up one row
    pub fn scroll(&self, surface: &Surface, term: &Terminal) -> Result<(), SurfaceError> {
        let size = surface.size();
        match self.strategy {
            ScrollStrategy::MoveAndExpose => {
                let pitch = self.geometry.pitch();
                let rows = term.rows() as u32;
                if rows > 1 {
                    let moved = Rect::new(0, pitch as i32, size.width, pitch * (rows - 1));
                    surface.move_rect(moved, Point::new(0, -(pitch as i32)))?;
                }
                let exposed = Rect::new(0, (pitch * (rows - 1)) as i32, size.width, pitch);
                self.repaint(surface, term, exposed)
            }
            ScrollStrategy::Repaint => self.repaint(surface, term, Rect::from_size(size)),
        }
    }

    /// Rebuild `rect` (console coordinates) entirely from the buffer
    pub fn repaint(&self, surface: &Surface, term: &Terminal, rect: Rect) -> Result<(), SurfaceError> {
        let Some(rect) = rect.intersect(&Rect::from_size(surface.size())) else {
            return Ok(());
        };
        surface.fill(rect, self.bg)?;

        let CellGeometry { char_width, .. } = self.geometry;
        let pitch = self.geometry.pitch();
        let (x, y) = (rect.x as u32, rect.y as u32);

        let first_row = (y / pitch).min(term.rows() as u32) as u16;
        let end_row = ceil_div(y + rect.height, pitch).min(term.rows() as u32) as u16;
        let first_col = (x / char_width).min(term.cols() as u32) as u16;
        let end_col = ceil_div(x + rect.width, char_width).min(term.cols() as u32) as u16;

        let rows = term.buffer().slice(first_row..end_row);
        for (row, cells) in (first_row..end_row).zip(rows.iter()) {
            for col in first_col..end_col {
                if let Some(ch) = cells[col as usize] {
                    self.draw_glyph(surface, self.geometry.cell_rect(row, col), rect, ch)?;
                }
            }
        }
        Ok(())
    }
}

fn ceil_div(value: u32, divisor: u32) -> u32 {
    if divisor == 0 {
        return 0;
    }
    value / divisor + u32::from(value % divisor != 0)
}
