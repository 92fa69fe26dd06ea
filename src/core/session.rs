//! Session management
//!
//! A [`Session`] is one console bound to one window region. It owns the
//! terminal state and the byte decoder, shares a glyph cache, and turns
//! writes into draw calls. Every entry point takes `&self`: writers and the
//! windowing system's repaint callbacks may arrive from different threads and
//! are serialized by a single session lock. The glyph cache lock is only ever
//! taken while the session lock is held, never the other way around.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::{Color, ConsoleConfig};
use crate::core::glyph_cache::GlyphCache;
use crate::core::term::{Changes, Cursor, Decoder, Screen, Terminal};
use crate::error::{ConsoleError, Result, SurfaceError};
use crate::ui::font::{FontId, FontProvider};
use crate::ui::renderer::{CellGeometry, Renderer, ScrollStrategy};
use crate::ui::surface::{Capabilities, Point, Rect, Size, Surface};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Mutable state guarded by the session lock
struct Inner {
    config: ConsoleConfig,
    /// Region handed over at creation
    binding: Surface,
    /// `binding` narrowed to the configured console size
    surface: Surface,
    terminal: Terminal,
    decoder: Decoder,
    renderer: Renderer,
}

impl Inner {
    /// Draw `changes`, unless an earlier draw in this call already failed
    fn render(&self, changes: &Changes, failure: &mut Option<SurfaceError>) {
        if failure.is_some() || changes.is_empty() {
            return;
        }
        if let Err(e) = self
            .renderer
            .apply(&self.surface, &self.terminal, changes.as_slice())
        {
            tracing::debug!("Draw failed, text model kept: {}", e);
            *failure = Some(e);
        }
    }

    fn repaint_all(&self) -> std::result::Result<(), SurfaceError> {
        let all = Rect::from_size(self.surface.size());
        self.renderer.repaint(&self.surface, &self.terminal, all)?;
        self.surface.flush()
    }
}

/// Character grid for a region and font, rejecting one that holds no cell
fn grid(surface: &Surface, geometry: &CellGeometry) -> Result<(u16, u16)> {
    let size = surface.size();
    match geometry.grid(size) {
        (0, _) | (_, 0) => Err(ConsoleError::InvalidGeometry {
            width: size.width,
            height: size.height,
        }),
        grid => Ok(grid),
    }
}

/// A console bound to a window region
pub struct Session {
    id: u64,
    inner: Mutex<Inner>,
    cache: Arc<GlyphCache>,
    fonts: Arc<dyn FontProvider>,
}

impl Session {
    /// Create a session with its own glyph cache
    pub fn create(surface: Surface, fonts: Arc<dyn FontProvider>, config: &ConsoleConfig) -> Result<Self> {
        let cache = Arc::new(GlyphCache::new(config.glyph_cache_entries));
        Self::create_with_cache(surface, fonts, cache, config)
    }

    /// Create a session drawing glyphs through a cache shared with others.
    ///
    /// `config.glyph_cache_entries` is ignored; the shared cache keeps the
    /// capacity it was built with.
    pub fn create_with_cache(
        surface: Surface,
        fonts: Arc<dyn FontProvider>,
        cache: Arc<GlyphCache>,
        config: &ConsoleConfig,
    ) -> Result<Self> {
        config.validate()?;
        let config = config.clone();

        let metrics = fonts
            .metrics(config.font_id)
            .ok_or(ConsoleError::UnknownFont(config.font_id))?;
        let geometry = CellGeometry::new(metrics, config.line_separation);

        let binding = surface;
        let surface = binding.restrict(config.size);
        let (cols, rows) = grid(&surface, &geometry)?;
        let terminal = Terminal::new(
            cols,
            rows,
            config.wrap,
            config.tab_width,
            config.scrollback_chars,
        )?;

        let strategy = ScrollStrategy::select(config.readback, surface.capabilities());
        tracing::debug!("Scroll strategy {:?} for {}", strategy, binding.kind());

        let renderer = Renderer::new(
            Arc::clone(&fonts),
            Arc::clone(&cache),
            config.font_id,
            geometry,
            (config.foreground, config.background),
            strategy,
        );

        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            "Session {} created on {} at {:?}: {}x{} cells",
            id,
            binding.kind(),
            surface.area(),
            cols,
            rows
        );

        Ok(Self {
            id,
            inner: Mutex::new(Inner {
                decoder: Decoder::new(config.discard_escapes),
                config,
                binding,
                surface,
                terminal,
                renderer,
            }),
            cache,
            fonts,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// The glyph cache this session draws through
    pub fn cache(&self) -> &Arc<GlyphCache> {
        &self.cache
    }

    /// Copy of the active configuration
    pub fn config(&self) -> ConsoleConfig {
        self.lock().config.clone()
    }

    /// Columns and rows of the character grid
    pub fn grid_size(&self) -> (u16, u16) {
        let inner = self.lock();
        (inner.terminal.cols(), inner.terminal.rows())
    }

    pub fn cursor(&self) -> Cursor {
        self.lock().terminal.cursor()
    }

    /// Logical content of the visible window
    pub fn snapshot(&self) -> Screen {
        self.lock().terminal.screen()
    }

    /// Write bytes to the console.
    ///
    /// Every byte is applied to the text model even if drawing fails part way;
    /// the first surface failure is returned after the whole input has been
    /// consumed.
    pub fn write(&self, bytes: &[u8]) -> Result<usize> {
        let mut guard = self.lock();
        let inner = &mut *guard;

        // Moved pixels must match the buffer at the moment of the scroll
        let per_scroll = inner.renderer.strategy() == ScrollStrategy::MoveAndExpose;
        let mut changes = Changes::new();
        let mut failure = None;

        for &byte in bytes {
            let Some(input) = inner.decoder.feed(byte) else {
                continue;
            };
            inner.terminal.feed(input, &mut changes);
            if per_scroll && changes.has_scroll() {
                inner.render(&changes, &mut failure);
                changes.clear();
            }
        }
        inner.render(&changes, &mut failure);

        if failure.is_none() {
            failure = inner.surface.flush().err();
        }
        match failure {
            Some(e) => Err(e.into()),
            None => Ok(bytes.len()),
        }
    }

    /// Redraw `rect`, given in window coordinates, from the scrollback buffer.
    ///
    /// `more` signals that further requests follow. On a surface with
    /// deferred flush, presentation then waits for the last one.
    pub fn handle_repaint(&self, rect: Rect, more: bool) -> Result<()> {
        let inner = self.lock();
        let area = inner.surface.area();
        let local = rect.translate(Point::new(-area.x, -area.y));
        inner
            .renderer
            .repaint(&inner.surface, &inner.terminal, local)?;
        let deferred = inner
            .surface
            .capabilities()
            .contains(Capabilities::DEFERRED_FLUSH);
        if !(more && deferred) {
            inner.surface.flush()?;
        }
        Ok(())
    }

    /// Change the console pixel size, re-wrapping stored text.
    ///
    /// Nothing changes unless the new size is valid and the rebuilt buffer
    /// could be allocated.
    pub fn resize(&self, size: Size) -> Result<()> {
        let mut guard = self.lock();
        let inner = &mut *guard;

        let surface = inner.binding.restrict(size);
        let (cols, rows) = grid(&surface, &inner.renderer.geometry())?;
        let terminal = inner
            .terminal
            .reflow(cols, rows, inner.config.scrollback_chars)?;

        inner.config.size = size;
        inner.surface = surface;
        inner.terminal = terminal;
        tracing::info!("Session {} resized to {}x{} cells", self.id, cols, rows);

        inner.repaint_all()?;
        Ok(())
    }

    /// Switch to another font, re-wrapping stored text to the new cell size
    pub fn set_font(&self, font: FontId) -> Result<()> {
        let mut guard = self.lock();
        let inner = &mut *guard;

        let metrics = self
            .fonts
            .metrics(font)
            .ok_or(ConsoleError::UnknownFont(font))?;
        let geometry = CellGeometry::new(metrics, inner.config.line_separation);
        let (cols, rows) = grid(&inner.surface, &geometry)?;
        let terminal = inner
            .terminal
            .reflow(cols, rows, inner.config.scrollback_chars)?;

        let old = inner.config.font_id;
        inner.config.font_id = font;
        inner.terminal = terminal;
        inner.renderer.set_font(font, geometry);
        if old != font {
            let dropped = self.cache.invalidate_font(old);
            tracing::debug!("Dropped {} cached glyphs of font {}", dropped, old);
        }
        tracing::info!("Session {} font {} -> {}: {}x{} cells", self.id, old, font, cols, rows);

        inner.repaint_all()?;
        Ok(())
    }

    /// Change colors and repaint everything
    pub fn set_colors(&self, foreground: Color, background: Color) -> Result<()> {
        let mut inner = self.lock();
        inner.config.foreground = foreground;
        inner.config.background = background;
        inner.renderer.set_colors(foreground, background);
        inner.repaint_all()?;
        Ok(())
    }

    /// Tear the session down. The window stays with its owner.
    pub fn destroy(self) {
        let inner = self.lock();
        tracing::info!(
            "Session {} destroyed ({} chars buffered, cache {:?})",
            self.id,
            inner.terminal.buffer().len(),
            self.cache.stats()
        );
    }
}
