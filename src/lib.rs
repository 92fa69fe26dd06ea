//! pixcon - a text console that draws into a window it does not own
//!
//! Callers write bytes; the console keeps a cursor, wraps or truncates at the
//! right edge, scrolls at the bottom, and remembers enough recent output to
//! rebuild the visible text whenever the window asks for a repaint.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use pixcon::{ConsoleConfig, Font8x8, Framebuffer, Session, Size, Surface};
//!
//! let window = Arc::new(Framebuffer::new(320, 100));
//! let config = ConsoleConfig { size: Size::new(320, 100), ..ConsoleConfig::default() };
//! let session = Session::create(Surface::raw(window), Arc::new(Font8x8), &config)?;
//!
//! session.write(b"hello\nworld")?;
//! assert_eq!(session.snapshot().row_text(1), "world");
//! # Ok::<(), pixcon::ConsoleError>(())
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod ui;

pub use crate::config::{Color, ConsoleConfig, WrapMode};
pub use crate::core::glyph_cache::{CacheStats, GlyphCache};
pub use crate::core::session::Session;
pub use crate::core::term::{Cursor, Screen};
pub use crate::error::{ConsoleError, Result, SurfaceError};
pub use crate::ui::{Font8x8, FontProvider, Framebuffer, Rect, Size, Surface, Window};
