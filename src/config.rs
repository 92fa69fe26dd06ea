//! Console configuration.
//!
//! A [`ConsoleConfig`] is copied into the session at creation time, so the
//! caller's value need not outlive the call. It can be built in code or
//! loaded from a TOML file:
//!
//! ```toml
//! font_id = 0
//! wrap = "truncate"
//! scrollback_chars = 4096
//! glyph_cache_entries = 64
//! line_separation = 2
//! readback = true
//!
//! [background]
//! r = 0
//! g = 0
//! b = 32
//!
//! [size]
//! width = 640
//! height = 400
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConsoleError, Result};
use crate::ui::font::FontId;
use crate::ui::surface::Size;

/// Default number of characters remembered for redraw.
pub const DEFAULT_SCROLLBACK_CHARS: usize = 128;
/// Default glyph cache capacity, in glyphs.
pub const DEFAULT_GLYPH_CACHE_ENTRIES: usize = 16;
/// Default gap between text rows, in pixels.
pub const DEFAULT_LINE_SEPARATION: u32 = 2;

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Window background color
    pub background: Color,
    /// Font color
    pub foreground: Color,
    /// Console size in pixels
    pub size: Size,
    /// Font to render with
    pub font_id: FontId,
    /// Right-edge policy
    pub wrap: WrapMode,
    /// Scrollback Buffer capacity in characters
    pub scrollback_chars: usize,
    /// Glyph cache capacity in entries (0 disables caching)
    pub glyph_cache_entries: usize,
    /// Extra pixels between text rows
    pub line_separation: u32,
    /// Whether the surface can read back its own pixels
    pub readback: bool,
    /// Tab stop interval (0 ignores tabs)
    pub tab_width: u16,
    /// Swallow escape sequences instead of printing them
    pub discard_escapes: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            background: Color::new(0, 0, 0),
            foreground: Color::new(255, 255, 255),
            size: Size::new(640, 400),
            font_id: 0,
            wrap: WrapMode::Wrap,
            scrollback_chars: DEFAULT_SCROLLBACK_CHARS,
            glyph_cache_entries: DEFAULT_GLYPH_CACHE_ENTRIES,
            line_separation: DEFAULT_LINE_SEPARATION,
            readback: true,
            tab_width: 8,
            discard_escapes: true,
        }
    }
}

impl ConsoleConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ConsoleError::Config(e.to_string()))
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConsoleError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Load configuration from file, falling back to defaults
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            match Self::load(path) {
                Ok(config) => return config,
                Err(e) => tracing::warn!("Ignoring config {}: {}", path.display(), e),
            }
        }
        Self::default()
    }

    /// Serialize to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ConsoleError::Config(e.to_string()))
    }

    /// Reject configurations no session can be built from
    pub fn validate(&self) -> Result<()> {
        if self.size.width == 0 || self.size.height == 0 {
            return Err(ConsoleError::InvalidGeometry {
                width: self.size.width,
                height: self.size.height,
            });
        }
        if self.scrollback_chars == 0 {
            return Err(ConsoleError::Config(
                "scrollback_chars must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// What happens when text reaches the right edge of the window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WrapMode {
    /// Continue on the next row
    #[default]
    Wrap,
    /// Drop characters until the next newline
    Truncate,
}

/// Color definition (RGB)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Convert to crossterm Color
    pub fn to_crossterm(&self) -> crossterm::style::Color {
        crossterm::style::Color::Rgb {
            r: self.r,
            g: self.g,
            b: self.b,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConsoleConfig::default();
        assert_eq!(config.scrollback_chars, 128);
        assert_eq!(config.glyph_cache_entries, 16);
        assert_eq!(config.line_separation, 2);
        assert_eq!(config.wrap, WrapMode::Wrap);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = ConsoleConfig::from_toml_str(
            r#"
            wrap = "truncate"
            glyph_cache_entries = 0

            [foreground]
            r = 10
            g = 20
            b = 30
            "#,
        )
        .unwrap();

        assert_eq!(config.wrap, WrapMode::Truncate);
        assert_eq!(config.glyph_cache_entries, 0);
        assert_eq!(config.foreground, Color::new(10, 20, 30));
        // Untouched keys keep their defaults
        assert_eq!(config.scrollback_chars, DEFAULT_SCROLLBACK_CHARS);
    }

    #[test]
    fn test_toml_roundtrip_keeps_wrap_mode() {
        let config = ConsoleConfig {
            wrap: WrapMode::Truncate,
            ..ConsoleConfig::default()
        };
        let text = config.to_toml_string().unwrap();
        assert!(text.contains("wrap = \"truncate\""));
        assert_eq!(ConsoleConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_invalid_values() {
        assert!(ConsoleConfig::from_toml_str("wrap = \"sideways\"").is_err());

        let zero = ConsoleConfig {
            size: Size::new(0, 100),
            ..ConsoleConfig::default()
        };
        assert!(matches!(
            zero.validate(),
            Err(ConsoleError::InvalidGeometry { width: 0, height: 100 })
        ));

        let no_buffer = ConsoleConfig {
            scrollback_chars: 0,
            ..ConsoleConfig::default()
        };
        assert!(matches!(no_buffer.validate(), Err(ConsoleError::Config(_))));
    }
}
