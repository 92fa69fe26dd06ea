//! Core console components.
//!
//! - **glyph_cache**: bounded LRU of rendered glyphs, shareable across sessions
//! - **scrollback**: bounded store of the characters behind the visible window
//! - **term**: byte decoder plus the cursor and wrap state machine
//! - **session**: one console bound to a window region
//!
//! # Architecture
//!
//! ```text
//! Session
//! ├── Decoder (bytes to inputs)
//! ├── Terminal (cursor + wrap rules)
//! │   └── ScrollbackBuffer
//! └── Renderer (ui) ── GlyphCache (shared)
//! ```

pub mod glyph_cache;
pub mod scrollback;
pub mod session;
pub mod term;
