//! Drawing side of the console.
//!
//! - **surface**: geometry, capability flags and the window binding
//! - **font**: font capability and the built-in 8x8 font
//! - **renderer**: redraw and scroll engine
//! - **framebuffer**: in-memory window
//! - **presenter**: shows a framebuffer on a text terminal

pub mod font;
pub mod framebuffer;
pub mod presenter;
pub mod renderer;
pub mod surface;

pub use font::{Bitmap, Font8x8, FontId, FontMetrics, FontProvider, Glyph};
pub use framebuffer::Framebuffer;
pub use presenter::Presenter;
pub use renderer::{CellGeometry, Renderer, ScrollStrategy};
pub use surface::{BindingKind, Capabilities, Point, Rect, Size, Surface, Window};
