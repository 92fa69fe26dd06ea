//! Drawable surface binding
//!
//! The windowing system is an external collaborator. It implements [`Window`]
//! in window-relative pixel coordinates. The console never talks to a window
//! directly: it draws through a [`Surface`], which is a window handle plus the
//! sub-rectangle the console owns. Raw windows, framed windows and toolbars
//! all reduce to that one shape, so nothing past this module branches on the
//! kind of window.

use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::config::Color;
use crate::error::SurfaceError;
use crate::ui::font::Bitmap;

/// Pixel size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Pixel position (or offset)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Pixel rectangle, half-open on the right and bottom edges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Rectangle at the origin covering `size`
    pub const fn from_size(size: Size) -> Self {
        Self::new(0, 0, size.width, size.height)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn right(&self) -> i64 {
        self.x as i64 + self.width as i64
    }

    pub fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x
            && p.y >= self.y
            && (p.x as i64) < self.right()
            && (p.y as i64) < self.bottom()
    }

    /// Overlapping part of two rectangles, `None` when they do not touch
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= x as i64 || bottom <= y as i64 {
            return None;
        }
        Some(Rect::new(
            x,
            y,
            (right - x as i64) as u32,
            (bottom - y as i64) as u32,
        ))
    }

    /// Same rectangle moved by `offset`
    pub fn translate(&self, offset: Point) -> Rect {
        Rect::new(
            self.x.saturating_add(offset.x),
            self.y.saturating_add(offset.y),
            self.width,
            self.height,
        )
    }
}

bitflags! {
    /// Optional abilities of a window backend
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Capabilities: u8 {
        /// Can copy a region of itself to another offset
        const MOVE           = 0b0000_0001;
        /// Can read back its own pixel content
        const READBACK       = 0b0000_0010;
        /// Batches drawing until `flush`
        const DEFERRED_FLUSH = 0b0000_0100;
    }
}

/// The external windowing collaborator.
///
/// All coordinates are window-relative. Implementations are expected to clip
/// to `clip` and to their own bounds; the console always passes a clip that
/// lies inside the region it is bound to.
pub trait Window: Send + Sync {
    /// The whole window
    fn bounds(&self) -> Rect;

    /// Drawable area inside any frame decoration
    fn client_area(&self) -> Rect {
        self.bounds()
    }

    /// Toolbar strip of a framed window, if it has one
    fn toolbar_area(&self) -> Option<Rect> {
        None
    }

    fn capabilities(&self) -> Capabilities;

    /// Fill `rect` with a solid color
    fn fill(&self, rect: Rect, color: Color) -> Result<(), SurfaceError>;

    /// Draw a one-bit bitmap at `origin`, set bits in `fg`, clear bits in `bg`
    fn bitmap(
        &self,
        origin: Point,
        clip: Rect,
        bitmap: &Bitmap,
        fg: Color,
        bg: Color,
    ) -> Result<(), SurfaceError>;

    /// Copy the pixels of `rect` to `rect` moved by `offset`
    fn move_rect(&self, _rect: Rect, _offset: Point) -> Result<(), SurfaceError> {
        Err(SurfaceError::Unsupported)
    }

    /// Present anything drawn since the last flush
    fn flush(&self) -> Result<(), SurfaceError> {
        Ok(())
    }
}

/// Which entry point produced a binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Raw,
    Framed,
    Toolbar,
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BindingKind::Raw => "raw window",
            BindingKind::Framed => "framed window",
            BindingKind::Toolbar => "toolbar",
        };
        f.write_str(name)
    }
}

/// A window handle plus the sub-rectangle the console draws into.
///
/// Every method takes console-relative coordinates and clips to the bound
/// area. The window itself is shared; dropping a `Surface` never affects the
/// window beyond releasing this handle.
#[derive(Clone)]
pub struct Surface {
    window: Arc<dyn Window>,
    area: Rect,
    kind: BindingKind,
}

impl fmt::Debug for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Surface")
            .field("area", &self.area)
            .field("kind", &self.kind)
            .finish()
    }
}

impl Surface {
    /// Bind to the whole of a raw window
    pub fn raw(window: Arc<dyn Window>) -> Self {
        let area = window.bounds();
        Self { window, area, kind: BindingKind::Raw }
    }

    /// Bind to the client area of a framed window
    pub fn framed(window: Arc<dyn Window>) -> Self {
        let area = window.client_area();
        Self { window, area, kind: BindingKind::Framed }
    }

    /// Bind to the toolbar of a framed window
    pub fn toolbar(window: Arc<dyn Window>) -> Result<Self, SurfaceError> {
        let area = window.toolbar_area().ok_or(SurfaceError::Unsupported)?;
        Ok(Self { window, area, kind: BindingKind::Toolbar })
    }

    pub fn kind(&self) -> BindingKind {
        self.kind
    }

    /// Bound area in window coordinates
    pub fn area(&self) -> Rect {
        self.area
    }

    /// Size of the bound area
    pub fn size(&self) -> Size {
        self.area.size()
    }

    pub fn capabilities(&self) -> Capabilities {
        self.window.capabilities()
    }

    /// Same window, area narrowed to at most `size` from the current origin
    pub fn restrict(&self, size: Size) -> Surface {
        let area = Rect::new(
            self.area.x,
            self.area.y,
            size.width.min(self.area.width),
            size.height.min(self.area.height),
        );
        Surface { window: Arc::clone(&self.window), area, kind: self.kind }
    }

    /// Console-relative rectangle to window coordinates, clipped to the area
    fn to_window(&self, rect: Rect) -> Option<Rect> {
        rect.translate(self.area.origin()).intersect(&self.area)
    }

    pub fn fill(&self, rect: Rect, color: Color) -> Result<(), SurfaceError> {
        match self.to_window(rect) {
            Some(rect) => self.window.fill(rect, color),
            None => Ok(()),
        }
    }

    /// Draw `bitmap` at `origin`, never touching pixels outside `clip`
    pub fn blit(
        &self,
        origin: Point,
        clip: Rect,
        bitmap: &Bitmap,
        fg: Color,
        bg: Color,
    ) -> Result<(), SurfaceError> {
        let Some(clip) = self.to_window(clip) else {
            return Ok(());
        };
        let origin = Point::new(
            origin.x.saturating_add(self.area.x),
            origin.y.saturating_add(self.area.y),
        );
        self.window.bitmap(origin, clip, bitmap, fg, bg)
    }

    /// Copy `rect` by `offset`; both ends must stay inside the area
    pub fn move_rect(&self, rect: Rect, offset: Point) -> Result<(), SurfaceError> {
        let src = rect.translate(self.area.origin());
        let dst = src.translate(offset);
        if src.intersect(&self.area) != Some(src) || dst.intersect(&self.area) != Some(dst) {
            return Err(SurfaceError::OutOfBounds);
        }
        self.window.move_rect(src, offset)
    }

    pub fn flush(&self) -> Result<(), SurfaceError> {
        self.window.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_intersect() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, 5, 10, 10);
        assert_eq!(a.intersect(&b), Some(Rect::new(5, 5, 5, 5)));

        let c = Rect::new(10, 0, 4, 4);
        assert_eq!(a.intersect(&c), None);

        let d = Rect::new(-3, -3, 5, 5);
        assert_eq!(a.intersect(&d), Some(Rect::new(0, 0, 2, 2)));
    }

    #[test]
    fn test_rect_contains() {
        let r = Rect::new(2, 2, 3, 3);
        assert!(r.contains(Point::new(2, 2)));
        assert!(r.contains(Point::new(4, 4)));
        assert!(!r.contains(Point::new(5, 4)));
        assert!(!r.contains(Point::new(1, 3)));
    }

    #[test]
    fn test_capabilities() {
        let caps = Capabilities::MOVE | Capabilities::READBACK;
        assert!(caps.contains(Capabilities::MOVE));
        assert!(!caps.contains(Capabilities::DEFERRED_FLUSH));
        assert!(Capabilities::default().is_empty());
    }
}
