//! In-memory window
//!
//! A [`Window`] backed by a plain pixel array. The demo binary draws into it
//! and hands the result to the presenter; tests use it to inspect exactly
//! what a console drew. Capabilities and frame decoration are configurable
//! so every binding kind and scroll strategy can be exercised.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::config::Color;
use crate::error::SurfaceError;
use crate::ui::font::Bitmap;
use crate::ui::surface::{Capabilities, Point, Rect, Size, Window};

struct FbState {
    pixels: Vec<Color>,
    detached: bool,
    flushes: usize,
    moves: usize,
}

/// Pixel array window
pub struct Framebuffer {
    width: u32,
    height: u32,
    caps: Capabilities,
    border: u32,
    toolbar_height: u32,
    state: Mutex<FbState>,
}

impl Framebuffer {
    /// Undecorated window with every capability
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            caps: Capabilities::all(),
            border: 0,
            toolbar_height: 0,
            state: Mutex::new(FbState {
                pixels: vec![Color::default(); width as usize * height as usize],
                detached: false,
                flushes: 0,
                moves: 0,
            }),
        }
    }

    pub fn with_capabilities(mut self, caps: Capabilities) -> Self {
        self.caps = caps;
        self
    }

    /// Add a frame of `border` pixels and a toolbar strip below the top edge
    pub fn with_frame(mut self, border: u32, toolbar_height: u32) -> Self {
        self.border = border;
        self.toolbar_height = toolbar_height;
        self
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    fn lock(&self) -> MutexGuard<'_, FbState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Locked state, or `WindowGone` once detached
    fn live(&self) -> Result<MutexGuard<'_, FbState>, SurfaceError> {
        let state = self.lock();
        if state.detached {
            return Err(SurfaceError::WindowGone);
        }
        Ok(state)
    }

    fn index(&self, x: i32, y: i32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Simulate the window being closed underneath its users
    pub fn detach(&self) {
        self.lock().detached = true;
    }

    pub fn is_detached(&self) -> bool {
        self.lock().detached
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let index = self.index(x as i32, y as i32);
        self.lock().pixels.get(index).copied()
    }

    /// Copy of every pixel, row-major
    pub fn pixels(&self) -> Vec<Color> {
        self.lock().pixels.clone()
    }

    /// Pixels of `color` inside `rect`
    pub fn count_pixels(&self, rect: Rect, color: Color) -> usize {
        let Some(rect) = rect.intersect(&self.bounds()) else {
            return 0;
        };
        let state = self.lock();
        let mut count = 0;
        for y in rect.y..rect.bottom() as i32 {
            for x in rect.x..rect.right() as i32 {
                if state.pixels[self.index(x, y)] == color {
                    count += 1;
                }
            }
        }
        count
    }

    pub fn flush_count(&self) -> usize {
        self.lock().flushes
    }

    pub fn move_count(&self) -> usize {
        self.lock().moves
    }
}

impl Window for Framebuffer {
    fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    fn client_area(&self) -> Rect {
        let top = self.border + self.toolbar_height;
        Rect::new(
            self.border as i32,
            top as i32,
            self.width.saturating_sub(2 * self.border),
            self.height.saturating_sub(top + self.border),
        )
    }

    fn toolbar_area(&self) -> Option<Rect> {
        (self.toolbar_height > 0).then(|| {
            Rect::new(
                self.border as i32,
                self.border as i32,
                self.width.saturating_sub(2 * self.border),
                self.toolbar_height,
            )
        })
    }

    fn capabilities(&self) -> Capabilities {
        self.caps
    }

    fn fill(&self, rect: Rect, color: Color) -> Result<(), SurfaceError> {
        let mut state = self.live()?;
        let Some(rect) = rect.intersect(&self.bounds()) else {
            return Ok(());
        };
        for y in rect.y..rect.bottom() as i32 {
            let start = self.index(rect.x, y);
            state.pixels[start..start + rect.width as usize].fill(color);
        }
        Ok(())
    }

    fn bitmap(
        &self,
        origin: Point,
        clip: Rect,
        bitmap: &Bitmap,
        fg: Color,
        bg: Color,
    ) -> Result<(), SurfaceError> {
        let mut state = self.live()?;
        let extent = Rect::new(origin.x, origin.y, bitmap.width(), bitmap.height());
        let Some(area) = extent
            .intersect(&clip)
            .and_then(|r| r.intersect(&self.bounds()))
        else {
            return Ok(());
        };
        for y in area.y..area.bottom() as i32 {
            for x in area.x..area.right() as i32 {
                let on = bitmap.get((x - origin.x) as u32, (y - origin.y) as u32);
                let index = self.index(x, y);
                state.pixels[index] = if on { fg } else { bg };
            }
        }
        Ok(())
    }

    fn move_rect(&self, rect: Rect, offset: Point) -> Result<(), SurfaceError> {
        if !self.caps.contains(Capabilities::MOVE) {
            return Err(SurfaceError::Unsupported);
        }
        let mut state = self.live()?;
        let bounds = self.bounds();
        let src = rect;
        let dst = src.translate(offset);
        if src.intersect(&bounds) != Some(src) || dst.intersect(&bounds) != Some(dst) {
            return Err(SurfaceError::OutOfBounds);
        }

        let mut copied = Vec::with_capacity(src.width as usize * src.height as usize);
        for y in src.y..src.bottom() as i32 {
            let start = self.index(src.x, y);
            copied.extend_from_slice(&state.pixels[start..start + src.width as usize]);
        }
        for (row, y) in (dst.y..dst.bottom() as i32).enumerate() {
            let start = self.index(dst.x, y);
            let line = &copied[row * src.width as usize..(row + 1) * src.width as usize];
            state.pixels[start..start + src.width as usize].copy_from_slice(line);
        }
        state.moves += 1;
        Ok(())
    }

    fn flush(&self) -> Result<(), SurfaceError> {
        let mut state = self.live()?;
        state.flushes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Color = Color::new(255, 0, 0);
    const BLUE: Color = Color::new(0, 0, 255);

    #[test]
    fn test_fill_clips_to_bounds() {
        let fb = Framebuffer::new(4, 4);
        fb.fill(Rect::new(2, 2, 10, 10), RED).unwrap();
        assert_eq!(fb.count_pixels(fb.bounds(), RED), 4);
        assert_eq!(fb.pixel(3, 3), Some(RED));
        assert_eq!(fb.pixel(1, 1), Some(Color::default()));
        assert_eq!(fb.pixel(4, 0), None);
    }

    #[test]
    fn test_bitmap_respects_clip() {
        let fb = Framebuffer::new(8, 8);
        let mut bitmap = Bitmap::new(4, 4);
        bitmap.set(0, 0, true);
        bitmap.set(3, 3, true);

        fb.bitmap(Point::new(2, 2), Rect::new(2, 2, 3, 3), &bitmap, RED, BLUE)
            .unwrap();

        assert_eq!(fb.pixel(2, 2), Some(RED));
        // (3, 3) of the bitmap lands at (5, 5), outside the clip
        assert_eq!(fb.pixel(5, 5), Some(Color::default()));
        assert_eq!(fb.count_pixels(fb.bounds(), BLUE), 8);
    }

    #[test]
    fn test_move_rect() {
        let fb = Framebuffer::new(4, 4);
        fb.fill(Rect::new(0, 2, 4, 2), RED).unwrap();
        fb.move_rect(Rect::new(0, 1, 4, 3), Point::new(0, -1)).unwrap();

        assert_eq!(fb.count_pixels(Rect::new(0, 1, 4, 2), RED), 8);
        // The last row is left as it was
        assert_eq!(fb.count_pixels(Rect::new(0, 3, 4, 1), RED), 4);
        assert_eq!(fb.count_pixels(Rect::new(0, 0, 4, 1), RED), 0);
        assert_eq!(fb.move_count(), 1);

        assert_eq!(
            fb.move_rect(Rect::new(0, 0, 4, 4), Point::new(0, -1)),
            Err(SurfaceError::OutOfBounds)
        );
    }

    #[test]
    fn test_move_requires_capability() {
        let fb = Framebuffer::new(4, 4).with_capabilities(Capabilities::READBACK);
        assert_eq!(
            fb.move_rect(Rect::new(0, 1, 4, 3), Point::new(0, -1)),
            Err(SurfaceError::Unsupported)
        );
    }

    #[test]
    fn test_frame_areas() {
        let fb = Framebuffer::new(100, 80).with_frame(2, 10);
        assert_eq!(fb.client_area(), Rect::new(2, 12, 96, 66));
        assert_eq!(fb.toolbar_area(), Some(Rect::new(2, 2, 96, 10)));
        assert_eq!(Framebuffer::new(10, 10).toolbar_area(), None);
    }

    #[test]
    fn test_detached_window_fails() {
        let fb = Framebuffer::new(4, 4);
        fb.flush().unwrap();
        fb.detach();
        assert_eq!(fb.fill(fb.bounds(), RED), Err(SurfaceError::WindowGone));
        assert_eq!(fb.flush(), Err(SurfaceError::WindowGone));
        assert_eq!(fb.flush_count(), 1);
    }
}
