//! Terminal presenter using crossterm
//!
//! Shows a [`Framebuffer`] on a text terminal. Each character cell carries
//! two pixels stacked vertically: the upper half block in the foreground
//! color, the lower half in the background color.

use std::io::{self, Write};

use crossterm::{
    queue,
    style::{Print, ResetColor, SetBackgroundColor, SetForegroundColor},
};

use crate::config::Color;
use crate::ui::framebuffer::Framebuffer;

const UPPER_HALF: char = '\u{2580}';

/// Framebuffer to terminal output
#[derive(Debug, Clone, Copy)]
pub struct Presenter {
    /// Sample every `step` pixels in both directions
    step: u32,
}

impl Default for Presenter {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Presenter {
    pub fn new(step: u32) -> Self {
        Self { step: step.max(1) }
    }

    /// Terminal columns and lines needed for a framebuffer
    pub fn cells(&self, fb: &Framebuffer) -> (u32, u32) {
        let size = fb.size();
        (size.width / self.step, size.height / (2 * self.step))
    }

    pub fn present<W: Write>(&self, out: &mut W, fb: &Framebuffer) -> io::Result<()> {
        let width = fb.size().width as usize;
        let pixels = fb.pixels();
        let sample = |x: u32, y: u32| -> Color {
            pixels
                .get(y as usize * width + x as usize)
                .copied()
                .unwrap_or_default()
        };

        let (cols, lines) = self.cells(fb);
        for line in 0..lines {
            let y = line * 2 * self.step;
            for col in 0..cols {
                let x = col * self.step;
                let upper = sample(x, y);
                let lower = sample(x, y + self.step);
                queue!(
                    out,
                    SetForegroundColor(upper.to_crossterm()),
                    SetBackgroundColor(lower.to_crossterm()),
                    Print(UPPER_HALF)
                )?;
            }
            queue!(out, ResetColor, Print("\r\n"))?;
        }
        out.flush()
    }
}
