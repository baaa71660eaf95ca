//! Framebuffer for the 2.13" monochrome e-paper display
//!
//! The panel is natively 122x250 portrait; we draw in 250x122 landscape.
//! The buffer keeps the controller's RAM layout (16 bytes per gate line, bit
//! set = white) so it can be streamed to the display without conversion.
//! `BinaryColor::On` is ink.

use crate::config::{HEIGHT, WIDTH};
use crate::epd::{BUFFER_SIZE, ROW_BYTES, SOURCE_PIXELS, Window};
use alloc::boxed::Box;
use embedded_graphics_core::Pixel;
use embedded_graphics_core::draw_target::DrawTarget;
use embedded_graphics_core::geometry::{OriginDimensions, Size};
use embedded_graphics_core::pixelcolor::BinaryColor;
use embedded_graphics_core::primitives::Rectangle;

/// Bytes per row of a remote bitmap (rows padded to whole bytes)
pub const BITMAP_ROW_BYTES: usize = (WIDTH as usize).div_ceil(8);

/// Framebuffer for the 250x122 1-bit display
/// Uses heap allocation to keep it off the task stack
pub struct Framebuffer {
    buffer: Box<[u8; BUFFER_SIZE]>,
}

impl Framebuffer {
    /// Create a new framebuffer initialized to white
    pub fn new() -> Self {
        Self {
            buffer: Box::new([0xFF; BUFFER_SIZE]),
        }
    }

    /// Clear the entire framebuffer to white
    pub fn clear(&mut self) {
        self.buffer.fill(0xFF);
    }

    /// Get the raw buffer slice for sending to the display
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer[..]
    }

    /// Map a landscape coordinate to (byte index, bit mask) in panel RAM
    #[inline]
    fn locate(x: u32, y: u32) -> Option<(usize, u8)> {
        if x >= WIDTH || y >= HEIGHT {
            return None;
        }
        // Rotate 90°: landscape x runs down the gate lines
        let source = SOURCE_PIXELS - 1 - y;
        let gate = x;
        let idx = gate as usize * ROW_BYTES + source as usize / 8;
        Some((idx, 0x80 >> (source % 8)))
    }

    /// Write a single pixel at (x, y)
    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, color: BinaryColor) {
        if let Some((idx, mask)) = Self::locate(x, y) {
            match color {
                BinaryColor::On => self.buffer[idx] &= !mask,
                BinaryColor::Off => self.buffer[idx] |= mask,
            }
        }
    }

    /// Read back a pixel; out of bounds reads as white
    pub fn pixel(&self, x: u32, y: u32) -> BinaryColor {
        match Self::locate(x, y) {
            Some((idx, mask)) if self.buffer[idx] & mask == 0 => BinaryColor::On,
            _ => BinaryColor::Off,
        }
    }

    /// Fill a rectangular region with a color
    pub fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32, color: BinaryColor) {
        for row in y..(y + height).min(HEIGHT) {
            for col in x..(x + width).min(WIDTH) {
                self.set_pixel(col, row, color);
            }
        }
    }

    /// Paint a remote bitmap: row-major, MSB first, set bit = ink
    ///
    /// Rows beyond the end of `bitmap` stay white.
    pub fn draw_bitmap(&mut self, bitmap: &[u8]) {
        self.clear();
        for y in 0..HEIGHT {
            let row_start = y as usize * BITMAP_ROW_BYTES;
            if row_start >= bitmap.len() {
                break;
            }
            for x in 0..WIDTH {
                let Some(&byte) = bitmap.get(row_start + x as usize / 8) else {
                    break;
                };
                if byte & (0x80 >> (x % 8)) != 0 {
                    self.set_pixel(x, y, BinaryColor::On);
                }
            }
        }
    }

    /// Controller RAM window covering a landscape rectangle
    ///
    /// Source addresses are byte granular, so the window may extend past the
    /// rectangle on its top and bottom edges.
    pub fn window_for(area: &Rectangle) -> Option<Window> {
        let x0 = area.top_left.x.max(0) as u32;
        let y0 = area.top_left.y.max(0) as u32;
        let x1 = (area.top_left.x + area.size.width as i32).clamp(0, WIDTH as i32) as u32;
        let y1 = (area.top_left.y + area.size.height as i32).clamp(0, HEIGHT as i32) as u32;
        if x0 >= x1 || y0 >= y1 {
            return None;
        }

        let source_lo = SOURCE_PIXELS - y1;
        let source_hi = SOURCE_PIXELS - 1 - y0;
        Some(Window {
            x_start: (source_lo / 8) as u8,
            x_end: (source_hi / 8) as u8,
            y_start: x0 as u16,
            y_end: (x1 - 1) as u16,
        })
    }
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl OriginDimensions for Framebuffer {
    fn size(&self) -> Size {
        Size::new(WIDTH, HEIGHT)
    }
}

impl DrawTarget for Framebuffer {
    type Color = BinaryColor;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x >= 0 && point.y >= 0 {
                self.set_pixel(point.x as u32, point.y as u32, color);
            }
        }
        Ok(())
    }
}
