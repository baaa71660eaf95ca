//! Display manager: drawing and committing frames
//!
//! The wake cycle talks to a [`Renderer`]; it never touches pixels. The
//! [`Display`] implementation draws into a [`Framebuffer`] and remembers which
//! regions were redrawn so a partial commit only streams those windows to the
//! panel.

use core::fmt;

use embedded_graphics_core::primitives::Rectangle;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiDevice;
use heapless::Vec;
use log::{debug, info, warn};

use crate::clock::WallClock;
use crate::epd::{Epd2in13, Window};
use crate::framebuffer::Framebuffer;
use crate::screen::{self, LocalScene};

/// Upper bound on regions touched by one partial redraw
const MAX_DIRTY: usize = 4;

/// Content for a whole-screen draw
pub enum FullFrame<'a> {
    /// Remote bitmap, drawn verbatim
    Remote(&'a [u8]),
    /// Local weather/time layout
    Local(&'a LocalScene<'a>),
}

/// Content for one bounded region of the local layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionContent<'a> {
    Message(&'a str),
    Clock(Option<WallClock>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitKind {
    Full,
    Partial,
}

/// Rendering collaborator driven by the wake cycle
pub trait Renderer {
    type Error: fmt::Debug;

    /// Blank the pending frame
    fn clear(&mut self);

    fn draw_full_frame(&mut self, content: FullFrame<'_>);

    /// Redraw `region` only; nothing outside it may change
    fn draw_partial_region(&mut self, region: Rectangle, content: RegionContent<'_>);

    /// Push pending drawing to the physical panel
    fn commit(&mut self, kind: CommitKind) -> Result<(), Self::Error>;

    /// Power the panel down before suspend
    fn sleep(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Physical panel that can take a full frame or a RAM window of one
pub trait Panel {
    type Error: fmt::Debug;

    fn update_full(&mut self, frame: &[u8]) -> Result<(), Self::Error>;

    fn update_partial(&mut self, frame: &[u8], window: Window) -> Result<(), Self::Error>;

    fn sleep(&mut self) -> Result<(), Self::Error>;
}

impl<SPI, BUSY, DC, RST, DELAY> Panel for Epd2in13<SPI, BUSY, DC, RST, DELAY>
where
    SPI: SpiDevice,
    BUSY: InputPin,
    DC: OutputPin,
    RST: OutputPin,
    DELAY: DelayNs,
{
    type Error = SPI::Error;

    fn update_full(&mut self, frame: &[u8]) -> Result<(), Self::Error> {
        self.display_full(frame)
    }

    fn update_partial(&mut self, frame: &[u8], window: Window) -> Result<(), Self::Error> {
        self.display_partial(frame, window)
    }

    fn sleep(&mut self) -> Result<(), Self::Error> {
        Epd2in13::sleep(self)
    }
}

/// Framebuffer-backed renderer for a [`Panel`]
pub struct Display<P> {
    panel: P,
    framebuffer: Framebuffer,
    dirty: Vec<Rectangle, MAX_DIRTY>,
}

impl<P: Panel> Display<P> {
    pub fn new(panel: P) -> Self {
        Self {
            panel,
            framebuffer: Framebuffer::new(),
            dirty: Vec::new(),
        }
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    pub fn panel(&self) -> &P {
        &self.panel
    }
}

impl<P: Panel> Renderer for Display<P> {
    type Error = P::Error;

    fn clear(&mut self) {
        self.framebuffer.clear();
        self.dirty.clear();
    }

    fn draw_full_frame(&mut self, content: FullFrame<'_>) {
        match content {
            FullFrame::Remote(bitmap) => {
                debug!("Drawing remote bitmap ({} bytes)", bitmap.len());
                self.framebuffer.draw_bitmap(bitmap);
            }
            FullFrame::Local(scene) => screen::draw_local(&mut self.framebuffer, scene),
        }
        self.dirty.clear();
    }

    fn draw_partial_region(&mut self, region: Rectangle, content: RegionContent<'_>) {
        match content {
            RegionContent::Message(text) => screen::draw_message(&mut self.framebuffer, region, text),
            RegionContent::Clock(clock) => {
                screen::draw_clock(&mut self.framebuffer, region, clock.as_ref())
            }
        }
        if !self.dirty.contains(&region) && self.dirty.push(region).is_err() {
            warn!("Too many dirty regions, dropping {:?}", region);
        }
    }

    fn commit(&mut self, kind: CommitKind) -> Result<(), Self::Error> {
        match kind {
            CommitKind::Full => {
                info!("Full display refresh");
                self.panel.update_full(self.framebuffer.as_slice())?;
            }
            CommitKind::Partial => {
                info!("Partial display refresh, {} region(s)", self.dirty.len());
                for region in &self.dirty {
                    if let Some(window) = Framebuffer::window_for(region) {
                        self.panel.update_partial(self.framebuffer.as_slice(), window)?;
                    }
                }
            }
        }
        self.dirty.clear();
        Ok(())
    }

    fn sleep(&mut self) -> Result<(), Self::Error> {
        self.panel.sleep()
    }
}
