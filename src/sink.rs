// Pixel destinations.
//
// The decoder never computes an address; it hands `(x, y, colour)`
// triples to a `Sink`. Two are provided: `Framebuffer`, an owned
// 16-bit bitmap, and `DisplaySink`, which forwards into any
// embedded-graphics `DrawTarget` speaking RGB555.

use alloc::vec;
use alloc::vec::Vec;

use embedded_graphics_core::{
    Pixel,
    draw_target::DrawTarget,
    geometry::Point,
    pixelcolor::Rgb555,
};

use crate::color::unpack;

pub trait Sink {
    /// Canvas width and height in pixels.
    fn canvas_size(&self) -> (u32, u32);

    /// Store one packed colour. `x`/`y` are always inside the canvas.
    fn write_pixel(&mut self, x: u32, y: u32, color: u16);
}

impl<K: Sink + ?Sized> Sink for &mut K {
    fn canvas_size(&self) -> (u32, u32) {
        (**self).canvas_size()
    }

    fn write_pixel(&mut self, x: u32, y: u32, color: u16) {
        (**self).write_pixel(x, y, color)
    }
}

/// Row-major 16-bit bitmap, the in-memory equivalent of graphics VRAM.
pub struct Framebuffer {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u16>, // width * height words
}

impl Framebuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0u16; width as usize * height as usize],
        }
    }

    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> u16 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    pub fn clear(&mut self) {
        self.data.fill(0);
    }
}

impl Sink for Framebuffer {
    fn canvas_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    fn write_pixel(&mut self, x: u32, y: u32, color: u16) {
        let idx = y as usize * self.width as usize + x as usize;
        self.data[idx] = color;
    }
}

/// Adapter onto an embedded-graphics display.
///
/// The canvas is the target's bounding box. `Sink` writes cannot fail, so
/// the first draw error is latched, later pixels are dropped, and the
/// error comes back from [`finish`](Self::finish).
pub struct DisplaySink<D: DrawTarget<Color = Rgb555>> {
    target: D,
    error: Option<D::Error>,
}

impl<D: DrawTarget<Color = Rgb555>> DisplaySink<D> {
    pub fn new(target: D) -> Self {
        Self {
            target,
            error: None,
        }
    }

    pub fn target(&self) -> &D {
        &self.target
    }

    /// Hand back the target, or the first draw error.
    pub fn finish(self) -> Result<D, D::Error> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.target),
        }
    }
}

impl<D: DrawTarget<Color = Rgb555>> Sink for DisplaySink<D> {
    fn canvas_size(&self) -> (u32, u32) {
        let bb = self.target.bounding_box();
        (bb.size.width, bb.size.height)
    }

    fn write_pixel(&mut self, x: u32, y: u32, color: u16) {
        if self.error.is_some() {
            return;
        }
        let (r, g, b) = unpack(color);
        let origin = self.target.bounding_box().top_left;
        let at = origin + Point::new(x as i32, y as i32);
        if let Err(e) = self
            .target
            .draw_iter(core::iter::once(Pixel(at, Rgb555::new(r, g, b))))
        {
            log::warn!("png: display draw failed at ({}, {})", x, y);
            self.error = Some(e);
        }
    }
}
