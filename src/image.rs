//! Key bitmaps
//!
//! A [`KeyImage`] is a plain RGB888 frame that apps draw into with
//! embedded-graphics. It is encoded to JPEG only when it is sent to a panel.

use core::convert::Infallible;

use embedded_graphics::pixelcolor::{Rgb888, RgbColor};
use embedded_graphics::prelude::*;
use jpeg_encoder::{ColorType, Encoder};

use crate::error::ImageError;

/// Owned RGB888 bitmap for one key
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyImage {
    width: u32,
    height: u32,
    pixels: Vec<Rgb888>,
}

impl KeyImage {
    /// Black square image of `size` x `size` pixels
    pub fn new(size: u32) -> Self {
        Self::solid(size, Rgb888::BLACK)
    }

    /// Square image filled with one color
    pub fn solid(size: u32, color: Rgb888) -> Self {
        Self {
            width: size,
            height: size,
            pixels: vec![color; (size * size) as usize],
        }
    }

    /// Build from packed RGB bytes, `None` if the length does not match
    pub fn from_rgb888(width: u32, height: u32, rgb: &[u8]) -> Option<Self> {
        if rgb.len() != (width * height * 3) as usize {
            return None;
        }
        let pixels = rgb
            .chunks_exact(3)
            .map(|px| Rgb888::new(px[0], px[1], px[2]))
            .collect();
        Some(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel at (x, y), `None` outside the image
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb888> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get((y * self.width + x) as usize).copied()
    }

    /// Same image turned by 180°
    pub fn rotated_180(&self) -> Self {
        let mut pixels = self.pixels.clone();
        pixels.reverse();
        Self {
            width: self.width,
            height: self.height,
            pixels,
        }
    }

    /// Nearest-neighbour scale to `size` x `size`
    pub fn resized(&self, size: u32) -> Self {
        if self.width == size && self.height == size {
            return self.clone();
        }
        if self.width == 0 || self.height == 0 {
            return Self::new(size);
        }

        let mut pixels = Vec::with_capacity((size * size) as usize);
        for y in 0..size {
            let src_y = y * self.height / size;
            for x in 0..size {
                let src_x = x * self.width / size;
                pixels.push(self.pixels[(src_y * self.width + src_x) as usize]);
            }
        }
        Self {
            width: size,
            height: size,
            pixels,
        }
    }

    /// Packed RGB bytes, row major
    pub fn to_rgb888(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|c| [c.r(), c.g(), c.b()])
            .collect()
    }

    /// Encode as baseline JPEG
    pub fn to_jpeg(&self, quality: u8) -> Result<Vec<u8>, ImageError> {
        let (Ok(width), Ok(height)) = (u16::try_from(self.width), u16::try_from(self.height))
        else {
            return Err(ImageError::TooLarge {
                width: self.width,
                height: self.height,
            });
        };

        let mut jpeg = Vec::new();
        Encoder::new(&mut jpeg, quality.clamp(1, 100))
            .encode(&self.to_rgb888(), width, height, ColorType::Rgb)
            .map_err(|e| ImageError::Encode {
                reason: e.to_string(),
            })?;
        Ok(jpeg)
    }
}

impl OriginDimensions for KeyImage {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DrawTarget for KeyImage {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(coord, color) in pixels {
            if coord.x >= 0
                && coord.y >= 0
                && (coord.x as u32) < self.width
                && (coord.y as u32) < self.height
            {
                let index = coord.y as u32 * self.width + coord.x as u32;
                self.pixels[index as usize] = color;
            }
        }
        Ok(())
    }
}
