//! Built-in key sprites
//!
//! Drawn with embedded-graphics at the requested size, so every panel model
//! gets crisp glyphs without shipping bitmap assets.

use embedded_graphics::mono_font::ascii::FONT_7X13;
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::pixelcolor::{Rgb888, RgbColor};
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle, Triangle};
use embedded_graphics::text::{Alignment, Baseline, Text, TextStyleBuilder};

use crate::image::KeyImage;

/// Blank key
pub fn clear(size: u32) -> KeyImage {
    KeyImage::new(size)
}

/// Single-color key
pub fn solid(size: u32, color: Rgb888) -> KeyImage {
    KeyImage::solid(size, color)
}

/// Left-pointing arrow shown on the back key while an app runs
pub fn back_button(size: u32) -> KeyImage {
    let mut image = KeyImage::new(size);
    let s = size as i32;
    let fill = PrimitiveStyle::with_fill(Rgb888::WHITE);

    let head = Triangle::new(
        Point::new(s / 5, s / 2),
        Point::new(s / 2, s / 4),
        Point::new(s / 2, s * 3 / 4),
    );
    let shaft = Rectangle::new(
        Point::new(s / 2 - 1, s * 2 / 5),
        Size::new(size * 3 / 10, size / 5),
    );

    // Infallible target
    let _ = head.into_styled(fill).draw(&mut image);
    let _ = shaft.into_styled(fill).draw(&mut image);
    image
}

/// Copy of `base` with `label` centered near the bottom on a dimmed backdrop
pub fn labeled(base: &KeyImage, label: &str) -> KeyImage {
    let mut image = base.clone();
    let position = Point::new(
        base.width() as i32 / 2,
        base.height() as i32 * 52 / 72,
    );
    let character_style = MonoTextStyle::new(&FONT_7X13, Rgb888::WHITE);
    let text_style = TextStyleBuilder::new()
        .alignment(Alignment::Center)
        .baseline(Baseline::Middle)
        .build();
    let text = Text::with_text_style(label, position, character_style, text_style);

    darken(&mut image, text.bounding_box());
    let _ = text.draw(&mut image);
    image
}

// Halve every channel inside `area`
fn darken(image: &mut KeyImage, area: Rectangle) {
    let dimmed: Vec<Pixel<Rgb888>> = area
        .points()
        .filter_map(|p| {
            let color = image.pixel(u32::try_from(p.x).ok()?, u32::try_from(p.y).ok()?)?;
            Some(Pixel(
                p,
                Rgb888::new(color.r() / 2, color.g() / 2, color.b() / 2),
            ))
        })
        .collect();
    let _ = image.draw_iter(dimmed);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn back_button_has_white_arrow_on_black() {
        let image = back_button(72);
        assert_eq!(image.pixel(0, 0), Some(Rgb888::BLACK));
        assert_eq!(image.pixel(36, 36), Some(Rgb888::WHITE));
        assert_eq!(image.pixel(20, 36), Some(Rgb888::WHITE));
    }

    #[test]
    fn label_dims_the_backdrop_only() {
        let base = solid(72, Rgb888::new(200, 100, 50));
        let image = labeled(&base, "Hue");
        assert_eq!(image.pixel(0, 0), Some(Rgb888::new(200, 100, 50)));
        assert_eq!(image.pixel(36, 5), Some(Rgb888::new(200, 100, 50)));

        let row: Vec<Rgb888> = (0..72).filter_map(|x| image.pixel(x, 52)).collect();
        assert!(row.contains(&Rgb888::new(100, 50, 25)));
        assert!(row.contains(&Rgb888::WHITE));
        assert_eq!(row[0], Rgb888::new(200, 100, 50));
    }

    #[test]
    fn sprites_match_requested_size() {
        assert_eq!(clear(96).size(), Size::new(96, 96));
        assert_eq!(back_button(96).size(), Size::new(96, 96));
    }
}
