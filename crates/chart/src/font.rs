//! 5x7 bitmap font for chart labels.
//!
//! Each glyph is 7 rows of 5 bits, most significant bit leftmost. Letters are
//! uppercase only; lowercase input is drawn with the uppercase glyph.

use image::RgbImage;

use crate::scheme::Rgb;

pub const GLYPH_WIDTH: u32 = 5;
pub const GLYPH_HEIGHT: u32 = 7;
/// Horizontal advance per character, in font pixels.
pub const ADVANCE: u32 = GLYPH_WIDTH + 1;

type Glyph = [u8; 7];

#[rustfmt::skip]
fn glyph(c: char) -> Option<Glyph> {
    let g = match c.to_ascii_uppercase() {
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        '3' => [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'B' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'D' => [0b11100, 0b10010, 0b10001, 0b10001, 0b10001, 0b10010, 0b11100],
        'E' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
        'F' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000],
        'G' => [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01111],
        'H' => [0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'I' => [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        'J' => [0b00111, 0b00010, 0b00010, 0b00010, 0b00010, 0b10010, 0b01100],
        'K' => [0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001],
        'L' => [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111],
        'M' => [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001],
        'N' => [0b10001, 0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001],
        'O' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'P' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000],
        'Q' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10101, 0b10010, 0b01101],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'S' => [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        'U' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'V' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01010, 0b00100],
        'W' => [0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b10101, 0b01010],
        'X' => [0b10001, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001, 0b10001],
        'Y' => [0b10001, 0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100],
        'Z' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b11111],
        '-' => [0b00000, 0b00000, 0b00000, 0b11111, 0b00000, 0b00000, 0b00000],
        '+' => [0b00000, 0b00100, 0b00100, 0b11111, 0b00100, 0b00100, 0b00000],
        '*' => [0b00000, 0b00100, 0b10101, 0b01110, 0b10101, 0b00100, 0b00000],
        '=' => [0b00000, 0b00000, 0b11111, 0b00000, 0b11111, 0b00000, 0b00000],
        '.' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b01100, 0b01100],
        ',' => [0b00000, 0b00000, 0b00000, 0b00000, 0b01100, 0b00100, 0b01000],
        ':' => [0b00000, 0b01100, 0b01100, 0b00000, 0b01100, 0b01100, 0b00000],
        '(' => [0b00010, 0b00100, 0b01000, 0b01000, 0b01000, 0b00100, 0b00010],
        ')' => [0b01000, 0b00100, 0b00010, 0b00010, 0b00010, 0b00100, 0b01000],
        '/' => [0b00000, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b00000],
        '<' => [0b00010, 0b00100, 0b01000, 0b10000, 0b01000, 0b00100, 0b00010],
        '%' => [0b11000, 0b11001, 0b00010, 0b00100, 0b01000, 0b10011, 0b00011],
        '_' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b11111],
        ' ' => [0; 7],
        _ => return None,
    };
    Some(g)
}

/// Rendered width of `text` at `scale`, in image pixels.
pub fn text_width(text: &str, scale: u32) -> u32 {
    let n = text.chars().count() as u32;
    if n == 0 {
        0
    } else {
        (n * ADVANCE - 1) * scale
    }
}

/// Rendered height of one line at `scale`.
pub fn text_height(scale: u32) -> u32 {
    GLYPH_HEIGHT * scale
}

/// Draw `text` with its top-left corner at `(x, y)`. Clipped to the image;
/// characters without a glyph leave a gap.
pub fn draw_text(img: &mut RgbImage, x: i64, y: i64, text: &str, scale: u32, color: Rgb) {
    let mut pen_x = x;
    for c in text.chars() {
        if let Some(g) = glyph(c) {
            draw_glyph(img, pen_x, y, &g, scale, color);
        }
        pen_x += (ADVANCE * scale) as i64;
    }
}

/// Draw `text` one character per line, top to bottom, centered on `x`.
pub fn draw_text_vertical(img: &mut RgbImage, x: i64, y: i64, text: &str, scale: u32, color: Rgb) {
    let line = ((GLYPH_HEIGHT + 1) * scale) as i64;
    let left = x - (GLYPH_WIDTH * scale / 2) as i64;
    for (i, c) in text.chars().enumerate() {
        if let Some(g) = glyph(c) {
            draw_glyph(img, left, y + i as i64 * line, &g, scale, color);
        }
    }
}

/// Height of [`draw_text_vertical`] output.
pub fn vertical_text_height(text: &str, scale: u32) -> u32 {
    let n = text.chars().count() as u32;
    if n == 0 {
        0
    } else {
        (n * (GLYPH_HEIGHT + 1) - 1) * scale
    }
}

fn draw_glyph(img: &mut RgbImage, x: i64, y: i64, g: &Glyph, scale: u32, color: Rgb) {
    let px = color.to_pixel();
    let s = scale as i64;
    for (row, &bits) in g.iter().enumerate() {
        for col in 0..GLYPH_WIDTH {
            if bits & (1u8 << (GLYPH_WIDTH - 1 - col)) == 0 {
                continue;
            }
            let x0 = x + col as i64 * s;
            let y0 = y + row as i64 * s;
            for dy in 0..s {
                for dx in 0..s {
                    let (xx, yy) = (x0 + dx, y0 + dy);
                    if xx >= 0 && yy >= 0 && (xx as u32) < img.width() && (yy as u32) < img.height() {
                        img.put_pixel(xx as u32, yy as u32, px);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widths() {
        assert_eq!(text_width("", 2), 0);
        assert_eq!(text_width("0", 1), 5);
        assert_eq!(text_width("2020-01-01", 2), (10 * 6 - 1) * 2);
        assert_eq!(text_height(3), 21);
        assert_eq!(vertical_text_height("NDVI", 1), 4 * 8 - 1);
    }

    #[test]
    fn lowercase_uses_uppercase_glyphs() {
        assert_eq!(glyph('n'), glyph('N'));
        assert!(glyph('-').is_some());
        // No glyph: drawn as a gap
        assert!(glyph('é').is_none());
    }

    #[test]
    fn draws_inside_and_clips_outside() {
        let mut img = RgbImage::from_pixel(8, 8, Rgb::WHITE.to_pixel());
        draw_text(&mut img, 0, 0, "1", 1, Rgb::BLACK);
        // Top row of '1' is 00100
        assert_eq!(img.get_pixel(2, 0), &Rgb::BLACK.to_pixel());
        assert_eq!(img.get_pixel(0, 0), &Rgb::WHITE.to_pixel());

        // Partially off-canvas text must not panic
        draw_text(&mut img, -3, 5, "88", 2, Rgb::BLACK);
        draw_text_vertical(&mut img, 7, -10, "AB", 2, Rgb::BLACK);
    }
}
