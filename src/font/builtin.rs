//! Embedded 5x7 bitmap font, the last-resort fallback.
//!
//! Glyphs are stored column-major: each byte is one column, bit 0 is the top
//! row. A glyph occupies a 6-column cell (5 ink + 1 gap) and is magnified by
//! an integer factor derived from the requested point size.

use image::{Rgba, RgbaImage};

const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;
const CELL_WIDTH: u32 = GLYPH_WIDTH + 1;

/// Printable ASCII, `' '` (0x20) through `'~'` (0x7E).
const ASCII: [[u8; 5]; 95] = [
    [0x00, 0x00, 0x00, 0x00, 0x00], // ' '
    [0x00, 0x00, 0x5F, 0x00, 0x00], // !
    [0x00, 0x07, 0x00, 0x07, 0x00], // "
    [0x14, 0x7F, 0x14, 0x7F, 0x14], // #
    [0x24, 0x2A, 0x7F, 0x2A, 0x12], // $
    [0x23, 0x13, 0x08, 0x64, 0x62], // %
    [0x36, 0x49, 0x55, 0x22, 0x50], // &
    [0x00, 0x05, 0x03, 0x00, 0x00], // '
    [0x00, 0x1C, 0x22, 0x41, 0x00], // (
    [0x00, 0x41, 0x22, 0x1C, 0x00], // )
    [0x08, 0x2A, 0x1C, 0x2A, 0x08], // *
    [0x08, 0x08, 0x3E, 0x08, 0x08], // +
    [0x00, 0x50, 0x30, 0x00, 0x00], // ,
    [0x08, 0x08, 0x08, 0x08, 0x08], // -
    [0x00, 0x60, 0x60, 0x00, 0x00], // .
    [0x20, 0x10, 0x08, 0x04, 0x02], // /
    [0x3E, 0x51, 0x49, 0x45, 0x3E], // 0
    [0x00, 0x42, 0x7F, 0x40, 0x00], // 1
    [0x42, 0x61, 0x51, 0x49, 0x46], // 2
    [0x21, 0x41, 0x45, 0x4B, 0x31], // 3
    [0x18, 0x14, 0x12, 0x7F, 0x10], // 4
    [0x27, 0x45, 0x45, 0x45, 0x39], // 5
    [0x3C, 0x4A, 0x49, 0x49, 0x30], // 6
    [0x01, 0x71, 0x09, 0x05, 0x03], // 7
    [0x36, 0x49, 0x49, 0x49, 0x36], // 8
    [0x06, 0x49, 0x49, 0x29, 0x1E], // 9
    [0x00, 0x36, 0x36, 0x00, 0x00], // :
    [0x00, 0x56, 0x36, 0x00, 0x00], // ;
    [0x08, 0x14, 0x22, 0x41, 0x00], // <
    [0x14, 0x14, 0x14, 0x14, 0x14], // =
    [0x00, 0x41, 0x22, 0x14, 0x08], // >
    [0x02, 0x01, 0x51, 0x09, 0x06], // ?
    [0x32, 0x49, 0x79, 0x41, 0x3E], // @
    [0x7E, 0x11, 0x11, 0x11, 0x7E], // A
    [0x7F, 0x49, 0x49, 0x49, 0x36], // B
    [0x3E, 0x41, 0x41, 0x41, 0x22], // C
    [0x7F, 0x41, 0x41, 0x22, 0x1C], // D
    [0x7F, 0x49, 0x49, 0x49, 0x41], // E
    [0x7F, 0x09, 0x09, 0x09, 0x01], // F
    [0x3E, 0x41, 0x49, 0x49, 0x7A], // G
    [0x7F, 0x08, 0x08, 0x08, 0x7F], // H
    [0x00, 0x41, 0x7F, 0x41, 0x00], // I
    [0x20, 0x40, 0x41, 0x3F, 0x01], // J
    [0x7F, 0x08, 0x14, 0x22, 0x41], // K
    [0x7F, 0x40, 0x40, 0x40, 0x40], // L
    [0x7F, 0x02, 0x0C, 0x02, 0x7F], // M
    [0x7F, 0x04, 0x08, 0x10, 0x7F], // N
    [0x3E, 0x41, 0x41, 0x41, 0x3E], // O
    [0x7F, 0x09, 0x09, 0x09, 0x06], // P
    [0x3E, 0x41, 0x51, 0x21, 0x5E], // Q
    [0x7F, 0x09, 0x19, 0x29, 0x46], // R
    [0x46, 0x49, 0x49, 0x49, 0x31], // S
    [0x01, 0x01, 0x7F, 0x01, 0x01], // T
    [0x3F, 0x40, 0x40, 0x40, 0x3F], // U
    [0x1F, 0x20, 0x40, 0x20, 0x1F], // V
    [0x3F, 0x40, 0x38, 0x40, 0x3F], // W
    [0x63, 0x14, 0x08, 0x14, 0x63], // X
    [0x07, 0x08, 0x70, 0x08, 0x07], // Y
    [0x61, 0x51, 0x49, 0x45, 0x43], // Z
    [0x00, 0x7F, 0x41, 0x41, 0x00], // [
    [0x02, 0x04, 0x08, 0x10, 0x20], // \
    [0x00, 0x41, 0x41, 0x7F, 0x00], // ]
    [0x04, 0x02, 0x01, 0x02, 0x04], // ^
    [0x40, 0x40, 0x40, 0x40, 0x40], // _
    [0x00, 0x01, 0x02, 0x04, 0x00], // `
    [0x20, 0x54, 0x54, 0x54, 0x78], // a
    [0x7F, 0x48, 0x44, 0x44, 0x38], // b
    [0x38, 0x44, 0x44, 0x44, 0x20], // c
    [0x38, 0x44, 0x44, 0x48, 0x7F], // d
    [0x38, 0x54, 0x54, 0x54, 0x18], // e
    [0x08, 0x7E, 0x09, 0x01, 0x02], // f
    [0x0C, 0x52, 0x52, 0x52, 0x3E], // g
    [0x7F, 0x08, 0x04, 0x04, 0x78], // h
    [0x00, 0x44, 0x7D, 0x40, 0x00], // i
    [0x20, 0x40, 0x44, 0x3D, 0x00], // j
    [0x7F, 0x10, 0x28, 0x44, 0x00], // k
    [0x00, 0x41, 0x7F, 0x40, 0x00], // l
    [0x7C, 0x04, 0x18, 0x04, 0x78], // m
    [0x7C, 0x08, 0x04, 0x04, 0x78], // n
    [0x38, 0x44, 0x44, 0x44, 0x38], // o
    [0x7C, 0x14, 0x14, 0x14, 0x08], // p
    [0x08, 0x14, 0x14, 0x18, 0x7C], // q
    [0x7C, 0x08, 0x04, 0x04, 0x08], // r
    [0x48, 0x54, 0x54, 0x54, 0x20], // s
    [0x04, 0x3F, 0x44, 0x40, 0x20], // t
    [0x3C, 0x40, 0x40, 0x20, 0x7C], // u
    [0x1C, 0x20, 0x40, 0x20, 0x1C], // v
    [0x3C, 0x40, 0x30, 0x40, 0x3C], // w
    [0x44, 0x28, 0x10, 0x28, 0x44], // x
    [0x0C, 0x50, 0x50, 0x50, 0x3C], // y
    [0x44, 0x64, 0x54, 0x4C, 0x44], // z
    [0x00, 0x08, 0x36, 0x41, 0x00], // {
    [0x00, 0x00, 0x7F, 0x00, 0x00], // |
    [0x00, 0x41, 0x36, 0x08, 0x00], // }
    [0x08, 0x04, 0x08, 0x10, 0x08], // ~
];

const COPYRIGHT: [u8; 5] = [0x3E, 0x5D, 0x63, 0x63, 0x3E];

/// The embedded bitmap font bound to a magnification factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitmapFont {
    scale: u32,
}

impl BitmapFont {
    /// Bind the font to a point size.
    ///
    /// Each font pixel becomes a `scale x scale` block where
    /// `scale = max(1, (size + 4) / 8)`, so a 40pt request yields 5.
    #[must_use]
    pub fn at_size(font_size: u32) -> Self {
        Self {
            scale: (font_size.saturating_add(4) / 8).max(1),
        }
    }

    /// Magnification factor.
    #[must_use]
    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Column bitmap for `ch`; unknown characters render as `?`.
    #[must_use]
    pub fn glyph(ch: char) -> [u8; 5] {
        match ch {
            '\u{a9}' => COPYRIGHT,
            ' '..='~' => ASCII[ch as usize - 0x20],
            _ => ASCII['?' as usize - 0x20],
        }
    }

    /// Width and height of the box `text` occupies.
    #[must_use]
    pub fn text_size(&self, text: &str) -> (u32, u32) {
        let count = u32::try_from(text.chars().count()).unwrap_or(u32::MAX);
        if count == 0 {
            return (0, 0);
        }
        let width = count
            .saturating_mul(CELL_WIDTH.saturating_mul(self.scale))
            .saturating_sub(self.scale);
        (width, GLYPH_HEIGHT.saturating_mul(self.scale))
    }

    /// Draw `text` with its top-left corner at `(x, y)`.
    ///
    /// Ink pixels are set to `color` outright; pixels falling outside the
    /// canvas are skipped.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_possible_wrap,
        clippy::cast_sign_loss
    )]
    pub fn draw_text_mut(&self, canvas: &mut RgbaImage, color: Rgba<u8>, x: i32, y: i32, text: &str) {
        let scale = i64::from(self.scale);
        let (w, h) = (i64::from(canvas.width()), i64::from(canvas.height()));
        let mut origin_x = i64::from(x);

        for ch in text.chars() {
            for (col, bits) in Self::glyph(ch).iter().enumerate() {
                for row in 0..GLYPH_HEIGHT {
                    if bits & (1 << row) == 0 {
                        continue;
                    }
                    let px = origin_x + col as i64 * scale;
                    let py = i64::from(y) + i64::from(row) * scale;
                    let (x0, x1) = (px.max(0), (px + scale).min(w));
                    let (y0, y1) = (py.max(0), (py + scale).min(h));
                    for cy in y0..y1 {
                        for cx in x0..x1 {
                            canvas.put_pixel(cx as u32, cy as u32, color);
                        }
                    }
                }
            }
            origin_x += i64::from(CELL_WIDTH) * scale;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_follows_font_size() {
        assert_eq!(BitmapFont::at_size(1).scale(), 1);
        assert_eq!(BitmapFont::at_size(11).scale(), 1);
        assert_eq!(BitmapFont::at_size(12).scale(), 2);
        assert_eq!(BitmapFont::at_size(40).scale(), 5);
        assert_eq!(BitmapFont::at_size(u32::MAX).scale(), u32::MAX / 8);
    }

    #[test]
    fn text_size_counts_chars_not_bytes() {
        let font = BitmapFont::at_size(40);
        assert_eq!(font.text_size(""), (0, 0));
        assert_eq!(font.text_size("A"), (25, 35));
        // 11 cells of 30px, minus the trailing gap.
        assert_eq!(font.text_size("© 2024 Acme"), (325, 35));
    }

    #[test]
    fn unknown_chars_fall_back_to_question_mark() {
        assert_eq!(BitmapFont::glyph('\u{4e16}'), BitmapFont::glyph('?'));
        assert_ne!(BitmapFont::glyph('\u{a9}'), BitmapFont::glyph('?'));
    }

    #[test]
    fn draw_fills_whole_blocks_and_clips() {
        let font = BitmapFont::at_size(16);
        let mut canvas = RgbaImage::new(20, 20);
        let ink = Rgba([1, 2, 3, 255]);
        // '|' has a single full-height column at index 2.
        font.draw_text_mut(&mut canvas, ink, 0, 0, "|");
        for y in 0..14 {
            assert_eq!(*canvas.get_pixel(4, y), ink);
            assert_eq!(*canvas.get_pixel(5, y), ink);
            assert_eq!(canvas.get_pixel(3, y)[3], 0);
        }
        assert_eq!(canvas.get_pixel(4, 14)[3], 0);

        // Partially off-canvas text must not panic.
        font.draw_text_mut(&mut canvas, ink, -7, 15, "||");
        font.draw_text_mut(&mut canvas, ink, 1000, -1000, "x");
    }
}
