//! Alpha compositing math for stamping the watermark layer.
//!
//! The text layer is merged with the standard "over" operator:
//! `out = overlay * alpha + source * (1 - alpha)`
//!
//! JPEG has no alpha channel, so the composited image is then flattened onto
//! an opaque background color.

use image::{Rgb, RgbImage, Rgba, RgbaImage};

/// Composite `overlay` over `base` in-place with the "over" operator.
///
/// Both images must have the same dimensions; the overlay is clipped to the
/// base otherwise. Overlay pixels with zero alpha leave the base untouched and
/// fully opaque overlay pixels replace it.
pub fn composite_over(base: &mut RgbaImage, overlay: &RgbaImage) {
    let w = base.width().min(overlay.width());
    let h = base.height().min(overlay.height());

    for y in 0..h {
        for x in 0..w {
            let top = overlay.get_pixel(x, y);
            match top[3] {
                0 => {}
                255 => *base.get_pixel_mut(x, y) = *top,
                _ => {
                    let bottom = base.get_pixel_mut(x, y);
                    *bottom = over(*top, *bottom);
                }
            }
        }
    }
}

/// Blend a single pixel `top` over `bottom`.
fn over(top: Rgba<u8>, bottom: Rgba<u8>) -> Rgba<u8> {
    let top_a = f32::from(top[3]) / 255.0;
    let bottom_a = f32::from(bottom[3]) / 255.0;
    let out_a = top_a + bottom_a * (1.0 - top_a);
    if out_a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let mut out = [0u8; 4];
    for ch in 0..3 {
        let c = (f32::from(top[ch]) * top_a + f32::from(bottom[ch]) * bottom_a * (1.0 - top_a))
            / out_a;
        out[ch] = to_channel(c);
    }
    out[3] = to_channel(out_a * 255.0);
    Rgba(out)
}

/// Drop the alpha channel by compositing every pixel onto `background`.
///
/// Opaque pixels are copied as-is, so an opaque source photo survives the
/// flatten unchanged.
#[must_use]
pub fn flatten(image: &RgbaImage, background: Rgb<u8>) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let px = image.get_pixel(x, y);
        if px[3] == 255 {
            return Rgb([px[0], px[1], px[2]]);
        }
        let alpha = f32::from(px[3]) / 255.0;
        let mut out = [0u8; 3];
        for ch in 0..3 {
            out[ch] = to_channel(
                f32::from(px[ch]) * alpha + f32::from(background[ch]) * (1.0 - alpha),
            );
        }
        Rgb(out)
    })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_channel(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(clippy::cast_possible_truncation)]
    fn gradient(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| Rgba([(x * 7) as u8, (y * 5) as u8, 90, 255]))
    }

    #[test]
    fn transparent_overlay_is_identity() {
        let mut base = gradient(40, 30);
        let original = base.clone();
        let overlay = RgbaImage::from_pixel(40, 30, Rgba([255, 0, 0, 0]));
        composite_over(&mut base, &overlay);
        assert_eq!(base, original);
    }

    #[test]
    fn opaque_overlay_replaces_pixels() {
        let mut base = gradient(10, 10);
        let mut overlay = RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 0]));
        overlay.put_pixel(3, 4, Rgba([12, 34, 56, 255]));
        composite_over(&mut base, &overlay);
        assert_eq!(*base.get_pixel(3, 4), Rgba([12, 34, 56, 255]));
        assert_eq!(*base.get_pixel(0, 0), *gradient(10, 10).get_pixel(0, 0));
    }

    #[test]
    fn half_alpha_blends_over_opaque_base() {
        let mut base = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 255]));
        let overlay = RgbaImage::from_pixel(1, 1, Rgba([255, 255, 255, 128]));
        composite_over(&mut base, &overlay);
        let px = base.get_pixel(0, 0);
        assert_eq!(px[3], 255);
        for ch in 0..3 {
            assert_eq!(px[ch], 128, "channel {ch}");
        }
    }

    #[test]
    fn flatten_keeps_opaque_and_fills_transparent() {
        let mut img = RgbaImage::from_pixel(2, 1, Rgba([10, 20, 30, 255]));
        img.put_pixel(1, 0, Rgba([10, 20, 30, 0]));
        let flat = flatten(&img, Rgb([255, 255, 255]));
        assert_eq!(*flat.get_pixel(0, 0), Rgb([10, 20, 30]));
        assert_eq!(*flat.get_pixel(1, 0), Rgb([255, 255, 255]));
    }

    #[test]
    fn flatten_blends_partial_alpha_with_background() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 51]));
        let flat = flatten(&img, Rgb([255, 255, 255]));
        // 0.2 * 0 + 0.8 * 255 = 204
        assert_eq!(*flat.get_pixel(0, 0), Rgb([204, 204, 204]));
    }
}
