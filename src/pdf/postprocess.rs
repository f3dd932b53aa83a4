//! Theme pixel post-processing for rasterized pages

use image::{Rgba, RgbaImage, imageops};

use crate::theme::{PixelTransform, Rgb};
use crate::view_state::Rotation;

/// Paint `page` over a canvas filled with `fill`
pub fn compose_on_fill(page: &RgbaImage, fill: Rgb) -> RgbaImage {
    let mut canvas = RgbaImage::from_pixel(
        page.width(),
        page.height(),
        Rgba([fill.r, fill.g, fill.b, 255]),
    );
    imageops::overlay(&mut canvas, page, 0, 0);
    canvas
}

pub fn apply_transform(image: &mut RgbaImage, transform: PixelTransform) {
    match transform {
        PixelTransform::None => {}
        PixelTransform::Invert => invert(image),
        PixelTransform::Sepia => sepia(image),
    }
}

/// Difference composite against opaque white: every channel becomes `255 - c`
pub fn invert(image: &mut RgbaImage) {
    for px in image.pixels_mut() {
        px[0] = 255 - px[0];
        px[1] = 255 - px[1];
        px[2] = 255 - px[2];
    }
}

pub fn sepia(image: &mut RgbaImage) {
    for px in image.pixels_mut() {
        let [r, g, b] = sepia_rgb([px[0], px[1], px[2]]);
        px[0] = r;
        px[1] = g;
        px[2] = b;
    }
}

#[inline]
pub fn sepia_rgb([r, g, b]: [u8; 3]) -> [u8; 3] {
    let (r, g, b) = (f32::from(r), f32::from(g), f32::from(b));
    let channel = |v: f32| v.round().clamp(0.0, 255.0) as u8;
    [
        channel(0.393 * r + 0.769 * g + 0.189 * b),
        channel(0.349 * r + 0.686 * g + 0.168 * b),
        channel(0.272 * r + 0.534 * g + 0.131 * b),
    ]
}

pub fn rotate(image: RgbaImage, rotation: Rotation) -> RgbaImage {
    match rotation {
        Rotation::Deg0 => image,
        Rotation::Deg90 => imageops::rotate90(&image),
        Rotation::Deg180 => imageops::rotate180(&image),
        Rotation::Deg270 => imageops::rotate270(&image),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sepia_output_stays_in_channel_range() {
        for r in (0..=255u16).step_by(15) {
            for g in (0..=255u16).step_by(15) {
                for b in (0..=255u16).step_by(15) {
                    // Conversion to u8 already bounds the range; this checks
                    // that saturation happens instead of wrapping.
                    let out = sepia_rgb([r as u8, g as u8, b as u8]);
                    let bright = 0.393 * f32::from(r) + 0.769 * f32::from(g) + 0.189 * f32::from(b);
                    if bright >= 255.0 {
                        assert_eq!(out[0], 255);
                    }
                }
            }
        }
        assert_eq!(sepia_rgb([255, 255, 255]), [255, 255, 239]);
        assert_eq!(sepia_rgb([0, 0, 0]), [0, 0, 0]);
    }

    #[test]
    fn sepia_matches_matrix_for_mid_gray() {
        // 128 * 1.351 = 172.9, 128 * 1.203 = 154.0, 128 * 0.937 = 119.9
        assert_eq!(sepia_rgb([128, 128, 128]), [173, 154, 120]);
    }

    #[test]
    fn invert_flips_color_channels_only() {
        let mut image = RgbaImage::from_pixel(2, 1, Rgba([10, 200, 255, 128]));
        invert(&mut image);
        assert_eq!(image.get_pixel(0, 0), &Rgba([245, 55, 0, 128]));
    }

    #[test]
    fn transparent_page_shows_fill() {
        let mut page = RgbaImage::new(2, 2);
        page.put_pixel(1, 1, Rgba([0, 0, 0, 255]));

        let canvas = compose_on_fill(&page, Rgb::from_hex(0xF4ECD8));
        assert_eq!(canvas.get_pixel(0, 0), &Rgba([0xF4, 0xEC, 0xD8, 255]));
        assert_eq!(canvas.get_pixel(1, 1), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn quarter_turns_swap_dimensions() {
        let image = RgbaImage::new(4, 2);
        assert_eq!(rotate(image.clone(), Rotation::Deg90).dimensions(), (2, 4));
        assert_eq!(rotate(image.clone(), Rotation::Deg180).dimensions(), (4, 2));
        assert_eq!(rotate(image, Rotation::Deg270).dimensions(), (2, 4));
    }

    #[test]
    fn rotate90_moves_top_left_to_top_right() {
        let mut image = RgbaImage::new(3, 2);
        image.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        let rotated = rotate(image, Rotation::Deg90);
        assert_eq!(rotated.get_pixel(1, 0), &Rgba([255, 0, 0, 255]));
    }
}
