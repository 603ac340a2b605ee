//! Planar frames to interleaved RGB(A) or gray pixels
//!
//! Frames with chroma planes go through libavif's own YUV→RGB conversion, so
//! every matrix libavif understands (identity and YCgCo included) decodes the
//! same way it would in any other libavif consumer, and premultiplied alpha
//! comes back straight. Monochrome frames carry no chroma and need no matrix;
//! their luma is only range-expanded and widened here.

use crate::error::{Error, Result};
use crate::ffi::{AVIF_RGB_FORMAT_RGB, AVIF_RGB_FORMAT_RGBA, avifRGBFormat};
use crate::frame::{DecodedFrame, Planes, YuvPlanes};
use crate::image::{ChromaSampling, ColorRange, DecodedImage};
use crate::library::ensure_loaded;
use crate::native::NativeImage;
use imgref::ImgVec;
use rgb::Rgba;
use rgb::prelude::*;
use std::mem::size_of;
use whereat::at;

/// Scale a limited-range Y value to full range (8-bit)
#[inline]
fn limited_to_full_8(y: u8) -> u8 {
    // Limited range: Y ∈ [16, 235]
    // Full range: Y ∈ [0, 255]
    let y = u32::from(y).saturating_sub(16);
    ((y * 255 + 219 / 2) / 219).min(255) as u8
}

/// Scale a limited-range Y value to full range (16-bit, given bit depth)
#[inline]
fn limited_to_full_16(y: u16, bit_depth: u8) -> u16 {
    let max_val = (1u64 << bit_depth) - 1;
    let y_min = 16u64 << (bit_depth - 8);
    let y_range = 219u64 << (bit_depth - 8);
    let y = u64::from(y).saturating_sub(y_min);
    ((y * max_val + y_range / 2) / y_range).min(max_val) as u16
}

/// Scale a value from native bit depth to full u16 range using LSB replication.
///
/// For 10-bit: `(v << 6) | (v >> 4)` maps 0→0, 1023→65535
/// For 12-bit: `(v << 4) | (v >> 8)` maps 0→0, 4095→65535
/// For 16-bit: no-op
#[inline]
pub(crate) fn scale_to_u16(v: u16, bit_depth: u8) -> u16 {
    let shift = 16 - bit_depth;
    if shift == 0 {
        return v;
    }
    (v << shift) | (v >> (bit_depth - shift))
}

/// Scale a full u16 value (0–65535) down to native bit depth range.
///
/// For 10-bit: `v >> 6` maps 0→0, 65535→1023
/// For 12-bit: `v >> 4` maps 0→0, 65535→4095
///
/// Truncation is the exact inverse of the LSB replication in `scale_to_u16`.
#[inline]
pub(crate) fn scale_from_u16(v: u16, bit_depth: u8) -> u16 {
    let shift = 16 - bit_depth;
    if shift == 0 {
        return v;
    }
    v >> shift
}

/// Convert premultiplied alpha to straight alpha for 8-bit RGBA
#[inline(never)]
pub(crate) fn unpremultiply8(img_row: &mut [Rgba<u8>]) {
    for px in img_row.iter_mut() {
        if px.a != 255 && px.a != 0 {
            *px.rgb_mut() = px
                .rgb()
                .map(|c| (c as u16 * 255 / px.a as u16).min(255) as u8);
        }
    }
}

/// Convert premultiplied alpha to straight alpha for 16-bit RGBA
#[inline(never)]
pub(crate) fn unpremultiply16(img_row: &mut [Rgba<u16>]) {
    for px in img_row.iter_mut() {
        if px.a != 0xFFFF && px.a != 0 {
            *px.rgb_mut() = px
                .rgb()
                .map(|c| (c as u32 * 0xFFFF / px.a as u32).min(0xFFFF) as u16);
        }
    }
}

/// Interleave a planar frame
///
/// Monochrome frames without alpha become gray; everything else becomes RGB,
/// or RGBA when an alpha plane is present. 10- and 12-bit samples are
/// widened to the full 16-bit range.
pub(crate) fn frame_to_image(frame: &DecodedFrame) -> Result<DecodedImage> {
    let range = frame.color_range();
    let premultiplied = frame.premultiplied_alpha();
    match (frame.chroma_sampling(), frame.planes()) {
        (ChromaSampling::Monochrome, Planes::Eight(planes)) => {
            Ok(gray8(planes, range, premultiplied))
        }
        (ChromaSampling::Monochrome, Planes::Sixteen(planes)) => {
            Ok(gray16(planes, range, frame.bit_depth(), premultiplied))
        }
        _ => color(frame),
    }
}

fn gray8(planes: &YuvPlanes<u8>, range: ColorRange, premultiplied: bool) -> DecodedImage {
    let (width, height) = (planes.y.width(), planes.y.height());
    let luma = |y: u8| match range {
        ColorRange::Full => y,
        ColorRange::Limited => limited_to_full_8(y),
    };

    match &planes.alpha {
        None => {
            let gray = planes.y.pixels().map(luma).collect();
            DecodedImage::Gray8(ImgVec::new(gray, width, height))
        }
        Some(alpha) => {
            let mut out: Vec<Rgba<u8>> = planes
                .y
                .pixels()
                .zip(alpha.pixels())
                .map(|(y, a)| {
                    let g = luma(y);
                    Rgba::new(g, g, g, a)
                })
                .collect();
            if premultiplied {
                unpremultiply8(&mut out);
            }
            DecodedImage::Rgba8(ImgVec::new(out, width, height))
        }
    }
}

fn gray16(
    planes: &YuvPlanes<u16>,
    range: ColorRange,
    depth: u8,
    premultiplied: bool,
) -> DecodedImage {
    let (width, height) = (planes.y.width(), planes.y.height());
    let luma = |y: u16| {
        let y = match range {
            ColorRange::Full => y,
            ColorRange::Limited => limited_to_full_16(y, depth),
        };
        scale_to_u16(y, depth)
    };

    match &planes.alpha {
        None => {
            let gray = planes.y.pixels().map(luma).collect();
            DecodedImage::Gray16(ImgVec::new(gray, width, height))
        }
        Some(alpha) => {
            let mut out: Vec<Rgba<u16>> = planes
                .y
                .pixels()
                .zip(alpha.pixels())
                .map(|(y, a)| {
                    let g = luma(y);
                    Rgba::new(g, g, g, scale_to_u16(a, depth))
                })
                .collect();
            if premultiplied {
                unpremultiply16(&mut out);
            }
            DecodedImage::Rgba16(ImgVec::new(out, width, height))
        }
    }
}

/// Hand the planes back to libavif and let it produce RGB(A)
fn color(frame: &DecodedFrame) -> Result<DecodedImage> {
    let lib = ensure_loaded()?;
    let native = NativeImage::from_planes(
        lib,
        frame.planes(),
        frame.bit_depth(),
        frame.chroma_sampling(),
        frame.color_range(),
        frame.matrix_coefficients(),
        frame.premultiplied_alpha(),
    )?;

    let (width, height) = (frame.width() as usize, frame.height() as usize);
    let image = match (frame.bit_depth(), frame.has_alpha()) {
        (8, false) => {
            DecodedImage::Rgb8(interleave(&native, width, height, AVIF_RGB_FORMAT_RGB, 8)?)
        }
        (8, true) => {
            DecodedImage::Rgba8(interleave(&native, width, height, AVIF_RGB_FORMAT_RGBA, 8)?)
        }
        (_, false) => {
            DecodedImage::Rgb16(interleave(&native, width, height, AVIF_RGB_FORMAT_RGB, 16)?)
        }
        (_, true) => {
            DecodedImage::Rgba16(interleave(&native, width, height, AVIF_RGB_FORMAT_RGBA, 16)?)
        }
    };
    Ok(image)
}

fn interleave<P: bytemuck::Pod>(
    native: &NativeImage<'_>,
    width: usize,
    height: usize,
    format: avifRGBFormat,
    depth: u32,
) -> Result<ImgVec<P>> {
    let row_bytes = u32::try_from(width * size_of::<P>())
        .map_err(|_| at(Error::InvalidInput("image row exceeds u32 bytes")))?;
    let mut out = vec![P::zeroed(); width * height];
    native.yuv_to_rgb(bytemuck::cast_slice_mut(&mut out[..]), format, depth, row_bytes)?;
    Ok(ImgVec::new(out, width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::MatrixCoefficients;
    use rgb::Rgb;

    fn libavif_available() -> bool {
        match ensure_loaded() {
            Ok(_) => true,
            Err(e) => {
                eprintln!("Skipping: {}", e.into_inner());
                false
            }
        }
    }

    fn frame444(
        matrix: MatrixCoefficients,
        range: ColorRange,
        y: u8,
        u: u8,
        v: u8,
    ) -> DecodedFrame {
        let plane = |s| ImgVec::new(vec![s; 4], 2, 2);
        DecodedFrame::new(
            ChromaSampling::Cs444,
            range,
            matrix,
            8,
            false,
            Planes::Eight(YuvPlanes {
                y: plane(y),
                u: Some(plane(u)),
                v: Some(plane(v)),
                alpha: None,
            }),
        )
        .unwrap()
    }

    fn rgb8(frame: &DecodedFrame) -> Rgb<u8> {
        let DecodedImage::Rgb8(img) = frame_to_image(frame).unwrap() else {
            panic!("expected Rgb8");
        };
        assert!(img.pixels().all(|p| p == img.buf()[0]));
        img.buf()[0]
    }

    fn close(a: Rgb<u8>, b: Rgb<u8>) -> bool {
        a.r.abs_diff(b.r) <= 2 && a.g.abs_diff(b.g) <= 2 && a.b.abs_diff(b.b) <= 2
    }

    fn mono8(range: ColorRange, y: Vec<u8>, alpha: Option<Vec<u8>>, premul: bool) -> DecodedFrame {
        let w = y.len();
        DecodedFrame::new(
            ChromaSampling::Monochrome,
            range,
            MatrixCoefficients::BT601,
            8,
            premul,
            Planes::Eight(YuvPlanes {
                y: ImgVec::new(y, w, 1),
                u: None,
                v: None,
                alpha: alpha.map(|a| ImgVec::new(a, w, 1)),
            }),
        )
        .unwrap()
    }

    #[test]
    fn limited_luma_expansion_covers_bright_values() {
        assert_eq!(limited_to_full_8(0), 0);
        assert_eq!(limited_to_full_8(16), 0);
        assert_eq!(limited_to_full_8(200), 214);
        assert_eq!(limited_to_full_8(235), 255);
        assert_eq!(limited_to_full_8(255), 255);
        assert_eq!(limited_to_full_16(64, 10), 0);
        assert_eq!(limited_to_full_16(940, 10), 1023);
        assert_eq!(limited_to_full_16(1023, 10), 1023);
        assert_eq!(limited_to_full_16(0xFFFF, 16), 0xFFFF);
    }

    #[test]
    fn monochrome_limited_expands_to_full() {
        let frame = mono8(ColorRange::Limited, vec![16, 200, 235, 255], None, false);
        let DecodedImage::Gray8(img) = frame_to_image(&frame).unwrap() else {
            panic!("expected Gray8");
        };
        assert_eq!(img.buf(), &[0, 214, 255, 255]);
    }

    #[test]
    fn monochrome_with_alpha_becomes_rgba() {
        let frame = DecodedFrame::new(
            ChromaSampling::Monochrome,
            ColorRange::Full,
            MatrixCoefficients::BT601,
            10,
            false,
            Planes::Sixteen(YuvPlanes {
                y: ImgVec::new(vec![1023; 2], 2, 1),
                u: None,
                v: None,
                alpha: Some(ImgVec::new(vec![0, 1023], 2, 1)),
            }),
        )
        .unwrap();
        let DecodedImage::Rgba16(img) = frame_to_image(&frame).unwrap() else {
            panic!("expected Rgba16");
        };
        assert_eq!(img.buf()[0], Rgba::new(0xFFFF, 0xFFFF, 0xFFFF, 0));
        assert_eq!(img.buf()[1].a, 0xFFFF);
    }

    #[test]
    fn premultiplied_monochrome_is_unpremultiplied() {
        let frame = mono8(ColorRange::Full, vec![64, 200], Some(vec![128, 255]), true);
        let DecodedImage::Rgba8(img) = frame_to_image(&frame).unwrap() else {
            panic!("expected Rgba8");
        };
        assert_eq!(img.buf()[0], Rgba::new(127, 127, 127, 128));
        assert_eq!(img.buf()[1], Rgba::new(200, 200, 200, 255));
    }

    #[test]
    fn scale_round_trip_is_lossless() {
        for depth in [10u8, 12] {
            let max = (1u16 << depth) - 1;
            assert_eq!(scale_to_u16(max, depth), 0xFFFF);
            for v in [0, 1, max / 2, max] {
                assert_eq!(scale_from_u16(scale_to_u16(v, depth), depth), v);
            }
        }
    }

    #[test]
    fn unpremultiply_restores_color() {
        let mut row = [Rgba::new(64u8, 32, 0, 128), Rgba::new(9, 9, 9, 0)];
        unpremultiply8(&mut row);
        assert_eq!(row[0], Rgba::new(127, 63, 0, 128));
        assert_eq!(row[1], Rgba::new(9, 9, 9, 0));
    }

    #[test]
    fn neutral_chroma_is_gray() {
        if !libavif_available() {
            return;
        }
        let px = rgb8(&frame444(MatrixCoefficients::BT601, ColorRange::Full, 128, 128, 128));
        assert!(close(px, Rgb::new(128, 128, 128)), "{px:?}");
    }

    #[test]
    fn limited_range_black_and_white() {
        if !libavif_available() {
            return;
        }
        let black = rgb8(&frame444(MatrixCoefficients::BT601, ColorRange::Limited, 16, 128, 128));
        let white = rgb8(&frame444(MatrixCoefficients::BT601, ColorRange::Limited, 235, 128, 128));
        assert!(close(black, Rgb::new(0, 0, 0)), "{black:?}");
        assert!(close(white, Rgb::new(255, 255, 255)), "{white:?}");
    }

    #[test]
    fn bt601_red() {
        if !libavif_available() {
            return;
        }
        // Full-range BT.601 encoding of pure red
        let px = rgb8(&frame444(MatrixCoefficients::BT601, ColorRange::Full, 76, 85, 255));
        assert!(px.r >= 250 && px.g <= 5 && px.b <= 5, "{px:?}");
    }

    #[test]
    fn ycgco_green() {
        if !libavif_available() {
            return;
        }
        // Y=128, Cg=+64, Co=0
        let px = rgb8(&frame444(MatrixCoefficients::YCGCO, ColorRange::Full, 128, 192, 128));
        assert!(close(px, Rgb::new(64, 192, 64)), "{px:?}");
    }

    #[test]
    fn identity_matrix_is_gbr() {
        if !libavif_available() {
            return;
        }
        let px = rgb8(&frame444(MatrixCoefficients::IDENTITY, ColorRange::Full, 255, 0, 0));
        assert!(close(px, Rgb::new(0, 255, 0)), "{px:?}");
    }

    #[test]
    fn subsampled_frame_keeps_dimensions() {
        if !libavif_available() {
            return;
        }
        let frame = DecodedFrame::new(
            ChromaSampling::Cs420,
            ColorRange::Limited,
            MatrixCoefficients::BT709,
            10,
            false,
            Planes::Sixteen(YuvPlanes {
                y: ImgVec::new(vec![512; 5 * 3], 5, 3),
                u: Some(ImgVec::new(vec![512; 3 * 2], 3, 2)),
                v: Some(ImgVec::new(vec![512; 3 * 2], 3, 2)),
                alpha: Some(ImgVec::new(vec![1023; 5 * 3], 5, 3)),
            }),
        )
        .unwrap();
        let DecodedImage::Rgba16(img) = frame_to_image(&frame).unwrap() else {
            panic!("expected Rgba16");
        };
        assert_eq!((img.width(), img.height()), (5, 3));
        assert!(img.pixels().all(|p| p.a == 0xFFFF));
    }
}
