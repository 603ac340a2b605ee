//! AVIF encoding through libavif
//!
//! Provides [`EncoderConfig`] for configuring encoding, [`encode`] /
//! [`encode_frame`] for still images and [`encode_animation`] /
//! [`encode_animation_frames`] for image sequences.
//!
//! Parameters and input dimensions are checked before libavif is loaded, so
//! a bad call never creates a native object.

use crate::Result;
use crate::convert::scale_from_u16;
use crate::error::Error;
use crate::ffi::*;
use crate::frame::{Animation, DecodedFrame, Planes, YuvPlanes};
use crate::image::{ChromaSampling, ColorRange, DecodedImage, MatrixCoefficients};
use crate::library::{AvifLibrary, ensure_loaded};
use crate::native::{NativeEncoder, NativeEncoderSettings, NativeImage};
use enough::{Stop, Unstoppable};
use imgref::ImgVec;
use log::debug;
use std::mem::size_of;
use std::time::Duration;
use whereat::at;

const BT601: MatrixCoefficients = MatrixCoefficients(AVIF_MATRIX_COEFFICIENTS_BT601);

/// Bit depth for encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncodeBitDepth {
    /// 8 bits per channel
    Eight,
    /// 10 bits per channel
    Ten,
    /// 12 bits per channel
    Twelve,
    /// 8 for 8-bit input, 10 for 16-bit input, the source depth for planar frames
    #[default]
    Auto,
}

/// Configuration for AVIF encoding
///
/// Uses a builder pattern matching [`crate::DecoderConfig`].
///
/// # Example
///
/// ```
/// use zenavif_dyn::EncoderConfig;
///
/// let config = EncoderConfig::new()
///     .quality(80)
///     .speed(6);
/// ```
#[derive(Debug, Clone)]
pub struct EncoderConfig {
    pub(crate) quality: u8,
    pub(crate) alpha_quality: Option<u8>,
    pub(crate) speed: u8,
    pub(crate) subsampling: ChromaSampling,
    pub(crate) bit_depth: EncodeBitDepth,
    pub(crate) threads: u32,
    pub(crate) timescale: u64,
    pub(crate) loop_count: u32,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            quality: 60,
            alpha_quality: None,
            speed: 10,
            subsampling: ChromaSampling::Cs420,
            bit_depth: EncodeBitDepth::default(),
            threads: 1,
            timescale: 1000,
            loop_count: 0,
        }
    }
}

impl EncoderConfig {
    /// Create a new encoder configuration with default settings
    ///
    /// Defaults: quality 60, speed 10, 4:2:0, auto bit depth, one thread,
    /// millisecond timescale, endless looping
    pub fn new() -> Self {
        Self::default()
    }

    /// Set encoding quality (0 = worst, 100 = lossless)
    pub fn quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    /// Set separate quality for the alpha channel
    ///
    /// If not set, uses the same quality as color.
    pub fn alpha_quality(mut self, quality: u8) -> Self {
        self.alpha_quality = Some(quality);
        self
    }

    /// Set encoding speed (0 = slowest/best, 10 = fastest/worst)
    pub fn speed(mut self, speed: u8) -> Self {
        self.speed = speed;
        self
    }

    /// Set the chroma subsampling of the encoded color planes
    pub fn subsampling(mut self, subsampling: ChromaSampling) -> Self {
        self.subsampling = subsampling;
        self
    }

    /// Set the output bit depth
    pub fn bit_depth(mut self, depth: EncodeBitDepth) -> Self {
        self.bit_depth = depth;
        self
    }

    /// Set the number of encoder threads (0 is treated as 1)
    pub fn threads(mut self, threads: u32) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Units per second for frame durations in animations
    pub fn timescale(mut self, timescale: u64) -> Self {
        self.timescale = timescale;
        self
    }

    /// Number of times an animation plays; 0 loops forever
    pub fn loop_count(mut self, loop_count: u32) -> Self {
        self.loop_count = loop_count;
        self
    }

    /// Check every parameter against libavif's accepted ranges
    pub fn validate(&self) -> Result<()> {
        if self.quality > 100 {
            return Err(at(Error::InvalidInput("quality must be 0..=100")));
        }
        if self.alpha_quality.is_some_and(|q| q > 100) {
            return Err(at(Error::InvalidInput("alpha quality must be 0..=100")));
        }
        if self.speed > 10 {
            return Err(at(Error::InvalidInput("speed must be 0..=10")));
        }
        if self.timescale == 0 {
            return Err(at(Error::InvalidInput("timescale must be non-zero")));
        }
        Ok(())
    }

    fn native_settings(&self, loop_count: u32) -> NativeEncoderSettings {
        NativeEncoderSettings {
            quality: self.quality,
            quality_alpha: self.alpha_quality.unwrap_or(self.quality),
            speed: self.speed,
            threads: self.threads,
            timescale: self.timescale,
            repetition_count: loop_count.checked_sub(1),
        }
    }

    /// Duration in timescale units, at least one
    fn duration_units(&self, duration: Duration) -> u64 {
        (duration.as_secs_f64() * self.timescale as f64)
            .round()
            .max(1.0) as u64
    }

    fn depth_for_image(&self, image: &DecodedImage) -> u8 {
        match self.bit_depth {
            EncodeBitDepth::Eight => 8,
            EncodeBitDepth::Ten => 10,
            EncodeBitDepth::Twelve => 12,
            EncodeBitDepth::Auto if image.bit_depth() == 8 => 8,
            EncodeBitDepth::Auto => 10,
        }
    }

    fn depth_for_frame(&self, frame: &DecodedFrame) -> u8 {
        match self.bit_depth {
            EncodeBitDepth::Eight => 8,
            EncodeBitDepth::Ten => 10,
            EncodeBitDepth::Twelve => 12,
            EncodeBitDepth::Auto => frame.bit_depth().min(12),
        }
    }
}

fn image_dimensions(image: &DecodedImage) -> Result<(u32, u32)> {
    let (w, h) = (image.width(), image.height());
    if w == 0 || h == 0 {
        return Err(at(Error::InvalidInput("image has zero width or height")));
    }
    let w = u32::try_from(w).map_err(|_| at(Error::InvalidInput("image width exceeds u32")))?;
    let h = u32::try_from(h).map_err(|_| at(Error::InvalidInput("image height exceeds u32")))?;
    Ok((w, h))
}

/// Encode an interleaved image as a still AVIF
///
/// RGB(A) input is converted to YUV by libavif at the configured
/// subsampling; gray input is encoded as 4:0:0.
///
/// # Example
///
/// ```no_run
/// # fn main() -> zenavif_dyn::Result<()> {
/// let image = zenavif_dyn::decode(&std::fs::read("in.avif").unwrap())?;
/// let config = zenavif_dyn::EncoderConfig::new().quality(80);
/// let avif = zenavif_dyn::encode(&image, &config)?;
/// # Ok(())
/// # }
/// ```
pub fn encode(image: &DecodedImage, config: &EncoderConfig) -> Result<Vec<u8>> {
    config.validate()?;
    image_dimensions(image)?;

    let lib = ensure_loaded()?;
    let native = image_to_native(lib, image, config)?;
    encode_still(lib, &native, config)
}

/// Encode a planar frame as a still AVIF
///
/// Planes are copied straight into libavif when the frame's subsampling and
/// bit depth match the configured ones; otherwise the frame is converted to
/// interleaved pixels first.
pub fn encode_frame(frame: &DecodedFrame, config: &EncoderConfig) -> Result<Vec<u8>> {
    config.validate()?;

    let lib = ensure_loaded()?;
    let native = frame_to_native(lib, frame, config)?;
    encode_still(lib, &native, config)
}

/// Encode interleaved frames and their durations as an AVIF image sequence
pub fn encode_animation(
    frames: &[(DecodedImage, Duration)],
    config: &EncoderConfig,
) -> Result<Vec<u8>> {
    encode_animation_with(frames, config, &Unstoppable)
}

/// [`encode_animation`] with cancellation checked between frames
pub fn encode_animation_with(
    frames: &[(DecodedImage, Duration)],
    config: &EncoderConfig,
    stop: &impl Stop,
) -> Result<Vec<u8>> {
    config.validate()?;
    let (first, _) = frames
        .first()
        .ok_or_else(|| at(Error::InvalidInput("animation has no frames")))?;
    let size = image_dimensions(first)?;
    for (image, _) in frames {
        if image_dimensions(image)? != size {
            return Err(at(Error::InvalidInput("frame dimensions differ")));
        }
    }

    let lib = ensure_loaded()?;
    encode_sequence(
        lib,
        frames.iter().map(|(image, d)| (image, *d)),
        config,
        config.loop_count,
        stop,
        image_to_native,
    )
}

/// Re-encode a decoded animation, keeping its durations and loop count
pub fn encode_animation_frames(animation: &Animation, config: &EncoderConfig) -> Result<Vec<u8>> {
    config.validate()?;
    let Some(first) = animation.frames().first() else {
        return Err(at(Error::InvalidInput("animation has no frames")));
    };
    let size = (first.width(), first.height());
    if animation
        .frames()
        .iter()
        .any(|f| (f.width(), f.height()) != size)
    {
        return Err(at(Error::InvalidInput("frame dimensions differ")));
    }

    let lib = ensure_loaded()?;
    encode_sequence(
        lib,
        animation.iter(),
        config,
        animation.loop_count(),
        &Unstoppable,
        frame_to_native,
    )
}

fn encode_still(
    lib: &AvifLibrary,
    native: &NativeImage<'_>,
    config: &EncoderConfig,
) -> Result<Vec<u8>> {
    let mut encoder = NativeEncoder::new(lib, &config.native_settings(0))?;
    encoder.add_image(native, 1, AVIF_ADD_IMAGE_FLAG_SINGLE)?;
    let out = encoder.finish()?;
    debug!("encoded still image into {} bytes", out.len());
    Ok(out)
}

fn encode_sequence<'l, 'f, S: 'f>(
    lib: &'l AvifLibrary,
    frames: impl Iterator<Item = (&'f S, Duration)>,
    config: &EncoderConfig,
    loop_count: u32,
    stop: &impl Stop,
    to_native: fn(&'l AvifLibrary, &S, &EncoderConfig) -> Result<NativeImage<'l>>,
) -> Result<Vec<u8>> {
    let mut encoder = NativeEncoder::new(lib, &config.native_settings(loop_count))?;
    let mut count = 0usize;
    for (frame, duration) in frames {
        stop.check().map_err(|e| at(Error::Cancelled(e)))?;
        let native = to_native(lib, frame, config)?;
        encoder.add_image(&native, config.duration_units(duration), AVIF_ADD_IMAGE_FLAG_NONE)?;
        count += 1;
    }
    let out = encoder.finish()?;
    debug!("encoded {count} frame(s) into {} bytes", out.len());
    Ok(out)
}

fn image_to_native<'l>(
    lib: &'l AvifLibrary,
    image: &DecodedImage,
    config: &EncoderConfig,
) -> Result<NativeImage<'l>> {
    let depth = config.depth_for_image(image);
    let sampling = config.subsampling;
    match image {
        DecodedImage::Rgb8(img) => interleaved(lib, img, AVIF_RGB_FORMAT_RGB, 8, depth, sampling),
        DecodedImage::Rgba8(img) => interleaved(lib, img, AVIF_RGB_FORMAT_RGBA, 8, depth, sampling),
        DecodedImage::Rgb16(img) => interleaved(lib, img, AVIF_RGB_FORMAT_RGB, 16, depth, sampling),
        DecodedImage::Rgba16(img) => {
            interleaved(lib, img, AVIF_RGB_FORMAT_RGBA, 16, depth, sampling)
        }
        DecodedImage::Gray8(img) => {
            let planes = gray_planes(img.pixels().map(|v| u16::from(v) * 257), img, depth);
            NativeImage::from_planes(
                lib,
                &planes,
                depth,
                ChromaSampling::Monochrome,
                ColorRange::Full,
                BT601,
                false,
            )
        }
        DecodedImage::Gray16(img) => {
            let planes = gray_planes(img.pixels(), img, depth);
            NativeImage::from_planes(
                lib,
                &planes,
                depth,
                ChromaSampling::Monochrome,
                ColorRange::Full,
                BT601,
                false,
            )
        }
    }
}

fn frame_to_native<'l>(
    lib: &'l AvifLibrary,
    frame: &DecodedFrame,
    config: &EncoderConfig,
) -> Result<NativeImage<'l>> {
    let depth = config.depth_for_frame(frame);
    if frame.chroma_sampling() == config.subsampling && depth == frame.bit_depth() {
        return NativeImage::from_planes(
            lib,
            frame.planes(),
            depth,
            frame.chroma_sampling(),
            frame.color_range(),
            frame.matrix_coefficients(),
            frame.premultiplied_alpha(),
        );
    }
    image_to_native(lib, &frame.to_image()?, config)
}

/// Hand interleaved pixels to libavif's RGB→YUV conversion
fn interleaved<'l, P: bytemuck::Pod>(
    lib: &'l AvifLibrary,
    img: &ImgVec<P>,
    format: avifRGBFormat,
    rgb_depth: u32,
    depth: u8,
    sampling: ChromaSampling,
) -> Result<NativeImage<'l>> {
    let (buf, width, height) = img.as_ref().to_contiguous_buf();
    let row_bytes = u32::try_from(width * size_of::<P>())
        .map_err(|_| at(Error::InvalidInput("image row exceeds u32 bytes")))?;

    let mut native = NativeImage::new(lib, width as u32, height as u32, depth, sampling)?;
    native.set_color(
        ColorRange::Full,
        AVIF_COLOR_PRIMARIES_BT709,
        AVIF_TRANSFER_CHARACTERISTICS_SRGB,
        BT601,
    );
    native.rgb_to_yuv(bytemuck::cast_slice(&buf[..]), format, rgb_depth, row_bytes)?;
    Ok(native)
}

/// Gray samples (given as full 16-bit range) reduced to the output depth
fn gray_planes<T>(wide: impl Iterator<Item = u16>, img: &ImgVec<T>, depth: u8) -> Planes {
    let (width, height) = (img.width(), img.height());
    if depth == 8 {
        let y = wide.map(|v| scale_from_u16(v, 8) as u8).collect();
        Planes::Eight(YuvPlanes {
            y: ImgVec::new(y, width, height),
            u: None,
            v: None,
            alpha: None,
        })
    } else {
        let y = wide.map(|v| scale_from_u16(v, depth)).collect();
        Planes::Sixteen(YuvPlanes {
            y: ImgVec::new(y, width, height),
            u: None,
            v: None,
            alpha: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::live_objects;
    use rgb::Rgb;

    fn tiny_rgb() -> DecodedImage {
        DecodedImage::Rgb8(ImgVec::new(vec![Rgb::new(10, 20, 30); 16], 4, 4))
    }

    #[test]
    fn defaults() {
        let config = EncoderConfig::new();
        assert_eq!(config.quality, 60);
        assert_eq!(config.speed, 10);
        assert_eq!(config.subsampling, ChromaSampling::Cs420);
        assert_eq!(config.bit_depth, EncodeBitDepth::Auto);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn out_of_range_parameters_rejected() {
        for config in [
            EncoderConfig::new().quality(101),
            EncoderConfig::new().alpha_quality(101),
            EncoderConfig::new().speed(11),
            EncoderConfig::new().timescale(0),
        ] {
            let err = encode(&tiny_rgb(), &config).unwrap_err().into_inner();
            assert!(matches!(&err, Error::InvalidInput(_)), "{config:?}");
            assert_eq!(live_objects(), [0; 4], "{config:?}");
        }
    }

    #[test]
    fn empty_image_rejected() {
        // imgref rejects a zero stride, so the empty buffer gets stride 1
        let empty = DecodedImage::Gray8(ImgVec::new_stride(Vec::new(), 0, 0, 1));
        assert!(matches!(
            image_dimensions(&empty).unwrap_err().into_inner(),
            Error::InvalidInput(_)
        ));
        let err = encode(&empty, &EncoderConfig::new()).unwrap_err().into_inner();
        assert!(matches!(&err, Error::InvalidInput(_)));
        assert_eq!(live_objects(), [0; 4]);
    }

    #[test]
    fn animation_input_checked() {
        let err = encode_animation(&[], &EncoderConfig::new()).unwrap_err().into_inner();
        assert!(matches!(&err, Error::InvalidInput(_)));

        let other = DecodedImage::Rgb8(ImgVec::new(vec![Rgb::new(0, 0, 0); 4], 2, 2));
        let frames = [
            (tiny_rgb(), Duration::from_millis(100)),
            (other, Duration::from_millis(100)),
        ];
        let err = encode_animation(&frames, &EncoderConfig::new()).unwrap_err().into_inner();
        assert!(matches!(&err, Error::InvalidInput(_)));
    }

    #[test]
    fn loop_count_maps_to_repetitions() {
        let config = EncoderConfig::new();
        assert_eq!(config.native_settings(0).repetition_count, None);
        assert_eq!(config.native_settings(1).repetition_count, Some(0));
        assert_eq!(config.native_settings(3).repetition_count, Some(2));
        assert_eq!(config.native_settings(0).quality_alpha, 60);
    }

    #[test]
    fn durations_in_timescale_units() {
        let config = EncoderConfig::new().timescale(30);
        assert_eq!(config.duration_units(Duration::from_secs(2)), 60);
        assert_eq!(config.duration_units(Duration::ZERO), 1);
        let ms = EncoderConfig::new();
        assert_eq!(ms.duration_units(Duration::from_millis(40)), 40);
    }

    #[test]
    fn auto_depth_follows_input() {
        let config = EncoderConfig::new();
        assert_eq!(config.depth_for_image(&tiny_rgb()), 8);
        let wide = DecodedImage::Gray16(ImgVec::new(vec![0; 4], 2, 2));
        assert_eq!(config.depth_for_image(&wide), 10);
        let twelve = EncoderConfig::new().bit_depth(EncodeBitDepth::Twelve);
        assert_eq!(twelve.depth_for_image(&tiny_rgb()), 12);
    }

    #[test]
    fn gray_planes_reduce_depth() {
        let img = ImgVec::new(vec![0u16, 0xFFFF], 2, 1);
        let Planes::Sixteen(p) = gray_planes(img.pixels(), &img, 10) else {
            panic!("expected 16-bit planes");
        };
        assert_eq!(p.y.buf(), &[0, 1023]);
        let Planes::Eight(p) = gray_planes(img.pixels(), &img, 8) else {
            panic!("expected 8-bit planes");
        };
        assert_eq!(p.y.buf(), &[0, 255]);
    }
}
