//! # zenavif-dyn
//!
//! Still and animated AVIF decoding and encoding through a libavif that is
//! located and loaded at runtime.
//!
//! Nothing links against libavif at build time. The first operation that
//! needs it opens the system's libavif 1.x (see [`library::CANDIDATES`]) and
//! keeps it for the rest of the process. When it cannot be found every
//! operation fails with [`Error::LibraryNotFound`] instead of the program
//! failing to start.
//!
//! ## Quick Start
//!
//! ```no_run
//! use zenavif_dyn::{decode, DecodedImage};
//!
//! let avif_data = std::fs::read("image.avif").unwrap();
//! let image = decode(&avif_data).unwrap();
//!
//! match image {
//!     DecodedImage::Rgb8(img) => {
//!         println!("RGB8 image: {}x{}", img.width(), img.height());
//!     }
//!     DecodedImage::Rgba8(img) => {
//!         println!("RGBA8 image: {}x{}", img.width(), img.height());
//!     }
//!     _ => {}
//! }
//! ```
//!
//! ## Animations
//!
//! ```no_run
//! let data = std::fs::read("anim.avif").unwrap();
//! let anim = zenavif_dyn::decode_animation(&data).unwrap();
//! for (frame, duration) in anim.iter() {
//!     println!("{}x{} for {:?}", frame.width(), frame.height(), duration);
//! }
//! ```
//!
//! ## Configuration
//!
//! For more control over decoding, use `decode_with` with a `DecoderConfig`:
//!
//! ```no_run
//! use zenavif_dyn::{decode_with, DecoderConfig};
//! use enough::Unstoppable;
//!
//! let config = DecoderConfig::new()
//!     .threads(4)
//!     .image_size_limit(8192 * 8192);
//!
//! let avif_data = std::fs::read("image.avif").unwrap();
//! let image = decode_with(&avif_data, &config, &Unstoppable).unwrap();
//! ```

mod config;
mod convert;
mod decoder;
mod encoder;
mod error;
mod ffi;
mod frame;
mod image;
pub mod library;
mod native;
mod probe;

pub use config::DecoderConfig;
pub use encoder::{
    EncodeBitDepth, EncoderConfig, encode, encode_animation, encode_animation_frames,
    encode_animation_with, encode_frame,
};
pub use enough::{Stop, StopReason, Unstoppable};
pub use error::{Error, Result};
pub use frame::{Animation, DecodedFrame, Planes, YuvPlanes};
pub use image::{
    ChromaSampling, ColorPrimaries, ColorRange, DecodedImage, ImageInfo, MatrixCoefficients,
    TransferCharacteristics,
};
pub use library::{AvifLibrary, ensure_loaded};
pub use probe::probe;

use decoder::DecodeMode;
use std::io::Read;
use whereat::at;

/// Read image metadata without decoding pixels
///
/// Only the container header is parsed; width, height, depth, subsampling,
/// color description, alpha presence and frame count come back in
/// [`ImageInfo`].
pub fn decode_config(data: &[u8]) -> Result<ImageInfo> {
    decode_config_with(data, &DecoderConfig::default())
}

/// [`decode_config`] with custom limits
pub fn decode_config_with(data: &[u8], config: &DecoderConfig) -> Result<ImageInfo> {
    let (info, _) = decoder::run(data, DecodeMode::ConfigOnly, config, &Unstoppable)?;
    Ok(info)
}

/// Decode an AVIF image with default settings
///
/// This is a convenience function that uses default decoder settings
/// and no cancellation support. For image sequences this is the first frame.
///
/// # Example
///
/// ```no_run
/// let avif_data = std::fs::read("image.avif").unwrap();
/// let image = zenavif_dyn::decode(&avif_data).unwrap();
/// ```
pub fn decode(data: &[u8]) -> Result<DecodedImage> {
    decode_with(data, &DecoderConfig::default(), &Unstoppable)
}

/// Decode an AVIF image with custom settings and cancellation support
///
/// # Arguments
///
/// * `data` - Raw AVIF file data
/// * `config` - Decoder configuration
/// * `stop` - Cancellation token (use `Unstoppable` if not needed)
pub fn decode_with(data: &[u8], config: &DecoderConfig, stop: &impl Stop) -> Result<DecodedImage> {
    decode_frame_with(data, config, stop)?.to_image()
}

/// Decode the first frame, keeping its planar YUV layout
pub fn decode_frame(data: &[u8]) -> Result<DecodedFrame> {
    decode_frame_with(data, &DecoderConfig::default(), &Unstoppable)
}

/// [`decode_frame`] with custom settings and cancellation support
pub fn decode_frame_with(
    data: &[u8],
    config: &DecoderConfig,
    stop: &impl Stop,
) -> Result<DecodedFrame> {
    let (_, animation) = decoder::run(data, DecodeMode::FirstFrame, config, stop)?;
    animation
        .and_then(|a| a.into_parts().0.into_iter().next())
        .ok_or_else(|| at(Error::Unsupported("stream contains no frames")))
}

/// Decode every frame of an image sequence together with its duration
///
/// A still image comes back as an animation of one frame.
pub fn decode_animation(data: &[u8]) -> Result<Animation> {
    decode_animation_with(data, &DecoderConfig::default(), &Unstoppable)
}

/// [`decode_animation`] with custom settings and cancellation support
///
/// `stop` is checked before each frame; a cancelled decode returns
/// [`Error::Cancelled`] and no partial sequence.
pub fn decode_animation_with(
    data: &[u8],
    config: &DecoderConfig,
    stop: &impl Stop,
) -> Result<Animation> {
    let (_, animation) = decoder::run(data, DecodeMode::AllFrames, config, stop)?;
    animation.ok_or_else(|| at(Error::Unsupported("stream contains no frames")))
}

fn read_all(mut reader: impl Read) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    reader
        .read_to_end(&mut data)
        .map_err(|e| at(Error::Io(e)))?;
    Ok(data)
}

/// [`decode_config`] over a reader; the whole stream is read first
pub fn decode_config_from_reader(reader: impl Read) -> Result<ImageInfo> {
    decode_config(&read_all(reader)?)
}

/// [`decode`] over a reader; the whole stream is read first
pub fn decode_from_reader(reader: impl Read) -> Result<DecodedImage> {
    decode(&read_all(reader)?)
}
