//! Owned planar frames and animations copied out of libavif

use crate::error::{Error, Result};
use crate::image::{ChromaSampling, ColorRange, DecodedImage, ImageInfo, MatrixCoefficients};
use imgref::ImgVec;
use std::time::Duration;
use whereat::at;

/// Y, U, V and optional alpha planes of one frame
///
/// U and V are `None` for monochrome frames. Every plane is tightly packed;
/// native row padding is dropped while copying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YuvPlanes<T> {
    /// Luma, full resolution
    pub y: ImgVec<T>,
    /// Cb at the frame's chroma resolution
    pub u: Option<ImgVec<T>>,
    /// Cr at the frame's chroma resolution
    pub v: Option<ImgVec<T>>,
    /// Alpha, full resolution
    pub alpha: Option<ImgVec<T>>,
}

/// Plane storage by sample size
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Planes {
    /// 8-bit samples
    Eight(YuvPlanes<u8>),
    /// 10-, 12- or 16-bit samples, stored in native range (not rescaled)
    Sixteen(YuvPlanes<u16>),
}

/// One decoded frame, still in its native YUV layout
///
/// The chroma subsampling of the source is kept as-is; consumers must
/// handle whatever [`DecodedFrame::chroma_sampling`] reports. Use
/// [`DecodedFrame::to_image`] to get interleaved RGB(A) or gray pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    width: u32,
    height: u32,
    bit_depth: u8,
    chroma_sampling: ChromaSampling,
    color_range: ColorRange,
    matrix_coefficients: MatrixCoefficients,
    premultiplied_alpha: bool,
    planes: Planes,
}

fn check_plane<T>(plane: &ImgVec<T>, width: usize, height: usize) -> Result<()> {
    if plane.width() != width || plane.height() != height {
        return Err(at(Error::InvalidInput("plane size does not match frame")));
    }
    Ok(())
}

fn check_planes<T>(
    planes: &YuvPlanes<T>,
    width: usize,
    height: usize,
    chroma_sampling: ChromaSampling,
) -> Result<()> {
    check_plane(&planes.y, width, height)?;
    match (chroma_sampling.chroma_dimensions(width, height), &planes.u, &planes.v) {
        (Some((cw, ch)), Some(u), Some(v)) => {
            check_plane(u, cw, ch)?;
            check_plane(v, cw, ch)?;
        }
        (None, None, None) => {}
        _ => {
            return Err(at(Error::InvalidInput(
                "chroma planes do not match chroma sampling",
            )));
        }
    }
    if let Some(alpha) = &planes.alpha {
        check_plane(alpha, width, height)?;
    }
    Ok(())
}

impl DecodedFrame {
    /// Assemble a frame from planes, checking every plane's dimensions
    ///
    /// `bit_depth` must be 8 for [`Planes::Eight`] and 10, 12 or 16 for
    /// [`Planes::Sixteen`].
    pub fn new(
        chroma_sampling: ChromaSampling,
        color_range: ColorRange,
        matrix_coefficients: MatrixCoefficients,
        bit_depth: u8,
        premultiplied_alpha: bool,
        planes: Planes,
    ) -> Result<Self> {
        let (width, height) = match &planes {
            Planes::Eight(p) => (p.y.width(), p.y.height()),
            Planes::Sixteen(p) => (p.y.width(), p.y.height()),
        };
        if width == 0 || height == 0 {
            return Err(at(Error::InvalidInput("frame has zero width or height")));
        }
        let width_u32 = u32::try_from(width)
            .map_err(|_| at(Error::InvalidInput("frame width exceeds u32")))?;
        let height_u32 = u32::try_from(height)
            .map_err(|_| at(Error::InvalidInput("frame height exceeds u32")))?;

        match (&planes, bit_depth) {
            (Planes::Eight(p), 8) => check_planes(p, width, height, chroma_sampling)?,
            (Planes::Sixteen(p), 10 | 12 | 16) => {
                check_planes(p, width, height, chroma_sampling)?
            }
            _ => {
                return Err(at(Error::InvalidInput(
                    "bit depth does not match plane sample type",
                )));
            }
        }

        Ok(Self {
            width: width_u32,
            height: height_u32,
            bit_depth,
            chroma_sampling,
            color_range,
            matrix_coefficients,
            premultiplied_alpha,
            planes,
        })
    }

    /// Frame width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bits per sample (8, 10, 12 or 16)
    pub fn bit_depth(&self) -> u8 {
        self.bit_depth
    }

    /// Chroma subsampling the frame was coded with
    pub fn chroma_sampling(&self) -> ChromaSampling {
        self.chroma_sampling
    }

    pub fn color_range(&self) -> ColorRange {
        self.color_range
    }

    pub fn matrix_coefficients(&self) -> MatrixCoefficients {
        self.matrix_coefficients
    }

    /// Whether color samples are premultiplied by alpha
    pub fn premultiplied_alpha(&self) -> bool {
        self.premultiplied_alpha
    }

    pub fn has_alpha(&self) -> bool {
        match &self.planes {
            Planes::Eight(p) => p.alpha.is_some(),
            Planes::Sixteen(p) => p.alpha.is_some(),
        }
    }

    /// The copied plane data
    pub fn planes(&self) -> &Planes {
        &self.planes
    }

    /// Consume the frame and take its planes
    pub fn into_planes(self) -> Planes {
        self.planes
    }

    /// Convert to interleaved pixels
    ///
    /// Limited range is expanded to full and premultiplied alpha is
    /// converted to straight alpha. Frames with chroma planes are converted
    /// by libavif, so this loads it if needed; monochrome frames are not.
    pub fn to_image(&self) -> Result<DecodedImage> {
        crate::convert::frame_to_image(self)
    }
}

/// Every frame of an image sequence with its display duration
///
/// Frames and durations are kept index-for-index in decode order.
#[derive(Debug, Clone)]
pub struct Animation {
    info: ImageInfo,
    frames: Vec<DecodedFrame>,
    durations: Vec<Duration>,
    loop_count: u32,
}

/// Frames reserved up front; the header's frame count is only a claim
const MAX_RESERVED_FRAMES: usize = 64;

impl Animation {
    /// An empty animation with room for `expected_frames`, up to a small cap
    pub(crate) fn new(info: ImageInfo, loop_count: u32, expected_frames: usize) -> Self {
        let capacity = expected_frames.min(MAX_RESERVED_FRAMES);
        Self {
            info,
            frames: Vec::with_capacity(capacity),
            durations: Vec::with_capacity(capacity),
            loop_count,
        }
    }

    pub(crate) fn push(&mut self, frame: DecodedFrame, duration: Duration) {
        self.frames.push(frame);
        self.durations.push(duration);
    }

    /// Container metadata
    pub fn info(&self) -> &ImageInfo {
        &self.info
    }

    /// Number of times to play the sequence; 0 means forever
    pub fn loop_count(&self) -> u32 {
        self.loop_count
    }

    pub fn frames(&self) -> &[DecodedFrame] {
        &self.frames
    }

    /// Display duration of each frame, same length as [`Animation::frames`]
    pub fn durations(&self) -> &[Duration] {
        &self.durations
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frames paired with their durations
    pub fn iter(&self) -> impl Iterator<Item = (&DecodedFrame, Duration)> {
        self.frames.iter().zip(self.durations.iter().copied())
    }

    /// Sum of all frame durations
    pub fn total_duration(&self) -> Duration {
        self.durations.iter().sum()
    }

    /// Split into frames and durations
    pub fn into_parts(self) -> (Vec<DecodedFrame>, Vec<Duration>) {
        (self.frames, self.durations)
    }
}
