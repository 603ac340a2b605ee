//! Decode pipeline: drives one libavif decoder from input bytes to owned frames
//!
//! Each call owns its own native decoder. Frames are copied out as soon as
//! libavif produces them, and the decoder is released on every return path,
//! including cancellation and errors in the middle of a sequence.

use crate::config::DecoderConfig;
use crate::error::{Error, Result};
use crate::ffi::avifImageTiming;
use crate::frame::{Animation, DecodedFrame};
use crate::image::ImageInfo;
use crate::library::ensure_loaded;
use crate::native::NativeDecoder;
use enough::Stop;
use log::{debug, warn};
use std::ffi::c_int;
use std::time::Duration;
use whereat::at;

/// How much of the stream to decode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DecodeMode {
    /// Header only, no pixel work
    ConfigOnly,
    /// The first frame
    FirstFrame,
    /// Every frame with its timing
    AllFrames,
}

/// Run one decode
///
/// Returns the header and, unless `mode` is [`DecodeMode::ConfigOnly`], the
/// decoded frames. `FirstFrame` yields an animation of exactly one frame.
pub(crate) fn run(
    data: &[u8],
    mode: DecodeMode,
    config: &DecoderConfig,
    stop: &impl Stop,
) -> Result<(ImageInfo, Option<Animation>)> {
    if data.is_empty() {
        return Err(at(Error::InvalidInput("empty input")));
    }
    stop.check().map_err(|e| at(Error::Cancelled(e)))?;

    let lib = ensure_loaded()?;
    let mut decoder = NativeDecoder::new(lib, config)?;
    decoder.set_memory_input(data)?;
    decoder.parse()?;

    let info = decoder.header()?;
    debug!(
        "parsed {}x{} {}-bit {:?}, {} frame(s), alpha: {}",
        info.width,
        info.height,
        info.bit_depth,
        info.chroma_sampling,
        info.frame_count,
        info.has_alpha
    );

    if mode == DecodeMode::ConfigOnly {
        return Ok((info, None));
    }

    let expected_frames = match mode {
        DecodeMode::FirstFrame => 1,
        _ => info.frame_count as usize,
    };
    let mut animation = Animation::new(
        info.clone(),
        loop_count(decoder.repetition_count()),
        expected_frames,
    );
    loop {
        stop.check().map_err(|e| at(Error::Cancelled(e)))?;

        let frame: DecodedFrame = match decoder.next_image()? {
            Some(view) => view.to_frame()?,
            None => break,
        };
        let index = decoder.frames_read() - 1;
        let duration = frame_duration(&decoder.timing(index)?);
        animation.push(frame, duration);

        if mode == DecodeMode::FirstFrame {
            break;
        }
    }

    if animation.is_empty() {
        return Err(at(Error::NativeDecodeFailed {
            code: crate::ffi::AVIF_RESULT_NO_IMAGES_REMAINING,
            msg: String::from("stream contains no frames"),
        }));
    }
    debug!("decoded {} frame(s)", animation.len());
    Ok((info, Some(animation)))
}

/// Map libavif's `repetitionCount` to a play count (0 = forever)
///
/// libavif counts repeats after the first play, so `n` becomes `n + 1`.
/// Infinite and unknown both map to 0.
fn loop_count(repetition_count: c_int) -> u32 {
    match u32::try_from(repetition_count) {
        Ok(n) => n.saturating_add(1),
        Err(_) => 0,
    }
}

fn frame_duration(timing: &avifImageTiming) -> Duration {
    match Duration::try_from_secs_f64(timing.duration) {
        Ok(d) => d,
        Err(_) => {
            warn!("frame duration {} is not representable, using 0", timing.duration);
            Duration::ZERO
        }
    }
}
