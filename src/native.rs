//! Owning wrappers around libavif objects
//!
//! Each native object the crate creates has exactly one owner here and is
//! released by that owner's `Drop`, so every exit path (success, libavif
//! error, or an error raised on the Rust side after libavif succeeded)
//! frees it exactly once. Pixel and byte data is always copied out; nothing
//! returned from this module points into libavif memory.

use crate::config::DecoderConfig;
use crate::error::{Error, Result};
use crate::ffi::*;
use crate::frame::{DecodedFrame, Planes, YuvPlanes};
use crate::image::{
    ChromaSampling, ColorPrimaries, ColorRange, ImageInfo, MatrixCoefficients,
    TransferCharacteristics,
};
use crate::library::AvifLibrary;
use imgref::ImgVec;
use std::ffi::c_int;
use std::marker::PhantomData;
use std::mem::{MaybeUninit, align_of, size_of};
use std::ptr::NonNull;
use whereat::{At, at};

#[cfg(test)]
use std::cell::Cell;

#[cfg(test)]
thread_local! {
    static LIVE_DECODERS: Cell<isize> = const { Cell::new(0) };
    static LIVE_ENCODERS: Cell<isize> = const { Cell::new(0) };
    static LIVE_IMAGES: Cell<isize> = const { Cell::new(0) };
    static LIVE_RWDATA: Cell<isize> = const { Cell::new(0) };
}

macro_rules! track {
    ($counter:ident, $delta:expr) => {
        #[cfg(test)]
        $counter.with(|c| c.set(c.get() + $delta));
    };
}

/// Native objects created on this thread and not yet released
#[cfg(test)]
pub(crate) fn live_objects() -> [isize; 4] {
    [
        LIVE_DECODERS.with(Cell::get),
        LIVE_ENCODERS.with(Cell::get),
        LIVE_IMAGES.with(Cell::get),
        LIVE_RWDATA.with(Cell::get),
    ]
}

#[track_caller]
fn decode_failure(lib: &AvifLibrary, code: avifResult) -> At<Error> {
    at(Error::NativeDecodeFailed {
        code,
        msg: lib.result_to_string(code),
    })
}

#[track_caller]
fn encode_failure(lib: &AvifLibrary, code: avifResult) -> At<Error> {
    at(Error::NativeEncodeFailed {
        code,
        msg: lib.result_to_string(code),
    })
}

fn checked_depth(depth: u32) -> Result<u8> {
    match depth {
        8 | 10 | 12 | 16 => Ok(depth as u8),
        _ => Err(at(Error::Unsupported("bit depth"))),
    }
}

/// Copy one native plane into a tightly packed image
///
/// # Safety
///
/// `ptr` must be null or valid for reads of `row_bytes * height` bytes.
unsafe fn copy_plane<T: Copy>(
    ptr: *const u8,
    row_bytes: u32,
    width: usize,
    height: usize,
) -> Result<ImgVec<T>> {
    if ptr.is_null() {
        return Err(at(Error::Unsupported("plane pointer is null")));
    }
    let stride = row_bytes as usize;
    if ptr.align_offset(align_of::<T>()) != 0 || stride % align_of::<T>() != 0 {
        return Err(at(Error::Unsupported("plane is not sample-aligned")));
    }
    let row_len = width
        .checked_mul(size_of::<T>())
        .ok_or_else(|| at(Error::Unsupported("plane row overflows")))?;
    if stride < row_len {
        return Err(at(Error::Unsupported("plane row bytes smaller than width")));
    }

    let mut pixels = Vec::with_capacity(width * height);
    for row in 0..height {
        // SAFETY: row * stride + row_len <= stride * height, within the
        // caller's guarantee; every row start is aligned (checked above).
        let row_slice =
            unsafe { std::slice::from_raw_parts(ptr.add(row * stride).cast::<T>(), width) };
        pixels.extend_from_slice(row_slice);
    }
    Ok(ImgVec::new(pixels, width, height))
}

/// Copy a tightly packed image into a native plane
///
/// # Safety
///
/// `ptr` must be null or valid for writes of `row_bytes * plane.height()` bytes.
unsafe fn write_plane<T: Copy>(ptr: *mut u8, row_bytes: u32, plane: &ImgVec<T>) -> Result<()> {
    if ptr.is_null() {
        return Err(at(Error::Unsupported("plane was not allocated")));
    }
    let stride = row_bytes as usize;
    if ptr.align_offset(align_of::<T>()) != 0 || stride % align_of::<T>() != 0 {
        return Err(at(Error::Unsupported("plane is not sample-aligned")));
    }
    if stride < plane.width() * size_of::<T>() {
        return Err(at(Error::Unsupported("plane row bytes smaller than width")));
    }
    for (i, row) in plane.rows().enumerate() {
        // SAFETY: bounds and alignment as in `copy_plane`; source and
        // destination are distinct allocations.
        unsafe {
            std::ptr::copy_nonoverlapping(
                row.as_ptr(),
                ptr.add(i * stride).cast::<T>(),
                row.len(),
            );
        }
    }
    Ok(())
}

/// Owns an `avifDecoder` reading from a borrowed input buffer
pub(crate) struct NativeDecoder<'a> {
    lib: &'a AvifLibrary,
    ptr: NonNull<avifDecoder>,
    frames_read: u32,
    _input: PhantomData<&'a [u8]>,
}

impl<'a> NativeDecoder<'a> {
    /// Create a decoder and apply `config` to it
    pub fn new(lib: &'a AvifLibrary, config: &DecoderConfig) -> Result<Self> {
        // SAFETY: no preconditions
        let ptr = unsafe { (lib.api().avifDecoderCreate)() };
        let ptr = NonNull::new(ptr).ok_or_else(|| at(Error::OutOfMemory))?;
        track!(LIVE_DECODERS, 1);

        let decoder = Self {
            lib,
            ptr,
            frames_read: 0,
            _input: PhantomData,
        };
        // SAFETY: ptr is a live decoder we exclusively own
        unsafe {
            let raw = decoder.ptr.as_ptr();
            (*raw).maxThreads = config.threads.max(1) as c_int;
            (*raw).ignoreExif = 1;
            (*raw).ignoreXMP = 1;
            if let Some(limit) = config.image_size_limit {
                (*raw).imageSizeLimit = limit;
            }
            if let Some(limit) = config.image_dimension_limit {
                (*raw).imageDimensionLimit = limit;
            }
            if let Some(limit) = config.image_count_limit {
                (*raw).imageCountLimit = limit;
            }
        }
        Ok(decoder)
    }

    /// Point the decoder at `data`, which must outlive it
    pub fn set_memory_input(&mut self, data: &'a [u8]) -> Result<()> {
        if data.is_empty() {
            return Err(at(Error::InvalidInput("empty input")));
        }
        // SAFETY: data stays borrowed for 'a, which outlives self
        let result = unsafe {
            (self.lib.api().avifDecoderSetIOMemory)(self.ptr.as_ptr(), data.as_ptr(), data.len())
        };
        if result != AVIF_RESULT_OK {
            return Err(decode_failure(self.lib, result));
        }
        Ok(())
    }

    /// Parse the container header
    pub fn parse(&mut self) -> Result<()> {
        // SAFETY: input was set
        let result = unsafe { (self.lib.api().avifDecoderParse)(self.ptr.as_ptr()) };
        if result != AVIF_RESULT_OK {
            return Err(decode_failure(self.lib, result));
        }
        Ok(())
    }

    fn image(&self) -> Result<&avifImage> {
        // SAFETY: the decoder owns its image; the reference is tied to &self
        unsafe {
            let image = (*self.ptr.as_ptr()).image;
            image.as_ref().ok_or_else(|| {
                at(Error::NativeDecodeFailed {
                    code: -1,
                    msg: String::from("decoder holds no image"),
                })
            })
        }
    }

    /// Image header as filled in by [`NativeDecoder::parse`]
    pub fn header(&self) -> Result<ImageInfo> {
        let image = self.image()?;
        // SAFETY: plain field reads of a live decoder
        let (image_count, alpha_present) = unsafe {
            let raw = self.ptr.as_ptr();
            ((*raw).imageCount, (*raw).alphaPresent != 0)
        };

        let chroma_sampling = ChromaSampling::from_native(image.yuvFormat)
            .ok_or_else(|| at(Error::Unsupported("pixel format")))?;
        Ok(ImageInfo {
            width: image.width,
            height: image.height,
            bit_depth: checked_depth(image.depth)?,
            has_alpha: alpha_present,
            premultiplied_alpha: image.alphaPremultiplied != 0,
            monochrome: chroma_sampling == ChromaSampling::Monochrome,
            color_primaries: ColorPrimaries(image.colorPrimaries),
            transfer_characteristics: TransferCharacteristics(image.transferCharacteristics),
            matrix_coefficients: MatrixCoefficients(image.matrixCoefficients),
            color_range: ColorRange::from_native(image.yuvRange),
            chroma_sampling,
            frame_count: image_count.max(1) as u32,
        })
    }

    /// Raw `repetitionCount`: -1 infinite, -2 unknown, n ≥ 0 extra plays
    pub fn repetition_count(&self) -> c_int {
        // SAFETY: plain field read of a live decoder
        unsafe { (*self.ptr.as_ptr()).repetitionCount }
    }

    /// Decode the next frame; `None` once the sequence is exhausted
    ///
    /// The returned view borrows the decoder, so the following frame can only
    /// be requested after this one has been copied out and the view dropped.
    pub fn next_image(&mut self) -> Result<Option<DecodedView<'_>>> {
        // SAFETY: decoder was parsed
        let result = unsafe { (self.lib.api().avifDecoderNextImage)(self.ptr.as_ptr()) };
        match result {
            AVIF_RESULT_OK => {
                self.frames_read += 1;
                Ok(Some(DecodedView {
                    image: self.image()?,
                }))
            }
            AVIF_RESULT_NO_IMAGES_REMAINING => Ok(None),
            code => Err(decode_failure(self.lib, code)),
        }
    }

    /// Number of successful [`NativeDecoder::next_image`] calls
    pub fn frames_read(&self) -> u32 {
        self.frames_read
    }

    /// Presentation timing of frame `index`
    pub fn timing(&self, index: u32) -> Result<avifImageTiming> {
        let mut timing = avifImageTiming::default();
        // SAFETY: timing is a valid out-pointer; decoder was parsed
        let result = unsafe {
            (self.lib.api().avifDecoderNthImageTiming)(self.ptr.as_ptr(), index, &mut timing)
        };
        if result != AVIF_RESULT_OK {
            return Err(decode_failure(self.lib, result));
        }
        Ok(timing)
    }
}

impl Drop for NativeDecoder<'_> {
    fn drop(&mut self) {
        // SAFETY: ptr came from avifDecoderCreate and is released only here
        unsafe { (self.lib.api().avifDecoderDestroy)(self.ptr.as_ptr()) };
        track!(LIVE_DECODERS, -1);
    }
}

/// The decoder's current image, valid until the next decoder call
pub(crate) struct DecodedView<'d> {
    image: &'d avifImage,
}

impl DecodedView<'_> {
    /// Copy every plane out into an owned frame
    pub fn to_frame(&self) -> Result<DecodedFrame> {
        let image = self.image;
        let chroma_sampling = ChromaSampling::from_native(image.yuvFormat)
            .ok_or_else(|| at(Error::Unsupported("pixel format")))?;
        let bit_depth = checked_depth(image.depth)?;
        let (width, height) = (image.width as usize, image.height as usize);
        if width == 0 || height == 0 {
            return Err(at(Error::Unsupported("decoded frame has no pixels")));
        }

        // SAFETY: libavif sizes each plane as row bytes times its row count
        let planes = unsafe {
            if bit_depth == 8 {
                Planes::Eight(copy_planes(image, width, height, chroma_sampling)?)
            } else {
                Planes::Sixteen(copy_planes(image, width, height, chroma_sampling)?)
            }
        };

        DecodedFrame::new(
            chroma_sampling,
            ColorRange::from_native(image.yuvRange),
            MatrixCoefficients(image.matrixCoefficients),
            bit_depth,
            image.alphaPremultiplied != 0,
            planes,
        )
    }
}

/// # Safety
///
/// `image` must be a decoded libavif image whose planes are populated.
unsafe fn copy_planes<T: Copy>(
    image: &avifImage,
    width: usize,
    height: usize,
    chroma_sampling: ChromaSampling,
) -> Result<YuvPlanes<T>> {
    // SAFETY: forwarded from the caller
    unsafe {
        let y = copy_plane(image.yuvPlanes[0], image.yuvRowBytes[0], width, height)?;
        let (u, v) = match chroma_sampling.chroma_dimensions(width, height) {
            Some((cw, ch)) => (
                Some(copy_plane(image.yuvPlanes[1], image.yuvRowBytes[1], cw, ch)?),
                Some(copy_plane(image.yuvPlanes[2], image.yuvRowBytes[2], cw, ch)?),
            ),
            None => (None, None),
        };
        let alpha = if image.alphaPlane.is_null() {
            None
        } else {
            Some(copy_plane(image.alphaPlane, image.alphaRowBytes, width, height)?)
        };
        Ok(YuvPlanes { y, u, v, alpha })
    }
}

/// Owns an `avifImage` built on the Rust side for encoding
pub(crate) struct NativeImage<'l> {
    lib: &'l AvifLibrary,
    ptr: NonNull<avifImage>,
}

impl<'l> NativeImage<'l> {
    pub fn new(
        lib: &'l AvifLibrary,
        width: u32,
        height: u32,
        depth: u8,
        chroma_sampling: ChromaSampling,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(at(Error::InvalidInput("image has zero width or height")));
        }
        // SAFETY: arguments are plain values
        let ptr = unsafe {
            (lib.api().avifImageCreate)(
                width,
                height,
                u32::from(depth),
                chroma_sampling.to_native(),
            )
        };
        let ptr = NonNull::new(ptr).ok_or_else(|| at(Error::OutOfMemory))?;
        track!(LIVE_IMAGES, 1);
        Ok(Self { lib, ptr })
    }

    /// Allocate an image sized for `planes` and copy them in
    pub fn from_planes(
        lib: &'l AvifLibrary,
        planes: &Planes,
        depth: u8,
        chroma_sampling: ChromaSampling,
        range: ColorRange,
        matrix: MatrixCoefficients,
        premultiplied: bool,
    ) -> Result<Self> {
        let (width, height, has_alpha) = match planes {
            Planes::Eight(p) => (p.y.width(), p.y.height(), p.alpha.is_some()),
            Planes::Sixteen(p) => (p.y.width(), p.y.height(), p.alpha.is_some()),
        };
        let width = u32::try_from(width)
            .map_err(|_| at(Error::InvalidInput("image width exceeds u32")))?;
        let height = u32::try_from(height)
            .map_err(|_| at(Error::InvalidInput("image height exceeds u32")))?;

        let mut native = Self::new(lib, width, height, depth, chroma_sampling)?;
        native.set_color(
            range,
            AVIF_COLOR_PRIMARIES_BT709,
            AVIF_TRANSFER_CHARACTERISTICS_SRGB,
            matrix,
        );
        native.set_premultiplied_alpha(premultiplied);

        let flags = if has_alpha {
            AVIF_PLANES_YUV | AVIF_PLANES_A
        } else {
            AVIF_PLANES_YUV
        };
        native.allocate_planes(flags)?;
        match planes {
            Planes::Eight(p) => native.write_planes(p)?,
            Planes::Sixteen(p) => native.write_planes(p)?,
        }
        Ok(native)
    }

    pub fn set_color(
        &mut self,
        range: ColorRange,
        primaries: u16,
        transfer: u16,
        matrix: MatrixCoefficients,
    ) {
        // SAFETY: exclusive owner of a live image
        unsafe {
            let raw = self.ptr.as_ptr();
            (*raw).yuvRange = range.to_native();
            (*raw).colorPrimaries = primaries;
            (*raw).transferCharacteristics = transfer;
            (*raw).matrixCoefficients = matrix.0;
        }
    }

    pub fn set_premultiplied_alpha(&mut self, premultiplied: bool) {
        // SAFETY: exclusive owner of a live image
        unsafe { (*self.ptr.as_ptr()).alphaPremultiplied = c_int::from(premultiplied) };
    }

    pub fn allocate_planes(&mut self, flags: avifPlanesFlags) -> Result<()> {
        // SAFETY: exclusive owner of a live image
        let result = unsafe { (self.lib.api().avifImageAllocatePlanes)(self.ptr.as_ptr(), flags) };
        if result != AVIF_RESULT_OK {
            return Err(encode_failure(self.lib, result));
        }
        Ok(())
    }

    /// Copy Y/U/V (and alpha, if present) into planes allocated earlier
    pub fn write_planes<T: Copy>(&mut self, planes: &YuvPlanes<T>) -> Result<()> {
        // SAFETY: planes were allocated by libavif for this image's size and
        // format, which is what the caller built `planes` for.
        unsafe {
            let image = &*self.ptr.as_ptr();
            write_plane(image.yuvPlanes[0], image.yuvRowBytes[0], &planes.y)?;
            if let (Some(u), Some(v)) = (&planes.u, &planes.v) {
                write_plane(image.yuvPlanes[1], image.yuvRowBytes[1], u)?;
                write_plane(image.yuvPlanes[2], image.yuvRowBytes[2], v)?;
            }
            if let Some(alpha) = &planes.alpha {
                write_plane(image.alphaPlane, image.alphaRowBytes, alpha)?;
            }
        }
        Ok(())
    }

    /// Convert interleaved pixels into this image's YUV (and alpha) planes
    ///
    /// `pixels` holds `height` rows of `row_bytes` bytes in `format` at
    /// `depth` bits per channel (8 or 16).
    pub fn rgb_to_yuv(
        &mut self,
        pixels: &[u8],
        format: avifRGBFormat,
        depth: u32,
        row_bytes: u32,
    ) -> Result<()> {
        self.check_rgb_len(pixels.len(), row_bytes)?;
        // libavif only reads through this pointer during RGBToYUV
        let rgb = self.rgb_image(pixels.as_ptr().cast_mut(), format, depth, row_bytes);

        // SAFETY: rgb describes `pixels`, which outlives the call
        let result = unsafe { (self.lib.api().avifImageRGBToYUV)(self.ptr.as_ptr(), &rgb) };
        if result != AVIF_RESULT_OK {
            return Err(encode_failure(self.lib, result));
        }
        Ok(())
    }

    /// Convert this image's planes into interleaved pixels
    ///
    /// libavif applies the image's matrix coefficients and range, upsamples
    /// chroma, and turns premultiplied alpha into straight alpha. `pixels`
    /// receives `height` rows of `row_bytes` bytes in `format` at `depth`
    /// bits per channel.
    pub fn yuv_to_rgb(
        &self,
        pixels: &mut [u8],
        format: avifRGBFormat,
        depth: u32,
        row_bytes: u32,
    ) -> Result<()> {
        self.check_rgb_len(pixels.len(), row_bytes)?;
        let mut rgb = self.rgb_image(pixels.as_mut_ptr(), format, depth, row_bytes);

        // SAFETY: rgb describes `pixels`, which is exclusively borrowed for
        // the duration of the call
        let result = unsafe { (self.lib.api().avifImageYUVToRGB)(self.ptr.as_ptr(), &mut rgb) };
        if result != AVIF_RESULT_OK {
            return Err(decode_failure(self.lib, result));
        }
        Ok(())
    }

    fn check_rgb_len(&self, len: usize, row_bytes: u32) -> Result<()> {
        // SAFETY: plain field read of a live image
        let height = unsafe { (*self.ptr.as_ptr()).height } as usize;
        if (row_bytes as usize).checked_mul(height) != Some(len) {
            return Err(at(Error::InvalidInput("pixel buffer size mismatch")));
        }
        Ok(())
    }

    /// An `avifRGBImage` with libavif's defaults for this image
    fn rgb_image(
        &self,
        pixels: *mut u8,
        format: avifRGBFormat,
        depth: u32,
        row_bytes: u32,
    ) -> avifRGBImage {
        let mut rgb = MaybeUninit::<avifRGBImage>::zeroed();
        // SAFETY: zeroed is a valid avifRGBImage (integers and a null
        // pointer); SetDefaults only writes it.
        let mut rgb = unsafe {
            (self.lib.api().avifRGBImageSetDefaults)(rgb.as_mut_ptr(), self.ptr.as_ptr());
            rgb.assume_init()
        };
        rgb.format = format;
        rgb.depth = depth;
        rgb.rowBytes = row_bytes;
        rgb.pixels = pixels;
        rgb
    }

    fn as_ptr(&self) -> *const avifImage {
        self.ptr.as_ptr()
    }
}

impl Drop for NativeImage<'_> {
    fn drop(&mut self) {
        // SAFETY: ptr came from avifImageCreate and is released only here
        unsafe { (self.lib.api().avifImageDestroy)(self.ptr.as_ptr()) };
        track!(LIVE_IMAGES, -1);
    }
}

/// Encoder settings in libavif's units, already range-checked
#[derive(Debug, Clone, Copy)]
pub(crate) struct NativeEncoderSettings {
    pub quality: u8,
    pub quality_alpha: u8,
    pub speed: u8,
    pub threads: u32,
    pub timescale: u64,
    /// `None` = loop forever
    pub repetition_count: Option<u32>,
}

/// Owns an `avifEncoder`
pub(crate) struct NativeEncoder<'l> {
    lib: &'l AvifLibrary,
    ptr: NonNull<avifEncoder>,
}

impl<'l> NativeEncoder<'l> {
    pub fn new(lib: &'l AvifLibrary, settings: &NativeEncoderSettings) -> Result<Self> {
        // SAFETY: no preconditions
        let ptr = unsafe { (lib.api().avifEncoderCreate)() };
        let ptr = NonNull::new(ptr).ok_or_else(|| at(Error::OutOfMemory))?;
        track!(LIVE_ENCODERS, 1);

        let encoder = Self { lib, ptr };
        // SAFETY: exclusive owner of a live encoder
        unsafe {
            let raw = encoder.ptr.as_ptr();
            (*raw).quality = c_int::from(settings.quality);
            (*raw).qualityAlpha = c_int::from(settings.quality_alpha);
            (*raw).speed = c_int::from(settings.speed);
            (*raw).maxThreads = settings.threads.max(1) as c_int;
            (*raw).timescale = settings.timescale.max(1);
            (*raw).repetitionCount = match settings.repetition_count {
                Some(n) => c_int::try_from(n).unwrap_or(c_int::MAX),
                None => AVIF_REPETITION_COUNT_INFINITE,
            };
        }
        Ok(encoder)
    }

    /// Append one frame lasting `duration` timescale units
    pub fn add_image(
        &mut self,
        image: &NativeImage<'_>,
        duration: u64,
        flags: avifAddImageFlags,
    ) -> Result<()> {
        // SAFETY: both objects are live; libavif copies what it keeps
        let result = unsafe {
            (self.lib.api().avifEncoderAddImage)(self.ptr.as_ptr(), image.as_ptr(), duration, flags)
        };
        if result != AVIF_RESULT_OK {
            return Err(encode_failure(self.lib, result));
        }
        Ok(())
    }

    /// Finish the stream and copy the encoded file out
    pub fn finish(self) -> Result<Vec<u8>> {
        let mut output = NativeRwData::new(self.lib);
        // SAFETY: output is an empty avifRWData that we free in its Drop
        let result = unsafe {
            (self.lib.api().avifEncoderFinish)(self.ptr.as_ptr(), output.as_mut_ptr())
        };
        if result != AVIF_RESULT_OK {
            return Err(encode_failure(self.lib, result));
        }
        let bytes = output.to_vec();
        if bytes.is_empty() {
            return Err(encode_failure(self.lib, AVIF_RESULT_INVALID_ARGUMENT));
        }
        Ok(bytes)
    }
}

impl Drop for NativeEncoder<'_> {
    fn drop(&mut self) {
        // SAFETY: ptr came from avifEncoderCreate and is released only here
        unsafe { (self.lib.api().avifEncoderDestroy)(self.ptr.as_ptr()) };
        track!(LIVE_ENCODERS, -1);
    }
}

/// Owns the buffer libavif writes the encoded file into
struct NativeRwData<'l> {
    lib: &'l AvifLibrary,
    data: avifRWData,
}

impl<'l> NativeRwData<'l> {
    fn new(lib: &'l AvifLibrary) -> Self {
        track!(LIVE_RWDATA, 1);
        Self {
            lib,
            data: avifRWData {
                data: std::ptr::null_mut(),
                size: 0,
            },
        }
    }

    fn as_mut_ptr(&mut self) -> *mut avifRWData {
        &mut self.data
    }

    fn to_vec(&self) -> Vec<u8> {
        if self.data.data.is_null() || self.data.size == 0 {
            return Vec::new();
        }
        // SAFETY: libavif guarantees data is valid for size bytes
        unsafe { std::slice::from_raw_parts(self.data.data, self.data.size) }.to_vec()
    }
}

impl Drop for NativeRwData<'_> {
    fn drop(&mut self) {
        // SAFETY: freeing an empty or libavif-allocated buffer
        unsafe { (self.lib.api().avifRWDataFree)(&mut self.data) };
        track!(LIVE_RWDATA, -1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::ensure_loaded;

    fn lib_or_skip() -> Option<&'static AvifLibrary> {
        match ensure_loaded() {
            Ok(lib) => Some(lib),
            Err(e) => {
                eprintln!("Skipping: {}", e.into_inner());
                None
            }
        }
    }

    #[test]
    fn copy_plane_drops_row_padding() {
        // 3x2 plane stored with 4-byte rows
        let native = [1u8, 2, 3, 0xEE, 4, 5, 6, 0xEE];
        let plane: ImgVec<u8> = unsafe { copy_plane(native.as_ptr(), 4, 3, 2) }.unwrap();
        assert_eq!(plane.buf(), &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn copy_plane_rejects_short_stride() {
        let native = [0u8; 8];
        let err = unsafe { copy_plane::<u8>(native.as_ptr(), 2, 3, 2) }.unwrap_err().into_inner();
        assert!(matches!(&err, Error::Unsupported(_)));
    }

    #[test]
    fn copy_plane_rejects_null() {
        let err = unsafe { copy_plane::<u16>(std::ptr::null(), 8, 4, 4) }.unwrap_err().into_inner();
        assert!(matches!(&err, Error::Unsupported(_)));
    }

    #[test]
    fn write_plane_respects_stride() {
        let mut native = [0u16; 8];
        let plane = ImgVec::new(vec![1u16, 2, 3, 4, 5, 6], 3, 2);
        unsafe { write_plane(native.as_mut_ptr().cast(), 8, &plane) }.unwrap();
        assert_eq!(native, [1, 2, 3, 0, 4, 5, 6, 0]);
    }

    #[test]
    fn checked_depth_accepts_av1_depths() {
        for d in [8, 10, 12, 16] {
            assert_eq!(checked_depth(d).unwrap(), d as u8);
        }
        assert!(checked_depth(9).is_err());
    }

    #[test]
    fn corrupt_input_releases_decoder() {
        let Some(lib) = lib_or_skip() else { return };
        let data = b"\x00\x00\x00\x18ftypavifjunkjunkjunkjunk".to_vec();
        {
            let mut decoder = NativeDecoder::new(lib, &DecoderConfig::default()).unwrap();
            assert_eq!(live_objects()[0], 1);
            decoder.set_memory_input(&data).unwrap();
            let err = decoder.parse().unwrap_err().into_inner();
            assert!(matches!(&err, Error::NativeDecodeFailed { .. }));
        }
        assert_eq!(live_objects(), [0; 4]);
    }

    #[test]
    fn encoder_objects_are_released_after_finish() {
        let Some(lib) = lib_or_skip() else { return };
        let settings = NativeEncoderSettings {
            quality: 50,
            quality_alpha: 50,
            speed: 10,
            threads: 1,
            timescale: 1,
            repetition_count: None,
        };
        let bytes = {
            let mut image = NativeImage::new(lib, 8, 8, 8, ChromaSampling::Cs420).unwrap();
            image.set_color(ColorRange::Full, 1, 13, MatrixCoefficients::BT601);
            let pixels = vec![128u8; 8 * 8 * 3];
            image.rgb_to_yuv(&pixels, AVIF_RGB_FORMAT_RGB, 8, 8 * 3).unwrap();
            let mut encoder = NativeEncoder::new(lib, &settings).unwrap();
            encoder
                .add_image(&image, 1, AVIF_ADD_IMAGE_FLAG_SINGLE)
                .unwrap();
            assert_eq!(live_objects(), [0, 1, 1, 0]);
            encoder.finish().unwrap()
        };
        assert!(!bytes.is_empty());
        assert_eq!(live_objects(), [0; 4]);
    }

    #[test]
    fn rgb_to_yuv_checks_buffer_before_native_call() {
        let Some(lib) = lib_or_skip() else { return };
        let mut image = NativeImage::new(lib, 4, 4, 8, ChromaSampling::Cs444).unwrap();
        let err = image
            .rgb_to_yuv(&[0u8; 10], AVIF_RGB_FORMAT_RGBA, 8, 16)
            .unwrap_err()
            .into_inner();
        assert!(matches!(&err, Error::InvalidInput(_)));
        drop(image);
        assert_eq!(live_objects(), [0; 4]);
    }

    #[test]
    fn yuv_to_rgb_checks_buffer_and_releases_image() {
        let Some(lib) = lib_or_skip() else { return };
        let planes = Planes::Eight(YuvPlanes {
            y: ImgVec::new(vec![128u8; 16], 4, 4),
            u: Some(ImgVec::new(vec![128u8; 4], 2, 2)),
            v: Some(ImgVec::new(vec![128u8; 4], 2, 2)),
            alpha: None,
        });
        {
            let image = NativeImage::from_planes(
                lib,
                &planes,
                8,
                ChromaSampling::Cs420,
                ColorRange::Full,
                MatrixCoefficients::BT601,
                false,
            )
            .unwrap();
            assert_eq!(live_objects(), [0, 0, 1, 0]);

            let mut short = [0u8; 10];
            let err = image
                .yuv_to_rgb(&mut short, AVIF_RGB_FORMAT_RGB, 8, 12)
                .unwrap_err()
                .into_inner();
            assert!(matches!(&err, Error::InvalidInput(_)));

            let mut out = [0u8; 4 * 4 * 3];
            image.yuv_to_rgb(&mut out, AVIF_RGB_FORMAT_RGB, 8, 12).unwrap();
            assert!(out.iter().all(|&c| c.abs_diff(128) <= 2), "{out:?}");
        }
        assert_eq!(live_objects(), [0; 4]);
    }
}
