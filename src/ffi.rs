//! libavif 1.x ABI: the structures, constants and entry points this crate uses
//!
//! Only the leading fields of `avifImage`, `avifDecoder` and `avifEncoder` are
//! declared. Values of those types are never constructed on the Rust side;
//! they only exist behind pointers returned by libavif, so the undeclared
//! tail is never read or written. `avifRGBImage`, `avifRWData` and
//! `avifImageTiming` are allocated here and declared in full.

#![allow(non_camel_case_types, non_snake_case, dead_code)]

use std::ffi::{c_char, c_int};

pub type avifResult = c_int;
pub type avifBool = c_int;
pub type avifPixelFormat = c_int;
pub type avifRange = c_int;
pub type avifRGBFormat = c_int;
pub type avifPlanesFlags = u32;
pub type avifAddImageFlags = u32;

pub const AVIF_RESULT_OK: avifResult = 0;
pub const AVIF_RESULT_NO_IMAGES_REMAINING: avifResult = 16;
pub const AVIF_RESULT_INVALID_ARGUMENT: avifResult = 24;

pub const AVIF_PIXEL_FORMAT_NONE: avifPixelFormat = 0;
pub const AVIF_PIXEL_FORMAT_YUV444: avifPixelFormat = 1;
pub const AVIF_PIXEL_FORMAT_YUV422: avifPixelFormat = 2;
pub const AVIF_PIXEL_FORMAT_YUV420: avifPixelFormat = 3;
pub const AVIF_PIXEL_FORMAT_YUV400: avifPixelFormat = 4;

pub const AVIF_RANGE_LIMITED: avifRange = 0;
pub const AVIF_RANGE_FULL: avifRange = 1;

pub const AVIF_PLANES_YUV: avifPlanesFlags = 1 << 0;
pub const AVIF_PLANES_A: avifPlanesFlags = 1 << 1;

pub const AVIF_ADD_IMAGE_FLAG_NONE: avifAddImageFlags = 0;
pub const AVIF_ADD_IMAGE_FLAG_SINGLE: avifAddImageFlags = 1 << 1;

pub const AVIF_RGB_FORMAT_RGB: avifRGBFormat = 0;
pub const AVIF_RGB_FORMAT_RGBA: avifRGBFormat = 1;

pub const AVIF_COLOR_PRIMARIES_BT709: u16 = 1;
pub const AVIF_TRANSFER_CHARACTERISTICS_SRGB: u16 = 13;
pub const AVIF_MATRIX_COEFFICIENTS_BT601: u16 = 6;

pub const AVIF_REPETITION_COUNT_INFINITE: c_int = -1;

#[repr(C)]
#[derive(Debug)]
pub struct avifRWData {
    pub data: *mut u8,
    pub size: usize,
}

#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub struct avifImageTiming {
    pub timescale: u64,
    pub pts: f64,
    pub ptsInTimescales: u64,
    pub duration: f64,
    pub durationInTimescales: u64,
}

#[repr(C)]
pub struct avifImage {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub yuvFormat: avifPixelFormat,
    pub yuvRange: avifRange,
    pub yuvChromaSamplePosition: c_int,
    pub yuvPlanes: [*mut u8; 3],
    pub yuvRowBytes: [u32; 3],
    pub imageOwnsYUVPlanes: avifBool,
    pub alphaPlane: *mut u8,
    pub alphaRowBytes: u32,
    pub imageOwnsAlphaPlane: avifBool,
    pub alphaPremultiplied: avifBool,
    pub icc: avifRWData,
    pub colorPrimaries: u16,
    pub transferCharacteristics: u16,
    pub matrixCoefficients: u16,
}

#[repr(C)]
pub struct avifDecoder {
    pub codecChoice: c_int,
    pub maxThreads: c_int,
    pub requestedSource: c_int,
    pub allowProgressive: avifBool,
    pub allowIncremental: avifBool,
    pub ignoreExif: avifBool,
    pub ignoreXMP: avifBool,
    pub imageSizeLimit: u32,
    pub imageDimensionLimit: u32,
    pub imageCountLimit: u32,
    pub strictFlags: u32,
    // 1.1 added imageContentToDecode here; on 1.0 these bytes are padding
    // before the pointer, so the offsets below agree for every 1.x release.
    pub _imageContentToDecode: u32,
    pub image: *mut avifImage,
    pub imageIndex: c_int,
    pub imageCount: c_int,
    pub progressiveState: c_int,
    pub imageTiming: avifImageTiming,
    pub timescale: u64,
    pub duration: f64,
    pub durationInTimescales: u64,
    pub repetitionCount: c_int,
    pub alphaPresent: avifBool,
}

#[repr(C)]
pub struct avifEncoder {
    pub codecChoice: c_int,
    pub maxThreads: c_int,
    pub speed: c_int,
    pub keyframeInterval: c_int,
    pub timescale: u64,
    pub repetitionCount: c_int,
    pub extraLayerCount: u32,
    pub quality: c_int,
    pub qualityAlpha: c_int,
}

#[repr(C)]
pub struct avifRGBImage {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub format: avifRGBFormat,
    pub chromaUpsampling: c_int,
    pub chromaDownsampling: c_int,
    pub avoidLibYUV: avifBool,
    pub ignoreAlpha: avifBool,
    pub alphaPremultiplied: avifBool,
    pub isFloat: avifBool,
    pub maxThreads: c_int,
    pub pixels: *mut u8,
    pub rowBytes: u32,
    // avifRGBImageSetDefaults writes the whole struct; room for fields a
    // later 1.x may append.
    pub _headroom: [u64; 8],
}

pub type AvifVersionFn = unsafe extern "C" fn() -> *const c_char;
pub type AvifResultToStringFn = unsafe extern "C" fn(avifResult) -> *const c_char;

pub type AvifDecoderCreateFn = unsafe extern "C" fn() -> *mut avifDecoder;
pub type AvifDecoderDestroyFn = unsafe extern "C" fn(*mut avifDecoder);
pub type AvifDecoderSetIOMemoryFn =
    unsafe extern "C" fn(*mut avifDecoder, *const u8, usize) -> avifResult;
pub type AvifDecoderParseFn = unsafe extern "C" fn(*mut avifDecoder) -> avifResult;
pub type AvifDecoderNextImageFn = unsafe extern "C" fn(*mut avifDecoder) -> avifResult;
pub type AvifDecoderNthImageTimingFn =
    unsafe extern "C" fn(*const avifDecoder, u32, *mut avifImageTiming) -> avifResult;

pub type AvifImageCreateFn =
    unsafe extern "C" fn(u32, u32, u32, avifPixelFormat) -> *mut avifImage;
pub type AvifImageDestroyFn = unsafe extern "C" fn(*mut avifImage);
pub type AvifImageAllocatePlanesFn =
    unsafe extern "C" fn(*mut avifImage, avifPlanesFlags) -> avifResult;
pub type AvifRGBImageSetDefaultsFn = unsafe extern "C" fn(*mut avifRGBImage, *const avifImage);
pub type AvifImageRGBToYUVFn =
    unsafe extern "C" fn(*mut avifImage, *const avifRGBImage) -> avifResult;
pub type AvifImageYUVToRGBFn =
    unsafe extern "C" fn(*const avifImage, *mut avifRGBImage) -> avifResult;

pub type AvifEncoderCreateFn = unsafe extern "C" fn() -> *mut avifEncoder;
pub type AvifEncoderDestroyFn = unsafe extern "C" fn(*mut avifEncoder);
pub type AvifEncoderAddImageFn =
    unsafe extern "C" fn(*mut avifEncoder, *const avifImage, u64, avifAddImageFlags) -> avifResult;
pub type AvifEncoderFinishFn =
    unsafe extern "C" fn(*mut avifEncoder, *mut avifRWData) -> avifResult;
pub type AvifRWDataFreeFn = unsafe extern "C" fn(*mut avifRWData);
