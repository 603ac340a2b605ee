//! Shared helpers for tests that need a real libavif
//!
//! No test vectors are checked in; inputs are produced with the crate's own
//! encoder, so every test here skips when libavif cannot be loaded.

#![allow(dead_code)]

use imgref::ImgVec;
use rgb::{Rgb, Rgba};
use std::time::Duration;
use zenavif_dyn::{DecodedImage, EncoderConfig, encode, encode_animation, ensure_loaded};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Returns false (and says why) when libavif is not installed
pub fn libavif_available() -> bool {
    init_logging();
    match ensure_loaded() {
        Ok(lib) => {
            eprintln!("using libavif {}", lib.version());
            true
        }
        Err(e) => {
            eprintln!("Skipping: {}", e.into_inner());
            false
        }
    }
}

pub fn fast() -> EncoderConfig {
    EncoderConfig::new().quality(70).speed(10)
}

/// Diagonal gradient, shade shifted by `seed`
pub fn gradient_rgb(width: usize, height: usize, seed: u8) -> DecodedImage {
    let mut pixels = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            pixels.push(Rgb::new(
                (x * 255 / width.max(1)) as u8,
                (y * 255 / height.max(1)) as u8,
                seed,
            ));
        }
    }
    DecodedImage::Rgb8(ImgVec::new(pixels, width, height))
}

pub fn gradient_rgba(width: usize, height: usize) -> DecodedImage {
    let mut pixels = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            pixels.push(Rgba::new(
                (x * 255 / width.max(1)) as u8,
                (y * 255 / height.max(1)) as u8,
                128,
                200,
            ));
        }
    }
    DecodedImage::Rgba8(ImgVec::new(pixels, width, height))
}

pub fn still_avif(width: usize, height: usize) -> Vec<u8> {
    encode(&gradient_rgb(width, height, 128), &fast()).expect("encode still")
}

/// `count` frames of `width`×`height`, each lasting `frame_ms`
pub fn animated_avif(width: usize, height: usize, count: usize, frame_ms: u64) -> Vec<u8> {
    let frames: Vec<(DecodedImage, Duration)> = (0..count)
        .map(|i| {
            (
                gradient_rgb(width, height, (i * 15) as u8),
                Duration::from_millis(frame_ms),
            )
        })
        .collect();
    encode_animation(&frames, &fast()).expect("encode animation")
}
