//! Still-image decode and encode against the installed libavif

mod common;

use common::{fast, gradient_rgb, gradient_rgba, libavif_available, still_avif};
use zenavif_dyn::{
    ChromaSampling, DecodedImage, DecoderConfig, EncodeBitDepth, EncoderConfig, Error, Planes,
    decode, decode_config, decode_config_from_reader, decode_config_with, decode_frame,
    decode_from_reader, encode, encode_frame, probe,
};

#[test]
fn decode_config_512() {
    if !libavif_available() {
        return;
    }
    let data = still_avif(512, 512);
    assert!(probe(&data));

    let info = decode_config(&data).unwrap();
    assert_eq!((info.width, info.height), (512, 512));
    assert_eq!(info.frame_count, 1);
    assert!(!info.is_animated());
    assert!(!info.has_alpha);
}

#[test]
fn decode_config_matches_decode() {
    if !libavif_available() {
        return;
    }
    let data = still_avif(67, 33);
    let info = decode_config(&data).unwrap();
    let image = decode(&data).unwrap();
    assert_eq!(image.width(), info.width as usize);
    assert_eq!(image.height(), info.height as usize);
    assert_eq!(image.bit_depth(), 8);
    assert!(!image.has_alpha());
}

#[test]
fn decode_encode_decode_keeps_dimensions() {
    if !libavif_available() {
        return;
    }
    let first = decode(&still_avif(40, 24)).unwrap();
    let reencoded = encode(&first, &fast()).unwrap();
    let second = decode(&reencoded).unwrap();
    assert_eq!((second.width(), second.height()), (40, 24));
}

#[test]
fn alpha_survives_roundtrip() {
    if !libavif_available() {
        return;
    }
    let data = encode(&gradient_rgba(16, 16), &fast()).unwrap();
    assert!(decode_config(&data).unwrap().has_alpha);
    let DecodedImage::Rgba8(img) = decode(&data).unwrap() else {
        panic!("expected Rgba8");
    };
    // alpha was a flat 200; allow for lossy coding
    assert!(img.pixels().all(|p| p.a.abs_diff(200) <= 8));
}

#[test]
fn frame_keeps_requested_subsampling() {
    if !libavif_available() {
        return;
    }
    for cs in [
        ChromaSampling::Cs444,
        ChromaSampling::Cs422,
        ChromaSampling::Cs420,
    ] {
        let config = fast().subsampling(cs);
        let data = encode(&gradient_rgb(9, 7, 0), &config).unwrap();
        let frame = decode_frame(&data).unwrap();
        assert_eq!(frame.chroma_sampling(), cs);
        assert_eq!((frame.width(), frame.height()), (9, 7));

        let Planes::Eight(planes) = frame.planes() else {
            panic!("expected 8-bit planes");
        };
        let (cw, ch) = cs.chroma_dimensions(9, 7).unwrap();
        let u = planes.u.as_ref().unwrap();
        assert_eq!((u.width(), u.height()), (cw, ch));

        // planar re-encode at the same subsampling copies planes directly
        let again = encode_frame(&frame, &config).unwrap();
        assert_eq!(decode_frame(&again).unwrap().chroma_sampling(), cs);
    }
}

#[test]
fn gray_encodes_monochrome() {
    if !libavif_available() {
        return;
    }
    let gray = DecodedImage::Gray8(imgref::ImgVec::new((0..64).map(|v| v * 4).collect(), 8, 8));
    let data = encode(&gray, &fast()).unwrap();
    let info = decode_config(&data).unwrap();
    assert!(info.monochrome);
    assert!(decode(&data).unwrap().is_grayscale());
}

#[test]
fn ten_bit_output() {
    if !libavif_available() {
        return;
    }
    let config = fast().bit_depth(EncodeBitDepth::Ten);
    let data = encode(&gradient_rgb(12, 12, 50), &config).unwrap();
    assert_eq!(decode_config(&data).unwrap().bit_depth, 10);
    let image = decode(&data).unwrap();
    assert_eq!(image.bit_depth(), 16);
    assert!(matches!(image, DecodedImage::Rgb16(_)));
}

#[test]
fn corrupt_stream_is_decode_failure() {
    if !libavif_available() {
        return;
    }
    let mut data = still_avif(32, 32);
    data.truncate(data.len() / 3);
    let err = decode(&data).unwrap_err().into_inner();
    assert!(
        matches!(&err, Error::NativeDecodeFailed { .. }),
        "{err:?}"
    );

    let garbage = b"\x00\x00\x00\x18ftypavif\x00\x00\x00\x00not really an avif file";
    let err = decode_config(garbage).unwrap_err().into_inner();
    assert!(matches!(&err, Error::NativeDecodeFailed { .. }));
}

#[test]
fn size_limit_is_enforced() {
    if !libavif_available() {
        return;
    }
    let data = still_avif(64, 64);
    let config = DecoderConfig::new().image_size_limit(16 * 16);
    let err = decode_config_with(&data, &config).unwrap_err().into_inner();
    assert!(matches!(&err, Error::NativeDecodeFailed { .. }));
}

#[test]
fn reader_adapters() {
    if !libavif_available() {
        return;
    }
    let data = still_avif(20, 10);
    let info = decode_config_from_reader(&data[..]).unwrap();
    assert_eq!((info.width, info.height), (20, 10));
    let image = decode_from_reader(std::io::Cursor::new(&data)).unwrap();
    assert_eq!(image.width(), 20);
}

#[test]
fn high_quality_is_close() {
    if !libavif_available() {
        return;
    }
    let source = gradient_rgb(32, 32, 100);
    let config = EncoderConfig::new()
        .quality(100)
        .speed(10)
        .subsampling(ChromaSampling::Cs444);
    let decoded = decode(&encode(&source, &config).unwrap()).unwrap();
    let (DecodedImage::Rgb8(a), DecodedImage::Rgb8(b)) = (&source, &decoded) else {
        panic!("expected Rgb8");
    };
    let max_diff = a
        .pixels()
        .zip(b.pixels())
        .map(|(p, q)| p.r.abs_diff(q.r).max(p.g.abs_diff(q.g)).max(p.b.abs_diff(q.b)))
        .max()
        .unwrap();
    assert!(max_diff <= 6, "max channel difference {max_diff}");
}
