#![no_main]

use libfuzzer_sys::fuzz_target;
use zenavif_dyn::{DecoderConfig, Unstoppable, decode_animation_with};

fuzz_target!(|data: &[u8]| {
    let config = DecoderConfig::new()
        .image_size_limit(1024 * 1024)
        .image_count_limit(32);
    if let Ok(anim) = decode_animation_with(data, &config, &Unstoppable) {
        assert_eq!(anim.frames().len(), anim.durations().len());
        for frame in anim.frames() {
            let _ = frame.to_image();
        }
    }
});
