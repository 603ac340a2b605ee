#![no_main]

use libfuzzer_sys::fuzz_target;
use zenavif_dyn::{DecoderConfig, Unstoppable, decode_config, decode_with};

fuzz_target!(|data: &[u8]| {
    // Keep allocations bounded so the fuzzer explores parsing, not memory limits
    let config = DecoderConfig::new()
        .image_size_limit(4096 * 4096)
        .image_dimension_limit(8192)
        .image_count_limit(16);
    let _ = decode_config(data);
    let _ = decode_with(data, &config, &Unstoppable);
});
