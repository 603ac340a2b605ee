//! Decoder configuration

/// Configuration for AVIF decoding
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Worker threads libavif may use per decode (at least 1)
    pub(crate) threads: u32,
    /// Maximum width × height of any frame, `None` keeps libavif's default
    pub(crate) image_size_limit: Option<u32>,
    /// Maximum width or height of any frame, `None` keeps libavif's default
    pub(crate) image_dimension_limit: Option<u32>,
    /// Maximum number of frames in a sequence, `None` keeps libavif's default
    pub(crate) image_count_limit: Option<u32>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            threads: 1,
            image_size_limit: None,
            image_dimension_limit: None,
            image_count_limit: None,
        }
    }
}

impl DecoderConfig {
    /// Create a new decoder configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of threads for decoding
    ///
    /// 0 is treated as 1.
    pub fn threads(mut self, threads: u32) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Set maximum frame size limit in total pixels
    ///
    /// If width * height exceeds this limit, decoding will fail.
    pub fn image_size_limit(mut self, limit: u32) -> Self {
        self.image_size_limit = Some(limit);
        self
    }

    /// Reject frames wider or taller than `limit`
    pub fn image_dimension_limit(mut self, limit: u32) -> Self {
        self.image_dimension_limit = Some(limit);
        self
    }

    /// Reject sequences with more than `limit` frames
    pub fn image_count_limit(mut self, limit: u32) -> Self {
        self.image_count_limit = Some(limit);
        self
    }
}
