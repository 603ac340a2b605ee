//! Error types for zenavif-dyn

use enough::StopReason;

/// Error type for zenavif-dyn operations
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// No candidate shared object could be opened
    #[error("libavif not found (tried: {0})")]
    LibraryNotFound(String),

    /// The library opened but lacks a required entry point
    #[error("libavif is missing symbol `{0}`")]
    SymbolMissing(&'static str),

    /// The library reports a release this binding does not understand
    #[error("unsupported libavif version {0} (need 1.x)")]
    UnsupportedVersion(String),

    /// Caller error caught before anything crossed into libavif
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    /// libavif reported a failure while decoding
    #[error("AVIF decode error {code}: {msg}")]
    NativeDecodeFailed {
        /// `avifResult` code
        code: i32,
        /// libavif's description of the code
        msg: String,
    },

    /// libavif reported a failure while encoding
    #[error("AVIF encode error {code}: {msg}")]
    NativeEncodeFailed {
        /// `avifResult` code
        code: i32,
        /// libavif's description of the code
        msg: String,
    },

    /// libavif produced data this crate cannot represent
    #[error("Unsupported: {0}")]
    Unsupported(&'static str),

    /// A libavif constructor returned null
    #[error("Out of memory")]
    OutOfMemory,

    /// Operation was cancelled via Stop trait
    #[error("Operation cancelled: {0:?}")]
    Cancelled(StopReason),

    /// Reading the input failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StopReason> for Error {
    fn from(reason: StopReason) -> Self {
        Error::Cancelled(reason)
    }
}

impl Error {
    /// Returns true for failures of the library locator
    ///
    /// These persist until libavif becomes loadable; retrying the same
    /// operation without changing the environment will fail the same way.
    pub fn is_load_failure(&self) -> bool {
        matches!(
            self,
            Error::LibraryNotFound(_) | Error::SymbolMissing(_) | Error::UnsupportedVersion(_)
        )
    }
}

/// Result type for zenavif-dyn operations with location tracking
pub type Result<T, E = whereat::At<Error>> = core::result::Result<T, E>;
