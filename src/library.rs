//! Runtime location and binding of the libavif shared library
//!
//! Nothing in this crate links against libavif. The first call that needs it
//! goes through [`ensure_loaded`], which opens the first loadable candidate
//! from [`CANDIDATES`], resolves every entry point into an immutable function
//! table and publishes it for the rest of the process.

use crate::error::{Error, Result};
use crate::ffi::*;
use libloading::Library;
use log::{debug, trace};
use std::ffi::{CStr, OsStr};
use std::sync::{Mutex, OnceLock, PoisonError};
use whereat::at;

/// File names and paths tried, in order, when locating libavif
#[cfg(all(unix, not(target_vendor = "apple")))]
pub const CANDIDATES: &[&str] = &["libavif.so.16", "libavif.so"];

/// File names and paths tried, in order, when locating libavif
#[cfg(target_vendor = "apple")]
pub const CANDIDATES: &[&str] = &[
    "libavif.16.dylib",
    "libavif.dylib",
    "/opt/homebrew/lib/libavif.dylib",
    "/usr/local/lib/libavif.dylib",
];

/// File names and paths tried, in order, when locating libavif
#[cfg(windows)]
pub const CANDIDATES: &[&str] = &["avif.dll", "libavif.dll", "libavif-16.dll"];

/// File names and paths tried, in order, when locating libavif
#[cfg(not(any(unix, windows)))]
pub const CANDIDATES: &[&str] = &[];

macro_rules! avif_api {
    ($($name:ident: $ty:ty,)*) => {
        /// Resolved libavif entry points
        #[derive(Clone, Copy)]
        #[allow(non_snake_case)]
        pub(crate) struct Api {
            $(pub(crate) $name: $ty,)*
        }

        impl Api {
            /// # Safety
            ///
            /// `lib` must be libavif 1.x so that every symbol has the
            /// declared signature.
            unsafe fn resolve(lib: &Library) -> Result<Self> {
                Ok(Self {
                    // SAFETY: forwarded from the caller
                    $($name: unsafe { symbol::<$ty>(lib, stringify!($name))? },)*
                })
            }
        }
    };
}

avif_api! {
    avifVersion: AvifVersionFn,
    avifResultToString: AvifResultToStringFn,
    avifDecoderCreate: AvifDecoderCreateFn,
    avifDecoderDestroy: AvifDecoderDestroyFn,
    avifDecoderSetIOMemory: AvifDecoderSetIOMemoryFn,
    avifDecoderParse: AvifDecoderParseFn,
    avifDecoderNextImage: AvifDecoderNextImageFn,
    avifDecoderNthImageTiming: AvifDecoderNthImageTimingFn,
    avifImageCreate: AvifImageCreateFn,
    avifImageDestroy: AvifImageDestroyFn,
    avifImageAllocatePlanes: AvifImageAllocatePlanesFn,
    avifRGBImageSetDefaults: AvifRGBImageSetDefaultsFn,
    avifImageRGBToYUV: AvifImageRGBToYUVFn,
    avifImageYUVToRGB: AvifImageYUVToRGBFn,
    avifEncoderCreate: AvifEncoderCreateFn,
    avifEncoderDestroy: AvifEncoderDestroyFn,
    avifEncoderAddImage: AvifEncoderAddImageFn,
    avifEncoderFinish: AvifEncoderFinishFn,
    avifRWDataFree: AvifRWDataFreeFn,
}

/// Look up one symbol and copy the function pointer out of it
///
/// # Safety
///
/// `T` must be the function pointer type the symbol actually has.
unsafe fn symbol<T: Copy>(lib: &Library, name: &'static str) -> Result<T> {
    // SAFETY: forwarded from the caller
    match unsafe { lib.get::<T>(name.as_bytes()) } {
        Ok(sym) => Ok(*sym),
        Err(e) => {
            trace!("symbol {name} not resolved: {e}");
            Err(at(Error::SymbolMissing(name)))
        }
    }
}

/// An opened libavif with its resolved function table
///
/// Obtain the process-wide instance through [`ensure_loaded`]. The table is
/// immutable once built and the type is `Send + Sync`, so the shared instance
/// can be used from any number of threads at once.
pub struct AvifLibrary {
    api: Api,
    version: String,
    // Declared last: the function pointers above are only valid while the
    // library stays mapped.
    _lib: Library,
}

impl std::fmt::Debug for AvifLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvifLibrary")
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl AvifLibrary {
    /// Open libavif from an explicit file name or path
    ///
    /// This bypasses the process-wide cache; the returned instance unloads
    /// the library when dropped. Fails with [`Error::LibraryNotFound`] if the
    /// file cannot be opened, [`Error::SymbolMissing`] if it is not libavif
    /// and [`Error::UnsupportedVersion`] if it is a pre-1.0 release.
    pub fn open_at(path: impl AsRef<OsStr>) -> Result<Self> {
        let path = path.as_ref();
        // SAFETY: loading libavif runs no initialisation routines with
        // preconditions; foreign libraries are rejected by symbol resolution.
        let lib = unsafe { Library::new(path) }.map_err(|e| {
            trace!("could not open {}: {e}", path.to_string_lossy());
            at(Error::LibraryNotFound(path.to_string_lossy().into_owned()))
        })?;
        Self::bind(lib)
    }

    /// Try every entry of [`CANDIDATES`] and bind the first one that opens
    fn open_default() -> Result<Self> {
        for name in CANDIDATES {
            // SAFETY: as in `open_at`
            match unsafe { Library::new(name) } {
                Ok(lib) => {
                    debug!("opened {name}");
                    return Self::bind(lib);
                }
                Err(e) => trace!("could not open {name}: {e}"),
            }
        }
        Err(at(Error::LibraryNotFound(CANDIDATES.join(", "))))
    }

    fn bind(lib: Library) -> Result<Self> {
        // SAFETY: the names are libavif's exported API; a library exporting
        // all of them with other signatures is not something we can detect.
        let api = unsafe { Api::resolve(&lib)? };

        // SAFETY: avifVersion returns a static NUL-terminated string
        let version = unsafe {
            let ptr = (api.avifVersion)();
            if ptr.is_null() {
                return Err(at(Error::UnsupportedVersion(String::from("<null>"))));
            }
            CStr::from_ptr(ptr).to_string_lossy().into_owned()
        };

        let major = version
            .split('.')
            .next()
            .and_then(|m| m.trim().parse::<u32>().ok());
        if major != Some(1) {
            // `lib` is dropped here, closing it again
            return Err(at(Error::UnsupportedVersion(version)));
        }

        debug!("bound libavif {version}");
        Ok(Self {
            api,
            version,
            _lib: lib,
        })
    }

    /// Version string reported by `avifVersion()`, e.g. `"1.1.1"`
    pub fn version(&self) -> &str {
        &self.version
    }

    pub(crate) fn api(&self) -> &Api {
        &self.api
    }

    /// Human-readable description of an `avifResult` code
    pub(crate) fn result_to_string(&self, code: avifResult) -> String {
        // SAFETY: avifResultToString returns a static string for any code
        unsafe {
            let ptr = (self.api.avifResultToString)(code);
            if ptr.is_null() {
                return format!("avifResult {code}");
            }
            CStr::from_ptr(ptr).to_string_lossy().into_owned()
        }
    }
}

static LIBRARY: OnceLock<AvifLibrary> = OnceLock::new();
static LOAD_ATTEMPT: Mutex<()> = Mutex::new(());

/// Get the process-wide libavif, loading it on first use
///
/// Once a load succeeds every later call returns the same instance without
/// touching the file system. A failed load is not remembered: the next call
/// tries again, so installing libavif mid-session is picked up. Concurrent
/// first calls are serialized, so the library is opened at most once and no
/// caller sees a partially bound instance.
pub fn ensure_loaded() -> Result<&'static AvifLibrary> {
    if let Some(lib) = LIBRARY.get() {
        return Ok(lib);
    }

    let _attempt = LOAD_ATTEMPT.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(lib) = LIBRARY.get() {
        return Ok(lib);
    }

    let lib = AvifLibrary::open_default()?;
    Ok(LIBRARY.get_or_init(|| lib))
}
