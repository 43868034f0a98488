use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Pneumoscan";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Side length of the canonical square resolution every converted raster
/// is resampled to, and the classifier's expected input size.
pub const CANONICAL_RESOLUTION: u32 = 512;

/// Accepted DICOM file extensions (matched case-insensitively).
pub const DICOM_EXTENSIONS: [&str; 2] = ["dcm", "dicom"];

/// Accepted photographic X-ray extensions for classification.
pub const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpeg", "jpg"];

/// The one accepted upload-archive suffix. Packaged outputs use it too.
pub const ARCHIVE_SUFFIX: &str = ".tar.gz";

/// Payload cap for a single upload request.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Request body limit: payload cap plus multipart overhead.
pub const BODY_LIMIT_BYTES: usize = MAX_UPLOAD_BYTES + 5 * 1024 * 1024;

/// Hard cap on the number of items one conversion batch may contain.
pub const MAX_BATCH_ITEMS: usize = 256;

/// Upper bound on conversion workers regardless of core count.
pub const MAX_WORKERS: usize = 8;

/// Worker pool size for batch conversion: CPU-derived, capped.
pub fn worker_pool_size() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(MAX_WORKERS)
}

/// Get the application data directory.
/// `PNEUMOSCAN_DATA` overrides the default `~/Pneumoscan/`.
pub fn app_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("PNEUMOSCAN_DATA") {
        return PathBuf::from(dir);
    }
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("Pneumoscan")
}

/// Get the output store directory (flat directory of completed archives).
pub fn archives_dir() -> PathBuf {
    app_data_dir().join("archives")
}

/// Check a filename against an extension allow-list, case-insensitively.
/// A name with no extension never matches.
pub fn has_allowed_extension(filename: &str, allowed: &[&str]) -> bool {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            let ext = ext.to_ascii_lowercase();
            allowed.iter().any(|a| *a == ext)
        }
        _ => false,
    }
}

/// Check for the accepted archive suffix, case-insensitively.
pub fn is_archive_name(filename: &str) -> bool {
    filename.len() > ARCHIVE_SUFFIX.len()
        && filename.to_ascii_lowercase().ends_with(ARCHIVE_SUFFIX)
}
