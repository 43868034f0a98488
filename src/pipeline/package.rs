use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;

use super::error::PackagingError;
use super::store::{ArchiveHandle, OutputStore};

/// Bundle the named converted outputs into one gzipped tar in the output
/// store, under a freshly generated collision-free handle.
///
/// Every named file must exist in `output_dir`: a missing one means the
/// batch result and the directory disagree, and the whole packaging step
/// fails rather than delivering a silently truncated archive.
pub fn package(
    output_dir: &Path,
    output_names: &[String],
    store: &OutputStore,
) -> Result<ArchiveHandle, PackagingError> {
    if output_names.is_empty() {
        return Err(PackagingError::NothingToPackage);
    }
    for name in output_names {
        if !output_dir.join(name).is_file() {
            return Err(PackagingError::MissingOutput(name.clone()));
        }
    }

    let handle = ArchiveHandle::generate();
    let archive_path = store.path_for(&handle);

    let file = std::fs::File::create(&archive_path)?;
    let gz = GzEncoder::new(file, Compression::default());
    let mut tar = tar::Builder::new(gz);

    for name in output_names {
        tar.append_path_with_name(output_dir.join(name), name)?;
    }

    tar.into_inner()?.finish()?;

    tracing::info!(
        handle = %handle,
        entries = output_names.len(),
        "archive packaged"
    );

    Ok(handle)
}
