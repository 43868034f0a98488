use std::collections::HashSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::{self, DICOM_EXTENSIONS, MAX_BATCH_ITEMS};

use super::convert::SourceItem;
use super::error::InputError;
use super::workspace::StagedUpload;

/// Resolve a heterogeneous upload (loose files and/or one archive) into a
/// flat list of conversion inputs.
///
/// Loose files with disallowed extensions are silently excluded rather
/// than failing the request. An archive is unpacked into `extract_dir`
/// and its tree walked recursively for matching files. The request fails
/// only when nothing was uploaded at all, the archive cannot be read, or
/// nothing survives the extension filter.
pub fn resolve_inputs(
    uploads: &[StagedUpload],
    extract_dir: &Path,
) -> Result<Vec<SourceItem>, InputError> {
    if uploads.is_empty() {
        return Err(InputError::NoFiles);
    }

    let (archives, loose): (Vec<_>, Vec<_>) = uploads
        .iter()
        .partition(|u| config::is_archive_name(&u.original_name));

    if archives.len() > 1 {
        return Err(InputError::MultipleArchives(archives.len()));
    }

    let mut candidates: Vec<(PathBuf, String)> = Vec::new();

    for upload in loose {
        if config::has_allowed_extension(&upload.original_name, &DICOM_EXTENSIONS) {
            candidates.push((upload.path.clone(), upload.original_name.clone()));
        } else {
            tracing::debug!(name = %upload.original_name, "skipping upload with disallowed extension");
        }
    }

    if let Some(archive) = archives.first() {
        extract_archive(&archive.path, extract_dir)?;
        candidates.extend(collect_extracted(extract_dir)?);
    }

    if candidates.is_empty() {
        return Err(InputError::NoValidInputs);
    }
    if candidates.len() > MAX_BATCH_ITEMS {
        return Err(InputError::BatchTooLarge {
            count: candidates.len(),
            max: MAX_BATCH_ITEMS,
        });
    }

    Ok(assign_output_names(candidates))
}

/// Unpack a gzipped tar upload into an isolated directory.
/// `tar` refuses entries that would escape the destination, so a hostile
/// archive cannot write outside `extract_dir`.
fn extract_archive(path: &Path, extract_dir: &Path) -> Result<(), InputError> {
    let file = std::fs::File::open(path)
        .map_err(|e| InputError::InvalidArchive(e.to_string()))?;
    let gz = flate2::read::GzDecoder::new(file);
    let mut archive = tar::Archive::new(gz);
    archive
        .unpack(extract_dir)
        .map_err(|e| InputError::InvalidArchive(e.to_string()))?;
    Ok(())
}

/// Walk the extracted tree, collecting every file that matches the DICOM
/// extension set, nested directories included. Sorted by file name so the
/// resolved list is deterministic regardless of filesystem order.
fn collect_extracted(extract_dir: &Path) -> Result<Vec<(PathBuf, String)>, InputError> {
    let mut found = Vec::new();
    for entry in WalkDir::new(extract_dir).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if config::has_allowed_extension(&name, &DICOM_EXTENSIONS) {
            found.push((entry.into_path(), name));
        }
    }
    Ok(found)
}

/// Derive a unique `.png` output name per source. Output identity is
/// deterministic for a given candidate list: duplicate stems (possible
/// when an archive nests same-named files) get a `_{n}` suffix in list
/// order.
fn assign_output_names(candidates: Vec<(PathBuf, String)>) -> Vec<SourceItem> {
    let mut used: HashSet<String> = HashSet::new();
    candidates
        .into_iter()
        .map(|(path, source_name)| {
            let stem = source_name
                .rsplit_once('.')
                .map(|(s, _)| s)
                .unwrap_or(&source_name);
            let mut output_name = format!("{stem}.png");
            let mut n = 1;
            while !used.insert(output_name.clone()) {
                output_name = format!("{stem}_{n}.png");
                n += 1;
            }
            SourceItem {
                path,
                source_name,
                output_name,
            }
        })
        .collect()
}
