use std::path::{Path, PathBuf};

use uuid::Uuid;

/// An upload saved into a request workspace, keyed by its sanitized
/// original filename.
#[derive(Debug, Clone)]
pub struct StagedUpload {
    pub original_name: String,
    pub path: PathBuf,
}

/// Per-request temporary storage: a staging area (raw uploads plus the
/// archive extraction tree) and an output area for converted rasters.
///
/// Both directories are exclusively owned by one request and removed on
/// every exit path when the workspace is dropped, so no originals or
/// partially produced rasters outlive the request.
pub struct Workspace {
    staging: tempfile::TempDir,
    output: tempfile::TempDir,
}

impl Workspace {
    pub fn create() -> std::io::Result<Self> {
        let staging = tempfile::tempdir()?;
        let output = tempfile::tempdir()?;
        std::fs::create_dir_all(staging.path().join("extracted"))?;
        Ok(Self { staging, output })
    }

    /// Isolated directory an uploaded archive is unpacked into.
    pub fn extract_dir(&self) -> PathBuf {
        self.staging.path().join("extracted")
    }

    pub fn output_dir(&self) -> &Path {
        self.output.path()
    }

    /// Write one uploaded payload into the staging area.
    /// The on-disk name carries a UUID prefix so staged files never clash.
    pub fn stage(&self, original_name: &str, bytes: &[u8]) -> std::io::Result<StagedUpload> {
        let safe_name = sanitize_filename(original_name);
        let path = self
            .staging
            .path()
            .join(format!("{}_{}", Uuid::new_v4(), safe_name));
        std::fs::write(&path, bytes)?;

        tracing::debug!(name = %safe_name, size = bytes.len(), "upload staged");

        Ok(StagedUpload {
            original_name: safe_name,
            path,
        })
    }
}

/// Sanitize a filename: strip path components and limit length.
pub fn sanitize_filename(original: &str) -> String {
    let name = Path::new(original)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload");

    let clean: String = name
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | '\0'))
        .take(255)
        .collect();

    if clean.is_empty() {
        "upload".to_string()
    } else {
        clean
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staged_file_lands_in_staging_area() {
        let ws = Workspace::create().unwrap();
        let staged = ws.stage("scan.dcm", b"dicom bytes").unwrap();
        assert!(staged.path.exists());
        assert_eq!(staged.original_name, "scan.dcm");
        assert_eq!(std::fs::read(&staged.path).unwrap(), b"dicom bytes");
    }

    #[test]
    fn same_name_staged_twice_never_clashes() {
        let ws = Workspace::create().unwrap();
        let a = ws.stage("scan.dcm", b"first").unwrap();
        let b = ws.stage("scan.dcm", b"second").unwrap();
        assert_ne!(a.path, b.path);
        assert_eq!(std::fs::read(&a.path).unwrap(), b"first");
        assert_eq!(std::fs::read(&b.path).unwrap(), b"second");
    }

    #[test]
    fn drop_removes_both_areas() {
        let (staging, output) = {
            let ws = Workspace::create().unwrap();
            ws.stage("scan.dcm", b"bytes").unwrap();
            std::fs::write(ws.output_dir().join("scan.png"), b"png").unwrap();
            (ws.extract_dir(), ws.output_dir().to_path_buf())
        };
        assert!(!staging.exists());
        assert!(!output.exists());
    }

    #[test]
    fn sanitize_path_traversal() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("normal_scan.dcm"), "normal_scan.dcm");
        assert_eq!(sanitize_filename(""), "upload");
        assert_eq!(sanitize_filename("file\0name.dcm"), "filename.dcm");
    }
}
