use std::path::{Path, PathBuf};

use serde::Serialize;

use super::decode::decode_pixels;
use super::error::ConvertError;
use super::normalize::normalize;

/// One resolved conversion input: where its bytes live, what the caller
/// called it, and the output raster name it maps to. Owned by the request
/// workspace and gone when the workspace is torn down.
#[derive(Debug, Clone)]
pub struct SourceItem {
    pub path: PathBuf,
    pub source_name: String,
    pub output_name: String,
}

/// Outcome of converting one source item. Immutable once produced.
///
/// A `Failed` outcome always carries the offending source's identity and a
/// human-readable reason, so callers never have to guess from string shape
/// whether they are looking at a filename or an error.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConversionOutcome {
    Converted { source: String, output: String },
    Failed { source: String, reason: String },
}

impl ConversionOutcome {
    pub fn is_converted(&self) -> bool {
        matches!(self, Self::Converted { .. })
    }

    pub fn source(&self) -> &str {
        match self {
            Self::Converted { source, .. } | Self::Failed { source, .. } => source,
        }
    }
}

/// Convert one DICOM source into a PNG in `output_dir`.
///
/// Decode, normalize, and write faults are all captured and downgraded to
/// a `Failed` outcome, so one bad item never aborts its batch.
pub fn convert_one(item: &SourceItem, output_dir: &Path) -> ConversionOutcome {
    match try_convert(item, output_dir) {
        Ok(output) => {
            tracing::debug!(source = %item.source_name, output = %output, "converted");
            ConversionOutcome::Converted {
                source: item.source_name.clone(),
                output,
            }
        }
        Err(e) => {
            tracing::warn!(source = %item.source_name, error = %e, "conversion failed");
            ConversionOutcome::Failed {
                source: item.source_name.clone(),
                reason: e.to_string(),
            }
        }
    }
}

fn try_convert(item: &SourceItem, output_dir: &Path) -> Result<String, ConvertError> {
    let matrix = decode_pixels(&item.path)?;
    let raster = normalize(&matrix);

    let output_path = output_dir.join(&item.output_name);
    raster
        .save(&output_path)
        .map_err(|e| ConvertError::WriteOutput(e.to_string()))?;

    Ok(item.output_name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CANONICAL_RESOLUTION;
    use crate::pipeline::testutil::write_test_dicom;

    fn item(dir: &Path, name: &str) -> SourceItem {
        let stem = name.rsplit_once('.').map(|(s, _)| s).unwrap_or(name);
        SourceItem {
            path: dir.join(name),
            source_name: name.to_string(),
            output_name: format!("{stem}.png"),
        }
    }

    #[test]
    fn well_formed_dicom_converts_to_canonical_png() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let pixels: Vec<u8> = (0..64).map(|i| i as u8).collect();
        write_test_dicom(&src.path().join("scan.dcm"), 8, 8, &pixels);

        let outcome = convert_one(&item(src.path(), "scan.dcm"), out.path());
        assert_eq!(
            outcome,
            ConversionOutcome::Converted {
                source: "scan.dcm".into(),
                output: "scan.png".into()
            }
        );

        let png = image::open(out.path().join("scan.png")).unwrap();
        assert_eq!(png.width(), CANONICAL_RESOLUTION);
        assert_eq!(png.height(), CANONICAL_RESOLUTION);
    }

    #[test]
    fn corrupt_dicom_becomes_failed_outcome() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        std::fs::write(src.path().join("bad.dcm"), b"nonsense").unwrap();

        let outcome = convert_one(&item(src.path(), "bad.dcm"), out.path());
        match outcome {
            ConversionOutcome::Failed { source, reason } => {
                assert_eq!(source, "bad.dcm");
                assert!(!reason.is_empty());
            }
            other => panic!("expected Failed, got {other:?}"),
        }
        // Failure leaves no output behind.
        assert!(!out.path().join("bad.png").exists());
    }

    #[test]
    fn unwritable_output_dir_becomes_failed_outcome() {
        let src = tempfile::tempdir().unwrap();
        let pixels = vec![1u8; 16];
        write_test_dicom(&src.path().join("scan.dcm"), 4, 4, &pixels);

        let outcome = convert_one(
            &item(src.path(), "scan.dcm"),
            Path::new("/nonexistent/output/dir"),
        );
        assert!(!outcome.is_converted());
    }
}
