use thiserror::Error;

/// Request-level failures while resolving an upload into conversion inputs.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("no files uploaded")]
    NoFiles,

    #[error("could not read archive: {0}")]
    InvalidArchive(String),

    #[error("at most one archive per request, got {0}")]
    MultipleArchives(usize),

    #[error("no valid DICOM inputs after filtering (accepted extensions: .dcm, .dicom)")]
    NoValidInputs,

    #[error("batch of {count} items exceeds the {max}-item limit")]
    BatchTooLarge { count: usize, max: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-item conversion failures. Always downgraded to a `Failed` outcome by
/// the converter; never aborts a batch.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("DICOM file contains no pixel data")]
    MissingPixelData,

    #[error("failed to parse DICOM file: {0}")]
    Decode(String),

    #[error("failed to decode pixel data: {0}")]
    Pixels(String),

    #[error("pixel matrix is empty ({rows}x{cols})")]
    EmptyPixelMatrix { rows: u32, cols: u32 },

    #[error("failed to write output raster: {0}")]
    WriteOutput(String),
}

/// Fatal-for-the-request failures while packaging converted outputs.
#[derive(Error, Debug)]
pub enum PackagingError {
    #[error("nothing to package")]
    NothingToPackage,

    #[error("converted output missing at packaging time: {0}")]
    MissingOutput(String),

    #[error("failed to write archive: {0}")]
    Io(#[from] std::io::Error),
}

/// Output store access failures.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("no archive exists for this handle")]
    NotFound,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
