//! The batch conversion pipeline: upload resolution, parallel DICOM to PNG
//! conversion, failure aggregation, and archive packaging.

pub mod batch;
pub mod convert;
pub mod decode;
pub mod error;
pub mod normalize;
pub mod package;
pub mod resolve;
pub mod store;
pub mod workspace;

pub use batch::{convert_batch, BatchDecision, BatchResult, FailureDetail};
pub use convert::{ConversionOutcome, SourceItem};
pub use error::{ConvertError, InputError, PackagingError, StoreError};
pub use package::package;
pub use resolve::resolve_inputs;
pub use store::{ArchiveHandle, OutputStore};
pub use workspace::Workspace;
