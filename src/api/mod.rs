//! HTTP surface: router, multipart upload handlers, and structured error
//! responses.

pub mod error;
pub mod routes;

pub use error::ApiError;
pub use routes::{router, AppState};
