//! Pneumoscan: a chest X-ray screening service.
//!
//! Accepts DICOM series and X-ray photographs over HTTP, converts DICOM
//! pixel data into canonical-resolution PNGs (in parallel, with per-item
//! failure isolation), packages results into downloadable archives, and
//! runs a binary classifier over photographic X-rays.

pub mod api;
pub mod classify;
pub mod config;
pub mod pipeline;
