//! Upload admission and reporting.
//!
//! - `UploadLimit` rejects oversized uploads up front and caps bytes read
//! - `UploadResult` records the outcome of each part of a batch upload

mod limit;
mod result;

pub use limit::{LimitExceeded, LimitedReader, UploadLimit};
pub use result::{UploadFailure, UploadResult};
