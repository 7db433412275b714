//! Types shared between the devstart library and its binaries.

pub mod errors;

pub use errors::{DevstartError, DevstartResult, ResultExt};
