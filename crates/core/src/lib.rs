//! Foundational identifiers and nanosecond-precision timing shared by
//! every other crate in the workspace.

pub mod error;
pub mod timing;
pub mod types;

pub use error::{Error, Result};
pub use timing::{Clock, Timestamp, TimingEngine};
pub use types::*;
