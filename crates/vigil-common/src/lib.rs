//! vigil-common — shared plumbing for the vigil pipeline.
//! - Error taxonomy (`error`)
//! - Capability-capped HTTP client (`sandbox`)
//! - Environment settings (`settings`)

pub mod error;
pub mod sandbox;
pub mod settings;

pub use error::{FetchError, Result, VigilError};
