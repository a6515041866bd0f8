//! phenoscope-common — Shared types, errors, and the HTTP client used across all Phenoscope crates.

pub mod error;
pub mod entities;
pub mod sandbox;

// Re-export commonly used types
pub use entities::{TermId, TermRecord};
pub use error::{PhenoscopeError, Result};
pub use sandbox::SandboxClient;
