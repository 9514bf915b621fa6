//! vscreen-common — Shared types and errors used across all vscreen crates.

pub mod error;
pub mod score;

// Re-export commonly used types
pub use error::{Result, ScreeningError};
pub use score::Score;
