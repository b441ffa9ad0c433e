// Public modules
pub mod backup;
pub mod error;
pub mod refactor;
pub mod report;
pub mod rules;
pub mod runner;
pub mod verify;
pub mod walker;

// Public modules for CLI access
pub mod defaults;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
