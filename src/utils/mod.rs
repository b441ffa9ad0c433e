//! Generic utility primitives with zero domain knowledge.
//!
//! - `command` - Command execution with timeouts
//! - `io` - File I/O with consistent error handling

pub mod command;
pub mod io;
