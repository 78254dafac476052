//! Lending application library
//!
//! A small lending catalog with concurrent issue/return operations and a
//! background scanner reporting overdue loans.

pub mod modules;
pub mod utils;

/// Re-export commonly used types
pub use modules::lending::*;
