//! Display helpers

pub mod format;
