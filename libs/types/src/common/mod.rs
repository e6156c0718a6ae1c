//! Common numeric types shared across the workspace

pub mod errors;
pub mod fixed_point;
pub mod format;
