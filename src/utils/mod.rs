//! Utility functions for numeric casts and frame pre-adjustment.

pub mod image_adjust;
pub mod safe_cast;
