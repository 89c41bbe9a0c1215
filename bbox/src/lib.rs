//! Bounding box types for normalized and pixel coordinates.

mod common;

pub use hw::*;
pub mod hw;

pub use transform::*;
mod transform;

pub use xyxy::*;
pub mod xyxy;
