//! Core type definitions

mod camera;
mod edge;
mod grade;
mod pose;

pub use camera::*;
pub use edge::*;
pub use grade::*;
pub use pose::*;
