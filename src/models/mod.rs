//! Core data models for rating reconstruction.

mod annotated;
mod ids;
mod match_record;
mod season;

pub use annotated::*;
pub use ids::*;
pub use match_record::*;
pub use season::*;
