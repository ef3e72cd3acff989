//! Rendering of diff results for humans and machines.

pub mod json;
pub mod report;
