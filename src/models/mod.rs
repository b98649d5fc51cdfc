//! Data models for the versions backend.
//!
//! These models match the frontend TypeScript interfaces exactly for seamless interoperability.

mod version;

pub use version::*;
