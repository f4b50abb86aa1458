//! # Web API Request Handlers
//!
//! Handlers grouped by endpoint family. All of them are read-only against
//! the job store except [`stitch`], which triggers the fan-in.

pub mod health;
pub mod jobs;
pub mod stitch;
