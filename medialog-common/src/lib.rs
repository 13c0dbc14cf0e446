//! # Medialog Common Library
//!
//! Shared code for the medialog pipeline and its consumers:
//! - Fatal error taxonomy
//! - Output data model (`MediaEntry` and friends)
//! - Run statistics

pub mod error;
pub mod models;

pub use error::{Error, Result};
pub use models::{MediaEntry, MediaType, RunStatistics, Status, Tags};
