//! Common functionality for evlog.
#![warn(missing_docs)]

mod glob;

pub use crate::glob::*;
