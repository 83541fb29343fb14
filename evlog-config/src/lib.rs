//! Configuration for evlog.
//!
//! The configuration is loaded from a single YAML or JSON file with [`Config::from_path`]. All
//! sections are optional:
//!
//! ```yaml
//! logging:
//!   level: debug
//! sampling:
//!   rates:
//!     info: 10
//!   keep:
//!     - status: 400
//! drain:
//!   batch:
//!     size: 50
//! routes:
//!   exclude: ["/health"]
//!   services:
//!     /api/auth/**:
//!       service: auth-service
//! ```
//!
//! Selected values can be overridden from the environment with [`OverridableConfig::from_env`]
//! and [`Config::apply_override`].
#![warn(missing_docs)]

mod config;
mod error;

pub use self::config::*;
pub use self::error::*;
