//! Logging facade for evlog.
//!
//! # Setup
//!
//! To enable logging, invoke the [`init`] function with a [`LogConfig`]. The configuration
//! implements `serde` traits, so it can be obtained from configuration files.
//!
//! ```ignore
//! use evlog_log::LogConfig;
//!
//! let log_config = LogConfig {
//!     format: evlog_log::LogFormat::Json,
//!     ..LogConfig::default()
//! };
//!
//! evlog_log::init(&log_config);
//! ```
//!
//! # Logging
//!
//! The basic use of the log crate is through the five logging macros: [`error!`], [`warn!`],
//! [`info!`], [`debug!`] and [`trace!`] where `error!` represents the highest-priority log messages
//! and `trace!` the lowest.
//!
//! ## Conventions
//!
//! Log messages should start lowercase and end without punctuation. Prefer short and precise log
//! messages over verbose text. Choose the log level according to these rules:
//!
//! - [`error!`] for bugs and invalid behavior.
//! - [`warn!`] for undesirable behavior, such as dropped events.
//! - [`info!`] for messages relevant to the average user.
//! - [`debug!`] for messages usually relevant to debugging.
//! - [`trace!`] for full auxiliary information.
//!
//! Structured fields are preferred over interpolation:
//!
//! ```
//! evlog_log::debug!(batch_size = 25, "flushing batch");
//! ```
//!
//! ## Logging Error Types
//!
//! To log errors with their full chain of causes, use the [`LogError`] wrapper:
//!
//! ```
//! use evlog_log::LogError;
//!
//! let custom_error = std::io::Error::other("oh no!");
//! evlog_log::error!("operation failed: {}", LogError(&custom_error));
//! ```
//!
//! # Testing
//!
//! For unit testing, there is a separate initialization macro [`init_test!`] that should be called
//! at the beginning of test method. It enables test mode of the logger and customizes log levels
//! for the current crate.
//!
//! ```ignore
//! #[test]
//! fn test_something() {
//!     evlog_log::init_test!();
//! }
//! ```

#![warn(missing_docs)]

mod config;
pub use config::*;

#[cfg(feature = "init")]
mod setup;
#[cfg(feature = "init")]
pub use setup::*;

#[cfg(feature = "test")]
mod test;
#[cfg(feature = "test")]
pub use test::*;

mod utils;
pub use utils::*;

// Expose the minimal log facade.
#[doc(inline)]
pub use tracing::{debug, error, info, trace, warn};
