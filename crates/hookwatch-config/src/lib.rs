//! # Hookwatch Configuration
//!
//! Configuration for the hook execution log pipeline: where logs live, how
//! many events are kept per session, how large the post-error capture window
//! is, and how long error context records are retained.
//!
//! Values are resolved in three layers, later layers winning:
//!
//! 1. Built-in defaults ([`ObserveConfig::default`])
//! 2. An optional TOML file
//! 3. `HOOKWATCH_*` environment variables
//!
//! ```rust,no_run
//! use hookwatch_config::ObserveConfig;
//!
//! # async fn example() -> Result<(), hookwatch_config::ConfigError> {
//! let config = ObserveConfig::load(None).await?;
//! println!("logging to {}", config.log_dir.display());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod observe;

pub use error::{ConfigError, ConfigResult};
pub use observe::*;
