//! Common utilities and shared types for bailiff.
//!
//! This crate provides foundational components used across all bailiff crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID identifiers and manual attendance codes via [`IdGenerator`]
//! - **Clock**: Injectable time source via [`Clock`]
//!
//! # Example
//!
//! ```no_run
//! use bailiff_common::{AppResult, Config, IdGenerator};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id_gen = IdGenerator::new();
//!     println!("{} -> {}", config.server.url, id_gen.generate());
//!     Ok(())
//! }
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod id;

pub use clock::{Clock, FixedClock, SharedClock, SystemClock};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
