//! Core business logic for bailiff.
//!
//! Services wrap the repositories of `bailiff-db` and own every rule about
//! attendance, hearings, absence reasons and notification delivery. The API
//! and scheduler crates only call into them.

pub mod services;

pub use services::*;
