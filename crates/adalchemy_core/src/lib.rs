//! Shared marketing research pipeline primitives.
//!
//! This crate owns the message and document contracts, environment
//! configuration, agent output sanitizing and the error taxonomy. It
//! excludes AWS SDK, MongoDB and Lambda runtime concerns, which live in
//! `adalchemy_lambda`.

pub mod config;
pub mod contract;
pub mod error;
pub mod sanitize;
