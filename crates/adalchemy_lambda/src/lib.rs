//! AWS-oriented adapters and handlers for the marketing research pipeline.
//!
//! Handlers are plain functions over adapter traits so they run without AWS
//! in tests. Concrete adapters (SQS, SES, Step Functions, MongoDB, HTTP) and
//! the Lambda entry points in `src/bin` wire them to real services.

pub mod adapters;
pub mod handlers;
pub mod observability;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
