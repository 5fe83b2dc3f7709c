//! Integration tests module
//!
//! End-to-end tests of the verification stream:
//! - Batch source -> pipeline -> sink
//! - Concurrency and result accounting
//! - Error handling and cancellation

pub mod error_scenarios;
pub mod fixtures;
pub mod pipeline_test;
