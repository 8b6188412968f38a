//! Tests for the executor
//!
//! Organized by feature area

mod helpers;

mod await_tests;
mod call_tests;
mod operator_tests;
