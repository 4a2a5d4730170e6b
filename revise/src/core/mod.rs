//! Deterministic, pure logic for session history and prompts.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod history;
pub mod label;
pub mod prompt;
pub mod types;
