//! Deterministic, pure logic shared by the session engine.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod anchor;
pub mod intent;
pub mod scoring;
pub mod types;
pub mod window;
