//! Mock implementations for testing.
//!
//! This module provides test doubles for the application ports,
//! enabling controlled testing of the pipeline.

pub mod clock;
pub mod handler;

pub use clock::MockClock;
pub use handler::RecordingHandler;
