//! Domain layer - pure types and transformations with no shared state.
//!
//! This layer contains the stages of the synchronization pipeline:
//! - Call models and their aggregation into a global view
//! - Typed diffs between two views
//! - Cool-down suppression of removals
//! - Sidecar config synthesis
//! - Fact computation from registry entries
//!
//! Everything here is a pure function of its inputs and easily testable.

pub mod call_model;
pub mod diff;
pub mod event;
pub mod facts;
pub mod sidecar;
pub mod suppression;
