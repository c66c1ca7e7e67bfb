//! Application layer - orchestration of domain logic.
//!
//! This layer owns the state carried between pipeline runs and decides
//! when to run:
//! - Coordinator (merge, diff, suppress, synthesize, reconcile, dispatch)
//! - Reconciler (emitted cache and event classification)
//! - Refresh driver (periodic runs on a tokio runtime)
//!
//! ## Ports
//!
//! The application layer defines ports (traits) that infrastructure
//! adapters must implement. This keeps the application layer independent
//! from infrastructure details.

pub mod config;
pub mod coordinator;
pub mod driver;
pub mod metrics;
pub mod ports;
pub mod ready;
pub mod reconciler;
