//! Periodic refresh of a coordinator.
//!
//! The driver runs one initial sync, then polls the coordinator at a fixed
//! interval until it is shut down. Runs that find nothing marked changed
//! are cheap, so polling is the whole scheduling story.

use crate::application::config::ConfigError;
use crate::application::coordinator::Coordinator;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

/// Error returned when the driver task does not stop cleanly.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// The driver task panicked
    #[error("refresh driver task panicked")]
    Panicked,
    /// The driver task was cancelled before it could stop
    #[error("refresh driver task was cancelled")]
    Cancelled,
}

impl From<tokio::task::JoinError> for ShutdownError {
    fn from(e: tokio::task::JoinError) -> Self {
        if e.is_panic() {
            ShutdownError::Panicked
        } else {
            ShutdownError::Cancelled
        }
    }
}

/// Schedules coordinator runs on a tokio runtime.
#[derive(Debug, Clone)]
pub struct RefreshDriver {
    coordinator: Arc<Coordinator>,
    interval: Duration,
}

impl RefreshDriver {
    /// Create a driver polling at the coordinator's configured interval.
    pub fn new(coordinator: Arc<Coordinator>) -> Self {
        let interval = coordinator.refresh_interval();
        Self {
            coordinator,
            interval,
        }
    }

    /// Override the polling interval.
    ///
    /// # Errors
    /// Returns `ConfigError::ZeroRefreshInterval` if `interval` is zero.
    pub fn with_interval(mut self, interval: Duration) -> Result<Self, ConfigError> {
        if interval.is_zero() {
            return Err(ConfigError::ZeroRefreshInterval);
        }
        self.interval = interval;
        Ok(self)
    }

    /// The polling interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawn the driver onto the current tokio runtime.
    ///
    /// The task performs the initial sync right away, which opens the
    /// coordinator's ready gate.
    pub fn start(self) -> DriverHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let Self {
            coordinator,
            interval: period,
        } = self;

        let task = tokio::spawn(async move {
            coordinator.run(true);

            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; the initial run covered it.
            ticker.tick().await;

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => break,
                    _ = ticker.tick() => {
                        coordinator.run(false);
                    }
                }
            }
            debug!("refresh driver stopped");
        });

        DriverHandle { shutdown_tx, task }
    }
}

/// Handle to a running [`RefreshDriver`].
///
/// Dropping the handle stops the driver at its next wake-up.
#[derive(Debug)]
pub struct DriverHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl DriverHandle {
    /// Whether the driver task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the driver and wait for its task to exit.
    ///
    /// A run already in progress completes first.
    ///
    /// # Errors
    /// Returns [`ShutdownError`] if the task panicked or was cancelled.
    pub async fn shutdown(self) -> Result<(), ShutdownError> {
        let _ = self.shutdown_tx.send(true);
        self.task.await?;
        Ok(())
    }

    /// Abort the driver without waiting for it.
    pub fn abort(&self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::config::SyncConfig;
    use crate::domain::call_model::{CallModel, CallModels};
    use crate::domain::event::EventKind;
    use crate::infrastructure::mocks::{MockClock, RecordingHandler};
    use std::time::Instant;
    use tracing::Span;

    fn coordinator(handler: &RecordingHandler) -> Arc<Coordinator> {
        let config = SyncConfig {
            refresh_interval: Duration::from_millis(10),
            ..SyncConfig::default()
        };
        Arc::new(Coordinator::new(
            &config,
            Arc::new(MockClock::new(Instant::now())),
            vec![Arc::new(handler.clone())],
            Span::none(),
        ))
    }

    fn facts(application: &str, service: &str) -> CallModels {
        [(
            application.to_string(),
            CallModel::new(application).with_consumes([service]),
        )]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_zero_interval_rejected() {
        let handler = RecordingHandler::new();
        let result = RefreshDriver::new(coordinator(&handler)).with_interval(Duration::ZERO);
        assert!(matches!(result, Err(ConfigError::ZeroRefreshInterval)));
    }

    #[test]
    fn test_interval_defaults_to_coordinator() {
        let handler = RecordingHandler::new();
        let driver = RefreshDriver::new(coordinator(&handler));
        assert_eq!(driver.interval(), Duration::from_millis(10));
    }

    #[tokio::test]
    async fn test_initial_sync_opens_gate() {
        let handler = RecordingHandler::new();
        let c = coordinator(&handler);
        c.update_source("svcA", facts("app1", "svcA"));

        let handle = RefreshDriver::new(Arc::clone(&c)).start();
        tokio::time::timeout(Duration::from_secs(1), c.ready().wait())
            .await
            .expect("initial sync completes");

        assert_eq!(handler.kinds(), vec![EventKind::Added]);
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_picks_up_later_changes() {
        let handler = RecordingHandler::new();
        let c = coordinator(&handler);
        let handle = RefreshDriver::new(Arc::clone(&c)).start();
        c.ready().wait().await;

        c.update_source("svcB", facts("app2", "svcB"));

        tokio::time::timeout(Duration::from_secs(1), async {
            while handler.count() == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("change dispatched");

        handle.shutdown().await.unwrap();
        assert_eq!(c.pending_changes(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_stops_task() {
        let handler = RecordingHandler::new();
        let handle = RefreshDriver::new(coordinator(&handler)).start();

        assert!(handle.shutdown().await.is_ok());
    }

    #[tokio::test]
    async fn test_aborted_task_reports_cancelled() {
        let handler = RecordingHandler::new();
        let handle = RefreshDriver::new(coordinator(&handler)).start();
        handle.abort();

        let result = handle.shutdown().await;
        // The task may already have observed nothing and been cancelled.
        assert!(matches!(result, Err(ShutdownError::Cancelled) | Ok(())));
    }
}
