//! Interval scheduler driving the reconciler
//!
//! The Scheduler is responsible for:
//! - Producing a tick every refresh interval (optionally one immediately)
//! - Running exactly one reconciliation cycle at a time
//! - Bounding every cycle with a timeout
//! - Containing cycle failures so later ticks still run
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  try_send   ┌───────────────┐  recv   ┌──────────────┐
//! │ interval     │────────────▶│ tick channel  │────────▶│ worker       │
//! │ (ticker)     │  (full:     │ (depth 1)     │         │ run_cycle()  │
//! └──────────────┘   dropped)  └───────────────┘         └──────────────┘
//! ```
//!
//! While a cycle runs, at most one tick waits in the channel; any further
//! tick is dropped and reported as [`SchedulerEvent::TickSkipped`]. Ticker
//! and worker are polled concurrently on the caller's task, so shutdown
//! cancels an in-flight cycle instead of waiting for it.

use crate::config::{DdnsConfig, MAX_REFRESH_INTERVAL_SECS, SchedulerConfig};
use crate::error::{Error, Result};
use crate::reconcile::{CycleReport, Reconciler};
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::IntervalStream;
use tracing::{debug, error, info, warn};

/// Events emitted by the Scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerEvent {
    /// Scheduler started
    Started {
        interval: Duration,
    },

    /// A cycle finished (individual mutations may still have failed)
    CycleCompleted {
        report: CycleReport,
    },

    /// A cycle was aborted
    CycleFailed {
        error: String,
    },

    /// A tick was dropped because a cycle was running and one was queued
    TickSkipped,

    /// Scheduler stopped
    Stopped {
        reason: String,
    },
}

/// Runs the reconciler on a fixed interval until shutdown
///
/// ## Lifecycle
///
/// 1. Create with [`Scheduler::new()`]
/// 2. Start with [`Scheduler::run()`] (Ctrl-C) or
///    [`Scheduler::run_with_shutdown()`]
/// 3. Consume [`SchedulerEvent`]s from the returned receiver if desired
pub struct Scheduler {
    /// The reconciler invoked on every tick
    reconciler: Reconciler,

    /// Time between ticks
    interval: Duration,

    /// Whether the first tick fires immediately
    run_on_start: bool,

    /// Upper bound on one cycle
    cycle_timeout: Duration,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<SchedulerEvent>,
}

impl Scheduler {
    /// Create a scheduler from validated configuration
    ///
    /// # Returns
    ///
    /// A tuple of (scheduler, event_receiver) where event_receiver yields
    /// scheduler events
    pub fn new(
        reconciler: Reconciler,
        config: &DdnsConfig,
    ) -> Result<(Self, mpsc::Receiver<SchedulerEvent>)> {
        config.validate()?;
        Self::with_settings(reconciler, config.refresh_interval(), &config.scheduler)
    }

    /// Create a scheduler from an interval and scheduler settings
    pub fn with_settings(
        reconciler: Reconciler,
        interval: Duration,
        settings: &SchedulerConfig,
    ) -> Result<(Self, mpsc::Receiver<SchedulerEvent>)> {
        if interval.is_zero() {
            return Err(Error::config("Refresh interval must be > 0"));
        }
        if interval > Duration::from_secs(MAX_REFRESH_INTERVAL_SECS) {
            return Err(Error::config(format!(
                "Refresh interval must be at most {} seconds. Got: {:?}",
                MAX_REFRESH_INTERVAL_SECS, interval
            )));
        }
        settings.validate()?;

        let (tx, rx) = mpsc::channel(settings.event_channel_capacity);

        let scheduler = Self {
            reconciler,
            interval,
            run_on_start: settings.run_on_start,
            cycle_timeout: settings.cycle_timeout(),
            event_tx: tx,
        };

        Ok((scheduler, rx))
    }

    /// The wrapped reconciler
    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Run until Ctrl-C
    pub async fn run(&self) -> Result<()> {
        self.run_internal(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", e);
            }
        })
        .await
    }

    /// Run until `shutdown_rx` fires (or its sender is dropped)
    pub async fn run_with_shutdown(
        &self,
        shutdown_rx: tokio::sync::oneshot::Receiver<()>,
    ) -> Result<()> {
        self.run_internal(async {
            let _ = shutdown_rx.await;
        })
        .await
    }

    /// Run one cycle bounded by the cycle timeout
    pub async fn run_once(&self) -> Result<CycleReport> {
        match tokio::time::timeout(self.cycle_timeout, self.reconciler.run_cycle()).await {
            Ok(result) => result,
            Err(_) => Err(Error::timeout(format!(
                "reconciliation cycle exceeded {:?}",
                self.cycle_timeout
            ))),
        }
    }

    async fn run_internal<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let now = Instant::now();
        let first_tick = if self.run_on_start {
            now
        } else {
            now.checked_add(self.interval).ok_or_else(|| {
                Error::config(format!("Refresh interval {:?} is out of range", self.interval))
            })?
        };

        info!(
            "Scheduler started for {} (interval: {:?}, run on start: {})",
            self.reconciler.fqdn(),
            self.interval,
            self.run_on_start
        );
        self.emit_event(SchedulerEvent::Started {
            interval: self.interval,
        });

        let (tick_tx, mut tick_rx) = mpsc::channel::<()>(1);

        let mut interval = tokio::time::interval_at(first_tick, self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut ticks = IntervalStream::new(interval);

        let ticker = async {
            while ticks.next().await.is_some() {
                match tick_tx.try_send(()) {
                    Ok(()) => debug!("Tick queued"),
                    Err(TrySendError::Full(())) => {
                        warn!("Previous cycle still running, dropping tick");
                        self.emit_event(SchedulerEvent::TickSkipped);
                    }
                    Err(TrySendError::Closed(())) => break,
                }
            }
        };

        let worker = async {
            while tick_rx.recv().await.is_some() {
                match self.run_once().await {
                    Ok(report) => {
                        self.emit_event(SchedulerEvent::CycleCompleted { report });
                    }
                    Err(e) => {
                        // Next tick retries from scratch
                        error!("Reconciliation cycle failed: {}", e);
                        self.emit_event(SchedulerEvent::CycleFailed {
                            error: e.to_string(),
                        });
                    }
                }
            }
        };

        tokio::select! {
            _ = ticker => {}
            _ = worker => {}
            _ = shutdown => {
                info!("Shutdown signal received");
            }
        }

        self.emit_event(SchedulerEvent::Stopped {
            reason: "Shutdown signal".to_string(),
        });
        info!("Scheduler stopped");

        Ok(())
    }

    /// Emit a scheduler event
    fn emit_event(&self, event: SchedulerEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            // Nobody is listening
            Err(TrySendError::Closed(_)) => {}
        }
    }
}
