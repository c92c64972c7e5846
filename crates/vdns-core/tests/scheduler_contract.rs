//! Contract Test: Scheduler
//!
//! All tests run on paused virtual time, so intervals of several seconds
//! complete instantly and deterministically.
//!
//! Constraints verified:
//! - One cycle immediately (if enabled), then one per interval
//! - A failing cycle does not stop later cycles
//! - Cycles never overlap; excess ticks are dropped
//! - A hung cycle is cut off by the cycle timeout
//! - Shutdown stops the loop and emits Stopped

mod common;

use common::*;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use vdns_core::{Scheduler, SchedulerConfig, SchedulerEvent};

/// Run `scheduler` for `duration` of virtual time, then shut it down
async fn run_for(scheduler: Scheduler, duration: Duration) {
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let handle = tokio::spawn(async move { scheduler.run_with_shutdown(shutdown_rx).await });

    tokio::time::sleep(duration).await;

    shutdown_tx.send(()).expect("scheduler still running");
    handle
        .await
        .expect("scheduler task joins")
        .expect("scheduler exits cleanly");
}

fn drain(events: &mut mpsc::Receiver<SchedulerEvent>) -> Vec<SchedulerEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

#[tokio::test(start_paused = true)]
async fn runs_immediately_then_every_interval() {
    let provider = MockDnsProvider::new(vec![a("1", "9.9.9.9")]);
    let (scheduler, mut events) = Scheduler::with_settings(
        reconciler(&provider, Some("9.9.9.9"), None),
        Duration::from_secs(10),
        &SchedulerConfig::default(),
    )
    .expect("valid settings");

    run_for(scheduler, Duration::from_secs(35)).await;

    // t = 0, 10, 20, 30
    assert_eq!(provider.list_count(), 4);

    let events = drain(&mut events);
    assert!(matches!(events.first(), Some(SchedulerEvent::Started { .. })));
    assert!(matches!(events.last(), Some(SchedulerEvent::Stopped { .. })));
    let completed = events
        .iter()
        .filter(|e| matches!(e, SchedulerEvent::CycleCompleted { report } if report.is_noop()))
        .count();
    assert_eq!(completed, 4);
}

#[tokio::test(start_paused = true)]
async fn waits_one_interval_when_run_on_start_disabled() {
    let provider = MockDnsProvider::new(Vec::new());
    let settings = SchedulerConfig {
        run_on_start: false,
        ..SchedulerConfig::default()
    };
    let (scheduler, _events) = Scheduler::with_settings(
        reconciler(&provider, Some("9.9.9.9"), None),
        Duration::from_secs(10),
        &settings,
    )
    .expect("valid settings");

    run_for(scheduler, Duration::from_secs(25)).await;

    // t = 10, 20
    assert_eq!(provider.list_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn failing_cycles_do_not_stop_the_schedule() {
    let provider = MockDnsProvider::new(Vec::new());
    provider.fail_listing(true);
    let (scheduler, mut events) = Scheduler::with_settings(
        reconciler(&provider, Some("9.9.9.9"), None),
        Duration::from_secs(10),
        &SchedulerConfig::default(),
    )
    .expect("valid settings");

    run_for(scheduler, Duration::from_secs(25)).await;

    assert_eq!(provider.list_count(), 3);
    assert!(provider.mutations().is_empty());

    let failures = drain(&mut events)
        .into_iter()
        .filter(|e| matches!(e, SchedulerEvent::CycleFailed { .. }))
        .count();
    assert_eq!(failures, 3);
}

#[tokio::test(start_paused = true)]
async fn slow_cycles_never_overlap() {
    let provider = MockDnsProvider::new(Vec::new());
    provider.set_list_delay(Duration::from_secs(25));
    let (scheduler, mut events) = Scheduler::with_settings(
        reconciler(&provider, Some("9.9.9.9"), None),
        Duration::from_secs(10),
        &SchedulerConfig::default(),
    )
    .expect("valid settings");

    // cycle 1: 0..25 (tick 10 queued, tick 20 dropped)
    // cycle 2: 25..50 (tick 30 queued, tick 40 dropped)
    run_for(scheduler, Duration::from_secs(45)).await;

    assert_eq!(provider.max_lists_in_flight(), 1);
    assert_eq!(provider.list_count(), 2);

    let skipped = drain(&mut events)
        .into_iter()
        .filter(|e| matches!(e, SchedulerEvent::TickSkipped))
        .count();
    assert_eq!(skipped, 2);
}

#[tokio::test(start_paused = true)]
async fn hung_cycle_is_cut_off_by_timeout() {
    let provider = MockDnsProvider::new(Vec::new());
    provider.set_list_delay(Duration::from_secs(500));
    let settings = SchedulerConfig {
        cycle_timeout_secs: 30,
        ..SchedulerConfig::default()
    };
    let (scheduler, mut events) = Scheduler::with_settings(
        reconciler(&provider, Some("9.9.9.9"), None),
        Duration::from_secs(60),
        &settings,
    )
    .expect("valid settings");

    run_for(scheduler, Duration::from_secs(65)).await;

    // The second tick got a fresh cycle despite the first one hanging
    assert_eq!(provider.list_count(), 2);

    let timed_out: Vec<String> = drain(&mut events)
        .into_iter()
        .filter_map(|e| match e {
            SchedulerEvent::CycleFailed { error } => Some(error),
            _ => None,
        })
        .collect();
    assert_eq!(timed_out.len(), 1);
    assert!(timed_out[0].contains("exceeded"), "unexpected error: {}", timed_out[0]);
}

#[tokio::test(start_paused = true)]
async fn cycle_converges_records_through_scheduler() {
    let provider = MockDnsProvider::new(vec![a("1", "1.1.1.1")]);
    let (scheduler, mut events) = Scheduler::with_settings(
        reconciler(&provider, Some("9.9.9.9"), Some("2001:db8::9")),
        Duration::from_secs(10),
        &SchedulerConfig::default(),
    )
    .expect("valid settings");

    run_for(scheduler, Duration::from_secs(15)).await;

    let reports: Vec<_> = drain(&mut events)
        .into_iter()
        .filter_map(|e| match e {
            SchedulerEvent::CycleCompleted { report } => Some(report),
            _ => None,
        })
        .collect();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].mutation_count(), 3);
    assert!(reports[1].is_noop());
}

#[test]
fn zero_interval_rejected() {
    let provider = MockDnsProvider::new(Vec::new());
    let result = Scheduler::with_settings(
        reconciler(&provider, Some("9.9.9.9"), None),
        Duration::ZERO,
        &SchedulerConfig::default(),
    );
    assert!(result.is_err());
}

#[test]
fn out_of_range_interval_rejected() {
    let provider = MockDnsProvider::new(Vec::new());
    let settings = SchedulerConfig {
        run_on_start: false,
        ..SchedulerConfig::default()
    };

    let result = Scheduler::with_settings(
        reconciler(&provider, Some("9.9.9.9"), None),
        Duration::from_secs(u64::MAX),
        &settings,
    );

    assert!(result.is_err());
}
