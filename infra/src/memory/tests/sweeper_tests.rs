//! Background sweep tests on paused tokio time

use chrono::Duration as ChronoDuration;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use og_core::services::{ManualClock, OtpStore};
use og_shared::config::OtpConfig;

use crate::memory::{InMemoryOtpStore, Sweeper};

#[tokio::test(start_paused = true)]
async fn test_sweeper_runs_every_interval() {
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);
    let sweeper = Sweeper::spawn("test", Duration::from_secs(60), move || {
        counter.fetch_add(1, Ordering::SeqCst);
        0
    });

    tokio::time::sleep(Duration::from_secs(59)).await;
    assert_eq!(runs.load(Ordering::SeqCst), 0);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(runs.load(Ordering::SeqCst), 3);

    sweeper.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_stop_is_idempotent_and_final() {
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);
    let sweeper = Sweeper::spawn("test", Duration::from_secs(10), move || {
        counter.fetch_add(1, Ordering::SeqCst);
        0
    });

    sweeper.stop().await;
    sweeper.stop().await;
    assert!(sweeper.is_finished());

    tokio::time::sleep(Duration::from_secs(100)).await;
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_handle_stops_task() {
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);
    let sweeper = Sweeper::spawn("test", Duration::from_secs(10), move || {
        counter.fetch_add(1, Ordering::SeqCst);
        0
    });
    drop(sweeper);

    tokio::time::sleep(Duration::from_secs(100)).await;
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_store_sweeper_removes_expired_records() {
    let clock = Arc::new(ManualClock::starting_now());
    let store = InMemoryOtpStore::new(&OtpConfig::default(), 4, clock.clone()).unwrap();
    store.start_sweeper(Duration::from_secs(60));

    store.issue("09012345678").await.unwrap();
    assert_eq!(store.len(), 1);

    clock.advance(ChronoDuration::minutes(2));
    tokio::time::sleep(Duration::from_secs(61)).await;
    assert!(store.is_empty());

    store.shutdown().await;
}
