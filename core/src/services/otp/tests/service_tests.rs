//! Unit tests for the OTP service

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::OtpError;
use crate::services::otp::{AttemptLimiter, OtpService, OtpStore};

use super::mocks::{call_log, CallLog, GatedOtpStore, MockAttemptLimiter, MockOtpStore};

fn service(
    max_attempts: usize,
    store_fails: bool,
) -> (
    OtpService<MockOtpStore, MockAttemptLimiter>,
    Arc<MockOtpStore>,
    Arc<MockAttemptLimiter>,
    CallLog,
) {
    let calls = call_log();
    let store = Arc::new(MockOtpStore::new(calls.clone(), store_fails));
    let limiter = Arc::new(MockAttemptLimiter::new(calls.clone(), max_attempts));
    let service = OtpService::new(store.clone(), limiter.clone());
    (service, store, limiter, calls)
}

#[tokio::test]
async fn test_request_then_verify_success() {
    let (service, _store, _limiter, _calls) = service(3, false);

    let code = service.request_code("09012345678").await.unwrap();
    assert_eq!(code, "123456");

    assert!(service.verify_code("09012345678", &code).await.is_ok());

    // Consumed on success
    let second = service.verify_code("09012345678", &code).await;
    assert_eq!(second, Err(OtpError::InvalidCode));
}

#[tokio::test]
async fn test_request_passes_still_valid_through() {
    let (service, _store, _limiter, _calls) = service(3, false);

    service.request_code("09012345678").await.unwrap();
    let result = service.request_code("09012345678").await;
    assert_eq!(result, Err(OtpError::StillValid { retry_after_seconds: 120 }));
}

#[tokio::test]
async fn test_request_does_not_touch_limiter() {
    let (service, _store, limiter, calls) = service(3, false);

    service.request_code("09012345678").await.unwrap();
    assert_eq!(limiter.attempts_for("09012345678"), 0);
    assert_eq!(*calls.lock().unwrap(), vec!["issue:09012345678".to_string()]);
}

#[tokio::test]
async fn test_limiter_runs_before_store() {
    let (service, _store, _limiter, calls) = service(3, false);

    let _ = service.verify_code("09012345678", "000000").await;
    assert_eq!(
        *calls.lock().unwrap(),
        vec!["admit:09012345678".to_string(), "verify:09012345678".to_string()]
    );
}

#[tokio::test]
async fn test_rate_limited_never_reaches_store() {
    let (service, _store, limiter, calls) = service(3, false);
    let code = service.request_code("09012345678").await.unwrap();

    for _ in 0..3 {
        let result = service.verify_code("09012345678", "999999").await;
        assert_eq!(result, Err(OtpError::InvalidCode));
    }
    assert_eq!(limiter.attempts_for("09012345678"), 3);

    calls.lock().unwrap().clear();

    // The correct code is refused once the budget is spent
    let result = service.verify_code("09012345678", &code).await;
    assert_eq!(result, Err(OtpError::RateLimited { retry_after_seconds: 600 }));
    assert_eq!(*calls.lock().unwrap(), vec!["admit:09012345678".to_string()]);
}

#[tokio::test]
async fn test_store_failure_is_transient() {
    let (service, _store, _limiter, _calls) = service(3, true);

    let issue = service.request_code("09012345678").await;
    assert!(matches!(issue, Err(OtpError::Transient { .. })));

    let verify = service.verify_code("09012345678", "123456").await;
    assert!(matches!(verify, Err(OtpError::Transient { .. })));
}

#[tokio::test]
async fn test_shutdown_is_idempotent() {
    let (service, store, limiter, _calls) = service(3, false);
    assert!(!service.is_shut_down());

    service.shutdown().await;
    service.shutdown().await;

    assert!(service.is_shut_down());
    assert_eq!(store.shutdowns.load(Ordering::SeqCst), 1);
    assert_eq!(limiter.shutdowns.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_calls_after_shutdown_are_transient() {
    let (service, _store, _limiter, calls) = service(3, false);
    service.shutdown().await;

    let issue = service.request_code("09012345678").await;
    assert!(matches!(issue, Err(OtpError::Transient { .. })));

    let verify = service.verify_code("09012345678", "123456").await;
    assert!(matches!(verify, Err(OtpError::Transient { .. })));

    assert!(calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_service_over_trait_objects() {
    let calls = call_log();
    let store: Arc<dyn OtpStore> = Arc::new(MockOtpStore::new(calls.clone(), false));
    let limiter: Arc<dyn AttemptLimiter> = Arc::new(MockAttemptLimiter::new(calls, 3));
    let service: OtpService<dyn OtpStore, dyn AttemptLimiter> = OtpService::new(store, limiter);

    let code = service.request_code("09012345678").await.unwrap();
    assert!(service.verify_code("09012345678", &code).await.is_ok());
}

#[tokio::test]
async fn test_abandoned_verification_runs_to_completion() {
    let store = Arc::new(GatedOtpStore::new());
    let limiter = Arc::new(MockAttemptLimiter::new(call_log(), 3));
    let service = OtpService::new(store.clone(), limiter.clone());

    // The caller gives up while the store is still blocked
    let abandoned =
        tokio::time::timeout(Duration::from_millis(20), service.verify_code("09012345678", "123456")).await;
    assert!(abandoned.is_err());
    assert!(!store.completed.load(Ordering::SeqCst));

    store.gate.notify_one();
    tokio::time::timeout(Duration::from_secs(1), store.finished.notified())
        .await
        .expect("detached verification should finish");

    assert!(store.completed.load(Ordering::SeqCst));
    assert_eq!(limiter.attempts_for("09012345678"), 1);
}
