//! Mock implementations for testing the OTP service

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::errors::{OtpError, OtpResult};
use crate::services::otp::{AttemptLimiter, OtpStore};

/// Ordered log of backend calls shared by the mocks
pub type CallLog = Arc<Mutex<Vec<String>>>;

pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

// Mock store holding one fixed code per identifier
pub struct MockOtpStore {
    pub codes: Mutex<HashMap<String, String>>,
    pub calls: CallLog,
    pub shutdowns: AtomicUsize,
    pub should_fail: bool,
}

impl MockOtpStore {
    pub fn new(calls: CallLog, should_fail: bool) -> Self {
        Self {
            codes: Mutex::new(HashMap::new()),
            calls,
            shutdowns: AtomicUsize::new(0),
            should_fail,
        }
    }
}

#[async_trait]
impl OtpStore for MockOtpStore {
    async fn issue(&self, identifier: &str) -> OtpResult<String> {
        self.calls.lock().unwrap().push(format!("issue:{}", identifier));
        if self.should_fail {
            return Err(OtpError::transient("store unavailable"));
        }

        let mut codes = self.codes.lock().unwrap();
        if codes.contains_key(identifier) {
            return Err(OtpError::StillValid { retry_after_seconds: 120 });
        }
        let code = "123456".to_string();
        codes.insert(identifier.to_string(), code.clone());
        Ok(code)
    }

    async fn verify(&self, identifier: &str, code: &str) -> OtpResult<()> {
        self.calls.lock().unwrap().push(format!("verify:{}", identifier));
        if self.should_fail {
            return Err(OtpError::transient("store unavailable"));
        }

        let mut codes = self.codes.lock().unwrap();
        match codes.get(identifier) {
            Some(stored) if stored == code => {
                codes.remove(identifier);
                Ok(())
            }
            _ => Err(OtpError::InvalidCode),
        }
    }

    async fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

// Mock limiter with a fixed cap and no window
pub struct MockAttemptLimiter {
    pub max_attempts: usize,
    pub attempts: Mutex<HashMap<String, usize>>,
    pub calls: CallLog,
    pub shutdowns: AtomicUsize,
}

impl MockAttemptLimiter {
    pub fn new(calls: CallLog, max_attempts: usize) -> Self {
        Self {
            max_attempts,
            attempts: Mutex::new(HashMap::new()),
            calls,
            shutdowns: AtomicUsize::new(0),
        }
    }

    pub fn attempts_for(&self, identifier: &str) -> usize {
        self.attempts.lock().unwrap().get(identifier).copied().unwrap_or(0)
    }
}

#[async_trait]
impl AttemptLimiter for MockAttemptLimiter {
    async fn admit(&self, identifier: &str) -> OtpResult<()> {
        self.calls.lock().unwrap().push(format!("admit:{}", identifier));

        let mut attempts = self.attempts.lock().unwrap();
        let count = attempts.entry(identifier.to_string()).or_insert(0);
        if *count >= self.max_attempts {
            return Err(OtpError::RateLimited { retry_after_seconds: 600 });
        }
        *count += 1;
        Ok(())
    }

    async fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

// Store whose verify blocks until released, for abandoned-caller tests
pub struct GatedOtpStore {
    pub gate: Notify,
    pub finished: Notify,
    pub completed: AtomicBool,
}

impl GatedOtpStore {
    pub fn new() -> Self {
        Self {
            gate: Notify::new(),
            finished: Notify::new(),
            completed: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl OtpStore for GatedOtpStore {
    async fn issue(&self, _identifier: &str) -> OtpResult<String> {
        Ok("000000".to_string())
    }

    async fn verify(&self, _identifier: &str, _code: &str) -> OtpResult<()> {
        self.gate.notified().await;
        self.completed.store(true, Ordering::SeqCst);
        self.finished.notify_one();
        Err(OtpError::InvalidCode)
    }
}
