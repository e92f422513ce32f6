//! OTP service composing the store and the attempt limiter

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use og_shared::utils::mask_phone_number;
use tracing::{error, info, warn};

use crate::errors::{OtpError, OtpResult};

use super::traits::{AttemptLimiter, OtpStore};

/// Issues and verifies one-time passcodes
///
/// Issuance goes straight to the store. Verification always passes through
/// the attempt limiter first, so wrong guesses consume the budget and a
/// rate-limited caller learns nothing about the stored code.
///
/// Both operations run their backend calls on a spawned task. If the caller
/// stops polling, the work still completes, so an attempt is never recorded
/// without the matching store lookup.
pub struct OtpService<S: OtpStore + ?Sized, L: AttemptLimiter + ?Sized> {
    /// Code storage backend
    store: Arc<S>,
    /// Verification attempt limiter
    limiter: Arc<L>,
    /// Set once `shutdown` has run
    shut_down: AtomicBool,
}

impl<S, L> OtpService<S, L>
where
    S: OtpStore + ?Sized + 'static,
    L: AttemptLimiter + ?Sized + 'static,
{
    /// Create a new OTP service
    ///
    /// # Arguments
    ///
    /// * `store` - Code storage implementation
    /// * `limiter` - Attempt limiter implementation
    pub fn new(store: Arc<S>, limiter: Arc<L>) -> Self {
        Self {
            store,
            limiter,
            shut_down: AtomicBool::new(false),
        }
    }

    /// Issue a code for an identifier
    ///
    /// # Returns
    ///
    /// * `Ok(code)` - The newly issued code, to be delivered out of band
    /// * `Err(OtpError::StillValid)` - A live code already exists
    /// * `Err(OtpError::Transient)` - Storage or random source failure
    pub async fn request_code(&self, identifier: &str) -> OtpResult<String> {
        self.ensure_running()?;

        let store = Arc::clone(&self.store);
        let owned_identifier = identifier.to_string();
        let result = run_detached(async move { store.issue(&owned_identifier).await }).await;

        let phone = mask_phone_number(identifier);
        match &result {
            Ok(_) => info!(phone = %phone, event = "otp_issued", "Issued verification code"),
            Err(OtpError::StillValid { retry_after_seconds }) => info!(
                phone = %phone,
                retry_after_seconds,
                event = "otp_still_valid",
                "Refused issuance while a code is still valid"
            ),
            Err(e) => error!(
                phone = %phone,
                error = %e,
                event = "otp_issue_failed",
                "Failed to issue verification code"
            ),
        }

        result
    }

    /// Verify a candidate code for an identifier
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The code matched and has been consumed
    /// * `Err(OtpError::RateLimited)` - Too many attempts; the store was not consulted
    /// * `Err(OtpError::InvalidCode)` - No live code matched
    /// * `Err(OtpError::Transient)` - Storage failure
    pub async fn verify_code(&self, identifier: &str, code: &str) -> OtpResult<()> {
        self.ensure_running()?;

        let store = Arc::clone(&self.store);
        let limiter = Arc::clone(&self.limiter);
        let owned_identifier = identifier.to_string();
        let owned_code = code.to_string();
        let result = run_detached(async move {
            limiter.admit(&owned_identifier).await?;
            store.verify(&owned_identifier, &owned_code).await
        })
        .await;

        let phone = mask_phone_number(identifier);
        match &result {
            Ok(()) => info!(phone = %phone, event = "otp_verified", "Verification code accepted"),
            Err(OtpError::RateLimited { retry_after_seconds }) => warn!(
                phone = %phone,
                retry_after_seconds,
                event = "rate_limited",
                "Verification attempt rejected by rate limit"
            ),
            Err(OtpError::InvalidCode) => warn!(
                phone = %phone,
                event = "otp_invalid",
                "Verification code rejected"
            ),
            Err(e) => error!(
                phone = %phone,
                error = %e,
                event = "otp_verify_failed",
                "System error during code verification"
            ),
        }

        result
    }

    /// Stop background work and release backend resources
    ///
    /// Idempotent. Later calls to `request_code` and `verify_code` fail with
    /// `Transient`.
    pub async fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }

        self.store.shutdown().await;
        self.limiter.shutdown().await;
        info!(event = "otp_service_shutdown", "OTP service shut down");
    }

    /// Whether `shutdown` has been called
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    fn ensure_running(&self) -> OtpResult<()> {
        if self.is_shut_down() {
            return Err(OtpError::transient("OTP service is shut down"));
        }
        Ok(())
    }
}

/// Run backend work on its own task so dropping the caller cannot split it
async fn run_detached<T, F>(work: F) -> OtpResult<T>
where
    F: Future<Output = OtpResult<T>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(work)
        .await
        .map_err(|e| OtpError::transient(format!("OTP task did not complete: {}", e)))?
}
