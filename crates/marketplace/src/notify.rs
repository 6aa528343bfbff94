//! Outbound notification seam for gift deliveries.

use std::sync::{Mutex, PoisonError};

use thiserror::Error;

use crate::{ClaimCode, Recipient};

/// A gift delivery: who gets what, and the code to claim it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GiftNotification {
    pub recipient: Recipient,
    pub sender_name: String,
    pub business_name: String,
    pub value_cents: u64,
    pub message: Option<String>,
    pub claim_code: ClaimCode,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("notification to {recipient} failed: {reason}")]
pub struct NotifyError {
    pub recipient: String,
    pub reason: String,
}

/// Delivers notifications over email, SMS or social channels.
pub trait Notifier: Send + Sync {
    fn send_gift(&self, notification: &GiftNotification) -> Result<(), NotifyError>;
}

/// Logs deliveries instead of sending them (no channel integration configured).
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn send_gift(&self, n: &GiftNotification) -> Result<(), NotifyError> {
        tracing::info!(
            recipient = %n.recipient,
            business = %n.business_name,
            value_cents = n.value_cents,
            "gift notification queued"
        );
        Ok(())
    }
}

/// Keeps every notification in memory; used by tests to read claim codes.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<GiftNotification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<GiftNotification> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn last(&self) -> Option<GiftNotification> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).last().cloned()
    }
}

impl Notifier for RecordingNotifier {
    fn send_gift(&self, notification: &GiftNotification) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification.clone());
        Ok(())
    }
}
