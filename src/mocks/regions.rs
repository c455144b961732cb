//! Mock supported-region lookup.

use crate::client::SupportedRegions;
use crate::error::{NetworkError, SessionError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Region lookup with a configurable table that counts calls.
///
/// Services without an entry are reported as available nowhere.
#[derive(Default)]
pub struct MockSupportedRegions {
    services: Mutex<HashMap<String, Vec<String>>>,
    fail: AtomicBool,
    call_count: AtomicUsize,
}

impl MockSupportedRegions {
    /// Empty lookup.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `service` available in `regions`.
    pub fn with_service<I, S>(self, service: impl Into<String>, regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.services
            .lock()
            .insert(service.into(), regions.into_iter().map(Into::into).collect());
        self
    }

    /// Make every lookup fail with a connection error.
    pub fn failing(self) -> Self {
        self.fail.store(true, Ordering::SeqCst);
        self
    }

    /// Number of lookups so far.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SupportedRegions for MockSupportedRegions {
    async fn supported_regions(&self, service: &str) -> Result<Vec<String>, SessionError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(NetworkError::ConnectionFailed {
                message: format!("region lookup for {} failed", service),
            }
            .into());
        }
        Ok(self.services.lock().get(service).cloned().unwrap_or_default())
    }
}
