//! Scripted telemetry source for service tests.
use crate::clients::SnapshotSource;
use crate::domain::{RawSnapshot, Region};
use crate::errors::FetchError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub fn raw_snapshot(time: i64, states: Vec<Value>) -> RawSnapshot {
    RawSnapshot {
        time,
        states: Some(states),
    }
}

/// Replays queued responses in order; once exhausted every call fails
/// with a 503
pub struct FakeSource {
    responses: Mutex<VecDeque<Result<RawSnapshot, FetchError>>>,
    regions: Mutex<Vec<Region>>,
    calls: AtomicUsize,
    delay: Duration,
}

impl FakeSource {
    pub fn new(responses: Vec<Result<RawSnapshot, FetchError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            regions: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn regions(&self) -> Vec<Region> {
        self.regions.lock().unwrap().clone()
    }
}

#[async_trait]
impl SnapshotSource for FakeSource {
    async fn fetch(&self, region: &Region) -> Result<RawSnapshot, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.regions.lock().unwrap().push(*region);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(FetchError::Status(503)))
    }
}
