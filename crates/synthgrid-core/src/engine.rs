//! Seams to the outside world used by the transport: the playback clock and
//! the patch engine that turns triggers into sound.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::error::EngineError;
use crate::patch::PatchSummary;

/// Monotonic time source in seconds
pub trait Clock {
    fn now_secs(&self) -> f64;
}

/// Wall clock measured from construction
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Clock for SystemClock {
    fn now_secs(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Externally driven clock; clones share the same time
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    bits: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, secs: f64) {
        self.bits.store(secs.to_bits(), Ordering::SeqCst);
    }

    pub fn advance(&self, secs: f64) {
        self.set(self.now_secs() + secs);
    }
}

impl Clock for ManualClock {
    fn now_secs(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }
}

/// Sound-generating collaborator. Trigger times are on the transport's clock.
pub trait PatchEngine {
    /// Bring audio output up; called before every play
    fn start(&mut self) -> Result<(), EngineError>;

    /// Schedule one note. Fire-and-forget: failures are reported, never fatal.
    fn trigger(&mut self, patch: &PatchSummary, at_secs: f64, duration_secs: f64) -> Result<(), EngineError>;

    /// Drop every scheduled trigger that has not sounded yet
    fn cancel_pending(&mut self);
}

/// One trigger as seen by [`RecordingEngine`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedTrigger {
    pub patch: PatchSummary,
    pub at_secs: f64,
    pub duration_secs: f64,
}

/// Engine that only records what it was asked to do
#[derive(Debug, Clone, Default)]
pub struct RecordingEngine {
    pub triggers: Vec<RecordedTrigger>,
    pub cancels: usize,
    /// Make `start` fail with this message
    pub fail_start: Option<String>,
    /// Reject triggers for patches with this name
    pub reject_patch: Option<String>,
}

impl PatchEngine for RecordingEngine {
    fn start(&mut self) -> Result<(), EngineError> {
        match &self.fail_start {
            Some(msg) => Err(EngineError::Start(msg.clone())),
            None => Ok(()),
        }
    }

    fn trigger(&mut self, patch: &PatchSummary, at_secs: f64, duration_secs: f64) -> Result<(), EngineError> {
        if self.reject_patch.as_deref() == Some(patch.name.as_str()) {
            return Err(EngineError::Trigger(format!("patch '{}' rejected", patch.name)));
        }
        self.triggers.push(RecordedTrigger {
            patch: patch.clone(),
            at_secs,
            duration_secs,
        });
        Ok(())
    }

    fn cancel_pending(&mut self) {
        self.cancels += 1;
    }
}
