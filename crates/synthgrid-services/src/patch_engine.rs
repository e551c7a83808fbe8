//! Patch engine that hands due triggers to whoever renders the sound
//!
//! Triggers travel to the audio callback over a command channel. The
//! callback keeps them in a [`TriggerQueue`] until the device clock reaches
//! their time, then publishes them on the fired channel. Synthesis itself is
//! left to the consumer of that channel.

use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use synthgrid_core::{Clock, EngineError, PatchEngine, PatchSummary};
use tracing::{debug, info, warn};

use crate::audio_io::{DeviceClock, RealtimeOutputStream};

/// Capacity of the fired-trigger channel
const FIRED_CAPACITY: usize = 256;

/// Commands from the UI thread to the audio callback
#[derive(Debug, Clone)]
pub enum EngineCommand {
    Trigger(ScheduledTrigger),
    CancelPending,
}

/// One trigger, timed on the device clock
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledTrigger {
    pub patch: PatchSummary,
    pub at_secs: f64,
    pub duration_secs: f64,
}

/// Triggers waiting for their start time, kept in time order
#[derive(Debug, Default)]
pub struct TriggerQueue {
    pending: Vec<ScheduledTrigger>,
}

impl TriggerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn apply(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::Trigger(trigger) => {
                let at = self.pending.partition_point(|t| t.at_secs <= trigger.at_secs);
                self.pending.insert(at, trigger);
            }
            EngineCommand::CancelPending => self.pending.clear(),
        }
    }

    /// Remove and return every trigger starting before `until`
    pub fn take_due(&mut self, until: f64) -> Vec<ScheduledTrigger> {
        let due = self.pending.partition_point(|t| t.at_secs < until);
        self.pending.drain(..due).collect()
    }
}

/// [`PatchEngine`] backed by a cpal output stream and crossbeam channels
pub struct ChannelPatchEngine {
    clock: DeviceClock,
    command_tx: Sender<EngineCommand>,
    command_rx: Receiver<EngineCommand>,
    fired_tx: Sender<ScheduledTrigger>,
    fired_rx: Receiver<ScheduledTrigger>,
    stream: Option<RealtimeOutputStream>,
}

impl Default for ChannelPatchEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelPatchEngine {
    pub fn new() -> Self {
        let (command_tx, command_rx) = unbounded();
        let (fired_tx, fired_rx) = bounded(FIRED_CAPACITY);
        Self {
            clock: DeviceClock::new(),
            command_tx,
            command_rx,
            fired_tx,
            fired_rx,
            stream: None,
        }
    }

    /// Clock driven by this engine's output stream
    pub fn clock(&self) -> DeviceClock {
        self.clock.clone()
    }

    /// Triggers whose start time has been reached
    pub fn fired(&self) -> Receiver<ScheduledTrigger> {
        self.fired_rx.clone()
    }

    pub fn is_running(&self) -> bool {
        self.stream.is_some()
    }

    /// Audio callback body: advance the clock, take new commands and
    /// publish what became due during this buffer
    fn render(
        queue: &mut TriggerQueue,
        commands: &Receiver<EngineCommand>,
        fired: &Sender<ScheduledTrigger>,
        clock: &DeviceClock,
        buffer: &mut [f32],
        sample_rate: u32,
        channels: u16,
    ) {
        buffer.fill(0.0);
        let frames = buffer.len() / channels.max(1) as usize;
        clock.advance_frames(frames as u64, sample_rate);

        for command in commands.try_iter() {
            queue.apply(command);
        }

        for trigger in queue.take_due(clock.now_secs()) {
            if let Err(TrySendError::Full(trigger)) = fired.try_send(trigger) {
                warn!(patch = %trigger.patch.name, "Fired queue full, dropping trigger");
            }
        }
    }
}

impl PatchEngine for ChannelPatchEngine {
    fn start(&mut self) -> Result<(), EngineError> {
        if self.stream.is_some() {
            return Ok(());
        }

        let commands = self.command_rx.clone();
        let fired = self.fired_tx.clone();
        let clock = self.clock.clone();
        let mut queue = TriggerQueue::new();

        let stream = RealtimeOutputStream::start(move |buffer, sample_rate, channels| {
            Self::render(&mut queue, &commands, &fired, &clock, buffer, sample_rate, channels);
        })
        .map_err(|e| EngineError::Start(e.to_string()))?;

        self.stream = Some(stream);
        info!("Patch engine started");
        Ok(())
    }

    fn trigger(&mut self, patch: &PatchSummary, at_secs: f64, duration_secs: f64) -> Result<(), EngineError> {
        debug!(patch = %patch.name, at_secs, duration_secs, "Trigger armed");
        self.command_tx
            .send(EngineCommand::Trigger(ScheduledTrigger {
                patch: patch.clone(),
                at_secs,
                duration_secs,
            }))
            .map_err(|e| EngineError::Trigger(e.to_string()))
    }

    fn cancel_pending(&mut self) {
        if self.command_tx.send(EngineCommand::CancelPending).is_err() {
            warn!("Patch engine command channel closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trigger(name: &str, at: f64) -> EngineCommand {
        EngineCommand::Trigger(ScheduledTrigger {
            patch: PatchSummary::new(1, name),
            at_secs: at,
            duration_secs: 0.5,
        })
    }

    #[test]
    fn test_queue_orders_by_time() {
        let mut queue = TriggerQueue::new();
        queue.apply(trigger("b", 1.0));
        queue.apply(trigger("a", 0.5));
        queue.apply(trigger("c", 1.0));

        let due = queue.take_due(1.01);
        let names: Vec<&str> = due.iter().map(|t| t.patch.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_cancel_drops_unfired() {
        let mut queue = TriggerQueue::new();
        queue.apply(trigger("a", 0.1));
        queue.apply(trigger("b", 2.0));
        assert_eq!(queue.take_due(0.5).len(), 1);
        queue.apply(EngineCommand::CancelPending);
        assert!(queue.take_due(10.0).is_empty());
    }

    #[test]
    fn test_render_fires_when_clock_reaches_trigger() {
        let mut engine = ChannelPatchEngine::new();
        let fired = engine.fired();
        let clock = engine.clock();
        engine.trigger(&PatchSummary::new(2, "Kick"), 0.015, 0.25).unwrap();

        let mut queue = TriggerQueue::new();
        let mut buffer = vec![1.0f32; 960];

        // 480 stereo frames at 48 kHz = 10 ms
        ChannelPatchEngine::render(&mut queue, &engine.command_rx, &engine.fired_tx, &clock, &mut buffer, 48_000, 2);
        assert!(fired.try_recv().is_err());
        assert!(buffer.iter().all(|s| *s == 0.0));

        ChannelPatchEngine::render(&mut queue, &engine.command_rx, &engine.fired_tx, &clock, &mut buffer, 48_000, 2);
        let hit = fired.try_recv().unwrap();
        assert_eq!(hit.patch.name, "Kick");
        assert!((clock.now_secs() - 0.02).abs() < 1e-9);
    }

    #[test]
    fn test_cancel_reaches_audio_side() {
        let mut engine = ChannelPatchEngine::new();
        let fired = engine.fired();
        let clock = engine.clock();
        engine.trigger(&PatchSummary::new(2, "Kick"), 0.005, 0.25).unwrap();
        engine.cancel_pending();

        let mut queue = TriggerQueue::new();
        let mut buffer = vec![0.0f32; 960];
        ChannelPatchEngine::render(&mut queue, &engine.command_rx, &engine.fired_tx, &clock, &mut buffer, 48_000, 2);
        assert!(fired.try_recv().is_err());
    }
}
