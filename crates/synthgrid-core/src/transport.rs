//! Transport state and the lookahead trigger scheduler

use serde::{Deserialize, Serialize};

use crate::arrangement::{Arrangement, ArrangementSnapshot};
use crate::engine::{Clock, PatchEngine};
use crate::error::{Result, SynthgridError};
use crate::loop_region::LoopRegion;
use crate::schedule::{compile_schedule, TriggerEvent};

/// How far ahead of the clock triggers are handed to the engine
pub const DEFAULT_LOOKAHEAD_SECS: f64 = 0.1;

/// Transport playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// Result of one scheduler tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    /// Unwrapped transport time
    pub position_secs: f64,
    /// Time shown to the user; wrapped into the loop when one is active
    pub playhead_secs: f64,
    /// Playback ran past the last clip and stopped on this tick
    pub auto_stopped: bool,
}

/// Plays a compiled snapshot against a clock.
///
/// Transport time advances one second per clock second while playing.
/// Each tick arms every trigger whose transport time falls between the
/// previous horizon and `now + lookahead`, converted back to clock time.
/// With a loop, iteration `k` plays the schedule shifted by `k` loop lengths.
pub struct TransportScheduler {
    clock: Box<dyn Clock + Send>,
    state: TransportState,
    lookahead_secs: f64,
    snapshot: Option<ArrangementSnapshot>,
    schedule: Vec<TriggerEvent>,
    /// Transport time while not playing
    position_secs: f64,
    /// Clock reading at which transport time equaled `anchor_pos`
    anchor_clock: f64,
    anchor_pos: f64,
    /// Transport time up to which triggers have been armed
    armed_until: f64,
}

impl std::fmt::Debug for TransportScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportScheduler")
            .field("state", &self.state)
            .field("position_secs", &self.position_secs)
            .field("events", &self.schedule.len())
            .finish()
    }
}

impl TransportScheduler {
    pub fn new(clock: Box<dyn Clock + Send>) -> Self {
        Self {
            clock,
            state: TransportState::Stopped,
            lookahead_secs: DEFAULT_LOOKAHEAD_SECS,
            snapshot: None,
            schedule: Vec::new(),
            position_secs: 0.0,
            anchor_clock: 0.0,
            anchor_pos: 0.0,
            armed_until: 0.0,
        }
    }

    pub fn with_lookahead(mut self, lookahead_secs: f64) -> Self {
        if lookahead_secs.is_finite() && lookahead_secs > 0.0 {
            self.lookahead_secs = lookahead_secs;
        }
        self
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    pub fn lookahead_secs(&self) -> f64 {
        self.lookahead_secs
    }

    pub fn schedule(&self) -> &[TriggerEvent] {
        &self.schedule
    }

    pub fn snapshot(&self) -> Option<&ArrangementSnapshot> {
        self.snapshot.as_ref()
    }

    fn loop_region(&self) -> Option<LoopRegion> {
        self.snapshot.as_ref().and_then(|s| s.loop_region)
    }

    /// Unwrapped transport time
    pub fn position_secs(&self) -> f64 {
        match self.state {
            TransportState::Playing => self.anchor_pos + (self.clock.now_secs() - self.anchor_clock),
            _ => self.position_secs,
        }
    }

    /// Transport time wrapped into the active loop
    pub fn playhead_secs(&self) -> f64 {
        let pos = self.position_secs();
        match self.loop_region() {
            Some(region) if self.state != TransportState::Stopped || pos >= region.start_sec => region.phase(pos),
            _ => pos,
        }
    }

    fn compile(&mut self, arrangement: &Arrangement) {
        let snapshot = arrangement.snapshot();
        self.schedule = compile_schedule(&snapshot.clips, &snapshot.lanes, snapshot.bpm, snapshot.loop_region);
        tracing::debug!(
            events = self.schedule.len(),
            revision = snapshot.revision,
            "Compiled schedule"
        );
        self.snapshot = Some(snapshot);
    }

    fn anchor_at(&mut self, pos: f64) {
        self.anchor_clock = self.clock.now_secs();
        self.anchor_pos = pos;
        self.armed_until = pos;
    }

    /// Start playback from the loop start, or zero without a loop.
    /// A paused transport resumes instead.
    pub fn play(&mut self, arrangement: &Arrangement, engine: &mut dyn PatchEngine) -> Result<()> {
        match self.state {
            TransportState::Playing => return Ok(()),
            TransportState::Paused => {
                self.resume(arrangement, engine);
                return Ok(());
            }
            TransportState::Stopped => {}
        }

        if let Err(e) = engine.start() {
            tracing::error!("Failed to start patch engine: {e}");
            return Err(SynthgridError::EngineStart(e.to_string()));
        }

        self.compile(arrangement);
        let start = self.loop_region().map_or(0.0, |r| r.start_sec);
        self.anchor_at(start);
        self.state = TransportState::Playing;
        tracing::info!(start_secs = start, events = self.schedule.len(), "Playback started");
        self.arm(engine);
        Ok(())
    }

    /// Freeze transport time, keeping the compiled schedule
    pub fn pause(&mut self, engine: &mut dyn PatchEngine) {
        if self.state != TransportState::Playing {
            return;
        }
        self.position_secs = self.position_secs();
        self.state = TransportState::Paused;
        engine.cancel_pending();
        tracing::info!(position_secs = self.position_secs, "Playback paused");
    }

    /// Continue from the frozen time. Recompiles if the arrangement changed
    /// since the schedule was built.
    pub fn resume(&mut self, arrangement: &Arrangement, engine: &mut dyn PatchEngine) {
        if self.state != TransportState::Paused {
            return;
        }
        let stale = self.snapshot.as_ref().is_none_or(|s| s.revision != arrangement.revision());
        if stale {
            self.compile(arrangement);
        }
        self.anchor_at(self.position_secs);
        self.state = TransportState::Playing;
        tracing::info!(position_secs = self.position_secs, recompiled = stale, "Playback resumed");
        self.arm(engine);
    }

    /// Halt, drop pending triggers and rewind to the loop start or zero
    pub fn stop(&mut self, engine: &mut dyn PatchEngine) {
        engine.cancel_pending();
        self.state = TransportState::Stopped;
        self.position_secs = self.loop_region().map_or(0.0, |r| r.start_sec);
        self.armed_until = self.position_secs;
        tracing::info!("Playback stopped");
    }

    /// Rebuild the schedule from the current arrangement. While playing,
    /// pending triggers are replaced from the current time onward.
    pub fn recompile(&mut self, arrangement: &Arrangement, engine: &mut dyn PatchEngine) {
        match self.state {
            TransportState::Stopped => {}
            TransportState::Paused => self.compile(arrangement),
            TransportState::Playing => {
                let pos = self.position_secs();
                engine.cancel_pending();
                self.compile(arrangement);
                self.anchor_at(pos);
                self.arm(engine);
            }
        }
    }

    /// Rebuild the schedule and jump to `secs` in one step, so triggers from
    /// the old schedule are never armed at the new position
    pub fn recompile_at(&mut self, arrangement: &Arrangement, secs: f64, engine: &mut dyn PatchEngine) {
        let secs = if secs.is_finite() { secs.max(0.0) } else { 0.0 };
        match self.state {
            TransportState::Stopped | TransportState::Paused => {
                self.compile(arrangement);
                self.position_secs = secs;
            }
            TransportState::Playing => {
                engine.cancel_pending();
                self.compile(arrangement);
                self.anchor_at(secs);
                self.arm(engine);
            }
        }
    }

    /// Jump to a transport time
    pub fn seek(&mut self, secs: f64, engine: &mut dyn PatchEngine) {
        let secs = if secs.is_finite() { secs.max(0.0) } else { 0.0 };
        self.position_secs = secs;
        if self.state == TransportState::Playing {
            engine.cancel_pending();
            self.anchor_at(secs);
            self.arm(engine);
        } else {
            self.armed_until = secs;
        }
    }

    /// Advance: arm upcoming triggers and stop at the end of a non-looping run
    pub fn tick(&mut self, engine: &mut dyn PatchEngine) -> TickReport {
        if self.state != TransportState::Playing {
            return TickReport {
                position_secs: self.position_secs(),
                playhead_secs: self.playhead_secs(),
                auto_stopped: false,
            };
        }

        let pos = self.position_secs();
        let region = self.loop_region();
        let duration = self.snapshot.as_ref().map_or(0.0, |s| s.duration_secs());

        if region.is_none() && pos >= duration {
            engine.cancel_pending();
            self.state = TransportState::Stopped;
            self.position_secs = 0.0;
            self.armed_until = 0.0;
            tracing::info!(duration_secs = duration, "Reached end of arrangement, stopping");
            return TickReport {
                position_secs: 0.0,
                playhead_secs: 0.0,
                auto_stopped: true,
            };
        }

        self.arm(engine);
        TickReport {
            position_secs: pos,
            playhead_secs: region.map_or(pos, |r| r.phase(pos)),
            auto_stopped: false,
        }
    }

    /// Hand the engine every trigger between the current horizon and
    /// `now + lookahead`. Triggers more than one lookahead overdue are
    /// dropped, so a stalled tick never bursts a backlog of loop passes.
    fn arm(&mut self, engine: &mut dyn PatchEngine) {
        let now = self.position_secs();
        let floor = now - self.lookahead_secs;
        if self.armed_until < floor {
            tracing::warn!(
                missed_secs = floor - self.armed_until,
                "Transport tick stalled, skipping overdue triggers"
            );
        }
        let from = self.armed_until.max(floor);
        let until = now + self.lookahead_secs;
        if until <= from {
            return;
        }

        let mut due: Vec<(f64, usize)> = Vec::new();
        match self.loop_region() {
            None => {
                for (i, event) in self.schedule.iter().enumerate() {
                    if event.at_sec >= from && event.at_sec < until {
                        due.push((event.at_sec, i));
                    }
                }
            }
            Some(region) => {
                let len = region.len_secs();
                let first = ((from - region.start_sec) / len).floor() as i64;
                let last = ((until - region.start_sec) / len).floor() as i64;
                for k in first..=last {
                    let shift = k as f64 * len;
                    for (i, event) in self.schedule.iter().enumerate() {
                        let at = event.at_sec + shift;
                        if at >= from && at < until {
                            due.push((at, i));
                        }
                    }
                }
            }
        }

        for (at, i) in due {
            let event = &self.schedule[i];
            let clock_at = self.anchor_clock + (at - self.anchor_pos);
            if let Err(e) = engine.trigger(&event.patch, clock_at, event.duration_sec) {
                tracing::warn!(clip = %event.clip, lane = event.lane, "Trigger failed: {e}");
            }
        }
        self.armed_until = until;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ManualClock, RecordingEngine};
    use crate::patch::PatchSummary;

    fn arrangement_with(clips: &[(usize, f64, f64)]) -> Arrangement {
        let mut arr = Arrangement::new();
        for (n, &(lane, start, len)) in clips.iter().enumerate() {
            arr.add_clip(lane, start, len, Some(PatchSummary::new(n as u64 + 1, format!("p{}", n + 1))));
        }
        arr
    }

    fn scheduler() -> (TransportScheduler, ManualClock) {
        let clock = ManualClock::new();
        (TransportScheduler::new(Box::new(clock.clone())), clock)
    }

    #[test]
    fn test_single_clip_plays_and_auto_stops() {
        let arr = arrangement_with(&[(0, 0.0, 4.0)]);
        let (mut transport, clock) = scheduler();
        let mut engine = RecordingEngine::default();

        transport.play(&arr, &mut engine).unwrap();
        assert_eq!(transport.schedule().len(), 1);
        assert_eq!(engine.triggers.len(), 1);
        assert_eq!(engine.triggers[0].at_secs, 0.0);
        assert_eq!(engine.triggers[0].duration_secs, 2.0);

        clock.set(1.0);
        assert!(!transport.tick(&mut engine).auto_stopped);
        assert_eq!(engine.triggers.len(), 1);

        clock.set(2.0);
        let report = transport.tick(&mut engine);
        assert!(report.auto_stopped);
        assert_eq!(report.playhead_secs, 0.0);
        assert_eq!(transport.state(), TransportState::Stopped);
    }

    #[test]
    fn test_triggers_armed_within_lookahead() {
        let arr = arrangement_with(&[(0, 0.0, 1.0), (0, 2.0, 1.0)]);
        let (mut transport, clock) = scheduler();
        let mut engine = RecordingEngine::default();
        clock.set(10.0);

        transport.play(&arr, &mut engine).unwrap();
        assert_eq!(engine.triggers.len(), 1);

        clock.set(10.85);
        transport.tick(&mut engine);
        assert_eq!(engine.triggers.len(), 1);

        clock.set(10.95);
        transport.tick(&mut engine);
        assert_eq!(engine.triggers.len(), 2);
        assert!((engine.triggers[1].at_secs - 11.0).abs() < 1e-9);

        clock.set(10.97);
        transport.tick(&mut engine);
        assert_eq!(engine.triggers.len(), 2);
    }

    #[test]
    fn test_loop_wraps_and_repeats() {
        let mut arr = arrangement_with(&[(0, 0.0, 1.0), (0, 2.0, 1.0), (0, 4.0, 1.0)]);
        arr.set_loop_region(Some(LoopRegion { start_sec: 1.0, end_sec: 2.0 }));
        let (mut transport, clock) = scheduler();
        let mut engine = RecordingEngine::default();

        transport.play(&arr, &mut engine).unwrap();
        assert_eq!(transport.schedule().len(), 1);
        assert_eq!(transport.playhead_secs(), 1.0);

        let mut t = 0.0;
        while t < 5.0 {
            t += 0.05;
            clock.set(t);
            let report = transport.tick(&mut engine);
            assert!(!report.auto_stopped);
            assert!(report.playhead_secs >= 1.0 && report.playhead_secs < 2.0);
        }

        // One trigger per loop iteration, a loop length apart
        let times: Vec<f64> = engine.triggers.iter().map(|t| t.at_secs).collect();
        assert!(times.len() >= 5);
        for pair in times.windows(2) {
            assert!((pair[1] - pair[0] - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_pause_freezes_and_resume_continues() {
        let arr = arrangement_with(&[(0, 0.0, 8.0)]);
        let (mut transport, clock) = scheduler();
        let mut engine = RecordingEngine::default();

        transport.play(&arr, &mut engine).unwrap();
        clock.set(1.5);
        transport.tick(&mut engine);
        transport.pause(&mut engine);
        assert_eq!(transport.state(), TransportState::Paused);

        clock.set(5.0);
        assert_eq!(transport.position_secs(), 1.5);

        transport.resume(&arr, &mut engine);
        clock.set(5.5);
        assert!((transport.position_secs() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_resume_recompiles_after_edit() {
        let mut arr = arrangement_with(&[(0, 0.0, 8.0)]);
        let (mut transport, clock) = scheduler();
        let mut engine = RecordingEngine::default();

        transport.play(&arr, &mut engine).unwrap();
        clock.set(0.5);
        transport.pause(&mut engine);

        arr.add_clip(0, 2.0, 1.0, Some(PatchSummary::new(9, "late")));
        transport.resume(&arr, &mut engine);
        assert_eq!(transport.schedule().len(), 2);
        assert_eq!(transport.snapshot().map(|s| s.revision), Some(arr.revision()));
    }

    #[test]
    fn test_stop_rewinds_to_loop_start() {
        let mut arr = arrangement_with(&[(0, 0.0, 8.0)]);
        arr.set_loop_region(Some(LoopRegion { start_sec: 1.0, end_sec: 3.0 }));
        let (mut transport, clock) = scheduler();
        let mut engine = RecordingEngine::default();

        transport.play(&arr, &mut engine).unwrap();
        clock.set(1.2);
        transport.tick(&mut engine);
        transport.stop(&mut engine);
        assert_eq!(transport.state(), TransportState::Stopped);
        assert_eq!(transport.position_secs(), 1.0);
        assert!(engine.cancels >= 1);
    }

    #[test]
    fn test_engine_start_failure_stays_stopped() {
        let arr = arrangement_with(&[(0, 0.0, 4.0)]);
        let (mut transport, _clock) = scheduler();
        let mut engine = RecordingEngine {
            fail_start: Some("no device".into()),
            ..Default::default()
        };

        let err = transport.play(&arr, &mut engine).unwrap_err();
        assert!(matches!(err, SynthgridError::EngineStart(_)));
        assert_eq!(transport.state(), TransportState::Stopped);
        assert!(engine.triggers.is_empty());
    }

    #[test]
    fn test_trigger_failure_does_not_stop_playback() {
        let arr = arrangement_with(&[(0, 0.0, 1.0), (1, 0.0, 1.0)]);
        let (mut transport, _clock) = scheduler();
        let mut engine = RecordingEngine {
            reject_patch: Some("p1".into()),
            ..Default::default()
        };

        transport.play(&arr, &mut engine).unwrap();
        assert!(transport.is_playing());
        assert_eq!(engine.triggers.len(), 1);
        assert_eq!(engine.triggers[0].patch.name, "p2");
    }

    #[test]
    fn test_recompile_while_playing_rearms_from_now() {
        let mut arr = arrangement_with(&[(0, 0.0, 8.0)]);
        let (mut transport, clock) = scheduler();
        let mut engine = RecordingEngine::default();

        transport.play(&arr, &mut engine).unwrap();
        clock.set(1.0);
        transport.tick(&mut engine);

        arr.add_clip(0, 2.1, 1.0, Some(PatchSummary::new(7, "added")));
        transport.recompile(&arr, &mut engine);
        assert_eq!(engine.triggers.len(), 2);
        assert_eq!(engine.triggers[1].patch.name, "added");
        assert!((engine.triggers[1].at_secs - 1.05).abs() < 1e-9);
    }

    #[test]
    fn test_stalled_tick_skips_overdue_loop_passes() {
        let mut arr = arrangement_with(&[(0, 2.0, 1.0)]);
        arr.set_loop_region(Some(LoopRegion { start_sec: 1.0, end_sec: 1.5 }));
        let (mut transport, clock) = scheduler();
        let mut engine = RecordingEngine::default();

        transport.play(&arr, &mut engine).unwrap();
        assert_eq!(engine.triggers.len(), 1);

        // A minute without ticks covers 120 loop passes
        clock.set(60.0);
        transport.tick(&mut engine);
        assert!(engine.triggers.len() <= 2);

        let mut t = 60.0;
        while t < 62.0 {
            t += 0.05;
            clock.set(t);
            transport.tick(&mut engine);
        }

        let late: Vec<f64> = engine.triggers[1..].iter().map(|t| t.at_secs).collect();
        assert!(late.len() >= 4 && late.len() <= 6);
        assert!(late.iter().all(|at| *at >= 60.0 - DEFAULT_LOOKAHEAD_SECS));
        for pair in late.windows(2) {
            assert!((pair[1] - pair[0] - 0.5).abs() < 1e-9);
        }
    }

    #[test]
    fn test_stalled_tick_without_loop_drops_passed_clips() {
        let arr = arrangement_with(&[(0, 0.0, 1.0), (0, 2.0, 1.0), (0, 8.0, 1.0)]);
        let (mut transport, clock) = scheduler();
        let mut engine = RecordingEngine::default();

        transport.play(&arr, &mut engine).unwrap();
        assert_eq!(engine.triggers.len(), 1);

        // Jump past the clip at 1 s straight to just before the one at 4 s
        clock.set(3.95);
        transport.tick(&mut engine);
        assert_eq!(engine.triggers.len(), 2);
        assert_eq!(engine.triggers[1].patch.name, "p3");
        assert!((engine.triggers[1].at_secs - 4.0).abs() < 1e-9);
    }
}
