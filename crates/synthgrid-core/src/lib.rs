//! synthgrid-core: Domain types for the synthgrid clip arranger

mod arrangement;
mod clip;
pub mod composition;
mod engine;
mod error;
mod geometry;
pub mod interaction;
mod lane;
mod loop_region;
mod patch;
pub mod rack;
mod schedule;
mod selection;
mod session;
mod store;
mod timeline;
mod transport;

pub use arrangement::{Arrangement, ArrangementSnapshot};
pub use clip::{Clip, ClipEdge, ClipId, MIN_CLIP_BEATS};
pub use composition::{Composition, CompositionItem};
pub use engine::{Clock, PatchEngine, SystemClock};
pub use error::{EngineError, Result, SynthgridError};
pub use geometry::{snap, GridGeometry, SNAP_STEP};
pub use interaction::{
    Gesture, GestureMode, GestureOutcome, InteractionController, Modifiers, Pointer, EDGE_HIT_PX,
};
pub use lane::{lane_audible, Lane, LaneColor, LaneRegistry, MAX_LANES};
pub use loop_region::{LoopPicker, LoopRegion, PickerState, MIN_LOOP_SECS};
pub use patch::{PatchId, PatchSummary};
pub use rack::{Rack, RackLane, RACK_STEPS};
pub use schedule::{compile_schedule, TriggerEvent};
pub use selection::{Selection, SelectionController};
pub use session::{LaneMeta, Session, SessionSnapshot};
pub use store::ClipStore;
pub use timeline::{Timeline, DEFAULT_BPM, DEFAULT_LENGTH_BEATS, DEFAULT_PX_PER_BEAT, MAX_BPM, MIN_BPM};
pub use transport::{TickReport, TransportScheduler, TransportState, DEFAULT_LOOKAHEAD_SECS};

/// Deterministic clock and engine for driving the transport in tests
#[doc(hidden)]
pub mod testing {
    pub use crate::engine::{ManualClock, RecordedTrigger, RecordingEngine};
}
