//! synthgrid-services: Audio output, patch engine, persistence and repository access

pub mod audio_io;
pub mod patch_engine;
pub mod persistence;
pub mod rack_loader;
pub mod repository;

pub use audio_io::{AudioOutputError, DeviceClock, RealtimeOutputStream};
pub use patch_engine::{ChannelPatchEngine, EngineCommand, ScheduledTrigger, TriggerQueue};
pub use persistence::{read_json, PersistenceError, SessionStore};
pub use rack_loader::{load_composition, load_rack, save_composition};
pub use repository::{fetch_or_empty, HttpPatchRepository, PatchPage, PatchRepository, RepositoryError, DEFAULT_PAGE_SIZE};
