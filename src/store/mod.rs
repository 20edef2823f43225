// Storage backends for the repository traits

pub mod memory;
pub mod postgres;

pub use memory::{MemorySettingsStore, MemoryStore, RecordingEventSink};
pub use postgres::{PgSettingsStore, PgStore};
