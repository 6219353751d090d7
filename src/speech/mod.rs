//! Speech announcements
//!
//! - `SpeechEngine` abstracts the platform synthesizer
//! - `VoiceCache` holds the engine's voice list between refreshes
//! - `AnnouncementQueue` plays announcements one at a time, in order

pub mod engine;
pub mod queue;
pub mod voices;

pub use engine::{CommandEngine, EngineKind, SilentEngine, SpeechEngine, SpeechEngineFactory, Utterance, Voice};
pub use queue::{AnnouncementQueue, AnnouncementTask, PlaybackOutcome, SpeechSettings};
pub use voices::VoiceCache;
