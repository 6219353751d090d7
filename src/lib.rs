pub mod clipboard;
pub mod config;
pub mod error;
pub mod feed;
pub mod http;
pub mod input;
pub mod media;
pub mod render;
pub mod session;
pub mod speech;

pub use clipboard::{Clipboard, CommandClipboard, NoopClipboard};
pub use config::Config;
pub use error::ChatError;
pub use feed::{
    Detection, FeedAdapter, LogServer, MediaType, MemoryLog, Message, MessageRecord, NatsLog,
    RemoteLog, Snapshot,
};
pub use http::{create_router, AppState};
pub use media::MediaAttachment;
pub use session::{
    Action, ChatSession, ConnectionStatus, SessionConfig, SessionHandle, SettingsUpdate, ViewState,
};
pub use speech::{
    AnnouncementQueue, AnnouncementTask, SpeechEngine, SpeechEngineFactory, SpeechSettings,
    Utterance, Voice,
};
