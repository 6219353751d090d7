use crate::config::Config;
use crate::feed::Detection;
use crate::speech::SpeechSettings;

/// Configuration for a chat session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Unique client session identifier (e.g., "chat-3f2c...")
    pub session_id: String,

    /// Number of most recent messages kept in view
    /// Default: 50
    pub history_limit: usize,

    /// New-message detection used for announcements
    pub detection: Detection,

    /// Initial speech settings
    pub speech: SpeechSettings,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("chat-{}", uuid::Uuid::new_v4()),
            history_limit: 50,
            detection: Detection::default(),
            speech: SpeechSettings::default(),
        }
    }
}

impl SessionConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            history_limit: config.feed.history_limit,
            detection: config.feed.detection,
            speech: SpeechSettings::from_config(&config.speech),
            ..Self::default()
        }
    }
}
