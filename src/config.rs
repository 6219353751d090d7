use anyhow::Result;
use serde::Deserialize;

use crate::feed::Detection;
use crate::speech::EngineKind;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
    #[serde(default)]
    pub clipboard: ClipboardConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default)]
    pub enabled: bool,
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind: "127.0.0.1".to_string(),
            port: 8088,
        }
    }
}

/// Which remote log implementation backs the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedBackend {
    Nats,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub backend: FeedBackend,
    pub nats_url: String,
    /// Subjects are `<prefix>.append`, `<prefix>.snapshot` and `<prefix>.fetch`
    pub subject_prefix: String,
    /// Number of most recent records kept in each snapshot
    pub history_limit: usize,
    pub detection: Detection,
    pub connect_retries: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            backend: FeedBackend::Nats,
            nats_url: "nats://localhost:4222".to_string(),
            subject_prefix: "chat.messages".to_string(),
            history_limit: 50,
            detection: Detection::Length,
            connect_retries: 5,
            backoff_base_ms: 250,
            backoff_max_ms: 8000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub engine: EngineKind,
    /// espeak-ng compatible program used by the command engine
    pub program: String,
    pub enabled: bool,
    /// Preferred voice name; empty selects the first available voice
    pub voice: String,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::Command,
            program: "espeak-ng".to_string(),
            enabled: true,
            voice: String::new(),
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClipboardConfig {
    /// Program receiving copied text on stdin; empty disables copying
    pub program: String,
    pub args: Vec<String>,
}

impl Default for ClipboardConfig {
    fn default() -> Self {
        Self {
            program: "xclip".to_string(),
            args: vec!["-selection".to_string(), "clipboard".to_string()],
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("TTS_CHAT").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Parse a TOML document directly (used by tests and embedded defaults)
    pub fn from_toml(source: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let cfg = Config::from_toml("[service]\nname = \"chat\"\n").unwrap();

        assert_eq!(cfg.service.name, "chat");
        assert!(!cfg.service.http.enabled);
        assert_eq!(cfg.feed.history_limit, 50);
        assert_eq!(cfg.feed.detection, Detection::Length);
        assert_eq!(cfg.feed.backend, FeedBackend::Nats);
        assert!(cfg.speech.enabled);
        assert_eq!(cfg.speech.rate, 1.0);
    }

    #[test]
    fn test_config_overrides() {
        let cfg = Config::from_toml(
            r#"
            [service]
            name = "chat"

            [feed]
            backend = "memory"
            detection = "ids"
            history_limit = 10

            [speech]
            engine = "silent"
            voice = "en-us"
            volume = 0.5
            "#,
        )
        .unwrap();

        assert_eq!(cfg.feed.backend, FeedBackend::Memory);
        assert_eq!(cfg.feed.detection, Detection::Ids);
        assert_eq!(cfg.feed.history_limit, 10);
        assert_eq!(cfg.feed.subject_prefix, "chat.messages");
        assert_eq!(cfg.speech.engine, EngineKind::Silent);
        assert_eq!(cfg.speech.voice, "en-us");
        assert_eq!(cfg.speech.volume, 0.5);
    }
}
