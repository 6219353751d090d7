use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::SpeechConfig;

/// espeak-ng words per minute at rate 1.0
const BASE_WORDS_PER_MINUTE: f32 = 175.0;

/// A voice offered by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Voice {
    pub name: String,
    pub lang: String,
}

/// One phrase handed to the engine, with settings resolved at synthesis time
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    /// `None` plays with the engine default voice
    pub voice: Option<Voice>,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

/// Speech synthesis backend trait
///
/// Implementations:
/// - `CommandEngine`: espeak-ng compatible command line synthesizer
/// - `SilentEngine`: logs utterances without audio
#[async_trait::async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Enumerate available voices
    async fn voices(&self) -> Result<Vec<Voice>>;

    /// Play an utterance, returning once playback has finished
    async fn speak(&self, utterance: Utterance) -> Result<()>;

    /// Get engine name for logging
    fn name(&self) -> &str;
}

/// Engine selection in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Command,
    Silent,
}

/// Speech engine factory
pub struct SpeechEngineFactory;

impl SpeechEngineFactory {
    /// Create the engine named by configuration
    pub fn create(config: &SpeechConfig) -> Result<Arc<dyn SpeechEngine>> {
        match config.engine {
            EngineKind::Command => {
                if config.program.trim().is_empty() {
                    anyhow::bail!("speech.program must be set for the command engine");
                }
                Ok(Arc::new(CommandEngine::new(config.program.clone())))
            }
            EngineKind::Silent => Ok(Arc::new(SilentEngine)),
        }
    }
}

/// Synthesizer driven through an espeak-ng compatible CLI
pub struct CommandEngine {
    program: String,
}

impl CommandEngine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Arguments for one utterance; the text itself is written to stdin
    pub fn args(utterance: &Utterance) -> Vec<String> {
        let mut args = Vec::new();

        if let Some(voice) = &utterance.voice {
            args.push("-v".to_string());
            args.push(voice.name.clone());
        }

        let words_per_minute = (BASE_WORDS_PER_MINUTE * utterance.rate).round().max(80.0);
        let pitch = (50.0 * utterance.pitch).round().clamp(0.0, 99.0);
        let amplitude = (100.0 * utterance.volume).round().clamp(0.0, 200.0);

        args.push("-s".to_string());
        args.push(format!("{}", words_per_minute as u32));
        args.push("-p".to_string());
        args.push(format!("{}", pitch as u32));
        args.push("-a".to_string());
        args.push(format!("{}", amplitude as u32));
        args.push("--stdin".to_string());

        args
    }
}

/// Parse `espeak-ng --voices` output
///
/// ```text
/// Pty Language       Age/Gender VoiceName          File                 Other Languages
///  5  af              --/M      Afrikaans          gmw/af
/// ```
pub fn parse_voice_list(output: &str) -> Vec<Voice> {
    output
        .lines()
        .skip(1)
        .filter_map(|line| {
            let columns: Vec<&str> = line.split_whitespace().collect();
            if columns.len() < 4 {
                return None;
            }
            Some(Voice {
                name: columns[3].to_string(),
                lang: columns[1].to_string(),
            })
        })
        .collect()
}

#[async_trait::async_trait]
impl SpeechEngine for CommandEngine {
    async fn voices(&self) -> Result<Vec<Voice>> {
        let output = Command::new(&self.program)
            .arg("--voices")
            .output()
            .await
            .with_context(|| format!("Failed to run {} --voices", self.program))?;

        if !output.status.success() {
            anyhow::bail!(
                "{} --voices exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let voices = parse_voice_list(&String::from_utf8_lossy(&output.stdout));
        info!("Loaded {} voices from {}", voices.len(), self.program);
        Ok(voices)
    }

    async fn speak(&self, utterance: Utterance) -> Result<()> {
        debug!("Speaking: {}", utterance.text);

        let mut child = Command::new(&self.program)
            .args(Self::args(&utterance))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to start {}", self.program))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(utterance.text.as_bytes())
                .await
                .context("Failed to write utterance text")?;
            // Dropping stdin closes it so the synthesizer sees end of input
        }

        let output = child
            .wait_with_output()
            .await
            .context("Failed to wait for synthesizer")?;

        if !output.status.success() {
            anyhow::bail!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(())
    }

    fn name(&self) -> &str {
        &self.program
    }
}

/// Engine without audio output
pub struct SilentEngine;

#[async_trait::async_trait]
impl SpeechEngine for SilentEngine {
    async fn voices(&self) -> Result<Vec<Voice>> {
        Ok(Vec::new())
    }

    async fn speak(&self, utterance: Utterance) -> Result<()> {
        info!("(silent) {}", utterance.text);
        Ok(())
    }

    fn name(&self) -> &str {
        "silent"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utterance(voice: Option<&str>) -> Utterance {
        Utterance {
            text: "alice says: hi".to_string(),
            voice: voice.map(|name| Voice {
                name: name.to_string(),
                lang: "en".to_string(),
            }),
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
        }
    }

    #[test]
    fn test_args_default_voice() {
        let args = CommandEngine::args(&utterance(None));
        assert_eq!(args, vec!["-s", "175", "-p", "50", "-a", "100", "--stdin"]);
    }

    #[test]
    fn test_args_with_voice_and_settings() {
        let mut u = utterance(Some("English"));
        u.rate = 2.0;
        u.pitch = 2.0;
        u.volume = 0.5;

        let args = CommandEngine::args(&u);
        assert_eq!(
            args,
            vec!["-v", "English", "-s", "350", "-p", "99", "-a", "50", "--stdin"]
        );
    }

    #[test]
    fn test_parse_voice_list() {
        let output = "Pty Language       Age/Gender VoiceName          File                 Other Languages\n \
                      5  af              --/M      Afrikaans          gmw/af\n \
                      5  en-us           --/M      English_(America)  gmw/en-US            (en 2)\n\n";

        let voices = parse_voice_list(output);
        assert_eq!(voices.len(), 2);
        assert_eq!(voices[0].name, "Afrikaans");
        assert_eq!(voices[0].lang, "af");
        assert_eq!(voices[1].name, "English_(America)");
        assert_eq!(voices[1].lang, "en-us");
    }

    #[test]
    fn test_factory_rejects_empty_program() {
        let config = SpeechConfig {
            program: "  ".to_string(),
            ..SpeechConfig::default()
        };
        assert!(SpeechEngineFactory::create(&config).is_err());
    }
}
