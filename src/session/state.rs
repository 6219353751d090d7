use serde::Serialize;
use std::time::Duration;

use crate::error::ChatError;
use crate::feed::{Message, MessageRecord};
use crate::media::MediaAttachment;
use crate::speech::queue::{PITCH_RANGE, RATE_RANGE, VOLUME_RANGE};
use crate::speech::{SpeechSettings, Voice, VoiceCache};

/// How long a "copied" indicator stays visible
pub const COPIED_INDICATOR: Duration = Duration::from_secs(2);

/// State of the remote log subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Lost,
}

/// Everything the renderer needs
///
/// Owned by the session actor; other tasks see clones.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    pub session_id: String,

    // Session
    pub username: String,
    pub joined: bool,

    /// Last snapshot from the remote log, in log order
    pub messages: Vec<Message>,

    // Compose
    pub draft: String,
    pub attachment: Option<MediaAttachment>,

    // Settings
    pub settings: SpeechSettings,
    pub voices: VoiceCache,

    // Transient UI
    pub show_settings: bool,
    pub copied_id: Option<String>,
    pub connection: ConnectionStatus,
    /// Last user-visible failure (speech, send)
    pub notice: Option<String>,
}

/// A user-triggered mutation
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SetUsername(String),
    EditDraft(String),
    SendMessage,
    AttachMedia(MediaAttachment),
    RemoveMedia,
    ToggleSettings,
    SelectVoice(String),
    SetRate(f32),
    SetPitch(f32),
    SetVolume(f32),
    SetSpeechEnabled(bool),
    /// Several settings at once; nothing changes if any value is rejected
    UpdateSettings(SettingsUpdate),
    /// Copy the code of a fenced-code message
    CopyCode(String),
    RefreshVoices,
    DismissNotice,
}

/// Speech settings to change; `None` leaves a field as it is
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsUpdate {
    pub enabled: Option<bool>,
    pub voice: Option<String>,
    pub rate: Option<f32>,
    pub pitch: Option<f32>,
    pub volume: Option<f32>,
}

/// Side effects requested by an action, run by the session
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Append(MessageRecord),
    CopyToClipboard(String),
    ClearCopiedAfter { id: String, delay: Duration },
    LoadVoices,
}

impl ViewState {
    pub fn new(session_id: String, settings: SpeechSettings) -> Self {
        Self {
            session_id,
            username: String::new(),
            joined: false,
            messages: Vec::new(),
            draft: String::new(),
            attachment: None,
            settings,
            voices: VoiceCache::default(),
            show_settings: false,
            copied_id: None,
            connection: ConnectionStatus::Connecting,
            notice: None,
        }
    }

    /// Apply an action, returning the effects it requires
    ///
    /// `now_ms` stamps outgoing messages. On error the state is unchanged.
    pub fn apply(&mut self, action: Action, now_ms: i64) -> Result<Vec<Effect>, ChatError> {
        match action {
            Action::SetUsername(name) => {
                if self.joined {
                    return Err(ChatError::validation("username is already set"));
                }
                let name = name.trim();
                if name.is_empty() {
                    return Err(ChatError::validation("username must not be empty"));
                }
                self.username = name.to_string();
                self.joined = true;
                Ok(Vec::new())
            }
            Action::EditDraft(text) => {
                self.draft = text;
                Ok(Vec::new())
            }
            Action::SendMessage => self.send(now_ms),
            Action::AttachMedia(attachment) => {
                self.attachment = Some(attachment);
                Ok(Vec::new())
            }
            Action::RemoveMedia => {
                self.attachment = None;
                Ok(Vec::new())
            }
            Action::ToggleSettings => {
                self.show_settings = !self.show_settings;
                Ok(Vec::new())
            }
            Action::SelectVoice(name) => {
                self.settings.voice = name;
                Ok(Vec::new())
            }
            Action::SetRate(rate) => {
                self.settings.rate = clamp_setting("rate", rate, RATE_RANGE)?;
                Ok(Vec::new())
            }
            Action::SetPitch(pitch) => {
                self.settings.pitch = clamp_setting("pitch", pitch, PITCH_RANGE)?;
                Ok(Vec::new())
            }
            Action::SetVolume(volume) => {
                self.settings.volume = clamp_setting("volume", volume, VOLUME_RANGE)?;
                Ok(Vec::new())
            }
            Action::SetSpeechEnabled(enabled) => {
                self.settings.enabled = enabled;
                Ok(Vec::new())
            }
            Action::UpdateSettings(update) => {
                self.update_settings(update)?;
                Ok(Vec::new())
            }
            Action::CopyCode(id) => self.copy_code(id),
            Action::RefreshVoices => Ok(vec![Effect::LoadVoices]),
            Action::DismissNotice => {
                self.notice = None;
                Ok(Vec::new())
            }
        }
    }

    fn send(&mut self, now_ms: i64) -> Result<Vec<Effect>, ChatError> {
        if !self.joined {
            return Err(ChatError::validation("set a username before sending"));
        }

        let text = self.draft.trim();
        if text.is_empty() && self.attachment.is_none() {
            return Ok(Vec::new());
        }

        let record = MessageRecord {
            username: self.username.clone(),
            text: (!text.is_empty()).then(|| text.to_string()),
            timestamp: now_ms,
            media: self.attachment.as_ref().map(|a| a.data_url.clone()),
            media_type: self.attachment.as_ref().map(|a| a.media_type),
        };

        // Shown only once the log echoes it back in a snapshot
        self.draft.clear();
        self.attachment = None;

        Ok(vec![Effect::Append(record)])
    }

    fn update_settings(&mut self, update: SettingsUpdate) -> Result<(), ChatError> {
        let clamp = |name: &'static str, value: Option<f32>, range: (f32, f32)| {
            value.map(|v| clamp_setting(name, v, range)).transpose()
        };
        let rate = clamp("rate", update.rate, RATE_RANGE)?;
        let pitch = clamp("pitch", update.pitch, PITCH_RANGE)?;
        let volume = clamp("volume", update.volume, VOLUME_RANGE)?;

        let settings = &mut self.settings;
        if let Some(enabled) = update.enabled {
            settings.enabled = enabled;
        }
        if let Some(voice) = update.voice {
            settings.voice = voice;
        }
        if let Some(rate) = rate {
            settings.rate = rate;
        }
        if let Some(pitch) = pitch {
            settings.pitch = pitch;
        }
        if let Some(volume) = volume {
            settings.volume = volume;
        }
        Ok(())
    }

    fn copy_code(&mut self, id: String) -> Result<Vec<Effect>, ChatError> {
        let message = self
            .messages
            .iter()
            .find(|m| m.id == id)
            .ok_or_else(|| ChatError::validation(format!("no message with id {}", id)))?;

        let block = message
            .code_block()
            .ok_or_else(|| ChatError::validation("message is not a code block"))?;

        self.copied_id = Some(id.clone());

        Ok(vec![
            Effect::CopyToClipboard(block.code),
            Effect::ClearCopiedAfter {
                id,
                delay: COPIED_INDICATOR,
            },
        ])
    }

    /// Clear the copied indicator if it still points at `id`
    pub fn clear_copied(&mut self, id: &str) {
        if self.copied_id.as_deref() == Some(id) {
            self.copied_id = None;
        }
    }

    /// Replace the voice cache; selects the first voice if none is chosen
    pub fn voices_loaded(&mut self, voices: Vec<Voice>) {
        self.voices.replace(voices);
        if self.settings.voice.is_empty() {
            if let Some(first) = self.voices.first() {
                self.settings.voice = first.name.clone();
            }
        }
    }
}

fn clamp_setting(name: &str, value: f32, (min, max): (f32, f32)) -> Result<f32, ChatError> {
    if !value.is_finite() {
        return Err(ChatError::validation(format!("{} must be a number", name)));
    }
    Ok(value.clamp(min, max))
}
