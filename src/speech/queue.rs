// Announcement queue
//
// Single-consumer FIFO of spoken announcements. At most one utterance is in
// flight; the next one starts only after the engine reports completion.
// Voice and prosody settings are read when an utterance starts, so a settings
// change affects only announcements that have not started yet. There is no
// cancellation: an accepted announcement always plays.

use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::engine::{SpeechEngine, Utterance};
use super::voices::VoiceCache;
use crate::config::SpeechConfig;
use crate::error::ChatError;

/// Text to announce and who wrote it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnouncementTask {
    pub text: String,
    pub speaker: String,
}

impl AnnouncementTask {
    pub fn new(text: impl Into<String>, speaker: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            speaker: speaker.into(),
        }
    }

    /// Phrase spoken for this task
    pub fn phrase(&self) -> String {
        format!("{} says: {}", self.speaker, self.text)
    }
}

pub const RATE_RANGE: (f32, f32) = (0.5, 2.0);
pub const PITCH_RANGE: (f32, f32) = (0.5, 2.0);
pub const VOLUME_RANGE: (f32, f32) = (0.0, 1.0);

/// User-adjustable speech settings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeechSettings {
    pub enabled: bool,
    /// Selected voice name; empty or unknown falls back to the engine default
    pub voice: String,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            voice: String::new(),
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
        }
    }
}

impl SpeechSettings {
    pub fn from_config(config: &SpeechConfig) -> Self {
        Self {
            enabled: config.enabled,
            voice: config.voice.clone(),
            rate: config.rate.clamp(RATE_RANGE.0, RATE_RANGE.1),
            pitch: config.pitch.clamp(PITCH_RANGE.0, PITCH_RANGE.1),
            volume: config.volume.clamp(VOLUME_RANGE.0, VOLUME_RANGE.1),
        }
    }

    /// Build the utterance for `task` with the current settings
    pub fn utterance(&self, task: &AnnouncementTask, voices: &VoiceCache) -> Utterance {
        Utterance {
            text: task.phrase(),
            voice: voices.find(&self.voice).cloned(),
            rate: self.rate,
            pitch: self.pitch,
            volume: self.volume,
        }
    }
}

/// Completion report for one utterance
#[derive(Debug)]
pub struct PlaybackOutcome {
    pub task: AnnouncementTask,
    pub result: Result<(), ChatError>,
}

/// Sequential announcement player
///
/// The owner drives it: `enqueue` starts playback when idle, and each
/// `completed()` outcome must be handed back through `finish`, which starts
/// the next task.
pub struct AnnouncementQueue {
    engine: Arc<dyn SpeechEngine>,
    pending: VecDeque<AnnouncementTask>,
    speaking: bool,
    done_tx: mpsc::UnboundedSender<PlaybackOutcome>,
    done_rx: mpsc::UnboundedReceiver<PlaybackOutcome>,
}

impl AnnouncementQueue {
    pub fn new(engine: Arc<dyn SpeechEngine>) -> Self {
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        Self {
            engine,
            pending: VecDeque::new(),
            speaking: false,
            done_tx,
            done_rx,
        }
    }

    /// Submit a task
    ///
    /// Dropped when speech is disabled or the text is blank. Returns whether
    /// the task was accepted.
    pub fn enqueue(
        &mut self,
        task: AnnouncementTask,
        settings: &SpeechSettings,
        voices: &VoiceCache,
    ) -> bool {
        if !settings.enabled || task.text.trim().is_empty() {
            debug!("Dropping announcement from {}", task.speaker);
            return false;
        }

        self.pending.push_back(task);
        if !self.speaking {
            self.drain_step(settings, voices);
        }
        true
    }

    /// Wait for the in-flight utterance to finish
    ///
    /// Returns `None` when nothing is playing.
    pub async fn completed(&mut self) -> Option<PlaybackOutcome> {
        if !self.speaking {
            return None;
        }
        self.done_rx.recv().await
    }

    /// Account for a finished utterance and start the next one
    pub fn finish(
        &mut self,
        outcome: &PlaybackOutcome,
        settings: &SpeechSettings,
        voices: &VoiceCache,
    ) {
        match &outcome.result {
            Ok(()) => debug!("Finished announcement from {}", outcome.task.speaker),
            Err(e) => warn!(
                "Skipping failed announcement from {}: {}",
                outcome.task.speaker, e
            ),
        }
        self.drain_step(settings, voices);
    }

    fn drain_step(&mut self, settings: &SpeechSettings, voices: &VoiceCache) {
        let Some(task) = self.pending.pop_front() else {
            self.speaking = false;
            return;
        };

        self.speaking = true;
        let utterance = settings.utterance(&task, voices);
        if utterance.voice.is_none() && !settings.voice.is_empty() {
            debug!("Voice {:?} unavailable, using engine default", settings.voice);
        }

        info!("Announcing message from {}", task.speaker);

        let engine = Arc::clone(&self.engine);
        let done = self.done_tx.clone();
        tokio::spawn(async move {
            let result = engine
                .speak(utterance)
                .await
                .map_err(|e| ChatError::Synthesis(format!("{:#}", e)));
            // Receiver lives as long as the queue
            let _ = done.send(PlaybackOutcome { task, result });
        });
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking
    }

    /// Tasks waiting behind the in-flight one
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
