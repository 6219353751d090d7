// Shared test doubles for the speech engine and clipboard
#![allow(dead_code)]

use anyhow::Result;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tts_chat::{Clipboard, SpeechEngine, Utterance, Voice};

/// Speech engine that records utterances and tracks overlapping playback
#[derive(Default)]
pub struct RecordingEngine {
    utterances: Mutex<Vec<Utterance>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
    delay: Duration,
    voices: Vec<Voice>,
    fail_containing: Option<String>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_voices(mut self, names: &[&str]) -> Self {
        self.voices = names
            .iter()
            .map(|name| Voice {
                name: name.to_string(),
                lang: "en".to_string(),
            })
            .collect();
        self
    }

    /// Fail any utterance whose text contains `needle`
    pub fn failing_on(mut self, needle: &str) -> Self {
        self.fail_containing = Some(needle.to_string());
        self
    }

    pub fn utterances(&self) -> Vec<Utterance> {
        self.utterances.lock().unwrap().clone()
    }

    pub fn spoken(&self) -> Vec<String> {
        self.utterances().into_iter().map(|u| u.text).collect()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SpeechEngine for RecordingEngine {
    async fn voices(&self) -> Result<Vec<Voice>> {
        Ok(self.voices.clone())
    }

    async fn speak(&self, utterance: Utterance) -> Result<()> {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);

        let fail = self
            .fail_containing
            .as_ref()
            .map_or(false, |needle| utterance.text.contains(needle.as_str()));
        self.utterances.lock().unwrap().push(utterance);

        tokio::time::sleep(self.delay).await;
        self.active.fetch_sub(1, Ordering::SeqCst);

        if fail {
            anyhow::bail!("synthesizer crashed");
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Clipboard that keeps everything copied
#[derive(Default)]
pub struct RecordingClipboard {
    copied: Mutex<Vec<String>>,
}

impl RecordingClipboard {
    pub fn copied(&self) -> Vec<String> {
        self.copied.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Clipboard for RecordingClipboard {
    async fn copy(&self, text: &str) -> Result<()> {
        self.copied.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// Poll `condition` every 10ms until it holds, failing after 5 seconds
pub async fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {}", what);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
