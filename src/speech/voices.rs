use serde::Serialize;

use super::engine::Voice;

/// Voices reported by the engine at the last refresh
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VoiceCache {
    voices: Vec<Voice>,
}

impl VoiceCache {
    pub fn new(voices: Vec<Voice>) -> Self {
        Self { voices }
    }

    pub fn replace(&mut self, voices: Vec<Voice>) {
        self.voices = voices;
    }

    pub fn find(&self, name: &str) -> Option<&Voice> {
        self.voices.iter().find(|v| v.name == name)
    }

    pub fn first(&self) -> Option<&Voice> {
        self.voices.first()
    }

    pub fn all(&self) -> &[Voice] {
        &self.voices
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }
}
