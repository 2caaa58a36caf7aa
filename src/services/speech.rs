//! Speech output.
//!
//! Synthesis and playback are external; the router hands over a finished
//! reply and the voice settings of the active persona.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::persona::AudioEffects;

/// Acknowledgment text that is never spoken.
pub const SILENT_ACK: &str = "Ok";

/// Voice and effects of the active persona.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VoiceSettings {
    /// Voice identifier understood by the synthesizer.
    pub voice: String,
    /// Post-processing toggles.
    pub effects: AudioEffects,
}

impl VoiceSettings {
    /// Create voice settings.
    pub fn new(voice: impl Into<String>, effects: AudioEffects) -> Self {
        Self {
            voice: voice.into(),
            effects,
        }
    }
}

/// Whether `text` should reach the speaker at all.
pub fn should_speak(text: &str) -> bool {
    let text = text.trim();
    !text.is_empty() && text != SILENT_ACK
}

/// Text-to-speech sink.
#[async_trait]
pub trait SpeechOutput: Send + Sync {
    /// Synthesize and play `text`.
    async fn speak(&self, text: &str, voice: &VoiceSettings) -> Result<()>;
}

/// Writes replies to stdout, tagged with the voice. Used by the CLI.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSpeech;

#[async_trait]
impl SpeechOutput for ConsoleSpeech {
    async fn speak(&self, text: &str, voice: &VoiceSettings) -> Result<()> {
        let mut tags = Vec::new();
        if voice.effects.beep_on_receiving {
            tags.push("beep");
        }
        if voice.effects.radio {
            tags.push("radio");
        }
        if voice.effects.robot {
            tags.push("robot");
        }
        if tags.is_empty() {
            println!("[{}] {text}", voice.voice);
        } else {
            println!("[{} | {}] {text}", voice.voice, tags.join(","));
        }
        Ok(())
    }
}
