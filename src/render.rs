// Text renderer
//
// Immediate mode: the whole screen is rebuilt from the view state after every
// mutation. Nothing is diffed or cached between frames.

use chrono::{DateTime, Local, Utc};
use std::fmt::Write;

use crate::feed::{MediaType, Message};
use crate::session::{ConnectionStatus, ViewState};

const TITLE: &str = "TTS Chat";
const RULE: &str = "────────────────────────────────────────";

/// Render the current screen
pub fn render(state: &ViewState) -> String {
    if state.joined {
        render_chat_screen(state)
    } else {
        render_login_screen()
    }
}

fn render_login_screen() -> String {
    format!(
        "Welcome to {}\n{}\nEnter your username and press Enter to join.\n",
        TITLE, RULE
    )
}

fn render_chat_screen(state: &ViewState) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "🔊 {}  [{}]  speech {}",
        TITLE,
        state.username,
        if state.settings.enabled { "on" } else { "off" }
    );

    match state.connection {
        ConnectionStatus::Connecting => {
            let _ = writeln!(out, "… connecting to message feed");
        }
        ConnectionStatus::Lost => {
            let _ = writeln!(out, "⚠ connection to message feed lost");
        }
        ConnectionStatus::Connected => {}
    }
    if let Some(notice) = &state.notice {
        let _ = writeln!(out, "⚠ {}", notice);
    }

    if state.show_settings {
        render_settings(&mut out, state);
    }

    let _ = writeln!(out, "{}", RULE);
    for message in &state.messages {
        render_message(&mut out, message, state.copied_id.as_deref());
    }
    let _ = writeln!(out, "{}", RULE);

    if let Some(attachment) = &state.attachment {
        let _ = writeln!(
            out,
            "📎 {} ({}, {} bytes)  /remove to discard",
            attachment.file_name,
            media_label(attachment.media_type),
            attachment.size_bytes
        );
    }

    let _ = write!(out, "> {}", state.draft);
    out
}

fn render_settings(out: &mut String, state: &ViewState) {
    let settings = &state.settings;

    let _ = writeln!(out, "TTS Settings");
    if state.voices.is_empty() {
        let _ = writeln!(out, "  Voice: engine default");
    } else {
        let _ = writeln!(out, "  Voice:");
        for voice in state.voices.all() {
            let marker = if voice.name == settings.voice { "●" } else { "○" };
            let _ = writeln!(out, "    {} {} ({})", marker, voice.name, voice.lang);
        }
    }
    let _ = writeln!(out, "  Speed: {:.1}x", settings.rate);
    let _ = writeln!(out, "  Pitch: {:.1}", settings.pitch);
    let _ = writeln!(out, "  Volume: {:.0}%", settings.volume * 100.0);
    let _ = writeln!(
        out,
        "  [{}] Enable Text-to-Speech",
        if settings.enabled { "x" } else { " " }
    );
}

fn render_message(out: &mut String, message: &Message, copied_id: Option<&str>) {
    let avatar = message
        .username
        .chars()
        .next()
        .map(|c| c.to_uppercase().to_string())
        .unwrap_or_else(|| "?".to_string());

    let _ = writeln!(
        out,
        "({}) {}  {}  #{}",
        avatar,
        message.username,
        format_time(message.timestamp),
        message.id
    );

    if let (Some(media), Some(media_type)) = (&message.media, message.media_type) {
        let _ = writeln!(out, "    [{}: {} bytes]", media_label(media_type), media.len());
    }

    if let Some(block) = message.code_block() {
        let copy = if copied_id == Some(message.id.as_str()) {
            "✓ Copied!"
        } else {
            "📋 Copy"
        };
        let _ = writeln!(out, "    ┌ {}  {}", block.language, copy);
        for line in block.code.lines() {
            let _ = writeln!(out, "    │ {}", line);
        }
        let _ = writeln!(out, "    └");
    } else if let Some(text) = message.text() {
        for line in text.lines() {
            let _ = writeln!(out, "    {}", line);
        }
    }
}

fn media_label(media_type: MediaType) -> &'static str {
    match media_type {
        MediaType::Image => "image",
        MediaType::Video => "video",
    }
}

fn format_time(timestamp_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(timestamp_ms)
        .map(|t| t.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string())
}
