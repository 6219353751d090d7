use std::path::PathBuf;

use crate::error::ChatError;
use crate::session::Action;

pub const HELP: &str = "\
Type a message and press Enter. Write \\n for a line break, e.g.
  ```rust\\nfn main() {}\\n```
Commands:
  /settings          toggle the settings panel
  /voice NAME        select a voice
  /voices            reload the voice list
  /rate X            speech rate (0.5 - 2.0)
  /pitch X           speech pitch (0.5 - 2.0)
  /volume X          speech volume (0.0 - 1.0)
  /tts on|off        enable or disable speech
  /upload PATH       attach an image or video
  /remove            discard the attachment
  /copy ID           copy a code block
  /dismiss           hide the last warning
  /quit              leave";

/// A parsed terminal input line
#[derive(Debug, Clone, PartialEq)]
pub enum InputCommand {
    /// Join with a username (login screen)
    Join(String),
    /// Send the text as a message
    Send(String),
    Apply(Action),
    Upload(PathBuf),
    Help,
    Quit,
}

/// Parse one line typed by the user
pub fn parse_line(line: &str, joined: bool) -> Result<InputCommand, ChatError> {
    if !joined {
        return Ok(InputCommand::Join(line.to_string()));
    }

    let Some(command) = line.strip_prefix('/') else {
        return Ok(InputCommand::Send(line.replace("\\n", "\n")));
    };

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };

    let action = match name {
        "settings" => Action::ToggleSettings,
        "voice" => Action::SelectVoice(required(name, arg)?.to_string()),
        "voices" => Action::RefreshVoices,
        "rate" => Action::SetRate(number(name, arg)?),
        "pitch" => Action::SetPitch(number(name, arg)?),
        "volume" => Action::SetVolume(number(name, arg)?),
        "tts" => match arg {
            "on" => Action::SetSpeechEnabled(true),
            "off" => Action::SetSpeechEnabled(false),
            _ => return Err(ChatError::validation("usage: /tts on|off")),
        },
        "upload" => return Ok(InputCommand::Upload(PathBuf::from(required(name, arg)?))),
        "remove" => Action::RemoveMedia,
        "copy" => Action::CopyCode(required(name, arg)?.to_string()),
        "dismiss" => Action::DismissNotice,
        "help" => return Ok(InputCommand::Help),
        "quit" | "exit" => return Ok(InputCommand::Quit),
        other => {
            return Err(ChatError::validation(format!(
                "unknown command /{} (try /help)",
                other
            )))
        }
    };

    Ok(InputCommand::Apply(action))
}

fn required<'a>(name: &str, arg: &'a str) -> Result<&'a str, ChatError> {
    if arg.is_empty() {
        Err(ChatError::validation(format!("/{} needs an argument", name)))
    } else {
        Ok(arg)
    }
}

fn number(name: &str, arg: &str) -> Result<f32, ChatError> {
    required(name, arg)?
        .parse()
        .map_err(|_| ChatError::validation(format!("/{} needs a number", name)))
}
