use anyhow::{Context, Result};
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::config::ClipboardConfig;

/// System clipboard
#[async_trait::async_trait]
pub trait Clipboard: Send + Sync {
    async fn copy(&self, text: &str) -> Result<()>;
}

/// Build the clipboard from configuration (an empty program disables copying)
pub fn from_config(config: &ClipboardConfig) -> Arc<dyn Clipboard> {
    if config.program.trim().is_empty() {
        Arc::new(NoopClipboard)
    } else {
        Arc::new(CommandClipboard {
            program: config.program.clone(),
            args: config.args.clone(),
        })
    }
}

/// Pipes copied text into a program such as `xclip` or `pbcopy`
pub struct CommandClipboard {
    pub program: String,
    pub args: Vec<String>,
}

#[async_trait::async_trait]
impl Clipboard for CommandClipboard {
    async fn copy(&self, text: &str) -> Result<()> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to start {}", self.program))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .await
                .context("Failed to write clipboard text")?;
        }

        let status = child.wait().await.context("Failed to wait for clipboard")?;
        if !status.success() {
            anyhow::bail!("{} exited with {}", self.program, status);
        }

        debug!("Copied {} bytes to clipboard", text.len());
        Ok(())
    }
}

/// Discards copied text
pub struct NoopClipboard;

#[async_trait::async_trait]
impl Clipboard for NoopClipboard {
    async fn copy(&self, text: &str) -> Result<()> {
        debug!("Clipboard disabled, dropping {} bytes", text.len());
        Ok(())
    }
}
