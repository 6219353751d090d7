// End-to-end session behavior over an in-memory log

mod common;

use anyhow::Result;
use common::{wait_until, RecordingClipboard, RecordingEngine};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tts_chat::feed::{Detection, MemoryLog, MessageRecord, Snapshot};
use tts_chat::{
    Action, ChatSession, ConnectionStatus, RemoteLog, SessionConfig, SessionHandle, ViewState,
};

fn record(username: &str, text: &str) -> MessageRecord {
    MessageRecord {
        username: username.to_string(),
        text: Some(text.to_string()),
        timestamp: 1_700_000_000_000,
        media: None,
        media_type: None,
    }
}

async fn start(
    log: Arc<dyn RemoteLog>,
    engine: Arc<RecordingEngine>,
    clipboard: Arc<RecordingClipboard>,
) -> SessionHandle {
    let config = SessionConfig {
        session_id: "test-session".to_string(),
        detection: Detection::Length,
        ..SessionConfig::default()
    };
    ChatSession::new(config, log, engine, clipboard)
        .start()
        .await
        .unwrap()
}

async fn wait_for(session: &SessionHandle, predicate: impl FnMut(&ViewState) -> bool) -> ViewState {
    tokio::time::timeout(Duration::from_secs(5), session.wait_for(predicate))
        .await
        .expect("timed out waiting for view state")
        .unwrap()
}

async fn joined_session(
    log: &MemoryLog,
    engine: &Arc<RecordingEngine>,
    clipboard: &Arc<RecordingClipboard>,
    username: &str,
) -> SessionHandle {
    let session = start(Arc::new(log.clone()), engine.clone(), clipboard.clone()).await;
    session
        .dispatch(Action::SetUsername(username.to_string()))
        .await
        .unwrap();
    wait_for(&session, |v| v.connection == ConnectionStatus::Connected).await;
    session
}

#[tokio::test]
async fn test_sent_message_appears_after_echo() {
    let log = MemoryLog::new(100);
    let engine = Arc::new(RecordingEngine::new());
    let clipboard = Arc::new(RecordingClipboard::default());
    let session = joined_session(&log, &engine, &clipboard, "alice").await;

    session.send_text("  hello  ").await.unwrap();
    assert!(session.view().draft.is_empty());

    let view = wait_for(&session, |v| v.messages.len() == 1).await;
    let message = &view.messages[0];
    assert_eq!(message.username, "alice");
    assert_eq!(message.text.as_deref(), Some("hello"));

    let stored = log.snapshot(50).await.into_messages();
    assert_eq!(stored[0].id, message.id);
    assert!(engine.spoken().is_empty(), "own messages are not announced");

    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_whitespace_send_writes_nothing() {
    let log = MemoryLog::new(100);
    let engine = Arc::new(RecordingEngine::new());
    let clipboard = Arc::new(RecordingClipboard::default());
    let session = joined_session(&log, &engine, &clipboard, "alice").await;

    session.send_text("   \t ").await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(log.snapshot(50).await.is_empty());
    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_messages_from_others_are_announced_in_order() {
    let log = MemoryLog::new(100);
    let engine = Arc::new(RecordingEngine::new().with_delay(Duration::from_millis(20)));
    let clipboard = Arc::new(RecordingClipboard::default());
    let session = joined_session(&log, &engine, &clipboard, "alice").await;

    // Growth from an empty list is not announced
    log.push(record("bob", "first")).await;
    wait_for(&session, |v| v.messages.len() == 1).await;

    log.push(record("bob", "second")).await;
    log.push(record("alice", "mine")).await;
    log.push(record("carol", "third")).await;
    wait_for(&session, |v| v.messages.len() == 4).await;

    wait_until("two announcements", || engine.spoken().len() == 2).await;
    assert_eq!(engine.spoken(), vec!["bob says: second", "carol says: third"]);
    assert_eq!(engine.max_concurrent(), 1);

    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_disabled_speech_suppresses_announcements() {
    let log = MemoryLog::new(100);
    let engine = Arc::new(RecordingEngine::new());
    let clipboard = Arc::new(RecordingClipboard::default());
    let session = joined_session(&log, &engine, &clipboard, "alice").await;

    session
        .dispatch(Action::SetSpeechEnabled(false))
        .await
        .unwrap();

    log.push(record("bob", "one")).await;
    log.push(record("bob", "two")).await;
    wait_for(&session, |v| v.messages.len() == 2).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(engine.spoken().is_empty());
    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_copy_code_uses_clipboard_and_clears_indicator() {
    let log = MemoryLog::new(100);
    let engine = Arc::new(RecordingEngine::new());
    let clipboard = Arc::new(RecordingClipboard::default());
    let session = joined_session(&log, &engine, &clipboard, "alice").await;

    let id = log
        .push(record("bob", "```rust\nlet x = 1;\nlet y = 2;\n```"))
        .await;
    wait_for(&session, |v| v.messages.len() == 1).await;

    session.dispatch(Action::CopyCode(id.clone())).await.unwrap();
    assert_eq!(session.view().copied_id.as_deref(), Some(id.as_str()));
    assert!(session.frame().contains("✓ Copied!"));

    wait_until("clipboard write", || !clipboard.copied().is_empty()).await;
    assert_eq!(clipboard.copied(), vec!["let x = 1;\nlet y = 2;"]);

    wait_for(&session, |v| v.copied_id.is_none()).await;
    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_username_accepted_once() {
    let log = MemoryLog::new(100);
    let engine = Arc::new(RecordingEngine::new());
    let clipboard = Arc::new(RecordingClipboard::default());
    let session = start(Arc::new(log.clone()), engine, clipboard).await;

    let err = session
        .dispatch(Action::SetUsername("   ".to_string()))
        .await
        .unwrap_err();
    assert!(err.is_user_facing());
    assert!(!session.view().joined);

    session
        .dispatch(Action::SetUsername("alice".to_string()))
        .await
        .unwrap();
    assert!(session
        .dispatch(Action::SetUsername("mallory".to_string()))
        .await
        .is_err());
    assert_eq!(session.view().username, "alice");

    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_voices_loaded_on_start() {
    let log = MemoryLog::new(100);
    let engine = Arc::new(RecordingEngine::new().with_voices(&["Alpha", "Beta"]));
    let clipboard = Arc::new(RecordingClipboard::default());
    let session = start(Arc::new(log), engine, clipboard).await;

    let view = wait_for(&session, |v| v.voices.len() == 2).await;
    assert_eq!(view.settings.voice, "Alpha");

    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_synthesis_failure_is_surfaced() {
    let log = MemoryLog::new(100);
    let engine = Arc::new(RecordingEngine::new().failing_on("boom"));
    let clipboard = Arc::new(RecordingClipboard::default());
    let session = joined_session(&log, &engine, &clipboard, "alice").await;

    log.push(record("bob", "warmup")).await;
    wait_for(&session, |v| v.messages.len() == 1).await;
    log.push(record("bob", "boom")).await;

    let view = wait_for(&session, |v| v.notice.is_some()).await;
    assert!(view.notice.unwrap().contains("synthesizer crashed"));

    session.dispatch(Action::DismissNotice).await.unwrap();
    assert!(session.view().notice.is_none());
    session.shutdown().await.unwrap();
}

/// Log whose subscription ends right after the first snapshot
struct ClosingLog;

#[async_trait::async_trait]
impl RemoteLog for ClosingLog {
    async fn subscribe(&self, _limit: usize) -> Result<mpsc::Receiver<Snapshot>> {
        let (tx, rx) = mpsc::channel(1);
        tx.send(Snapshot::default()).await?;
        Ok(rx)
    }

    async fn append(&self, _record: MessageRecord) -> Result<()> {
        anyhow::bail!("not connected")
    }

    fn name(&self) -> &str {
        "closing"
    }
}

#[tokio::test]
async fn test_connection_loss_and_send_failure_are_surfaced() {
    let engine = Arc::new(RecordingEngine::new());
    let clipboard = Arc::new(RecordingClipboard::default());
    let session = start(Arc::new(ClosingLog), engine, clipboard).await;

    let view = wait_for(&session, |v| v.connection == ConnectionStatus::Lost).await;
    assert!(view.messages.is_empty());
    assert_eq!(
        view.notice.as_deref(),
        Some("connection error: message feed subscription ended")
    );
    assert!(session.frame().contains("Welcome to TTS Chat"));

    session
        .dispatch(Action::SetUsername("alice".to_string()))
        .await
        .unwrap();
    assert!(session.frame().contains("connection to message feed lost"));

    session.send_text("hello").await.unwrap();
    let view = wait_for(&session, |v| {
        v.notice
            .as_deref()
            .is_some_and(|n| n.starts_with("Message not sent"))
    })
    .await;
    assert!(view.notice.unwrap().contains("not connected"));

    session.shutdown().await.unwrap();
}
