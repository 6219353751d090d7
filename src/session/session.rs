use super::config::SessionConfig;
use super::state::{Action, ConnectionStatus, Effect, ViewState};
use crate::clipboard::Clipboard;
use crate::error::ChatError;
use crate::feed::{FeedAdapter, RemoteLog, Snapshot};
use crate::media;
use crate::render::render;
use crate::speech::{AnnouncementQueue, PlaybackOutcome, SpeechEngine, Voice};
use anyhow::{Context, Result};
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

enum Command {
    Dispatch {
        action: Action,
        reply: oneshot::Sender<Result<(), ChatError>>,
    },
    Shutdown,
}

/// Completions of background work started by the actor
enum SessionEvent {
    VoicesLoaded(Result<Vec<Voice>>),
    CopiedExpired(String),
    AppendFailed(String),
}

/// A chat session: remote feed, announcements, and the view state
pub struct ChatSession {
    /// Session configuration
    config: SessionConfig,

    /// Remote message log
    log: Arc<dyn RemoteLog>,

    /// Speech engine used for announcements and the voice list
    engine: Arc<dyn SpeechEngine>,

    /// Clipboard for copying code blocks
    clipboard: Arc<dyn Clipboard>,
}

impl ChatSession {
    pub fn new(
        config: SessionConfig,
        log: Arc<dyn RemoteLog>,
        engine: Arc<dyn SpeechEngine>,
        clipboard: Arc<dyn Clipboard>,
    ) -> Self {
        Self {
            config,
            log,
            engine,
            clipboard,
        }
    }

    /// Subscribe to the remote log and start the session actor
    pub async fn start(self) -> Result<SessionHandle> {
        info!(
            "Starting chat session {} (log={}, engine={}, detection={:?})",
            self.config.session_id,
            self.log.name(),
            self.engine.name(),
            self.config.detection
        );

        let snapshots = self
            .log
            .subscribe(self.config.history_limit)
            .await
            .context("Failed to subscribe to remote log")?;

        let state = ViewState::new(self.config.session_id.clone(), self.config.speech.clone());

        let (command_tx, command_rx) = mpsc::channel(64);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(state.clone());
        let (frame_tx, frame_rx) = watch::channel(render(&state));

        let actor = SessionActor {
            adapter: FeedAdapter::new(self.config.detection),
            queue: AnnouncementQueue::new(Arc::clone(&self.engine)),
            state,
            log: self.log,
            engine: self.engine,
            clipboard: self.clipboard,
            events: event_tx,
            view_tx,
            frame_tx,
            feed_open: true,
        };

        let task = tokio::spawn(actor.run(command_rx, snapshots, event_rx));

        info!("Chat session started successfully");

        Ok(SessionHandle {
            commands: command_tx,
            view: view_rx,
            frames: frame_rx,
            task: Arc::new(Mutex::new(Some(task))),
        })
    }
}

/// Owner of the view state; every mutation happens on this task
struct SessionActor {
    adapter: FeedAdapter,
    queue: AnnouncementQueue,
    state: ViewState,
    log: Arc<dyn RemoteLog>,
    engine: Arc<dyn SpeechEngine>,
    clipboard: Arc<dyn Clipboard>,
    events: mpsc::UnboundedSender<SessionEvent>,
    view_tx: watch::Sender<ViewState>,
    frame_tx: watch::Sender<String>,
    /// Whether the snapshot subscription is still delivering
    feed_open: bool,
}

impl SessionActor {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut snapshots: mpsc::Receiver<Snapshot>,
        mut events: mpsc::UnboundedReceiver<SessionEvent>,
    ) {
        info!("Session actor started");

        self.run_effect(Effect::LoadVoices);

        loop {
            // Answered after publishing so callers observe the new state
            let mut answer = None;

            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Dispatch { action, reply }) => {
                        let result = self.dispatch(action);
                        if let Err(e) = &result {
                            debug!("Rejected action: {}", e);
                        }
                        answer = Some((reply, result));
                    }
                    Some(Command::Shutdown) | None => break,
                },
                snapshot = snapshots.recv(), if self.feed_open => match snapshot {
                    Some(snapshot) => self.on_snapshot(snapshot),
                    None => {
                        let lost = ChatError::Connection(
                            "message feed subscription ended".to_string(),
                        );
                        warn!("Remote log subscription lost: {}", lost);
                        self.feed_open = false;
                        self.state.connection = ConnectionStatus::Lost;
                        self.state.notice = Some(lost.to_string());
                    }
                },
                Some(outcome) = self.queue.completed(), if self.queue.is_speaking() => {
                    self.on_playback(outcome);
                }
                Some(event) = events.recv() => self.on_event(event),
            }

            self.publish();

            if let Some((reply, result)) = answer {
                let _ = reply.send(result);
            }
        }

        info!(
            "Session actor stopped ({} announcements still queued)",
            self.queue.pending_len()
        );
    }

    fn on_snapshot(&mut self, snapshot: Snapshot) {
        let update = self.adapter.reconcile(snapshot, &self.state.username);

        self.state.connection = ConnectionStatus::Connected;
        self.state.messages = update.messages;

        for task in update.announcements {
            self.queue
                .enqueue(task, &self.state.settings, &self.state.voices);
        }
    }

    fn on_playback(&mut self, outcome: PlaybackOutcome) {
        if let Err(e) = &outcome.result {
            self.state.notice = Some(e.to_string());
        }
        self.queue
            .finish(&outcome, &self.state.settings, &self.state.voices);
    }

    fn on_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::VoicesLoaded(Ok(voices)) => {
                info!("Voice list refreshed ({} voices)", voices.len());
                self.state.voices_loaded(voices);
            }
            SessionEvent::VoicesLoaded(Err(e)) => {
                warn!("Failed to load voices, using engine default: {:#}", e);
            }
            SessionEvent::CopiedExpired(id) => self.state.clear_copied(&id),
            SessionEvent::AppendFailed(reason) => {
                self.state.notice = Some(format!("Message not sent: {}", reason));
            }
        }
    }

    fn dispatch(&mut self, action: Action) -> Result<(), ChatError> {
        let effects = self.state.apply(action, Utc::now().timestamp_millis())?;
        for effect in effects {
            self.run_effect(effect);
        }
        Ok(())
    }

    fn run_effect(&self, effect: Effect) {
        match effect {
            Effect::Append(record) => {
                let log = Arc::clone(&self.log);
                let events = self.events.clone();
                tokio::spawn(async move {
                    if let Err(e) = log.append(record).await {
                        error!("Failed to append message: {:#}", e);
                        let _ = events.send(SessionEvent::AppendFailed(format!("{:#}", e)));
                    }
                });
            }
            Effect::CopyToClipboard(text) => {
                let clipboard = Arc::clone(&self.clipboard);
                tokio::spawn(async move {
                    if let Err(e) = clipboard.copy(&text).await {
                        warn!("Failed to copy to clipboard: {:#}", e);
                    }
                });
            }
            Effect::ClearCopiedAfter { id, delay } => {
                let events = self.events.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = events.send(SessionEvent::CopiedExpired(id));
                });
            }
            Effect::LoadVoices => {
                let engine = Arc::clone(&self.engine);
                let events = self.events.clone();
                tokio::spawn(async move {
                    let result = engine.voices().await;
                    let _ = events.send(SessionEvent::VoicesLoaded(result));
                });
            }
        }
    }

    /// Re-render after a mutation and publish state and frame
    fn publish(&self) {
        self.view_tx.send_replace(self.state.clone());
        self.frame_tx.send_replace(render(&self.state));
    }
}

/// Cloneable handle to a running session
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    view: watch::Receiver<ViewState>,
    frames: watch::Receiver<String>,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl SessionHandle {
    /// Apply an action on the session task
    pub async fn dispatch(&self, action: Action) -> Result<(), ChatError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Dispatch { action, reply })
            .await
            .map_err(|_| ChatError::SessionClosed)?;
        rx.await.map_err(|_| ChatError::SessionClosed)?
    }

    /// Replace the draft with `text` and send it
    pub async fn send_text(&self, text: impl Into<String>) -> Result<(), ChatError> {
        self.dispatch(Action::EditDraft(text.into())).await?;
        self.dispatch(Action::SendMessage).await
    }

    /// Read a local file and stage it as the pending attachment
    pub async fn upload_media(&self, path: impl AsRef<Path>) -> Result<(), ChatError> {
        let attachment = media::load_attachment(path).await?;
        self.dispatch(Action::AttachMedia(attachment)).await
    }

    /// Latest published view state
    pub fn view(&self) -> ViewState {
        self.view.borrow().clone()
    }

    /// Latest rendered frame
    pub fn frame(&self) -> String {
        self.frames.borrow().clone()
    }

    /// Receiver notified on every re-render
    pub fn subscribe_frames(&self) -> watch::Receiver<String> {
        self.frames.clone()
    }

    /// Wait until the published state satisfies `predicate`
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&ViewState) -> bool,
    ) -> Result<ViewState, ChatError> {
        let mut view = self.view.clone();
        let state = view
            .wait_for(predicate)
            .await
            .map_err(|_| ChatError::SessionClosed)?
            .clone();
        Ok(state)
    }

    /// Stop the session actor; queued announcements are dropped
    pub async fn shutdown(&self) -> Result<()> {
        info!("Stopping chat session");

        // Already stopped if the channel is closed
        let _ = self.commands.send(Command::Shutdown).await;

        let mut handle = self.task.lock().await;
        if let Some(task) = handle.take() {
            if let Err(e) = task.await {
                error!("Session task panicked: {}", e);
            }
        }

        Ok(())
    }
}
