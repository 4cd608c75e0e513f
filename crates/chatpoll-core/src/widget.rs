//! The chat widget controller.
//!
//! `ChatWidget` owns the session state and the message pane and reacts to
//! [`WidgetEvent`]s. User actions (`submit`, `trigger_traffic`) and event
//! handling are synchronous; anything that waits (requests, delays, the
//! countdown) runs on the [`Scheduler`] and comes back as another event.
//!
//! Three behaviors share the controller:
//! - history sync: poll `/history`, re-render the pane when the count changes
//! - chat session: optimistic send, typing indicator, reply or inline error
//! - traffic trigger: start a server-side job, lock input, count down locally

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::api::{ChatBackend, HealthReport, TrafficJob};
use crate::config::Config;
use crate::error::ApiError;
use crate::pane::{ChatPane, Direction, EntryBody, EntryId, CHAT_ERROR_TEXT};
use crate::scheduler::{Scheduler, TaskHandle};
use crate::state::{ChatMessage, ChatUiState};

const COUNTDOWN_STEP: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub enum WidgetEvent {
    /// Periodic history poll.
    PollTick,
    /// One-off history refresh after a chat reply.
    RefreshHistory,
    HistoryLoaded(Result<Vec<ChatMessage>, ApiError>),
    /// Typing delay elapsed; show the indicator and send `prompt`.
    ShowTyping { prompt: String },
    ChatReplied {
        entry: EntryId,
        result: Result<String, ApiError>,
    },
    TrafficStarted(Result<TrafficJob, ApiError>),
    CountdownTick,
    TrafficErrorExpired,
    HealthChecked(Result<HealthReport, ApiError>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Sent,
    /// Nothing but whitespace; input left untouched.
    Empty,
    /// Traffic generation holds the input lock.
    Locked,
}

/// What the traffic overlay shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrafficPhase {
    Starting,
    Running {
        job: TrafficJob,
        total_secs: u64,
        remaining_secs: u64,
    },
    Failed {
        message: String,
    },
}

impl TrafficPhase {
    /// Fraction of the estimated duration that has elapsed.
    pub fn progress(&self) -> f64 {
        match self {
            TrafficPhase::Running {
                total_secs,
                remaining_secs,
                ..
            } if *total_secs > 0 => {
                (*total_secs - *remaining_secs) as f64 / *total_secs as f64
            }
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackendHealth {
    Unknown,
    Healthy(HealthReport),
    Degraded(HealthReport),
    Unreachable(String),
}

pub struct ChatWidget<B: ChatBackend> {
    backend: Arc<B>,
    scheduler: Scheduler<WidgetEvent>,
    config: Config,
    state: ChatUiState,
    pane: ChatPane,
    traffic: Option<TrafficPhase>,
    health: BackendHealth,
    poller: Option<TaskHandle>,
    countdown: Option<TaskHandle>,
    error_hold: Option<TaskHandle>,
}

impl<B: ChatBackend> ChatWidget<B> {
    /// Build a widget and the receiver its events arrive on. The owner must
    /// feed every received event back through [`ChatWidget::handle`].
    pub fn new(
        backend: Arc<B>,
        config: Config,
        state: ChatUiState,
    ) -> (Self, mpsc::UnboundedReceiver<WidgetEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let widget = Self {
            backend,
            scheduler: Scheduler::new(tx),
            config,
            state,
            pane: ChatPane::new(),
            traffic: None,
            health: BackendHealth::Unknown,
            poller: None,
            countdown: None,
            error_hold: None,
        };
        (widget, rx)
    }

    /// Initial history load, health probe, then the periodic poller.
    pub fn start(&mut self) {
        info!(
            user_id = %self.state.user_id(),
            interval_ms = self.config.poll_interval_ms,
            "starting history polling"
        );
        self.load_history();
        self.check_health();
        if let Some(old) = self.poller.take() {
            old.cancel();
        }
        self.poller = Some(
            self.scheduler
                .every(self.config.poll_interval(), || WidgetEvent::PollTick),
        );
    }

    pub fn shutdown(&mut self) {
        for handle in [
            self.poller.take(),
            self.countdown.take(),
            self.error_hold.take(),
        ]
        .into_iter()
        .flatten()
        {
            handle.cancel();
        }
    }

    pub fn state(&self) -> &ChatUiState {
        &self.state
    }

    pub fn pane(&self) -> &ChatPane {
        &self.pane
    }

    pub fn pane_mut(&mut self) -> &mut ChatPane {
        &mut self.pane
    }

    pub fn traffic(&self) -> Option<&TrafficPhase> {
        self.traffic.as_ref()
    }

    pub fn health(&self) -> &BackendHealth {
        &self.health
    }

    pub fn handle(&mut self, event: WidgetEvent) {
        match event {
            WidgetEvent::PollTick | WidgetEvent::RefreshHistory => {
                self.load_history();
            }
            WidgetEvent::HistoryLoaded(result) => self.on_history_loaded(result),
            WidgetEvent::ShowTyping { prompt } => self.on_show_typing(prompt),
            WidgetEvent::ChatReplied { entry, result } => self.on_chat_replied(entry, result),
            WidgetEvent::TrafficStarted(result) => self.on_traffic_started(result),
            WidgetEvent::CountdownTick => self.on_countdown_tick(),
            WidgetEvent::TrafficErrorExpired => self.finish_traffic(),
            WidgetEvent::HealthChecked(result) => self.on_health_checked(result),
        }
    }

    // History sync

    /// Start a history fetch unless one is already in flight.
    pub fn load_history(&mut self) -> bool {
        if !self.state.try_begin_history_load() {
            debug!("history fetch already in flight, skipping");
            return false;
        }
        let backend = Arc::clone(&self.backend);
        self.scheduler
            .run(async move { WidgetEvent::HistoryLoaded(backend.history().await) });
        true
    }

    fn on_history_loaded(&mut self, result: Result<Vec<ChatMessage>, ApiError>) {
        self.state.finish_history_load();

        let messages = match result {
            Ok(messages) => messages,
            Err(e) => {
                warn!(error = %e, "history fetch failed, retrying on next poll");
                return;
            }
        };

        if messages.is_empty() || messages.len() == self.state.last_message_count() {
            debug!(count = messages.len(), "history unchanged");
            return;
        }

        debug!(
            previous = self.state.last_message_count(),
            count = messages.len(),
            "re-rendering history"
        );
        self.pane.render_history(&messages);
        self.state.set_last_message_count(messages.len());
        self.pane.scroll_to_bottom();
    }

    // Chat session

    /// Send the user's input. On [`SubmitOutcome::Sent`] the caller should
    /// clear its input box; otherwise it must leave it as-is.
    pub fn submit(&mut self, input: &str) -> SubmitOutcome {
        if self.state.input_locked() {
            return SubmitOutcome::Locked;
        }
        let text = input.trim();
        if text.is_empty() {
            return SubmitOutcome::Empty;
        }

        self.pane.remove_welcome();
        self.state.set_user_text(text);
        self.pane
            .append(Direction::Outgoing, EntryBody::Text(text.to_string()));
        self.pane.scroll_to_bottom();

        self.scheduler.after(
            self.config.typing_delay(),
            WidgetEvent::ShowTyping {
                prompt: text.to_string(),
            },
        );
        SubmitOutcome::Sent
    }

    fn on_show_typing(&mut self, prompt: String) {
        let entry = self.pane.append(Direction::Incoming, EntryBody::Typing);
        self.pane.scroll_to_bottom();

        let backend = Arc::clone(&self.backend);
        let user_id = self.state.user_id().to_string();
        self.scheduler.run(async move {
            let result = backend.chat(&prompt, &user_id).await;
            WidgetEvent::ChatReplied { entry, result }
        });
    }

    fn on_chat_replied(&mut self, entry: EntryId, result: Result<String, ApiError>) {
        let body = match result {
            Ok(response) => {
                self.scheduler
                    .after(self.config.refresh_delay(), WidgetEvent::RefreshHistory);
                EntryBody::Text(response)
            }
            Err(e) => {
                error!(error = %e, "chat request failed");
                EntryBody::Error(CHAT_ERROR_TEXT.to_string())
            }
        };

        if !self.pane.replace_body(entry, body) {
            debug!("typing indicator was discarded by a history refresh");
        }
        self.pane.scroll_to_bottom();
    }

    // Traffic trigger

    /// Start a traffic-generation session. Returns false if one is active.
    pub fn trigger_traffic(&mut self) -> bool {
        if !self.state.try_begin_traffic() {
            return false;
        }
        self.traffic = Some(TrafficPhase::Starting);

        let backend = Arc::clone(&self.backend);
        let num_requests = self.config.traffic_requests;
        let delay_secs = self.config.traffic_delay_secs;
        info!(num_requests, delay_secs, "requesting traffic generation");
        self.scheduler.run(async move {
            WidgetEvent::TrafficStarted(backend.generate_traffic(num_requests, delay_secs).await)
        });
        true
    }

    fn on_traffic_started(&mut self, result: Result<TrafficJob, ApiError>) {
        if !self.state.is_generating_traffic() {
            return;
        }

        match result {
            Ok(job) => {
                // Client-side estimate only; the server offers no job status.
                let total_secs = u64::from(job.num_requests) * u64::from(job.delay_seconds)
                    + self.config.traffic_grace_secs;
                info!(
                    num_requests = job.num_requests,
                    delay_seconds = job.delay_seconds,
                    total_secs,
                    "traffic generation started"
                );
                self.traffic = Some(TrafficPhase::Running {
                    job,
                    total_secs,
                    remaining_secs: total_secs,
                });
                if total_secs == 0 {
                    self.finish_traffic();
                    return;
                }
                self.countdown = Some(
                    self.scheduler
                        .every(COUNTDOWN_STEP, || WidgetEvent::CountdownTick),
                );
            }
            Err(e) => {
                error!(error = %e, "traffic generation failed to start");
                self.traffic = Some(TrafficPhase::Failed {
                    message: e.user_message(),
                });
                self.error_hold = Some(self.scheduler.after(
                    self.config.traffic_error_hold(),
                    WidgetEvent::TrafficErrorExpired,
                ));
            }
        }
    }

    fn on_countdown_tick(&mut self) {
        let done = match self.traffic.as_mut() {
            Some(TrafficPhase::Running { remaining_secs, .. }) => {
                *remaining_secs = remaining_secs.saturating_sub(1);
                *remaining_secs == 0
            }
            _ => false,
        };
        if done {
            self.finish_traffic();
        }
    }

    fn finish_traffic(&mut self) {
        for handle in [self.countdown.take(), self.error_hold.take()]
            .into_iter()
            .flatten()
        {
            handle.cancel();
        }
        if self.traffic.take().is_some() {
            info!("traffic session over, input re-enabled");
        }
        self.state.finish_traffic();
    }

    // Health

    pub fn check_health(&mut self) {
        let backend = Arc::clone(&self.backend);
        self.scheduler
            .run(async move { WidgetEvent::HealthChecked(backend.health().await) });
    }

    fn on_health_checked(&mut self, result: Result<HealthReport, ApiError>) {
        self.health = match result {
            Ok(report) if report.is_ok() => BackendHealth::Healthy(report),
            Ok(report) => {
                warn!(status = %report.status, "backend reports degraded health");
                BackendHealth::Degraded(report)
            }
            Err(e) => {
                warn!(error = %e, "health check failed");
                BackendHealth::Unreachable(e.to_string())
            }
        };
    }
}

impl<B: ChatBackend> Drop for ChatWidget<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
