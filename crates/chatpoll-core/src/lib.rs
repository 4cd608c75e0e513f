pub mod api;
pub mod config;
pub mod error;
pub mod pane;
pub mod scheduler;
pub mod state;
pub mod widget;

// Re-export main types for convenience
pub use api::{ChatApiClient, ChatBackend, HealthReport, TrafficJob};
pub use config::Config;
pub use error::{ApiError, ConfigError};
pub use pane::{ChatPane, Direction, EntryBody, EntryId, PaneEntry, CHAT_ERROR_TEXT};
pub use scheduler::{Scheduler, TaskHandle};
pub use state::{ChatMessage, ChatRole, ChatUiState, MessageMeta};
pub use widget::{BackendHealth, ChatWidget, SubmitOutcome, TrafficPhase, WidgetEvent};
