// Central application store

//! # Store
//!
//! The wizard's shared presentation state lives in one [`Store`]. Network
//! code never writes to it directly: it produces [`StoreEvent`]s, the store
//! applies them and re-broadcasts them to subscribers (renderers, tests).
//!
//! ## Rust Learning Notes:
//!
//! ### Arc<RwLock<T>> + broadcast
//! The state sits behind `Arc<RwLock<AppState>>` so clones of the store share
//! it across tasks. A `tokio::sync::broadcast` channel fans applied events out
//! to any number of receivers; a send with no receivers is not an error.

use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use tracing::{debug, error};

use crate::models::Interaction;
use crate::widgets::{Timeline, TimelineStage};

const EVENT_BUFFER: usize = 256;

/// State-update messages consumed by the store
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// The user edited the question box
    QuestionEdited(String),
    /// A request went out; the UI shows the loading overlay
    GenerationStarted,
    /// The backend returned a new full message list
    MessagesReplaced(Vec<Interaction>),
    GeneratingFinished,
    QuestionCleared,
    /// Ask the host to scroll the chat container to its end
    ScrollToBottom,
    /// A request failed; only logged and recorded
    RequestFailed { operation: String, message: String },
    StepChanged(TimelineStage),
}

/// Everything the widgets render from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub msg_list: Vec<Interaction>,
    pub is_generating_answer: bool,
    pub question: String,
    /// Bumped on every scroll request so hosts can react to changes
    pub scroll_generation: u64,
    pub last_error: Option<String>,
    pub timeline: Timeline,
}

impl AppState {
    /// Apply one event. Pure state transition, no I/O.
    pub fn reduce(&mut self, event: &StoreEvent) {
        match event {
            StoreEvent::QuestionEdited(text) => self.question = text.clone(),
            StoreEvent::GenerationStarted => {
                self.is_generating_answer = true;
                self.last_error = None;
            }
            StoreEvent::MessagesReplaced(list) => self.msg_list = list.clone(),
            StoreEvent::GeneratingFinished => self.is_generating_answer = false,
            StoreEvent::QuestionCleared => self.question.clear(),
            StoreEvent::ScrollToBottom => self.scroll_generation += 1,
            StoreEvent::RequestFailed { operation, message } => {
                self.last_error = Some(format!("{}: {}", operation, message));
            }
            StoreEvent::StepChanged(stage) => self.timeline = Timeline::at(*stage),
        }
    }
}

/// Cloneable handle to the shared state
#[derive(Clone)]
pub struct Store {
    state: Arc<RwLock<AppState>>,
    events: broadcast::Sender<StoreEvent>,
}

impl Store {
    pub fn new() -> Self {
        Self::with_state(AppState::default())
    }

    pub fn with_state(state: AppState) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            state: Arc::new(RwLock::new(state)),
            events,
        }
    }

    /// Apply a single event
    pub async fn apply(&self, event: StoreEvent) {
        self.dispatch(vec![event]).await;
    }

    /// Apply a batch under one write lock, then announce each event in order.
    ///
    /// Readers never observe a half-applied batch.
    pub async fn dispatch(&self, events: Vec<StoreEvent>) {
        {
            let mut state = self.state.write().await;
            for event in &events {
                if let StoreEvent::RequestFailed { operation, message } = event {
                    error!("Error fetching data for {}: {}", operation, message);
                }
                state.reduce(event);
            }
        }

        for event in events {
            debug!("Store applied {:?}", event);
            let _ = self.events.send(event);
        }
    }

    pub async fn snapshot(&self) -> AppState {
        self.state.read().await.clone()
    }

    pub async fn messages(&self) -> Vec<Interaction> {
        self.state.read().await.msg_list.clone()
    }

    pub async fn is_generating(&self) -> bool {
        self.state.read().await.is_generating_answer
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduce_answer_cycle() {
        let mut state = AppState::default();
        state.reduce(&StoreEvent::QuestionEdited("x".to_string()));
        state.reduce(&StoreEvent::GenerationStarted);
        assert!(state.is_generating_answer);

        let list = vec![Interaction::new("x", "y")];
        for event in [
            StoreEvent::MessagesReplaced(list.clone()),
            StoreEvent::GeneratingFinished,
            StoreEvent::QuestionCleared,
            StoreEvent::ScrollToBottom,
        ] {
            state.reduce(&event);
        }

        assert_eq!(state.msg_list, list);
        assert!(!state.is_generating_answer);
        assert_eq!(state.question, "");
        assert_eq!(state.scroll_generation, 1);
    }

    #[test]
    fn test_failure_keeps_generating_flag() {
        let mut state = AppState::default();
        state.reduce(&StoreEvent::GenerationStarted);
        state.reduce(&StoreEvent::RequestFailed {
            operation: "get_answers".to_string(),
            message: "connection refused".to_string(),
        });
        assert!(state.is_generating_answer);
        assert_eq!(
            state.last_error.as_deref(),
            Some("get_answers: connection refused")
        );
    }

    #[tokio::test]
    async fn test_dispatch_broadcasts_in_order() {
        let store = Store::new();
        let mut events = store.subscribe();

        store
            .dispatch(vec![
                StoreEvent::StepChanged(TimelineStage::Actions),
                StoreEvent::ScrollToBottom,
            ])
            .await;

        assert_eq!(
            events.recv().await.unwrap(),
            StoreEvent::StepChanged(TimelineStage::Actions)
        );
        assert_eq!(events.recv().await.unwrap(), StoreEvent::ScrollToBottom);
        assert_eq!(store.snapshot().await.timeline.current_step(), 3);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = Store::new();
        let other = store.clone();
        other
            .apply(StoreEvent::MessagesReplaced(vec![Interaction::new("a", "b")]))
            .await;
        assert_eq!(store.messages().await.len(), 1);
    }
}
