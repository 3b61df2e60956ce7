//! Chat session: backend responses become store events
//!
//! [`ChatSession`] owns no presentation state. Each operation performs one
//! exchange through [`WizardClient`] and reports the outcome to the [`Store`]
//! as a batch of [`StoreEvent`]s.

use tokio::task::JoinHandle;
use tracing::info;

use crate::models::Interaction;
use crate::store::{Store, StoreEvent};
use crate::Result;

use super::client::WizardClient;

/// Joins a [`WizardClient`] to a [`Store`]
#[derive(Clone)]
pub struct ChatSession {
    client: WizardClient,
    store: Store,
    reset_generating_on_failure: bool,
}

impl ChatSession {
    pub fn new(client: WizardClient, store: Store) -> Self {
        Self {
            client,
            store,
            reset_generating_on_failure: false,
        }
    }

    /// Clear the generating flag when `ask_question` fails.
    ///
    /// Off by default: a failed ask leaves the flag set, as the browser client did.
    pub fn reset_generating_on_failure(mut self, reset: bool) -> Self {
        self.reset_generating_on_failure = reset;
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn client(&self) -> &WizardClient {
        &self.client
    }

    /// Send a question. On success the list is replaced, the flag and input
    /// are cleared and a scroll-to-bottom is requested.
    pub async fn ask_question(&self, question: &str) -> Result<()> {
        self.store.apply(StoreEvent::GenerationStarted).await;

        match self.client.ask_question(question).await {
            Ok(list) => {
                info!("Received {} messages from get_answers", list.len());
                self.store
                    .dispatch(vec![
                        StoreEvent::MessagesReplaced(list),
                        StoreEvent::GeneratingFinished,
                        StoreEvent::QuestionCleared,
                        StoreEvent::ScrollToBottom,
                    ])
                    .await;
                Ok(())
            }
            Err(err) => {
                let mut events = vec![failure("get_answers", &err)];
                if self.reset_generating_on_failure {
                    events.push(StoreEvent::GeneratingFinished);
                }
                self.store.dispatch(events).await;
                Err(err)
            }
        }
    }

    /// Ask the question currently held in the store
    pub async fn ask_current_question(&self) -> Result<()> {
        let question = self.store.snapshot().await.question;
        self.ask_question(&question).await
    }

    /// Replace the list with the backend history
    pub async fn fetch_history(&self) -> Result<()> {
        match self.client.fetch_history().await {
            Ok(list) => {
                self.store.apply(StoreEvent::MessagesReplaced(list)).await;
                Ok(())
            }
            Err(err) => {
                self.store.apply(failure("get_history", &err)).await;
                Err(err)
            }
        }
    }

    /// Delete one interaction by index; the flag is cleared on success
    pub async fn delete_message(&self, index: usize) -> Result<()> {
        match self.client.delete_message(index).await {
            Ok(list) => {
                self.store
                    .dispatch(vec![
                        StoreEvent::MessagesReplaced(list),
                        StoreEvent::GeneratingFinished,
                    ])
                    .await;
                Ok(())
            }
            Err(err) => {
                self.store.apply(failure("del_msg", &err)).await;
                Err(err)
            }
        }
    }

    /// Fire-and-forget form of [`ask_question`](Self::ask_question)
    pub fn spawn_ask_question(&self, question: impl Into<String>) -> JoinHandle<Result<()>> {
        let session = self.clone();
        let question = question.into();
        tokio::spawn(async move { session.ask_question(&question).await })
    }

    /// Fire-and-forget form of [`fetch_history`](Self::fetch_history)
    pub fn spawn_fetch_history(&self) -> JoinHandle<Result<()>> {
        let session = self.clone();
        tokio::spawn(async move { session.fetch_history().await })
    }

    /// Fire-and-forget form of [`delete_message`](Self::delete_message)
    pub fn spawn_delete_message(&self, index: usize) -> JoinHandle<Result<()>> {
        let session = self.clone();
        tokio::spawn(async move { session.delete_message(index).await })
    }

    pub async fn messages(&self) -> Vec<Interaction> {
        self.store.messages().await
    }
}

fn failure(operation: &str, err: &crate::PatAgentError) -> StoreEvent {
    StoreEvent::RequestFailed {
        operation: operation.to_string(),
        message: err.to_string(),
    }
}
