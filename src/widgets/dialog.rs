// Confirmation dialog

//! # Confirmation Dialog
//!
//! A modal yes/no prompt whose result is awaited as a future.
//!
//! [`ConfirmDialog`] is a cloneable handle to one dialog. Hand it to whatever
//! needs to ask the user something; the host renders [`ConfirmDialog::view`]
//! and calls [`confirm`](ConfirmDialog::confirm) or
//! [`cancel`](ConfirmDialog::cancel) when the user answers.
//!
//! ```rust
//! use pat_agent::{ConfirmDialog, DialogOptions};
//!
//! # async fn run() {
//! let dialog = ConfirmDialog::new();
//! let request = dialog.open(DialogOptions::new().with_message("Delete this message?"));
//!
//! // ... the host shows `dialog.view()` and the user clicks confirm
//! dialog.confirm();
//!
//! assert!(request.await);
//! # }
//! ```
//!
//! ## Resolution rules
//!
//! - confirm resolves `true` and runs `on_confirm`
//! - cancel resolves `false` and runs `on_cancel`
//! - opening a new dialog while one is showing resolves the old request `false`
//!   without running its callbacks
//! - dropping a [`ConfirmRequest`] before it resolves closes the dialog

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll};

use tokio::sync::oneshot;
use tracing::debug;

pub const DEFAULT_TITLE: &str = "Confirm";
pub const DEFAULT_MESSAGE: &str = "Are you sure?";
pub const DEFAULT_CONFIRM_TEXT: &str = "Confirm";
pub const DEFAULT_CANCEL_TEXT: &str = "Cancel";

/// Side effect run once the user answers
pub type DialogCallback = Box<dyn FnOnce() + Send + 'static>;

/// Options for [`ConfirmDialog::open`]. Every field is optional.
#[derive(Default)]
pub struct DialogOptions {
    pub title: Option<String>,
    pub message: Option<String>,
    pub confirm_text: Option<String>,
    pub cancel_text: Option<String>,
    pub on_confirm: Option<DialogCallback>,
    pub on_cancel: Option<DialogCallback>,
}

impl DialogOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_confirm_text(mut self, text: impl Into<String>) -> Self {
        self.confirm_text = Some(text.into());
        self
    }

    pub fn with_cancel_text(mut self, text: impl Into<String>) -> Self {
        self.cancel_text = Some(text.into());
        self
    }

    pub fn on_confirm(mut self, callback: impl FnOnce() + Send + 'static) -> Self {
        self.on_confirm = Some(Box::new(callback));
        self
    }

    pub fn on_cancel(mut self, callback: impl FnOnce() + Send + 'static) -> Self {
        self.on_cancel = Some(Box::new(callback));
        self
    }
}

impl std::fmt::Debug for DialogOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialogOptions")
            .field("title", &self.title)
            .field("message", &self.message)
            .field("confirm_text", &self.confirm_text)
            .field("cancel_text", &self.cancel_text)
            .field("on_confirm", &self.on_confirm.is_some())
            .field("on_cancel", &self.on_cancel.is_some())
            .finish()
    }
}

/// Resolved text of the dialog currently showing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogView {
    pub title: String,
    pub message: String,
    pub confirm_text: String,
    pub cancel_text: String,
}

/// Missing or empty options fall back to the defaults
fn or_default(value: Option<String>, default: &str) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

impl DialogView {
    fn from_options(options: &mut DialogOptions) -> Self {
        Self {
            title: or_default(options.title.take(), DEFAULT_TITLE),
            message: or_default(options.message.take(), DEFAULT_MESSAGE),
            confirm_text: or_default(options.confirm_text.take(), DEFAULT_CONFIRM_TEXT),
            cancel_text: or_default(options.cancel_text.take(), DEFAULT_CANCEL_TEXT),
        }
    }
}

struct Pending {
    id: u64,
    view: DialogView,
    resolver: oneshot::Sender<bool>,
    on_confirm: Option<DialogCallback>,
    on_cancel: Option<DialogCallback>,
}

#[derive(Default)]
struct DialogState {
    pending: Option<Pending>,
    next_id: u64,
}

fn lock(state: &Mutex<DialogState>) -> MutexGuard<'_, DialogState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle to a confirmation dialog; clones share the same dialog
#[derive(Clone, Default)]
pub struct ConfirmDialog {
    state: Arc<Mutex<DialogState>>,
}

impl ConfirmDialog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show the dialog and return the pending answer.
    ///
    /// A request that was still showing is resolved `false`.
    pub fn open(&self, mut options: DialogOptions) -> ConfirmRequest {
        let (resolver, receiver) = oneshot::channel();
        let view = DialogView::from_options(&mut options);

        let mut state = lock(&self.state);
        let id = state.next_id;
        state.next_id += 1;

        let superseded = state.pending.replace(Pending {
            id,
            view,
            resolver,
            on_confirm: options.on_confirm.take(),
            on_cancel: options.on_cancel.take(),
        });
        drop(state);

        if let Some(old) = superseded {
            debug!("Confirmation {} superseded by {}", old.id, id);
            let _ = old.resolver.send(false);
        }

        ConfirmRequest {
            id,
            receiver,
            dialog: Arc::downgrade(&self.state),
        }
    }

    /// What the host should render, `None` while hidden
    pub fn view(&self) -> Option<DialogView> {
        lock(&self.state).pending.as_ref().map(|p| p.view.clone())
    }

    pub fn is_visible(&self) -> bool {
        lock(&self.state).pending.is_some()
    }

    /// User pressed the confirm button. Returns `false` if nothing was showing.
    pub fn confirm(&self) -> bool {
        self.resolve(true)
    }

    /// User pressed the cancel button. Returns `false` if nothing was showing.
    pub fn cancel(&self) -> bool {
        self.resolve(false)
    }

    fn resolve(&self, answer: bool) -> bool {
        let Some(pending) = lock(&self.state).pending.take() else {
            return false;
        };

        let _ = pending.resolver.send(answer);
        let callback = if answer {
            pending.on_confirm
        } else {
            pending.on_cancel
        };
        if let Some(callback) = callback {
            callback();
        }
        true
    }
}

impl std::fmt::Debug for ConfirmDialog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfirmDialog")
            .field("view", &self.view())
            .finish()
    }
}

/// The pending answer of one [`ConfirmDialog::open`] call.
///
/// Resolves `true` on confirm and `false` on cancel or supersession.
#[derive(Debug)]
pub struct ConfirmRequest {
    id: u64,
    receiver: oneshot::Receiver<bool>,
    dialog: Weak<Mutex<DialogState>>,
}

impl Future for ConfirmRequest {
    type Output = bool;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<bool> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|answer| answer.unwrap_or(false))
    }
}

impl Drop for ConfirmRequest {
    fn drop(&mut self) {
        let Some(state) = self.dialog.upgrade() else {
            return;
        };
        let mut state = lock(&state);
        if state.pending.as_ref().map(|p| p.id) == Some(self.id) {
            debug!("Confirmation {} abandoned, closing dialog", self.id);
            state.pending = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_defaults() {
        let dialog = ConfirmDialog::new();
        assert!(!dialog.is_visible());

        let _request = dialog.open(DialogOptions::new());
        let view = dialog.view().unwrap();
        assert_eq!(view.title, "Confirm");
        assert_eq!(view.message, "Are you sure?");
        assert_eq!(view.confirm_text, "Confirm");
        assert_eq!(view.cancel_text, "Cancel");
    }

    #[test]
    fn test_empty_options_fall_back_to_defaults() {
        let dialog = ConfirmDialog::new();
        let _request = dialog.open(DialogOptions::new().with_title("").with_cancel_text("Keep"));
        let view = dialog.view().unwrap();
        assert_eq!(view.title, "Confirm");
        assert_eq!(view.cancel_text, "Keep");
    }

    #[tokio::test]
    async fn test_confirm_resolves_true_and_runs_callback() {
        let confirmed = Arc::new(AtomicUsize::new(0));
        let cancelled = Arc::new(AtomicUsize::new(0));
        let dialog = ConfirmDialog::new();

        let c = confirmed.clone();
        let x = cancelled.clone();
        let request = dialog.open(
            DialogOptions::new()
                .on_confirm(move || {
                    c.fetch_add(1, Ordering::SeqCst);
                })
                .on_cancel(move || {
                    x.fetch_add(1, Ordering::SeqCst);
                }),
        );

        assert!(dialog.confirm());
        assert!(request.await);
        assert!(!dialog.is_visible());
        assert_eq!(confirmed.load(Ordering::SeqCst), 1);
        assert_eq!(cancelled.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_request_pending_until_answered() {
        let dialog = ConfirmDialog::new();
        let mut request = tokio_test::task::spawn(dialog.open(DialogOptions::new()));

        tokio_test::assert_pending!(request.poll());
        assert!(dialog.is_visible());

        dialog.confirm();
        assert!(request.is_woken());
        tokio_test::assert_ready_eq!(request.poll(), true);
    }

    #[tokio::test]
    async fn test_cancel_resolves_false_and_runs_callback() {
        let cancelled = Arc::new(AtomicUsize::new(0));
        let dialog = ConfirmDialog::new();
        let x = cancelled.clone();
        let request = dialog.open(DialogOptions::new().on_cancel(move || {
            x.fetch_add(1, Ordering::SeqCst);
        }));

        let handle = dialog.clone();
        tokio::spawn(async move {
            handle.cancel();
        });

        assert!(!request.await);
        assert_eq!(cancelled.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_superseded_request_resolves_false() {
        let dialog = ConfirmDialog::new();
        let first = dialog.open(DialogOptions::new().with_message("first"));
        let second = dialog.open(DialogOptions::new().with_message("second"));

        assert!(!first.await);
        assert_eq!(dialog.view().unwrap().message, "second");
        dialog.confirm();
        assert!(second.await);
    }

    #[test]
    fn test_dropping_request_closes_dialog() {
        let dialog = ConfirmDialog::new();
        let request = dialog.open(DialogOptions::new());
        assert!(dialog.is_visible());
        drop(request);
        assert!(!dialog.is_visible());
        assert!(!dialog.confirm());
    }

    #[test]
    fn test_dropping_superseded_request_keeps_new_dialog() {
        let dialog = ConfirmDialog::new();
        let first = dialog.open(DialogOptions::new());
        let _second = dialog.open(DialogOptions::new().with_title("Delete"));
        drop(first);
        assert_eq!(dialog.view().unwrap().title, "Delete");
    }
}
