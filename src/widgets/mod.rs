// Wizard widgets
// Framework-free view models; the host decides how to draw them

//! # Widgets Module
//!
//! - [`ConfirmDialog`]: yes/no prompt awaited as a future
//! - [`LoadingOverlay`]: text shown while work is in progress
//! - [`Timeline`]: past/current/future status of the eight wizard stages
//!
//! None of these hold global state. A host that needs a dialog creates one
//! and passes the handle to whoever asks for confirmations.

pub mod dialog;
pub mod loading;
pub mod timeline;

pub use dialog::{ConfirmDialog, ConfirmRequest, DialogCallback, DialogOptions, DialogView};
pub use loading::LoadingOverlay;
pub use timeline::{StepStatus, Timeline, TimelineStage};
