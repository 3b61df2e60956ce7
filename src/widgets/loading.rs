// Loading overlay

/// Shown under the main text when `show_wait_text` is set
pub const WAIT_TEXT: &str = "Please wait";

pub const DEFAULT_LOADING_TEXT: &str = "Loading...";

/// Stateless "work in progress" presentation.
///
/// There is no show/hide: the host decides whether to render it at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadingOverlay {
    pub text: String,
    pub show_dots: bool,
    pub show_wait_text: bool,
}

impl Default for LoadingOverlay {
    fn default() -> Self {
        Self {
            text: DEFAULT_LOADING_TEXT.to_string(),
            show_dots: true,
            show_wait_text: true,
        }
    }
}

impl LoadingOverlay {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_dots(mut self, show_dots: bool) -> Self {
        self.show_dots = show_dots;
        self
    }

    pub fn with_wait_text(mut self, show_wait_text: bool) -> Self {
        self.show_wait_text = show_wait_text;
        self
    }

    /// Secondary line, if enabled
    pub fn wait_text(&self) -> Option<&'static str> {
        self.show_wait_text.then_some(WAIT_TEXT)
    }

    /// Single-line rendering for hosts without animation, e.g. logs
    pub fn message(&self) -> String {
        match self.wait_text() {
            Some(wait) => format!("{} ({})", self.text, wait),
            None => self.text.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let overlay = LoadingOverlay::default();
        assert_eq!(overlay.text, "Loading...");
        assert!(overlay.show_dots);
        assert_eq!(overlay.wait_text(), Some("Please wait"));
        assert_eq!(overlay.message(), "Loading... (Please wait)");
    }

    #[test]
    fn test_custom() {
        let overlay = LoadingOverlay::new("Saving...").with_dots(false).with_wait_text(false);
        assert!(!overlay.show_dots);
        assert_eq!(overlay.wait_text(), None);
        assert_eq!(overlay.message(), "Saving...");
    }
}
