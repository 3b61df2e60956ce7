// Chat history entries exchanged with the backend

use chrono::Local;
use serde::{Deserialize, Serialize};

/// Timestamp layout used by every persisted interaction
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One question/answer exchange as stored by the backend.
///
/// The message list returned by `get_answers`, `get_history` and `del_msg` is a
/// `Vec<Interaction>`. Older history files label the answer `answerClaude`;
/// both spellings are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    #[serde(default)]
    pub timestamp: String,

    pub question: String,

    #[serde(rename = "answerGPT", alias = "answerClaude", default)]
    pub answer: String,

    /// Verifier output for the answer, empty when the answer was not verified
    #[serde(rename = "PAT", default)]
    pub pat: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

impl Interaction {
    /// Create an interaction stamped with the current local time
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now().format(TIMESTAMP_FORMAT).to_string(),
            question: question.into(),
            answer: answer.into(),
            pat: String::new(),
            context: None,
        }
    }

    pub fn with_pat(mut self, pat: impl Into<String>) -> Self {
        self.pat = pat.into();
        self
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = Some(context);
        self
    }
}

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    System,
}

/// A single turn in the conversation, with its ordinal position in the list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub position: usize,
    pub role: MessageRole,
    pub text: String,
}

impl Message {
    /// Flatten an interaction list into alternating user/system turns.
    ///
    /// Position counts turns, so interaction `i` yields positions `2i` and `2i + 1`.
    pub fn from_interactions(interactions: &[Interaction]) -> Vec<Message> {
        interactions
            .iter()
            .enumerate()
            .flat_map(|(i, interaction)| {
                [
                    Message {
                        position: 2 * i,
                        role: MessageRole::User,
                        text: interaction.question.clone(),
                    },
                    Message {
                        position: 2 * i + 1,
                        role: MessageRole::System,
                        text: interaction.answer.clone(),
                    },
                ]
            })
            .collect()
    }
}

/// Which history file an exchange is recorded in.
///
/// `Skip` answers the question without persisting anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryChannel {
    Default,
    Const,
    Action,
    Assertion,
    Chatbot,
    Skip,
}

impl HistoryChannel {
    /// Parse the label sent by the front end. Unknown labels fall back to `Default`.
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "const" => HistoryChannel::Const,
            "action" => HistoryChannel::Action,
            "assertion" => HistoryChannel::Assertion,
            "chatbot" => HistoryChannel::Chatbot,
            "skip" => HistoryChannel::Skip,
            _ => HistoryChannel::Default,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            HistoryChannel::Default => "default",
            HistoryChannel::Const => "const",
            HistoryChannel::Action => "action",
            HistoryChannel::Assertion => "assertion",
            HistoryChannel::Chatbot => "chatbot",
            HistoryChannel::Skip => "skip",
        }
    }

    /// File name used by the file-backed history store, `None` for `Skip`
    pub fn file_name(&self) -> Option<&'static str> {
        match self {
            HistoryChannel::Default => Some("history.json"),
            HistoryChannel::Const => Some("const-history.json"),
            HistoryChannel::Action => Some("action-history.json"),
            HistoryChannel::Assertion => Some("assertion-history.json"),
            HistoryChannel::Chatbot => Some("chatbot-history.json"),
            HistoryChannel::Skip => None,
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.file_name().is_some()
    }
}

impl std::fmt::Display for HistoryChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_interaction_wire_names() {
        let interaction = Interaction::new("q", "a").with_pat("ok");
        let value = serde_json::to_value(&interaction).unwrap();
        assert_eq!(value["question"], "q");
        assert_eq!(value["answerGPT"], "a");
        assert_eq!(value["PAT"], "ok");
        assert!(value.get("context").is_none());
    }

    #[test]
    fn test_interaction_accepts_claude_label() {
        let interaction: Interaction = serde_json::from_value(json!({
            "timestamp": "2025-03-01 10:00:00",
            "question": "refine",
            "answerClaude": "Phil() = think -> Phil();"
        }))
        .unwrap();
        assert_eq!(interaction.answer, "Phil() = think -> Phil();");
        assert_eq!(interaction.pat, "");
    }

    #[test]
    fn test_messages_from_interactions() {
        let list = vec![Interaction::new("q1", "a1"), Interaction::new("q2", "a2")];
        let messages = Message::from_interactions(&list);
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[2].position, 2);
        assert_eq!(messages[2].role, MessageRole::User);
        assert_eq!(messages[3].text, "a2");
    }

    #[test]
    fn test_history_channel_labels() {
        assert_eq!(HistoryChannel::from_label(" const\n"), HistoryChannel::Const);
        assert_eq!(HistoryChannel::from_label("anything"), HistoryChannel::Default);
        assert!(!HistoryChannel::Skip.is_persisted());
        assert_eq!(HistoryChannel::Action.file_name(), Some("action-history.json"));
    }
}
