use serde::{Deserialize, Serialize};

/// Error body returned by the content API (`{ "message": ... }`) or by the
/// image host (`{ "error": { "message": ... } }`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<NestedServiceError>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NestedServiceError {
    #[serde(default)]
    pub message: String,
}

impl ServiceErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            error: None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        self.message
            .as_deref()
            .or_else(|| self.error.as_ref().map(|nested| nested.message.as_str()))
            .filter(|message| !message.trim().is_empty())
    }

    /// Best-effort extraction of a human readable message from a raw
    /// response body; falls back to the trimmed text itself.
    pub fn message_from_text(text: &str) -> String {
        serde_json::from_str::<ServiceErrorBody>(text)
            .ok()
            .and_then(|body| body.message().map(str::to_string))
            .unwrap_or_else(|| text.trim().to_string())
    }
}
