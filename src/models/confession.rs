use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// A persisted confession addressed to a named recipient.
///
/// Records are created exactly once and never mutated or deleted afterwards.
/// The store owns the canonical copy; everything handed out is a clone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfessionRecord {
    pub id: Uuid,
    pub recipient_name: String,
    pub sender_name: String,
    /// Stored verbatim, including leading/trailing whitespace and newlines.
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a confession.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConfessionInput {
    #[serde(default)]
    pub recipient_name: String,
    #[serde(default)]
    pub sender_name: String,
    #[serde(default)]
    pub message: String,
}

impl CreateConfessionInput {
    pub fn new(
        recipient_name: impl Into<String>,
        sender_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            recipient_name: recipient_name.into(),
            sender_name: sender_name.into(),
            message: message.into(),
        }
    }

    /// Checks every required field, reporting all of the empty ones at once.
    ///
    /// A field counts as empty when nothing is left after trimming. The values
    /// themselves are never rewritten.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let fields: Vec<ConfessionField> = [
            (ConfessionField::RecipientName, &self.recipient_name),
            (ConfessionField::SenderName, &self.sender_name),
            (ConfessionField::Message, &self.message),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect();

        if fields.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { fields })
        }
    }
}

/// A required field of [`CreateConfessionInput`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConfessionField {
    RecipientName,
    SenderName,
    Message,
}

impl ConfessionField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RecipientName => "recipientName",
            Self::SenderName => "senderName",
            Self::Message => "message",
        }
    }
}

impl fmt::Display for ConfessionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One or more required fields were empty.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing required field(s): {}", join_fields(.fields))]
pub struct ValidationError {
    pub fields: Vec<ConfessionField>,
}

fn join_fields(fields: &[ConfessionField]) -> String {
    fields
        .iter()
        .map(ConfessionField::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
