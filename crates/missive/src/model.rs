use serde::{Deserialize, Serialize};

/// A stored message.
///
/// `id` is assigned by the store when the message is created and never
/// changes afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    pub payload: String,
}

/// Attributes derived from a [`Message`] payload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageMetadata {
    pub palindrome: bool,
}

/// A message together with its derived metadata.
///
/// This is the unit the store persists: a message is never written without
/// the metadata computed from its current payload. The fields are private so
/// metadata can only come from [`DetailedMessage::new`]; stores re-derive it
/// on write for values that arrived through deserialization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailedMessage {
    message: Message,
    metadata: MessageMetadata,
}

impl DetailedMessage {
    /// Builds a record for `payload`, deriving its metadata.
    pub fn new(id: u64, payload: impl Into<String>) -> Self {
        let payload = payload.into();
        let metadata = crate::metadata::derive(&payload);
        Self {
            message: Message { id, payload },
            metadata,
        }
    }

    pub fn id(&self) -> u64 {
        self.message.id
    }

    pub fn payload(&self) -> &str {
        &self.message.payload
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn metadata(&self) -> MessageMetadata {
        self.metadata
    }

    /// Returns this record with metadata derived from its payload again.
    pub fn rederived(&self) -> Self {
        Self::new(self.id(), self.payload())
    }

    /// Returns a copy carrying `payload` under the same identifier, with
    /// metadata derived afresh.
    pub fn with_payload(&self, payload: impl Into<String>) -> Self {
        Self::new(self.id(), payload)
    }

    pub fn into_message(self) -> Message {
        self.message
    }
}
