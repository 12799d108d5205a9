//! JSON bodies exchanged with clients.

use crate::server::error::ApiError;
use axum::Json;
use axum::response::{IntoResponse, Response};
use missive::{DetailedMessage, Message};
use serde::{Deserialize, Serialize};

/// Response header carrying the relative URL of the next page.
pub const NEXT_PAGE_HEADER: &str = "x-next-relative-url";

/// Error body written for every non-2xx response.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
}

/// Inbound body for create and update.
///
/// Any `id` a client sends is ignored; identifiers come from the store or the
/// path.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct MessageBody {
    #[serde(default)]
    pub payload: Option<String>,
}

impl MessageBody {
    /// Returns the payload, rejecting a missing or empty one.
    pub fn into_payload(self) -> Result<String, ApiError> {
        match self.payload {
            Some(payload) if !payload.is_empty() => Ok(payload),
            _ => Err(ApiError::validation("payload must be a non-empty string")),
        }
    }
}

/// A list or single-record body, with or without metadata.
pub enum Messages {
    Plain(Vec<Message>),
    Detailed(Vec<DetailedMessage>),
}

impl Messages {
    pub fn new(records: Vec<DetailedMessage>, detailed: bool) -> Self {
        if detailed {
            Self::Detailed(records)
        } else {
            Self::Plain(records.into_iter().map(DetailedMessage::into_message).collect())
        }
    }
}

impl IntoResponse for Messages {
    fn into_response(self) -> Response {
        match self {
            Self::Plain(records) => Json(records).into_response(),
            Self::Detailed(records) => Json(records).into_response(),
        }
    }
}

/// Renders one record, with or without metadata.
pub fn message_response(record: DetailedMessage, detailed: bool) -> Response {
    if detailed {
        Json(record).into_response()
    } else {
        Json(record.into_message()).into_response()
    }
}

/// Builds the relative URL that fetches the page starting at `next_id`.
///
/// `detailed` is carried only when set, so plain listings keep the short
/// form `/messages?afterId=21&limit=20`.
pub fn next_page_url(next_id: u64, limit: usize, detailed: bool) -> String {
    let mut url = format!("/messages?afterId={next_id}&limit={limit}");
    if detailed {
        url.push_str("&detailed=true");
    }
    url
}
