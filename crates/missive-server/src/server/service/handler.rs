use crate::server::error::ApiError;
use crate::server::pipeline::{DetailFlag, ListContext, MessageContext};
use crate::server::service::state::AppState;
use crate::server::wire::{MessageBody, Messages, NEXT_PAGE_HEADER, message_response, next_page_url};
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use missive::{MessageStore, list_page};

/// `GET /messages`
///
/// Returns up to `limit` messages starting at `afterId`. When more remain,
/// the `x-next-relative-url` header carries the URL of the next page.
#[tracing::instrument(level = "debug", skip_all, fields(limit = params.limit, after_id = params.after_id))]
pub async fn list_messages<S>(
    State(state): State<AppState<S>>,
    ListContext(params): ListContext,
) -> Result<Response, ApiError>
where
    S: MessageStore + Send + Sync + 'static,
{
    let page = state
        .run_blocking(move |store| list_page(store, params.limit, params.after_id))
        .await?;
    let (records, next_id) = page.into_parts();

    let mut headers = HeaderMap::new();
    if let Some(next_id) = next_id {
        let url = next_page_url(next_id, params.limit, params.detailed);
        let value = HeaderValue::from_str(&url).map_err(|e| ApiError::Internal {
            reason: format!("invalid next page url `{url}`: {e}"),
        })?;
        headers.insert(NEXT_PAGE_HEADER, value);
    }

    Ok((headers, Messages::new(records, params.detailed)).into_response())
}

/// `POST /messages`
///
/// Stores a new message and returns it with `201` and a `Location` header.
#[tracing::instrument(level = "debug", skip_all)]
pub async fn create_message<S>(
    State(state): State<AppState<S>>,
    body: Result<Json<MessageBody>, JsonRejection>,
) -> Result<Response, ApiError>
where
    S: MessageStore + Send + Sync + 'static,
{
    let Json(body) = body?;
    let payload = body.into_payload()?;

    let created = state
        .run_blocking(move |store| store.create(&payload))
        .await?;
    tracing::debug!(id = created.id(), "message created");

    let location = format!("/messages/{}", created.id());
    let location = HeaderValue::from_str(&location).map_err(|e| ApiError::Internal {
        reason: format!("invalid location `{location}`: {e}"),
    })?;

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(created.into_message()),
    )
        .into_response())
}

/// `GET /messages/{id}`
pub async fn get_message(
    MessageContext(record): MessageContext,
    DetailFlag(detailed): DetailFlag,
) -> Response {
    message_response(record, detailed)
}

/// `PUT /messages/{id}`
///
/// Replaces the payload of an existing message; metadata is derived again.
/// Never creates a message.
#[tracing::instrument(level = "debug", skip_all, fields(id = record.id()))]
pub async fn update_message<S>(
    State(state): State<AppState<S>>,
    MessageContext(record): MessageContext,
    body: Result<Json<MessageBody>, JsonRejection>,
) -> Result<StatusCode, ApiError>
where
    S: MessageStore + Send + Sync + 'static,
{
    let Json(body) = body?;
    let payload = body.into_payload()?;
    let id = record.id();

    state
        .run_blocking(move |store| store.update(id, &payload))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /messages/{id}`
#[tracing::instrument(level = "debug", skip_all, fields(id = record.id()))]
pub async fn delete_message<S>(
    State(state): State<AppState<S>>,
    MessageContext(record): MessageContext,
) -> Result<StatusCode, ApiError>
where
    S: MessageStore + Send + Sync + 'static,
{
    let id = record.id();
    state.run_blocking(move |store| store.delete(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /health`
pub async fn health() -> &'static str {
    "ok"
}
