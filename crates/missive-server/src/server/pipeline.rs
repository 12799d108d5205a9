//! Request context resolution.
//!
//! Before a handler runs, its request passes through a short chain of
//! resolvers. Each one either attaches a typed value for the handler or
//! short-circuits the request with a complete response, and nothing after a
//! short-circuit runs. The resolvers themselves are plain functions over raw
//! strings returning a [`Stage`]; the axum extractors at the bottom of this
//! module only adapt them to requests.
//!
//! ## Resolvers
//!
//! - [`resolve_list_params`] - `detailed`, `limit` and `afterId` for listings.
//! - [`resolve_message_id`] + [`resolve_message`] - the `{id}` path segment
//!   and the record it names.
//! - [`resolve_detailed`] - the `detailed` flag for single-record reads.

use crate::server::error::ApiError;
use crate::server::service::state::AppState;
use crate::server::wire::Messages;
use axum::extract::{FromRequestParts, Path, Query};
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use missive::{DetailedMessage, MessageStore, NO_CURSOR};
use serde::Deserialize;

/// Page size used when `limit` is absent or empty.
pub const DEFAULT_LIMIT: usize = 20;

/// Largest accepted `limit`.
pub const MAX_LIMIT: usize = 100;

/// Outcome of one resolver.
#[derive(Debug)]
pub enum Stage<T> {
    /// The value is attached and the chain continues.
    Attached(T),
    /// The chain stops here with this response.
    ShortCircuited(Halt),
}

impl<T> Stage<T> {
    pub fn and_then<U>(self, next: impl FnOnce(T) -> Stage<U>) -> Stage<U> {
        match self {
            Self::Attached(value) => next(value),
            Self::ShortCircuited(halt) => Stage::ShortCircuited(halt),
        }
    }

    pub fn into_result(self) -> Result<T, Halt> {
        match self {
            Self::Attached(value) => Ok(value),
            Self::ShortCircuited(halt) => Err(halt),
        }
    }
}

impl<T> From<Result<T, ApiError>> for Stage<T> {
    fn from(result: Result<T, ApiError>) -> Self {
        match result {
            Ok(value) => Self::Attached(value),
            Err(err) => Self::ShortCircuited(Halt::Rejected(err)),
        }
    }
}

/// Why a chain stopped early.
#[derive(Debug)]
pub enum Halt {
    /// `limit=0`: the answer is an empty page, no store access needed.
    EmptyPage,
    /// The request cannot be served.
    Rejected(ApiError),
}

impl From<ApiError> for Halt {
    fn from(err: ApiError) -> Self {
        Self::Rejected(err)
    }
}

impl IntoResponse for Halt {
    fn into_response(self) -> Response {
        match self {
            Self::EmptyPage => Messages::Plain(Vec::new()).into_response(),
            Self::Rejected(err) => err.into_response(),
        }
    }
}

/// Listing parameters attached by [`resolve_list_params`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListParams {
    pub limit: usize,
    pub after_id: u64,
    pub detailed: bool,
}

/// Raw listing query. Absent and empty values both mean "use the default".
#[derive(Deserialize, Debug, Default, Clone)]
pub struct RawListQuery {
    pub limit: Option<String>,
    #[serde(rename = "afterId")]
    pub after_id: Option<String>,
    pub detailed: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct RawDetailQuery {
    pub detailed: Option<String>,
}

/// Parses a boolean flag. Accepts exactly `1`, `true`, `0` and `false`,
/// ignoring ASCII case.
pub fn parse_bool(raw: &str) -> Option<bool> {
    if raw == "1" || raw.eq_ignore_ascii_case("true") {
        Some(true)
    } else if raw == "0" || raw.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

// Plain decimal digits only; `u64::from_str` would also take a leading `+`.
fn parse_u64(raw: &str) -> Option<u64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

fn present(raw: &Option<String>) -> Option<&str> {
    raw.as_deref().filter(|value| !value.is_empty())
}

fn resolve_flag(raw: &Option<String>) -> Result<bool, ApiError> {
    match present(raw) {
        None => Ok(false),
        Some(value) => parse_bool(value).ok_or_else(|| {
            ApiError::validation(format!(
                "detailed must be one of 1, true, 0, false; got `{value}`"
            ))
        }),
    }
}

/// Resolves listing parameters in order `detailed`, `limit`, `afterId`.
///
/// `limit=0` halts with [`Halt::EmptyPage`] before `afterId` is looked at.
pub fn resolve_list_params(raw: &RawListQuery) -> Stage<ListParams> {
    Stage::from(resolve_flag(&raw.detailed))
        .and_then(|detailed| {
            let limit = match present(&raw.limit) {
                None => DEFAULT_LIMIT,
                Some(value) => match parse_u64(value) {
                    Some(0) => return Stage::ShortCircuited(Halt::EmptyPage),
                    Some(n) if n <= MAX_LIMIT as u64 => n as usize,
                    _ => {
                        return Stage::ShortCircuited(Halt::Rejected(ApiError::validation(
                            format!("limit must be an integer between 0 and {MAX_LIMIT}; got `{value}`"),
                        )));
                    }
                },
            };
            Stage::Attached((detailed, limit))
        })
        .and_then(|(detailed, limit)| {
            let after_id = match present(&raw.after_id) {
                None => NO_CURSOR,
                Some(value) => match parse_u64(value) {
                    Some(n) => n,
                    None => {
                        return Stage::ShortCircuited(Halt::Rejected(ApiError::validation(
                            format!("afterId must be a non-negative integer; got `{value}`"),
                        )));
                    }
                },
            };
            Stage::Attached(ListParams {
                limit,
                after_id,
                detailed,
            })
        })
}

/// Resolves the `detailed` flag of a single-record read.
pub fn resolve_detailed(raw: &RawDetailQuery) -> Stage<bool> {
    resolve_flag(&raw.detailed).into()
}

/// Parses the `{id}` path segment.
pub fn resolve_message_id(raw: &str) -> Stage<u64> {
    parse_u64(raw)
        .ok_or_else(|| {
            ApiError::validation(format!("message id must be a non-negative integer; got `{raw}`"))
        })
        .into()
}

/// Looks up the record named by `id`. A missing record halts with 404.
pub async fn resolve_message<S>(state: &AppState<S>, id: u64) -> Stage<DetailedMessage>
where
    S: MessageStore + Send + Sync + 'static,
{
    state.run_blocking(move |store| store.get(id)).await.into()
}

/// Extractor for listing parameters.
#[derive(Debug, Clone, Copy)]
pub struct ListContext(pub ListParams);

impl<St> FromRequestParts<St> for ListContext
where
    St: Send + Sync,
{
    type Rejection = Halt;

    async fn from_request_parts(parts: &mut Parts, _state: &St) -> Result<Self, Self::Rejection> {
        let Query(raw) = Query::<RawListQuery>::try_from_uri(&parts.uri).map_err(ApiError::from)?;
        resolve_list_params(&raw).into_result().map(Self)
    }
}

/// Extractor for the `detailed` flag on single-record reads.
#[derive(Debug, Clone, Copy)]
pub struct DetailFlag(pub bool);

impl<St> FromRequestParts<St> for DetailFlag
where
    St: Send + Sync,
{
    type Rejection = Halt;

    async fn from_request_parts(parts: &mut Parts, _state: &St) -> Result<Self, Self::Rejection> {
        let Query(raw) =
            Query::<RawDetailQuery>::try_from_uri(&parts.uri).map_err(ApiError::from)?;
        resolve_detailed(&raw).into_result().map(Self)
    }
}

/// Extractor that resolves `{id}` to the stored record.
#[derive(Debug, Clone)]
pub struct MessageContext(pub DetailedMessage);

impl<S> FromRequestParts<AppState<S>> for MessageContext
where
    S: MessageStore + Send + Sync + 'static,
{
    type Rejection = Halt;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S>,
    ) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(ApiError::from)?;
        let id = resolve_message_id(&raw).into_result()?;
        resolve_message(state, id).await.into_result().map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use missive::MemoryStore;

    fn query(limit: Option<&str>, after_id: Option<&str>, detailed: Option<&str>) -> RawListQuery {
        RawListQuery {
            limit: limit.map(str::to_string),
            after_id: after_id.map(str::to_string),
            detailed: detailed.map(str::to_string),
        }
    }

    fn attached<T: core::fmt::Debug>(stage: Stage<T>) -> T {
        match stage {
            Stage::Attached(value) => value,
            Stage::ShortCircuited(halt) => panic!("expected attached, got {halt:?}"),
        }
    }

    fn rejected<T: core::fmt::Debug>(stage: Stage<T>) -> StatusCode {
        match stage {
            Stage::ShortCircuited(Halt::Rejected(err)) => err.status(),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn parse_bool_accepts_exact_spellings() {
        for raw in ["1", "true", "TRUE", "True", "tRuE"] {
            assert_eq!(parse_bool(raw), Some(true), "{raw}");
        }
        for raw in ["0", "false", "FALSE", "False"] {
            assert_eq!(parse_bool(raw), Some(false), "{raw}");
        }
        for raw in ["", "yes", "no", "t", "f", "2", " true", "true "] {
            assert_eq!(parse_bool(raw), None, "{raw}");
        }
    }

    #[test]
    fn list_params_default_when_absent_or_empty() {
        let expected = ListParams {
            limit: DEFAULT_LIMIT,
            after_id: NO_CURSOR,
            detailed: false,
        };
        assert_eq!(attached(resolve_list_params(&RawListQuery::default())), expected);
        assert_eq!(
            attached(resolve_list_params(&query(Some(""), Some(""), Some("")))),
            expected
        );
    }

    #[test]
    fn list_params_accept_bounds() {
        let params = attached(resolve_list_params(&query(Some("100"), Some("7"), Some("1"))));
        assert_eq!(
            params,
            ListParams {
                limit: 100,
                after_id: 7,
                detailed: true,
            }
        );
        assert_eq!(attached(resolve_list_params(&query(Some("1"), None, None))).limit, 1);
    }

    #[test]
    fn list_params_reject_bad_values() {
        for limit in ["101", "-1", "+5", "abc", "1.5", "18446744073709551616"] {
            assert_eq!(
                rejected(resolve_list_params(&query(Some(limit), None, None))),
                StatusCode::BAD_REQUEST,
                "limit {limit}"
            );
        }
        for after_id in ["-1", "x", " 3"] {
            assert_eq!(
                rejected(resolve_list_params(&query(None, Some(after_id), None))),
                StatusCode::BAD_REQUEST,
                "afterId {after_id}"
            );
        }
        assert_eq!(
            rejected(resolve_list_params(&query(None, None, Some("yes")))),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn zero_limit_halts_with_empty_page_before_after_id() {
        let stage = resolve_list_params(&query(Some("0"), Some("not-a-number"), None));
        assert!(matches!(stage, Stage::ShortCircuited(Halt::EmptyPage)));

        // `detailed` is resolved first, so it still rejects.
        let stage = resolve_list_params(&query(Some("0"), None, Some("maybe")));
        assert_eq!(rejected(stage), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn message_id_must_be_decimal() {
        assert_eq!(attached(resolve_message_id("42")), 42);
        assert_eq!(attached(resolve_message_id("0")), 0);
        for raw in ["", "-3", "abc", "4x", "+4"] {
            assert_eq!(rejected(resolve_message_id(raw)), StatusCode::BAD_REQUEST, "{raw}");
        }
    }

    #[test]
    fn detailed_flag_defaults_to_false() {
        assert!(!attached(resolve_detailed(&RawDetailQuery::default())));
        assert!(attached(resolve_detailed(&RawDetailQuery {
            detailed: Some("true".into()),
        })));
        assert_eq!(
            rejected(resolve_detailed(&RawDetailQuery {
                detailed: Some("2".into()),
            })),
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn message_resolver_attaches_or_halts_not_found() {
        let store = MemoryStore::new();
        let created = store.create("kayak").unwrap();
        let state = AppState::new(store);

        assert_eq!(attached(resolve_message(&state, created.id()).await), created);
        assert_eq!(rejected(resolve_message(&state, 99).await), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn empty_page_renders_as_empty_array() {
        let response = Halt::EmptyPage.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"[]");
    }
}
