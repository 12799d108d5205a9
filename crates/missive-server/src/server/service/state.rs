use crate::server::error::ApiError;
use missive::MessageStore;
use std::sync::{Arc, OnceLock};
use tokio_util::sync::CancellationToken;

/// State shared by every handler: the store behind an [`Arc`] and the
/// service-wide [`FaultSignal`].
///
/// Store calls are synchronous and may touch disk, so they run on tokio's
/// blocking pool through [`AppState::run_blocking`].
pub struct AppState<S> {
    store: Arc<S>,
    fault: FaultSignal,
}

impl<S> AppState<S> {
    pub fn new(store: S) -> Self {
        Self::from_arc(Arc::new(store))
    }

    pub fn from_arc(store: Arc<S>) -> Self {
        Self {
            store,
            fault: FaultSignal::default(),
        }
    }

    pub fn fault(&self) -> &FaultSignal {
        &self.fault
    }
}

// Manual impl so `S` itself does not need to be `Clone`.
impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            fault: self.fault.clone(),
        }
    }
}

impl<S> AppState<S>
where
    S: MessageStore + Send + Sync + 'static,
{
    /// Runs `op` against the store on the blocking pool.
    ///
    /// Store errors become [`ApiError`]s. An integrity fault raises the
    /// [`FaultSignal`] instead and answers [`ApiError::Unavailable`]; once
    /// raised, no further operation reaches the store.
    pub async fn run_blocking<T, F>(&self, op: F) -> Result<T, ApiError>
    where
        F: FnOnce(&S) -> missive::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        if self.fault.is_raised() {
            return Err(ApiError::Unavailable);
        }

        let store = Arc::clone(&self.store);
        let result = tokio::task::spawn_blocking(move || op(store.as_ref()))
            .await
            .map_err(|e| ApiError::Internal {
                reason: format!("store task failed: {e}"),
            })?;

        match result {
            Ok(value) => Ok(value),
            Err(err) if err.is_fatal() => {
                self.fault.raise(&err);
                Err(ApiError::Unavailable)
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Latched once the store reports an integrity fault.
///
/// The serving loop in `main` waits on [`FaultSignal::raised`] and exits the
/// process when it fires. Only the first fault's reason is kept.
#[derive(Clone, Debug, Default)]
pub struct FaultSignal {
    token: CancellationToken,
    reason: Arc<OnceLock<String>>,
}

impl FaultSignal {
    pub fn raise(&self, err: &missive::Error) {
        if self.reason.set(err.to_string()).is_ok() {
            tracing::error!(error = %err, "integrity fault in message store");
        }
        self.token.cancel();
    }

    pub fn is_raised(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.get().map(String::as_str)
    }

    /// Completes once a fault has been raised.
    pub async fn raised(&self) {
        self.token.cancelled().await
    }
}
