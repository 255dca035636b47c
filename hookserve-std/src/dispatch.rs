//! Per-request dispatch.
//!
//! The [`Dispatcher`] takes a raw review body and a matched [`HookEntry`],
//! decodes the envelope, runs the bound hook on the blocking pool and hands
//! back the completed envelope. Each call is independent: nothing is shared
//! between requests except the hook itself.

use hookserve_core::{Envelope, GroupVersionResource, HookError, ReviewError, panic_message};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};
use tokio::sync::Semaphore;
use tracing::Instrument;

use crate::registry::HookEntry;

/// Why a review could not be answered.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The body was rejected before the hook ran.
    #[error(transparent)]
    Review(#[from] ReviewError),

    /// The hook did not produce an answer.
    #[error(transparent)]
    Hook(#[from] HookError),
}

/// Default cap on blocking calls one route may have running.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 32;

/// Runs reviews against hook entries.
///
/// Hooks are synchronous, so each call runs on Tokio's blocking pool. A call
/// that outlives the timeout cannot be interrupted and keeps its thread until
/// the hook returns. Each route may hold at most `max_in_flight` such threads;
/// further reviews for that route are refused with [`HookError::Saturated`]
/// while other routes keep their share of the pool.
///
/// Clones share the same in-flight accounting.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    timeout: Duration,
    max_in_flight: usize,
    in_flight: Arc<Mutex<HashMap<GroupVersionResource, Arc<Semaphore>>>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

impl Dispatcher {
    /// Create a dispatcher that gives up on a hook after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            in_flight: Arc::default(),
        }
    }

    /// Cap the blocking calls one route may have running. At least one.
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }

    fn permits(&self, entry: &HookEntry) -> Arc<Semaphore> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            in_flight
                .entry(entry.descriptor.gvr())
                .or_insert_with(|| Arc::new(Semaphore::new(self.max_in_flight))),
        )
    }

    /// Decode `body`, run the entry's hook and return the answered envelope.
    ///
    /// A timed-out hook keeps running on the blocking pool, holding one of
    /// its route's permits; its answer is discarded.
    pub async fn dispatch(
        &self,
        entry: &HookEntry,
        body: &[u8],
    ) -> Result<Envelope, DispatchError> {
        let span = tracing::debug_span!(
            "review",
            group = %entry.descriptor.group,
            version = %entry.descriptor.version,
            resource = %entry.descriptor.resource,
            kind = %entry.endpoint.kind(),
            uid = tracing::field::Empty,
        );

        let envelope = match span.in_scope(|| entry.endpoint.decode(body)) {
            Ok(envelope) => envelope,
            Err(err) => {
                span.in_scope(|| tracing::debug!(error = %err, "rejected review body"));
                return Err(DispatchError::Review(err));
            }
        };
        span.record("uid", envelope.uid());

        let Ok(permit) = self.permits(entry).try_acquire_owned() else {
            span.in_scope(|| tracing::warn!(limit = self.max_in_flight, "hook saturated"));
            return Err(DispatchError::Hook(HookError::Saturated(self.max_in_flight)));
        };

        let endpoint = entry.endpoint.clone();
        let timeout = self.timeout;
        async move {
            let task = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                endpoint.create(envelope)
            });
            let joined = match tokio::time::timeout(timeout, task).await {
                Ok(joined) => joined,
                Err(_) => {
                    tracing::warn!(?timeout, "hook timed out");
                    return Err(DispatchError::Hook(HookError::Timeout(timeout)));
                }
            };

            match joined {
                Ok(Ok(answered)) => {
                    tracing::debug!("review answered");
                    Ok(answered)
                }
                Ok(Err(err)) => Err(DispatchError::Review(err)),
                Err(join_err) if join_err.is_panic() => {
                    let msg = panic_message(join_err.into_panic().as_ref());
                    tracing::error!(panic = %msg, "hook panicked outside its guard");
                    Err(DispatchError::Hook(HookError::Panic(msg)))
                }
                Err(_) => Err(DispatchError::Hook(HookError::Cancelled)),
            }
        }
        .instrument(span)
        .await
    }
}
