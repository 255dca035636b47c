//! # Hook contract
//!
//! A hook is the caller-supplied unit of admission logic. It declares where
//! it is hosted, transforms review requests into responses, and may run a
//! one-shot initialization once the server is accepting connections.
//!
//! A single hook type can take any combination of three roles, each hosted
//! on its own resource:
//!
//! - [`ValidatingHook`] - allow or deny a request
//! - [`MutatingHook`] - allow or deny, optionally returning a JSON patch
//! - [`ConversionHook`] - convert a batch of objects to a target version
//!
//! Every hook also implements [`Initialize`], usually with the default no-op.
//!
//! # UID calling convention
//!
//! The server does **not** copy the request UID into the response. Each
//! transform must echo `request.uid` into its response itself. Responses are
//! written back verbatim, so a wrong UID reaches the caller unchanged.
//!
//! # Concurrency
//!
//! Transforms are called concurrently from many requests with no locking
//! around them. Any shared mutable state inside a hook is the hook's own
//! responsibility.

use std::{future::Future, pin::Pin};

use tokio_util::sync::CancellationToken;

use crate::{
    client::ClientConfig,
    error::BoxError,
    resource::ResourceDescriptor,
    review::{AdmissionRequest, AdmissionResponse, ConversionRequest, ConversionResponse},
};

/// One-shot initialization run after the server starts serving.
///
/// Runs exactly once per registered hook, on its own task, with no ordering
/// relative to other hooks and no guarantee it finishes before the first
/// review arrives. Long-running initializers must return promptly once
/// `shutdown` is cancelled.
#[diagnostic::on_unimplemented(
    message = "`{Self}` does not implement `Initialize`",
    label = "missing `Initialize` implementation",
    note = "Every hook implements `Initialize`; an empty `impl Initialize for {Self} {}` uses the no-op default."
)]
pub trait Initialize: Send + Sync + 'static {
    /// Prepare the hook. An error marks the hook's post-start hook as failed.
    fn initialize(
        &self,
        client: &ClientConfig,
        shutdown: CancellationToken,
    ) -> impl Future<Output = Result<(), BoxError>> + Send {
        let _ = (client, shutdown);
        async { Ok(()) }
    }
}

/// Dynamic object-safe version of [`Initialize`].
pub trait DynInitialize: Send + Sync + 'static {
    /// Boxed-future form of [`Initialize::initialize`].
    fn initialize_dyn<'a>(
        &'a self,
        client: &'a ClientConfig,
        shutdown: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<(), BoxError>> + Send + 'a>>;
}

impl<T: Initialize> DynInitialize for T {
    fn initialize_dyn<'a>(
        &'a self,
        client: &'a ClientConfig,
        shutdown: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<(), BoxError>> + Send + 'a>> {
        Box::pin(self.initialize(client, shutdown))
    }
}

/// Decides whether an admission request is allowed.
pub trait ValidatingHook: Send + Sync + 'static {
    /// Where the validating endpoint is hosted.
    fn validating_resource(&self) -> ResourceDescriptor;

    /// Decide on the request. Must echo `request.uid`.
    fn validate(&self, request: &AdmissionRequest) -> AdmissionResponse;
}

/// Decides on an admission request and may patch the object.
pub trait MutatingHook: Send + Sync + 'static {
    /// Where the mutating endpoint is hosted.
    fn mutating_resource(&self) -> ResourceDescriptor;

    /// Decide on the request, optionally attaching a patch. Must echo `request.uid`.
    fn admit(&self, request: &AdmissionRequest) -> AdmissionResponse;
}

/// Converts custom resources between versions.
pub trait ConversionHook: Send + Sync + 'static {
    /// Where the conversion endpoint is hosted.
    fn conversion_resource(&self) -> ResourceDescriptor;

    /// Convert every object to `request.desired_api_version`, keeping order.
    fn convert(&self, request: &ConversionRequest) -> ConversionResponse;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Quiet;
    impl Initialize for Quiet {}

    struct WaitsForShutdown;
    impl Initialize for WaitsForShutdown {
        async fn initialize(
            &self,
            _client: &ClientConfig,
            shutdown: CancellationToken,
        ) -> Result<(), BoxError> {
            shutdown.cancelled().await;
            Err("stopped before ready".into())
        }
    }

    #[tokio::test]
    async fn test_default_initialize_is_noop() {
        let hook: Box<dyn DynInitialize> = Box::new(Quiet);
        let client = ClientConfig::new("https://127.0.0.1:6443");
        assert!(hook.initialize_dyn(&client, CancellationToken::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_initialize_observes_shutdown() {
        let hook: Box<dyn DynInitialize> = Box::new(WaitsForShutdown);
        let client = ClientConfig::default();
        let shutdown = CancellationToken::new();
        shutdown.cancel();
        let err = hook.initialize_dyn(&client, shutdown).await.unwrap_err();
        assert_eq!(err.to_string(), "stopped before ready");
    }
}
