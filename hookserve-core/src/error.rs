//! Error types for hookserve.
//!
//! This module provides a structured error hierarchy using `thiserror`:
//!
//! - [`Error`] - Top-level error type for bootstrap and serving
//! - [`ConfigError`] - Configuration errors, fatal at bootstrap
//! - [`ReviewError`] - Errors decoding or handling a review envelope
//! - [`HookError`] - Errors raised while invoking a caller hook
//! - [`ClientConfigError`] - Failures resolving the in-cluster client config

use std::time::Duration;
use thiserror::Error;

use crate::resource::GroupVersionResource;

/// A boxed error type for hook-supplied errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error type for all hookserve operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The hook set or server configuration is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The in-cluster client configuration could not be resolved.
    #[error("client configuration error: {0}")]
    ClientConfig(#[from] ClientConfigError),

    /// The listener could not be bound or serving failed.
    #[error("serve error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Errors detected while assembling the API surface.
///
/// Every variant is fatal: the process must not start serving.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A resource descriptor carries a malformed coordinate.
    #[error("invalid {field} {value:?} for hook {hook}: {reason}")]
    InvalidResource {
        /// Name of the hook that declared the descriptor.
        hook: String,
        /// Which coordinate is malformed.
        field: &'static str,
        /// The offending value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Two hooks claim the same group, version and resource.
    #[error("duplicate route for {gvr}: claimed by both {first} and {second}")]
    DuplicateRoute {
        /// The contested coordinates.
        gvr: GroupVersionResource,
        /// Hook registered first.
        first: String,
        /// Hook registered second.
        second: String,
    },

    /// A hook was registered without any role.
    #[error("hook {0} does not declare any validating, mutating or conversion resource")]
    NoResources(String),

    /// An assembled group had no versions.
    #[error("API group {0:?} has no versions")]
    EmptyGroup(String),

    /// The serving framework already has a group with this name.
    #[error("API group {0:?} is already installed")]
    GroupAlreadyInstalled(String),

    /// A post-start hook with this name already exists.
    #[error("post-start hook {0:?} is already registered")]
    DuplicatePostStartHook(String),
}

/// Errors that can occur while handling a single review envelope.
///
/// These are client errors: they are reported before any hook runs.
#[derive(Error, Debug)]
pub enum ReviewError {
    /// The body could not be decoded into the expected envelope.
    #[error("malformed review body: {0}")]
    Decode(#[from] serde_json::Error),

    /// The envelope carried no `request`.
    #[error("{kind} has no request")]
    MissingRequest {
        /// Envelope kind that was expected.
        kind: &'static str,
    },

    /// The envelope's `apiVersion`/`kind` is not served by this endpoint.
    #[error("unsupported envelope {api_version}/{kind}, expected {expected}")]
    UnsupportedEnvelope {
        /// The received `apiVersion`.
        api_version: String,
        /// The received `kind`.
        kind: String,
        /// The envelope kind this endpoint consumes.
        expected: &'static str,
    },
}

/// Errors that can occur while invoking a hook.
#[derive(Error, Debug)]
pub enum HookError {
    /// The hook panicked during execution.
    #[error("hook panicked: {0}")]
    Panic(String),

    /// The hook timed out.
    #[error("hook timed out after {0:?}")]
    Timeout(Duration),

    /// The hook was cancelled.
    #[error("hook was cancelled")]
    Cancelled,

    /// The hook already has its maximum number of calls running.
    #[error("hook already has {0} calls in flight")]
    Saturated(usize),
}

/// Errors resolving the in-cluster client configuration.
#[derive(Error, Debug)]
pub enum ClientConfigError {
    /// The service host/port environment variables are not set.
    #[error(
        "unable to load in-cluster configuration, KUBERNETES_SERVICE_HOST and KUBERNETES_SERVICE_PORT must be defined"
    )]
    NotInCluster,

    /// The service-account token could not be read.
    #[error("failed to read service account token {path}: {source}")]
    Token {
        /// Token file path.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Render a panic payload as a message.
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
