//! # hookserve-core
//!
//! Core types and contracts for the hookserve admission webhook server.
//!
//! This crate has minimal dependencies and is what hook authors depend on:
//! it defines where a hook lives, what it receives and what it returns,
//! without pulling in the serving stack.
//!
//! # Building blocks
//!
//! - [`ResourceDescriptor`] - the group/version/resource a hook is hosted on
//! - [`ValidatingHook`], [`MutatingHook`], [`ConversionHook`] - the pure
//!   transforms a hook can provide
//! - [`Initialize`] - one-shot post-start initialization
//! - [`ReviewEndpoint`] - one hook role bound to one route
//! - [`AdmissionReview`], [`ConversionReview`] - the wire envelopes
//!
//! # Error Types
//!
//! - [`Error`] - Top-level error type
//! - [`ConfigError`] - Bootstrap configuration errors
//! - [`ReviewError`] - Malformed review bodies
//! - [`HookError`] - Hook invocation failures

#![deny(clippy::wildcard_imports)]

mod client;
mod endpoint;
mod error;
mod hook;
mod resource;
pub mod review;

// Re-exports
pub use client::ClientConfig;
pub use endpoint::{EndpointKind, ReviewEndpoint};
pub use error::{
    BoxError, ClientConfigError, ConfigError, Error, HookError, ReviewError, panic_message,
};
pub use hook::{ConversionHook, DynInitialize, Initialize, MutatingHook, ValidatingHook};
pub use resource::{GroupVersion, GroupVersionKind, GroupVersionResource, ResourceDescriptor};
pub use review::{
    AdmissionRequest, AdmissionResponse, AdmissionReview, ConversionRequest, ConversionResponse,
    ConversionReview, Envelope, Status,
};

// Re-exported so hook authors need no direct tokio-util dependency.
pub use tokio_util::sync::CancellationToken;
