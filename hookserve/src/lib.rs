//! # hookserve - Dynamic Admission Webhook Server
//!
//! `hookserve` hosts caller-supplied admission and conversion hooks behind
//! an HTTP API the orchestrator calls for every review. Hooks are plain
//! values registered at startup; the server derives one API group per
//! declared group, one route per declared resource, and one post-start
//! initialization per hook.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hookserve::prelude::*;
//!
//! struct Widgets;
//!
//! impl Initialize for Widgets {}
//!
//! impl ValidatingHook for Widgets {
//!     fn validating_resource(&self) -> ResourceDescriptor {
//!         ResourceDescriptor::new("samples.example.io", "v1", "widgetvalidations", "")
//!     }
//!
//!     fn validate(&self, request: &AdmissionRequest) -> AdmissionResponse {
//!         AdmissionResponse::allow(&request.uid)
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), hookserve::Error> {
//!     run_admission_server([HookRegistration::builder(Widgets).validating().build()]).await
//! }
//! ```

#![deny(clippy::pub_use, clippy::wildcard_imports)]
#![warn(missing_docs)]

pub mod bootstrap;
pub mod config;
pub mod logging;
pub mod server;
pub mod signal;

pub use hookserve_core::{
    // Hook contract
    AdmissionRequest,
    AdmissionResponse,
    AdmissionReview,
    // Error types
    BoxError,
    CancellationToken,
    ClientConfig,
    ClientConfigError,
    ConfigError,
    ConversionHook,
    ConversionRequest,
    ConversionResponse,
    ConversionReview,
    DynInitialize,
    EndpointKind,
    Envelope,
    Error,
    GroupVersion,
    GroupVersionKind,
    GroupVersionResource,
    HookError,
    Initialize,
    MutatingHook,
    // Resources
    ResourceDescriptor,
    ReviewEndpoint,
    ReviewError,
    Status,
    ValidatingHook,
};

pub use bootstrap::{bootstrap, run_admission_server};
pub use config::{Options, ServerConfig};
pub use server::WebhookServer;

// Registration and assembly
pub use hookserve_std::{
    assembler::{ApiGroupDescriptor, ApiServer},
    dispatch::{DispatchError, Dispatcher},
    lifecycle::{HookState, PostStartStatus},
    registry::{HookRegistration, HookRegistry, RegistryBuilder},
};

/// Review envelope constants and wire types.
pub mod review {
    #![allow(clippy::wildcard_imports)]
    pub use hookserve_core::review::*;
}

/// Testing utilities.
pub mod testing {
    #![allow(clippy::wildcard_imports)]
    pub use hookserve_std::testing::*;
}

/// Prelude module - common imports for hook authors.
///
/// # Usage
///
/// ```rust,ignore
/// use hookserve::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        AdmissionRequest,
        AdmissionResponse,
        BoxError,
        CancellationToken,
        ClientConfig,
        ConversionHook,
        ConversionRequest,
        ConversionResponse,
        HookRegistration,
        Initialize,
        MutatingHook,
        ResourceDescriptor,
        Status,
        ValidatingHook,
        run_admission_server,
    };
}
