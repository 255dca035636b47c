//! The HTTP serving framework.
//!
//! [`WebhookServer`] is the [`ApiServer`] bootstrap installs into. Once
//! assembled it is turned into an axum router that serves:
//!
//! - `POST /apis/{group}/{version}/{resource}`: one review per request
//! - `GET /apis`, `/apis/{group}`, `/apis/{group}/{version}`: discovery
//! - `GET /livez`, `/readyz`, `/healthz`: health
//!
//! Plain HTTP only; TLS is terminated in front of the server.

mod api;
mod discovery;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::Method,
    routing::{get, post},
};
use hookserve_core::{CancellationToken, ConfigError, Error};
use hookserve_std::{
    assembler::{ApiGroupDescriptor, ApiServer},
    dispatch::Dispatcher,
    lifecycle::{PostStartHook, PostStartHooks, PostStartStatus},
};
use indexmap::IndexMap;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::config::ServerConfig;

/// State shared by every request.
pub(crate) struct AppState {
    groups: IndexMap<String, ApiGroupDescriptor>,
    dispatcher: Dispatcher,
    status: PostStartStatus,
}

pub(crate) type SharedState = Arc<AppState>;

/// An admission webhook server, assembled but not yet serving.
#[derive(Debug)]
pub struct WebhookServer {
    config: ServerConfig,
    groups: IndexMap<String, ApiGroupDescriptor>,
    post_start: PostStartHooks,
}

impl WebhookServer {
    /// Create an empty server.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            groups: IndexMap::new(),
            post_start: PostStartHooks::new(),
        }
    }

    /// The server's settings.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Installed groups, in installation order.
    pub fn groups(&self) -> impl Iterator<Item = &ApiGroupDescriptor> {
        self.groups.values()
    }

    /// Names of registered post-start hooks.
    pub fn post_start_hook_names(&self) -> impl Iterator<Item = &str> {
        self.post_start.names()
    }

    /// Build the router, reporting readiness from `status`.
    pub fn router(&self, status: PostStartStatus) -> Router {
        build_router(&self.config, self.groups.clone(), status)
    }

    /// Bind the configured address.
    pub async fn bind(&self) -> Result<TcpListener, Error> {
        let addr = (self.config.bind_address, self.config.port);
        Ok(TcpListener::bind(addr).await?)
    }

    /// Serve on `listener` until `shutdown` is cancelled.
    ///
    /// Post-start hooks are started here, after the listener is bound. On
    /// shutdown, in-flight requests drain and still-running hooks get the
    /// configured grace period.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> Result<(), Error> {
        let WebhookServer {
            config,
            groups,
            post_start,
        } = self;
        let addr = listener.local_addr()?;
        let status = post_start.start(shutdown.clone());
        let app = build_router(&config, groups, status.clone());

        tracing::info!(name = %config.name, %addr, "admission server listening");
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await?;

        if tokio::time::timeout(config.shutdown_grace, status.wait())
            .await
            .is_err()
        {
            tracing::warn!(
                grace = ?config.shutdown_grace,
                "post-start hooks still running at shutdown"
            );
        }
        tracing::info!(name = %config.name, "admission server stopped");
        Ok(())
    }
}

impl ApiServer for WebhookServer {
    fn install_api_group(&mut self, group: ApiGroupDescriptor) -> Result<(), ConfigError> {
        if self.groups.contains_key(&group.name) {
            return Err(ConfigError::GroupAlreadyInstalled(group.name));
        }
        self.groups.insert(group.name.clone(), group);
        Ok(())
    }

    fn add_post_start_hook(
        &mut self,
        name: String,
        hook: PostStartHook,
    ) -> Result<(), ConfigError> {
        self.post_start.add(name, hook)
    }
}

fn build_router(
    config: &ServerConfig,
    groups: IndexMap<String, ApiGroupDescriptor>,
    status: PostStartStatus,
) -> Router {
    let state = Arc::new(AppState {
        groups,
        dispatcher: Dispatcher::new(config.request_timeout)
            .with_max_in_flight(config.max_in_flight_per_hook),
        status,
    });

    Router::new()
        .route("/apis", get(discovery::group_list))
        .route("/apis/{group}", get(discovery::group))
        .route("/apis/{group}/{version}", get(discovery::resource_list))
        .route("/apis/{group}/{version}/{resource}", post(api::review))
        .route("/livez", get(discovery::livez))
        .route("/readyz", get(discovery::readyz))
        .route("/healthz", get(discovery::readyz))
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(DefaultBodyLimit::max(config.max_request_body_bytes))
        .with_state(state)
}

async fn not_found() -> api::ApiError {
    api::ApiError::not_found("the server could not find the requested resource")
}

async fn method_not_allowed(method: Method) -> api::ApiError {
    api::ApiError::method_not_allowed(format!("method {method} is not supported on this path"))
}
