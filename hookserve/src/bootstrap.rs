//! Bootstrap orchestration.
//!
//! [`bootstrap`] is the pure part: registry, then assembly into a fresh
//! [`WebhookServer`]. [`run_admission_server`] wraps it with everything a
//! process needs: flags, logging, signals, client configuration, serving.

use clap::Parser;
use hookserve_core::{CancellationToken, ClientConfig, Error};
use hookserve_std::{
    assembler::install,
    registry::{HookRegistration, RegistryBuilder},
};
use std::sync::Arc;

use crate::{
    config::{Options, ServerConfig},
    logging,
    server::WebhookServer,
    signal,
};

/// Register `registrations` and install them into a new server.
///
/// Any configuration error aborts before anything is served.
pub fn bootstrap(
    config: ServerConfig,
    client: Arc<ClientConfig>,
    registrations: impl IntoIterator<Item = HookRegistration>,
) -> Result<WebhookServer, Error> {
    let registry = RegistryBuilder::new().register_all(registrations).build()?;
    let mut server = WebhookServer::new(config);
    install(&mut server, &registry, client)?;
    tracing::debug!(
        groups = server.groups().count(),
        hooks = registry.registrations().len(),
        "bootstrap complete"
    );
    Ok(server)
}

/// Run an admission server for `registrations` until SIGINT or SIGTERM.
///
/// Reads [`Options`] from the command line and resolves the in-cluster
/// client configuration. Errors are logged before being returned.
pub async fn run_admission_server(
    registrations: impl IntoIterator<Item = HookRegistration>,
) -> Result<(), Error> {
    let options = Options::parse();
    logging::init(options.log_filter.as_deref());

    let result = run(options, registrations).await;
    if let Err(err) = &result {
        tracing::error!(error = %err, "admission server failed");
    }
    result
}

async fn run(
    options: Options,
    registrations: impl IntoIterator<Item = HookRegistration>,
) -> Result<(), Error> {
    let shutdown = CancellationToken::new();
    signal::cancel_on_signal(shutdown.clone());

    let client = Arc::new(ClientConfig::in_cluster()?);
    tracing::info!(host = %client.host, "resolved in-cluster client configuration");

    let server = bootstrap(options.server_config(), client, registrations)?;
    let listener = server.bind().await?;
    server.serve(listener, shutdown).await
}
