//! API surface assembly.
//!
//! Turns the registry's `(group, version)` buckets into one
//! [`ApiGroupDescriptor`] per group and installs them, along with one
//! post-start hook per registration, into an [`ApiServer`].

use hookserve_core::{ClientConfig, ConfigError, GroupVersion};
use indexmap::IndexMap;
use std::sync::Arc;

use crate::{
    lifecycle::{PostStartHook, post_start_hook},
    registry::{HookEntry, HookRegistry},
    routing::{RouteTable, RouteTableBuilder},
};

/// Everything the serving framework needs to host one API group.
#[derive(Debug, Clone)]
pub struct ApiGroupDescriptor {
    /// Group name.
    pub name: String,
    /// Served group versions, first-seen order, no duplicates.
    pub group_versions: Vec<GroupVersion>,
    /// The group's representative version: the first one seen.
    pub preferred_version: GroupVersion,
    /// Version -> resource -> endpoint.
    pub routes: RouteTable,
}

/// The serving framework seam.
///
/// Both calls happen during bootstrap only. Errors abort the bootstrap.
pub trait ApiServer {
    /// Install a group so its routes become reachable.
    fn install_api_group(&mut self, group: ApiGroupDescriptor) -> Result<(), ConfigError>;

    /// Register a callback run once after the server starts serving.
    fn add_post_start_hook(&mut self, name: String, hook: PostStartHook)
    -> Result<(), ConfigError>;
}

/// Build the descriptor for one group's buckets.
pub fn assemble_group(
    group: &str,
    versions: &IndexMap<String, Vec<&HookEntry>>,
) -> Result<ApiGroupDescriptor, ConfigError> {
    let mut routes = RouteTableBuilder::new();
    let mut group_versions: Vec<GroupVersion> = Vec::new();

    for entries in versions.values() {
        for entry in entries {
            let gv = entry.descriptor.group_version();
            if !group_versions.contains(&gv) {
                group_versions.push(gv);
            }
            routes.insert((*entry).clone())?;
        }
    }

    let preferred_version = group_versions
        .first()
        .cloned()
        .ok_or_else(|| ConfigError::EmptyGroup(group.to_string()))?;

    tracing::debug!(
        group,
        preferred = %preferred_version,
        versions = group_versions.len(),
        "assembled API group"
    );

    Ok(ApiGroupDescriptor {
        name: group.to_string(),
        group_versions,
        preferred_version,
        routes: routes.build(),
    })
}

/// Install the whole registry into `server`.
///
/// Groups are installed in registry order. Each registration then gets one
/// post-start hook, named after its first role's coordinates, that runs the
/// hook's initializer with the shared client configuration.
pub fn install<S: ApiServer + ?Sized>(
    server: &mut S,
    registry: &HookRegistry,
    client: Arc<ClientConfig>,
) -> Result<(), ConfigError> {
    for (group, versions) in &registry.by_group_then_version() {
        let descriptor = assemble_group(group, versions)?;
        server.install_api_group(descriptor)?;
        tracing::info!(group = %group, "installed API group");
    }

    for registration in registry.registrations() {
        let name = registration
            .init_hook_name()
            .ok_or_else(|| ConfigError::NoResources(registration.name().to_string()))?;
        let initializer = registration.initializer();
        let client = Arc::clone(&client);
        server.add_post_start_hook(
            name,
            post_start_hook(move |ctx| async move {
                initializer.initialize_dyn(&client, ctx.shutdown).await
            }),
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{HookRegistration, RegistryBuilder};
    use crate::testing::{RecordingHook, RecordingServer};

    fn validating(group: &str, version: &str, resource: &str) -> HookRegistration {
        HookRegistration::builder(RecordingHook::new(group, version, resource))
            .validating()
            .build()
    }

    #[test]
    fn test_preferred_version_is_first_seen() {
        let registry = RegistryBuilder::new()
            .register(validating("a.example.io", "v1beta1", "widgets"))
            .register(validating("a.example.io", "v1", "widgets"))
            .register(validating("a.example.io", "v1beta1", "gadgets"))
            .build()
            .unwrap();
        let grouped = registry.by_group_then_version();
        let descriptor = assemble_group("a.example.io", &grouped["a.example.io"]).unwrap();

        assert_eq!(descriptor.preferred_version, GroupVersion::new("a.example.io", "v1beta1"));
        assert_eq!(
            descriptor.group_versions,
            [
                GroupVersion::new("a.example.io", "v1beta1"),
                GroupVersion::new("a.example.io", "v1"),
            ]
        );
        assert_eq!(descriptor.routes.len(), 3);
    }

    #[test]
    fn test_install_one_group_per_name() {
        let registry = RegistryBuilder::new()
            .register(validating("a.example.io", "v1", "widgets"))
            .register(validating("b.example.io", "v1", "widgets"))
            .register(validating("a.example.io", "v2", "widgets"))
            .build()
            .unwrap();
        let mut server = RecordingServer::default();
        install(&mut server, &registry, Arc::new(ClientConfig::default())).unwrap();

        let names: Vec<_> = server.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, ["a.example.io", "b.example.io"]);
        assert_eq!(
            server.post_start.names().collect::<Vec<_>>(),
            [
                "widgets.v1.a.example.io-init",
                "widgets.v1.b.example.io-init",
                "widgets.v2.a.example.io-init",
            ]
        );
    }

    #[test]
    fn test_duplicate_route_aborts_install() {
        let registry = RegistryBuilder::new()
            .register(validating("a.example.io", "v1", "widgets"))
            .register(validating("a.example.io", "v1", "widgets"))
            .build()
            .unwrap();
        let mut server = RecordingServer::default();
        let err = install(&mut server, &registry, Arc::new(ClientConfig::default())).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateRoute { .. }));
        assert!(server.groups.is_empty());
    }

    #[test]
    fn test_validating_and_mutating_on_same_resource_collide() {
        let hook = RecordingHook::new("a.example.io", "v1", "widgets");
        let registry = RegistryBuilder::new()
            .register(HookRegistration::builder(hook).validating().mutating().build())
            .build()
            .unwrap();
        let mut server = RecordingServer::default();
        let err = install(&mut server, &registry, Arc::new(ClientConfig::default())).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("validating"));
        assert!(msg.contains("mutating"));
    }

    #[test]
    fn test_install_failure_propagates() {
        let registry = RegistryBuilder::new()
            .register(validating("a.example.io", "v1", "widgets"))
            .build()
            .unwrap();
        let mut server = RecordingServer::default();
        server.reject_groups = true;
        let err = install(&mut server, &registry, Arc::new(ClientConfig::default())).unwrap_err();
        assert!(matches!(err, ConfigError::GroupAlreadyInstalled(_)));
        assert!(server.post_start.is_empty());
    }
}
