//! Per-group route tables.
//!
//! A [`RouteTable`] maps version, then resource name, to the [`HookEntry`]
//! serving it. Tables are built once at bootstrap and only read afterwards.
//! Inserting a second entry for an occupied route is a configuration error
//! naming both hooks; nothing is silently overwritten.

use hookserve_core::ConfigError;
use indexmap::IndexMap;
use indexmap::map::Entry;

use crate::registry::HookEntry;

/// Version -> resource -> entry, insertion ordered.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    versions: IndexMap<String, IndexMap<String, HookEntry>>,
}

impl RouteTable {
    /// Look up the entry serving `resource` under `version`.
    pub fn lookup(&self, version: &str, resource: &str) -> Option<&HookEntry> {
        self.versions.get(version)?.get(resource)
    }

    /// Versions with at least one route, in insertion order.
    pub fn versions(&self) -> impl Iterator<Item = &str> {
        self.versions.keys().map(String::as_str)
    }

    /// Routes under one version.
    pub fn routes(&self, version: &str) -> Option<impl Iterator<Item = &HookEntry>> {
        self.versions.get(version).map(|r| r.values())
    }

    /// Total number of routes.
    pub fn len(&self) -> usize {
        self.versions.values().map(IndexMap::len).sum()
    }

    /// Whether the table has no routes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Builder for a [`RouteTable`].
#[derive(Debug, Default)]
pub struct RouteTableBuilder {
    versions: IndexMap<String, IndexMap<String, HookEntry>>,
}

impl RouteTableBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route for the entry's version and resource.
    ///
    /// Returns an error if the route is already taken.
    pub fn insert(&mut self, entry: HookEntry) -> Result<(), ConfigError> {
        let resources = self
            .versions
            .entry(entry.descriptor.version.clone())
            .or_default();
        match resources.entry(entry.descriptor.resource.clone()) {
            Entry::Occupied(existing) => Err(ConfigError::DuplicateRoute {
                gvr: entry.descriptor.gvr(),
                first: format!("{} ({})", existing.get().hook_name, existing.get().endpoint.kind()),
                second: format!("{} ({})", entry.hook_name, entry.endpoint.kind()),
            }),
            Entry::Vacant(slot) => {
                slot.insert(entry);
                Ok(())
            }
        }
    }

    /// Build the table, consuming the builder.
    pub fn build(self) -> RouteTable {
        RouteTable {
            versions: self.versions,
        }
    }
}
