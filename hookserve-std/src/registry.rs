//! Hook registration.
//!
//! Callers describe each hook with a [`HookRegistration`], listing the roles
//! it plays. A [`RegistryBuilder`] collects registrations and freezes them
//! into a [`HookRegistry`], which groups the resulting entries by API group
//! and version for the assembler.

use hookserve_core::{
    ConfigError, ConversionHook, DynInitialize, Initialize, MutatingHook, ResourceDescriptor,
    ReviewEndpoint, ValidatingHook,
};
use indexmap::IndexMap;
use std::sync::Arc;

/// One role of one hook: a descriptor and the endpoint serving it.
#[derive(Debug, Clone)]
pub struct HookEntry {
    /// Where the role is hosted.
    pub descriptor: ResourceDescriptor,
    /// The bound transform.
    pub endpoint: ReviewEndpoint,
    /// Name of the hook type, for diagnostics.
    pub hook_name: &'static str,
    /// Post-start hook running this hook's initializer, shared by all its roles.
    pub init_hook: String,
}

/// Entries grouped by API group, then version, in first-seen order.
pub type GroupedEntries<'a> = IndexMap<String, IndexMap<String, Vec<&'a HookEntry>>>;

/// A caller hook and the roles it plays.
pub struct HookRegistration {
    name: &'static str,
    initializer: Arc<dyn DynInitialize>,
    entries: Vec<HookEntry>,
}

impl HookRegistration {
    /// Start describing a hook.
    pub fn builder<H: Initialize>(hook: H) -> RegistrationBuilder<H> {
        RegistrationBuilder {
            hook: Arc::new(hook),
            entries: Vec::new(),
        }
    }

    /// Rust type name of the hook.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The roles, in the order they were declared.
    pub fn entries(&self) -> &[HookEntry] {
        &self.entries
    }

    /// The hook's initializer.
    pub fn initializer(&self) -> Arc<dyn DynInitialize> {
        Arc::clone(&self.initializer)
    }

    /// Post-start hook name, derived from the first declared role.
    pub fn init_hook_name(&self) -> Option<String> {
        self.entries.first().map(|e| e.descriptor.init_hook_name())
    }
}

impl std::fmt::Debug for HookRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRegistration")
            .field("name", &self.name)
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}

/// Builder for a [`HookRegistration`].
pub struct RegistrationBuilder<H> {
    hook: Arc<H>,
    entries: Vec<HookEntry>,
}

impl<H: Initialize> RegistrationBuilder<H> {
    /// Host the hook's validating role.
    pub fn validating(mut self) -> Self
    where
        H: ValidatingHook,
    {
        let hook: Arc<dyn ValidatingHook> = self.hook.clone();
        self.push(hook.validating_resource(), ReviewEndpoint::Validating(hook));
        self
    }

    /// Host the hook's mutating role.
    pub fn mutating(mut self) -> Self
    where
        H: MutatingHook,
    {
        let hook: Arc<dyn MutatingHook> = self.hook.clone();
        self.push(hook.mutating_resource(), ReviewEndpoint::Mutating(hook));
        self
    }

    /// Host the hook's conversion role.
    pub fn converting(mut self) -> Self
    where
        H: ConversionHook,
    {
        let hook: Arc<dyn ConversionHook> = self.hook.clone();
        self.push(hook.conversion_resource(), ReviewEndpoint::Converting(hook));
        self
    }

    fn push(&mut self, descriptor: ResourceDescriptor, endpoint: ReviewEndpoint) {
        self.entries.push(HookEntry {
            descriptor,
            endpoint,
            hook_name: std::any::type_name::<H>(),
            init_hook: String::new(),
        });
    }

    /// Finish the registration.
    pub fn build(mut self) -> HookRegistration {
        if let Some(init_hook) = self.entries.first().map(|e| e.descriptor.init_hook_name()) {
            for entry in &mut self.entries {
                entry.init_hook.clone_from(&init_hook);
            }
        }
        HookRegistration {
            name: std::any::type_name::<H>(),
            initializer: self.hook,
            entries: self.entries,
        }
    }
}

/// A frozen set of registrations.
#[derive(Debug, Default)]
pub struct HookRegistry {
    registrations: Vec<HookRegistration>,
}

impl HookRegistry {
    /// All registrations in registration order.
    pub fn registrations(&self) -> &[HookRegistration] {
        &self.registrations
    }

    /// Every entry of every registration, in registration order.
    pub fn entries(&self) -> impl Iterator<Item = &HookEntry> {
        self.registrations.iter().flat_map(|r| r.entries.iter())
    }

    /// Group entries by API group, then version.
    pub fn by_group_then_version(&self) -> GroupedEntries<'_> {
        group_by_group_then_version(self.entries())
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

/// Bucket entries by `(group, version)`.
///
/// Input order is preserved at every level; nothing is sorted or dropped,
/// and entries claiming the same resource land in the same bucket.
pub fn group_by_group_then_version<'a>(
    entries: impl IntoIterator<Item = &'a HookEntry>,
) -> GroupedEntries<'a> {
    let mut grouped: GroupedEntries<'a> = IndexMap::new();
    for entry in entries {
        grouped
            .entry(entry.descriptor.group.clone())
            .or_default()
            .entry(entry.descriptor.version.clone())
            .or_default()
            .push(entry);
    }
    grouped
}

/// Builder for constructing a [`HookRegistry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    registrations: Vec<HookRegistration>,
}

impl RegistryBuilder {
    /// Create a new empty registry builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook.
    pub fn register(mut self, registration: HookRegistration) -> Self {
        self.registrations.push(registration);
        self
    }

    /// Register several hooks.
    pub fn register_all(
        mut self,
        registrations: impl IntoIterator<Item = HookRegistration>,
    ) -> Self {
        self.registrations.extend(registrations);
        self
    }

    /// Build the registry, validating every declared descriptor.
    pub fn build(self) -> Result<HookRegistry, ConfigError> {
        for registration in &self.registrations {
            if registration.entries.is_empty() {
                return Err(ConfigError::NoResources(registration.name.to_string()));
            }
            for entry in &registration.entries {
                entry.descriptor.validate(entry.hook_name)?;
            }
        }
        Ok(HookRegistry {
            registrations: self.registrations,
        })
    }
}
