//! Resource coordinates.
//!
//! A hook declares where it wants to be hosted with a [`ResourceDescriptor`]:
//! the API group, version, plural resource name and singular name. The
//! descriptor is produced once at registration and never changes afterwards.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

use crate::error::ConfigError;

static DNS1123_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("static regex"));

const DNS1123_LABEL_MAX: usize = 63;
const DNS1123_SUBDOMAIN_MAX: usize = 253;

/// An API group and version, e.g. `admission.k8s.io/v1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GroupVersion {
    /// API group; empty for the core group.
    pub group: String,
    /// Version within the group.
    pub version: String,
}

impl GroupVersion {
    /// Create a group version.
    pub fn new(group: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
        }
    }

    /// Parse an `apiVersion` string (`group/version` or bare `version`).
    pub fn parse(api_version: &str) -> Self {
        match api_version.split_once('/') {
            Some((group, version)) => Self::new(group, version),
            None => Self::new("", api_version),
        }
    }

    /// Attach a kind.
    pub fn with_kind(&self, kind: impl Into<String>) -> GroupVersionKind {
        GroupVersionKind {
            group: self.group.clone(),
            version: self.version.clone(),
            kind: kind.into(),
        }
    }
}

impl fmt::Display for GroupVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}", self.version)
        } else {
            write!(f, "{}/{}", self.group, self.version)
        }
    }
}

/// Group, version and plural resource name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GroupVersionResource {
    /// API group.
    pub group: String,
    /// Version.
    pub version: String,
    /// Plural resource name.
    pub resource: String,
}

impl GroupVersionResource {
    /// Create a group/version/resource triple.
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            resource: resource.into(),
        }
    }

    /// The group version this resource lives in.
    pub fn group_version(&self) -> GroupVersion {
        GroupVersion::new(self.group.clone(), self.version.clone())
    }
}

impl fmt::Display for GroupVersionResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.resource, self.version, self.group)
    }
}

/// Group, version and kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupVersionKind {
    /// API group.
    pub group: String,
    /// Version.
    pub version: String,
    /// Kind name.
    pub kind: String,
}

/// Where a hook is hosted.
///
/// Identity is `(group, version, resource)`; `singular` is only used for
/// discovery.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceDescriptor {
    /// API group, e.g. `samples.example.io`.
    pub group: String,
    /// Version, e.g. `v1`.
    pub version: String,
    /// Plural resource name, the last path segment of the endpoint.
    pub resource: String,
    /// Singular resource name.
    pub singular: String,
}

impl ResourceDescriptor {
    /// Create a descriptor. An empty `singular` falls back to `resource`.
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        resource: impl Into<String>,
        singular: impl Into<String>,
    ) -> Self {
        let resource = resource.into();
        let mut singular = singular.into();
        if singular.is_empty() {
            singular = resource.clone();
        }
        Self {
            group: group.into(),
            version: version.into(),
            resource,
            singular,
        }
    }

    /// The identifying triple.
    pub fn gvr(&self) -> GroupVersionResource {
        GroupVersionResource::new(&self.group, &self.version, &self.resource)
    }

    /// The group version this descriptor is served under.
    pub fn group_version(&self) -> GroupVersion {
        GroupVersion::new(&self.group, &self.version)
    }

    /// Name of the post-start hook derived from these coordinates.
    pub fn init_hook_name(&self) -> String {
        format!("{}-init", self.gvr())
    }

    /// URL path the orchestrator posts reviews to.
    pub fn path(&self) -> String {
        format!("/apis/{}/{}/{}", self.group, self.version, self.resource)
    }

    /// Check every coordinate is well formed.
    ///
    /// `hook` names the declaring hook in the returned error.
    pub fn validate(&self, hook: &str) -> Result<(), ConfigError> {
        let invalid = |field: &'static str, value: &str, reason: String| {
            ConfigError::InvalidResource {
                hook: hook.to_string(),
                field,
                value: value.to_string(),
                reason,
            }
        };

        if self.group.is_empty() {
            return Err(invalid("group", &self.group, "must not be empty".into()));
        }
        if self.group.len() > DNS1123_SUBDOMAIN_MAX {
            return Err(invalid(
                "group",
                &self.group,
                format!("must be no more than {DNS1123_SUBDOMAIN_MAX} characters"),
            ));
        }
        if !self.group.split('.').all(|l| DNS1123_LABEL.is_match(l)) {
            return Err(invalid(
                "group",
                &self.group,
                "must be a lowercase RFC 1123 subdomain".into(),
            ));
        }

        for (field, value) in [
            ("version", &self.version),
            ("resource", &self.resource),
            ("singular", &self.singular),
        ] {
            if value.len() > DNS1123_LABEL_MAX {
                return Err(invalid(
                    field,
                    value,
                    format!("must be no more than {DNS1123_LABEL_MAX} characters"),
                ));
            }
            if !DNS1123_LABEL.is_match(value) {
                return Err(invalid(
                    field,
                    value,
                    "must be a lowercase RFC 1123 label".into(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widgets() -> ResourceDescriptor {
        ResourceDescriptor::new("samples.example.io", "v1", "widgets", "widget")
    }

    #[test]
    fn test_descriptor_derivations() {
        let d = widgets();
        assert_eq!(d.path(), "/apis/samples.example.io/v1/widgets");
        assert_eq!(d.init_hook_name(), "widgets.v1.samples.example.io-init");
        assert_eq!(d.group_version().to_string(), "samples.example.io/v1");
    }

    #[test]
    fn test_singular_defaults_to_resource() {
        let d = ResourceDescriptor::new("samples.example.io", "v1", "widgets", "");
        assert_eq!(d.singular, "widgets");
    }

    #[test]
    fn test_validate_accepts_well_formed() {
        assert!(widgets().validate("hook").is_ok());
    }

    #[test]
    fn test_validate_rejects_malformed() {
        let cases = [
            ResourceDescriptor::new("", "v1", "widgets", "widget"),
            ResourceDescriptor::new("Samples.example.io", "v1", "widgets", "widget"),
            ResourceDescriptor::new("samples..io", "v1", "widgets", "widget"),
            ResourceDescriptor::new("samples.example.io", "", "widgets", "widget"),
            ResourceDescriptor::new("samples.example.io", "v1/beta", "widgets", "widget"),
            ResourceDescriptor::new("samples.example.io", "v1", "wid/gets", "widget"),
            ResourceDescriptor::new("samples.example.io", "v1", "widgets", "-widget"),
        ];
        for d in cases {
            assert!(d.validate("hook").is_err(), "{d:?} should be rejected");
        }
    }

    #[test]
    fn test_validate_error_names_hook_and_field() {
        let d = ResourceDescriptor::new("samples.example.io", "V1", "widgets", "widget");
        let err = d.validate("my::Hook").unwrap_err().to_string();
        assert!(err.contains("version"));
        assert!(err.contains("my::Hook"));
    }

    #[test]
    fn test_group_version_parse() {
        assert_eq!(
            GroupVersion::parse("admission.k8s.io/v1"),
            GroupVersion::new("admission.k8s.io", "v1")
        );
        assert_eq!(GroupVersion::parse("v1"), GroupVersion::new("", "v1"));
        assert_eq!(GroupVersion::new("", "v1").to_string(), "v1");
    }
}
