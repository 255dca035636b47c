//! Testing utilities for hookserve.
//!
//! - [`RecordingHook`]: a hook playing every role that records the UIDs it sees
//! - [`RecordingServer`]: an [`ApiServer`] that keeps what is installed into it

use hookserve_core::{
    AdmissionRequest, AdmissionResponse, BoxError, CancellationToken, ClientConfig, ConfigError,
    ConversionHook, ConversionRequest, ConversionResponse, Initialize, MutatingHook,
    ResourceDescriptor, ValidatingHook,
};
use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use crate::{
    assembler::{ApiGroupDescriptor, ApiServer},
    lifecycle::{PostStartHook, PostStartHooks},
};

// ============================================================================
// Recording Hook
// ============================================================================

/// A hook that records the UID of every review it answers.
///
/// It serves the same descriptor in every role, allows everything except
/// `DELETE`, patches with an empty JSON object when mutating, and converts by
/// returning the objects unchanged. Clones share their records.
///
/// # Example
///
/// ```rust,ignore
/// let hook = RecordingHook::new("samples.example.io", "v1", "widgets");
/// let registration = HookRegistration::builder(hook.clone()).validating().build();
///
/// // Serve some reviews...
/// assert_eq!(hook.uids(), ["uid-1"]);
/// ```
#[derive(Debug, Clone)]
pub struct RecordingHook {
    descriptor: ResourceDescriptor,
    uids: Arc<Mutex<Vec<String>>>,
    inits: Arc<AtomicUsize>,
    init_error: Option<String>,
    delay: Option<Duration>,
}

impl RecordingHook {
    /// Create a hook served at `group/version/resource`.
    pub fn new(group: &str, version: &str, resource: &str) -> Self {
        Self {
            descriptor: ResourceDescriptor::new(group, version, resource, ""),
            uids: Arc::new(Mutex::new(Vec::new())),
            inits: Arc::new(AtomicUsize::new(0)),
            init_error: None,
            delay: None,
        }
    }

    /// Make initialization fail with `message`.
    pub fn failing_init(mut self, message: impl Into<String>) -> Self {
        self.init_error = Some(message.into());
        self
    }

    /// Block for `delay` before answering each review.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// UIDs seen so far, in arrival order.
    pub fn uids(&self) -> Vec<String> {
        self.uids.lock().unwrap().clone()
    }

    /// Number of times initialization ran.
    pub fn init_count(&self) -> usize {
        self.inits.load(Ordering::SeqCst)
    }

    fn record(&self, uid: &str) {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        self.uids.lock().unwrap().push(uid.to_string());
    }

    fn decide(&self, request: &AdmissionRequest) -> AdmissionResponse {
        self.record(&request.uid);
        if request.operation == "DELETE" {
            AdmissionResponse::deny(&request.uid, "deletes are not allowed")
        } else {
            AdmissionResponse::allow(&request.uid)
        }
    }
}

impl Initialize for RecordingHook {
    async fn initialize(
        &self,
        _client: &ClientConfig,
        _shutdown: CancellationToken,
    ) -> Result<(), BoxError> {
        self.inits.fetch_add(1, Ordering::SeqCst);
        match &self.init_error {
            Some(message) => Err(message.clone().into()),
            None => Ok(()),
        }
    }
}

impl ValidatingHook for RecordingHook {
    fn validating_resource(&self) -> ResourceDescriptor {
        self.descriptor.clone()
    }

    fn validate(&self, request: &AdmissionRequest) -> AdmissionResponse {
        self.decide(request)
    }
}

impl MutatingHook for RecordingHook {
    fn mutating_resource(&self) -> ResourceDescriptor {
        self.descriptor.clone()
    }

    fn admit(&self, request: &AdmissionRequest) -> AdmissionResponse {
        let response = self.decide(request);
        if response.allowed {
            response.with_patch(b"{}".to_vec())
        } else {
            response
        }
    }
}

impl ConversionHook for RecordingHook {
    fn conversion_resource(&self) -> ResourceDescriptor {
        self.descriptor.clone()
    }

    fn convert(&self, request: &ConversionRequest) -> ConversionResponse {
        self.record(&request.uid);
        ConversionResponse::success(&request.uid, request.objects.clone())
    }
}

// ============================================================================
// Recording Server
// ============================================================================

/// An [`ApiServer`] that stores installed groups and post-start hooks.
#[derive(Debug, Default)]
pub struct RecordingServer {
    /// Installed groups, in installation order.
    pub groups: Vec<ApiGroupDescriptor>,
    /// Registered post-start hooks.
    pub post_start: PostStartHooks,
    /// Refuse every group installation.
    pub reject_groups: bool,
}

impl ApiServer for RecordingServer {
    fn install_api_group(&mut self, group: ApiGroupDescriptor) -> Result<(), ConfigError> {
        if self.reject_groups || self.groups.iter().any(|g| g.name == group.name) {
            return Err(ConfigError::GroupAlreadyInstalled(group.name));
        }
        self.groups.push(group);
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
