//! Post-start hooks.
//!
//! Bootstrap registers one named callback per hook; the server starts them
//! all, each on its own task, once its listener is bound. Their outcomes are
//! tracked in a shared [`PostStartStatus`] that readiness reporting reads.
//!
//! Hooks are not ordered relative to each other or to incoming reviews, and
//! a failing hook only marks itself failed.

use futures::{FutureExt, future::BoxFuture};
use hookserve_core::{BoxError, ConfigError, panic_message};
use indexmap::IndexMap;
use std::{
    future::Future,
    panic::AssertUnwindSafe,
    sync::{Arc, PoisonError, RwLock},
};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// What a post-start hook receives when it runs.
#[derive(Debug, Clone)]
pub struct PostStartContext {
    /// Cancelled when the server shuts down.
    pub shutdown: CancellationToken,
}

/// A callback run once after the server starts serving.
pub type PostStartHook =
    Box<dyn FnOnce(PostStartContext) -> BoxFuture<'static, Result<(), BoxError>> + Send>;

/// Box an async closure as a [`PostStartHook`].
pub fn post_start_hook<F, Fut>(f: F) -> PostStartHook
where
    F: FnOnce(PostStartContext) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    Box::new(move |ctx| f(ctx).boxed())
}

/// Outcome of one post-start hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookState {
    /// Still running.
    Pending,
    /// Returned successfully.
    Completed,
    /// Returned an error or panicked.
    Failed(String),
}

/// Named post-start hooks waiting to be started.
#[derive(Default)]
pub struct PostStartHooks {
    hooks: IndexMap<String, PostStartHook>,
}

impl std::fmt::Debug for PostStartHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.hooks.keys()).finish()
    }
}

impl PostStartHooks {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a hook. Names must be unique.
    pub fn add(&mut self, name: String, hook: PostStartHook) -> Result<(), ConfigError> {
        if self.hooks.contains_key(&name) {
            return Err(ConfigError::DuplicatePostStartHook(name));
        }
        self.hooks.insert(name, hook);
        Ok(())
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.hooks.keys().map(String::as_str)
    }

    /// Number of registered hooks.
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Whether no hook is registered.
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Spawn every hook on its own task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(self, shutdown: CancellationToken) -> PostStartStatus {
        let status = PostStartStatus::with_pending(self.hooks.keys().cloned());

        for (name, hook) in self.hooks {
            let status = status.clone();
            let ctx = PostStartContext {
                shutdown: shutdown.clone(),
            };
            tracing::debug!(hook = %name, "starting post-start hook");
            tokio::spawn(async move {
                let outcome = AssertUnwindSafe(hook(ctx)).catch_unwind().await;
                let state = match outcome {
                    Ok(Ok(())) => {
                        tracing::info!(hook = %name, "post-start hook completed");
                        HookState::Completed
                    }
                    Ok(Err(err)) => {
                        tracing::error!(hook = %name, error = %err, "post-start hook failed");
                        HookState::Failed(err.to_string())
                    }
                    Err(payload) => {
                        let msg = panic_message(payload.as_ref());
                        tracing::error!(hook = %name, panic = %msg, "post-start hook panicked");
                        HookState::Failed(format!("panicked: {msg}"))
                    }
                };
                status.finish(&name, state);
            });
        }
        status
    }
}

/// Shared view of started post-start hooks.
///
/// Cloning shares the same underlying state.
#[derive(Debug, Clone)]
pub struct PostStartStatus {
    inner: Arc<StatusInner>,
}

#[derive(Debug)]
struct StatusInner {
    states: RwLock<IndexMap<String, HookState>>,
    remaining: watch::Sender<usize>,
}

impl Default for PostStartStatus {
    fn default() -> Self {
        Self::with_pending(std::iter::empty())
    }
}

impl PostStartStatus {
    fn with_pending(names: impl IntoIterator<Item = String>) -> Self {
        let states: IndexMap<_, _> = names.into_iter().map(|n| (n, HookState::Pending)).collect();
        let (remaining, _) = watch::channel(states.len());
        Self {
            inner: Arc::new(StatusInner {
                states: RwLock::new(states),
                remaining,
            }),
        }
    }

    fn finish(&self, name: &str, state: HookState) {
        let mut states = self
            .inner
            .states
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = states.get_mut(name) {
            *slot = state;
        }
        drop(states);
        self.inner
            .remaining
            .send_modify(|n| *n = n.saturating_sub(1));
    }

    /// State of one hook.
    pub fn state(&self, name: &str) -> Option<HookState> {
        self.inner
            .states
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Every hook and its state, in registration order.
    pub fn states(&self) -> Vec<(String, HookState)> {
        self.inner
            .states
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(n, s)| (n.clone(), s.clone()))
            .collect()
    }

    /// Whether every hook has completed successfully.
    pub fn is_ready(&self) -> bool {
        self.inner
            .states
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .all(|s| *s == HookState::Completed)
    }

    /// Resolve once no hook is pending.
    pub async fn wait(&self) {
        let mut rx = self.inner.remaining.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}
