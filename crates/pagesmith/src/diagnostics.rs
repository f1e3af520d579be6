//! The error channel.
//!
//! Failures inside filters cannot propagate out of the template engine
//! without aborting the whole render, so they are reported here instead and
//! the filter resolves to an empty value. The transform drains the channel
//! after each file and hands the collected errors back with the file.
//!
//! Listeners registered with [`ErrorChannel::subscribe`] observe each error
//! as it is reported.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::PluginError;

type Listener = Arc<dyn Fn(&PluginError) + Send + Sync>;

#[derive(Default)]
struct Inner {
    pending: Mutex<Vec<PluginError>>,
    listeners: Mutex<Vec<Listener>>,
}

/// Run-scoped collector for [`PluginError`]s.
///
/// Cloning is cheap and yields a handle to the same channel.
#[derive(Clone, Default)]
pub struct ErrorChannel {
    inner: Arc<Inner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ErrorChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback invoked for every reported error.
    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(&PluginError) + Send + Sync + 'static,
    {
        lock(&self.inner.listeners).push(Arc::new(listener));
    }

    /// Reports an error: logs it, notifies listeners and queues it.
    pub fn report(&self, error: PluginError) {
        tracing::warn!(
            plugin = %error.plugin,
            kind = ?error.kind,
            path = ?error.path,
            "{}",
            error.message
        );

        let listeners = lock(&self.inner.listeners).clone();
        for listener in &listeners {
            listener(&error);
        }

        lock(&self.inner.pending).push(error);
    }

    /// Takes every queued error, leaving the channel empty.
    pub fn drain(&self) -> Vec<PluginError> {
        std::mem::take(&mut *lock(&self.inner.pending))
    }

    /// Number of queued errors.
    pub fn pending(&self) -> usize {
        lock(&self.inner.pending).len()
    }
}

impl std::fmt::Debug for ErrorChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorChannel")
            .field("pending", &self.pending())
            .field("listeners", &lock(&self.inner.listeners).len())
            .finish()
    }
}
