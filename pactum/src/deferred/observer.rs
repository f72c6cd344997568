//! Diagnostic hook for rejections nobody looked at.
//!
//! A rejected [`Deferred`](crate::Deferred) whose outcome was never observed
//! (no continuation, no `join`, `wait`, `peek` or `.await`) would otherwise
//! fail silently. When the last handle to such a deferred is dropped, the
//! installed observer is called with its error. The default observer logs
//! the error at `warn` level.

use crate::error::Error;

use std::sync::{Arc, PoisonError, RwLock};

type Hook = Arc<dyn Fn(&Error) + Send + Sync + 'static>;

static OBSERVER: RwLock<Option<Hook>> = RwLock::new(None);

/// Installs `hook` as the unobserved-rejection observer.
///
/// The hook runs on whichever thread drops the last handle, so it must not
/// block for long.
pub fn set(hook: impl Fn(&Error) + Send + Sync + 'static) {
    *OBSERVER.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(hook));
}

/// Restores the default, logging observer.
pub fn reset() {
    *OBSERVER.write().unwrap_or_else(PoisonError::into_inner) = None;
}

pub(crate) fn report_unobserved(error: &Error) {
    let hook = OBSERVER
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();

    match hook {
        Some(hook) => hook(error),
        None => tracing::warn!(%error, "deferred was rejected but its outcome was never observed"),
    }
}
