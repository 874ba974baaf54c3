//! Persistent handles with an explicit release point.

use std::fmt;

use sysbridge_host::{Isolate, Local};
use tracing::warn;

#[cfg(feature = "legacy-api")]
type Inner<T> = sysbridge_host::legacy::Persistent<T>;
#[cfg(not(feature = "legacy-api"))]
type Inner<T> = sysbridge_host::modern::Persistent<T>;

/// A handle that survives handle scopes until [`Persistent::reset`].
///
/// The value itself stays in the isolate; this is only a token for it, so it
/// can travel to other threads and back. It can only be dereferenced on the
/// isolate's thread. Release is explicit: dropping a token that was never
/// reset leaks its slot and is logged.
pub struct Persistent<T> {
    inner: Inner<T>,
}

impl<T> Persistent<T> {
    /// Retain the value behind `local`.
    #[must_use]
    pub fn new(isolate: &Isolate, local: Local<T>) -> Self {
        #[cfg(feature = "legacy-api")]
        let inner = {
            let _entered = isolate.enter();
            Inner::new(local)
        };
        #[cfg(not(feature = "legacy-api"))]
        let inner = Inner::new(isolate, local);
        Self { inner }
    }

    /// A scoped handle to the retained value.
    #[must_use]
    pub fn to_local(&self, isolate: &Isolate) -> Local<T> {
        #[cfg(feature = "legacy-api")]
        {
            let _entered = isolate.enter();
            self.inner.handle()
        }
        #[cfg(not(feature = "legacy-api"))]
        {
            self.inner.get(isolate)
        }
    }

    /// Release the retained value.
    pub fn reset(mut self, isolate: &Isolate) {
        #[cfg(feature = "legacy-api")]
        {
            let _entered = isolate.enter();
            self.inner.dispose();
        }
        #[cfg(not(feature = "legacy-api"))]
        {
            self.inner.reset(isolate);
        }
    }

    /// Whether the token no longer holds a value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<T> Drop for Persistent<T> {
    fn drop(&mut self) {
        if !self.inner.is_empty() {
            warn!("persistent handle dropped without reset, slot leaked");
        }
    }
}

impl<T> fmt::Debug for Persistent<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Persistent")
            .field("empty", &self.is_empty())
            .finish()
    }
}
