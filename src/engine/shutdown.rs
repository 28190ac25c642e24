// src/engine/shutdown.rs

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

use crate::errors::{Result, ShipperError};

/// Cooperative cancellation shared between the Ctrl-C listener and the
/// blocking core.
///
/// The core never gets interrupted mid-transfer; it checks the flag between
/// events and wakes early from its timed waits.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        let (flag, cvar) = &*self.inner;
        *flag.lock().unwrap_or_else(PoisonError::into_inner) = true;
        cvar.notify_all();
    }

    pub fn is_requested(&self) -> bool {
        *self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleep for `duration` unless shutdown is requested first, in which
    /// case `ShipperError::Interrupted` is returned.
    pub fn sleep(&self, duration: Duration) -> Result<()> {
        let (flag, cvar) = &*self.inner;
        let guard = flag.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _timeout) = cvar
            .wait_timeout_while(guard, duration, |requested| !*requested)
            .unwrap_or_else(PoisonError::into_inner);
        if *guard {
            Err(ShipperError::Interrupted)
        } else {
            Ok(())
        }
    }
}
