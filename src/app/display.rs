//! The display lock domain.
//!
//! [`SharedDisplay`] is the only way into the [`DisplayPort`]: every
//! write happens under its mutex, and a status flash keeps the mutex for
//! its whole dwell so no other writer can overwrite it early.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use super::ports::DisplayPort;

pub struct SharedDisplay {
    port: Mutex<Box<dyn DisplayPort>>,
}

impl SharedDisplay {
    pub fn new(port: Box<dyn DisplayPort>) -> Self {
        Self {
            port: Mutex::new(port),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Box<dyn DisplayPort>> {
        self.port.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn render(&self, text: &str) {
        self.lock().render(text);
    }

    /// Render `text` and keep the display locked for `dwell`.
    pub fn hold(&self, text: &str, dwell: Duration) {
        let mut port = self.lock();
        port.render(text);
        thread::sleep(dwell);
    }

    /// Run `f` with exclusive access to the port.
    pub fn with<R>(&self, f: impl FnOnce(&mut dyn DisplayPort) -> R) -> R {
        let mut port = self.lock();
        f(port.as_mut())
    }

    pub fn power_on(&self) {
        self.lock().set_power(true);
    }

    /// Clear and switch off.
    pub fn power_off(&self) {
        let mut port = self.lock();
        port.clear();
        port.set_power(false);
    }
}
