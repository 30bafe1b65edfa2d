//! Cooperative cancellation on termination requests
//!
//! The signal handler only raises a flag. Emitters check it at safe
//! points and the main loop performs the device teardown.

use log::info;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a token raised by SIGINT, SIGTERM or SIGHUP
    pub fn install() -> Result<Self, ctrlc::Error> {
        let token = Self::new();
        let handler_token = token.clone();
        ctrlc::set_handler(move || {
            if !handler_token.is_cancelled() {
                info!("termination requested");
            }
            handler_token.cancel();
        })?;
        Ok(token)
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
