//! Cooperative cancellation for trie operations
//!
//! Every recursive trie entry point and every store round trip checks the
//! context before doing work. Clones share the same flag, so a context handed
//! to an operation can be cancelled from elsewhere.

use crate::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cancellation signal shared between a caller and the operations it runs
#[derive(Clone, Debug, Default)]
pub struct Context {
    cancelled: Arc<AtomicBool>,
}

impl Context {
    /// A fresh, uncancelled context
    pub fn new() -> Self {
        Context::default()
    }

    /// Signal cancellation to every operation holding this context
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Fail with [`Error::Cancelled`] once cancellation has been signalled
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }
}
