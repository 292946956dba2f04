//! Per-method chain publication.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::error::CompositionError;

use super::InvocationChain;

/// Cache cell holding at most one published chain.
///
/// Builds for the slot are serialised by `build_lock`; readers only take the
/// read side of `published` and see either nothing or a complete chain.
#[derive(Debug, Default)]
pub(crate) struct ChainSlot {
    published: RwLock<Option<Arc<InvocationChain>>>,
    build_lock: Mutex<()>,
}

impl ChainSlot {
    pub(crate) fn current(&self) -> Option<Arc<InvocationChain>> {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the published chain, building and publishing it first when
    /// the slot is empty. `build` runs at most once per slot.
    pub(crate) fn get_or_build<F>(&self, build: F) -> Result<Arc<InvocationChain>, CompositionError>
    where
        F: FnOnce() -> Result<InvocationChain, CompositionError>,
    {
        if let Some(chain) = self.current() {
            return Ok(chain);
        }
        let _guard = self.build_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(chain) = self.current() {
            return Ok(chain);
        }
        Ok(self.publish(build()?))
    }

    /// Builds a fresh chain and swaps it in, whatever was published before.
    pub(crate) fn rebuild<F>(&self, build: F) -> Result<Arc<InvocationChain>, CompositionError>
    where
        F: FnOnce() -> Result<InvocationChain, CompositionError>,
    {
        let _guard = self.build_lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.publish(build()?))
    }

    fn publish(&self, chain: InvocationChain) -> Arc<InvocationChain> {
        let published = Arc::new(chain);
        *self
            .published
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&published));
        published
    }
}
