//! Aggregate cache.
//!
//! One memo over the whole registry. Its computation forces every slot in
//! registration order, so it reads the registry tag plus each slot's memo
//! tag. It is therefore stale exactly when at least one slot is, and forcing
//! it re-runs only the slots whose own dependencies changed.

use std::sync::Arc;

use tracing::trace;

use super::registry::EffectRegistry;
use crate::error::{ModifierError, Result};
use crate::reactive::{Memo, MemoState};

#[derive(Debug)]
pub struct AggregateCache {
    registry: Arc<EffectRegistry>,
    memo: Memo<(), ModifierError>,
}

impl AggregateCache {
    pub fn new(registry: Arc<EffectRegistry>) -> Self {
        let slots = Arc::clone(&registry);
        let memo = Memo::try_new(move || -> Result<()> {
            for slot in slots.iter() {
                slot.sync()?;
            }
            Ok(())
        });
        Self { registry, memo }
    }

    /// Force every slot that needs it, stopping at the first failure.
    pub fn force_reevaluate(&self) -> Result<()> {
        if self.memo.state() == MemoState::Clean {
            trace!("re-check found nothing to do");
        }
        self.memo.try_get()
    }

    pub fn registry(&self) -> &EffectRegistry {
        &self.registry
    }

    pub fn state(&self) -> MemoState {
        self.memo.state()
    }
}
