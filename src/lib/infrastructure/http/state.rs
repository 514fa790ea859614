//! Bridge state module

use std::{fmt, sync::Arc};

use crate::domain::communication::dispatch::DispatchService;

/// State shared by the bridge handlers, read-only after construction
#[derive(Clone)]
pub struct BridgeState<D: DispatchService> {
    /// Dispatch service
    pub dispatcher: Arc<D>,
}

impl<D> BridgeState<D>
where
    D: DispatchService,
{
    /// Create a new bridge state
    pub fn new(dispatcher: D) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }
}

impl<D> fmt::Debug for BridgeState<D>
where
    D: DispatchService,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeState")
            .field("dispatcher", &"DispatchService")
            .finish()
    }
}
