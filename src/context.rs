use std::fmt;
use std::sync::Arc;

use crate::capability::Capabilities;
use crate::runtime::Runtime;

/// The host services a module is validated against: the runtime used for
/// file-system checks and the registry of known components.
///
/// Cheap to clone; every module keeps one so its setters and `save` can
/// re-validate without reaching for global state.
#[derive(Clone)]
pub struct HostContext {
    runtime: Arc<dyn Runtime>,
    capabilities: Arc<Capabilities>,
}

impl HostContext {
    pub fn new(runtime: Arc<dyn Runtime>, capabilities: Arc<Capabilities>) -> Self {
        Self {
            runtime,
            capabilities,
        }
    }

    pub fn runtime(&self) -> &dyn Runtime {
        self.runtime.as_ref()
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn shared_capabilities(&self) -> Arc<Capabilities> {
        Arc::clone(&self.capabilities)
    }
}

impl fmt::Debug for HostContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostContext")
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}
