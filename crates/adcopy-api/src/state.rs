use adcopy_core::{Config, SizeLimits};
use adcopy_storage::StorageGateway;

/// Shared state for every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub gateway: StorageGateway,
    pub limits: SizeLimits,
}

impl AppState {
    pub fn new(config: Config, gateway: StorageGateway) -> Self {
        let limits = config.size_limits();
        Self {
            config,
            gateway,
            limits,
        }
    }
}
