pub mod local;
pub mod provider;

pub use local::*;
pub use provider::*;

use std::sync::Arc;

use crate::config::Config;

/// Build the configured storage provider. Only local storage today; remote
/// backends slot in behind the same trait.
pub fn create_provider(config: &Config) -> Arc<dyn StorageProvider> {
    Arc::new(LocalStorage::new(&config.storage.local_path))
}
