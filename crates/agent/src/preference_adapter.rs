use orion_core::Result;
use orion_storage::PreferenceStore;
use orion_tools::PreferenceOps;

/// Adapter that implements the tools crate's `PreferenceOps` trait
/// by delegating to the storage crate's `PreferenceStore`.
pub struct PreferenceStoreAdapter {
    store: PreferenceStore,
}

impl PreferenceStoreAdapter {
    pub fn new(store: PreferenceStore) -> Self {
        Self { store }
    }
}

impl PreferenceOps for PreferenceStoreAdapter {
    fn set_preference(&self, key: &str, value: &str) -> Result<()> {
        self.store.set(key.trim(), value)
    }

    fn get_preference(&self, key: &str) -> Result<Option<String>> {
        self.store.get(key.trim())
    }
}
