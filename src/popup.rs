use std::sync::Arc;

use crate::prefs::{ENABLED_KEY, PreferenceStore, StoreError, resolve_enabled};

/// The on/off toggle. The only writer of the `enabled` preference.
#[derive(Clone)]
pub struct Popup {
    store: Arc<dyn PreferenceStore>,
}

impl Popup {
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        Self { store }
    }

    /// Whether the toggle shows as checked.
    pub fn checked(&self) -> Result<bool, StoreError> {
        Ok(resolve_enabled(self.store.get(ENABLED_KEY)?))
    }

    pub fn set_checked(&self, enabled: bool) -> Result<(), StoreError> {
        self.store.set(ENABLED_KEY, enabled)
    }

    /// Flips the toggle and returns the new state.
    pub fn toggle(&self) -> Result<bool, StoreError> {
        let enabled = !self.checked()?;
        self.set_checked(enabled)?;
        Ok(enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefs::MemoryStore;

    #[test]
    fn starts_checked_and_toggles() {
        let store = Arc::new(MemoryStore::new());
        let popup = Popup::new(store.clone());
        assert!(popup.checked().unwrap());
        assert!(!popup.toggle().unwrap());
        assert_eq!(store.get(ENABLED_KEY).unwrap(), Some(false));
        assert!(popup.toggle().unwrap());
        assert_eq!(store.get(ENABLED_KEY).unwrap(), Some(true));
    }

    #[test]
    fn set_checked_notifies() {
        let store = Arc::new(MemoryStore::new());
        let mut rx = store.subscribe();
        Popup::new(store).set_checked(false).unwrap();
        assert_eq!(rx.try_recv().unwrap().new_value, Some(false));
    }
}
