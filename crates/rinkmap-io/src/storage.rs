//! `localStorage` backend for the goal map.

use rinkmap_core::{Storage, StorageError};
use wasm_bindgen::JsValue;

/// Errors opening the browser's `localStorage`.
#[derive(Debug, thiserror::Error)]
pub enum LocalStorageError {
    /// `window.localStorage` is missing (e.g. disabled by privacy
    /// settings).
    #[error("localStorage is not available")]
    Unavailable,

    /// A browser API call returned an error.
    #[error("browser API error: {0}")]
    JsError(String),
}

impl From<JsValue> for LocalStorageError {
    fn from(value: JsValue) -> Self {
        Self::JsError(format!("{value:?}"))
    }
}

/// [`Storage`] backed by `window.localStorage`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalStorage {
    inner: web_sys::Storage,
}

impl LocalStorage {
    /// Open the window's `localStorage`.
    ///
    /// # Errors
    ///
    /// Returns [`LocalStorageError::Unavailable`] if there is no window
    /// or the browser refuses access, [`LocalStorageError::JsError`] if
    /// the lookup itself throws.
    pub fn open() -> Result<Self, LocalStorageError> {
        let window = web_sys::window().ok_or(LocalStorageError::Unavailable)?;
        let inner = window
            .local_storage()?
            .ok_or(LocalStorageError::Unavailable)?;
        Ok(Self { inner })
    }
}

impl Storage for LocalStorage {
    fn get(&self, key: &str) -> Option<String> {
        match self.inner.get_item(key) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("localStorage read of {key:?} failed: {e:?}");
                None
            }
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        // Throws QuotaExceededError when full.
        self.inner
            .set_item(key, value)
            .map_err(|e| StorageError::Backend(format!("{e:?}")))
    }

    fn remove(&mut self, key: &str) {
        if let Err(e) = self.inner.remove_item(key) {
            log::warn!("localStorage remove of {key:?} failed: {e:?}");
        }
    }
}
