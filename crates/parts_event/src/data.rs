//! Shared data cells
//!
//! A `DataCell` is a value several systems read and write without knowing
//! about each other: the player's health fraction shown by a HUD, the load
//! progress of a scene, whether a screen fade finished. Clones share storage.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

struct Inner<T> {
    value: RwLock<T>,
    version: AtomicU64,
}

/// Shared, versioned value
pub struct DataCell<T> {
    inner: Arc<Inner<T>>,
}

impl<T> DataCell<T> {
    /// Create a cell holding `value`
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(Inner {
                value: RwLock::new(value),
                version: AtomicU64::new(0),
            }),
        }
    }

    /// Replace the value
    pub fn set(&self, value: T) {
        *self.inner.value.write() = value;
        self.inner.version.fetch_add(1, Ordering::Release);
    }

    /// Modify the value in place
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let result = f(&mut self.inner.value.write());
        self.inner.version.fetch_add(1, Ordering::Release);
        result
    }

    /// Read the value through a closure
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.read())
    }

    /// Change counter, bumped on every write
    pub fn version(&self) -> u64 {
        self.inner.version.load(Ordering::Acquire)
    }
}

impl<T: Clone> DataCell<T> {
    /// Copy out the current value
    pub fn get(&self) -> T {
        self.inner.value.read().clone()
    }
}

impl<T> Clone for DataCell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Default> Default for DataCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for DataCell<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataCell")
            .field("value", &*self.inner.value.read())
            .field("version", &self.version())
            .finish()
    }
}
