//! Move-only ownership of a raw native handle

use crate::error::{Precondition, Result};
use std::cell::Cell;

/// A raw native handle that is released at most once
///
/// The handle is not `Clone`; whoever holds the `ResourceHandle` owns the
/// native resource. [`release`](Self::release) takes the raw value out, so
/// later calls and [`get`](Self::get) see it as gone.
#[derive(Debug)]
pub struct ResourceHandle<T: Copy> {
    raw: Cell<Option<T>>,
    released: Precondition,
}

impl<T: Copy> ResourceHandle<T> {
    /// Take ownership of `raw`
    ///
    /// `released` is the violation reported by `get` once the handle is gone.
    pub fn new(raw: T, released: Precondition) -> Self {
        Self {
            raw: Cell::new(Some(raw)),
            released,
        }
    }

    /// The raw handle, unless it was released
    pub fn get(&self) -> Result<T> {
        self.raw.get().ok_or_else(|| self.released.clone().into())
    }

    /// Check if the handle is still held
    pub fn is_open(&self) -> bool {
        self.raw.get().is_some()
    }

    /// Run `close` on the raw handle if it is still held
    ///
    /// Returns `None` when the handle was already released.
    pub fn release<R>(&self, close: impl FnOnce(T) -> R) -> Option<R> {
        self.raw.take().map(close)
    }
}
