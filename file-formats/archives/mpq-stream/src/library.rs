//! Explicit engine context

use crate::error::{Precondition, Result, check};
use crate::native::NativeEngine;
use mpq_native::Engine;
use std::cell::RefCell;

/// An initialized decoding engine
///
/// Created once before the first [`Archive`](crate::Archive) is opened.
/// Archives borrow the library, so it can only be shut down after the last
/// of them is gone. Dropping the library shuts the engine down if
/// [`shutdown`](Self::shutdown) was not called.
#[derive(Debug)]
pub struct Library<E: NativeEngine = Engine> {
    engine: RefCell<E>,
    active: bool,
}

impl Library<Engine> {
    /// Initialize the bundled engine with default limits
    pub fn init() -> Result<Self> {
        Self::with_engine(Engine::new())
    }
}

impl<E: NativeEngine> Library<E> {
    /// Initialize `engine`
    pub fn with_engine(mut engine: E) -> Result<Self> {
        check(engine.init())?;
        log::debug!("Initialized {}", engine.version());
        Ok(Self {
            engine: RefCell::new(engine),
            active: true,
        })
    }

    /// Engine version string
    pub fn version(&self) -> String {
        self.engine.borrow().version().to_string()
    }

    /// Run `f` with shared access to the wrapped engine
    ///
    /// Engine calls made from inside `f` fail with
    /// [`Precondition::EngineBusy`].
    pub fn inspect<T>(&self, f: impl FnOnce(&E) -> T) -> Result<T> {
        let engine = self
            .engine
            .try_borrow()
            .map_err(|_| Precondition::EngineBusy)?;
        Ok(f(&engine))
    }

    /// Shut the engine down
    pub fn shutdown(mut self) -> Result<()> {
        self.teardown()
    }

    fn teardown(&mut self) -> Result<()> {
        if !std::mem::replace(&mut self.active, false) {
            return Ok(());
        }
        log::debug!("Shutting down {}", self.engine.get_mut().version());
        check(self.engine.get_mut().shutdown()).map(|_| ())
    }

    /// Run one engine call and translate its status
    pub(crate) fn call(&self, f: impl FnOnce(&mut E) -> i32) -> Result<i32> {
        let mut engine = self
            .engine
            .try_borrow_mut()
            .map_err(|_| Precondition::EngineBusy)?;
        check(f(&mut engine))
    }
}

impl<E: NativeEngine> Drop for Library<E> {
    fn drop(&mut self) {
        if let Err(e) = self.teardown() {
            log::warn!("Engine shutdown failed: {e}");
        }
    }
}
