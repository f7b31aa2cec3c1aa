//! Spindle driver selection.
//!
//! Drivers are registered by [`SpindleKind`] and one is instantiated at the
//! end of cold init from the `spindle.kind` setting. Uses
//! constructor-injection rather than global state.

use std::collections::HashMap;

use grbl_common::config::SpindleKind;

use crate::collaborators::Spindle;
use crate::error::InitError;

/// Factory producing a spindle driver instance.
pub type SpindleFactory = Box<dyn Fn() -> Box<dyn Spindle>>;

/// Registry of available spindle drivers.
pub struct SpindleRegistry {
    factories: HashMap<SpindleKind, SpindleFactory>,
}

impl SpindleRegistry {
    /// Registry with only the `None` driver.
    pub fn new() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register(
            SpindleKind::None,
            Box::new(|| -> Box<dyn Spindle> { Box::new(NullSpindle) }),
        );
        registry
    }

    /// Register a driver factory, replacing any previous one for `kind`.
    pub fn register(&mut self, kind: SpindleKind, factory: SpindleFactory) {
        self.factories.insert(kind, factory);
    }

    /// Instantiate the driver for `kind`.
    ///
    /// # Errors
    /// Returns `InitError::SpindleNotFound` if nothing is registered for `kind`.
    pub fn select(&self, kind: SpindleKind) -> Result<Box<dyn Spindle>, InitError> {
        let factory = self
            .factories
            .get(&kind)
            .ok_or(InitError::SpindleNotFound(kind))?;
        Ok(factory())
    }

    /// Registered kinds.
    pub fn kinds(&self) -> Vec<SpindleKind> {
        self.factories.keys().copied().collect()
    }
}

impl Default for SpindleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Driver for machines without a controllable spindle.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSpindle;

impl Spindle for NullSpindle {
    fn name(&self) -> &'static str {
        "None"
    }

    fn stop(&mut self) {}
}
