//! Protocol
//!
//! A protocol bundles one mechanism of each kind. Protocols are built once
//! and validated before the first iteration runs.

use std::fmt;

use crate::error::ConfigError;
use crate::mechanisms::{
    ExpirationMechanism, NeverExpire, OlderUpdate, PropagationMechanism, SelectionMechanism,
    StopCondition, UpdateMechanism,
};

/// The mechanisms driving a simulation.
pub struct Protocol {
    selection: Box<dyn SelectionMechanism>,
    propagation: Box<dyn PropagationMechanism>,
    update: Box<dyn UpdateMechanism>,
    expiration: Box<dyn ExpirationMechanism>,
    stop: Box<dyn StopCondition>,
}

impl Protocol {
    pub fn builder() -> ProtocolBuilder {
        ProtocolBuilder::default()
    }

    pub fn selection(&self) -> &dyn SelectionMechanism {
        self.selection.as_ref()
    }

    pub fn propagation(&self) -> &dyn PropagationMechanism {
        self.propagation.as_ref()
    }

    pub fn update(&self) -> &dyn UpdateMechanism {
        self.update.as_ref()
    }

    pub fn expiration(&self) -> &dyn ExpirationMechanism {
        self.expiration.as_ref()
    }

    pub fn stop_condition(&self) -> &dyn StopCondition {
        self.stop.as_ref()
    }

    /// Replaces the stop condition, keeping everything else.
    pub fn with_stop(mut self, stop: Box<dyn StopCondition>) -> Self {
        self.stop = stop;
        self
    }

    /// Checks every mechanism against the population size.
    pub fn validate(&self, num_users: usize) -> Result<(), ConfigError> {
        self.selection.validate(num_users)?;
        self.propagation.validate(num_users)?;
        self.expiration.validate(num_users)?;
        Ok(())
    }
}

impl fmt::Debug for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Protocol")
            .field("selection", &self.selection.name())
            .field("propagation", &self.propagation.name())
            .field("update", &self.update.name())
            .field("expiration", &self.expiration.name())
            .field("stop", &self.stop.name())
            .finish()
    }
}

/// Builder for [`Protocol`].
///
/// Selection, propagation and stop condition are required. Update defaults
/// to [`OlderUpdate`] and expiration to [`NeverExpire`].
#[derive(Default)]
pub struct ProtocolBuilder {
    selection: Option<Box<dyn SelectionMechanism>>,
    propagation: Option<Box<dyn PropagationMechanism>>,
    update: Option<Box<dyn UpdateMechanism>>,
    expiration: Option<Box<dyn ExpirationMechanism>>,
    stop: Option<Box<dyn StopCondition>>,
}

impl ProtocolBuilder {
    pub fn selection(mut self, selection: impl SelectionMechanism + 'static) -> Self {
        self.selection = Some(Box::new(selection));
        self
    }

    pub fn propagation(mut self, propagation: impl PropagationMechanism + 'static) -> Self {
        self.propagation = Some(Box::new(propagation));
        self
    }

    pub fn update(mut self, update: impl UpdateMechanism + 'static) -> Self {
        self.update = Some(Box::new(update));
        self
    }

    pub fn expiration(mut self, expiration: impl ExpirationMechanism + 'static) -> Self {
        self.expiration = Some(Box::new(expiration));
        self
    }

    pub fn stop(mut self, stop: impl StopCondition + 'static) -> Self {
        self.stop = Some(Box::new(stop));
        self
    }

    pub fn boxed_selection(mut self, selection: Box<dyn SelectionMechanism>) -> Self {
        self.selection = Some(selection);
        self
    }

    pub fn boxed_propagation(mut self, propagation: Box<dyn PropagationMechanism>) -> Self {
        self.propagation = Some(propagation);
        self
    }

    pub fn boxed_update(mut self, update: Box<dyn UpdateMechanism>) -> Self {
        self.update = Some(update);
        self
    }

    pub fn boxed_expiration(mut self, expiration: Box<dyn ExpirationMechanism>) -> Self {
        self.expiration = Some(expiration);
        self
    }

    pub fn boxed_stop(mut self, stop: Box<dyn StopCondition>) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn build(self) -> Result<Protocol, ConfigError> {
        Ok(Protocol {
            selection: self.selection.ok_or(ConfigError::MissingMechanism("selection"))?,
            propagation: self
                .propagation
                .ok_or(ConfigError::MissingMechanism("propagation"))?,
            update: self.update.unwrap_or_else(|| Box::new(OlderUpdate)),
            expiration: self.expiration.unwrap_or_else(|| Box::new(NeverExpire)),
            stop: self.stop.ok_or(ConfigError::MissingMechanism("stop"))?,
        })
    }
}
