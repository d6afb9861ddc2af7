//! Integer leaky integrate-and-fire neurons

use crate::{error::*, Tick};
use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Unique identifier for a neuron
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(transparent)]
pub struct NeuronId(pub u32);

impl NeuronId {
    /// Create a new neuron ID
    #[inline(always)]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    #[inline(always)]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Invalid neuron ID constant
    pub const INVALID: Self = Self(u32::MAX);

    /// Check if this is a valid neuron ID
    #[inline(always)]
    pub const fn is_valid(self) -> bool {
        self.0 != u32::MAX
    }
}

impl fmt::Display for NeuronId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N{}", self.0)
    }
}

impl From<u32> for NeuronId {
    #[inline(always)]
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<NeuronId> for usize {
    #[inline(always)]
    fn from(id: NeuronId) -> Self {
        id.0 as usize
    }
}

/// Static parameters of a LIF neuron
///
/// All quantities are integers; the membrane potential integrates whole
/// synaptic weights and drains by a whole-number leak per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NeuronParams {
    /// Firing threshold (charge units, >= 1)
    pub threshold: i32,
    /// Leak drained per tick (charge units, >= 0)
    pub leak: i32,
    /// Refractory period in ticks (>= 0)
    pub refractory: Tick,
}

impl Default for NeuronParams {
    fn default() -> Self {
        Self {
            threshold: 10,
            leak: 1,
            refractory: 2,
        }
    }
}

impl NeuronParams {
    /// Create new neuron parameters with validation
    pub fn new(threshold: i32, leak: i32, refractory: Tick) -> Result<Self> {
        if threshold < 1 {
            return Err(CoreError::invalid_parameter(
                "threshold",
                threshold.to_string(),
                ">= 1",
            ));
        }
        if leak < 0 {
            return Err(CoreError::invalid_parameter(
                "leak",
                leak.to_string(),
                ">= 0",
            ));
        }
        if refractory < 0 {
            return Err(CoreError::invalid_parameter(
                "refractory",
                refractory.to_string(),
                ">= 0",
            ));
        }

        Ok(Self {
            threshold,
            leak,
            refractory,
        })
    }

    /// Validate parameters
    pub fn validate(&self) -> Result<()> {
        Self::new(self.threshold, self.leak, self.refractory)?;
        Ok(())
    }
}

/// Runtime state of a single neuron in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neuron {
    /// Membrane potential (clamped to >= 0 outside firing)
    pub potential: i32,
    /// Firing threshold
    pub threshold: i32,
    /// Leak per tick
    pub leak: i32,
    /// Refractory period in ticks
    pub refractory: Tick,
    /// Tick of the most recent firing
    pub last_fired_tick: Tick,
}

impl Neuron {
    /// Create a fresh neuron from parameters
    ///
    /// `last_fired_tick` starts at `-refractory - 1` so the neuron may fire
    /// on tick zero.
    pub fn new(params: NeuronParams) -> Self {
        Self {
            potential: 0,
            threshold: params.threshold,
            leak: params.leak,
            refractory: params.refractory,
            last_fired_tick: -params.refractory - 1,
        }
    }

    /// Check if the neuron is in its refractory window at `tick`
    #[inline(always)]
    pub fn is_refractory(&self, tick: Tick) -> bool {
        tick - self.last_fired_tick <= self.refractory
    }

    /// Zero the charge and restore the ready-to-fire firing stamp
    pub fn reset(&mut self) {
        self.potential = 0;
        self.last_fired_tick = -self.refractory - 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neuron_id() {
        let id = NeuronId::new(42);
        assert_eq!(id.raw(), 42);
        assert!(id.is_valid());
        assert!(!NeuronId::INVALID.is_valid());
        assert_eq!(format!("{}", id), "N42");
    }

    #[test]
    fn test_params_validation() {
        assert!(NeuronParams::new(0, 0, 0).is_err());
        assert!(NeuronParams::new(5, -1, 0).is_err());
        assert!(NeuronParams::new(5, 0, -1).is_err());
        assert!(NeuronParams::new(5, 0, 2).is_ok());
        assert!(NeuronParams::default().validate().is_ok());
    }

    #[test]
    fn test_fresh_neuron_may_fire_immediately() {
        let n = Neuron::new(NeuronParams::new(5, 0, 2).unwrap());
        assert_eq!(n.last_fired_tick, -3);
        assert!(!n.is_refractory(0));
    }

    #[test]
    fn test_refractory_window() {
        let mut n = Neuron::new(NeuronParams::new(5, 0, 2).unwrap());
        n.last_fired_tick = 10;
        assert!(n.is_refractory(10));
        assert!(n.is_refractory(11));
        assert!(n.is_refractory(12));
        assert!(!n.is_refractory(13));
    }

    #[test]
    fn test_zero_refractory_frees_next_tick() {
        let mut n = Neuron::new(NeuronParams::new(5, 0, 0).unwrap());
        n.last_fired_tick = 4;
        assert!(n.is_refractory(4));
        assert!(!n.is_refractory(5));
    }

    #[test]
    fn test_reset() {
        let mut n = Neuron::new(NeuronParams::new(5, 1, 3).unwrap());
        n.potential = 17;
        n.last_fired_tick = 99;
        n.reset();
        assert_eq!(n.potential, 0);
        assert_eq!(n.last_fired_tick, -4);
    }
}
