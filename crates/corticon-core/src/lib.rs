//! Integer tick engine for biologically-inspired spiking networks
//!
//! This crate provides the core simulation engine: leaky integrate-and-fire
//! neurons over integer arithmetic, plastic synapses with STDP and
//! eligibility traces, a k-winner-take-all firing gate, and a four-channel
//! neuromodulator vector, all advanced by a deterministic four-phase tick.
//! Emphasis is on bit-exact reproducibility: every pseudo-random draw is
//! derived from `(tick, neuron_id, seed)` rather than shared RNG state.

#![deny(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod bitmap;
pub mod chemistry;
pub mod error;
pub mod network;
pub mod neuron;
pub mod plasticity;
pub mod queue;
pub mod rng;
pub mod synapse;

// Re-export essential types
pub use bitmap::Bitmap;
pub use chemistry::{Chemistry, ACH_BASELINE, DA_BASELINE, HT_BASELINE, NE_BASELINE};
pub use error::{CoreError, Result};
pub use network::{EngineStats, Network, NetworkBuilder, NetworkConfig};
pub use neuron::{Neuron, NeuronId, NeuronParams};
pub use plasticity::{reward_delta, stdp_delta, PlasticityMode};
pub use queue::SpikeQueue;
pub use synapse::{clamp_weight, Synapse, SynapseStore};

/// Simulation time in ticks; signed so that "never fired" states can sit
/// below tick zero
pub type Tick = i64;

/// Lowest representable synapse weight
pub const WEIGHT_MIN: i8 = -16;
/// Highest representable synapse weight
pub const WEIGHT_MAX: i8 = 16;

/// Half-width of the STDP pairing window, in ticks
pub const STDP_WINDOW: Tick = 20;

/// Value an eligibility trace is set to by a causal pairing
pub const ELIGIBILITY_MAX: i8 = 100;
/// Trace units decayed per tick in operant mode
pub const ELIGIBILITY_DECAY: i8 = 1;
/// Divisor applied to `trace * reward` when a reward is paid out
pub const REWARD_SCALE_FACTOR: i32 = 50;

/// Dopamine level below which the plasticity phase is skipped entirely
pub const PLASTICITY_DA_GATE: i8 = 10;

/// Norepinephrine level at which the panic reset trips
pub const PANIC_NE_THRESHOLD: i8 = 95;
/// Norepinephrine level forced by a panic reset
pub const PANIC_NE_RESET: i8 = 70;

/// Engine crate version for compatibility checking
pub const ENGINE_VERSION: u32 = 1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_integration() {
        let params = NeuronParams::default();
        assert!(params.threshold >= 1);

        let chem = Chemistry::baseline();
        assert_eq!(chem.dopamine(), DA_BASELINE);

        let config = NetworkConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_contract_constants() {
        assert_eq!(WEIGHT_MIN, -16);
        assert_eq!(WEIGHT_MAX, 16);
        assert_eq!(STDP_WINDOW, 20);
        assert_eq!(ELIGIBILITY_MAX, 100);
        assert_eq!(REWARD_SCALE_FACTOR, 50);
        assert_eq!(PANIC_NE_THRESHOLD, 95);
        assert_eq!(PANIC_NE_RESET, 70);
    }
}
