//! Cortical columns: fixed-topology neuron clusters, one per learned concept

use crate::error::*;
use corticon_core::{rng, Network, NeuronId, NeuronParams, Tick};
use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Salt mixed into the wiring seed for input→pyramidal draws
const INPUT_WIRING_SALT: u64 = 0x1A7E_11FE;
/// Salt mixed into the wiring seed for recurrent draws
const RECURRENT_WIRING_SALT: u64 = 0xF01D_BACC;

/// Unique identifier for a cortical column within its store
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(transparent)]
pub struct ColumnId(pub u32);

impl ColumnId {
    /// Create a new column ID
    #[inline(always)]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    #[inline(always)]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{}", self.0)
    }
}

/// Geometry and thresholds of a column, fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ColumnConfig {
    /// Input neurons per column
    pub input_count: usize,
    /// Pyramidal neurons per column
    pub pyramidal_count: usize,
    /// Input neuron firing threshold
    pub input_threshold: i32,
    /// Pyramidal neuron firing threshold
    pub pyramidal_threshold: i32,
    /// Output neuron firing threshold
    pub output_threshold: i32,
    /// Inhibitory neuron firing threshold
    pub inhibitory_threshold: i32,
    /// Leak shared by all column neurons
    pub leak: i32,
    /// Input→pyramidal excitation weight
    pub input_pyramidal_weight: i32,
    /// Percent of input→pyramidal pairs that are wired
    pub input_density_pct: u64,
    /// Percent of pyramidal→pyramidal pairs wired for reverberation
    pub recurrent_density_pct: u64,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            input_count: 8,
            pyramidal_count: 24,
            input_threshold: 40,
            pyramidal_threshold: 8,
            output_threshold: 16,
            inhibitory_threshold: 10,
            leak: 1,
            input_pyramidal_weight: 5,
            input_density_pct: 40,
            recurrent_density_pct: 10,
        }
    }
}

impl ColumnConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.input_count == 0 {
            return Err(UksError::invalid_config("input_count must be >= 1"));
        }
        if self.pyramidal_count == 0 {
            return Err(UksError::invalid_config("pyramidal_count must be >= 1"));
        }
        if self.input_density_pct > 100 || self.recurrent_density_pct > 100 {
            return Err(UksError::invalid_config(
                "wiring densities are percentages and must be <= 100",
            ));
        }
        Ok(())
    }
}

/// One fixed-topology column: inputs feed pyramidals, pyramidals converge on
/// a single output, a local inhibitory neuron runs winner-take-all inside
/// the cluster, and sparse pyramidal recurrence carries a decaying
/// reverberation for a few ticks after input is removed.
///
/// A column is constructed free; it transitions to allocated exactly once
/// and is never deallocated. Its internal wiring never changes after
/// construction — allocation only adds bus fan-in.
#[derive(Debug, Clone)]
pub struct CorticalColumn {
    inputs: Vec<NeuronId>,
    pyramidals: Vec<NeuronId>,
    output: NeuronId,
    inhibitory: NeuronId,
    allocated: bool,
    allocated_at_tick: Option<Tick>,
    activation_count: u64,
    active_this_tick: bool,
}

impl CorticalColumn {
    /// Create the column's neurons and internal wiring inside `network`
    ///
    /// Sparse wiring draws derive from `(seed, column index, pair)` through
    /// the engine's deterministic mixer, so identical seeds rebuild
    /// identical columns.
    pub fn build(network: &mut Network, config: &ColumnConfig, seed: u64, index: u32) -> Self {
        let input_params = NeuronParams {
            threshold: config.input_threshold,
            leak: config.leak,
            refractory: 0,
        };
        let pyramidal_params = NeuronParams {
            threshold: config.pyramidal_threshold,
            leak: config.leak,
            refractory: 0,
        };
        let output_params = NeuronParams {
            threshold: config.output_threshold,
            leak: config.leak,
            refractory: 0,
        };
        let inhibitory_params = NeuronParams {
            threshold: config.inhibitory_threshold,
            leak: config.leak,
            refractory: 0,
        };

        let inputs: Vec<NeuronId> = (0..config.input_count)
            .map(|_| network.add_neuron(input_params))
            .collect();
        let pyramidals: Vec<NeuronId> = (0..config.pyramidal_count)
            .map(|_| network.add_neuron(pyramidal_params))
            .collect();
        let output = network.add_neuron(output_params);
        let inhibitory = network.add_neuron(inhibitory_params);

        // Dense-ish feed-forward: each input excites a random subset of the
        // pyramidal population.
        let input_seed = seed ^ INPUT_WIRING_SALT;
        for (i, input) in inputs.iter().enumerate() {
            for (j, pyramidal) in pyramidals.iter().enumerate() {
                let salt = ((index as i64) << 32) | (i as i64);
                if rng::mix(input_seed, salt, j as u32) % 100 < config.input_density_pct {
                    network.connect_neurons(*input, *pyramidal, config.input_pyramidal_weight, false);
                }
            }
        }

        // Convergence: the output needs many pyramidals firing together.
        for pyramidal in &pyramidals {
            network.connect_neurons(*pyramidal, output, 1, false);
            network.connect_neurons(*pyramidal, inhibitory, 1, false);
        }

        // Local winner-take-all inside the column.
        for pyramidal in &pyramidals {
            network.connect_neurons(inhibitory, *pyramidal, -2, false);
        }

        // Sparse recurrence: working memory that outlives the input by a
        // few ticks but dies without external drive.
        let recurrent_seed = seed ^ RECURRENT_WIRING_SALT;
        for (j, from) in pyramidals.iter().enumerate() {
            for (k, to) in pyramidals.iter().enumerate() {
                if j == k {
                    continue;
                }
                let salt = ((index as i64) << 32) | (j as i64);
                if rng::mix(recurrent_seed, salt, k as u32) % 100 < config.recurrent_density_pct {
                    network.connect_neurons(*from, *to, 1, false);
                }
            }
        }

        Self {
            inputs,
            pyramidals,
            output,
            inhibitory,
            allocated: false,
            allocated_at_tick: None,
            activation_count: 0,
            active_this_tick: false,
        }
    }

    /// Input neurons, the targets of bus fan-in after allocation
    pub fn input_neurons(&self) -> &[NeuronId] {
        &self.inputs
    }

    /// Pyramidal neurons
    pub fn pyramidal_neurons(&self) -> &[NeuronId] {
        &self.pyramidals
    }

    /// The single output neuron
    pub fn output_neuron(&self) -> NeuronId {
        self.output
    }

    /// The local inhibitory neuron
    pub fn inhibitory_neuron(&self) -> NeuronId {
        self.inhibitory
    }

    /// Whether this column has been bound to a concept
    pub fn is_allocated(&self) -> bool {
        self.allocated
    }

    /// Tick at which the column was allocated, if it has been
    pub fn allocated_at(&self) -> Option<Tick> {
        self.allocated_at_tick
    }

    /// Times the output neuron has fired since construction
    pub fn activation_count(&self) -> u64 {
        self.activation_count
    }

    /// Whether the output fired on the most recent tick
    pub fn is_active(&self) -> bool {
        self.active_this_tick
    }

    pub(crate) fn mark_allocated(&mut self, tick: Tick) {
        self.allocated = true;
        self.allocated_at_tick = Some(tick);
    }

    pub(crate) fn note_activity(&mut self, fired: bool) {
        self.active_this_tick = fired;
        if fired {
            self.activation_count += 1;
        }
    }
}
