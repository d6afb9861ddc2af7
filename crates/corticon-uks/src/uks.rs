//! The Universal Knowledge Store: recognition bus, Request neuron, and
//! one-shot winner-take-all column allocation

use crate::{
    column::{ColumnConfig, ColumnId, CorticalColumn},
    error::*,
    ACH_IDLE_DRIFT, ACH_IDLE_FLOOR, ACH_NOVELTY_SPIKE, BUS_DRIVE_BASE, BUS_EXCITE_WEIGHT,
    BUS_INHIBIT_WEIGHT, DA_ALLOCATION_SPIKE, DA_RECOGNITION_SPIKE, FREE_COLUMN_PENALTY,
    HT_IDLE_SPIKE, INHIBITOR_OUTPUT_WEIGHT, NE_NOVELTY_SPIKE, OUTPUT_INHIBITOR_WEIGHT,
    OUTPUT_REQUEST_EDGES, OUTPUT_REQUEST_WEIGHT, REQUEST_BUS_WEIGHT, REQUEST_LEAK,
    REQUEST_REFRACTORY, REQUEST_THRESHOLD, STABILIZATION_TICKS,
};
use corticon_core::{Chemistry, Network, NeuronId, NeuronParams, Tick};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Knowledge-store configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UksConfig {
    /// Width of the recognition bus
    pub bus_width: usize,
    /// Number of columns constructed up front
    pub column_count: usize,
    /// Geometry shared by every column
    pub column: ColumnConfig,
    /// Bus neuron firing threshold
    pub bus_threshold: i32,
    /// Bus neuron leak
    pub bus_leak: i32,
    /// Bus neuron refractory period
    ///
    /// One tick, not zero: a refractory neuron skips the leak phase, so a
    /// serotonin-saturated leak can wipe at most every other tick's
    /// injected drive and the bus keeps relaying in any chemistry state.
    pub bus_refractory: Tick,
    /// Ticks after a presentation during which novelty is held off
    pub stabilization_ticks: Tick,
    /// Whether novelty may allocate columns
    pub learning_enabled: bool,
    /// Seed for the deterministic column wiring draws
    pub seed: u64,
}

impl Default for UksConfig {
    fn default() -> Self {
        Self {
            bus_width: 256,
            column_count: 16,
            column: ColumnConfig::default(),
            bus_threshold: 4,
            bus_leak: 1,
            bus_refractory: 1,
            stabilization_ticks: STABILIZATION_TICKS,
            learning_enabled: true,
            seed: 42,
        }
    }
}

impl UksConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.bus_width == 0 {
            return Err(UksError::invalid_config("bus_width must be >= 1"));
        }
        if self.column_count == 0 {
            return Err(UksError::invalid_config("column_count must be >= 1"));
        }
        if self.bus_threshold < 1 {
            return Err(UksError::invalid_config("bus_threshold must be >= 1"));
        }
        if self.bus_refractory < 0 {
            return Err(UksError::invalid_config("bus_refractory must be >= 0"));
        }
        if self.stabilization_ticks < 0 {
            return Err(UksError::invalid_config("stabilization_ticks must be >= 0"));
        }
        self.column.validate()
    }
}

/// What the store concluded after inspecting one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UksOutcome {
    /// An allocated column's output fired; the world is recognised
    Recognition(ColumnId),
    /// The Request neuron fired: nothing recognised the input. A column may
    /// have been allocated for it
    Novelty {
        /// The freshly allocated column, when learning was able to bind one
        allocated: Option<ColumnId>,
    },
    /// No recognition and no request
    Idle,
}

#[derive(Debug, Clone)]
struct Presentation {
    pattern: Vec<usize>,
    since_tick: Tick,
}

/// The knowledge store
///
/// Owns no neurons — only ids into a [`Network`] plus per-column metadata.
/// The host steps the pair in order: `network.step()` then
/// `uks.step(&mut network)` (see `Cortex` for the packaged form).
#[derive(Debug)]
pub struct Uks {
    config: UksConfig,
    bus: Vec<NeuronId>,
    request: NeuronId,
    inhibitor: NeuronId,
    columns: Vec<CorticalColumn>,
    allocated_count: usize,
    active_column: Option<ColumnId>,
    request_fired: bool,
    total_recognitions: u64,
    presentation: Option<Presentation>,
    pending_learn: Vec<usize>,
}

impl Uks {
    /// Build the store's neuron populations and fixed wiring inside
    /// `network`
    pub fn new(network: &mut Network, config: UksConfig) -> Result<Self> {
        config.validate()?;

        let bus_params = NeuronParams {
            threshold: config.bus_threshold,
            leak: config.bus_leak,
            refractory: config.bus_refractory,
        };
        let bus: Vec<NeuronId> = (0..config.bus_width)
            .map(|_| network.add_neuron(bus_params))
            .collect();

        // The Request neuron accumulates only under sustained bus input
        // that no allocated column is answering: weak fan-in from every bus
        // neuron, crushing fan-in from every column output.
        let request = network.add_neuron(NeuronParams {
            threshold: REQUEST_THRESHOLD,
            leak: REQUEST_LEAK,
            refractory: REQUEST_REFRACTORY,
        });
        for bus_neuron in &bus {
            network.connect_neurons(*bus_neuron, request, REQUEST_BUS_WEIGHT, false);
        }

        // One global inhibitor arbitrates between columns.
        let inhibitor = network.add_neuron(NeuronParams {
            threshold: 10,
            leak: 3,
            refractory: 0,
        });

        let mut columns = Vec::with_capacity(config.column_count);
        for index in 0..config.column_count {
            let column = CorticalColumn::build(network, &config.column, config.seed, index as u32);
            let output = column.output_neuron();
            for _ in 0..OUTPUT_REQUEST_EDGES {
                network.connect_neurons(output, request, OUTPUT_REQUEST_WEIGHT, false);
            }
            network.connect_neurons(output, inhibitor, OUTPUT_INHIBITOR_WEIGHT, false);
            network.connect_neurons(inhibitor, output, INHIBITOR_OUTPUT_WEIGHT, false);
            columns.push(column);
        }

        log::debug!(
            "knowledge store online: {} bus neurons, {} columns",
            config.bus_width,
            config.column_count
        );

        Ok(Self {
            config,
            bus,
            request,
            inhibitor,
            columns,
            allocated_count: 0,
            active_column: None,
            request_fired: false,
            total_recognitions: 0,
            presentation: None,
            pending_learn: Vec::new(),
        })
    }

    /// Present a bus pattern; it is re-injected every tick until cleared
    ///
    /// Out-of-range indices are dropped; duplicates collapse.
    pub fn present(&mut self, network: &Network, pattern: &[usize]) {
        let mut indices: Vec<usize> = pattern
            .iter()
            .copied()
            .filter(|&i| i < self.config.bus_width)
            .collect();
        indices.sort_unstable();
        indices.dedup();
        self.pending_learn = indices.clone();
        self.presentation = Some(Presentation {
            pattern: indices,
            since_tick: network.current_tick(),
        });
    }

    /// Stop injecting the current presentation and drop its learn intent
    pub fn clear_presentation(&mut self) {
        self.presentation = None;
        self.pending_learn.clear();
    }

    /// Inspect the tick the network just executed and run the store's
    /// state machine
    ///
    /// Must be called once after every `network.step()`.
    pub fn step(&mut self, network: &mut Network) -> UksOutcome {
        let tick = network.current_tick();
        // Drive strength reflects the chemistry as the tick ended, before
        // this inspection's own spikes land.
        let ach_at_entry = network.chemicals().acetylcholine() as i32;

        let mut first_active: Option<ColumnId> = None;
        for (i, column) in self.columns.iter_mut().enumerate() {
            let fired = column.is_allocated() && network.did_fire(column.output_neuron());
            column.note_activity(fired);
            if fired && first_active.is_none() {
                first_active = Some(ColumnId::new(i as u32));
            }
        }

        let stabilizing = match &self.presentation {
            Some(p) => tick - p.since_tick <= self.config.stabilization_ticks,
            None => false,
        };
        let request_fired_now = !stabilizing && network.did_fire(self.request);

        let outcome = if let Some(id) = first_active {
            // A predictable world is mildly rewarding.
            self.active_column = Some(id);
            self.request_fired = false;
            self.total_recognitions += 1;
            network.spike_dopamine(DA_RECOGNITION_SPIKE);
            UksOutcome::Recognition(id)
        } else if request_fired_now {
            self.request_fired = true;
            network.spike_norepinephrine(NE_NOVELTY_SPIKE);
            network.spike_acetylcholine(ACH_NOVELTY_SPIKE);
            let mut allocated = None;
            if self.config.learning_enabled && !self.pending_learn.is_empty() {
                if let Some(id) = self.allocate(network, tick) {
                    network.spike_dopamine(DA_ALLOCATION_SPIKE);
                    self.active_column = Some(id);
                    // One shot per presentation: the learn intent is spent.
                    self.pending_learn.clear();
                    allocated = Some(id);
                }
            }
            UksOutcome::Novelty { allocated }
        } else {
            network.spike_serotonin(HT_IDLE_SPIKE);
            if network.chemicals().acetylcholine() > ACH_IDLE_FLOOR {
                network.spike_acetylcholine(ACH_IDLE_DRIFT);
            }
            UksOutcome::Idle
        };

        // Sustained, attention-gated drive: low acetylcholine weakens the
        // outside world so internal recurrence can dominate.
        if let Some(p) = &self.presentation {
            let gain = BUS_DRIVE_BASE + ach_at_entry / 10;
            for &idx in &p.pattern {
                network.inject_charge(self.bus[idx], gain);
            }
        }

        // While the presentation is still stabilising, hold the Request
        // neuron flat so novelty cannot race the recognition window.
        if stabilizing {
            let charge = network.charge(self.request);
            if charge != 0 {
                network.inject_charge(self.request, -charge);
            }
        }

        outcome
    }

    /// One-shot allocation of the lowest-index free column to the pending
    /// pattern
    fn allocate(&mut self, network: &mut Network, tick: Tick) -> Option<ColumnId> {
        let slot = self.columns.iter().position(|c| !c.is_allocated())?;

        let mut in_pattern = vec![false; self.config.bus_width];
        for &idx in &self.pending_learn {
            in_pattern[idx] = true;
        }

        // Template-matcher wiring: pattern members gently excite every
        // input neuron, everything else crushes the match sum.
        let inputs: Vec<NeuronId> = self.columns[slot].input_neurons().to_vec();
        for (idx, bus_neuron) in self.bus.iter().enumerate() {
            let weight = if in_pattern[idx] {
                BUS_EXCITE_WEIGHT
            } else {
                BUS_INHIBIT_WEIGHT
            };
            for input in &inputs {
                network.connect_neurons(*bus_neuron, *input, weight, false);
            }
        }

        // Nudge the remaining free columns down so this presentation cannot
        // allocate twice inside one stabilization window.
        for (i, column) in self.columns.iter().enumerate() {
            if i != slot && !column.is_allocated() {
                network.inject_charge(column.output_neuron(), FREE_COLUMN_PENALTY);
            }
        }

        self.columns[slot].mark_allocated(tick);
        self.allocated_count += 1;
        log::info!(
            "allocated column {slot} at tick {tick} ({} bus indices)",
            self.pending_learn.len()
        );
        Some(ColumnId::new(slot as u32))
    }

    // ------------------------------------------------------------------
    // Consolidation hooks
    // ------------------------------------------------------------------

    /// Enter the internal-dominant regime: working state cleared, weights
    /// kept, attention and arousal muted, learning hot
    ///
    /// Returns the prior chemistry for [`Uks::end_consolidation`]. The
    /// replay scheduling itself lives with the host.
    pub fn begin_consolidation(&mut self, network: &mut Network) -> Chemistry {
        let prior = network.chemicals();
        self.clear_presentation();
        network.reset();
        network.set_chemicals(Chemistry::new(80, 10, prior.serotonin() as i32, 10));
        prior
    }

    /// Restore the chemistry captured by [`Uks::begin_consolidation`]
    pub fn end_consolidation(&self, network: &mut Network, prior: Chemistry) {
        network.set_chemicals(prior);
    }

    // ------------------------------------------------------------------
    // Probes
    // ------------------------------------------------------------------

    /// The column currently standing for the presented input, if any
    pub fn active_column(&self) -> Option<ColumnId> {
        self.active_column
    }

    /// Whether a novelty request is outstanding (cleared by recognition)
    pub fn did_request_fire(&self) -> bool {
        self.request_fired
    }

    /// Columns bound to a concept
    pub fn allocated_count(&self) -> usize {
        self.allocated_count
    }

    /// Columns still free
    pub fn free_count(&self) -> usize {
        self.config.column_count - self.allocated_count
    }

    /// A column by id
    pub fn column(&self, id: ColumnId) -> Option<&CorticalColumn> {
        self.columns.get(id.raw() as usize)
    }

    /// Recognitions counted since construction
    pub fn total_recognitions(&self) -> u64 {
        self.total_recognitions
    }

    /// Serotonin-scaled traversal depth for graph-walking collaborators
    pub fn get_search_depth(&self, network: &Network) -> i32 {
        3 + (network.chemicals().serotonin() as i32) / 20
    }

    /// The recognition bus neurons, in bus-index order
    pub fn bus_neurons(&self) -> &[NeuronId] {
        &self.bus
    }

    /// The Request neuron
    pub fn request_neuron(&self) -> NeuronId {
        self.request
    }

    /// The global inhibitor
    pub fn inhibitor_neuron(&self) -> NeuronId {
        self.inhibitor
    }

    /// Store configuration
    pub fn config(&self) -> &UksConfig {
        &self.config
    }
}
