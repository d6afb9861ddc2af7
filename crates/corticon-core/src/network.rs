//! The tick engine: four-phase step cycle over the neuron and synapse arenas

use crate::{
    bitmap::Bitmap,
    chemistry::Chemistry,
    error::*,
    neuron::{Neuron, NeuronId, NeuronParams},
    plasticity::{reward_delta, stdp_delta, PlasticityMode},
    queue::SpikeQueue,
    rng::{self, NoiseStream},
    synapse::{clamp_weight, Synapse, SynapseStore},
    Tick, ELIGIBILITY_DECAY, ELIGIBILITY_MAX, PANIC_NE_RESET, PANIC_NE_THRESHOLD,
    PLASTICITY_DA_GATE, STDP_WINDOW,
};
use std::collections::VecDeque;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Engine configuration parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NetworkConfig {
    /// Master switch for the plasticity phase
    pub plasticity_enabled: bool,
    /// Learning regime (immediate STDP or eligibility + reward)
    pub mode: PlasticityMode,
    /// Whether the k-WTA firing gate is active
    pub razor_enabled: bool,
    /// Cap on spikes per tick when the gate is active
    pub max_spikes_per_tick: usize,
    /// Root seed for every pseudo-random stream in the engine
    pub seed: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            plasticity_enabled: true,
            mode: PlasticityMode::Pavlovian,
            razor_enabled: true,
            max_spikes_per_tick: 256,
            seed: 42,
        }
    }
}

impl NetworkConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.razor_enabled && self.max_spikes_per_tick == 0 {
            return Err(CoreError::invalid_config(
                "max_spikes_per_tick must be >= 1 while the razor is enabled",
            ));
        }
        Ok(())
    }
}

/// Running counters maintained by `step`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EngineStats {
    /// Ticks executed since construction or reset
    pub steps: u64,
    /// Total spikes fired by the engine (injected spikes excluded)
    pub total_spikes: u64,
    /// Largest single-tick spike count observed
    pub peak_spikes: usize,
    /// Panic resets taken
    pub panics: u64,
}

/// The spiking network engine
///
/// Owns the neuron arena, the synapse store, the spike queue, the refractory
/// mask, and the neuromodulator vector. External code holds only opaque
/// [`NeuronId`]s. A `step` never blocks and never fails; malformed ids
/// passed to the injection surface degrade to no-ops.
#[derive(Debug)]
pub struct Network {
    config: NetworkConfig,
    neurons: Vec<Neuron>,
    synapses: SynapseStore,
    queue: SpikeQueue,
    refractory: Bitmap,
    chemistry: Chemistry,
    /// Firing records of the last `STDP_WINDOW + 1` ticks, oldest first.
    /// The newest entry doubles as the fired-this-tick set; `fired_bits`
    /// mirrors its membership.
    history: VecDeque<(Tick, Vec<NeuronId>)>,
    fired_bits: Bitmap,
    fired_stamp: Tick,
    stdp_seen: Bitmap,
    noise: NoiseStream,
    current_tick: Tick,
    last_candidate_count: usize,
    sensory_span: u32,
    stats: EngineStats,
}

impl Network {
    /// Create an engine with validated configuration
    pub fn new(config: NetworkConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            noise: NoiseStream::new(config.seed),
            config,
            neurons: Vec::new(),
            synapses: SynapseStore::new(),
            queue: SpikeQueue::new(),
            refractory: Bitmap::new(),
            chemistry: Chemistry::baseline(),
            history: VecDeque::new(),
            fired_bits: Bitmap::new(),
            fired_stamp: Tick::MIN,
            stdp_seen: Bitmap::new(),
            current_tick: 0,
            last_candidate_count: 0,
            sensory_span: 0,
            stats: EngineStats::default(),
        })
    }

    /// Create an engine with default configuration and arenas pre-sized for
    /// the given populations
    pub fn with_capacity(neuron_capacity: usize, synapse_capacity: usize) -> Self {
        let mut network = Self::new(NetworkConfig::default()).expect("default config is valid");
        network.neurons.reserve(neuron_capacity);
        network.synapses = SynapseStore::with_capacity(synapse_capacity);
        network
    }

    // ------------------------------------------------------------------
    // Construction surface
    // ------------------------------------------------------------------

    /// Add a neuron to the arena and return its id
    ///
    /// Must not be called while a `step` is in flight.
    pub fn add_neuron(&mut self, params: NeuronParams) -> NeuronId {
        let id = NeuronId::new(self.neurons.len() as u32);
        self.neurons.push(Neuron::new(params));
        let n = self.neurons.len();
        self.refractory.resize(n);
        self.fired_bits.resize(n);
        self.stdp_seen.resize(n);
        id
    }

    /// Connect `from` to `to` with the given weight (silently clamped to the
    /// weight range)
    ///
    /// Returns `false` when either id is out of range.
    pub fn connect_neurons(&mut self, from: NeuronId, to: NeuronId, weight: i32, plastic: bool) -> bool {
        let n = self.neurons.len();
        if from.raw() as usize >= n || to.raw() as usize >= n {
            return false;
        }
        self.synapses.connect(from.raw(), Synapse::new(to, weight, plastic));
        true
    }

    /// Declare the first `count` neuron ids as owned by a sensory
    /// collaborator; `inject_noise_to_hidden` leaves them untouched
    pub fn set_sensory_span(&mut self, count: u32) {
        self.sensory_span = count;
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    /// Enable or disable the plasticity phase
    pub fn set_plasticity_enabled(&mut self, enabled: bool) {
        self.config.plasticity_enabled = enabled;
    }

    /// Switch between operant (eligibility + reward) and Pavlovian
    /// (immediate STDP) learning
    pub fn set_operant_mode(&mut self, operant: bool) {
        self.config.mode = if operant {
            PlasticityMode::Operant
        } else {
            PlasticityMode::Pavlovian
        };
    }

    /// Enable or disable the k-WTA firing gate
    pub fn set_razor_enabled(&mut self, enabled: bool) {
        self.config.razor_enabled = enabled;
    }

    /// Set the per-tick spike cap used by the firing gate
    pub fn set_max_spikes_per_tick(&mut self, k: usize) {
        self.config.max_spikes_per_tick = k;
    }

    /// Current configuration
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // The four-phase tick
    // ------------------------------------------------------------------

    /// Advance the simulation by one tick
    pub fn step(&mut self) {
        let tick = self.current_tick;
        let n = self.neurons.len();

        // Phase 1: snapshot & housekeeping. Open this tick's firing record,
        // drop stale queue buckets, rebuild the refractory mask.
        self.roll_to(tick);
        self.queue.discard_before(tick - 1);
        self.refractory.resize(n);
        for (i, neuron) in self.neurons.iter().enumerate() {
            if neuron.is_refractory(tick) {
                self.refractory.set(i as u32);
            } else {
                self.refractory.unset(i as u32);
            }
        }

        // Phase 2: leakage. Serotonin drains extra charge ("patience").
        // Element-wise over disjoint neurons, so the parallel path is
        // deterministic for any thread count.
        let leak_bonus = (self.chemistry.serotonin() / 10) as i32;
        {
            let refractory = &self.refractory;
            #[cfg(feature = "parallel")]
            self.neurons
                .par_iter_mut()
                .enumerate()
                .for_each(|(i, neuron)| {
                    if !refractory.get(i as u32) {
                        neuron.potential = (neuron.potential - (neuron.leak + leak_bonus)).max(0);
                    }
                });
            #[cfg(not(feature = "parallel"))]
            for (i, neuron) in self.neurons.iter_mut().enumerate() {
                if !refractory.get(i as u32) {
                    neuron.potential = (neuron.potential - (neuron.leak + leak_bonus)).max(0);
                }
            }
        }

        // Phase 3: integration. Deliver last tick's spikes; refractory
        // targets absorb nothing. Sequential: spike-driven writes to target
        // charges contend under parallel execution.
        let arrivals = self.queue.take(tick - 1);
        {
            let synapses = &self.synapses;
            let refractory = &self.refractory;
            let neurons = &mut self.neurons;
            for pre in &arrivals {
                for synapse in synapses.outgoing(pre.raw()) {
                    let target = synapse.target.raw();
                    if (target as usize) < neurons.len() && !refractory.get(target) {
                        let post = &mut neurons[target as usize];
                        post.potential = post.potential.saturating_add(synapse.weight as i32);
                    }
                }
            }
        }

        // Phase 4: firing under the razor. Norepinephrine lowers effective
        // thresholds and, above 60, adds per-neuron jitter derived from
        // (tick, id, seed).
        let ne = self.chemistry.norepinephrine() as i32;
        let gain = ne / 5;
        let amplitude = ((ne - 60) / 4).max(0);
        let seed = self.config.seed;
        let mut candidates: Vec<(i32, u32)> = Vec::new();
        for (i, neuron) in self.neurons.iter().enumerate() {
            let id = i as u32;
            if self.refractory.get(id) {
                continue;
            }
            let jitter = rng::tick_noise(seed, tick, id, amplitude);
            let effective = (neuron.threshold - gain + jitter).max(1);
            if neuron.potential >= effective {
                candidates.push((neuron.potential, id));
            }
        }
        self.last_candidate_count = candidates.len();
        if self.config.razor_enabled && candidates.len() > self.config.max_spikes_per_tick {
            let k = self.config.max_spikes_per_tick;
            if k == 0 {
                candidates.clear();
            } else {
                // Partial selection: expected linear, highest charge wins,
                // ties to the smaller id. Losers keep their charge.
                candidates.select_nth_unstable_by(k - 1, |a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
                candidates.truncate(k);
            }
        }
        candidates.sort_unstable_by_key(|&(_, id)| id);
        for &(_, id) in &candidates {
            let neuron = &mut self.neurons[id as usize];
            neuron.potential = 0;
            neuron.last_fired_tick = tick;
            self.queue.push(tick, NeuronId::new(id));
            if let Some((_, fired)) = self.history.back_mut() {
                fired.push(NeuronId::new(id));
            }
            self.fired_bits.set(id);
        }
        self.stats.total_spikes += candidates.len() as u64;
        self.stats.peak_spikes = self.stats.peak_spikes.max(candidates.len());
        // Floor carried-over inhibitory debt; charge is non-negative
        // outside the firing check itself.
        for neuron in &mut self.neurons {
            if neuron.potential < 0 {
                neuron.potential = 0;
            }
        }

        // Phase 5: eligibility decay (operant only). Runs before the pairing
        // sweep so a trace set this tick keeps its full value until the next
        // tick.
        if self.config.mode == PlasticityMode::Operant {
            self.synapses.for_each_mut(|s| {
                if s.plastic && s.trace > 0 {
                    s.trace -= ELIGIBILITY_DECAY;
                }
            });
        }

        // Phase 6: plasticity, gated on dopamine.
        if self.config.plasticity_enabled && self.chemistry.dopamine() >= PLASTICITY_DA_GATE {
            self.apply_plasticity(tick);
        }

        // Phase 7: chemistry decay. The panic check below reads the
        // pre-decay level so a spike to exactly the threshold still fires.
        let ne_before = self.chemistry.norepinephrine();
        self.chemistry.decay_step();

        // Phase 8: panic reset on norepinephrine saturation.
        if ne_before >= PANIC_NE_THRESHOLD {
            self.panic_wipe(tick);
        }

        self.current_tick = tick + 1;
        self.stats.steps += 1;
    }

    /// Run `ticks` consecutive steps
    pub fn run(&mut self, ticks: u64) {
        let report = (ticks / 10).max(1);
        for i in 0..ticks {
            self.step();
            if (i + 1) % report == 0 {
                log::debug!("run progress: {}/{} ticks", i + 1, ticks);
            }
        }
    }

    /// Zero time and working state; synapse weights, plastic flags, and the
    /// chemistry vector are preserved
    pub fn reset(&mut self) {
        self.current_tick = 0;
        self.queue.clear();
        self.history.clear();
        self.fired_bits.clear_all();
        self.fired_stamp = Tick::MIN;
        self.last_candidate_count = 0;
        for neuron in &mut self.neurons {
            neuron.reset();
        }
        self.stats = EngineStats::default();
    }

    // ------------------------------------------------------------------
    // Injection surface
    // ------------------------------------------------------------------

    /// Force `id` to fire at the current tick, as if externally driven
    ///
    /// Stamps `last_fired_tick` and the firing record exactly like an
    /// organic firing, so refractory gating and STDP pairing see no
    /// difference. Out-of-range ids are ignored.
    pub fn inject_spike(&mut self, id: NeuronId) {
        let tick = self.current_tick;
        let Some(neuron) = self.neurons.get_mut(id.raw() as usize) else {
            return;
        };
        neuron.last_fired_tick = tick;
        self.queue.push(tick, id);
        self.roll_to(tick);
        if let Some((_, fired)) = self.history.back_mut() {
            fired.push(id);
        }
        self.fired_bits.set(id.raw());
    }

    /// Add `delta` (possibly negative) to a neuron's charge
    ///
    /// No clamping here; the leak and firing phases own the clamp.
    /// Out-of-range ids are ignored.
    pub fn inject_charge(&mut self, id: NeuronId, delta: i32) {
        if let Some(neuron) = self.neurons.get_mut(id.raw() as usize) {
            neuron.potential = neuron.potential.saturating_add(delta);
        }
    }

    /// Pay out a reward against every outstanding eligibility trace
    ///
    /// Each plastic synapse with a positive trace moves by
    /// `(trace * amount) / REWARD_SCALE_FACTOR` (saturated) and its trace is
    /// zeroed so the same causal pairing cannot be paid twice.
    pub fn inject_reward(&mut self, amount: i32) {
        self.synapses.for_each_mut(|s| {
            if s.plastic && s.trace > 0 {
                s.weight = clamp_weight(s.weight as i32 + reward_delta(s.trace, amount));
                s.trace = 0;
            }
        });
    }

    /// Add seed-threaded noise in `[-amplitude, amplitude]` to every neuron
    pub fn inject_noise(&mut self, amplitude: i32) {
        let noise = &mut self.noise;
        for neuron in &mut self.neurons {
            neuron.potential = neuron.potential.saturating_add(noise.next_in(amplitude));
        }
    }

    /// Like `inject_noise`, but skips the sensory-owned id span
    pub fn inject_noise_to_hidden(&mut self, amplitude: i32) {
        let span = self.sensory_span as usize;
        let noise = &mut self.noise;
        for neuron in self.neurons.iter_mut().skip(span) {
            neuron.potential = neuron.potential.saturating_add(noise.next_in(amplitude));
        }
    }

    /// Manually trigger the startle interrupt: zero every charge, drop all
    /// pending spikes and firing records, force norepinephrine to the
    /// post-panic level
    pub fn panic_reset(&mut self) {
        let tick = self.current_tick;
        self.panic_wipe(tick);
    }

    // ------------------------------------------------------------------
    // Chemistry
    // ------------------------------------------------------------------

    /// Add `delta` to dopamine
    pub fn spike_dopamine(&mut self, delta: i32) {
        self.chemistry.spike_dopamine(delta);
    }

    /// Add `delta` to norepinephrine
    pub fn spike_norepinephrine(&mut self, delta: i32) {
        self.chemistry.spike_norepinephrine(delta);
    }

    /// Add `delta` to serotonin
    pub fn spike_serotonin(&mut self, delta: i32) {
        self.chemistry.spike_serotonin(delta);
    }

    /// Add `delta` to acetylcholine
    pub fn spike_acetylcholine(&mut self, delta: i32) {
        self.chemistry.spike_acetylcholine(delta);
    }

    /// Snapshot of the neuromodulator vector
    pub fn chemicals(&self) -> Chemistry {
        self.chemistry
    }

    /// Replace the neuromodulator vector wholesale (consolidation hook)
    pub fn set_chemicals(&mut self, chemistry: Chemistry) {
        self.chemistry = chemistry;
    }

    // ------------------------------------------------------------------
    // Probes (read-only, between ticks)
    // ------------------------------------------------------------------

    /// Tick the next `step` will execute as
    pub fn current_tick(&self) -> Tick {
        self.current_tick
    }

    /// Whether `id` fired on the most recently recorded tick
    pub fn did_fire(&self, id: NeuronId) -> bool {
        self.fired_bits.get(id.raw())
    }

    /// Ids fired on the most recently recorded tick, ascending
    pub fn fired_this_tick(&self) -> &[NeuronId] {
        match self.history.back() {
            Some((_, fired)) => fired,
            None => &[],
        }
    }

    /// A neuron's charge; 0 for out-of-range ids
    pub fn charge(&self, id: NeuronId) -> i32 {
        self.neurons
            .get(id.raw() as usize)
            .map(|n| n.potential)
            .unwrap_or(0)
    }

    /// Weight of the first synapse from `from` to `to`; 0 if none exists
    pub fn synapse_weight(&self, from: NeuronId, to: NeuronId) -> i8 {
        self.synapses.weight_between(from.raw(), to)
    }

    /// Eligibility trace of the first synapse from `from` to `to`; 0 if none
    pub fn synapse_trace(&self, from: NeuronId, to: NeuronId) -> i8 {
        self.synapses
            .outgoing(from.raw())
            .find(|s| s.target == to)
            .map(|s| s.trace)
            .unwrap_or(0)
    }

    /// Suprathreshold candidate count of the last firing phase, before the
    /// razor trimmed it
    pub fn last_candidate_count(&self) -> usize {
        self.last_candidate_count
    }

    /// Number of neurons in the arena
    pub fn neuron_count(&self) -> usize {
        self.neurons.len()
    }

    /// Number of synapses across arena and overflow storage
    pub fn synapse_count(&self) -> usize {
        self.synapses.len()
    }

    /// Running engine counters
    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Open the firing record for `tick` if not already open, pruning
    /// entries that fell out of the STDP window
    fn roll_to(&mut self, tick: Tick) {
        if self.fired_stamp < tick {
            self.history.push_back((tick, Vec::new()));
            self.fired_bits.clear_all();
            self.fired_stamp = tick;
            while let Some((t, _)) = self.history.front() {
                if *t < tick - STDP_WINDOW {
                    self.history.pop_front();
                } else {
                    break;
                }
            }
        }
    }

    /// The LTP/LTD sweeps for tick `tick`
    fn apply_plasticity(&mut self, tick: Tick) {
        let mode = self.config.mode;
        let history = &self.history;
        let neurons = &self.neurons;
        let fired_bits = &self.fired_bits;
        let synapses = &mut self.synapses;
        let seen = &mut self.stdp_seen;
        seen.clear_all();

        // LTP: each pre's most recent firing inside the window, paired
        // against targets that fired this tick. Cost is bounded by
        // spikes-in-window x average fan-out.
        for (entry_tick, pres) in history.iter().rev() {
            let dt = tick - entry_tick;
            if dt < 1 {
                continue; // the current tick's own record
            }
            if dt > STDP_WINDOW {
                break;
            }
            let delta = stdp_delta(dt);
            for pre in pres {
                let pre_raw = pre.raw();
                if seen.get(pre_raw) {
                    continue;
                }
                seen.set(pre_raw);
                if delta <= 0 {
                    continue;
                }
                for synapse in synapses.outgoing_mut(pre_raw) {
                    if !synapse.plastic || !fired_bits.get(synapse.target.raw()) {
                        continue;
                    }
                    match mode {
                        PlasticityMode::Pavlovian => {
                            synapse.weight = clamp_weight(synapse.weight as i32 + delta);
                        }
                        PlasticityMode::Operant => {
                            synapse.trace = ELIGIBILITY_MAX;
                        }
                    }
                }
            }
        }

        // LTD, Pavlovian only: pres that fired this tick depress synapses
        // onto targets that fired earlier inside the window.
        if mode == PlasticityMode::Pavlovian {
            if let Some((entry_tick, pres)) = history.back() {
                if *entry_tick == tick {
                    for pre in pres {
                        for synapse in synapses.outgoing_mut(pre.raw()) {
                            if !synapse.plastic {
                                continue;
                            }
                            let Some(post) = neurons.get(synapse.target.raw() as usize) else {
                                continue;
                            };
                            // A negative stamp is the never-fired sentinel,
                            // not a firing.
                            if post.last_fired_tick >= tick || post.last_fired_tick < 0 {
                                continue;
                            }
                            let delta = stdp_delta(post.last_fired_tick - tick);
                            if delta < 0 {
                                synapse.weight = clamp_weight(synapse.weight as i32 + delta);
                            }
                        }
                    }
                }
            }
        }
    }

    fn panic_wipe(&mut self, tick: Tick) {
        log::warn!("panic reset at tick {tick}: norepinephrine saturated");
        for neuron in &mut self.neurons {
            neuron.potential = 0;
        }
        self.queue.clear();
        self.history.clear();
        self.fired_bits.clear_all();
        self.fired_stamp = Tick::MIN;
        self.chemistry.set_norepinephrine(PANIC_NE_RESET as i32);
        self.stats.panics += 1;
    }
}

/// Builder for assembling a network declaratively
#[derive(Debug, Default)]
pub struct NetworkBuilder {
    config: NetworkConfig,
    neurons: Vec<NeuronParams>,
    connections: Vec<(u32, u32, i32, bool)>,
}

impl NetworkBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the configuration
    pub fn with_config(mut self, config: NetworkConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the root seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Queue a neuron; ids are assigned in call order starting at 0
    pub fn add_neuron(mut self, params: NeuronParams) -> Self {
        self.neurons.push(params);
        self
    }

    /// Queue `count` identical neurons
    pub fn add_neurons(mut self, count: usize, params: NeuronParams) -> Self {
        self.neurons.extend(std::iter::repeat(params).take(count));
        self
    }

    /// Queue a connection between builder-assigned ids
    pub fn connect(mut self, from: u32, to: u32, weight: i32, plastic: bool) -> Self {
        self.connections.push((from, to, weight, plastic));
        self
    }

    /// Build the network
    pub fn build(self) -> Result<Network> {
        let mut network = Network::new(self.config)?;
        for params in &self.neurons {
            params.validate()?;
            network.add_neuron(*params);
        }
        for (from, to, weight, plastic) in self.connections {
            if !network.connect_neurons(NeuronId::new(from), NeuronId::new(to), weight, plastic) {
                return Err(CoreError::invalid_config(format!(
                    "connection references unknown neuron ({from} -> {to})"
                )));
            }
        }
        Ok(network)
    }
}
