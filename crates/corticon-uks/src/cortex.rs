//! Packaged engine + knowledge store with enforced step ordering

use crate::{
    error::*,
    uks::{Uks, UksConfig, UksOutcome},
};
use corticon_core::{Network, NetworkConfig};

/// A network and its knowledge store, stepped as one
///
/// `tick()` runs `network.step()` followed by `uks.step()`, the only legal
/// ordering. Hosts that need to interleave other collaborators can still
/// hold the parts separately; this type is the convenience wrapper.
#[derive(Debug)]
pub struct Cortex {
    network: Network,
    uks: Uks,
}

impl Cortex {
    /// Build a network and knowledge store from the two configurations
    pub fn new(network_config: NetworkConfig, uks_config: UksConfig) -> Result<Self> {
        let mut network = Network::new(network_config)?;
        let uks = Uks::new(&mut network, uks_config)?;
        Ok(Self { network, uks })
    }

    /// Build with default engine configuration
    pub fn with_uks_config(uks_config: UksConfig) -> Result<Self> {
        Self::new(NetworkConfig::default(), uks_config)
    }

    /// Advance one tick: engine first, then the store's inspection
    pub fn tick(&mut self) -> UksOutcome {
        self.network.step();
        self.uks.step(&mut self.network)
    }

    /// Run `n` ticks, returning the last outcome
    pub fn run(&mut self, n: u64) -> UksOutcome {
        let mut outcome = UksOutcome::Idle;
        for _ in 0..n {
            outcome = self.tick();
        }
        outcome
    }

    /// Present a bus pattern (re-injected every tick until cleared)
    pub fn present(&mut self, pattern: &[usize]) {
        self.uks.present(&self.network, pattern);
    }

    /// Stop the current presentation
    pub fn clear_presentation(&mut self) {
        self.uks.clear_presentation();
    }

    /// The engine
    pub fn network(&self) -> &Network {
        &self.network
    }

    /// The engine, mutably (probes and injections between ticks)
    pub fn network_mut(&mut self) -> &mut Network {
        &mut self.network
    }

    /// The knowledge store
    pub fn uks(&self) -> &Uks {
        &self.uks
    }

    /// The knowledge store, mutably
    pub fn uks_mut(&mut self) -> &mut Uks {
        &mut self.uks
    }
}
