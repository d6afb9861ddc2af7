//! Thin plastic bus→motor template

use corticon_core::{Network, NeuronId, NeuronParams};

/// A bank of motor neurons with plastic fan-in from the recognition bus
///
/// Every bus neuron connects to every motor neuron at weight zero, plastic.
/// Operant pairings tag the bus→motor synapses that preceded a motor
/// firing; reward then carves the mapping. The plate holds only ids — the
/// action-selection policy lives with the host.
#[derive(Debug, Clone)]
pub struct MotorPlate {
    motors: Vec<NeuronId>,
}

impl MotorPlate {
    /// Create `motor_count` motor neurons and wire the plastic template
    /// from `bus`
    pub fn attach(
        network: &mut Network,
        bus: &[NeuronId],
        motor_count: usize,
        params: NeuronParams,
    ) -> Self {
        let motors: Vec<NeuronId> = (0..motor_count).map(|_| network.add_neuron(params)).collect();
        for bus_neuron in bus {
            for motor in &motors {
                network.connect_neurons(*bus_neuron, *motor, 0, true);
            }
        }
        log::debug!(
            "motor plate attached: {} motors, {} plastic synapses",
            motor_count,
            motor_count * bus.len()
        );
        Self { motors }
    }

    /// Motor neurons in plate order
    pub fn neurons(&self) -> &[NeuronId] {
        &self.motors
    }

    /// Plate indices whose motor fired on the most recent tick
    pub fn fired(&self, network: &Network) -> Vec<usize> {
        self.motors
            .iter()
            .enumerate()
            .filter(|(_, id)| network.did_fire(**id))
            .map(|(i, _)| i)
            .collect()
    }

    /// The motor holding the most charge, if any charge is held at all
    pub fn strongest(&self, network: &Network) -> Option<usize> {
        self.motors
            .iter()
            .enumerate()
            .map(|(i, id)| (network.charge(*id), i))
            .filter(|&(charge, _)| charge > 0)
            .max_by_key(|&(charge, i)| (charge, core::cmp::Reverse(i)))
            .map(|(_, i)| i)
    }
}
