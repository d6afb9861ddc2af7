//! End-to-end engine behaviour: LIF timing, STDP, eligibility traces, the
//! razor gate, and the panic interrupt.

use corticon_core::{
    Chemistry, Network, NetworkBuilder, NeuronId, NeuronParams,
};

/// Chemistry with norepinephrine and serotonin zeroed so threshold gain and
/// the leak bonus vanish; dopamine stays at baseline so plasticity is live.
fn flat_chemistry() -> Chemistry {
    Chemistry::new(50, 0, 0, 50)
}

fn flat_network() -> Network {
    let mut network = Network::with_capacity(32, 256);
    network.set_chemicals(flat_chemistry());
    network
}

#[test]
fn isolated_lif_fires_on_schedule() {
    let mut network = flat_network();
    let target = network.add_neuron(NeuronParams::new(5, 0, 2).unwrap());
    let driver = network.add_neuron(NeuronParams::new(1, 0, 0).unwrap());
    network.connect_neurons(driver, target, 10, false);

    // Tick 0: two charge packets push the target over threshold.
    network.inject_charge(target, 3);
    network.inject_charge(target, 3);
    network.step();
    assert!(network.did_fire(target));
    assert_eq!(network.charge(target), 0);

    // Tick 1: refractory. A forced driver spike is in flight.
    network.inject_spike(driver);
    network.step();
    assert!(!network.did_fire(target));

    // Tick 2: the driver's spike arrives but the target is still inside its
    // refractory window and absorbs nothing.
    network.inject_spike(driver);
    network.step();
    assert!(!network.did_fire(target));
    assert_eq!(network.charge(target), 0);

    // Tick 3: window closed; the second driver spike lands and fires it.
    network.step();
    assert!(network.did_fire(target));
}

#[test]
fn stdp_potentiates_pre_before_post() {
    let mut network = flat_network();
    let a = network.add_neuron(NeuronParams::new(1000, 0, 0).unwrap());
    let b = network.add_neuron(NeuronParams::new(1000, 0, 0).unwrap());
    network.connect_neurons(a, b, 0, true);

    network.inject_spike(a); // t = 0
    network.run(3);
    network.inject_spike(b); // t = 3
    network.step();

    let w = network.synapse_weight(a, b);
    assert!(w > 0 && w <= 2, "expected small positive weight, got {w}");
}

#[test]
fn stdp_depresses_post_before_pre() {
    let mut network = flat_network();
    let a = network.add_neuron(NeuronParams::new(1000, 0, 0).unwrap());
    let b = network.add_neuron(NeuronParams::new(1000, 0, 0).unwrap());
    network.connect_neurons(a, b, 0, true);

    network.inject_spike(b); // t = 0
    network.run(3);
    network.inject_spike(a); // t = 3
    network.step();

    assert_eq!(network.synapse_weight(a, b), -1);
}

#[test]
fn stdp_magnitudes_mirror() {
    let run = |first: usize, second: usize| {
        let mut network = flat_network();
        let a = network.add_neuron(NeuronParams::new(1000, 0, 0).unwrap());
        let b = network.add_neuron(NeuronParams::new(1000, 0, 0).unwrap());
        network.connect_neurons(a, b, 0, true);
        let ids = [a, b];
        network.inject_spike(ids[first]);
        network.run(5);
        network.inject_spike(ids[second]);
        network.step();
        network.synapse_weight(a, b)
    };
    let ltp = run(0, 1);
    let ltd = run(1, 0);
    assert_eq!(ltp, -ltd);
}

#[test]
fn stdp_ignores_non_plastic_synapses() {
    let mut network = flat_network();
    let a = network.add_neuron(NeuronParams::new(1000, 0, 0).unwrap());
    let b = network.add_neuron(NeuronParams::new(1000, 0, 0).unwrap());
    network.connect_neurons(a, b, 3, false);

    network.inject_spike(a);
    network.run(3);
    network.inject_spike(b);
    network.step();
    assert_eq!(network.synapse_weight(a, b), 3);
}

#[test]
fn stdp_gated_off_below_dopamine_floor() {
    let mut network = flat_network();
    network.set_chemicals(Chemistry::new(5, 0, 0, 50));
    let a = network.add_neuron(NeuronParams::new(1000, 0, 0).unwrap());
    let b = network.add_neuron(NeuronParams::new(1000, 0, 0).unwrap());
    network.connect_neurons(a, b, 0, true);

    network.inject_spike(a);
    network.run(3);
    network.set_chemicals(Chemistry::new(5, 0, 0, 50));
    network.inject_spike(b);
    network.step();
    assert_eq!(network.synapse_weight(a, b), 0);
}

#[test]
fn eligibility_trace_bridges_delayed_reward() {
    let mut network = flat_network();
    network.set_operant_mode(true);
    let a = network.add_neuron(NeuronParams::new(1000, 0, 0).unwrap());
    let b = network.add_neuron(NeuronParams::new(1000, 0, 0).unwrap());
    network.connect_neurons(a, b, 0, true);

    network.run(10); // idle until t = 10
    network.inject_spike(a); // t = 10
    network.run(3);
    network.inject_spike(b); // t = 13
    network.step();
    assert_eq!(network.synapse_trace(a, b), 100);
    assert_eq!(network.synapse_weight(a, b), 0);

    network.run(40); // t = 14..=53
    assert_eq!(network.synapse_trace(a, b), 60);

    network.inject_reward(50);
    assert_eq!(network.synapse_weight(a, b), 16); // clamp((60 * 50) / 50)
    assert_eq!(network.synapse_trace(a, b), 0);
}

#[test]
fn negative_reward_depresses() {
    let mut network = flat_network();
    network.set_operant_mode(true);
    let a = network.add_neuron(NeuronParams::new(1000, 0, 0).unwrap());
    let b = network.add_neuron(NeuronParams::new(1000, 0, 0).unwrap());
    network.connect_neurons(a, b, 0, true);

    network.inject_spike(a);
    network.run(2);
    network.inject_spike(b);
    network.step();
    network.run(90); // trace decays to 10
    assert_eq!(network.synapse_trace(a, b), 10);

    network.inject_reward(-50);
    assert_eq!(network.synapse_weight(a, b), -10);
    assert_eq!(network.synapse_trace(a, b), 0);
}

#[test]
fn razor_caps_firing_across_ticks() {
    let mut network = flat_network();
    network.set_max_spikes_per_tick(3);
    let ids: Vec<NeuronId> = (0..10)
        .map(|_| network.add_neuron(NeuronParams::new(5, 0, 10).unwrap()))
        .collect();
    for id in &ids {
        network.inject_charge(*id, 5);
    }

    // Winners drain in id order, three per tick; losers keep their charge
    // and win later rounds.
    network.step();
    assert_eq!(network.fired_this_tick(), &ids[0..3]);
    assert_eq!(network.last_candidate_count(), 10);
    network.step();
    assert_eq!(network.fired_this_tick(), &ids[3..6]);
    network.step();
    assert_eq!(network.fired_this_tick(), &ids[6..9]);
    network.step();
    assert_eq!(network.fired_this_tick(), &ids[9..10]);
}

#[test]
fn panic_reset_on_norepinephrine_saturation() {
    let mut network = flat_network();
    let ids: Vec<NeuronId> = (0..4)
        .map(|_| network.add_neuron(NeuronParams::new(50, 0, 0).unwrap()))
        .collect();
    for id in &ids {
        network.inject_charge(*id, 20);
        network.inject_spike(*id);
    }

    network.set_chemicals(Chemistry::new(50, 95, 50, 50));
    network.step();

    for id in &ids {
        assert_eq!(network.charge(*id), 0);
    }
    assert!(network.fired_this_tick().is_empty());
    assert_eq!(network.chemicals().norepinephrine(), 70);
    assert_eq!(network.stats().panics, 1);

    // The forced post-panic level does not retrigger.
    network.step();
    assert_eq!(network.stats().panics, 1);
}

#[test]
fn manual_panic_reset() {
    let mut network = flat_network();
    let a = network.add_neuron(NeuronParams::new(50, 0, 0).unwrap());
    network.inject_charge(a, 30);
    network.panic_reset();
    assert_eq!(network.charge(a), 0);
    assert_eq!(network.chemicals().norepinephrine(), 70);
}

#[test]
fn norepinephrine_monotonically_lowers_threshold() {
    // With noise off (NE <= 60), raising NE can only make a fixed charge
    // fire, never un-fire.
    let mut fired_at = Vec::new();
    for ne in [0, 10, 20, 30, 40, 50, 60] {
        let mut network = Network::with_capacity(1, 0);
        network.set_chemicals(Chemistry::new(50, ne, 0, 50));
        let a = network.add_neuron(NeuronParams::new(20, 0, 0).unwrap());
        network.inject_charge(a, 12);
        network.step();
        fired_at.push(network.did_fire(a));
    }
    // Gain reaches 8 at NE=40 (effective threshold 12), and once firing
    // starts it never stops as NE climbs.
    assert_eq!(fired_at.iter().position(|&f| f), Some(4));
    for w in fired_at.windows(2) {
        assert!(!w[0] || w[1]);
    }
}

#[test]
fn determinism_bit_exact_across_runs() {
    let drive = |seed: u64| -> (Vec<Vec<NeuronId>>, Vec<i8>) {
        let mut network = NetworkBuilder::new()
            .with_seed(seed)
            .add_neurons(20, NeuronParams::new(8, 1, 1).unwrap())
            .build()
            .unwrap();
        for i in 0..20u32 {
            for j in 0..20u32 {
                if i != j && (i + j) % 3 == 0 {
                    network.connect_neurons(NeuronId::new(i), NeuronId::new(j), 4, true);
                }
            }
        }
        // High NE engages threshold jitter; the draw must still be
        // reproducible because it derives from (tick, id, seed).
        network.spike_norepinephrine(50);
        let mut fired = Vec::new();
        for t in 0..50 {
            if t % 7 == 0 {
                network.inject_charge(NeuronId::new(t % 20), 9);
            }
            if t % 11 == 0 {
                network.inject_noise(3);
            }
            network.step();
            fired.push(network.fired_this_tick().to_vec());
        }
        let mut weights = Vec::new();
        for i in 0..20u32 {
            for j in 0..20u32 {
                weights.push(network.synapse_weight(NeuronId::new(i), NeuronId::new(j)));
            }
        }
        (fired, weights)
    };

    let (fired_a, weights_a) = drive(1234);
    let (fired_b, weights_b) = drive(1234);
    assert_eq!(fired_a, fired_b);
    assert_eq!(weights_a, weights_b);

    // A different seed should eventually diverge in the jittered regime.
    let (fired_c, _) = drive(9999);
    assert_ne!(fired_a, fired_c);
}
