//! Universal Knowledge Store atop the corticon tick engine
//!
//! This crate layers homeostatic concept memory over `corticon-core`: a
//! recognition bus all columns watch, fixed-topology cortical columns that
//! template-match bus patterns, a Request neuron that fires when nothing
//! recognises the input, and a one-shot winner-take-all allocator that binds
//! a free column to the novel pattern. The store holds only ids into the
//! engine; all neuron and synapse state stays inside the [`Network`]
//! (re-exported from the core).
//!
//! [`Network`]: corticon_core::Network

#![deny(missing_docs)]
#![warn(clippy::all)]

use corticon_core::Tick;

// Core modules
pub mod column;
pub mod cortex;
pub mod error;
pub mod motor;
pub mod uks;

// Re-export essential types
pub use column::{ColumnConfig, ColumnId, CorticalColumn};
pub use cortex::Cortex;
pub use error::{Result, UksError};
pub use motor::MotorPlate;
pub use uks::{Uks, UksConfig, UksOutcome};

// Convenience re-exports from the engine
pub use corticon_core::{Chemistry, Network, NetworkConfig, NeuronId, NeuronParams};

/// Request neuron firing threshold
pub const REQUEST_THRESHOLD: i32 = 130;
/// Request neuron leak
pub const REQUEST_LEAK: i32 = 3;
/// Request neuron refractory period, in ticks
pub const REQUEST_REFRACTORY: Tick = 25;

/// Default ticks a presentation stabilises before novelty may fire
pub const STABILIZATION_TICKS: Tick = 8;

/// Excitatory weight from each bus neuron to the Request neuron
pub const REQUEST_BUS_WEIGHT: i32 = 1;
/// Inhibitory weight from a column output to the Request neuron
pub const OUTPUT_REQUEST_WEIGHT: i32 = -16;
/// Parallel inhibitory edges from each column output to the Request neuron
pub const OUTPUT_REQUEST_EDGES: usize = 4;

/// Weight from a column output into the global inhibitor
pub const OUTPUT_INHIBITOR_WEIGHT: i32 = 16;
/// Weight from the global inhibitor back onto each column output
pub const INHIBITOR_OUTPUT_WEIGHT: i32 = -8;

/// Allocation wiring: weight from a pattern-member bus neuron to a column
/// input neuron
pub const BUS_EXCITE_WEIGHT: i32 = 1;
/// Allocation wiring: weight from a non-member bus neuron to a column input
/// neuron
pub const BUS_INHIBIT_WEIGHT: i32 = -16;
/// Charge injected into the remaining free columns' outputs at allocation
pub const FREE_COLUMN_PENALTY: i32 = -10;

/// Base per-tick charge injected into each presented bus neuron; the full
/// drive is `BUS_DRIVE_BASE + acetylcholine / 10`
pub const BUS_DRIVE_BASE: i32 = 5;

/// Dopamine spike on recognition
pub const DA_RECOGNITION_SPIKE: i32 = 10;
/// Dopamine spike on allocation
pub const DA_ALLOCATION_SPIKE: i32 = 30;
/// Norepinephrine spike on novelty
pub const NE_NOVELTY_SPIKE: i32 = 50;
/// Acetylcholine spike on novelty
pub const ACH_NOVELTY_SPIKE: i32 = 30;
/// Serotonin spike on an idle tick
pub const HT_IDLE_SPIKE: i32 = 5;
/// Acetylcholine drift applied on idle ticks while above the floor
pub const ACH_IDLE_DRIFT: i32 = -2;
/// Floor under which idle ticks stop draining acetylcholine
pub const ACH_IDLE_FLOOR: i8 = 30;
