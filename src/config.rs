use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::airport::gate::{GateSize, GateType};
use crate::error::Result;

/// Full configuration of one simulation run.
///
/// Everything the original hard-coded lives here: the airport layout, the
/// ground-fleet sizes, the scheduler weights and the pacing constants. A run
/// is reproducible from `(config, seed)` alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Master RNG seed; per-worker generators derive from it.
    pub seed: u64,

    /// Wall-clock milliseconds per simulated time unit.
    pub tick_interval_ms: u64,

    /// Total simulated units before the engine stops on its own.
    pub simulation_duration: i64,

    pub runway_names: Vec<String>,
    pub gates: Vec<GateConfig>,
    pub vehicles: VehicleCounts,
    pub pis_weights: PisWeights,

    /// Admission cap for concurrently active flights.
    pub max_active_flights: usize,

    pub max_go_arounds: u32,
    pub go_around_fuel_gallons: f64,
    /// Simulated units a go-around circles before the next approach.
    pub go_around_penalty_units: i64,

    /// Pool poll budget for runway and gate requests.
    pub retry_attempts: u32,
    pub retry_interval_ms: u64,

    /// Wall milliseconds a runway waiter spends per outstanding separation unit.
    pub separation_wait_ms_per_unit: u64,

    pub generator: GeneratorConfig,
    pub sampler_interval_ms: u64,
    pub dashboard_enabled: bool,
    pub crisis_monitor_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    pub gate_type: GateType,
    pub size: GateSize,
    pub jetbridge: bool,
}

/// Ground-service fleet sizes, one field per vehicle kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleCounts {
    pub fuel_trucks: usize,
    pub catering: usize,
    pub baggage_carts: usize,
    pub cleaning_crews: usize,
    pub buses: usize,
    pub tugs: usize,
    pub ground_power_units: usize,
}

/// The five PIS weights. Must sum to 1.0 within the guard tolerance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PisWeights {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub delta: f64,
    pub epsilon: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub enabled: bool,
    /// Wall-clock seconds between generation attempts (inclusive bounds).
    pub min_delay_s: u64,
    pub max_delay_s: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let mut gates = Vec::new();
        for _ in 0..2 {
            gates.push(GateConfig { gate_type: GateType::International, size: GateSize::Large, jetbridge: true });
        }
        for _ in 2..5 {
            gates.push(GateConfig { gate_type: GateType::International, size: GateSize::Heavy, jetbridge: true });
        }
        for _ in 5..10 {
            gates.push(GateConfig { gate_type: GateType::International, size: GateSize::Medium, jetbridge: true });
        }
        for _ in 10..15 {
            gates.push(GateConfig { gate_type: GateType::Domestic, size: GateSize::Medium, jetbridge: true });
        }
        for _ in 15..20 {
            gates.push(GateConfig { gate_type: GateType::Domestic, size: GateSize::Small, jetbridge: false });
        }

        SimulationConfig {
            seed: 42,
            tick_interval_ms: 100,
            simulation_duration: 86_400,
            runway_names: vec!["27L".to_string(), "27R".to_string(), "09L".to_string(), "09R".to_string()],
            gates,
            vehicles: VehicleCounts {
                fuel_trucks: 8,
                catering: 6,
                baggage_carts: 10,
                cleaning_crews: 4,
                buses: 5,
                tugs: 6,
                ground_power_units: 8,
            },
            pis_weights: PisWeights { alpha: 0.25, beta: 0.20, gamma: 0.15, delta: 0.20, epsilon: 0.20 },
            max_active_flights: 8,
            max_go_arounds: 3,
            go_around_fuel_gallons: 143.0,
            go_around_penalty_units: 20,
            retry_attempts: 30,
            retry_interval_ms: 1000,
            separation_wait_ms_per_unit: 10,
            generator: GeneratorConfig { enabled: true, min_delay_s: 2, max_delay_s: 5 },
            sampler_interval_ms: 500,
            dashboard_enabled: true,
            crisis_monitor_enabled: true,
        }
    }
}

impl SimulationConfig {
    /// Loads a config from a JSON file. Missing fields fall back to the
    /// defaults above, so partial configs are fine.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let config: SimulationConfig = serde_json::from_str(&raw)?;
        Ok(config)
    }

    /// A layout suited to integration tests: millisecond cadence, no
    /// background generation, no terminal output.
    pub fn fast() -> Self {
        SimulationConfig {
            tick_interval_ms: 1,
            retry_interval_ms: 2,
            separation_wait_ms_per_unit: 1,
            generator: GeneratorConfig { enabled: false, min_delay_s: 1, max_delay_s: 1 },
            dashboard_enabled: false,
            crisis_monitor_enabled: false,
            ..SimulationConfig::default()
        }
    }
}
