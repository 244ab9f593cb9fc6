use serde::{Deserialize, Serialize};
use std::sync::{Arc, Condvar, Mutex};

use crate::airport::aircraft::AircraftType;
use crate::airport::flight::FlightKey;
use crate::config::GateConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateType {
    International,
    Domestic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateSize {
    Large,
    Heavy,
    Medium,
    Regional,
    Small,
}

#[derive(Debug)]
struct GateState {
    available: bool,
    current_flight: Option<FlightKey>,
}

/// One stand. Compatibility is checked at reservation time; an incompatible
/// flight can never hold the gate.
#[derive(Debug)]
pub struct Gate {
    pub id: usize,
    pub gate_type: GateType,
    pub size: GateSize,
    pub has_jetbridge: bool,
    state: Mutex<GateState>,
    gate_free: Condvar,
}

impl Gate {
    pub fn new(id: usize, gate_type: GateType, size: GateSize, has_jetbridge: bool) -> Self {
        Gate {
            id,
            gate_type,
            size,
            has_jetbridge,
            state: Mutex::new(GateState { available: true, current_flight: None }),
            gate_free: Condvar::new(),
        }
    }

    /// The size/type matrix. International flights require an international
    /// gate; aircraft types map to the stand sizes that can take them.
    pub fn is_compatible(&self, aircraft_type: AircraftType, needs_international: bool) -> bool {
        if needs_international && self.gate_type != GateType::International {
            return false;
        }

        use GateSize::*;
        match aircraft_type {
            AircraftType::A380 => self.size == Large,
            AircraftType::B777 | AircraftType::B747F | AircraftType::B777F => matches!(self.size, Large | Heavy),
            AircraftType::B737 | AircraftType::A320 => matches!(self.size, Heavy | Medium),
            AircraftType::G650 | AircraftType::Falcon7X => matches!(self.size, Small | Regional),
            AircraftType::Emergency => matches!(self.size, Medium | Heavy),
        }
    }

    pub fn try_reserve(&self, flight: FlightKey, aircraft_type: AircraftType, needs_international: bool) -> bool {
        let mut state = self.state.lock().expect("lock poisoned");

        if !state.available || !self.is_compatible(aircraft_type, needs_international) {
            return false;
        }

        state.available = false;
        state.current_flight = Some(flight);
        true
    }

    pub fn release(&self) {
        let mut state = self.state.lock().expect("lock poisoned");
        state.available = true;
        state.current_flight = None;
        self.gate_free.notify_all();
    }

    pub fn is_available(&self) -> bool {
        self.state.lock().expect("lock poisoned").available
    }

    pub fn current_flight(&self) -> Option<FlightKey> {
        self.state.lock().expect("lock poisoned").current_flight
    }
}

/// Compatibility-checked gate allocation. First compatible available gate in
/// insertion order wins; there is no fairness guarantee between pollers.
#[derive(Debug)]
pub struct GatePool {
    gates: Vec<Arc<Gate>>,
}

impl GatePool {
    pub fn new(layout: &[GateConfig]) -> Self {
        let gates = layout
            .iter()
            .enumerate()
            .map(|(id, g)| Arc::new(Gate::new(id, g.gate_type, g.size, g.jetbridge)))
            .collect();
        GatePool { gates }
    }

    pub fn allocate(&self, flight: FlightKey, aircraft_type: AircraftType, needs_international: bool, flight_id: &str) -> Option<usize> {
        for gate in &self.gates {
            if gate.is_available() && gate.try_reserve(flight, aircraft_type, needs_international) {
                log::info!(target: "resources", "Flight {} allocated gate {}", flight_id, gate.id);
                return Some(gate.id);
            }
        }
        None
    }

    pub fn release(&self, gate_id: usize) {
        if let Some(gate) = self.gates.get(gate_id) {
            gate.release();
            log::info!(target: "resources", "Gate {} released", gate_id);
        }
    }

    pub fn get(&self, gate_id: usize) -> Option<&Arc<Gate>> {
        self.gates.get(gate_id)
    }

    /// Who currently holds a gate, for priority inheritance on the wait path.
    pub fn holder(&self, gate_id: usize) -> Option<FlightKey> {
        self.gates.get(gate_id).and_then(|g| g.current_flight())
    }

    /// The first gate (insertion order) that could ever take this aircraft,
    /// occupied or not. Waiters use its holder for priority inheritance.
    pub fn first_compatible(&self, aircraft_type: AircraftType, needs_international: bool) -> Option<usize> {
        self.gates.iter().find(|g| g.is_compatible(aircraft_type, needs_international)).map(|g| g.id)
    }

    pub fn len(&self) -> usize {
        self.gates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }

    pub fn available_count(&self) -> usize {
        self.gates.iter().filter(|g| g.is_available()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use slotmap::SlotMap;

    fn flight_key() -> FlightKey {
        let mut map: SlotMap<FlightKey, ()> = SlotMap::with_key();
        map.insert(())
    }

    fn default_pool() -> GatePool {
        GatePool::new(&SimulationConfig::default().gates)
    }

    #[test]
    fn a380_only_fits_large_gates() {
        let pool = default_pool();
        let first = pool.allocate(flight_key(), AircraftType::A380, true, "BA1").unwrap();
        let second = pool.allocate(flight_key(), AircraftType::A380, true, "BA2").unwrap();
        assert_eq!((first, second), (0, 1));

        // Both LARGE international gates taken; the third A380 is refused.
        assert!(pool.allocate(flight_key(), AircraftType::A380, true, "BA3").is_none());
    }

    #[test]
    fn international_flight_rejects_domestic_gate() {
        let gates = vec![GateConfig { gate_type: GateType::Domestic, size: GateSize::Large, jetbridge: true }];
        let pool = GatePool::new(&gates);
        assert!(pool.allocate(flight_key(), AircraftType::A380, true, "BA1").is_none());
        assert!(pool.allocate(flight_key(), AircraftType::A380, false, "BA2").is_some());
    }

    #[test]
    fn size_rules_follow_aircraft_classes() {
        let gate = |size| Gate::new(0, GateType::International, size, true);

        assert!(gate(GateSize::Large).is_compatible(AircraftType::B777, true));
        assert!(gate(GateSize::Heavy).is_compatible(AircraftType::B777F, true));
        assert!(!gate(GateSize::Medium).is_compatible(AircraftType::B777, true));

        assert!(gate(GateSize::Medium).is_compatible(AircraftType::A320, false));
        assert!(gate(GateSize::Heavy).is_compatible(AircraftType::B737, false));
        assert!(!gate(GateSize::Small).is_compatible(AircraftType::B737, false));

        assert!(gate(GateSize::Small).is_compatible(AircraftType::G650, false));
        assert!(gate(GateSize::Regional).is_compatible(AircraftType::Falcon7X, false));
        assert!(!gate(GateSize::Large).is_compatible(AircraftType::G650, false));

        assert!(gate(GateSize::Medium).is_compatible(AircraftType::Emergency, false));
        assert!(gate(GateSize::Heavy).is_compatible(AircraftType::Emergency, false));
        assert!(!gate(GateSize::Large).is_compatible(AircraftType::Emergency, false));
    }

    #[test]
    fn release_returns_gate_to_pool() {
        let pool = default_pool();
        let flight = flight_key();
        let id = pool.allocate(flight, AircraftType::A380, true, "BA1").unwrap();
        assert_eq!(pool.holder(id), Some(flight));

        pool.release(id);
        assert!(pool.holder(id).is_none());
        assert_eq!(pool.allocate(flight_key(), AircraftType::A380, true, "BA2"), Some(id));
    }
}
