use std::fmt;
use std::sync::Mutex;

use crate::airport::flight::FlightKey;

/// The seven ground-service vehicle kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VehicleKind {
    FuelTruck,
    Catering,
    BaggageCart,
    CleaningCrew,
    Bus,
    Tug,
    GroundPowerUnit,
}

pub const VEHICLE_KIND_COUNT: usize = 7;

impl VehicleKind {
    pub const ALL: [VehicleKind; VEHICLE_KIND_COUNT] = [
        VehicleKind::FuelTruck,
        VehicleKind::Catering,
        VehicleKind::BaggageCart,
        VehicleKind::CleaningCrew,
        VehicleKind::Bus,
        VehicleKind::Tug,
        VehicleKind::GroundPowerUnit,
    ];

    pub fn index(self) -> usize {
        match self {
            VehicleKind::FuelTruck => 0,
            VehicleKind::Catering => 1,
            VehicleKind::BaggageCart => 2,
            VehicleKind::CleaningCrew => 3,
            VehicleKind::Bus => 4,
            VehicleKind::Tug => 5,
            VehicleKind::GroundPowerUnit => 6,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            VehicleKind::FuelTruck => "FuelTruck",
            VehicleKind::Catering => "Catering",
            VehicleKind::BaggageCart => "BaggageCart",
            VehicleKind::CleaningCrew => "CleaningCrew",
            VehicleKind::Bus => "Bus",
            VehicleKind::Tug => "Tug",
            VehicleKind::GroundPowerUnit => "GPU",
        }
    }
}

impl fmt::Display for VehicleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug)]
struct VehicleState {
    available: bool,
    assigned_flight: Option<FlightKey>,
    assignment_time: i64,
    expected_duration: i64,
}

/// A single vehicle with its own reservation lock.
#[derive(Debug)]
pub struct Vehicle {
    pub id: usize,
    pub kind: VehicleKind,
    pub name: String,
    state: Mutex<VehicleState>,
}

impl Vehicle {
    pub fn new(id: usize, kind: VehicleKind) -> Self {
        Vehicle {
            id,
            kind,
            name: format!("{}-{}", kind.name(), id),
            state: Mutex::new(VehicleState { available: true, assigned_flight: None, assignment_time: 0, expected_duration: 0 }),
        }
    }

    pub fn try_acquire(&self, flight: FlightKey, now: i64, expected_duration: i64) -> bool {
        let mut state = self.state.lock().expect("lock poisoned");
        if !state.available {
            return false;
        }
        state.available = false;
        state.assigned_flight = Some(flight);
        state.assignment_time = now;
        state.expected_duration = expected_duration;
        true
    }

    pub fn release(&self) {
        let mut state = self.state.lock().expect("lock poisoned");
        state.available = true;
        state.assigned_flight = None;
        state.assignment_time = 0;
        state.expected_duration = 0;
    }

    pub fn is_available(&self) -> bool {
        self.state.lock().expect("lock poisoned").available
    }

    pub fn assigned_flight(&self) -> Option<FlightKey> {
        self.state.lock().expect("lock poisoned").assigned_flight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn acquire_is_exclusive_until_release() {
        let mut map: SlotMap<FlightKey, ()> = SlotMap::with_key();
        let a = map.insert(());
        let b = map.insert(());

        let truck = Vehicle::new(0, VehicleKind::FuelTruck);
        assert!(truck.try_acquire(a, 100, 300));
        assert!(!truck.try_acquire(b, 101, 300));
        assert_eq!(truck.assigned_flight(), Some(a));

        truck.release();
        assert!(truck.try_acquire(b, 102, 300));
    }
}
