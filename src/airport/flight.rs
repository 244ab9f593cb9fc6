use rand::Rng;
use slotmap::{SlotMap, new_key_type};
use std::sync::{Arc, RwLock};

use crate::airport::aircraft::Aircraft;

new_key_type! {
    /// Stable arena key for a flight. Everyone except the owning lifecycle
    /// task passes keys around and looks the flight up in the store.
    pub struct FlightKey;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightType {
    Domestic,
    International,
}

/// Status values in lifecycle order. Transitions are monotone except for the
/// `GoAround` retry arc between `Approaching` and `Landing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightStatus {
    Scheduled,
    Approaching,
    GoAround,
    Landing,
    TaxiingToGate,
    AtGate,
    Servicing,
    Boarding,
    TaxiingToRunway,
    Departing,
    Departed,
}

impl FlightStatus {
    pub fn name(self) -> &'static str {
        match self {
            FlightStatus::Scheduled => "SCHEDULED",
            FlightStatus::Approaching => "APPROACHING",
            FlightStatus::GoAround => "GO_AROUND",
            FlightStatus::Landing => "LANDING",
            FlightStatus::TaxiingToGate => "TAXIING_TO_GATE",
            FlightStatus::AtGate => "AT_GATE",
            FlightStatus::Servicing => "SERVICING",
            FlightStatus::Boarding => "BOARDING",
            FlightStatus::TaxiingToRunway => "TAXIING_TO_RUNWAY",
            FlightStatus::Departing => "DEPARTING",
            FlightStatus::Departed => "DEPARTED",
        }
    }
}

#[derive(Debug)]
pub struct Flight {
    pub flight_id: String,
    pub aircraft: Aircraft,
    pub flight_type: FlightType,
    pub status: FlightStatus,

    pub scheduled_arrival_time: i64,
    pub actual_arrival_time: i64,
    pub scheduled_departure_time: i64,
    pub actual_departure_time: i64,

    pub passenger_count: u32,
    pub connecting_passengers: u32,
    pub reserve_fuel_minutes: u32,

    /// Lower number = more urgent. 0 emergency, 50 normal, 60 cargo, 80 private.
    pub priority: i32,

    pub go_around_count: u32,
    pub assigned_runway_id: Option<usize>,
    pub assigned_gate_id: Option<usize>,
}

impl Flight {
    pub fn new(
        flight_id: impl Into<String>,
        aircraft: Aircraft,
        flight_type: FlightType,
        scheduled_arrival_time: i64,
        scheduled_departure_time: i64,
        rng: &mut impl Rng,
    ) -> Self {
        // 70-100% load factor, 15% of it connecting
        let passenger_count = aircraft.passenger_capacity * rng.random_range(70..=100) / 100;
        let connecting_passengers = passenger_count * 15 / 100;
        let reserve_fuel_minutes = rng.random_range(30..=60);

        let priority = if aircraft.is_emergency {
            0
        } else if aircraft.is_cargo {
            60
        } else if aircraft.is_private {
            80
        } else {
            50
        };

        Flight {
            flight_id: flight_id.into(),
            aircraft,
            flight_type,
            status: FlightStatus::Scheduled,
            scheduled_arrival_time,
            actual_arrival_time: 0,
            scheduled_departure_time,
            actual_departure_time: 0,
            passenger_count,
            connecting_passengers,
            reserve_fuel_minutes,
            priority,
            go_around_count: 0,
            assigned_runway_id: None,
            assigned_gate_id: None,
        }
    }

    /// Emergency either by aircraft tag or by running low on reserve fuel.
    pub fn is_emergency(&self) -> bool {
        self.aircraft.is_emergency || self.reserve_fuel_minutes < 15
    }

    pub fn needs_international_gate(&self) -> bool {
        self.flight_type == FlightType::International
    }
}

/// Arena of live flights. A lifecycle task holds the owning handle; all other
/// components hold `FlightKey`s and look up here.
#[derive(Debug, Default)]
pub struct FlightStore {
    inner: RwLock<SlotMap<FlightKey, Arc<RwLock<Flight>>>>,
}

impl FlightStore {
    pub fn new() -> Self {
        FlightStore { inner: RwLock::new(SlotMap::with_key()) }
    }

    pub fn add(&self, flight: Flight) -> FlightKey {
        let mut guard = self.inner.write().expect("lock poisoned");
        guard.insert(Arc::new(RwLock::new(flight)))
    }

    pub fn get(&self, key: FlightKey) -> Option<Arc<RwLock<Flight>>> {
        let guard = self.inner.read().expect("lock poisoned");
        guard.get(key).cloned()
    }

    /// Removes the flight from the arena. The lifecycle task calls this as
    /// its very last step; outstanding `Arc`s keep the record alive until
    /// the final reader drops it.
    pub fn remove(&self, key: FlightKey) {
        let mut guard = self.inner.write().expect("lock poisoned");
        guard.remove(key);
    }

    pub fn len(&self) -> usize {
        let guard = self.inner.read().expect("lock poisoned");
        guard.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all live flight handles, for metrics and invariant checks.
    pub fn snapshot(&self) -> Vec<(FlightKey, Arc<RwLock<Flight>>)> {
        let guard = self.inner.read().expect("lock poisoned");
        guard.iter().map(|(k, v)| (k, Arc::clone(v))).collect()
    }
}
