use std::fmt;
use std::sync::{Arc, RwLock};

use crate::airport::flight::{Flight, FlightKey, FlightType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationType {
    Landing,
    Takeoff,
    Taxiing,
    GateArrival,
    GateDeparture,
    Refueling,
    Cleaning,
    Catering,
    Boarding,
    Baggage,
    Emergency,
}

impl OperationType {
    pub fn name(self) -> &'static str {
        match self {
            OperationType::Landing => "LANDING",
            OperationType::Takeoff => "TAKEOFF",
            OperationType::Taxiing => "TAXIING",
            OperationType::GateArrival => "GATE_ARRIVAL",
            OperationType::GateDeparture => "GATE_DEPARTURE",
            OperationType::Refueling => "REFUELING",
            OperationType::Cleaning => "CLEANING",
            OperationType::Catering => "CATERING",
            OperationType::Boarding => "BOARDING",
            OperationType::Baggage => "BAGGAGE",
            OperationType::Emergency => "EMERGENCY",
        }
    }

    /// Complexity and baseline duration in simulated seconds.
    pub fn profile(self) -> (Complexity, i64) {
        match self {
            OperationType::Taxiing => (Complexity::Simple, 60),
            OperationType::Landing | OperationType::Takeoff => (Complexity::Medium, 90),
            OperationType::Refueling => (Complexity::Medium, 300),
            OperationType::GateArrival | OperationType::GateDeparture => (Complexity::Complex, 180),
            OperationType::Cleaning | OperationType::Catering => (Complexity::Medium, 600),
            OperationType::Boarding | OperationType::Baggage => (Complexity::Complex, 1200),
            OperationType::Emergency => (Complexity::Simple, 30),
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Complexity {
    Simple,
    Medium,
    Complex,
}

/// Snapshot of the flight attributes the scheduler's leaves need. Taken once
/// at operation creation so the PIS calculator, preemption manager and
/// friends never reach into the flight store from under their own locks.
#[derive(Debug, Clone)]
pub struct FlightFacts {
    pub flight: FlightKey,
    pub flight_id: String,
    pub flight_type: FlightType,
    pub passenger_count: u32,
    pub connecting_passengers: u32,
    pub reserve_fuel_minutes: u32,
    pub priority: i32,
    pub is_emergency: bool,
}

impl FlightFacts {
    pub fn of(key: FlightKey, flight: &Flight) -> Self {
        FlightFacts {
            flight: key,
            flight_id: flight.flight_id.clone(),
            flight_type: flight.flight_type,
            passenger_count: flight.passenger_count,
            connecting_passengers: flight.connecting_passengers,
            reserve_fuel_minutes: flight.reserve_fuel_minutes,
            priority: flight.priority,
            is_emergency: flight.is_emergency(),
        }
    }
}

/// The schedulable unit: one lifecycle phase of one flight.
///
/// `is_running`, `is_blocked` and `is_completed` are mutually exclusive;
/// all three false means ready. `completed` is terminal.
#[derive(Debug)]
pub struct Operation {
    pub id: u64,
    pub facts: FlightFacts,
    pub op_type: OperationType,
    pub complexity: Complexity,

    pub arrival_time: i64,
    pub start_time: i64,
    pub total_time: i64,
    pub remaining_time: i64,

    /// MLFQ queue index 0..=4; 0 is the emergency queue.
    pub current_queue: usize,
    pub priority_score: f64,
    pub wait_time: i64,

    pub guaranteed_service: bool,
    pub preemption_count: u32,
    pub quantum_compensation: i64,

    pub is_running: bool,
    pub is_blocked: bool,
    pub is_completed: bool,
}

pub type OpHandle = Arc<RwLock<Operation>>;

impl Operation {
    pub fn new(id: u64, facts: FlightFacts, op_type: OperationType, now: i64) -> Self {
        let (complexity, total_time) = op_type.profile();
        let current_queue = initial_queue(&facts);

        Operation {
            id,
            facts,
            op_type,
            complexity,
            arrival_time: now,
            start_time: 0,
            total_time,
            remaining_time: total_time,
            current_queue,
            priority_score: 0.0,
            wait_time: 0,
            guaranteed_service: false,
            preemption_count: 0,
            quantum_compensation: 0,
            is_running: false,
            is_blocked: false,
            is_completed: false,
        }
    }

    pub fn is_ready(&self) -> bool {
        !self.is_running && !self.is_blocked && !self.is_completed
    }

    pub fn progress(&self) -> f64 {
        if self.total_time <= 0 {
            return 0.0;
        }
        (self.total_time - self.remaining_time) as f64 / self.total_time as f64
    }
}

/// Initial queue placement from flight priority: emergencies to Q0, then
/// priority bands 1..=4.
fn initial_queue(facts: &FlightFacts) -> usize {
    if facts.is_emergency {
        0
    } else if facts.priority <= 20 {
        1
    } else if facts.priority <= 40 {
        2
    } else if facts.priority <= 60 {
        3
    } else {
        4
    }
}
