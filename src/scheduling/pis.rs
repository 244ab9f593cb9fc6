use std::sync::Mutex;

use crate::airport::flight::FlightType;
use crate::config::PisWeights;
use crate::scheduling::operation::{Operation, OperationType};

/// Tolerance on the sum-to-one invariant for direct weight updates.
const WEIGHT_SUM_TOLERANCE: f64 = 0.01;

#[derive(Debug)]
struct PisInner {
    weights: PisWeights,

    // System-wide denominators, updated by the engine as load changes.
    total_flights: i64,
    total_connecting_passengers: i64,
    total_resources: i64,

    weather_severity: f64,
    time_window_affected: i64,
    emergency_threshold_minutes: i64,
}

/// Priority Index Score calculator.
///
/// PIS = α·DPF + β·CRF + γ·RUI + δ·WRF + ε·FCF, every factor clamped to
/// [0, 1]. Higher PIS = more urgent. A leaf component: it never calls back
/// into the scheduler while holding its lock.
#[derive(Debug)]
pub struct PisCalculator {
    inner: Mutex<PisInner>,
}

impl PisCalculator {
    pub fn new(weights: PisWeights) -> Self {
        PisCalculator {
            inner: Mutex::new(PisInner {
                weights,
                total_flights: 50,
                total_connecting_passengers: 1000,
                total_resources: 100,
                weather_severity: 0.0,
                time_window_affected: 0,
                emergency_threshold_minutes: 30,
            }),
        }
    }

    pub fn calculate(&self, op: &Operation) -> f64 {
        let inner = self.inner.lock().expect("lock poisoned");

        inner.weights.alpha * delay_propagation(&inner, op)
            + inner.weights.beta * connection_risk(&inner, op)
            + inner.weights.gamma * resource_utilization(&inner, op)
            + inner.weights.delta * weather_risk(&inner, op)
            + inner.weights.epsilon * fuel_criticality(&inner, op)
    }

    /// Replaces the weights iff they sum to 1.0 within tolerance.
    /// Returns whether the update was accepted.
    pub fn update_weights(&self, weights: PisWeights) -> bool {
        let sum = weights.alpha + weights.beta + weights.gamma + weights.delta + weights.epsilon;
        if (sum - 1.0).abs() >= WEIGHT_SUM_TOLERANCE {
            return false;
        }
        let mut inner = self.inner.lock().expect("lock poisoned");
        inner.weights = weights;
        true
    }

    pub fn weights(&self) -> PisWeights {
        self.inner.lock().expect("lock poisoned").weights
    }

    pub fn set_total_flights(&self, count: i64) {
        self.inner.lock().expect("lock poisoned").total_flights = count.max(1);
    }

    pub fn set_total_connecting_passengers(&self, count: i64) {
        self.inner.lock().expect("lock poisoned").total_connecting_passengers = count.max(1);
    }

    pub fn set_total_resources(&self, count: i64) {
        self.inner.lock().expect("lock poisoned").total_resources = count.max(1);
    }

    /// Weather input from the crisis surface: severity in [0, 1] plus the
    /// affected time window in simulated units.
    pub fn set_weather(&self, severity: f64, time_window_affected: i64) {
        let mut inner = self.inner.lock().expect("lock poisoned");
        inner.weather_severity = severity.clamp(0.0, 1.0);
        inner.time_window_affected = time_window_affected.max(0);
    }
}

/// DPF: affected flights over total flights. Emergencies pin the estimate
/// at 10; otherwise delay widens the blast radius faster for international
/// flights than domestic ones.
fn delay_propagation(inner: &PisInner, op: &Operation) -> f64 {
    let affected = if op.facts.is_emergency {
        10
    } else {
        match op.facts.flight_type {
            FlightType::International => 5 + op.wait_time / 60,
            FlightType::Domestic => 2 + op.wait_time / 120,
        }
    };
    (affected as f64 / inner.total_flights as f64).clamp(0.0, 1.0)
}

/// CRF: passengers at risk of missing connections over total connecting.
fn connection_risk(inner: &PisInner, op: &Operation) -> f64 {
    let pax = op.facts.passenger_count as i64;
    let at_risk = if op.wait_time > 90 {
        pax
    } else if op.wait_time > 60 {
        pax / 2
    } else if op.wait_time > 30 {
        pax / 4
    } else {
        0
    };
    (at_risk as f64 / inner.total_connecting_passengers as f64).clamp(0.0, 1.0)
}

/// RUI: resources an operation of this type keeps pinned.
fn resource_utilization(inner: &PisInner, op: &Operation) -> f64 {
    let blocked = match op.op_type {
        OperationType::Landing | OperationType::Takeoff => 10,
        OperationType::GateArrival | OperationType::GateDeparture => 5,
        OperationType::Refueling => 3,
        OperationType::Cleaning | OperationType::Catering => 2,
        _ => 1,
    };
    (blocked as f64 / inner.total_resources as f64).clamp(0.0, 1.0)
}

/// WRF: weather impact, 1.5x for outdoor (runway/taxi) operations.
fn weather_risk(inner: &PisInner, op: &Operation) -> f64 {
    let mut impact = inner.weather_severity;
    if matches!(op.op_type, OperationType::Landing | OperationType::Takeoff | OperationType::Taxiing) {
        impact *= 1.5;
    }
    (impact * inner.time_window_affected as f64 / inner.total_resources as f64).clamp(0.0, 1.0)
}

/// FCF: 1 − (reserve − threshold)/reserve, floored at 0. Low reserve fuel
/// scores high.
fn fuel_criticality(inner: &PisInner, op: &Operation) -> f64 {
    let reserve = op.facts.reserve_fuel_minutes as f64;
    if reserve <= 0.0 {
        return 1.0;
    }
    let factor = (reserve - inner.emergency_threshold_minutes as f64) / reserve;
    (1.0 - factor).clamp(0.0, 1.0)
}
