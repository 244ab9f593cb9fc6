use slotmap::Key;
use std::sync::atomic::Ordering;
use std::sync::{Arc, RwLock};
use std::thread::JoinHandle;

use crate::airport::flight::{Flight, FlightKey, FlightStatus};
use crate::engine::EngineCore;
use crate::error::{Error, Result};
use crate::resources::vehicle::{Vehicle, VehicleKind};
use crate::scheduling::operation::{FlightFacts, OpHandle, OperationType};

/// On-time means turning the aircraft around within this many units.
const ON_TIME_TURNAROUND: i64 = 120;

/// The ground services performed at the gate, in acquisition order.
const GATE_SERVICES: [(VehicleKind, OperationType); 4] = [
    (VehicleKind::FuelTruck, OperationType::Refueling),
    (VehicleKind::Catering, OperationType::Catering),
    (VehicleKind::CleaningCrew, OperationType::Cleaning),
    (VehicleKind::BaggageCart, OperationType::Baggage),
];

/// Spawns the per-flight lifecycle task. The caller has already counted the
/// flight as active; this thread owns the flight from here to removal.
pub fn spawn(core: Arc<EngineCore>, key: FlightKey) -> JoinHandle<()> {
    std::thread::Builder::new()
        .name(format!("lifecycle-{:?}", key.data()))
        .spawn(move || run(core, key))
        .expect("failed to spawn lifecycle thread")
}

fn run(core: Arc<EngineCore>, key: FlightKey) {
    let banker_row = core.vehicles.register_flight([1, 1, 1, 1, 1, 1, 1]);

    let outcome = fly(&core, key);

    core.vehicles.unregister_flight(banker_row);
    core.current_ops.lock().expect("lock poisoned").remove(&key);
    core.scheduler.inheritance.restore_for_flight(key);

    match outcome {
        Ok(flight_id) => {
            log::info!(target: "events", "Flight {} lifecycle complete", flight_id);
        }
        Err(Error::Diverted(flight_id, go_arounds)) => {
            core.counters.diverted_flights.fetch_add(1, Ordering::SeqCst);
            log::warn!(target: "events", "Flight {} diverted after {} go-arounds", flight_id, go_arounds);
        }
        Err(Error::Shutdown) => {
            log::info!(target: "events", "Lifecycle exiting on shutdown");
        }
        Err(e) => {
            core.counters.failed_flights.fetch_add(1, Ordering::SeqCst);
            log::warn!(target: "events", "Lifecycle failed: {}", e);
        }
    }

    // Free the flight; the failure of one lifecycle never touches another.
    core.flights.remove(key);
    core.counters.active_flights.fetch_sub(1, Ordering::SeqCst);
}

/// The ten-phase lifecycle. Any error unwinds to `run`, which does the
/// bookkeeping; resources acquired here are released on every path that
/// can still reach them.
fn fly(core: &Arc<EngineCore>, key: FlightKey) -> Result<String> {
    let Some(flight) = core.flights.get(key) else {
        return Err(Error::QueueEmpty);
    };

    // Phase 1: approach.
    let facts = {
        let mut guard = flight.write().expect("lock poisoned");
        guard.status = FlightStatus::Approaching;
        FlightFacts::of(key, &guard)
    };
    log::info!(target: "events", "Flight {} approaching", facts.flight_id);
    touch_page(core, key, 0);

    // Phase 2: runway request with go-around and diversion.
    let runway_id = request_runway_with_go_arounds(core, key, &flight, &facts)?;

    // Phase 3: landing.
    set_status(&flight, FlightStatus::Landing);
    {
        let mut guard = flight.write().expect("lock poisoned");
        guard.assigned_runway_id = Some(runway_id);
    }
    execute_operation(core, key, &facts, OperationType::Landing)?;
    let arrival = core.clock.now();
    {
        let mut guard = flight.write().expect("lock poisoned");
        guard.actual_arrival_time = arrival;
    }

    // Phase 4: runway release; the pool records it for wake separation.
    core.runways.release(runway_id, core.clock.now());
    {
        let mut guard = flight.write().expect("lock poisoned");
        guard.assigned_runway_id = None;
    }

    // Phase 5: taxi to gate.
    set_status(&flight, FlightStatus::TaxiingToGate);
    touch_page(core, key, 1);
    execute_operation(core, key, &facts, OperationType::Taxiing)?;

    // Phase 6: gate request. Persistent failure fails the flight.
    let gate_id = request_gate(core, key, &facts)?;
    {
        let mut guard = flight.write().expect("lock poisoned");
        guard.status = FlightStatus::AtGate;
        guard.assigned_gate_id = Some(gate_id);
    }
    let gate_acquired_at = core.clock.now();

    // Phase 7: at-gate servicing, serialized by acquisition order.
    set_status(&flight, FlightStatus::Servicing);
    touch_page(core, key, 2);
    let gpu = acquire_vehicle(core, key, VehicleKind::GroundPowerUnit, 1800);
    if gpu.is_none() {
        core.counters.service_failures.fetch_add(1, Ordering::SeqCst);
        log::warn!(target: "resources", "Flight {} servicing without ground power", facts.flight_id);
    }

    for (kind, op_type) in GATE_SERVICES {
        match acquire_vehicle(core, key, kind, op_type.profile().1) {
            Some(vehicle) => {
                let result = execute_operation(core, key, &facts, op_type);
                core.vehicles.release_vehicle(&vehicle);
                result?;
                if kind == VehicleKind::FuelTruck {
                    let gallons = f64::from(aircraft_fuel_gallons(&flight)) * 0.4;
                    core.costs.record_fuel(gallons);
                }
            }
            None => {
                core.counters.service_failures.fetch_add(1, Ordering::SeqCst);
                log::warn!(target: "resources", "Flight {} skipped {} ({} unavailable)", facts.flight_id, op_type, kind);
            }
        }
    }

    // Phase 7b: boarding; remote stands need a bus run.
    set_status(&flight, FlightStatus::Boarding);
    touch_page(core, key, 3);
    let bus = if gate_has_jetbridge(core, gate_id) { None } else { acquire_vehicle(core, key, VehicleKind::Bus, 1200) };
    let boarding_result = execute_operation(core, key, &facts, OperationType::Boarding);
    if let Some(bus) = bus {
        core.vehicles.release_vehicle(&bus);
    }
    boarding_result?;

    // Phase 8: pushback. Tug first, then power down, then free the gate.
    let tug = acquire_vehicle(core, key, VehicleKind::Tug, 180);
    if let Some(gpu) = gpu {
        core.vehicles.release_vehicle(&gpu);
    }

    core.gates.release(gate_id);
    core.scheduler.inheritance.restore_for_flight(key);
    {
        let mut guard = flight.write().expect("lock poisoned");
        guard.assigned_gate_id = None;
        guard.status = FlightStatus::TaxiingToRunway;
    }
    let gate_hours = (core.clock.now() - gate_acquired_at) as f64 / 3600.0;
    core.costs.record_gate(gate_hours);

    let pushback_result = execute_operation(core, key, &facts, OperationType::GateDeparture);
    if let Some(tug) = tug {
        core.vehicles.release_vehicle(&tug);
    }
    pushback_result?;

    // Phase 9: departure and on-time classification.
    set_status(&flight, FlightStatus::Departing);
    touch_page(core, key, 4);
    execute_operation(core, key, &facts, OperationType::Takeoff)?;

    let departure = core.clock.now();
    let (turnaround, scheduled_departure) = {
        let mut guard = flight.write().expect("lock poisoned");
        guard.actual_departure_time = departure;
        guard.status = FlightStatus::Departed;
        (departure - guard.actual_arrival_time, guard.scheduled_departure_time)
    };

    // Phase 10: bookkeeping.
    core.counters.total_flights_handled.fetch_add(1, Ordering::SeqCst);
    core.counters.total_turnaround_time.fetch_add(turnaround, Ordering::SeqCst);
    if turnaround <= ON_TIME_TURNAROUND {
        core.counters.on_time_flights.fetch_add(1, Ordering::SeqCst);
    } else {
        core.counters.delayed_flights.fetch_add(1, Ordering::SeqCst);
    }

    let (weight_tons, international, passengers) = {
        let guard = flight.read().expect("lock poisoned");
        (
            guard.aircraft.weight_class.landing_weight_tons(),
            guard.needs_international_gate(),
            guard.passenger_count,
        )
    };
    core.costs.record_landing(weight_tons, international);
    core.costs.record_passengers(passengers);
    let delay_minutes = (departure - scheduled_departure).max(0) as f64 / 60.0;
    if delay_minutes > 0.0 {
        core.costs.record_delay(delay_minutes, passengers);
    }

    log::info!(target: "performance", "Flight {} departed, turnaround {}s", facts.flight_id, turnaround);
    Ok(facts.flight_id.clone())
}

/// Phase 2 loop: bounded runway polling, go-arounds on capacity or weather,
/// diversion when the go-around budget is spent.
fn request_runway_with_go_arounds(
    core: &Arc<EngineCore>,
    key: FlightKey,
    flight: &Arc<RwLock<Flight>>,
    facts: &FlightFacts,
) -> Result<usize> {
    let class = flight.read().expect("lock poisoned").aircraft.weight_class;
    let mut go_arounds = 0u32;

    loop {
        if !core.is_running() {
            return Err(Error::Shutdown);
        }

        let now = core.clock.now();
        let weather_blocked = core.crisis.severity(now) >= crate::crisis::WeatherSeverity::Severe || core.crisis.ground_stop(now);

        let mut acquired = None;
        if !weather_blocked {
            for _attempt in 0..core.config.retry_attempts {
                if let Some(id) = core.runways.allocate(key, class, &facts.flight_id) {
                    acquired = Some(id);
                    break;
                }
                if !core.sleep_wall(core.config.retry_interval_ms) {
                    return Err(Error::Shutdown);
                }
            }
        }

        if let Some(id) = acquired {
            return Ok(id);
        }

        go_arounds += 1;
        {
            let mut guard = flight.write().expect("lock poisoned");
            guard.status = FlightStatus::GoAround;
            guard.go_around_count = go_arounds;
        }
        core.counters.total_go_arounds.fetch_add(1, Ordering::SeqCst);
        core.costs.record_fuel(core.config.go_around_fuel_gallons);
        log::warn!(
            target: "events",
            "Flight {} go-around {} ({})",
            facts.flight_id,
            go_arounds,
            if weather_blocked { "weather" } else { "no runway" }
        );

        if go_arounds >= core.config.max_go_arounds {
            return Err(Error::Diverted(facts.flight_id.clone(), go_arounds));
        }

        core.clock.sleep_sim(core.config.go_around_penalty_units, core.config.tick_interval_ms, &core.running);
    }
}

/// Phase 6: the gate request rides on the GATE_ARRIVAL operation. If no gate
/// is free the operation blocks (running -> blocked), the gate holder
/// inherits the waiter's priority, and the poll runs on a bounded budget.
fn request_gate(core: &Arc<EngineCore>, key: FlightKey, facts: &FlightFacts) -> Result<usize> {
    let (aircraft_type, needs_international) = {
        let flight = core.flights.get(key).ok_or(Error::QueueEmpty)?;
        let guard = flight.read().expect("lock poisoned");
        (guard.aircraft.aircraft_type, guard.needs_international_gate())
    };

    let op = start_operation(core, key, facts, OperationType::GateArrival)?;

    let mut gate_id = core.gates.allocate(key, aircraft_type, needs_international, &facts.flight_id);
    if gate_id.is_none() {
        core.scheduler.block(&op);
        boost_gate_holder(core, aircraft_type, needs_international, &op);

        for _attempt in 0..core.config.retry_attempts {
            if !core.sleep_wall(core.config.retry_interval_ms) {
                return Err(Error::Shutdown);
            }
            gate_id = core.gates.allocate(key, aircraft_type, needs_international, &facts.flight_id);
            if gate_id.is_some() {
                break;
            }
        }

        let Some(_) = gate_id else {
            core.scheduler.complete(&op);
            return Err(Error::NoGateAvailable(facts.flight_id.clone()));
        };

        core.scheduler.unblock(&op);
        if !core.scheduler.wait_dispatched(&op, &core.running) {
            return Err(Error::Shutdown);
        }
    }

    run_operation_slices(core, &op)?;
    Ok(gate_id.expect("gate id checked above"))
}

/// Applies priority inheritance to whoever holds the first gate this
/// aircraft could use.
fn boost_gate_holder(core: &Arc<EngineCore>, aircraft_type: crate::airport::aircraft::AircraftType, needs_international: bool, waiter: &OpHandle) {
    let Some(target_gate) = core.gates.first_compatible(aircraft_type, needs_international) else {
        return;
    };
    let Some(holder_key) = core.gates.holder(target_gate) else {
        return;
    };
    let holder_op = {
        let current = core.current_ops.lock().expect("lock poisoned");
        current.get(&holder_key).cloned()
    };
    if let Some(holder_op) = holder_op {
        let waiter_guard = waiter.read().expect("lock poisoned");
        core.scheduler.inheritance.apply(&holder_op, &waiter_guard);
    }
}

/// Creates and enqueues the operation for a phase, then waits for dispatch.
fn start_operation(core: &Arc<EngineCore>, key: FlightKey, facts: &FlightFacts, op_type: OperationType) -> Result<OpHandle> {
    let op = core.scheduler.create_operation(facts.clone(), op_type, core.clock.now());
    core.current_ops.lock().expect("lock poisoned").insert(key, Arc::clone(&op));
    core.scheduler.enqueue(&op);

    if !core.scheduler.wait_dispatched(&op, &core.running) {
        if op.read().expect("lock poisoned").is_completed {
            return Ok(op);
        }
        return Err(Error::Shutdown);
    }
    Ok(op)
}

/// Runs the operation to completion in quantum-sized slices: consume
/// min(quantum, remaining) simulated units, then complete or go back to the
/// ready queue and wait to be dispatched again.
fn run_operation_slices(core: &Arc<EngineCore>, op: &OpHandle) -> Result<()> {
    loop {
        {
            let guard = op.read().expect("lock poisoned");
            if guard.is_completed {
                return Ok(());
            }
            if !guard.is_running {
                drop(guard);
                if !core.scheduler.wait_dispatched(op, &core.running) {
                    return Err(Error::Shutdown);
                }
            }
        }

        let slice = {
            let mut guard = op.write().expect("lock poisoned");
            let quantum = core.scheduler.quantum.quantum_for(&guard);
            guard.quantum_compensation = 0; // consumed on this dispatch
            if quantum == 0 { guard.remaining_time } else { quantum.min(guard.remaining_time) }
        };

        core.clock.sleep_sim(slice, core.config.tick_interval_ms, &core.running);
        if !core.is_running() {
            return Err(Error::Shutdown);
        }

        let (finished, still_running) = {
            let mut guard = op.write().expect("lock poisoned");
            guard.remaining_time -= slice;
            (guard.remaining_time <= 0, guard.is_running)
        };

        if finished {
            core.scheduler.complete(op);
            return Ok(());
        }
        if still_running {
            core.scheduler.yield_quantum(op);
        }
        // Preempted mid-slice: already demoted and re-queued; loop waits.
    }
}

fn execute_operation(core: &Arc<EngineCore>, key: FlightKey, facts: &FlightFacts, op_type: OperationType) -> Result<()> {
    let op = start_operation(core, key, facts, op_type)?;
    run_operation_slices(core, &op)
}

/// Bounded vehicle poll on the single-vehicle path. Returns None when the
/// budget runs out; the caller decides whether that degrades or fails.
fn acquire_vehicle(core: &Arc<EngineCore>, key: FlightKey, kind: VehicleKind, duration: i64) -> Option<Arc<Vehicle>> {
    for _attempt in 0..core.config.retry_attempts {
        if let Some(vehicle) = core.vehicles.allocate(kind, key, core.clock.now(), duration) {
            log::debug!(target: "resources", "{} assigned", vehicle.name);
            return Some(vehicle);
        }
        if !core.sleep_wall(core.config.retry_interval_ms) {
            return None;
        }
    }
    None
}

fn set_status(flight: &Arc<RwLock<Flight>>, status: FlightStatus) {
    let mut guard = flight.write().expect("lock poisoned");
    log::debug!(target: "events", "Flight {}: {} -> {}", guard.flight_id, guard.status.name(), status.name());
    guard.status = status;
}

fn gate_has_jetbridge(core: &Arc<EngineCore>, gate_id: usize) -> bool {
    core.gates.get(gate_id).map(|g| g.has_jetbridge).unwrap_or(true)
}

fn aircraft_fuel_gallons(flight: &Arc<RwLock<Flight>>) -> u32 {
    flight.read().expect("lock poisoned").aircraft.fuel_capacity_gallons
}

/// Per-flight page walk for the TLB surface: a handful of pages per flight,
/// revisited across phases.
fn touch_page(core: &Arc<EngineCore>, key: FlightKey, phase: u64) {
    let base = key.data().as_ffi() % 256;
    core.tlb.access(base * 8 + phase);
}
