use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::airport::aircraft::{Aircraft, AircraftType};
use crate::airport::flight::{Flight, FlightKey, FlightStatus, FlightStore, FlightType};
use crate::airport::gate::GatePool;
use crate::airport::runway::RunwayPool;
use crate::clock::SimClock;
use crate::config::SimulationConfig;
use crate::crisis::{CrisisCenter, WeatherSeverity};
use crate::dashboard::{Dashboard, MetricsSnapshot};
use crate::error::Result;
use crate::events::{Event, EventKind, EventQueue};
use crate::finance::CostModel;
use crate::lifecycle;
use crate::memory::Tlb;
use crate::resources::pool::VehiclePool;
use crate::scheduling::operation::OpHandle;
use crate::scheduling::scheduler::HmfqScheduler;

const TLB_ENTRIES: usize = 64;
const AIRLINES: [&str; 10] = ["AA", "UA", "DL", "BA", "LH", "AF", "EK", "SQ", "QF", "CX"];

/// Monotone run counters, exported lock-free to the metrics surface.
#[derive(Debug, Default)]
pub struct Counters {
    pub active_flights: AtomicI64,
    pub total_flights_handled: AtomicI64,
    pub diverted_flights: AtomicI64,
    pub failed_flights: AtomicI64,
    pub on_time_flights: AtomicI64,
    pub delayed_flights: AtomicI64,
    pub total_turnaround_time: AtomicI64,
    pub total_go_arounds: AtomicI64,
    pub service_failures: AtomicI64,
}

/// Everything the workers and lifecycle tasks share. Owned behind one `Arc`
/// by the orchestrator.
#[derive(Debug)]
pub struct EngineCore {
    pub config: SimulationConfig,
    pub clock: Arc<SimClock>,
    pub events: EventQueue,
    pub runways: RunwayPool,
    pub gates: GatePool,
    pub vehicles: VehiclePool,
    pub scheduler: HmfqScheduler,
    pub crisis: CrisisCenter,
    pub costs: CostModel,
    pub tlb: Tlb,
    pub flights: FlightStore,
    pub dashboard: Dashboard,

    /// Each flight's operation currently in the scheduler, for priority
    /// inheritance lookups by waiters.
    pub current_ops: Mutex<HashMap<FlightKey, OpHandle>>,

    pub counters: Counters,
    pub running: AtomicBool,
    next_flight_number: AtomicU64,
    lifecycle_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl EngineCore {
    fn new(config: SimulationConfig) -> Self {
        let clock = Arc::new(SimClock::new());
        let runways = RunwayPool::new(&config.runway_names, Arc::clone(&clock), config.separation_wait_ms_per_unit);
        let gates = GatePool::new(&config.gates);
        let vehicles = VehiclePool::new(&config.vehicles);
        let scheduler = HmfqScheduler::new(config.pis_weights);

        EngineCore {
            clock,
            events: EventQueue::new(),
            runways,
            gates,
            vehicles,
            scheduler,
            crisis: CrisisCenter::new(),
            costs: CostModel::new(),
            tlb: Tlb::new(TLB_ENTRIES),
            flights: FlightStore::new(),
            dashboard: Dashboard::new(),
            current_ops: Mutex::new(HashMap::new()),
            counters: Counters::default(),
            running: AtomicBool::new(false),
            next_flight_number: AtomicU64::new(100),
            lifecycle_handles: Mutex::new(Vec::new()),
            config,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Creates a flight and schedules its arrival event. The flight priority
    /// convention (0 = urgent) is inverted into the event convention
    /// (higher = more urgent) here, at creation time.
    pub fn schedule_flight(
        &self,
        flight_id: impl Into<String>,
        aircraft_type: AircraftType,
        flight_type: FlightType,
        arrival_time: i64,
        departure_time: i64,
        rng: &mut StdRng,
    ) -> FlightKey {
        let flight = Flight::new(flight_id, Aircraft::new(aircraft_type), flight_type, arrival_time, departure_time, rng);
        let event_priority = 100 - flight.priority;
        let flight_id = flight.flight_id.clone();
        let key = self.flights.add(flight);

        self.events.push(Event::new(EventKind::FlightArrival { flight: key }, arrival_time, event_priority));
        log::info!(target: "events", "Scheduled flight {} arrival at {}", flight_id, arrival_time);
        key
    }

    pub fn next_flight_number(&self) -> u64 {
        self.next_flight_number.fetch_add(1, Ordering::SeqCst)
    }

    /// Builds the §6.1 snapshot from counters, pools and the flight store.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        let mut landing = 0;
        let mut at_gates = 0;
        let mut departing = 0;
        for (_, handle) in self.flights.snapshot() {
            let guard = handle.read().expect("lock poisoned");
            match guard.status {
                FlightStatus::Landing => landing += 1,
                FlightStatus::AtGate | FlightStatus::Servicing | FlightStatus::Boarding => at_gates += 1,
                FlightStatus::TaxiingToRunway | FlightStatus::Departing => departing += 1,
                _ => {}
            }
        }

        let handled = self.counters.total_flights_handled.load(Ordering::Relaxed);
        let average_turnaround_seconds = if handled > 0 {
            self.counters.total_turnaround_time.load(Ordering::Relaxed) as f64 / handled as f64
        } else {
            0.0
        };
        let on_time_fraction = if handled > 0 {
            self.counters.on_time_flights.load(Ordering::Relaxed) as f64 / handled as f64
        } else {
            0.0
        };

        MetricsSnapshot {
            current_sim_time: self.clock.now(),
            active_flights: self.counters.active_flights.load(Ordering::Relaxed),
            flights_landing: landing,
            flights_at_gates: at_gates,
            flights_departing: departing,
            available_runways: self.runways.available_count(),
            available_gates: self.gates.available_count(),
            runway_utilization: 1.0 - self.runways.available_count() as f64 / self.runways.len().max(1) as f64,
            gate_utilization: 1.0 - self.gates.available_count() as f64 / self.gates.len().max(1) as f64,
            total_flights_handled: handled,
            average_turnaround_seconds,
            on_time_fraction,
            page_fault_count: self.tlb.misses(),
            page_fault_rate: self.tlb.fault_rate(),
        }
    }

    /// Wall sleep in small steps, bailing out early on shutdown.
    pub fn sleep_wall(&self, ms: u64) -> bool {
        let step = 20;
        let mut remaining = ms;
        while remaining > 0 {
            if !self.is_running() {
                return false;
            }
            let chunk = remaining.min(step);
            std::thread::sleep(Duration::from_millis(chunk));
            remaining -= chunk;
        }
        self.is_running()
    }
}

/// The orchestrator: owns the core and the worker threads.
pub struct SimulationEngine {
    core: Arc<EngineCore>,
    workers: Vec<(&'static str, JoinHandle<()>)>,
}

impl SimulationEngine {
    pub fn new(config: SimulationConfig) -> Self {
        SimulationEngine { core: Arc::new(EngineCore::new(config)), workers: Vec::new() }
    }

    pub fn core(&self) -> Arc<EngineCore> {
        Arc::clone(&self.core)
    }

    /// One-time setup: PIS denominators, quantum ceiling and, when the
    /// generator is on, the initial flight schedule.
    pub fn initialize(&self) -> Result<()> {
        let core = &self.core;
        log::info!(target: "events", "Initializing: {} runways, {} gates, {} vehicles",
            core.runways.len(), core.gates.len(), core.vehicles.total_fleet_size());

        let resource_total = core.runways.len() + core.gates.len() + core.vehicles.total_fleet_size();
        core.scheduler.pis.set_total_resources(resource_total as i64);
        core.scheduler.quantum.set_max_operations(50);

        if core.config.generator.enabled {
            let mut rng = StdRng::seed_from_u64(core.config.seed);
            let initial = [
                ("AA100", AircraftType::B777, FlightType::International, 300, 1800),
                ("UA200", AircraftType::A320, FlightType::Domestic, 600, 2400),
                ("DL300", AircraftType::B737, FlightType::Domestic, 900, 3000),
                ("PVT500", AircraftType::G650, FlightType::Domestic, 1200, 3600),
                ("BA400", AircraftType::A380, FlightType::International, 1500, 4200),
            ];
            for (id, aircraft, flight_type, arrival, departure) in initial {
                core.schedule_flight(id, aircraft, flight_type, arrival, departure, &mut rng);
            }
        }

        log::info!(target: "events", "Initialization complete");
        Ok(())
    }

    /// Starts the worker threads. Order matters only to `stop`, which joins
    /// in reverse.
    pub fn start(&mut self) {
        self.core.running.store(true, Ordering::SeqCst);

        self.spawn_worker("event-dispatcher", event_dispatcher);
        self.spawn_worker("op-dispatch", operation_dispatch);
        self.spawn_worker("metrics-sampler", metrics_sampler);
        if self.core.config.generator.enabled {
            self.spawn_worker("flight-generator", flight_generator);
        }
        if self.core.config.crisis_monitor_enabled {
            self.spawn_worker("crisis-monitor", crisis_monitor);
        }
        self.spawn_worker("clock-driver", clock_driver);

        log::info!(target: "events", "All workers started");
    }

    fn spawn_worker(&mut self, name: &'static str, body: fn(Arc<EngineCore>)) {
        let core = Arc::clone(&self.core);
        let handle = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || body(core))
            .expect("failed to spawn worker thread");
        self.workers.push((name, handle));
    }

    /// Cooperative shutdown: clear the flag, join workers in reverse start
    /// order, then drain lifecycle tasks.
    pub fn stop(&mut self) {
        log::info!(target: "events", "Stopping simulation");
        self.core.running.store(false, Ordering::SeqCst);

        while let Some((name, handle)) = self.workers.pop() {
            if handle.join().is_err() {
                log::error!(target: "events", "Worker {} panicked", name);
            }
        }

        let handles: Vec<JoinHandle<()>> = {
            let mut guard = self.core.lifecycle_handles.lock().expect("lock poisoned");
            guard.drain(..).collect()
        };
        for handle in handles {
            if handle.join().is_err() {
                log::error!(target: "events", "Lifecycle task panicked");
            }
        }

        log::info!(target: "events", "All workers stopped");
    }

    /// Convenience for tests and headless runs: start, let the simulated
    /// clock advance `units`, stop.
    pub fn run_for(&mut self, units: i64) {
        self.start();
        let deadline = self.core.clock.now() + units;
        while self.core.is_running() && self.core.clock.now() < deadline {
            std::thread::sleep(Duration::from_millis(self.core.config.tick_interval_ms.max(1)));
        }
        self.stop();
    }
}

fn clock_driver(core: Arc<EngineCore>) {
    while core.is_running() {
        std::thread::sleep(Duration::from_millis(core.config.tick_interval_ms.max(1)));
        core.clock.advance(1);
    }
}

/// Pops due events and dispatches them. The queue does not gate on time;
/// this loop does.
fn event_dispatcher(core: Arc<EngineCore>) {
    log::info!(target: "events", "Event dispatcher started");
    while core.is_running() {
        let due = match core.events.peek() {
            Some(head) if head.time <= core.clock.now() => core.events.try_pop(),
            _ => None,
        };

        match due {
            Some(event) => {
                if event.time > core.clock.now() {
                    // Lost a race with a nearer event; put it back.
                    core.events.push(event);
                    continue;
                }
                log::info!(target: "events", "Processing {} at {}", event.kind.description(), core.clock.now());
                handle_event(&core, event);
            }
            None => {
                core.sleep_wall(50);
            }
        }
    }
    log::info!(target: "events", "Event dispatcher stopped");
}

fn handle_event(core: &Arc<EngineCore>, event: Event) {
    match event.kind {
        EventKind::FlightArrival { flight } => {
            core.counters.active_flights.fetch_add(1, Ordering::SeqCst);
            let handle = lifecycle::spawn(Arc::clone(core), flight);
            core.lifecycle_handles.lock().expect("lock poisoned").push(handle);
        }
        EventKind::WeatherReport { severity, duration_units } => {
            let now = core.clock.now();
            core.crisis.report_weather(severity, now, duration_units);
            core.scheduler.pis.set_weather(severity.factor(), duration_units);
        }
    }
}

/// The scheduler's decision loop: whenever no operation is current, make a
/// scheduling decision. The chosen operation's lifecycle does the actual
/// work and reports back via complete/yield.
fn operation_dispatch(core: Arc<EngineCore>) {
    while core.is_running() {
        if core.scheduler.has_current() || core.scheduler.dequeue(core.clock.now()).is_none() {
            core.sleep_wall(core.config.tick_interval_ms.max(5));
        }
    }
}

/// Generates a new flight every 2-5 wall seconds while below the admission
/// cap, mirroring approach-control feed rates.
fn flight_generator(core: Arc<EngineCore>) {
    log::info!(target: "events", "Flight generator started");
    let mut rng = StdRng::seed_from_u64(core.config.seed.wrapping_add(1));

    while core.is_running() {
        let delay_s = rng.random_range(core.config.generator.min_delay_s..=core.config.generator.max_delay_s);
        if !core.sleep_wall(delay_s * 1000) {
            break;
        }

        let active = core.counters.active_flights.load(Ordering::SeqCst);
        if active >= core.config.max_active_flights as i64 {
            continue;
        }

        let airline = AIRLINES[rng.random_range(0..AIRLINES.len())];
        let number = core.next_flight_number();
        let flight_id = format!("{}{}", airline, number);
        let aircraft_type = AircraftType::GENERATED[rng.random_range(0..AircraftType::GENERATED.len())];
        let flight_type = if rng.random_bool(0.5) { FlightType::Domestic } else { FlightType::International };

        let now = core.clock.now();
        let arrival_time = now + rng.random_range(5..=30);
        let departure_time = arrival_time + rng.random_range(120..=300);

        core.schedule_flight(flight_id, aircraft_type, flight_type, arrival_time, departure_time, &mut rng);
    }
    log::info!(target: "events", "Flight generator stopped");
}

/// Publishes the metrics snapshot every sampler interval and runs the
/// periodic scheduler housekeeping that hangs off it.
fn metrics_sampler(core: Arc<EngineCore>) {
    let mut last_perf_log = -1;

    while core.is_running() {
        if !core.sleep_wall(core.config.sampler_interval_ms) {
            break;
        }

        let snapshot = core.metrics_snapshot();
        core.dashboard.update(snapshot);
        if core.config.dashboard_enabled {
            core.dashboard.display();
        }

        core.scheduler.pis.set_total_flights(snapshot.active_flights.max(1));
        core.scheduler.quantum.set_active_operations(core.scheduler.pending_operations() as i64);
        core.scheduler.adjust_weights();

        // One performance line per 30 simulated units.
        let interval = snapshot.current_sim_time / 30;
        if interval > last_perf_log && snapshot.total_flights_handled > 0 {
            last_perf_log = interval;
            log::info!(
                target: "performance",
                "Flights {} | avg turnaround {:.1}s | on-time {:.1}%",
                snapshot.total_flights_handled,
                snapshot.average_turnaround_seconds,
                snapshot.on_time_fraction * 100.0
            );
        }
    }
}

/// Random weather feed: roughly every couple of wall seconds there is a
/// modest chance of a new report, injected through the event queue like any
/// other external stimulus.
fn crisis_monitor(core: Arc<EngineCore>) {
    log::info!(target: "events", "Crisis monitor started");
    let mut rng = StdRng::seed_from_u64(core.config.seed.wrapping_add(2));

    while core.is_running() {
        if !core.sleep_wall(2000) {
            break;
        }

        if rng.random_range(0..100) < 20 {
            let severity = match rng.random_range(1..=4) {
                1 => WeatherSeverity::Minor,
                2 => WeatherSeverity::Moderate,
                3 => WeatherSeverity::Severe,
                _ => WeatherSeverity::Extreme,
            };
            let duration_units = 60 + rng.random_range(0..240);
            let now = core.clock.now();
            core.events.push(Event::new(EventKind::WeatherReport { severity, duration_units }, now, 0));
        }
    }
    log::info!(target: "events", "Crisis monitor stopped");
}
