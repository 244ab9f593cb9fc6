use airport_ops_sim::airport::aircraft::AircraftType;
use airport_ops_sim::airport::flight::FlightType;
use airport_ops_sim::config::SimulationConfig;
use airport_ops_sim::crisis::WeatherSeverity;
use airport_ops_sim::engine::SimulationEngine;

use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

fn wait_until(deadline: Duration, mut done: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if done() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    false
}

#[test]
fn single_flight_completes_the_full_lifecycle() {
    let mut engine = SimulationEngine::new(SimulationConfig::fast());
    engine.initialize().unwrap();
    let core = engine.core();

    let mut rng = StdRng::seed_from_u64(42);
    core.schedule_flight("AA100", AircraftType::B777, FlightType::International, 1, 400, &mut rng);

    engine.start();
    let finished = wait_until(Duration::from_secs(120), || {
        core.counters.total_flights_handled.load(Ordering::SeqCst) == 1
    });
    engine.stop();

    assert!(finished, "flight did not complete its lifecycle in time");

    // The flight was freed and every resource returned.
    assert!(core.flights.is_empty());
    assert_eq!(core.counters.active_flights.load(Ordering::SeqCst), 0);
    assert_eq!(core.runways.available_count(), core.runways.len());
    assert_eq!(core.gates.available_count(), core.gates.len());
    assert_eq!(core.counters.diverted_flights.load(Ordering::SeqCst), 0);

    // The accountant heard about the landing and the passengers.
    let totals = core.costs.totals();
    assert!(totals.landing_fees > 0.0);
    assert!(totals.passengers > 0);

    // Lifecycle phases touched flight pages, so the TLB saw traffic.
    assert!(core.tlb.misses() > 0);

    // Scheduler ran every phase operation of the single flight.
    let stats = core.scheduler.stats();
    assert!(stats.completed >= 8, "expected all phase operations to complete, got {}", stats.completed);
}

#[test]
fn severe_weather_forces_three_go_arounds_then_diversion() {
    // Scenario 6: severe weather before arrival. The flight never gets a
    // runway, burns the go-around fuel penalty three times and diverts with
    // no runway or gate allocation on record.
    let config = SimulationConfig::fast();
    let go_around_gallons = config.go_around_fuel_gallons;

    let mut engine = SimulationEngine::new(config);
    engine.initialize().unwrap();
    let core = engine.core();

    // Severe weather for the whole test window.
    core.crisis.report_weather(WeatherSeverity::Severe, 0, 1_000_000);

    let mut rng = StdRng::seed_from_u64(7);
    core.schedule_flight("LH777", AircraftType::A380, FlightType::International, 1, 400, &mut rng);

    engine.start();
    let diverted = wait_until(Duration::from_secs(60), || {
        core.counters.diverted_flights.load(Ordering::SeqCst) == 1
    });
    engine.stop();

    assert!(diverted, "flight should have diverted under severe weather");
    assert_eq!(core.counters.total_go_arounds.load(Ordering::SeqCst), 3);
    assert_eq!(core.counters.total_flights_handled.load(Ordering::SeqCst), 0);

    // No runway or gate was ever held.
    assert_eq!(core.runways.available_count(), core.runways.len());
    assert_eq!(core.gates.available_count(), core.gates.len());

    // Three go-arounds worth of fuel penalties were charged.
    let totals = core.costs.totals();
    let expected_fuel_cost = 3.0 * go_around_gallons * 3.5;
    assert!((totals.fuel - expected_fuel_cost).abs() < 1e-6, "fuel cost {} != {}", totals.fuel, expected_fuel_cost);
}

#[test]
fn ground_stop_blocks_runway_requests_like_weather() {
    let mut engine = SimulationEngine::new(SimulationConfig::fast());
    engine.initialize().unwrap();
    let core = engine.core();

    core.crisis.set_ground_stop(true);

    let mut rng = StdRng::seed_from_u64(8);
    core.schedule_flight("EK9", AircraftType::B737, FlightType::Domestic, 1, 300, &mut rng);

    engine.start();
    let diverted = wait_until(Duration::from_secs(60), || {
        core.counters.diverted_flights.load(Ordering::SeqCst) == 1
    });
    engine.stop();

    assert!(diverted);
    assert_eq!(core.counters.total_flights_handled.load(Ordering::SeqCst), 0);
}

#[test]
fn two_flights_share_the_airport_without_deadlock() {
    let mut engine = SimulationEngine::new(SimulationConfig::fast());
    engine.initialize().unwrap();
    let core = engine.core();

    let mut rng = StdRng::seed_from_u64(9);
    core.schedule_flight("AA1", AircraftType::B777, FlightType::International, 1, 500, &mut rng);
    core.schedule_flight("UA2", AircraftType::A320, FlightType::Domestic, 5, 500, &mut rng);

    engine.start();
    let finished = wait_until(Duration::from_secs(240), || {
        core.counters.total_flights_handled.load(Ordering::SeqCst) == 2
    });
    engine.stop();

    assert!(finished, "both lifecycles must finish");
    assert!(core.flights.is_empty());
    assert_eq!(core.runways.available_count(), core.runways.len());
    assert_eq!(core.gates.available_count(), core.gates.len());
}
