use airport_ops_sim::airport::aircraft::WeightClass;
use airport_ops_sim::airport::flight::FlightKey;
use airport_ops_sim::airport::runway::{RunwayPool, WAKE_SEPARATION};
use airport_ops_sim::clock::SimClock;

use slotmap::SlotMap;
use std::sync::Arc;

fn flight_keys(n: usize) -> Vec<FlightKey> {
    let mut map: SlotMap<FlightKey, ()> = SlotMap::with_key();
    (0..n).map(|_| map.insert(())).collect()
}

fn four_runway_pool(clock: &Arc<SimClock>) -> RunwayPool {
    let names = vec!["27L".to_string(), "27R".to_string(), "09L".to_string(), "09R".to_string()];
    RunwayPool::new(&names, Arc::clone(clock), 1)
}

#[test]
fn solo_heavy_landing_uses_runway_zero() {
    // Scenario 1: four empty runways, one heavy arrival at t=100. The first
    // runway is taken, held through the 90-unit landing, and released with
    // the heavy class on record.
    let clock = Arc::new(SimClock::new());
    let pool = four_runway_pool(&clock);
    let keys = flight_keys(1);

    clock.set(100);
    let runway = pool.allocate(keys[0], WeightClass::Heavy, "BA100").expect("empty pool must grant a runway");
    assert_eq!(runway, 0);
    assert_eq!(pool.available_count(), 3);

    clock.set(190);
    pool.release(runway, 190);
    assert_eq!(pool.available_count(), 4);

    let (last_time, last_class) = pool.get(0).unwrap().last_departure();
    assert_eq!(last_time, 190);
    assert_eq!(last_class, WeightClass::Heavy);
}

#[test]
fn light_successor_waits_out_heavy_wake() {
    // Scenario 2: a light jet asks for the runway one unit after a heavy
    // released it. HEAVY -> LIGHT separation is 180, so the request must not
    // succeed until t >= 190 + 180.
    let clock = Arc::new(SimClock::new());
    let pool = four_runway_pool(&clock);
    let keys = flight_keys(2);

    clock.set(100);
    let runway = pool.allocate(keys[0], WeightClass::Heavy, "BA100").unwrap();
    pool.release(runway, 190);

    clock.set(191);
    let runway_zero = pool.get(0).unwrap();
    assert!(runway_zero.try_reserve(keys[1], WeightClass::Light).is_err(), "separation must hold at t=191");

    let separation = WAKE_SEPARATION[WeightClass::Heavy.index()][WeightClass::Light.index()];
    assert_eq!(separation, 180);

    clock.set(190 + separation);
    runway_zero.try_reserve(keys[1], WeightClass::Light).expect("separation satisfied at t=370");

    let (last_time, _) = runway_zero.last_departure();
    assert!(clock.now() - last_time >= separation, "wake separation invariant");
}

#[test]
fn medium_after_medium_uses_the_shorter_separation() {
    let clock = Arc::new(SimClock::new());
    let pool = four_runway_pool(&clock);
    let keys = flight_keys(2);

    clock.set(1000);
    let runway = pool.allocate(keys[0], WeightClass::Medium, "UA1").unwrap();
    pool.release(runway, 1000);

    // MEDIUM -> MEDIUM is 60: too early at +59, fine at +60.
    clock.set(1059);
    assert!(pool.get(0).unwrap().try_reserve(keys[1], WeightClass::Medium).is_err());
    clock.set(1060);
    assert!(pool.get(0).unwrap().try_reserve(keys[1], WeightClass::Medium).is_ok());
}

#[test]
fn one_slot_per_runway_under_contention() {
    // Eight threads race for one runway; exactly one reservation may win.
    let clock = Arc::new(SimClock::new());
    clock.set(10_000);
    let names = vec!["27L".to_string()];
    let pool = Arc::new(RunwayPool::new(&names, Arc::clone(&clock), 1));
    let keys = flight_keys(8);

    let mut threads = Vec::new();
    for key in keys {
        let pool = Arc::clone(&pool);
        threads.push(std::thread::spawn(move || pool.allocate(key, WeightClass::Medium, "RACE").is_some()));
    }

    let winners: usize = threads.into_iter().map(|t| t.join().unwrap() as usize).sum();
    assert_eq!(winners, 1);
    assert_eq!(pool.available_count(), 0);
    assert!(pool.get(0).unwrap().current_flight().is_some());
}

#[test]
fn reserve_release_leaves_pool_reusable() {
    // Round-trip property: after reserve + release the pool serves the next
    // request the same way, modulo the recorded departure time.
    let clock = Arc::new(SimClock::new());
    let pool = four_runway_pool(&clock);
    let keys = flight_keys(2);

    clock.set(500);
    let first = pool.allocate(keys[0], WeightClass::Medium, "UA1").unwrap();
    pool.release(first, 500);

    clock.set(560);
    let second = pool.allocate(keys[1], WeightClass::Medium, "UA2").unwrap();
    assert_eq!(first, second);
    assert_eq!(pool.get(second).unwrap().current_flight(), Some(keys[1]));
}
