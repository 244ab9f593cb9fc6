use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use crate::airport::aircraft::WeightClass;
use crate::airport::flight::FlightKey;
use crate::clock::SimClock;
use crate::error::{Error, Result};

/// Wake turbulence separation matrix in simulated seconds,
/// indexed `[leading][trailing]` by `WeightClass::index`.
pub const WAKE_SEPARATION: [[i64; 3]; 3] = [
    // trailing: HEAVY MEDIUM LIGHT
    /* HEAVY  */ [90, 120, 180],
    /* MEDIUM */ [60, 60, 90],
    /* LIGHT  */ [60, 60, 60],
];

#[derive(Debug)]
struct RunwayState {
    available: bool,
    current_flight: Option<FlightKey>,
    current_class: WeightClass,
    last_departure_time: i64,
    last_class: WeightClass,
}

/// One independently reservable runway. Reservation honours the wake
/// separation left behind by the previous user; waiters block on the
/// runway's condvar only for the separation timer, never on another flight.
#[derive(Debug)]
pub struct Runway {
    pub id: usize,
    pub name: String,
    state: Mutex<RunwayState>,
    runway_clear: Condvar,
    clock: Arc<SimClock>,
    wait_ms_per_unit: u64,
}

impl Runway {
    pub fn new(id: usize, name: impl Into<String>, clock: Arc<SimClock>, wait_ms_per_unit: u64) -> Self {
        Runway {
            id,
            name: name.into(),
            state: Mutex::new(RunwayState {
                available: true,
                current_flight: None,
                current_class: WeightClass::Light,
                last_departure_time: 0,
                last_class: WeightClass::Light,
            }),
            runway_clear: Condvar::new(),
            clock,
            wait_ms_per_unit,
        }
    }

    /// Attempts to reserve the runway for `flight`. If the wake separation
    /// left by the previous aircraft has not elapsed, blocks up to the
    /// remaining separation; expiry without availability is one retry
    /// failure for the caller.
    pub fn try_reserve(&self, flight: FlightKey, class: WeightClass) -> Result<()> {
        let mut state = self.state.lock().expect("lock poisoned");

        if !state.available {
            return Err(Error::NoRunwayAvailable(format!("runway {} occupied", self.name)));
        }

        let required = WAKE_SEPARATION[state.last_class.index()][class.index()];
        let elapsed = self.clock.now() - state.last_departure_time;

        if elapsed < required {
            let wait = Duration::from_millis((required - elapsed).max(1) as u64 * self.wait_ms_per_unit.max(1));
            let (next, _result) = self.runway_clear.wait_timeout(state, wait).expect("lock poisoned");
            state = next;

            // Re-check both conditions against a fresh clock reading: someone
            // may have taken the runway, or the separation may still stand.
            let still_separated = self.clock.now() - state.last_departure_time
                < WAKE_SEPARATION[state.last_class.index()][class.index()];
            if !state.available || still_separated {
                return Err(Error::SeparationWaitElapsed(self.id));
            }
        }

        state.available = false;
        state.current_flight = Some(flight);
        state.current_class = class;
        Ok(())
    }

    /// Releases the runway, recording departure time and the weight class of
    /// the leaving aircraft for the next user's separation, then wakes all
    /// separation waiters.
    pub fn release(&self, now: i64) {
        let mut state = self.state.lock().expect("lock poisoned");
        state.last_class = state.current_class;
        state.last_departure_time = now;
        state.available = true;
        state.current_flight = None;
        self.runway_clear.notify_all();
    }

    pub fn is_available(&self) -> bool {
        self.state.lock().expect("lock poisoned").available
    }

    pub fn current_flight(&self) -> Option<FlightKey> {
        self.state.lock().expect("lock poisoned").current_flight
    }

    pub fn last_departure(&self) -> (i64, WeightClass) {
        let state = self.state.lock().expect("lock poisoned");
        (state.last_departure_time, state.last_class)
    }
}

/// Scans runways for an available one (cheap check) and hands off to the
/// per-runway reservation. Losing the race reports "no runway"; the
/// lifecycle task retries on its own budget.
#[derive(Debug)]
pub struct RunwayPool {
    runways: Vec<Arc<Runway>>,
}

impl RunwayPool {
    pub fn new(names: &[String], clock: Arc<SimClock>, wait_ms_per_unit: u64) -> Self {
        let runways = names
            .iter()
            .enumerate()
            .map(|(id, name)| Arc::new(Runway::new(id, name.clone(), Arc::clone(&clock), wait_ms_per_unit)))
            .collect();
        RunwayPool { runways }
    }

    pub fn allocate(&self, flight: FlightKey, class: WeightClass, flight_id: &str) -> Option<usize> {
        let candidate = self.runways.iter().find(|r| r.is_available())?;

        match candidate.try_reserve(flight, class) {
            Ok(()) => {
                log::info!(target: "resources", "Flight {} allocated runway {}", flight_id, candidate.name);
                Some(candidate.id)
            }
            Err(e) => {
                log::debug!(target: "resources", "Flight {} lost runway {}: {}", flight_id, candidate.name, e);
                None
            }
        }
    }

    pub fn release(&self, runway_id: usize, now: i64) {
        if let Some(runway) = self.runways.get(runway_id) {
            runway.release(now);
            log::info!(target: "resources", "Runway {} released at {}", runway.name, now);
        }
    }

    pub fn get(&self, runway_id: usize) -> Option<&Arc<Runway>> {
        self.runways.get(runway_id)
    }

    pub fn len(&self) -> usize {
        self.runways.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runways.is_empty()
    }

    pub fn available_count(&self) -> usize {
        self.runways.iter().filter(|r| r.is_available()).count()
    }
}
