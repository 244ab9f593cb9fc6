use std::sync::{Arc, Condvar, Mutex};

use crate::airport::flight::FlightKey;
use crate::config::VehicleCounts;
use crate::error::{Error, Result};
use crate::resources::vehicle::{VEHICLE_KIND_COUNT, Vehicle, VehicleKind};

type Demand = [usize; VEHICLE_KIND_COUNT];

#[derive(Debug)]
struct PoolInner {
    /// One vector per kind, indexed by `VehicleKind::index`.
    fleets: Vec<Vec<Arc<Vehicle>>>,
    available: Demand,

    // Banker's tables, one row per registered flight. Unregistered rows are
    // zeroed; a zero-need row is trivially satisfiable in the safety scan.
    max_need: Vec<Demand>,
    allocation: Vec<Demand>,
    need: Vec<Demand>,
}

impl PoolInner {
    /// Banker's safety check: the state is safe iff some completion order
    /// exists in which every flight's remaining need fits into the running
    /// work vector, returning its allocation afterwards.
    fn is_safe_state(&self) -> bool {
        let mut work = self.available;
        let mut finish = vec![false; self.need.len()];

        let mut completed = 0;
        while completed < finish.len() {
            let mut progressed = false;

            for i in 0..finish.len() {
                if finish[i] {
                    continue;
                }
                let fits = (0..VEHICLE_KIND_COUNT).all(|j| self.need[i][j] <= work[j]);
                if fits {
                    for j in 0..VEHICLE_KIND_COUNT {
                        work[j] += self.allocation[i][j];
                    }
                    finish[i] = true;
                    progressed = true;
                    completed += 1;
                }
            }

            if !progressed {
                return false;
            }
        }

        true
    }
}

/// Multi-type pool of ground-service vehicles.
///
/// Two faces: the Banker's-algorithm `request`/`release` interface over
/// declared maximum demands, and the per-vehicle `allocate` path the
/// lifecycle driver uses today. Neither blocks; callers poll.
#[derive(Debug)]
pub struct VehiclePool {
    inner: Mutex<PoolInner>,
    vehicle_released: Condvar,
}

impl VehiclePool {
    pub fn new(counts: &VehicleCounts) -> Self {
        let sizes = [
            counts.fuel_trucks,
            counts.catering,
            counts.baggage_carts,
            counts.cleaning_crews,
            counts.buses,
            counts.tugs,
            counts.ground_power_units,
        ];

        let mut fleets = Vec::with_capacity(VEHICLE_KIND_COUNT);
        let mut available = [0usize; VEHICLE_KIND_COUNT];
        for kind in VehicleKind::ALL {
            let size = sizes[kind.index()];
            let fleet = (0..size).map(|i| Arc::new(Vehicle::new(i, kind))).collect();
            fleets.push(fleet);
            available[kind.index()] = size;
        }

        VehiclePool {
            inner: Mutex::new(PoolInner { fleets, available, max_need: Vec::new(), allocation: Vec::new(), need: Vec::new() }),
            vehicle_released: Condvar::new(),
        }
    }

    /// Registers a flight's declared maximum simultaneous demand.
    /// Returns the row index used by `request`/`release`.
    pub fn register_flight(&self, max_demand: Demand) -> usize {
        let mut inner = self.inner.lock().expect("lock poisoned");
        inner.max_need.push(max_demand);
        inner.allocation.push([0; VEHICLE_KIND_COUNT]);
        inner.need.push(max_demand);
        inner.max_need.len() - 1
    }

    /// Returns everything the flight still holds and zeroes its row.
    pub fn unregister_flight(&self, row: usize) {
        let mut inner = self.inner.lock().expect("lock poisoned");
        if row >= inner.allocation.len() {
            return;
        }
        for j in 0..VEHICLE_KIND_COUNT {
            inner.available[j] += inner.allocation[row][j];
            inner.allocation[row][j] = 0;
            inner.need[row][j] = 0;
            inner.max_need[row][j] = 0;
        }
        self.vehicle_released.notify_all();
    }

    /// Admits `count` vehicles of `kind` iff the request fits the declared
    /// need, fits availability, and leaves the pool in a safe state.
    /// An unsafe tentative allocation is rolled back and refused.
    pub fn request(&self, row: usize, kind: VehicleKind, count: usize) -> Result<()> {
        let mut inner = self.inner.lock().expect("lock poisoned");
        let j = kind.index();

        if row >= inner.allocation.len() {
            return Err(Error::UnsafeAllocation);
        }
        if count > inner.need[row][j] || count > inner.available[j] {
            return Err(Error::UnsafeAllocation);
        }

        // Tentative allocation, then the safety check decides.
        inner.available[j] -= count;
        inner.allocation[row][j] += count;
        inner.need[row][j] -= count;

        if !inner.is_safe_state() {
            inner.available[j] += count;
            inner.allocation[row][j] -= count;
            inner.need[row][j] += count;
            log::warn!(target: "resources", "Banker's check refused {} x{} for row {}", kind, count, row);
            return Err(Error::UnsafeAllocation);
        }

        Ok(())
    }

    pub fn release(&self, row: usize, kind: VehicleKind, count: usize) {
        let mut inner = self.inner.lock().expect("lock poisoned");
        let j = kind.index();
        if row >= inner.allocation.len() {
            return;
        }
        let actual = count.min(inner.allocation[row][j]);
        inner.allocation[row][j] -= actual;
        inner.available[j] += actual;
        inner.need[row][j] += actual;
        self.vehicle_released.notify_all();
    }

    /// The single-vehicle path: grabs the first free vehicle of the kind,
    /// bypassing the Banker's tables. This is what the lifecycle uses.
    pub fn allocate(&self, kind: VehicleKind, flight: FlightKey, now: i64, expected_duration: i64) -> Option<Arc<Vehicle>> {
        let mut inner = self.inner.lock().expect("lock poisoned");
        let j = kind.index();

        let found = inner.fleets[j].iter().find(|v| v.try_acquire(flight, now, expected_duration)).cloned();
        if found.is_some() {
            inner.available[j] = inner.available[j].saturating_sub(1);
        }
        found
    }

    pub fn release_vehicle(&self, vehicle: &Arc<Vehicle>) {
        let mut inner = self.inner.lock().expect("lock poisoned");
        vehicle.release();
        inner.available[vehicle.kind.index()] += 1;
        self.vehicle_released.notify_all();
        log::debug!(target: "resources", "{} released", vehicle.name);
    }

    pub fn available_count(&self, kind: VehicleKind) -> usize {
        let inner = self.inner.lock().expect("lock poisoned");
        inner.available[kind.index()]
    }

    pub fn total_count(&self, kind: VehicleKind) -> usize {
        let inner = self.inner.lock().expect("lock poisoned");
        inner.fleets[kind.index()].len()
    }

    pub fn total_fleet_size(&self) -> usize {
        let inner = self.inner.lock().expect("lock poisoned");
        inner.fleets.iter().map(|f| f.len()).sum()
    }

    pub fn utilization(&self, kind: VehicleKind) -> f64 {
        let total = self.total_count(kind);
        if total == 0 {
            return 0.0;
        }
        1.0 - self.available_count(kind) as f64 / total as f64
    }

    /// True iff a completion order exists for the currently registered
    /// flights. Exposed for invariant tests.
    pub fn is_safe(&self) -> bool {
        let inner = self.inner.lock().expect("lock poisoned");
        inner.is_safe_state()
    }
}
