use std::sync::Mutex;

use crate::scheduling::operation::Operation;

// Exponential aging time constants per queue, in simulated seconds.
const TIME_CONSTANT_Q1: f64 = 480.0;
const TIME_CONSTANT_Q2: f64 = 300.0;
const TIME_CONSTANT_Q3: f64 = 180.0;
const TIME_CONSTANT_Q4: f64 = 120.0;

// Guaranteed-service thresholds: waiting past these forces promotion to Q1.
const MAX_WAIT_Q2: i64 = 1800;
const MAX_WAIT_Q3: i64 = 1200;
const MAX_WAIT_Q4: i64 = 900;

#[derive(Debug)]
struct AgingInner {
    base_age_rate: f64,
    age_weight: f64,
}

/// Starvation prevention: waiting operations gain an exponential PIS boost,
/// and past a per-queue threshold they are promoted to Q1 with the one-way
/// `guaranteed_service` flag. Q0 neither ages nor promotes.
#[derive(Debug)]
pub struct AgingManager {
    inner: Mutex<AgingInner>,
}

impl AgingManager {
    pub fn new() -> Self {
        AgingManager { inner: Mutex::new(AgingInner { base_age_rate: 1.0, age_weight: 0.1 }) }
    }

    fn time_constant(queue: usize) -> f64 {
        match queue {
            0 => 0.0, // emergency queue does not age
            1 => TIME_CONSTANT_Q1,
            2 => TIME_CONSTANT_Q2,
            3 => TIME_CONSTANT_Q3,
            4 => TIME_CONSTANT_Q4,
            _ => TIME_CONSTANT_Q3,
        }
    }

    fn max_wait_threshold(queue: usize) -> i64 {
        match queue {
            0 => 0,
            1 => i64::MAX, // already critical, nothing further to guarantee
            2 => MAX_WAIT_Q2,
            3 => MAX_WAIT_Q3,
            4 => MAX_WAIT_Q4,
            _ => MAX_WAIT_Q3,
        }
    }

    /// age_increment = base_rate · e^(wait / T_queue)
    pub fn age_increment(&self, op: &Operation) -> f64 {
        let time_constant = Self::time_constant(op.current_queue);
        if time_constant <= 0.0 {
            return 0.0;
        }
        let inner = self.inner.lock().expect("lock poisoned");
        inner.base_age_rate * (op.wait_time as f64 / time_constant).exp()
    }

    /// Updates wait time, applies the PIS boost and promotes to Q1 when the
    /// guaranteed-service threshold is exceeded. Returns true on promotion
    /// so the scheduler can re-bucket the operation.
    pub fn apply(&self, op: &mut Operation, now: i64) -> bool {
        op.wait_time = now - op.arrival_time;

        let increment = self.age_increment(op);
        let age_weight = self.inner.lock().expect("lock poisoned").age_weight;
        op.priority_score += increment * age_weight;

        if self.needs_guaranteed_service(op) {
            let old_queue = op.current_queue;
            op.current_queue = 1;
            op.guaranteed_service = true;
            log::info!(
                target: "scheduling",
                "Operation {} promoted Q{} -> Q1 for guaranteed service (waited {})",
                op.id,
                old_queue,
                op.wait_time
            );
            return true;
        }
        false
    }

    fn needs_guaranteed_service(&self, op: &Operation) -> bool {
        if op.guaranteed_service || op.current_queue == 0 {
            return false;
        }
        op.wait_time > Self::max_wait_threshold(op.current_queue)
    }

    pub fn set_base_age_rate(&self, rate: f64) {
        self.inner.lock().expect("lock poisoned").base_age_rate = rate.clamp(0.1, 5.0);
    }

    pub fn set_age_weight(&self, weight: f64) {
        self.inner.lock().expect("lock poisoned").age_weight = weight.clamp(0.01, 1.0);
    }
}

impl Default for AgingManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::airport::aircraft::{Aircraft, AircraftType};
    use crate::airport::flight::{Flight, FlightKey, FlightType};
    use crate::scheduling::operation::{FlightFacts, OperationType};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use slotmap::SlotMap;

    fn op_in_queue(queue: usize, arrival: i64) -> Operation {
        let mut rng = StdRng::seed_from_u64(11);
        let mut map: SlotMap<FlightKey, ()> = SlotMap::with_key();
        let key = map.insert(());
        let flight = Flight::new("AG1", Aircraft::new(AircraftType::A320), FlightType::Domestic, 0, 0, &mut rng);
        let mut op = Operation::new(1, FlightFacts::of(key, &flight), OperationType::Boarding, arrival);
        op.current_queue = queue;
        op
    }

    #[test]
    fn queue_zero_never_ages() {
        let aging = AgingManager::new();
        let mut op = op_in_queue(0, 0);
        assert!(!aging.apply(&mut op, 10_000));
        assert!((op.priority_score - 0.0).abs() < f64::EPSILON);
        assert_eq!(op.current_queue, 0);
    }

    #[test]
    fn boost_grows_exponentially_with_wait() {
        let aging = AgingManager::new();
        let mut short_wait = op_in_queue(4, 0);
        let mut long_wait = op_in_queue(4, 0);

        aging.apply(&mut short_wait, 120);
        aging.apply(&mut long_wait, 600);

        // e^(600/120) dominates e^(120/120) by far more than the wait ratio.
        assert!(long_wait.priority_score > short_wait.priority_score * 10.0);
    }

    #[test]
    fn threshold_crossing_promotes_to_q1_and_sticks() {
        let aging = AgingManager::new();
        let mut op = op_in_queue(3, 0);

        assert!(!aging.apply(&mut op, 1200));
        assert_eq!(op.current_queue, 3);

        assert!(aging.apply(&mut op, 1201));
        assert_eq!(op.current_queue, 1);
        assert!(op.guaranteed_service);

        // Promotion is one-way; applying again from Q1 does not re-fire.
        assert!(!aging.apply(&mut op, 50_000));
        assert_eq!(op.current_queue, 1);
    }

    #[test]
    fn q4_threshold_is_tightest() {
        let aging = AgingManager::new();
        let mut q4 = op_in_queue(4, 0);
        let mut q2 = op_in_queue(2, 0);

        assert!(aging.apply(&mut q4, 901));
        assert!(!aging.apply(&mut q2, 901));
        assert!(aging.apply(&mut q2, 1801));
    }
}
