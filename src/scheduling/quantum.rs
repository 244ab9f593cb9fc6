use std::sync::Mutex;

use crate::scheduling::operation::{Complexity, Operation};

// Base quantum per queue, simulated seconds. Q0 runs to completion.
const BASE_QUANTUM_Q1: i64 = 200;
const BASE_QUANTUM_Q2: i64 = 150;
const BASE_QUANTUM_Q3: i64 = 100;
const BASE_QUANTUM_Q4: i64 = 50;

const FACTOR_SIMPLE: f64 = 0.7;
const FACTOR_MEDIUM: f64 = 1.0;
const FACTOR_COMPLEX: f64 = 1.3;

const MIN_QUANTUM: i64 = 10;

#[derive(Debug)]
struct QuantumInner {
    active_operations: i64,
    max_operations: i64,
}

/// Time-slice sizing: base quantum per queue, scaled by system load and
/// operation complexity, plus any compensation owed from preemption.
#[derive(Debug)]
pub struct QuantumManager {
    inner: Mutex<QuantumInner>,
}

impl QuantumManager {
    pub fn new() -> Self {
        QuantumManager { inner: Mutex::new(QuantumInner { active_operations: 0, max_operations: 50 }) }
    }

    fn base_quantum(queue: usize) -> i64 {
        match queue {
            1 => BASE_QUANTUM_Q1,
            2 => BASE_QUANTUM_Q2,
            3 => BASE_QUANTUM_Q3,
            4 => BASE_QUANTUM_Q4,
            _ => BASE_QUANTUM_Q3,
        }
    }

    fn complexity_factor(complexity: Complexity) -> f64 {
        match complexity {
            Complexity::Simple => FACTOR_SIMPLE,
            Complexity::Medium => FACTOR_MEDIUM,
            Complexity::Complex => FACTOR_COMPLEX,
        }
    }

    /// load_factor = 1 − (active/max)², clamped to [0.4, 1.0]. A loaded
    /// system hands out shorter slices.
    pub fn load_factor(&self) -> f64 {
        let inner = self.inner.lock().expect("lock poisoned");
        if inner.max_operations <= 0 {
            return 1.0;
        }
        let ratio = inner.active_operations as f64 / inner.max_operations as f64;
        (1.0 - ratio * ratio).clamp(0.4, 1.0)
    }

    /// The slice this operation gets on its next dispatch. 0 means run to
    /// completion (emergency queue).
    pub fn quantum_for(&self, op: &Operation) -> i64 {
        if op.current_queue == 0 {
            return 0;
        }

        let base = Self::base_quantum(op.current_queue);
        let actual = (base as f64 * self.load_factor() * Self::complexity_factor(op.complexity)) as i64;
        (actual + op.quantum_compensation).max(MIN_QUANTUM)
    }

    pub fn set_active_operations(&self, count: i64) {
        self.inner.lock().expect("lock poisoned").active_operations = count.max(0);
    }

    pub fn set_max_operations(&self, max: i64) {
        self.inner.lock().expect("lock poisoned").max_operations = max.max(1);
    }
}

impl Default for QuantumManager {
    fn default() -> Self {
        Self::new()
    }
}
