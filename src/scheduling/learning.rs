use std::sync::Mutex;

use crate::config::PisWeights;
use crate::scheduling::pis::PisCalculator;

const LEARNING_RATE_OLD: f64 = 0.7;
const LEARNING_RATE_NEW: f64 = 0.3;
const WEIGHT_ADJUSTMENT: f64 = 0.01;

/// An operation's completion summary as fed by the scheduler.
#[derive(Debug, Clone, Copy)]
pub struct CompletionSample {
    pub completion_time: f64,
    pub wait_time: f64,
    pub on_time: bool,
}

#[derive(Debug)]
struct LearningInner {
    avg_completion_time: f64,
    avg_wait_time: f64,
    on_time_rate: f64,
}

/// Exponential-moving-average feedback over completed operations, nudging
/// the PIS weights by 0.01 steps when service quality drifts.
#[derive(Debug)]
pub struct LearningEngine {
    inner: Mutex<LearningInner>,
}

impl LearningEngine {
    pub fn new() -> Self {
        LearningEngine {
            inner: Mutex::new(LearningInner { avg_completion_time: 100.0, avg_wait_time: 30.0, on_time_rate: 0.90 }),
        }
    }

    pub fn record(&self, sample: CompletionSample) {
        let mut inner = self.inner.lock().expect("lock poisoned");
        inner.avg_completion_time = LEARNING_RATE_OLD * inner.avg_completion_time + LEARNING_RATE_NEW * sample.completion_time;
        inner.avg_wait_time = LEARNING_RATE_OLD * inner.avg_wait_time + LEARNING_RATE_NEW * sample.wait_time;
        let actual = if sample.on_time { 1.0 } else { 0.0 };
        inner.on_time_rate = LEARNING_RATE_OLD * inner.on_time_rate + LEARNING_RATE_NEW * actual;
    }

    pub fn averages(&self) -> (f64, f64, f64) {
        let inner = self.inner.lock().expect("lock poisoned");
        (inner.avg_completion_time, inner.avg_wait_time, inner.on_time_rate)
    }

    /// Shifts weight mass toward delay propagation when waits run long, and
    /// toward fuel criticality when the on-time rate sags; both shifts come
    /// out of the resource-utilization weight. Commits only while the sum
    /// stays near 1.0.
    pub fn adjust_weights(&self, pis: &PisCalculator) -> bool {
        let inner = self.inner.lock().expect("lock poisoned");
        let mut weights = pis.weights();

        if inner.avg_wait_time > 50.0 && weights.alpha < 0.35 {
            weights.alpha += WEIGHT_ADJUSTMENT;
            weights.gamma -= WEIGHT_ADJUSTMENT;
        }

        if inner.on_time_rate < 0.85 && weights.epsilon < 0.30 {
            weights.epsilon += WEIGHT_ADJUSTMENT;
            weights.gamma -= WEIGHT_ADJUSTMENT;
        }

        let sum = weights.alpha + weights.beta + weights.gamma + weights.delta + weights.epsilon;
        if (sum - 1.0).abs() < 0.05 && pis.update_weights(weights) {
            log::info!(
                target: "scheduling",
                "Learning adjustment: alpha={:.2} beta={:.2} gamma={:.2} delta={:.2} epsilon={:.2}",
                weights.alpha,
                weights.beta,
                weights.gamma,
                weights.delta,
                weights.epsilon
            );
            return true;
        }
        false
    }
}

impl Default for LearningEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_weights() -> PisWeights {
        PisWeights { alpha: 0.25, beta: 0.20, gamma: 0.15, delta: 0.20, epsilon: 0.20 }
    }

    #[test]
    fn averages_move_by_ema() {
        let learning = LearningEngine::new();
        learning.record(CompletionSample { completion_time: 200.0, wait_time: 100.0, on_time: false });

        let (completion, wait, on_time) = learning.averages();
        assert!((completion - (0.7 * 100.0 + 0.3 * 200.0)).abs() < 1e-9);
        assert!((wait - (0.7 * 30.0 + 0.3 * 100.0)).abs() < 1e-9);
        assert!((on_time - 0.7 * 0.90).abs() < 1e-9);
    }

    #[test]
    fn long_waits_shift_weight_into_alpha() {
        let learning = LearningEngine::new();
        let pis = PisCalculator::new(default_weights());

        for _ in 0..20 {
            learning.record(CompletionSample { completion_time: 100.0, wait_time: 400.0, on_time: true });
        }

        assert!(learning.adjust_weights(&pis));
        let weights = pis.weights();
        assert!((weights.alpha - 0.26).abs() < 1e-9);
        assert!((weights.gamma - 0.14).abs() < 1e-9);

        let sum = weights.alpha + weights.beta + weights.gamma + weights.delta + weights.epsilon;
        assert!((sum - 1.0).abs() < 0.01);
    }

    #[test]
    fn late_flights_shift_weight_into_epsilon() {
        let learning = LearningEngine::new();
        let pis = PisCalculator::new(default_weights());

        for _ in 0..20 {
            learning.record(CompletionSample { completion_time: 100.0, wait_time: 10.0, on_time: false });
        }

        assert!(learning.adjust_weights(&pis));
        let weights = pis.weights();
        assert!((weights.epsilon - 0.21).abs() < 1e-9);
        assert!((weights.gamma - 0.14).abs() < 1e-9);
    }

    #[test]
    fn alpha_cap_stops_the_shift() {
        let learning = LearningEngine::new();
        let pis = PisCalculator::new(default_weights());

        for _ in 0..200 {
            learning.record(CompletionSample { completion_time: 100.0, wait_time: 500.0, on_time: true });
        }

        // Repeated adjustments stop once alpha reaches its 0.35 cap.
        for _ in 0..30 {
            learning.adjust_weights(&pis);
        }
        let weights = pis.weights();
        assert!(weights.alpha <= 0.35 + 1e-9);

        let sum = weights.alpha + weights.beta + weights.gamma + weights.delta + weights.epsilon;
        assert!((sum - 1.0).abs() < 0.01);
    }
}
